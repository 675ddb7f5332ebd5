use crate::domain::model::{QueryParams, ResourcePage};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{QueryFailure, Result};
use crate::utils::validation::{validate_endpoint_path, validate_url};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Failure label used when the server gives no usable message.
pub const GENERIC_FAILURE: &str = "communication error";

pub const DEFAULT_ENROLLMENT_PATH: &str = "/api/enrollments";
pub const DEFAULT_FORMATIONS_PATH: &str = "/api/formations";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// HTTP collaborator for the enrollment and formation endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    enrollment_url: Url,
    formations_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_paths(
            base_url,
            DEFAULT_ENROLLMENT_PATH,
            DEFAULT_FORMATIONS_PATH,
            None,
        )
    }

    pub fn with_paths(
        base_url: &str,
        enrollment_path: &str,
        formations_path: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        validate_url("api.base_url", base_url)?;
        validate_endpoint_path("api.enrollment_path", enrollment_path)?;
        validate_endpoint_path("api.formations_path", formations_path)?;

        let base = base_url.trim_end_matches('/');
        let enrollment_url = validate_url(
            "api.enrollment_path",
            &format!("{}{}", base, enrollment_path),
        )?;
        let formations_url = validate_url(
            "api.formations_path",
            &format!("{}{}", base, formations_path),
        )?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            enrollment_url,
            formations_url,
        })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::with_paths(
            config.base_url(),
            config.enrollment_path(),
            config.formations_path(),
            config.request_timeout(),
        )
    }

    pub fn enrollment_url(&self) -> &Url {
        &self.enrollment_url
    }

    pub fn formations_url(&self) -> &Url {
        &self.formations_url
    }

    /// POSTs one enrollment. The error is a human-readable reason.
    pub async fn enroll(&self, token: &str, resource_id: &str) -> std::result::Result<(), String> {
        tracing::debug!("POST {} for '{}'", self.enrollment_url, resource_id);

        let response = self
            .client
            .post(self.enrollment_url.clone())
            .bearer_auth(token)
            .json(&serde_json::json!({ "resourceId": resource_id }))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Enrollment request for '{}' failed: {}", resource_id, e);
                GENERIC_FAILURE.to_string()
            })?;

        let status = response.status();
        tracing::debug!("Enrollment '{}' response status: {}", resource_id, status);
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(server_message(&body).unwrap_or_else(|| GENERIC_FAILURE.to_string()))
    }

    /// GETs one page of formations.
    pub async fn fetch_formations(
        &self,
        params: &QueryParams,
    ) -> std::result::Result<ResourcePage, QueryFailure> {
        let mut url = self.formations_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params.to_pairs() {
                pairs.append_pair(name, &value);
            }
        }
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| QueryFailure::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QueryFailure::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(QueryFailure::Server {
                status: status.as_u16(),
                message: server_message(&body).unwrap_or_else(|| status_label(status)),
            });
        }

        let page: ResourcePage = serde_json::from_str(&body)
            .map_err(|e| QueryFailure::MalformedResponse(e.to_string()))?;

        Ok(ResourcePage {
            items: page.items,
            pagination: page.pagination.normalized(),
        })
    }
}

fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

fn status_label(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => format!("HTTP {}", status.as_u16()),
    }
}
