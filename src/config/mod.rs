#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::adapters::http::{DEFAULT_ENROLLMENT_PATH, DEFAULT_FORMATIONS_PATH};
use crate::core::query::{DEFAULT_DEBOUNCE, DEFAULT_PAGE_SIZE};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_endpoint_path, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_STORAGE_DIR: &str = "./.enrollment-sync";
pub const DEFAULT_SELECTION_KEY: &str = "selected-formations";
pub const DEFAULT_CART_KEY: &str = "cart";
pub const DEFAULT_TOKEN_ENV: &str = "ENROLLMENT_TOKEN";

/// Fully resolved settings the core is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    pub base_url: String,
    pub enrollment_path: String,
    pub formations_path: String,
    pub storage_dir: String,
    pub selection_key: String,
    pub cart_key: String,
    pub page_size: u64,
    pub debounce_ms: u64,
    pub request_timeout_seconds: Option<u64>,
    pub token_env: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            enrollment_path: DEFAULT_ENROLLMENT_PATH.to_string(),
            formations_path: DEFAULT_FORMATIONS_PATH.to_string(),
            storage_dir: DEFAULT_STORAGE_DIR.to_string(),
            selection_key: DEFAULT_SELECTION_KEY.to_string(),
            cart_key: DEFAULT_CART_KEY.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            request_timeout_seconds: None,
            token_env: DEFAULT_TOKEN_ENV.to_string(),
        }
    }
}

impl AppSettings {
    pub fn from_provider<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            enrollment_path: config.enrollment_path().to_string(),
            formations_path: config.formations_path().to_string(),
            storage_dir: config.storage_dir().to_string(),
            selection_key: config.selection_key().to_string(),
            cart_key: config.cart_key().to_string(),
            page_size: config.page_size(),
            debounce_ms: config.debounce().as_millis() as u64,
            request_timeout_seconds: config.request_timeout().map(|t| t.as_secs()),
            token_env: config.token_env().to_string(),
        }
    }
}

impl ConfigProvider for AppSettings {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn enrollment_path(&self) -> &str {
        &self.enrollment_path
    }

    fn formations_path(&self) -> &str {
        &self.formations_path
    }

    fn storage_dir(&self) -> &str {
        &self.storage_dir
    }

    fn selection_key(&self) -> &str {
        &self.selection_key
    }

    fn cart_key(&self) -> &str {
        &self.cart_key
    }

    fn page_size(&self) -> u64 {
        self.page_size
    }

    fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }

    fn token_env(&self) -> &str {
        &self.token_env
    }
}

impl Validate for AppSettings {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.base_url)?;
        validate_endpoint_path("api.enrollment_path", &self.enrollment_path)?;
        validate_endpoint_path("api.formations_path", &self.formations_path)?;
        validate_path("storage.directory", &self.storage_dir)?;
        validate_non_empty_string("storage.selection_key", &self.selection_key)?;
        validate_non_empty_string("storage.cart_key", &self.cart_key)?;
        validate_positive_number("query.page_size", self.page_size as usize, 1)?;
        validate_range("query.debounce_ms", self.debounce_ms, 0, 10_000)?;
        if let Some(timeout) = self.request_timeout_seconds {
            validate_range("api.request_timeout_seconds", timeout, 1, 600)?;
        }
        validate_non_empty_string("auth.token_env", &self.token_env)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = AppSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.debounce(), Duration::from_millis(500));
        assert_eq!(settings.page_size(), 10);
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let settings = AppSettings {
            page_size: 0,
            ..AppSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_from_provider_copies_everything() {
        let original = AppSettings {
            base_url: "https://formations.example.org".to_string(),
            request_timeout_seconds: Some(15),
            ..AppSettings::default()
        };
        assert_eq!(AppSettings::from_provider(&original), original);
    }
}
