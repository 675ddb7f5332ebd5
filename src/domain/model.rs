use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A line item in the pricing cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub title: String,
    #[serde(deserialize_with = "lenient_number")]
    pub price: f64,
    #[serde(
        default,
        deserialize_with = "lenient_quantity",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<u32>,
}

impl CartItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price,
            quantity: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// `price × max(quantity, 1)`; a non-finite price counts as 0.
    pub fn line_total(&self) -> f64 {
        let price = if self.price.is_finite() { self.price } else { 0.0 };
        price * f64::from(self.quantity.unwrap_or(1).max(1))
    }
}

/// A course offering as served by the query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formation {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub instructor: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: f64,
    #[serde(default)]
    pub seats: u32,
    #[serde(default)]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Formation {
    pub fn to_cart_item(&self) -> CartItem {
        CartItem::new(self.id.clone(), self.title.clone(), self.price)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub pages: u64,
}

impl PaginationState {
    pub fn new(total: u64, limit: u64, offset: u64) -> Self {
        Self {
            total,
            limit,
            offset,
            pages: page_count(total, limit),
        }
    }

    /// 1-based page the offset falls on.
    pub fn current_page(&self) -> u64 {
        if self.limit == 0 {
            1
        } else {
            self.offset / self.limit + 1
        }
    }

    /// Recomputes `pages` so it always matches `ceil(total / limit)`.
    pub fn normalized(self) -> Self {
        Self::new(self.total, self.limit, self.offset)
    }
}

pub fn page_count(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        0
    } else {
        total.div_ceil(limit)
    }
}

/// Body of a successful query response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePage {
    pub items: Vec<Formation>,
    pub pagination: PaginationState,
}

/// Effective parameters of a formation query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub limit: u64,
    pub offset: u64,
    pub search: Option<String>,
    pub level: Option<String>,
    pub location: Option<String>,
}

impl QueryParams {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            offset: 0,
            search: None,
            level: None,
            location: None,
        }
    }

    /// Query-string pairs; empty filters are left out.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ];
        let optional = [
            ("search", &self.search),
            ("level", &self.level),
            ("location", &self.location),
        ];
        for (name, value) in optional {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((name, value.to_string()));
            }
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// Settled result of one enrollment request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub id: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    AllSucceeded,
    PartialFailure,
    TotalFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub successful_count: usize,
    pub failed_entries: Vec<FailedEntry>,
    pub outcomes: Vec<SubmissionOutcome>,
    pub completed_at: DateTime<Utc>,
}

impl SubmissionReport {
    pub fn from_outcomes(outcomes: Vec<SubmissionOutcome>) -> Self {
        let successful_count = outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Success)
            .count();
        let failed_entries = outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failure)
            .map(|o| FailedEntry {
                id: o.id.clone(),
                reason: o.error_message.clone().unwrap_or_default(),
            })
            .collect();

        Self {
            successful_count,
            failed_entries,
            outcomes,
            completed_at: Utc::now(),
        }
    }

    pub fn status(&self) -> ReportStatus {
        if self.failed_entries.is_empty() {
            ReportStatus::AllSucceeded
        } else if self.successful_count == 0 {
            ReportStatus::TotalFailure
        } else {
            ReportStatus::PartialFailure
        }
    }
}

/// Accepts a JSON number or a numeric string; anything else becomes 0.
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(coerce_number(&value))
}

/// Same coercion as prices, truncated and clamped into `u32`; `null` stays unset.
fn lenient_quantity<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    let quantity = coerce_number(&value).trunc().clamp(0.0, f64::from(u32::MAX));
    Ok(Some(quantity as u32))
}

pub fn coerce_number(value: &serde_json::Value) -> f64 {
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        serde_json::Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if number.is_finite() {
        number
    } else {
        0.0
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
