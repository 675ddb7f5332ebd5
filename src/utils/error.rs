use thiserror::Error;

/// Failure of a single formation query, as surfaced to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryFailure {
    #[error("Network unreachable: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid identifier: an item needs a non-empty id")]
    InvalidIdentifier,

    #[error("Invalid item '{id}': {reason}")]
    InvalidItem { id: String, reason: String },

    #[error("'{id}' is already selected")]
    DuplicateSelection { id: String },

    #[error("Selection is empty, nothing to submit")]
    EmptySelection,

    #[error("A submission is already running")]
    SubmissionInProgress,

    #[error("No credential available, sign in first")]
    Unauthorized,

    #[error("Query failed: {0}")]
    Query(#[from] QueryFailure),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Authorization,
    Network,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::InvalidIdentifier
            | SyncError::InvalidItem { .. }
            | SyncError::DuplicateSelection { .. }
            | SyncError::EmptySelection
            | SyncError::SubmissionInProgress => ErrorCategory::Input,
            SyncError::Unauthorized => ErrorCategory::Authorization,
            SyncError::Query(_) | SyncError::HttpError(_) => ErrorCategory::Network,
            SyncError::IoError(_) | SyncError::SerializationError(_) => ErrorCategory::Storage,
            SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // informational, nothing was lost
            SyncError::DuplicateSelection { .. }
            | SyncError::EmptySelection
            | SyncError::SubmissionInProgress => ErrorSeverity::Low,
            SyncError::Query(_) | SyncError::HttpError(_) => ErrorSeverity::Medium,
            SyncError::InvalidIdentifier
            | SyncError::InvalidItem { .. }
            | SyncError::Unauthorized
            | SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            SyncError::IoError(_) | SyncError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SyncError::InvalidIdentifier => "This item cannot be selected.".to_string(),
            SyncError::InvalidItem { id, .. } => format!("Item '{}' cannot be added.", id),
            SyncError::DuplicateSelection { id } => {
                format!("'{}' is already in your selection.", id)
            }
            SyncError::EmptySelection => "Your selection is empty.".to_string(),
            SyncError::SubmissionInProgress => "Enrollment is already in progress.".to_string(),
            SyncError::Unauthorized => "You must be signed in to enroll.".to_string(),
            SyncError::Query(failure) => failure.user_message(),
            SyncError::HttpError(_) => "Could not reach the server.".to_string(),
            SyncError::IoError(_) | SyncError::SerializationError(_) => {
                "Local data could not be read or written.".to_string()
            }
            SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. } => {
                format!("Invalid configuration: {}", self)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check the selection and try again.",
            ErrorCategory::Authorization => "Sign in or provide a token, then retry.",
            ErrorCategory::Network => "Check your connection and the API base URL.",
            ErrorCategory::Storage => "Check permissions on the storage directory.",
            ErrorCategory::Configuration => "Fix the configuration file or flags.",
        }
    }
}

impl QueryFailure {
    pub fn user_message(&self) -> String {
        match self {
            QueryFailure::Network(_) => {
                "Unable to reach the server. Check your connection.".to_string()
            }
            QueryFailure::MalformedResponse(_) => {
                "The server sent an unexpected response.".to_string()
            }
            QueryFailure::Server { message, .. } => message.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_is_low_severity_input_error() {
        let err = SyncError::DuplicateSelection {
            id: "rust-101".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert!(err.user_friendly_message().contains("rust-101"));
    }

    #[test]
    fn test_server_failure_message_is_passed_through() {
        let err = SyncError::from(QueryFailure::Server {
            status: 503,
            message: "maintenance".to_string(),
        });
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.user_friendly_message(), "maintenance");
    }
}
