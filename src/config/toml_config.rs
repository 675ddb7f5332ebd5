use crate::config::AppSettings;
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub api: ApiConfig,
    pub storage: Option<StorageConfig>,
    pub query: Option<QueryConfig>,
    pub auth: Option<AuthConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub enrollment_path: Option<String>,
    pub formations_path: Option<String>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub directory: Option<String>,
    pub selection_key: Option<String>,
    pub cart_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub page_size: Option<u64>,
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

impl TomlConfig {
    /// Loads and parses a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SyncError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses TOML text after `${VAR}` substitution.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SyncError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Fills unset fields from the defaults.
    pub fn to_settings(&self) -> AppSettings {
        let defaults = AppSettings::default();
        let storage = self.storage.as_ref();
        let query = self.query.as_ref();

        AppSettings {
            base_url: self.api.base_url.clone(),
            enrollment_path: self
                .api
                .enrollment_path
                .clone()
                .unwrap_or(defaults.enrollment_path),
            formations_path: self
                .api
                .formations_path
                .clone()
                .unwrap_or(defaults.formations_path),
            storage_dir: storage
                .and_then(|s| s.directory.clone())
                .unwrap_or(defaults.storage_dir),
            selection_key: storage
                .and_then(|s| s.selection_key.clone())
                .unwrap_or(defaults.selection_key),
            cart_key: storage
                .and_then(|s| s.cart_key.clone())
                .unwrap_or(defaults.cart_key),
            page_size: query.and_then(|q| q.page_size).unwrap_or(defaults.page_size),
            debounce_ms: query
                .and_then(|q| q.debounce_ms)
                .unwrap_or(defaults.debounce_ms),
            request_timeout_seconds: self
                .api
                .request_timeout_seconds
                .or(defaults.request_timeout_seconds),
            token_env: self
                .auth
                .as_ref()
                .and_then(|a| a.token_env.clone())
                .unwrap_or(defaults.token_env),
        }
    }

    pub fn verbose_logging(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.verbose)
            .unwrap_or(false)
    }

    pub fn json_logging(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.to_settings().validate()
    }
}
