use crate::domain::ports::CredentialSource;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

/// Token held in memory; the session layer swaps it on sign-in/out.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Arc<RwLock<Option<String>>>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token)),
        }
    }

    pub fn signed_in(token: impl Into<String>) -> Self {
        Self::new(Some(token.into()))
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Reads the token from an environment variable at every lookup.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var_name: String,
}

impl EnvCredentials {
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for EnvCredentials {
    async fn token(&self) -> Option<String> {
        std::env::var(&self.var_name).ok()
    }
}
