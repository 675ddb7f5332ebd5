use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Durable key/value storage holding serialized values.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Session collaborator exposing the bearer token, if the user is signed in.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn token(&self) -> Option<String>;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn enrollment_path(&self) -> &str;
    fn formations_path(&self) -> &str;
    fn storage_dir(&self) -> &str;
    fn selection_key(&self) -> &str;
    fn cart_key(&self) -> &str;
    fn page_size(&self) -> u64;
    fn debounce(&self) -> Duration;
    fn request_timeout(&self) -> Option<Duration>;
    fn token_env(&self) -> &str;
}
