// Adapters layer: concrete implementations for external systems (storage, http, session).

pub mod credentials;
pub mod http;
pub mod storage;

pub use credentials::{EnvCredentials, StaticCredentials};
pub use http::ApiClient;
pub use storage::{FileStore, JsonStorage, MemoryStore};
