pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{ApiClient, EnvCredentials, FileStore, JsonStorage, MemoryStore, StaticCredentials};
pub use app::EnrollmentSession;
pub use config::{toml_config::TomlConfig, AppSettings};
pub use core::events::{EventBus, Notice, NoticeKind};
pub use core::query::{QueryHandle, QueryOutcome, QuerySnapshot, ResourceQueryController};
pub use core::selection::{Cart, IdSelection, SelectionItem, SelectionStore};
pub use core::submission::BulkSubmissionCoordinator;
pub use utils::error::{QueryFailure, Result, SyncError};
