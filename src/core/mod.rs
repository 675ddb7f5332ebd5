pub mod events;
pub mod query;
pub mod selection;
pub mod submission;

pub use crate::domain::model::{CartItem, Formation, PaginationState, QueryParams};
pub use crate::domain::ports::{ConfigProvider, CredentialSource, KeyValueStore};
pub use crate::utils::error::Result;
