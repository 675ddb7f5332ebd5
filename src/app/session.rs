use crate::adapters::http::ApiClient;
use crate::adapters::storage::{FileStore, JsonStorage};
use crate::core::events::EventBus;
use crate::core::query::ResourceQueryController;
use crate::core::selection::{Cart, IdSelection, SelectionStore};
use crate::core::submission::BulkSubmissionCoordinator;
use crate::domain::ports::{ConfigProvider, CredentialSource};
use crate::utils::error::Result;
use std::sync::Arc;

/// One user session: a single selection, cart and event bus shared by every consumer.
pub struct EnrollmentSession<C: ConfigProvider> {
    config: C,
    client: ApiClient,
    events: EventBus,
    selection: IdSelection,
    cart: Cart,
    coordinator: BulkSubmissionCoordinator,
}

impl<C: ConfigProvider> EnrollmentSession<C> {
    /// Persists under `config.storage_dir()`.
    pub fn open(config: C, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        let storage = JsonStorage::new(FileStore::new(config.storage_dir()));
        Self::with_storage(config, storage, credentials)
    }

    pub fn with_storage(
        config: C,
        storage: JsonStorage,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self> {
        let client = ApiClient::from_config(&config)?;
        let events = EventBus::default();

        let selection: IdSelection =
            SelectionStore::initialize(storage.clone(), config.selection_key(), events.clone());
        let cart: Cart = SelectionStore::initialize(storage, config.cart_key(), events.clone());
        let coordinator = BulkSubmissionCoordinator::new(
            selection.clone(),
            client.clone(),
            credentials,
            events.clone(),
        );

        tracing::debug!(
            "Session opened: {} selected, {} in cart",
            selection.len(),
            cart.len()
        );

        Ok(Self {
            config,
            client,
            events,
            selection,
            cart,
            coordinator,
        })
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn selection(&self) -> &IdSelection {
        &self.selection
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn coordinator(&self) -> &BulkSubmissionCoordinator {
        &self.coordinator
    }

    /// A fresh controller per search view; dropping it cancels its requests.
    pub fn query_controller(&self) -> ResourceQueryController {
        ResourceQueryController::new(
            self.client.clone(),
            self.config.page_size(),
            self.config.debounce(),
            self.events.clone(),
        )
    }
}
