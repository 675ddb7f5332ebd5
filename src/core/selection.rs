//! Durable, deduplicated selection of items a user intends to enroll in or buy.
//!
//! A [`SelectionStore`] is a cheap handle: clones share the same underlying
//! selection, so the same store can be handed to the UI layer and to the
//! [`BulkSubmissionCoordinator`](crate::core::submission::BulkSubmissionCoordinator).
//! Every mutation is mirrored to the [`JsonStorage`] under a single key.

use crate::adapters::storage::JsonStorage;
use crate::core::events::{EventBus, NoticeKind};
use crate::domain::model::CartItem;
use crate::utils::error::{Result, SyncError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// An entry that can live in a [`SelectionStore`].
pub trait SelectionItem: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Identity used for deduplication.
    fn key(&self) -> &str;

    /// Contribution to [`SelectionStore::total`].
    fn line_total(&self) -> f64 {
        0.0
    }

    /// Item-specific checks run before insertion; the key is checked separately.
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

impl SelectionItem for String {
    fn key(&self) -> &str {
        self
    }
}

impl SelectionItem for CartItem {
    fn key(&self) -> &str {
        &self.id
    }

    fn line_total(&self) -> f64 {
        CartItem::line_total(self)
    }

    fn check(&self) -> Result<()> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(SyncError::InvalidItem {
                id: self.id.clone(),
                reason: format!("price must be a non-negative number, got {}", self.price),
            });
        }
        Ok(())
    }
}

pub struct SelectionStore<T: SelectionItem> {
    state: Arc<watch::Sender<Vec<T>>>,
    storage: JsonStorage,
    key: Arc<str>,
    events: EventBus,
    persist_lock: Arc<Mutex<()>>,
}

/// Selection of formation identifiers.
pub type IdSelection = SelectionStore<String>;

/// Pricing variant: full line items.
pub type Cart = SelectionStore<CartItem>;

impl<T: SelectionItem> Clone for SelectionStore<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            storage: self.storage.clone(),
            key: Arc::clone(&self.key),
            events: self.events.clone(),
            persist_lock: Arc::clone(&self.persist_lock),
        }
    }
}

impl<T: SelectionItem> SelectionStore<T> {
    /// Loads the previous selection stored under `key`.
    ///
    /// Never fails: an absent value starts empty, an unreadable one is logged and
    /// discarded. Loaded entries are deduplicated, and entries without an id or
    /// failing [`SelectionItem::check`] are dropped.
    pub fn initialize(storage: JsonStorage, key: impl Into<String>, events: EventBus) -> Self {
        let key: Arc<str> = Arc::from(key.into());

        let loaded = match storage.load::<Vec<T>>(&key) {
            Ok(Some(items)) => sanitize(&key, items),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Discarding unreadable selection '{}': {}", key, e);
                Vec::new()
            }
        };
        tracing::debug!("Selection '{}' initialized with {} entries", key, loaded.len());

        let (tx, _) = watch::channel(loaded);
        Self {
            state: Arc::new(tx),
            storage,
            key,
            events,
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Inserts `item` unless its id is empty or already selected.
    pub fn add(&self, item: T) -> Result<()> {
        if item.key().trim().is_empty() {
            self.events
                .emit(NoticeKind::Warning, "This item has no identifier");
            return Err(SyncError::InvalidIdentifier);
        }
        if let Err(e) = item.check() {
            self.events.emit(NoticeKind::Warning, e.user_friendly_message());
            return Err(e);
        }

        let id = item.key().to_string();
        let inserted = self.state.send_if_modified(|items| {
            if items.iter().any(|existing| existing.key() == id) {
                false
            } else {
                items.push(item);
                true
            }
        });

        if !inserted {
            tracing::debug!("'{}' already selected", id);
            self.events
                .emit(NoticeKind::Info, format!("'{}' is already selected", id));
            return Err(SyncError::DuplicateSelection { id });
        }

        self.persist();
        self.events
            .emit(NoticeKind::Success, format!("'{}' added to your selection", id));
        Ok(())
    }

    /// Returns whether something was removed; removing an absent id is a no-op.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.state.send_if_modified(|items| {
            let before = items.len();
            items.retain(|existing| existing.key() != id);
            items.len() != before
        });
        if removed {
            self.persist();
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.borrow().iter().any(|existing| existing.key() == id)
    }

    pub fn clear(&self) {
        self.state.send_modify(Vec::clear);
        self.persist();
    }

    pub fn total(&self) -> f64 {
        self.state.borrow().iter().map(SelectionItem::line_total).sum()
    }

    pub fn items(&self) -> Vec<T> {
        self.state.borrow().clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.state
            .borrow()
            .iter()
            .map(|item| item.key().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_empty()
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// Change notifications carrying the full selection.
    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.state.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Writes the current selection; failures are logged only.
    fn persist(&self) {
        let _guard = self
            .persist_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.state.borrow().clone();
        if let Err(e) = self.storage.save(&self.key, &snapshot) {
            tracing::error!("Failed to persist selection '{}': {}", self.key, e);
        }
    }
}

fn sanitize<T: SelectionItem>(key: &str, items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            if item.key().trim().is_empty() {
                tracing::warn!("Dropping stored entry without identifier from '{}'", key);
                return false;
            }
            if let Err(e) = item.check() {
                tracing::warn!("Dropping stored entry '{}' from '{}': {}", item.key(), key, e);
                return false;
            }
            seen.insert(item.key().to_string())
        })
        .collect()
}
