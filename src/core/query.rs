//! Paginated formation search with a debounced search term.
//!
//! # Concurrency Model
//!
//! At most one request is live per controller. Issuing a new one cancels the
//! previous [`CancellationToken`] and bumps the request generation; a request
//! only commits if, under the state lock, its token is still uncancelled and its
//! generation is still the current one. A superseded request therefore never
//! touches the visible [`QuerySnapshot`], even when its response arrives intact.
//!
//! Search-term changes go through a debounce task that is aborted and respawned
//! on every keystroke, so only the last term of a burst is applied.

use crate::adapters::http::ApiClient;
use crate::core::events::{EventBus, NoticeKind};
use crate::domain::model::{Formation, PaginationState, QueryParams, ResourcePage};
use crate::utils::error::QueryFailure;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub items: Vec<Formation>,
    pub pagination: PaginationState,
    pub params: QueryParams,
    pub loading: bool,
    pub error: Option<String>,
}

impl QuerySnapshot {
    fn empty(params: QueryParams) -> Self {
        Self {
            items: Vec::new(),
            pagination: PaginationState::new(0, params.limit, params.offset),
            params,
            loading: false,
            error: None,
        }
    }

    pub fn current_page(&self) -> u64 {
        PaginationState::new(0, self.params.limit, self.params.offset).current_page()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Loaded { items: usize },
    /// Superseded or torn down; not an error.
    Cancelled,
    Failed(QueryFailure),
}

/// Cancellation handle for one issued query.
#[derive(Debug)]
pub struct QueryHandle {
    generation: u64,
    token: CancellationToken,
    task: JoinHandle<QueryOutcome>,
}

impl QueryHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the request to settle.
    pub async fn outcome(self) -> QueryOutcome {
        self.task.await.unwrap_or(QueryOutcome::Cancelled)
    }
}

struct LiveRequest {
    generation: u64,
    token: CancellationToken,
}

struct ControllerState {
    params: QueryParams,
    live: Option<LiveRequest>,
    debounce: Option<JoinHandle<()>>,
    search_generation: u64,
    generation: u64,
    disposed: bool,
}

struct Shared {
    client: ApiClient,
    events: EventBus,
    state: Mutex<ControllerState>,
    snapshot: watch::Sender<QuerySnapshot>,
}

pub struct ResourceQueryController {
    shared: Arc<Shared>,
    debounce: Duration,
}

impl ResourceQueryController {
    /// Nothing is fetched until the first [`refetch`](Self::refetch) or parameter change.
    pub fn new(client: ApiClient, limit: u64, debounce: Duration, events: EventBus) -> Self {
        let params = QueryParams::new(limit.max(1));
        let (snapshot, _) = watch::channel(QuerySnapshot::empty(params.clone()));

        Self {
            shared: Arc::new(Shared {
                client,
                events,
                state: Mutex::new(ControllerState {
                    params,
                    live: None,
                    debounce: None,
                    search_generation: 0,
                    generation: 0,
                    disposed: false,
                }),
                snapshot,
            }),
            debounce,
        }
    }

    pub fn with_defaults(client: ApiClient, events: EventBus) -> Self {
        Self::new(client, DEFAULT_PAGE_SIZE, DEFAULT_DEBOUNCE, events)
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot> {
        self.shared.snapshot.subscribe()
    }

    pub fn params(&self) -> QueryParams {
        self.shared.lock().params.clone()
    }

    /// Applies `term` once it has been stable for the debounce window.
    pub fn set_search_term(&self, term: impl Into<String>) {
        let term = normalize(term.into());
        let mut state = self.shared.lock();
        if state.disposed {
            return;
        }
        if let Some(pending) = state.debounce.take() {
            pending.abort();
        }
        state.search_generation += 1;

        let shared = Arc::clone(&self.shared);
        let delay = self.debounce;
        let search_generation = state.search_generation;
        state.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.apply_search(search_generation, term);
        }));
    }

    pub fn set_level(&self, level: Option<String>) -> Option<QueryHandle> {
        let level = level.and_then(normalize);
        self.shared.update(|params| {
            if params.level == level {
                return false;
            }
            params.level = level;
            params.offset = 0;
            true
        })
    }

    pub fn set_location(&self, location: Option<String>) -> Option<QueryHandle> {
        let location = location.and_then(normalize);
        self.shared.update(|params| {
            if params.location == location {
                return false;
            }
            params.location = location;
            params.offset = 0;
            true
        })
    }

    pub fn set_limit(&self, limit: u64) -> Option<QueryHandle> {
        let limit = limit.max(1);
        self.shared.update(|params| {
            if params.limit == limit {
                return false;
            }
            params.limit = limit;
            params.offset = 0;
            true
        })
    }

    /// Moves to the 1-based page `page`.
    ///
    /// `None` if that page is already current or its offset does not fit in a `u64`.
    pub fn go_to_page(&self, page: u64) -> Option<QueryHandle> {
        let page = page.max(1);
        self.shared.update(|params| {
            let Some(offset) = (page - 1).checked_mul(params.limit) else {
                tracing::debug!("Page {} is out of range for limit {}", page, params.limit);
                return false;
            };
            if params.offset == offset {
                return false;
            }
            params.offset = offset;
            true
        })
    }

    /// Re-issues the current query without touching any parameter.
    pub fn refetch(&self) -> Option<QueryHandle> {
        self.shared.update(|_| true)
    }

    /// Sets every parameter at once, skipping the debounce window.
    ///
    /// Used when the whole query is known up front (a restored URL, a submitted
    /// search form). Any pending debounced term is dropped. `None` if nothing changed.
    pub fn replace_params(&self, params: QueryParams) -> Option<QueryHandle> {
        let params = QueryParams {
            limit: params.limit.max(1),
            offset: params.offset,
            search: params.search.and_then(normalize),
            level: params.level.and_then(normalize),
            location: params.location.and_then(normalize),
        };

        let mut state = self.shared.lock();
        if state.disposed {
            return None;
        }
        if let Some(pending) = state.debounce.take() {
            pending.abort();
            state.search_generation += 1;
        }
        if state.params == params {
            return None;
        }
        state.params = params;
        self.shared.issue(&mut state)
    }

    /// Cancels the live request and any pending search; no later completion is applied.
    pub fn dispose(&self) {
        let mut state = self.shared.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        if let Some(live) = state.live.take() {
            live.token.cancel();
        }
        if let Some(pending) = state.debounce.take() {
            pending.abort();
        }
        tracing::debug!("Query controller disposed");
    }
}

impl Drop for ResourceQueryController {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<F>(self: &Arc<Self>, change: F) -> Option<QueryHandle>
    where
        F: FnOnce(&mut QueryParams) -> bool,
    {
        let mut state = self.lock();
        if state.disposed || !change(&mut state.params) {
            return None;
        }
        self.issue(&mut state)
    }

    fn apply_search(
        self: &Arc<Self>,
        search_generation: u64,
        term: Option<String>,
    ) -> Option<QueryHandle> {
        let mut state = self.lock();
        // a newer keystroke restarted the window while this task was waking up
        if state.search_generation != search_generation {
            return None;
        }
        state.debounce = None;
        if state.disposed || state.params.search == term {
            return None;
        }
        tracing::debug!("Search term settled on {:?}", term);
        state.params.search = term;
        state.params.offset = 0;
        self.issue(&mut state)
    }

    fn issue(self: &Arc<Self>, state: &mut ControllerState) -> Option<QueryHandle> {
        if state.disposed {
            return None;
        }
        if let Some(previous) = state.live.take() {
            tracing::debug!("Superseding query #{}", previous.generation);
            previous.token.cancel();
        }

        state.generation += 1;
        let generation = state.generation;
        let token = CancellationToken::new();
        state.live = Some(LiveRequest {
            generation,
            token: token.clone(),
        });

        let params = state.params.clone();
        self.snapshot.send_modify(|snapshot| {
            snapshot.loading = true;
            snapshot.params = params.clone();
        });

        let shared = Arc::clone(self);
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = task_token.cancelled() => return QueryOutcome::Cancelled,
                result = shared.client.fetch_formations(&params) => result,
            };
            shared.commit(generation, &task_token, result)
        });

        Some(QueryHandle {
            generation,
            token,
            task,
        })
    }

    fn commit(
        &self,
        generation: u64,
        token: &CancellationToken,
        result: Result<ResourcePage, QueryFailure>,
    ) -> QueryOutcome {
        let mut state = self.lock();
        let current = state
            .live
            .as_ref()
            .is_some_and(|live| live.generation == generation);
        if state.disposed || token.is_cancelled() || !current {
            tracing::debug!("Dropping result of superseded query #{}", generation);
            return QueryOutcome::Cancelled;
        }
        state.live = None;

        match result {
            Ok(page) => {
                let count = page.items.len();
                tracing::debug!("Query #{} loaded {} formations", generation, count);
                self.snapshot.send_modify(|snapshot| {
                    snapshot.items = page.items;
                    snapshot.pagination = page.pagination;
                    snapshot.loading = false;
                    snapshot.error = None;
                });
                QueryOutcome::Loaded { items: count }
            }
            Err(failure) => {
                tracing::warn!("Query #{} failed: {}", generation, failure);
                let message = failure.user_message();
                let params = &state.params;
                self.snapshot.send_modify(|snapshot| {
                    snapshot.items.clear();
                    snapshot.pagination = PaginationState::new(0, params.limit, params.offset);
                    snapshot.loading = false;
                    snapshot.error = Some(message.clone());
                });
                self.events.emit(NoticeKind::Error, message);
                QueryOutcome::Failed(failure)
            }
        }
    }
}

fn normalize(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ResourceQueryController {
        // nothing listens on port 9; only synchronous behaviour is exercised here
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        ResourceQueryController::new(client, 10, Duration::from_millis(50), EventBus::default())
    }

    #[tokio::test]
    async fn test_go_to_current_page_is_noop() {
        let controller = controller();
        assert!(controller.go_to_page(1).is_none());
        assert!(controller.go_to_page(0).is_none());
    }

    #[tokio::test]
    async fn test_go_to_page_computes_offset() {
        let controller = controller();
        let handle = controller.go_to_page(3).unwrap();
        assert_eq!(controller.params().offset, 20);
        assert!(controller.snapshot().loading);
        assert_eq!(controller.snapshot().current_page(), 3);
        handle.cancel();
        assert_eq!(handle.outcome().await, QueryOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_go_to_unreachable_page_is_ignored() {
        let controller = controller();
        assert!(controller.go_to_page(u64::MAX).is_none());
        assert_eq!(controller.params().offset, 0);
        assert!(!controller.snapshot().loading);

        let handle = controller.go_to_page(u64::MAX / 10).unwrap();
        assert_eq!(controller.params().offset % 10, 0);
        handle.cancel();
    }

    #[tokio::test]
    async fn test_new_request_cancels_previous() {
        let controller = controller();
        let first = controller.refetch().unwrap();
        let second = controller.refetch().unwrap();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(second.generation() > first.generation());
        assert_eq!(first.outcome().await, QueryOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_filter_change_resets_offset() {
        let controller = controller();
        if let Some(handle) = controller.go_to_page(4) {
            handle.cancel();
        }
        assert_eq!(controller.params().offset, 30);

        controller.set_level(Some("advanced".to_string()));
        let params = controller.params();
        assert_eq!(params.offset, 0);
        assert_eq!(params.level.as_deref(), Some("advanced"));

        assert!(controller.set_level(Some(" advanced ".to_string())).is_none());
        controller.dispose();
    }

    #[tokio::test]
    async fn test_disposed_controller_ignores_changes() {
        let controller = controller();
        controller.dispose();
        assert!(controller.refetch().is_none());
        assert!(controller.set_limit(20).is_none());
        controller.set_search_term("rust");
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(controller.params().search, None);
    }
}
