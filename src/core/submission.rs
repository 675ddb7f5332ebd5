//! Bulk enrollment: one concurrent request per selected formation.
//!
//! A submission round resolves the bearer token, fans out one task per id on a
//! [`JoinSet`], waits for every task to settle and then clears the selection,
//! whatever the individual outcomes were. Failed ids are not retried; the user
//! re-selects them for another round.
//!
//! Known race: an id added while a round is in flight is wiped by the final clear.

use crate::adapters::http::{ApiClient, GENERIC_FAILURE};
use crate::core::events::{EventBus, NoticeKind};
use crate::core::selection::IdSelection;
use crate::domain::model::{OutcomeStatus, ReportStatus, SubmissionOutcome, SubmissionReport};
use crate::domain::ports::CredentialSource;
use crate::utils::error::{Result, SyncError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

pub struct BulkSubmissionCoordinator {
    store: IdSelection,
    client: ApiClient,
    credentials: Arc<dyn CredentialSource>,
    submitting: Arc<watch::Sender<bool>>,
    events: EventBus,
}

/// Resets the in-flight flag when the round ends, including on early return.
struct SubmittingGuard<'a>(&'a watch::Sender<bool>);

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

impl BulkSubmissionCoordinator {
    pub fn new(
        store: IdSelection,
        client: ApiClient,
        credentials: Arc<dyn CredentialSource>,
        events: EventBus,
    ) -> Self {
        let (submitting, _) = watch::channel(false);
        Self {
            store,
            client,
            credentials,
            submitting: Arc::new(submitting),
            events,
        }
    }

    pub fn is_submitting(&self) -> bool {
        *self.submitting.borrow()
    }

    pub fn subscribe_submitting(&self) -> watch::Receiver<bool> {
        self.submitting.subscribe()
    }

    pub fn store(&self) -> &IdSelection {
        &self.store
    }

    pub async fn submit(&self) -> Result<SubmissionReport> {
        if self.is_submitting() {
            self.events
                .emit(NoticeKind::Info, "Enrollment is already in progress");
            return Err(SyncError::SubmissionInProgress);
        }
        if self.store.is_empty() {
            self.events.emit(NoticeKind::Info, "Your selection is empty");
            return Err(SyncError::EmptySelection);
        }

        let acquired = self.submitting.send_if_modified(|running| {
            if *running {
                false
            } else {
                *running = true;
                true
            }
        });
        if !acquired {
            return Err(SyncError::SubmissionInProgress);
        }
        let _guard = SubmittingGuard(&self.submitting);

        let token = match self.credentials.token().await {
            Some(token) if !token.trim().is_empty() => token,
            _ => {
                tracing::warn!("Submission aborted: no credential available");
                self.events
                    .emit(NoticeKind::Error, "You must be signed in to enroll");
                return Err(SyncError::Unauthorized);
            }
        };

        let ids = self.store.ids();
        tracing::info!("Submitting {} enrollments", ids.len());

        let mut tasks = JoinSet::new();
        let mut task_ids = HashMap::new();
        for id in &ids {
            let client = self.client.clone();
            let token = token.clone();
            let resource_id = id.clone();
            let handle = tasks.spawn(async move {
                let result = client.enroll(&token, &resource_id).await;
                (resource_id, result)
            });
            task_ids.insert(handle.id(), id.clone());
        }

        let mut settled: HashMap<String, SubmissionOutcome> = HashMap::with_capacity(ids.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            let outcome = match joined {
                Ok((_, (id, Ok(())))) => SubmissionOutcome {
                    id,
                    status: OutcomeStatus::Success,
                    error_message: None,
                },
                Ok((_, (id, Err(reason)))) => {
                    tracing::warn!("Enrollment for '{}' failed: {}", id, reason);
                    SubmissionOutcome {
                        id,
                        status: OutcomeStatus::Failure,
                        error_message: Some(reason),
                    }
                }
                Err(join_error) => {
                    let id = task_ids.get(&join_error.id()).cloned().unwrap_or_default();
                    tracing::error!("Enrollment task for '{}' died: {}", id, join_error);
                    SubmissionOutcome {
                        id,
                        status: OutcomeStatus::Failure,
                        error_message: Some(GENERIC_FAILURE.to_string()),
                    }
                }
            };
            settled.insert(outcome.id.clone(), outcome);
        }

        // report in selection order
        let outcomes = ids
            .iter()
            .filter_map(|id| settled.remove(id))
            .collect();
        let report = SubmissionReport::from_outcomes(outcomes);

        self.store.clear();

        tracing::info!(
            "Submission finished: {} succeeded, {} failed",
            report.successful_count,
            report.failed_entries.len()
        );
        self.announce(&report);

        Ok(report)
    }

    fn announce(&self, report: &SubmissionReport) {
        match report.status() {
            ReportStatus::AllSucceeded => self.events.emit(
                NoticeKind::Success,
                format!("Enrolled in {} formation(s)", report.successful_count),
            ),
            ReportStatus::PartialFailure => {
                let failed: Vec<String> = report
                    .failed_entries
                    .iter()
                    .map(|f| format!("{} ({})", f.id, f.reason))
                    .collect();
                self.events.emit(
                    NoticeKind::Warning,
                    format!(
                        "Enrolled in {} formation(s); failed: {}",
                        report.successful_count,
                        failed.join(", ")
                    ),
                );
            }
            ReportStatus::TotalFailure => {
                let reason = report
                    .failed_entries
                    .first()
                    .map(|f| f.reason.as_str())
                    .unwrap_or(GENERIC_FAILURE);
                self.events.emit(
                    NoticeKind::Error,
                    format!("No enrollment went through: {}", reason),
                );
            }
        }
    }
}
