//! # Submission Coordinator
//!
//! Drives a single outbound write through `Idle -> Submitting -> Confirming -> Idle`.
//! Failures at any stage also land back on `Idle`. Only one submission may be in
//! flight; a second request is rejected without touching the first.
//!
//! A confirmed submission does not append to the ledger view itself. The
//! resulting `NewWave` arrives through the synchronizer's subscription, so the
//! view may lag the confirmation briefly.

use crate::{
    client::LedgerClient,
    config::Submission,
    error::{LedgerError, SubmitError},
    notice::{NoticeKind, Notifier},
    session::SessionStatus,
    synchronizer::LedgerSynchronizer,
    types::{Confirmation, TransactionHandle},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// A dispatched write awaiting its confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub handle: TransactionHandle,
    pub dispatched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStatus {
    Idle,
    Submitting,
    Confirming(PendingSubmission),
}

impl SubmissionStatus {
    pub fn is_busy(&self) -> bool {
        !matches!(self, SubmissionStatus::Idle)
    }
}

pub struct SubmissionCoordinator {
    client: Arc<dyn LedgerClient>,
    session: watch::Receiver<SessionStatus>,
    synchronizer: Arc<LedgerSynchronizer>,
    notifier: Notifier,
    gas_limit: u32,
    resync_on_confirm: bool,
    status_tx: watch::Sender<SubmissionStatus>,
    draft_tx: watch::Sender<String>,
}

/// Puts the coordinator back to `Idle` with an empty draft however the attempt
/// ends, including when the caller drops the `submit_message` future.
struct InFlightGuard<'a> {
    coordinator: &'a SubmissionCoordinator,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.coordinator
            .status_tx
            .send_replace(SubmissionStatus::Idle);
        self.coordinator.draft_tx.send_replace(String::new());
    }
}

impl SubmissionCoordinator {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        session: watch::Receiver<SessionStatus>,
        synchronizer: Arc<LedgerSynchronizer>,
        notifier: Notifier,
        config: &Submission,
    ) -> Self {
        let (status_tx, _) = watch::channel(SubmissionStatus::Idle);
        let (draft_tx, _) = watch::channel(String::new());
        Self {
            client,
            session,
            synchronizer,
            notifier,
            gas_limit: config.gas_limit,
            resync_on_confirm: config.resync_on_confirm,
            status_tx,
            draft_tx,
        }
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status_tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SubmissionStatus> {
        self.status_tx.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.status_tx.borrow().is_busy()
    }

    /// Replaces the pending input buffer.
    pub fn set_draft(&self, text: impl Into<String>) {
        self.draft_tx.send_replace(text.into());
    }

    pub fn draft(&self) -> String {
        self.draft_tx.borrow().clone()
    }

    pub fn watch_draft(&self) -> watch::Receiver<String> {
        self.draft_tx.subscribe()
    }

    /// Submits whatever is currently in the input buffer.
    pub async fn submit_draft(&self) -> Result<Confirmation, SubmitError> {
        let text = self.draft();
        self.submit_message(&text).await
    }

    /// Sends `text` to the ledger and waits for its confirmation.
    ///
    /// Rejected with [`SubmitError::NotConnected`] outside a connected session and
    /// with [`SubmitError::InFlight`] while another submission is pending; neither
    /// rejection alters the coordinator's state. Failures are not retried.
    pub async fn submit_message(&self, text: &str) -> Result<Confirmation, SubmitError> {
        if !self.session.borrow().is_connected() {
            return Err(self.reject(SubmitError::NotConnected));
        }

        let claimed = self.status_tx.send_if_modified(|status| {
            if *status == SubmissionStatus::Idle {
                *status = SubmissionStatus::Submitting;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(self.reject(SubmitError::InFlight));
        }

        let guard = InFlightGuard { coordinator: self };
        let outcome = self.dispatch(text).await;
        drop(guard);

        match outcome {
            Ok(confirmation) => {
                if self.resync_on_confirm {
                    if let Err(e) = self.synchronizer.refresh().await {
                        self.notifier.report(NoticeKind::Synchronization, &e);
                    }
                }
                Ok(confirmation)
            }
            Err(e) => {
                self.notifier.report(NoticeKind::Submission, &e);
                Err(e.into())
            }
        }
    }

    async fn dispatch(&self, message: &str) -> Result<Confirmation, LedgerError> {
        let handle = self.client.submit(message, self.gas_limit).await?;
        tracing::info!(%handle, "Waiting for the wave to be confirmed...");
        self.status_tx
            .send_replace(SubmissionStatus::Confirming(PendingSubmission {
                handle: handle.clone(),
                dispatched_at: Utc::now(),
            }));

        let confirmation = self.client.await_confirmation(&handle).await?;
        tracing::info!(%handle, "Wave confirmed");
        Ok(confirmation)
    }

    fn reject(&self, error: SubmitError) -> SubmitError {
        self.notifier.report(NoticeKind::Submission, &error);
        error
    }
}
