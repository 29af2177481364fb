//! # Wave Portal
//!
//! [`WavePortal`] wires the session, synchronizer and coordinator around one
//! shared [`LedgerClient`] and is the surface a presentation layer consumes:
//! two intents (`connect`, `submit_message`) plus read-only observers.
//!
//! It is cheap to clone; all clones drive the same underlying components.

use crate::{
    client::{LedgerClient, SolanaLedgerClient},
    config::ConnectorConfig,
    coordinator::{SubmissionCoordinator, SubmissionStatus},
    error::{LedgerError, SubmitError},
    notice::{Notice, Notifier},
    session::{SessionStateMachine, SessionStatus},
    synchronizer::{LedgerSynchronizer, SyncStatus},
    types::{AccountIdentity, Confirmation, LedgerSnapshot},
};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

#[derive(Clone)]
pub struct WavePortal {
    session: Arc<SessionStateMachine>,
    synchronizer: Arc<LedgerSynchronizer>,
    coordinator: Arc<SubmissionCoordinator>,
    notifier: Notifier,
}

impl WavePortal {
    /// Creates a portal over an arbitrary ledger client.
    pub fn new(client: Arc<dyn LedgerClient>, config: &ConnectorConfig) -> Self {
        let notifier = Notifier::new(config.channels.notice_buffer);
        let synchronizer = Arc::new(LedgerSynchronizer::new(client.clone()));
        let session = Arc::new(SessionStateMachine::new(
            client.clone(),
            synchronizer.clone(),
            notifier.clone(),
        ));
        let coordinator = Arc::new(SubmissionCoordinator::new(
            client,
            session.watch(),
            synchronizer.clone(),
            notifier.clone(),
            &config.submission,
        ));

        Self {
            session,
            synchronizer,
            coordinator,
            notifier,
        }
    }

    /// Creates a portal backed by a [`SolanaLedgerClient`] built from `config`.
    pub fn from_config(config: Arc<ConnectorConfig>) -> Self {
        let client = Arc::new(SolanaLedgerClient::from_config(config.clone()));
        Self::new(client, &config)
    }

    pub async fn connect(&self) -> Result<AccountIdentity, LedgerError> {
        self.session.connect().await
    }

    pub async fn submit_message(&self, text: &str) -> Result<Confirmation, SubmitError> {
        self.coordinator.submit_message(text).await
    }

    pub async fn submit_draft(&self) -> Result<Confirmation, SubmitError> {
        self.coordinator.submit_draft().await
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.coordinator.set_draft(text);
    }

    pub fn draft(&self) -> String {
        self.coordinator.draft()
    }

    pub fn session_status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn account(&self) -> Option<AccountIdentity> {
        self.session.account()
    }

    pub fn ledger_view(&self) -> LedgerSnapshot {
        self.synchronizer.snapshot()
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.synchronizer.status()
    }

    pub fn submission_status(&self) -> SubmissionStatus {
        self.coordinator.status()
    }

    pub fn is_loading(&self) -> bool {
        self.coordinator.is_loading()
    }

    pub fn watch_session(&self) -> watch::Receiver<SessionStatus> {
        self.session.watch()
    }

    pub fn watch_ledger(&self) -> watch::Receiver<LedgerSnapshot> {
        self.synchronizer.watch()
    }

    pub fn watch_submission(&self) -> watch::Receiver<SubmissionStatus> {
        self.coordinator.watch()
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notifier.subscribe()
    }

    /// Forces a full re-read of the remote ledger.
    pub async fn refresh(&self) -> Result<(), LedgerError> {
        self.synchronizer.refresh().await
    }

    /// Closes the session and releases the record subscription.
    pub async fn shutdown(&self) {
        self.session.close().await;
    }
}
