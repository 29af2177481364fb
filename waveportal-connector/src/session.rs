//! # Session State Machine
//!
//! `Disconnected -> Connecting -> Connected(account)`. A failed attempt is
//! reported and drops straight back to `Disconnected`, so a retry simply
//! re-enters `Connecting`. The account identity only exists inside the
//! `Connected` state.

use crate::{
    client::LedgerClient,
    error::LedgerError,
    notice::{NoticeKind, Notifier},
    synchronizer::LedgerSynchronizer,
    types::AccountIdentity,
};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected(AccountIdentity),
}

impl SessionStatus {
    pub fn account(&self) -> Option<&AccountIdentity> {
        match self {
            SessionStatus::Connected(account) => Some(account),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, SessionStatus::Connected(_))
    }
}

pub struct SessionStateMachine {
    client: Arc<dyn LedgerClient>,
    synchronizer: Arc<LedgerSynchronizer>,
    notifier: Notifier,
    status_tx: watch::Sender<SessionStatus>,
    /// Serializes connection attempts so concurrent callers never prompt twice.
    connect_lock: tokio::sync::Mutex<()>,
}

impl SessionStateMachine {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        synchronizer: Arc<LedgerSynchronizer>,
        notifier: Notifier,
    ) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Disconnected);
        Self {
            client,
            synchronizer,
            notifier,
            status_tx,
            connect_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status_tx.borrow().clone()
    }

    pub fn account(&self) -> Option<AccountIdentity> {
        self.status_tx.borrow().account().cloned()
    }

    pub fn watch(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// Connects the wallet session, or returns the current account if already connected.
    ///
    /// Entering `Connected` initializes the ledger synchronizer. A synchronization
    /// failure is reported but does not undo the connection.
    pub async fn connect(&self) -> Result<AccountIdentity, LedgerError> {
        let _guard = self.connect_lock.lock().await;

        if let Some(account) = self.account() {
            tracing::debug!(%account, "Session already connected");
            return Ok(account);
        }

        self.status_tx.send_replace(SessionStatus::Connecting);
        match self.discover_account().await {
            Ok(account) => {
                tracing::info!(%account, "Wallet session connected");
                self.status_tx
                    .send_replace(SessionStatus::Connected(account.clone()));
                if let Err(e) = self.synchronizer.initialize().await {
                    self.notifier.report(NoticeKind::Synchronization, &e);
                }
                Ok(account)
            }
            Err(e) => {
                self.status_tx.send_replace(SessionStatus::Disconnected);
                self.notifier.report(NoticeKind::Connection, &e);
                Err(e)
            }
        }
    }

    /// Tears the session down: synchronization stops and the account is forgotten.
    pub async fn close(&self) {
        let _guard = self.connect_lock.lock().await;
        self.synchronizer.stop().await;
        if self.status_tx.send_replace(SessionStatus::Disconnected).is_connected() {
            tracing::info!("Wallet session closed");
        }
    }

    async fn discover_account(&self) -> Result<AccountIdentity, LedgerError> {
        if !self.client.has_provider() {
            return Err(LedgerError::ProviderUnavailable);
        }
        self.client
            .request_accounts(true)
            .await?
            .into_iter()
            .next()
            .ok_or(LedgerError::UserRejected)
    }
}
