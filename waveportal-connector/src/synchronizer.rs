//! # Ledger Synchronizer
//!
//! Keeps the local ledger view consistent with the remote portal contract using
//! a full snapshot followed by incremental appends from the record subscription.
//!
//! ## Ordering
//!
//! `initialize` subscribes *before* reading the snapshot, and only starts
//! draining the subscription once the snapshot has replaced the view. Records
//! emitted while the snapshot is in flight wait in the subscription's channel
//! and are applied afterwards, in emission order.
//!
//! A record whose slot is at or below the slot of the last full read is already
//! in the view and is skipped. This is a position check, not a content check:
//! identical messages from later slots are still appended.
//!
//! ## Ownership
//!
//! The synchronizer is the only writer of the view. Readers get snapshots from a
//! `watch` channel, so a record append and the matching count increment become
//! visible together.

use crate::{
    client::LedgerClient,
    error::LedgerError,
    listener::RecordSubscription,
    types::{LedgerSnapshot, Record, RemoteRecord},
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
};

/// Whether the view is being loaded or kept live by the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Stopped,
    Loading,
    Live,
}

/// The background task applying subscription records to the view.
struct LivePump {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct LedgerSynchronizer {
    client: Arc<dyn LedgerClient>,
    view_tx: Arc<watch::Sender<LedgerSnapshot>>,
    status_tx: Arc<watch::Sender<SyncStatus>>,
    /// Serializes `initialize` and `refresh`.
    load_lock: tokio::sync::Mutex<()>,
    pump: Mutex<Option<LivePump>>,
}

impl LedgerSynchronizer {
    pub fn new(client: Arc<dyn LedgerClient>) -> Self {
        let (view_tx, _) = watch::channel(LedgerSnapshot::default());
        let (status_tx, _) = watch::channel(SyncStatus::Stopped);
        Self {
            client,
            view_tx: Arc::new(view_tx),
            status_tx: Arc::new(status_tx),
            load_lock: tokio::sync::Mutex::new(()),
            pump: Mutex::new(None),
        }
    }

    /// A copy of the current view.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.view_tx.borrow().clone()
    }

    /// Observes every change of the view.
    pub fn watch(&self) -> watch::Receiver<LedgerSnapshot> {
        self.view_tx.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        *self.status_tx.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Loads the full remote ledger and starts following its append stream.
    ///
    /// The session is the only caller in the connector and invokes it right after
    /// entering `Connected`; the synchronizer itself does not check the session.
    /// On failure the previous view, and any subscription already feeding it, are
    /// left untouched.
    pub async fn initialize(&self) -> Result<(), LedgerError> {
        let _guard = self.load_lock.lock().await;
        let previous = self.status_tx.send_replace(SyncStatus::Loading);

        let subscription = match self.client.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.status_tx.send_replace(previous);
                return Err(e);
            }
        };

        let snapshot = match self.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                subscription.unsubscribe();
                self.status_tx.send_replace(previous);
                return Err(e);
            }
        };

        self.stop_pump().await;
        tracing::info!(records = snapshot.len(), "Ledger snapshot loaded");
        self.view_tx.send_replace(snapshot);
        self.start_pump(subscription);
        self.status_tx.send_replace(SyncStatus::Live);
        Ok(())
    }

    /// Re-reads the whole ledger and replaces the view, leaving the subscription alone.
    pub async fn refresh(&self) -> Result<(), LedgerError> {
        let _guard = self.load_lock.lock().await;
        let snapshot = self.fetch_snapshot().await?;
        tracing::debug!(records = snapshot.len(), "Ledger view refreshed");
        self.view_tx.send_replace(snapshot);
        Ok(())
    }

    /// Appends one remote record to the view and bumps the count in the same update.
    pub fn on_remote_record(&self, record: Record) {
        append_record(&self.view_tx, record);
    }

    /// Stops following the remote ledger, releasing the subscription.
    ///
    /// The view keeps its last contents.
    pub async fn stop(&self) {
        self.stop_pump().await;
        self.status_tx.send_replace(SyncStatus::Stopped);
    }

    async fn fetch_snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        self.client.read_snapshot().await
    }

    fn lock_pump(&self) -> MutexGuard<'_, Option<LivePump>> {
        self.pump.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_pump(&self, subscription: RecordSubscription) {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_pump(
            subscription,
            self.view_tx.clone(),
            self.status_tx.clone(),
            stop_rx,
        ));
        *self.lock_pump() = Some(LivePump { stop_tx, task });
    }

    async fn stop_pump(&self) {
        let pump = self.lock_pump().take();
        if let Some(LivePump { stop_tx, task }) = pump {
            let _ = stop_tx.send(());
            if let Err(e) = task.await {
                tracing::error!("Ledger pump task failed: {}", e);
            }
        }
    }
}

impl Drop for LedgerSynchronizer {
    fn drop(&mut self) {
        if let Some(pump) = self.lock_pump().take() {
            // The pump releases its subscription on the way out.
            let _ = pump.stop_tx.send(());
        }
    }
}

fn append_record(view: &watch::Sender<LedgerSnapshot>, record: Record) {
    view.send_modify(|snapshot| {
        snapshot.records.push(record);
        snapshot.total += 1;
    });
}

/// Appends a subscription record unless the last full read already covers its slot.
/// The check and the append happen under the same view update.
fn apply_remote(view: &watch::Sender<LedgerSnapshot>, remote: RemoteRecord) -> bool {
    view.send_if_modified(|snapshot| {
        if snapshot.contains_slot(remote.slot) {
            return false;
        }
        snapshot.records.push(remote.record);
        snapshot.total += 1;
        true
    })
}

async fn run_pump(
    mut subscription: RecordSubscription,
    view: Arc<watch::Sender<LedgerSnapshot>>,
    status: Arc<watch::Sender<SyncStatus>>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            next = subscription.next_record() => match next {
                Some(remote) => {
                    let slot = remote.slot;
                    if apply_remote(&view, remote) {
                        tracing::debug!(slot, "Applied remote record");
                    } else {
                        tracing::debug!(slot, "Skipping record already in the snapshot");
                    }
                }
                None => {
                    tracing::warn!("Record stream ended; the ledger view is no longer live");
                    status.send_replace(SyncStatus::Stopped);
                    break;
                }
            },
        }
    }
    subscription.unsubscribe();
}
