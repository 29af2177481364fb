#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::sync::{mpsc, oneshot, watch, Notify};
use waveportal_connector::{
    listener::RecordSubscription, AccountIdentity, Confirmation, LedgerClient, LedgerError,
    LedgerSnapshot, Record, RemoteRecord, TransactionHandle,
};

pub fn account(address: &str) -> AccountIdentity {
    AccountIdentity::new(address).expect("non-empty address")
}

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).expect("valid timestamp")
}

pub fn record(author: &str, message: &str, secs: i64) -> Record {
    Record {
        author: author.to_string(),
        message: message.to_string(),
        occurred_at: at(secs),
    }
}

/// Waits until the view holds exactly `len` records.
pub async fn wait_for_len(rx: &mut watch::Receiver<LedgerSnapshot>, len: usize) -> LedgerSnapshot {
    let snapshot = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|v| v.len() == len))
        .await
        .expect("timed out waiting for the ledger view")
        .expect("ledger view sender dropped")
        .clone();
    snapshot
}

/// An in-memory stand-in for the wallet and the portal contract.
///
/// Every behaviour is scripted through its public fields; calls are counted so
/// tests can assert on prompts, reads, submissions and cancellations.
pub struct MockLedger {
    pub provider: bool,
    pub silent_accounts: Mutex<Vec<AccountIdentity>>,
    pub interactive_accounts: Mutex<Result<Vec<AccountIdentity>, LedgerError>>,
    pub records: Mutex<Result<Vec<Record>, LedgerError>>,
    pub count: Mutex<Option<u64>>,
    pub submit_result: Mutex<Result<TransactionHandle, LedgerError>>,
    pub confirm_result: Mutex<Result<(), LedgerError>>,
    /// When set, `read_all` waits for this signal before answering.
    pub read_gate: Mutex<Option<oneshot::Receiver<()>>>,
    /// When set, `await_confirmation` waits for this signal before answering.
    pub confirm_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub subscribed: Notify,
    /// The slot reported by snapshot reads.
    pub slot: AtomicU64,

    pub prompts: AtomicUsize,
    pub reads: AtomicUsize,
    pub submissions: Mutex<Vec<(String, u32)>>,
    pub cancellations: Arc<AtomicUsize>,
    subscribers: Mutex<Vec<mpsc::Sender<RemoteRecord>>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            provider: true,
            silent_accounts: Mutex::new(Vec::new()),
            interactive_accounts: Mutex::new(Ok(vec![account("0xABC")])),
            records: Mutex::new(Ok(Vec::new())),
            count: Mutex::new(None),
            submit_result: Mutex::new(Ok(TransactionHandle("0xTX".to_string()))),
            confirm_result: Mutex::new(Ok(())),
            read_gate: Mutex::new(None),
            confirm_gate: Mutex::new(None),
            subscribed: Notify::new(),
            slot: AtomicU64::new(0),
            prompts: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
            cancellations: Arc::new(AtomicUsize::new(0)),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn without_provider() -> Self {
        Self {
            provider: false,
            ..Self::new()
        }
    }

    pub fn with_records(self, records: Vec<Record>) -> Self {
        *self.records.lock().unwrap() = Ok(records);
        self
    }

    pub fn set_records(&self, records: Result<Vec<Record>, LedgerError>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn set_slot(&self, slot: u64) {
        self.slot.store(slot, Ordering::SeqCst);
    }

    pub fn gate_reads(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.read_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn gate_confirmation(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.confirm_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }

    pub fn subscriptions(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    /// Emits a `NewWave` on the most recent subscription, from the slot after
    /// the one snapshot reads currently report.
    pub async fn emit(&self, record: Record) {
        let slot = self.slot.load(Ordering::SeqCst) + 1;
        self.emit_at(slot, record).await;
    }

    /// Emits a `NewWave` from `slot` on the most recent subscription.
    pub async fn emit_at(&self, slot: u64, record: Record) {
        let latest = self.subscriptions().checked_sub(1).expect("no subscription");
        self.send_to(latest, RemoteRecord { slot, record }).await;
    }

    /// Emits a `NewWave` on the `index`-th subscription ever opened.
    pub async fn emit_to(&self, index: usize, record: Record) {
        let slot = self.slot.load(Ordering::SeqCst) + 1;
        self.send_to(index, RemoteRecord { slot, record }).await;
    }

    async fn send_to(&self, index: usize, remote: RemoteRecord) {
        let tx = self.subscribers.lock().unwrap()[index].clone();
        tx.send(remote).await.expect("subscription receiver dropped");
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    fn has_provider(&self) -> bool {
        self.provider
    }

    async fn request_accounts(
        &self,
        force_interactive: bool,
    ) -> Result<Vec<AccountIdentity>, LedgerError> {
        if !self.provider {
            return Err(LedgerError::ProviderUnavailable);
        }
        let silent = self.silent_accounts.lock().unwrap().clone();
        if !silent.is_empty() || !force_interactive {
            return Ok(silent);
        }
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.interactive_accounts.lock().unwrap().clone()
    }

    async fn read_all(&self) -> Result<Vec<Record>, LedgerError> {
        let gate = self.read_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().clone()
    }

    async fn read_count(&self) -> Result<u64, LedgerError> {
        if let Some(count) = *self.count.lock().unwrap() {
            return Ok(count);
        }
        self.records
            .lock()
            .unwrap()
            .as_ref()
            .map(|records| records.len() as u64)
            .map_err(Clone::clone)
    }

    async fn read_snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let records = self.read_all().await?;
        let total = self.read_count().await?;
        let slot = self.slot.load(Ordering::SeqCst);
        Ok(LedgerSnapshot::from_remote(records, total, Some(slot)))
    }

    async fn submit(
        &self,
        message: &str,
        gas_limit: u32,
    ) -> Result<TransactionHandle, LedgerError> {
        self.submissions
            .lock()
            .unwrap()
            .push((message.to_string(), gas_limit));
        self.submit_result.lock().unwrap().clone()
    }

    async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> Result<Confirmation, LedgerError> {
        let gate = self.confirm_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.confirm_result
            .lock()
            .unwrap()
            .clone()
            .map(|()| Confirmation {
                handle: handle.clone(),
                confirmed_at: Utc::now(),
            })
    }

    async fn subscribe(&self) -> Result<RecordSubscription, LedgerError> {
        let (tx, rx) = mpsc::channel(64);
        self.subscribers.lock().unwrap().push(tx);
        self.subscribed.notify_one();
        let cancellations = self.cancellations.clone();
        Ok(RecordSubscription::new(rx, move || {
            cancellations.fetch_add(1, Ordering::SeqCst);
        }))
    }
}
