//! # Record Subscription
//!
//! A [`RecordSubscription`] is the receiving end of the remote ledger's append
//! stream, each record stamped with its slot. Records arrive in the order the
//! remote source emits them. Records emitted before the consumer starts
//! reading are buffered in the channel.
//!
//! The subscription owns a cancel action that releases the remote listener. It
//! runs exactly once: on [`RecordSubscription::unsubscribe`] or, failing that,
//! when the subscription is dropped.

use crate::types::RemoteRecord;
use futures::Stream;
use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;

type CancelFn = Box<dyn FnOnce() + Send + 'static>;

pub struct RecordSubscription {
    records_rx: mpsc::Receiver<RemoteRecord>,
    /// This is an `Option` so the cancel action can be taken exactly once.
    cancel: Option<CancelFn>,
}

impl RecordSubscription {
    /// Wraps a record channel and the action that tears down its producer.
    pub fn new(
        records_rx: mpsc::Receiver<RemoteRecord>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            records_rx,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Receives the next record. Returns `None` once the producer has gone away.
    pub async fn next_record(&mut self) -> Option<RemoteRecord> {
        self.records_rx.recv().await
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    /// Manually cancels the subscription, consuming it.
    ///
    /// The automatic `Drop` implementation will not cancel a second time.
    pub fn unsubscribe(mut self) {
        self.cancel_once("manual");
    }

    fn cancel_once(&mut self, reason: &str) {
        if let Some(cancel) = self.cancel.take() {
            tracing::debug!(reason, "Cancelling record subscription");
            self.records_rx.close();
            cancel();
        }
    }
}

impl Stream for RecordSubscription {
    type Item = RemoteRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.records_rx.poll_recv(cx)
    }
}

impl fmt::Debug for RecordSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSubscription")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for RecordSubscription {
    fn drop(&mut self) {
        self.cancel_once("drop");
    }
}
