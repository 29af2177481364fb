//! User-visible reports of recoverable failures.

use std::fmt;
use tokio::sync::broadcast;

/// Which part of the connector raised a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Connection,
    Synchronization,
    Submission,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

/// Broadcasts notices to every interested observer.
///
/// Reporting never fails: with no observers the notice is only logged.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn report(&self, kind: NoticeKind, error: &dyn fmt::Display) {
        let notice = Notice {
            kind,
            message: error.to_string(),
        };
        tracing::warn!(kind = ?notice.kind, "{}", notice.message);
        let _ = self.tx.send(notice);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(16)
    }
}
