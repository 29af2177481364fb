use chrono::{DateTime, Utc};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The address of a connected wallet account.
///
/// Opaque to the connector: it is only compared, displayed and used as a record author.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AccountIdentity(String);

impl AccountIdentity {
    /// Wraps an address, refusing empty or blank strings.
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        if address.trim().is_empty() {
            None
        } else {
            Some(Self(address))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One authored entry of the remote ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Record {
    pub author: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Identifies an in-flight transaction (a base58 signature for the Solana backend).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TransactionHandle(pub String);

impl fmt::Display for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Proof that a dispatched transaction landed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Confirmation {
    pub handle: TransactionHandle,
    pub confirmed_at: DateTime<Utc>,
}

/// A record delivered by a subscription, stamped with the slot it landed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub slot: u64,
    pub record: Record,
}

/// A point-in-time copy of the local ledger view.
///
/// `records.len()` and `total` only ever change together, so a reader holding a
/// snapshot never observes them diverge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LedgerSnapshot {
    pub records: Vec<Record>,
    pub total: u64,
    /// Slot of the full read the view was last built from, when the backend
    /// reports one. Subscription records at or below it are already contained.
    #[cfg_attr(feature = "serde", serde(default))]
    pub read_slot: Option<u64>,
}

impl LedgerSnapshot {
    /// Builds a snapshot from a full read. A reported count that disagrees with
    /// the records is logged and replaced by the record count.
    pub fn from_remote(records: Vec<Record>, reported_total: u64, read_slot: Option<u64>) -> Self {
        if reported_total != records.len() as u64 {
            tracing::warn!(
                reported = reported_total,
                fetched = records.len(),
                "Remote count disagrees with the fetched records; using the record list"
            );
        }
        Self {
            total: records.len() as u64,
            records,
            read_slot,
        }
    }

    /// Whether a subscription record from `slot` is already part of this view.
    pub fn contains_slot(&self, slot: u64) -> bool {
        self.read_slot.is_some_and(|read| slot <= read)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }
}
