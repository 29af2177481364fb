//! A Rust library for keeping a local view of a wave portal contract in sync.
//!
//! The connector establishes a wallet session, mediates reads and writes against
//! the remote contract, and reconciles the local ledger view with on-chain events
//! and transaction confirmations.
//!
//! # Key Components
//!
//! *   [`client::LedgerClient`]: The typed boundary to the wallet and contract, with
//!     [`client::SolanaLedgerClient`] as the production implementation.
//! *   [`session::SessionStateMachine`]: Connection status and the connected account.
//! *   [`synchronizer::LedgerSynchronizer`]: Snapshot plus incremental event updates.
//! *   [`coordinator::SubmissionCoordinator`]: One outbound write at a time.
//! *   [`portal::WavePortal`]: The facade wiring all of the above together.
pub mod client;
/// Defines configuration structures for the connector.
pub mod config;
pub mod coordinator;
pub mod error;
/// Borsh layouts of the portal contract and the log parser for its events.
pub mod events;
/// The cancellable stream of newly appended remote records.
pub mod listener;
/// The WebSocket worker feeding record subscriptions.
mod live;
pub mod notice;
pub mod portal;
pub mod session;
pub mod synchronizer;
pub mod types;
pub mod wallet;

pub use client::{LedgerClient, SolanaLedgerClient};
pub use error::{LedgerError, SubmitError};
pub use portal::WavePortal;
pub use types::{
    AccountIdentity, Confirmation, LedgerSnapshot, Record, RemoteRecord, TransactionHandle,
};
