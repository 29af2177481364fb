use thiserror::Error;

/// Failures at the wallet and contract boundary.
///
/// Every variant is recoverable: callers report it and carry on at the session
/// or submission granularity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("no wallet provider is available")]
    ProviderUnavailable,

    #[error("the account request was rejected by the user")]
    UserRejected,

    #[error("the portal contract address is not configured")]
    ContractNotConfigured,

    #[error("remote read failed: {0}")]
    RemoteRead(String),

    #[error("remote write failed: {0}")]
    RemoteWrite(String),

    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("transaction {signature} reverted: {reason}")]
    TransactionReverted { signature: String, reason: String },

    #[error("transaction {0} was not confirmed in time")]
    TransactionTimeout(String),
}

/// Reasons a `submit_message` call did not reach the ledger, or failed once it did.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a submission is already in flight")]
    InFlight,

    #[error("no wallet session is connected")]
    NotConnected,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
