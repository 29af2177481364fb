#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use solana_sdk::commitment_config::CommitmentLevel;

/// The top-level configuration for the `waveportal-connector` library.
///
/// This struct aggregates all necessary settings, including Solana network endpoints,
/// the portal contract location and submission behavior. It is typically deserialized
/// from a configuration file and passed to [`crate::portal::WavePortal`] and
/// [`crate::client::SolanaLedgerClient`] upon initialization.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub struct ConnectorConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub solana: Solana,
    #[cfg_attr(feature = "serde", serde(default))]
    pub portal: Portal,
    #[cfg_attr(feature = "serde", serde(default))]
    pub submission: Submission,
    #[cfg_attr(feature = "serde", serde(default))]
    pub channels: ChannelConfig,
}

/// Defines the connection settings for the Solana cluster.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct Solana {
    pub rpc_url: String,
    pub ws_url: String,
    #[cfg_attr(feature = "serde", serde(with = "serde_commitment"))]
    pub commitment: CommitmentLevel,
}

/// Locates the portal contract and the wallet used to sign for it.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub struct Portal {
    /// Base58 program id of the portal contract. When absent, every contract
    /// operation fails with `ContractNotConfigured` instead of reaching the cluster.
    #[cfg_attr(feature = "serde", serde(default))]
    pub contract_address: Option<String>,
    /// Path to a keypair file acting as the wallet. When absent, no wallet
    /// provider is available.
    #[cfg_attr(feature = "serde", serde(default))]
    pub keypair_path: Option<String>,
}

/// Defines behavior for outbound writes handled by the `SubmissionCoordinator`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct Submission {
    /// The compute-unit ceiling attached to every `wave` transaction.
    pub gas_limit: u32,
    /// How long to wait for a dispatched transaction before reporting a timeout.
    pub confirmation_timeout_secs: u64,
    /// The interval in milliseconds between signature status polls.
    pub poll_interval_ms: u64,
    /// Re-read the whole ledger after each confirmed submission, in addition
    /// to the event stream.
    pub resync_on_confirm: bool,
}

/// Defines capacities for the MPSC and broadcast channels within the connector.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct ChannelConfig {
    /// The buffer capacity for a record subscription's channel.
    pub record_buffer: usize,
    /// The buffer capacity for the notice broadcast channel.
    pub notice_buffer: usize,
}

impl Default for Solana {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8899".to_string(),
            ws_url: "ws://127.0.0.1:8900".to_string(),
            commitment: CommitmentLevel::Confirmed,
        }
    }
}

impl Default for Submission {
    fn default() -> Self {
        Self {
            gas_limit: 300_000,
            confirmation_timeout_secs: 60,
            poll_interval_ms: 500,
            resync_on_confirm: false,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            record_buffer: 256,
            notice_buffer: 64,
        }
    }
}

#[cfg(feature = "serde")]
mod serde_commitment {

    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(c: &CommitmentLevel, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = match c {
            CommitmentLevel::Processed => "processed",
            CommitmentLevel::Confirmed => "confirmed",
            CommitmentLevel::Finalized => "finalized",
        };
        serializer.serialize_str(s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<CommitmentLevel, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "processed" => Ok(CommitmentLevel::Processed),
            "confirmed" => Ok(CommitmentLevel::Confirmed),
            "finalized" => Ok(CommitmentLevel::Finalized),
            other => Err(serde::de::Error::custom(format!(
                "unknown commitment level '{other}'"
            ))),
        }
    }
}
