//! # On-chain Wire Format
//!
//! Borsh layouts of the portal contract's state account, its `wave` instruction
//! and its `NewWave` event, plus the parser that extracts events from
//! transaction logs. Discriminators follow the Anchor convention: the first
//! eight bytes of `sha256("<namespace>:<Name>")`.

use crate::error::LedgerError;
use crate::types::Record;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use borsh::{BorshDeserialize, BorshSerialize};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

const PROGRAM_DATA_PREFIX: &str = "Program data: ";

/// Seed of the program-derived account holding the portal state.
pub const PORTAL_STATE_SEED: &[u8] = b"wave_portal";

/// Computes an Anchor-style 8-byte discriminator.
pub fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

/// A single wave as stored in the portal state account.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct WaveEntry {
    pub waver: [u8; 32],
    pub message: String,
    pub timestamp: i64,
}

/// The portal state account body (after its discriminator).
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PortalState {
    pub total_waves: u64,
    pub waves: Vec<WaveEntry>,
}

impl PortalState {
    /// Decodes raw account data. Bytes past the encoded state (unused allocation) are ignored.
    pub fn from_account_data(data: &[u8]) -> Result<Self, LedgerError> {
        let disc = discriminator("account", "WavePortal");
        let body = data.strip_prefix(&disc[..]).ok_or_else(|| {
            LedgerError::RemoteRead("account is not a wave portal state".to_string())
        })?;
        let mut cursor = body;
        PortalState::deserialize(&mut cursor)
            .map_err(|e| LedgerError::RemoteRead(format!("malformed portal state: {e}")))
    }

    pub fn to_account_data(&self) -> Result<Vec<u8>, LedgerError> {
        let mut data = discriminator("account", "WavePortal").to_vec();
        self.serialize(&mut data)
            .map_err(|e| LedgerError::RemoteRead(e.to_string()))?;
        Ok(data)
    }

    pub fn records(&self) -> Result<Vec<Record>, LedgerError> {
        self.waves
            .iter()
            .map(|wave| {
                to_record(wave.waver, &wave.message, wave.timestamp).ok_or_else(|| {
                    LedgerError::RemoteRead(format!(
                        "wave timestamp {} is out of range",
                        wave.timestamp
                    ))
                })
            })
            .collect()
    }
}

/// The `NewWave(waver, timestamp, message)` event emitted by the portal contract.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct NewWave {
    pub waver: [u8; 32],
    pub timestamp: i64,
    pub message: String,
}

impl NewWave {
    pub fn to_record(&self) -> Option<Record> {
        to_record(self.waver, &self.message, self.timestamp)
    }

    /// Encodes the event the way the contract emits it, as a `Program data:` log line.
    pub fn to_log(&self) -> String {
        let mut data = discriminator("event", "NewWave").to_vec();
        // Writing into a Vec cannot fail.
        let _ = self.serialize(&mut data);
        format!("{PROGRAM_DATA_PREFIX}{}", BASE64.encode(data))
    }
}

/// Arguments of the contract's `wave` instruction.
#[derive(Debug, Clone, BorshSerialize)]
pub struct WaveArgs {
    pub message: String,
}

impl WaveArgs {
    pub fn data(&self) -> Vec<u8> {
        let mut data = discriminator("global", "wave").to_vec();
        let _ = self.serialize(&mut data);
        data
    }
}

fn to_record(waver: [u8; 32], message: &str, timestamp: i64) -> Option<Record> {
    let occurred_at = DateTime::<Utc>::from_timestamp(timestamp, 0)?;
    Some(Record {
        author: Pubkey::new_from_array(waver).to_string(),
        message: message.to_string(),
        occurred_at,
    })
}

/// Attempts to decode a `NewWave` event from a single transaction log line.
///
/// Returns `None` for any line that is not a `Program data:` entry carrying a
/// `NewWave` payload, so callers can feed it every log of a transaction.
pub fn try_parse_log(log: &str) -> Option<NewWave> {
    let data_str = log.strip_prefix(PROGRAM_DATA_PREFIX)?;
    let bytes = BASE64.decode(data_str.trim()).ok()?;
    let disc = discriminator("event", "NewWave");
    let mut body = bytes.strip_prefix(&disc[..])?;
    NewWave::deserialize(&mut body).ok()
}
