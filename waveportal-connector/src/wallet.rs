//! Wallet providers: account discovery and transaction signing.

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
    transaction::Transaction,
};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("the request was declined")]
    Declined,

    #[error("signing failed: {0}")]
    Signing(String),
}

/// A wallet capable of exposing accounts and signing transactions for them.
///
/// `accounts` never prompts; `request_accounts` may ask the user and can be declined.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Whether the wallet is usable at all.
    fn is_available(&self) -> bool;

    /// Accounts already authorized for this client.
    async fn accounts(&self) -> Result<Vec<Pubkey>, WalletError>;

    /// Interactively asks for account access.
    async fn request_accounts(&self) -> Result<Vec<Pubkey>, WalletError>;

    /// Signs `transaction` with the key of `account`.
    async fn sign_transaction(
        &self,
        account: &Pubkey,
        transaction: &mut Transaction,
        recent_blockhash: Hash,
    ) -> Result<(), WalletError>;
}

/// A wallet backed by a single keypair file, as produced by `solana-keygen`.
///
/// A readable keypair counts as pre-authorized, so silent discovery already
/// returns its account.
pub struct KeypairWallet {
    keypair: Option<Keypair>,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Some(keypair),
        }
    }

    /// Loads the keypair at `path`. An unreadable file yields an unavailable wallet.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match read_keypair_file(path) {
            Ok(keypair) => {
                tracing::info!(account = %keypair.pubkey(), "Loaded wallet keypair from {}", path.display());
                Self::new(keypair)
            }
            Err(e) => {
                tracing::warn!("Failed to read keypair file {}: {}", path.display(), e);
                Self { keypair: None }
            }
        }
    }

    fn pubkeys(&self) -> Vec<Pubkey> {
        self.keypair.iter().map(|k| k.pubkey()).collect()
    }
}

#[async_trait]
impl WalletProvider for KeypairWallet {
    fn is_available(&self) -> bool {
        self.keypair.is_some()
    }

    async fn accounts(&self) -> Result<Vec<Pubkey>, WalletError> {
        Ok(self.pubkeys())
    }

    async fn request_accounts(&self) -> Result<Vec<Pubkey>, WalletError> {
        match self.pubkeys() {
            accounts if accounts.is_empty() => Err(WalletError::Declined),
            accounts => Ok(accounts),
        }
    }

    async fn sign_transaction(
        &self,
        account: &Pubkey,
        transaction: &mut Transaction,
        recent_blockhash: Hash,
    ) -> Result<(), WalletError> {
        let keypair = self
            .keypair
            .as_ref()
            .filter(|k| k.pubkey() == *account)
            .ok_or(WalletError::Declined)?;
        transaction
            .try_sign(&[keypair], recent_blockhash)
            .map_err(|e| WalletError::Signing(e.to_string()))
    }
}
