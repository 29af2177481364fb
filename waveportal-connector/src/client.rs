//! # Ledger Client
//!
//! This module isolates every call that crosses the wallet/contract boundary
//! behind the [`LedgerClient`] trait. The session, synchronizer and coordinator
//! only ever talk to a `dyn LedgerClient`, which makes it trivial to substitute
//! an in-memory double in tests.
//!
//! [`SolanaLedgerClient`] is the production implementation. It maps the portal
//! contract onto a Solana program:
//!
//! - `getAllWaves` / `getTotalWaves` read the program-derived state account.
//! - `wave(message, gasLimit)` sends a transaction carrying a compute-unit limit
//!   and the `wave` instruction, signed by the [`WalletProvider`].
//! - `NewWave` events are decoded from program logs streamed by a
//!   [`LiveRecordWorker`](crate::live::LiveRecordWorker).

use crate::{
    config::ConnectorConfig,
    error::LedgerError,
    events::{PortalState, WaveArgs, PORTAL_STATE_SEED},
    listener::RecordSubscription,
    live::LiveRecordWorker,
    types::{AccountIdentity, Confirmation, LedgerSnapshot, Record, TransactionHandle},
    wallet::{KeypairWallet, WalletError, WalletProvider},
};
use async_trait::async_trait;
use chrono::Utc;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    compute_budget::ComputeBudgetInstruction,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::Signature,
    system_program,
    transaction::Transaction,
};
use std::{str::FromStr, sync::Arc, time::Duration};
use tokio::sync::{mpsc, oneshot};

/// The typed surface over the wallet provider and the remote portal contract.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Whether a wallet-capable provider is present. Has no side effects.
    fn has_provider(&self) -> bool;

    /// Discovers accounts silently, then prompts when none were found and
    /// `force_interactive` is set.
    async fn request_accounts(
        &self,
        force_interactive: bool,
    ) -> Result<Vec<AccountIdentity>, LedgerError>;

    /// Fetches the full remote record set.
    async fn read_all(&self) -> Result<Vec<Record>, LedgerError>;

    /// Fetches the current total record count.
    async fn read_count(&self) -> Result<u64, LedgerError>;

    /// Fetches records and count as one snapshot.
    ///
    /// Backends that can tell the slot of the read should report it, so that
    /// subscription records already contained in the snapshot are not applied twice.
    async fn read_snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let records = self.read_all().await?;
        let total = self.read_count().await?;
        Ok(LedgerSnapshot::from_remote(records, total, None))
    }

    /// Dispatches a write and returns as soon as the transaction is in flight.
    async fn submit(&self, message: &str, gas_limit: u32)
        -> Result<TransactionHandle, LedgerError>;

    /// Suspends until the transaction lands, reverts or times out.
    async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> Result<Confirmation, LedgerError>;

    /// Opens an ordered stream of newly appended remote records.
    async fn subscribe(&self) -> Result<RecordSubscription, LedgerError>;
}

/// A [`LedgerClient`] for a portal program deployed on a Solana cluster.
pub struct SolanaLedgerClient {
    config: Arc<ConnectorConfig>,
    rpc_client: Arc<RpcClient>,
    wallet: Option<Arc<dyn WalletProvider>>,
    program_id: Option<Pubkey>,
}

impl SolanaLedgerClient {
    /// Creates a new `SolanaLedgerClient`.
    ///
    /// # Arguments
    ///
    /// * `config` - The shared connector configuration. The contract address is read
    ///   from `portal.contract-address`; an absent or malformed value disables
    ///   contract operations.
    /// * `rpc_client` - A shared Solana RPC client.
    /// * `wallet` - The wallet provider, if one is present in this environment.
    pub fn new(
        config: Arc<ConnectorConfig>,
        rpc_client: Arc<RpcClient>,
        wallet: Option<Arc<dyn WalletProvider>>,
    ) -> Self {
        let program_id = match config.portal.contract_address.as_deref() {
            Some(address) => match Pubkey::from_str(address) {
                Ok(pk) => Some(pk),
                Err(e) => {
                    tracing::error!("Invalid contract address '{}': {}", address, e);
                    None
                }
            },
            None => {
                tracing::warn!("No contract address configured; contract operations are disabled");
                None
            }
        };

        Self {
            config,
            rpc_client,
            wallet,
            program_id,
        }
    }

    /// Builds the RPC client and keypair wallet described by `config`.
    pub fn from_config(config: Arc<ConnectorConfig>) -> Self {
        let rpc_client = Arc::new(RpcClient::new_with_commitment(
            config.solana.rpc_url.clone(),
            CommitmentConfig {
                commitment: config.solana.commitment,
            },
        ));
        let wallet = config
            .portal
            .keypair_path
            .as_ref()
            .map(|path| Arc::new(KeypairWallet::from_file(path)) as Arc<dyn WalletProvider>);

        Self::new(config, rpc_client, wallet)
    }

    /// Derives the address of the account holding the portal state.
    pub fn portal_state_address(program_id: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(&[PORTAL_STATE_SEED], program_id).0
    }

    fn program_id(&self) -> Result<Pubkey, LedgerError> {
        self.program_id.ok_or(LedgerError::ContractNotConfigured)
    }

    fn wallet(&self) -> Result<&Arc<dyn WalletProvider>, LedgerError> {
        self.wallet
            .as_ref()
            .filter(|w| w.is_available())
            .ok_or(LedgerError::ProviderUnavailable)
    }

    fn commitment(&self) -> CommitmentConfig {
        CommitmentConfig {
            commitment: self.config.solana.commitment,
        }
    }

    /// Reads the portal state together with the slot it was observed at.
    async fn fetch_state(&self) -> Result<(u64, PortalState), LedgerError> {
        let program_id = self.program_id()?;
        let state_address = Self::portal_state_address(&program_id);
        let response = self
            .rpc_client
            .get_account_with_commitment(&state_address, self.commitment())
            .await
            .map_err(|e| LedgerError::RemoteRead(e.to_string()))?;
        let account = response.value.ok_or_else(|| {
            LedgerError::RemoteRead(format!("portal state account {state_address} not found"))
        })?;
        let state = PortalState::from_account_data(&account.data)?;
        Ok((response.context.slot, state))
    }

    fn build_instructions(
        program_id: Pubkey,
        waver: Pubkey,
        message: &str,
        gas_limit: u32,
    ) -> Vec<Instruction> {
        let wave = Instruction {
            program_id,
            accounts: vec![
                AccountMeta::new(Self::portal_state_address(&program_id), false),
                AccountMeta::new(waver, true),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data: WaveArgs {
                message: message.to_string(),
            }
            .data(),
        };

        vec![
            ComputeBudgetInstruction::set_compute_unit_limit(gas_limit),
            wave,
        ]
    }

    async fn poll_signature(&self, signature: &Signature) -> Result<(), LedgerError> {
        let interval = Duration::from_millis(self.config.submission.poll_interval_ms);
        loop {
            match self
                .rpc_client
                .get_signature_status_with_commitment(signature, self.commitment())
                .await
            {
                Ok(Some(Ok(()))) => return Ok(()),
                Ok(Some(Err(e))) => {
                    return Err(LedgerError::TransactionReverted {
                        signature: signature.to_string(),
                        reason: e.to_string(),
                    })
                }
                Ok(None) => tracing::trace!(%signature, "Transaction not yet confirmed"),
                Err(e) => tracing::warn!(%signature, "Failed to fetch signature status: {}", e),
            }
            tokio::time::sleep(interval).await;
        }
    }
}

fn rejected_by_wallet(err: WalletError) -> LedgerError {
    tracing::debug!("Wallet declined account access: {}", err);
    LedgerError::UserRejected
}

/// Network-level failures are write errors; anything the cluster or preflight
/// answered with is a rejection of the submission itself.
fn classify_send_error(err: ClientError) -> LedgerError {
    match err.kind() {
        ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => {
            LedgerError::RemoteWrite(err.to_string())
        }
        _ => LedgerError::SubmissionRejected(err.to_string()),
    }
}

#[async_trait]
impl LedgerClient for SolanaLedgerClient {
    fn has_provider(&self) -> bool {
        self.wallet().is_ok()
    }

    async fn request_accounts(
        &self,
        force_interactive: bool,
    ) -> Result<Vec<AccountIdentity>, LedgerError> {
        let wallet = self.wallet()?;
        let mut accounts = wallet.accounts().await.map_err(rejected_by_wallet)?;
        if accounts.is_empty() && force_interactive {
            tracing::info!("No authorized accounts, requesting access from the wallet");
            accounts = wallet.request_accounts().await.map_err(rejected_by_wallet)?;
        }
        Ok(accounts
            .iter()
            .filter_map(|pk| AccountIdentity::new(pk.to_string()))
            .collect())
    }

    async fn read_all(&self) -> Result<Vec<Record>, LedgerError> {
        self.fetch_state().await?.1.records()
    }

    async fn read_count(&self) -> Result<u64, LedgerError> {
        Ok(self.fetch_state().await?.1.total_waves)
    }

    async fn read_snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let (slot, state) = self.fetch_state().await?;
        tracing::debug!(slot, waves = state.waves.len(), "Portal state read");
        Ok(LedgerSnapshot::from_remote(
            state.records()?,
            state.total_waves,
            Some(slot),
        ))
    }

    async fn submit(
        &self,
        message: &str,
        gas_limit: u32,
    ) -> Result<TransactionHandle, LedgerError> {
        let program_id = self.program_id()?;
        let wallet = self.wallet()?;
        let waver = wallet
            .accounts()
            .await
            .map_err(|e| LedgerError::SubmissionRejected(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                LedgerError::SubmissionRejected("no authorized account to sign with".to_string())
            })?;

        let instructions = Self::build_instructions(program_id, waver, message, gas_limit);
        let blockhash = self
            .rpc_client
            .get_latest_blockhash()
            .await
            .map_err(|e| LedgerError::RemoteWrite(e.to_string()))?;

        let mut transaction = Transaction::new_with_payer(&instructions, Some(&waver));
        wallet
            .sign_transaction(&waver, &mut transaction, blockhash)
            .await
            .map_err(|e| LedgerError::SubmissionRejected(e.to_string()))?;

        let signature = self
            .rpc_client
            .send_transaction(&transaction)
            .await
            .map_err(classify_send_error)?;

        tracing::info!(%signature, %waver, "Wave transaction dispatched");
        Ok(TransactionHandle(signature.to_string()))
    }

    async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> Result<Confirmation, LedgerError> {
        let signature =
            Signature::from_str(&handle.0).map_err(|e| LedgerError::TransactionReverted {
                signature: handle.0.clone(),
                reason: format!("not a transaction signature: {e}"),
            })?;
        let timeout = Duration::from_secs(self.config.submission.confirmation_timeout_secs);

        match tokio::time::timeout(timeout, self.poll_signature(&signature)).await {
            Ok(result) => result.map(|()| Confirmation {
                handle: handle.clone(),
                confirmed_at: Utc::now(),
            }),
            Err(_) => Err(LedgerError::TransactionTimeout(handle.0.clone())),
        }
    }

    async fn subscribe(&self) -> Result<RecordSubscription, LedgerError> {
        let program_id = self.program_id()?;
        let (records_tx, records_rx) = mpsc::channel(self.config.channels.record_buffer);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        let worker = LiveRecordWorker::new(
            self.config.solana.ws_url.clone(),
            program_id,
            self.config.solana.commitment,
            records_tx,
        );
        tokio::spawn(worker.run(ready_tx, stop_rx));

        ready_rx.await.map_err(|_| {
            LedgerError::RemoteRead("live worker exited before subscribing".to_string())
        })??;

        Ok(RecordSubscription::new(records_rx, move || {
            let _ = stop_tx.send(());
        }))
    }
}
