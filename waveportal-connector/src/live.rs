use crate::{error::LedgerError, events::try_parse_log, types::RemoteRecord};
use solana_client::{
    nonblocking::pubsub_client::PubsubClient,
    rpc_config::{RpcTransactionLogsConfig, RpcTransactionLogsFilter},
    rpc_response::{Response, RpcLogsResponse},
};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    pubkey::Pubkey,
};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;

/// Streams `NewWave` events for one portal program over the cluster's
/// WebSocket `logsSubscribe` and forwards them as [`RemoteRecord`]s stamped
/// with their slot, in arrival order.
///
/// One worker backs exactly one [`RecordSubscription`](crate::listener::RecordSubscription).
pub(crate) struct LiveRecordWorker {
    ws_url: String,
    program_id: Pubkey,
    commitment: CommitmentLevel,
    records_tx: mpsc::Sender<RemoteRecord>,
}

impl LiveRecordWorker {
    pub fn new(
        ws_url: String,
        program_id: Pubkey,
        commitment: CommitmentLevel,
        records_tx: mpsc::Sender<RemoteRecord>,
    ) -> Self {
        Self {
            ws_url,
            program_id,
            commitment,
            records_tx,
        }
    }

    /// Subscribes, reports the outcome through `ready_tx`, then forwards records
    /// until `stop_rx` fires, the subscription's receiver goes away, or the
    /// cluster closes the stream.
    pub async fn run(
        self,
        ready_tx: oneshot::Sender<Result<(), LedgerError>>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        let client = match PubsubClient::new(&self.ws_url).await {
            Ok(client) => client,
            Err(e) => {
                let _ = ready_tx.send(Err(LedgerError::RemoteRead(format!(
                    "failed to connect to {}: {}",
                    self.ws_url, e
                ))));
                return;
            }
        };

        let subscription = client
            .logs_subscribe(
                RpcTransactionLogsFilter::Mentions(vec![self.program_id.to_string()]),
                RpcTransactionLogsConfig {
                    commitment: Some(CommitmentConfig {
                        commitment: self.commitment,
                    }),
                },
            )
            .await;
        let (mut stream, unsubscribe) = match subscription {
            Ok(pair) => pair,
            Err(e) => {
                let _ = ready_tx.send(Err(LedgerError::RemoteRead(format!(
                    "logs subscription failed: {e}"
                ))));
                return;
            }
        };

        if ready_tx.send(Ok(())).is_err() {
            tracing::debug!("Subscriber went away before the live worker was ready");
            unsubscribe().await;
            return;
        }
        tracing::info!(program_id = %self.program_id, "Live worker connected to WebSocket, listening for waves...");

        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    tracing::info!("LiveRecordWorker: stop signal received, exiting.");
                    break;
                },
                msg = stream.next() => match msg {
                    Some(msg) => {
                        if !self.forward(msg).await {
                            tracing::info!("LiveRecordWorker: subscriber dropped, exiting.");
                            break;
                        }
                    }
                    None => {
                        tracing::warn!("Log stream closed by the cluster.");
                        break;
                    }
                },
            }
        }

        drop(stream);
        unsubscribe().await;
    }

    /// Forwards every `NewWave` in one transaction's logs. Returns `false` once
    /// the receiving side is gone.
    async fn forward(&self, msg: Response<RpcLogsResponse>) -> bool {
        let Response { context, value } = msg;
        if value.err.is_some() {
            tracing::debug!(signature = %value.signature, "Skipping logs of a failed transaction");
            return true;
        }

        let records = value
            .logs
            .iter()
            .filter_map(|log| try_parse_log(log))
            .filter_map(|event| event.to_record());

        for record in records {
            tracing::debug!("[LIVE] slot={} record={:?}", context.slot, &record);
            let remote = RemoteRecord {
                slot: context.slot,
                record,
            };
            if self.records_tx.send(remote).await.is_err() {
                return false;
            }
        }
        true
    }
}
