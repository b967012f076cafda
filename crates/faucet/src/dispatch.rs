//! The single writer for the faucet account.

use crate::error::{FaucetError, FaucetResult};
use crate::node::{BroadcastResult, NodeApi};
use crate::signer::FaucetSigner;
use crate::tx::{TransactionBuilder, TransferPlan, TxParams};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Runs fetch, build, sign and broadcast for the faucet account one at a time.
pub struct Dispatcher {
    node: Arc<dyn NodeApi>,
    signer: FaucetSigner,
    builder: TransactionBuilder,
    // Held from the sequence fetch until the broadcast answer arrives.
    writer: Mutex<()>,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(node: Arc<dyn NodeApi>, signer: FaucetSigner, params: TxParams) -> Self {
        let builder = TransactionBuilder::new(signer.address(), params);
        Self { node, signer, builder, writer: Mutex::new(()), timeout: None }
    }

    pub fn faucet_address(&self) -> &str {
        self.signer.address()
    }

    pub fn node(&self) -> &Arc<dyn NodeApi> {
        &self.node
    }

    /// Bounds the time spent after the writer lock is taken. Waiting for
    /// the lock does not count against it.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[instrument(skip(self, plan))]
    pub async fn dispatch(&self, recipient: &str, plan: &TransferPlan) -> FaucetResult<BroadcastResult> {
        let _writer = self.writer.lock().await;

        let pipeline = self.fetch_sign_broadcast(recipient, plan);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, pipeline)
                .await
                .map_err(|_| FaucetError::DispatchTimeout(limit.as_secs()))?,
            None => pipeline.await,
        }
    }

    async fn fetch_sign_broadcast(&self, recipient: &str, plan: &TransferPlan) -> FaucetResult<BroadcastResult> {
        let account = self.node.account_state(self.signer.address()).await?;
        debug!(
            sequence = account.sequence,
            account_number = account.account_number,
            "fetched faucet account"
        );

        let tx = self
            .builder
            .build_plan(recipient, account.sequence, account.account_number, plan);
        let signed = self.signer.sign(&tx);
        let result = self.node.broadcast(&signed).await?;

        if let BroadcastResult::Accepted { tx_hash } = &result {
            info!(%tx_hash, sequence = account.sequence, "transaction accepted");
        }
        Ok(result)
    }
}
