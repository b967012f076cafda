//! Faucet service core logic

use crate::address::AddressRules;
use crate::config::{FaucetConfig, FaucetSettings};
use crate::dispatch::Dispatcher;
use crate::error::{FaucetError, FaucetResult};
use crate::gate::{AdmissionGuard, GateDecision, RequestGate};
use crate::ledger::{CsvLedger, RequestLedger, RequestRecord, ResultOutcome, ResultRecord};
use crate::node::{AccountState, Balances, BroadcastResult, NodeApi, NodeStatus, RestNodeClient, TxLookup};
use crate::signer::FaucetSigner;
use crate::tx::TransferPlan;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Length of a transaction hash in hex characters.
pub const TX_HASH_LENGTH: usize = 64;

/// A request from a chat user for the configured coins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub requester_id: String,
    pub requester_name: String,
    pub recipient: String,
    pub submitted_at: DateTime<Utc>,
}

/// A transaction the node accepted into its mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dispatched {
    pub tx_hash: String,
    pub link: String,
}

/// Faucet status
#[derive(Debug, Clone, Serialize)]
pub struct FaucetStatus {
    pub node: NodeStatus,
    pub address: String,
    pub balances: Balances,
}

/// Faucet service
pub struct FaucetService {
    rules: AddressRules,
    plan: TransferPlan,
    gate: Arc<RequestGate>,
    dispatcher: Dispatcher,
    ledger: Arc<dyn RequestLedger>,
    explorer_url: Option<String>,
}

impl FaucetService {
    /// Create new faucet service
    pub fn new(
        settings: FaucetSettings,
        node: Arc<dyn NodeApi>,
        ledger: Arc<dyn RequestLedger>,
    ) -> FaucetResult<Self> {
        let signer = FaucetSigner::new(settings.key, settings.rules.prefix())?;
        info!("Faucet address: {}", signer.address());

        Ok(Self {
            rules: settings.rules,
            plan: settings.plan,
            gate: Arc::new(RequestGate::new(settings.cooldown)),
            dispatcher: Dispatcher::new(node, signer, settings.params)
                .with_timeout(settings.dispatch_timeout),
            ledger,
            explorer_url: settings.explorer_url,
        })
    }

    /// Wires the REST node client and the CSV ledger from configuration.
    pub fn from_config(config: &FaucetConfig) -> FaucetResult<Self> {
        let settings = config.validate()?;
        let node = RestNodeClient::new(&config.node.rest_url, &config.node.rpc_url, config.http_timeout())?;
        let ledger = CsvLedger::new(&config.ledger.requests_path, &config.ledger.results_path);
        Self::new(settings, Arc::new(node), Arc::new(ledger))
    }

    pub fn faucet_address(&self) -> &str {
        self.dispatcher.faucet_address()
    }

    pub fn rules(&self) -> &AddressRules {
        &self.rules
    }

    pub fn gate(&self) -> &Arc<RequestGate> {
        &self.gate
    }

    /// Validates, admits and dispatches one transfer.
    ///
    /// The gate entry survives only an accepted broadcast. Any other outcome,
    /// including a dropped future, returns the requester to Idle.
    #[instrument(skip(self, request), fields(requester = %request.requester_id, recipient = %request.recipient))]
    pub async fn request(&self, request: TransferRequest) -> FaucetResult<Dispatched> {
        self.rules.validate(&request.recipient)?;

        let admission = match self.gate.try_admit(
            &request.requester_id,
            &request.recipient,
            request.submitted_at,
        ) {
            GateDecision::Admitted(admission) => admission,
            GateDecision::Cooldown { remaining } => {
                let secs = (remaining.num_milliseconds().max(0) as u64 + 999) / 1000;
                info!(remaining_secs = secs, "request during cooldown");
                return Err(FaucetError::Cooldown(secs));
            }
        };
        let guard = AdmissionGuard::new(self.gate.clone(), admission);

        self.record_request(&request).await;
        let result = self.dispatcher.dispatch(&request.recipient, &self.plan).await;
        if let Err(e) = &result {
            if e.is_transient() {
                warn!("dispatch failed, requester may retry: {}", e);
            } else {
                error!("dispatch failed: {}", e);
            }
        }
        self.record_result(&result).await;

        match result? {
            BroadcastResult::Accepted { tx_hash } => {
                guard.commit();
                Ok(Dispatched { link: self.explorer_link(&tx_hash), tx_hash })
            }
            BroadcastResult::Rejected { code, raw } => Err(FaucetError::BroadcastRejected { code, raw }),
        }
    }

    async fn record_request(&self, request: &TransferRequest) {
        let record = RequestRecord {
            requester_id: request.requester_id.clone(),
            requester_name: request.requester_name.clone(),
            address: request.recipient.clone(),
            submitted_at: request.submitted_at,
        };
        if let Err(e) = self.ledger.record_request(&record).await {
            warn!("Failed to record request: {}", e);
        }
    }

    async fn record_result(&self, result: &FaucetResult<BroadcastResult>) {
        let record = ResultRecord {
            outcome: ResultOutcome::from_dispatch(result),
            recorded_at: Utc::now(),
        };
        if let Err(e) = self.ledger.record_result(&record).await {
            warn!("Failed to record result: {}", e);
        }
    }

    /// Account state of any valid address; unknown accounts have zero state.
    pub async fn balance(&self, address: &str) -> FaucetResult<AccountState> {
        self.rules.validate(address)?;
        self.dispatcher.node().account_state(address).await
    }

    /// Get faucet status
    pub async fn status(&self) -> FaucetResult<FaucetStatus> {
        let node = self.dispatcher.node();
        let status = node.node_status().await?;
        let balances = node.balances(self.faucet_address()).await?;
        Ok(FaucetStatus {
            node: status,
            address: self.faucet_address().to_string(),
            balances,
        })
    }

    /// Looks a transaction up; hashes of the wrong length never reach the node.
    pub async fn tx_info(&self, hash: &str) -> FaucetResult<TxLookup> {
        let length = hash.chars().count();
        if length != TX_HASH_LENGTH {
            return Err(FaucetError::InvalidHashLength(length));
        }
        self.dispatcher.node().transaction(hash).await
    }

    pub fn explorer_link(&self, tx_hash: &str) -> String {
        match &self.explorer_url {
            Some(template) if template.contains("{hash}") => template.replace("{hash}", tx_hash),
            Some(base) => format!("{}/transactions/{}", base.trim_end_matches('/'), tx_hash),
            None => tx_hash.to_string(),
        }
    }

    pub fn cooldown(&self) -> chrono::Duration {
        self.gate.cooldown()
    }
}
