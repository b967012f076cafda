#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tap_crypto::FaucetKey;
use tap_faucet::{
    AccountState, AddressRules, Balances, BroadcastResult, FaucetError, FaucetResult, FaucetService,
    FaucetSettings, NodeApi, NodeStatus, RequestLedger, RequestRecord, ResultRecord,
    SignedTransaction, TransferPlan, TransferRequest, TxLookup, TxParams, Coin,
};
use tokio::sync::{Notify, Semaphore};

pub const FAUCET_ADDRESS: &str = "cosmos10xcqpzrky6eff2g52qdye53xkk9jxkvrpq6uqr";
pub const RECIPIENT: &str = "cosmos1w508d6qejxtdg4y5r3zarvary0c5xw7k6ah60c";
pub const ACCOUNT_NUMBER: u64 = 17;

/// What the next broadcast answers instead of the default behaviour.
#[derive(Debug, Clone)]
pub enum Scripted {
    Reject { code: i64, raw: String },
    TransportError,
    Hang,
}

/// In-memory node that enforces sequence numbers like a real chain.
pub struct MockNode {
    sequence: AtomicU64,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    account_queries: AtomicUsize,
    broadcast_sequences: Mutex<Vec<u64>>,
    script: Mutex<VecDeque<Scripted>>,
    pause: Mutex<Option<Arc<Semaphore>>>,
    pub broadcast_started: Notify,
}

impl MockNode {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            sequence: AtomicU64::new(5),
            latency,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            account_queries: AtomicUsize::new(0),
            broadcast_sequences: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            pause: Mutex::new(None),
            broadcast_started: Notify::new(),
        }
    }

    pub fn script(&self, outcome: Scripted) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Holds every broadcast until the returned semaphore gets permits.
    pub fn pause_broadcasts(&self) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(0));
        *self.pause.lock().unwrap() = Some(semaphore.clone());
        semaphore
    }

    pub fn resume_broadcasts(&self) {
        if let Some(semaphore) = self.pause.lock().unwrap().take() {
            semaphore.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn account_queries(&self) -> usize {
        self.account_queries.load(Ordering::SeqCst)
    }

    pub fn broadcast_sequences(&self) -> Vec<u64> {
        self.broadcast_sequences.lock().unwrap().clone()
    }

    fn finish_write(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl NodeApi for MockNode {
    async fn account_state(&self, address: &str) -> FaucetResult<AccountState> {
        self.account_queries.fetch_add(1, Ordering::SeqCst);
        if address != FAUCET_ADDRESS {
            return Ok(AccountState::uninitialized());
        }
        // A faucet account query opens the fetch-to-broadcast span.
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;

        let mut balances = Balances::new();
        balances.insert("uatom".to_string(), 1_000_000);
        Ok(AccountState {
            sequence: self.sequence(),
            account_number: ACCOUNT_NUMBER,
            balances,
        })
    }

    async fn balances(&self, address: &str) -> FaucetResult<Balances> {
        let mut balances = Balances::new();
        if address == FAUCET_ADDRESS {
            balances.insert("uatom".to_string(), 1_000_000);
            balances.insert("ustake".to_string(), 250);
        }
        Ok(balances)
    }

    async fn node_status(&self) -> FaucetResult<NodeStatus> {
        Ok(NodeStatus {
            moniker: "mock".to_string(),
            latest_block_height: 100,
            catching_up: false,
            voting_power: 10,
        })
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> FaucetResult<BroadcastResult> {
        let pause = self.pause.lock().unwrap().clone();
        if let Some(semaphore) = pause {
            self.broadcast_started.notify_one();
            if let Ok(permit) = semaphore.acquire().await {
                permit.forget();
            }
        }
        tokio::time::sleep(self.latency).await;
        self.broadcast_sequences.lock().unwrap().push(tx.sequence());

        let scripted = self.script.lock().unwrap().pop_front();
        let result = match scripted {
            Some(Scripted::Hang) => std::future::pending::<FaucetResult<BroadcastResult>>().await,
            Some(Scripted::TransportError) => Err(FaucetError::Transport("connection reset".into())),
            Some(Scripted::Reject { code, raw }) => Ok(BroadcastResult::Rejected { code: Some(code), raw }),
            None => {
                let expected = self.sequence();
                if tx.sequence() == expected && tx.account_number() == ACCOUNT_NUMBER {
                    self.sequence.fetch_add(1, Ordering::SeqCst);
                    Ok(BroadcastResult::Accepted { tx_hash: format!("{:064X}", tx.sequence()) })
                } else {
                    Ok(BroadcastResult::Rejected {
                        code: Some(32),
                        raw: format!(
                            "{{\"code\":32,\"raw_log\":\"account sequence mismatch, expected {}, got {}\"}}",
                            expected,
                            tx.sequence()
                        ),
                    })
                }
            }
        };
        self.finish_write();
        result
    }

    async fn transaction(&self, _hash: &str) -> FaucetResult<TxLookup> {
        Ok(TxLookup::NotFound)
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    pub requests: Mutex<Vec<RequestRecord>>,
    pub results: Mutex<Vec<ResultRecord>>,
}

#[async_trait]
impl RequestLedger for MemoryLedger {
    async fn record_request(&self, record: &RequestRecord) -> FaucetResult<()> {
        self.requests.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn record_result(&self, record: &ResultRecord) -> FaucetResult<()> {
        self.results.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub fn settings(cooldown_secs: i64) -> FaucetSettings {
    let key = FaucetKey::from_bytes(&[1u8; 32]).unwrap();
    FaucetSettings {
        key,
        address: FAUCET_ADDRESS.to_string(),
        rules: AddressRules::new("cosmos", 45),
        plan: TransferPlan::new(&["uatom".to_string(), "ustake".to_string()], &[1000, 5]).unwrap(),
        params: TxParams {
            chain_id: "testnet-1".to_string(),
            gas_limit: 200_000,
            fee: Coin::new("uatom", 500),
            memo: String::new(),
        },
        cooldown: chrono::Duration::seconds(cooldown_secs),
        dispatch_timeout: None,
        explorer_url: Some("https://explorer.example".to_string()),
    }
}

pub fn service_with(
    settings: FaucetSettings,
    node: Arc<MockNode>,
    ledger: Arc<MemoryLedger>,
) -> Arc<FaucetService> {
    tap_common::utils::logging::init_test_logging();
    Arc::new(FaucetService::new(settings, node, ledger).unwrap())
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn request(requester: &str, secs: i64) -> TransferRequest {
    TransferRequest {
        requester_id: requester.to_string(),
        requester_name: format!("{requester}-name"),
        recipient: RECIPIENT.to_string(),
        submitted_at: at(secs),
    }
}
