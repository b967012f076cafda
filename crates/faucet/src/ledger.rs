//! Append-only log of dispatch attempts and their results.

use crate::error::{FaucetError, FaucetResult};
use crate::node::BroadcastResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const DELIMITER: char = ';';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub requester_id: String,
    pub requester_name: String,
    pub address: String,
    pub submitted_at: DateTime<Utc>,
}

impl RequestRecord {
    pub fn to_line(&self) -> String {
        format!(
            "{};{};{};{}\n",
            sanitize(&self.requester_id),
            sanitize(&self.requester_name),
            sanitize(&self.address),
            self.submitted_at.timestamp()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultOutcome {
    Accepted { tx_hash: String },
    Rejected { code: Option<i64>, raw: String },
    Error(String),
}

impl ResultOutcome {
    pub fn from_dispatch(result: &FaucetResult<BroadcastResult>) -> Self {
        match result {
            Ok(BroadcastResult::Accepted { tx_hash }) => Self::Accepted { tx_hash: tx_hash.clone() },
            Ok(BroadcastResult::Rejected { code, raw }) => Self::Rejected { code: *code, raw: raw.clone() },
            Err(err) => Self::Error(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    pub outcome: ResultOutcome,
    pub recorded_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn to_line(&self) -> String {
        let outcome = match &self.outcome {
            ResultOutcome::Accepted { tx_hash } => format!("accepted:{}", sanitize(tx_hash)),
            ResultOutcome::Rejected { code, raw } => format!(
                "rejected:{}:{}",
                code.map(|c| c.to_string()).unwrap_or_default(),
                sanitize(raw)
            ),
            ResultOutcome::Error(message) => format!("error:{}", sanitize(message)),
        };
        format!("{outcome};{}\n", self.recorded_at.format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Keeps every record on one line with exactly the expected fields.
fn sanitize(field: &str) -> String {
    field
        .chars()
        .map(|c| match c {
            DELIMITER => ',',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

/// Durable record of requests. Never read back by the faucet.
#[async_trait]
pub trait RequestLedger: Send + Sync {
    async fn record_request(&self, record: &RequestRecord) -> FaucetResult<()>;
    async fn record_result(&self, record: &ResultRecord) -> FaucetResult<()>;
}

/// Two delimiter-separated files, one for requests and one for results.
pub struct CsvLedger {
    requests_path: PathBuf,
    results_path: PathBuf,
    lock: Mutex<()>,
}

impl CsvLedger {
    pub fn new(requests_path: impl Into<PathBuf>, results_path: impl Into<PathBuf>) -> Self {
        Self {
            requests_path: requests_path.into(),
            results_path: results_path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn append(&self, path: &Path, line: &str) -> FaucetResult<()> {
        let _guard = self.lock.lock().await;
        let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await.map_err(FaucetError::Ledger)
    }
}

#[async_trait]
impl RequestLedger for CsvLedger {
    async fn record_request(&self, record: &RequestRecord) -> FaucetResult<()> {
        self.append(&self.requests_path, &record.to_line()).await
    }

    async fn record_result(&self, record: &ResultRecord) -> FaucetResult<()> {
        self.append(&self.results_path, &record.to_line()).await
    }
}
