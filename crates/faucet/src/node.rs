//! Remote node access: account queries, broadcasts and transaction lookups.

use crate::error::{FaucetError, FaucetResult};
use crate::signer::SignedTransaction;
use crate::tx::Coin;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Denomination to amount, in the smallest unit.
pub type Balances = BTreeMap<String, u128>;

/// On-chain state of an account as reported by the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountState {
    pub sequence: u64,
    pub account_number: u64,
    pub balances: Balances,
}

impl AccountState {
    /// State of an address the chain has never seen.
    pub fn uninitialized() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub moniker: String,
    pub latest_block_height: u64,
    pub catching_up: bool,
    pub voting_power: u64,
}

/// Outcome of submitting a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastResult {
    Accepted { tx_hash: String },
    Rejected { code: Option<i64>, raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSummary {
    pub height: u64,
    pub from: String,
    pub to: String,
    pub coins: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxLookup {
    Found(TxSummary),
    NotFound,
}

/// Node operations the faucet depends on.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Sequence, account number and balances; uninitialized accounts are not an error.
    async fn account_state(&self, address: &str) -> FaucetResult<AccountState>;
    async fn balances(&self, address: &str) -> FaucetResult<Balances>;
    async fn node_status(&self) -> FaucetResult<NodeStatus>;
    /// Submits in sync mode. Node answers are classified, never retried.
    async fn broadcast(&self, tx: &SignedTransaction) -> FaucetResult<BroadcastResult>;
    async fn transaction(&self, hash: &str) -> FaucetResult<TxLookup>;
}

/// `NodeApi` over the legacy LCD REST endpoints and the Tendermint RPC.
pub struct RestNodeClient {
    rest_url: String,
    rpc_url: String,
    client: reqwest::Client,
}

impl RestNodeClient {
    pub fn new(rest_url: &str, rpc_url: &str, timeout: Duration) -> FaucetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            rest_url: rest_url.trim_end_matches('/').to_string(),
            rpc_url: rpc_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// GET `url`; `None` when the node answers 404 with its own not-found
    /// body, the parsed body on success.
    async fn get_json(&self, url: &str) -> FaucetResult<Option<Value>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status == StatusCode::NOT_FOUND && is_node_not_found(&text) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FaucetError::Transport(format!("HTTP {status} from {url}: {text}")));
        }
        let body = serde_json::from_str(&text)
            .map_err(|err| FaucetError::MalformedResponse(format!("{url}: {err}")))?;
        Ok(Some(body))
    }
}

#[async_trait]
impl NodeApi for RestNodeClient {
    #[instrument(skip(self))]
    async fn account_state(&self, address: &str) -> FaucetResult<AccountState> {
        let url = format!("{}/auth/accounts/{}", self.rest_url, address);
        match self.get_json(&url).await? {
            Some(body) => parse_account_state(&body),
            None => {
                debug!("account {} not found", address);
                Ok(AccountState::uninitialized())
            }
        }
    }

    #[instrument(skip(self))]
    async fn balances(&self, address: &str) -> FaucetResult<Balances> {
        let url = format!("{}/bank/balances/{}", self.rest_url, address);
        match self.get_json(&url).await? {
            Some(body) => parse_coins(body.get("result").unwrap_or(&Value::Null)),
            None => Ok(Balances::new()),
        }
    }

    async fn node_status(&self) -> FaucetResult<NodeStatus> {
        let url = format!("{}/status", self.rpc_url);
        let body = self
            .get_json(&url)
            .await?
            .ok_or_else(|| FaucetError::MalformedResponse(format!("{url} not found")))?;
        parse_node_status(&body)
    }

    #[instrument(skip(self, tx), fields(sequence = tx.sequence()))]
    async fn broadcast(&self, tx: &SignedTransaction) -> FaucetResult<BroadcastResult> {
        let url = format!("{}/txs", self.rest_url);
        let response = self.client.post(&url).json(&tx.to_json()).send().await?;
        let status = response.status();
        let raw = response.text().await?;
        let result = classify_broadcast(&raw);
        if let BroadcastResult::Rejected { code, .. } = &result {
            warn!(%status, ?code, "node rejected broadcast");
        }
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn transaction(&self, hash: &str) -> FaucetResult<TxLookup> {
        let url = format!("{}/txs/{}", self.rest_url, hash);
        Ok(self
            .get_json(&url)
            .await?
            .and_then(|body| parse_tx_summary(&body))
            .map_or(TxLookup::NotFound, TxLookup::Found))
    }
}

/// The node's own 404 is a JSON object carrying `error` or `message`.
/// Anything else, such as a proxy's HTML page, points at a wrong URL.
pub fn is_node_not_found(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(Value::as_object)
        .map_or(false, |object| object.contains_key("error") || object.contains_key("message"))
}

/// Reads a number that the node may encode either as a JSON string or a number.
fn number<T: FromStr>(value: &Value) -> Option<T> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

fn required_number<T: FromStr>(value: &Value, pointer: &str) -> FaucetResult<T> {
    value
        .pointer(pointer)
        .and_then(number)
        .ok_or_else(|| FaucetError::MalformedResponse(format!("missing or invalid `{pointer}`")))
}

/// Parses an `auth/accounts` body. An empty or missing address means the
/// account does not exist on chain yet.
pub fn parse_account_state(body: &Value) -> FaucetResult<AccountState> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        return Err(FaucetError::MalformedResponse(error.to_string()));
    }
    let value = body.pointer("/result/value").unwrap_or(&Value::Null);
    let initialized = value
        .get("address")
        .and_then(Value::as_str)
        .map_or(false, |address| !address.is_empty());
    if !initialized {
        return Ok(AccountState::uninitialized());
    }

    let optional = |key: &str| -> FaucetResult<u64> {
        match value.get(key) {
            None | Some(Value::Null) => Ok(0),
            Some(raw) => number(raw)
                .ok_or_else(|| FaucetError::MalformedResponse(format!("invalid `{key}`: {raw}"))),
        }
    };

    Ok(AccountState {
        sequence: optional("sequence")?,
        account_number: optional("account_number")?,
        balances: parse_coins(value.get("coins").unwrap_or(&Value::Null))?,
    })
}

/// Parses a `[{denom, amount}]` list; `null` is an empty list.
pub fn parse_coins(list: &Value) -> FaucetResult<Balances> {
    let entries = match list {
        Value::Null => return Ok(Balances::new()),
        Value::Array(entries) => entries,
        other => {
            return Err(FaucetError::MalformedResponse(format!("expected coin list, got {other}")))
        }
    };

    let mut balances = Balances::new();
    for entry in entries {
        let denom = entry
            .get("denom")
            .and_then(Value::as_str)
            .ok_or_else(|| FaucetError::MalformedResponse(format!("coin without denom: {entry}")))?;
        let amount: u128 = required_number(entry, "/amount")?;
        *balances.entry(denom.to_string()).or_default() += amount;
    }
    Ok(balances)
}

pub fn parse_node_status(body: &Value) -> FaucetResult<NodeStatus> {
    let moniker = body
        .pointer("/result/node_info/moniker")
        .and_then(Value::as_str)
        .ok_or_else(|| FaucetError::MalformedResponse("missing `node_info.moniker`".into()))?;
    let catching_up = body
        .pointer("/result/sync_info/catching_up")
        .and_then(Value::as_bool)
        .ok_or_else(|| FaucetError::MalformedResponse("missing `sync_info.catching_up`".into()))?;

    Ok(NodeStatus {
        moniker: moniker.to_string(),
        latest_block_height: required_number(body, "/result/sync_info/latest_block_height")?,
        catching_up,
        voting_power: required_number(body, "/result/validator_info/voting_power")?,
    })
}

/// A body carrying a transaction hash with no non-zero code and no error is
/// accepted; any other answer is a rejection with the body kept verbatim.
pub fn classify_broadcast(raw: &str) -> BroadcastResult {
    let rejected = |code| BroadcastResult::Rejected { code, raw: raw.to_string() };
    let body: Value = match serde_json::from_str(raw) {
        Ok(body) => body,
        Err(_) => return rejected(None),
    };

    // A code that is present but unreadable still marks a failure.
    let code_field = body.get("code").filter(|c| !c.is_null());
    let code = code_field.and_then(result_code);
    let success_code = code_field.is_none() || code == Some(0);
    let has_error = body.get("error").map_or(false, |e| !e.is_null());
    let tx_hash = body
        .get("txhash")
        .and_then(Value::as_str)
        .filter(|hash| !hash.is_empty());

    match tx_hash {
        Some(hash) if success_code && !has_error => {
            BroadcastResult::Accepted { tx_hash: hash.to_string() }
        }
        _ => rejected(code),
    }
}

/// Integral result codes, including `4.0` and `"4"`.
fn result_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Summarises a `txs/{hash}` body; `None` unless it has a height and messages.
pub fn parse_tx_summary(body: &Value) -> Option<TxSummary> {
    let height = body.get("height").and_then(number)?;
    let messages = body.pointer("/tx/value/msg").and_then(Value::as_array)?;
    let first = messages.first()?.get("value")?;
    let field = |key: &str| first.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

    let coins = messages
        .iter()
        .filter_map(|msg| msg.pointer("/value/amount").and_then(Value::as_array))
        .flatten()
        .filter_map(|coin| {
            let denom = coin.get("denom")?.as_str()?;
            let amount = coin.get("amount").and_then(number)?;
            Some(Coin::new(denom, amount))
        })
        .collect();

    Some(TxSummary { height, from: field("from_address"), to: field("to_address"), coins })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initialized_account() {
        let body = json!({
            "height": "120",
            "result": {
                "type": "cosmos-sdk/Account",
                "value": {
                    "address": "cosmos1abc",
                    "coins": [{"denom": "uatom", "amount": "1000"}, {"denom": "ustake", "amount": 7}],
                    "account_number": "12",
                    "sequence": 3
                }
            }
        });
        let state = parse_account_state(&body).unwrap();
        assert_eq!(state.sequence, 3);
        assert_eq!(state.account_number, 12);
        assert_eq!(state.balances.get("uatom"), Some(&1000));
        assert_eq!(state.balances.get("ustake"), Some(&7));
    }

    #[test]
    fn test_uninitialized_account_is_zero_state() {
        let body = json!({
            "height": "120",
            "result": {
                "type": "cosmos-sdk/Account",
                "value": {"address": "", "coins": [], "public_key": null, "account_number": "0", "sequence": "0"}
            }
        });
        assert_eq!(parse_account_state(&body).unwrap(), AccountState::uninitialized());
        assert_eq!(parse_account_state(&json!({"height": "0"})).unwrap(), AccountState::uninitialized());
    }

    #[test]
    fn test_error_body_is_not_uninitialized() {
        let body = json!({"error": "internal"});
        assert!(matches!(
            parse_account_state(&body),
            Err(FaucetError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_garbage_sequence_is_malformed() {
        let body = json!({"result": {"value": {"address": "cosmos1abc", "sequence": "x"}}});
        assert!(matches!(
            parse_account_state(&body),
            Err(FaucetError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_node_status() {
        let body = json!({
            "result": {
                "node_info": {"moniker": "validator-1"},
                "sync_info": {"latest_block_height": "4521", "catching_up": false},
                "validator_info": {"voting_power": "10"}
            }
        });
        let status = parse_node_status(&body).unwrap();
        assert_eq!(status.moniker, "validator-1");
        assert_eq!(status.latest_block_height, 4521);
        assert!(!status.catching_up);
        assert_eq!(status.voting_power, 10);

        assert!(parse_node_status(&json!({"error": "down"})).is_err());
    }

    #[test]
    fn test_broadcast_accepted() {
        let raw = r#"{"height":"0","txhash":"ABCDEF","raw_log":"[]"}"#;
        assert_eq!(
            classify_broadcast(raw),
            BroadcastResult::Accepted { tx_hash: "ABCDEF".into() }
        );
        let zero_code = r#"{"txhash":"ABCDEF","code":0}"#;
        assert!(matches!(classify_broadcast(zero_code), BroadcastResult::Accepted { .. }));
    }

    #[test]
    fn test_broadcast_rejected_keeps_raw_body() {
        let raw = r#"{"height":"0","txhash":"ABCDEF","code":4,"raw_log":"signature verification failed"}"#;
        assert_eq!(
            classify_broadcast(raw),
            BroadcastResult::Rejected { code: Some(4), raw: raw.to_string() }
        );

        let error = r#"{"error":"insufficient fee"}"#;
        assert_eq!(
            classify_broadcast(error),
            BroadcastResult::Rejected { code: None, raw: error.to_string() }
        );
    }

    #[test]
    fn test_unusual_codes_are_rejections() {
        let named = r#"{"txhash":"AB","code":"unauthorized"}"#;
        assert_eq!(
            classify_broadcast(named),
            BroadcastResult::Rejected { code: None, raw: named.to_string() }
        );

        let float = r#"{"txhash":"AB","code":4.0}"#;
        assert_eq!(
            classify_broadcast(float),
            BroadcastResult::Rejected { code: Some(4), raw: float.to_string() }
        );

        let quoted = r#"{"txhash":"AB","code":"5"}"#;
        assert!(matches!(
            classify_broadcast(quoted),
            BroadcastResult::Rejected { code: Some(5), .. }
        ));

        let null_code = r#"{"txhash":"AB","code":null}"#;
        assert!(matches!(classify_broadcast(null_code), BroadcastResult::Accepted { .. }));
        let quoted_zero = r#"{"txhash":"AB","code":"0"}"#;
        assert!(matches!(classify_broadcast(quoted_zero), BroadcastResult::Accepted { .. }));
    }

    #[test]
    fn test_node_not_found_shape() {
        assert!(is_node_not_found(r#"{"error":"account not found"}"#));
        assert!(is_node_not_found(r#"{"code":5,"message":"not found"}"#));
        assert!(!is_node_not_found("<html>404 page not found</html>"));
        assert!(!is_node_not_found(""));
        assert!(!is_node_not_found(r#"["error"]"#));
    }

    #[test]
    fn test_unparsable_body_is_rejected() {
        assert_eq!(
            classify_broadcast("bad gateway"),
            BroadcastResult::Rejected { code: None, raw: "bad gateway".into() }
        );
    }

    #[test]
    fn test_tx_summary() {
        let body = json!({
            "height": "88",
            "txhash": "AB",
            "tx": {"type": "cosmos-sdk/StdTx", "value": {"msg": [
                {"type": "cosmos-sdk/MsgSend", "value": {
                    "from_address": "cosmos1from", "to_address": "cosmos1to",
                    "amount": [{"denom": "uatom", "amount": "10"}]}},
                {"type": "cosmos-sdk/MsgSend", "value": {
                    "from_address": "cosmos1from", "to_address": "cosmos1to",
                    "amount": [{"denom": "ustake", "amount": "20"}]}}
            ]}}
        });
        let summary = parse_tx_summary(&body).unwrap();
        assert_eq!(summary.height, 88);
        assert_eq!(summary.from, "cosmos1from");
        assert_eq!(summary.to, "cosmos1to");
        assert_eq!(summary.coins, vec![Coin::new("uatom", 10), Coin::new("ustake", 20)]);

        assert!(parse_tx_summary(&json!({"error": "tx not found"})).is_none());
    }
}
