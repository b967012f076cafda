//! Unsigned transfer transactions and their canonical sign bytes.

use crate::error::{FaucetError, FaucetResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// An amount of a single denomination, in the smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self { denom: denom.into(), amount }
    }

    fn to_json(&self) -> Value {
        json!({ "amount": self.amount.to_string(), "denom": self.denom })
    }
}

/// The ordered (denomination, amount) pairs sent to every recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    coins: Vec<Coin>,
}

impl TransferPlan {
    /// Pairs the lists position by position; fails when their lengths differ.
    pub fn new(denominations: &[String], amounts: &[u128]) -> FaucetResult<Self> {
        if denominations.len() != amounts.len() {
            return Err(FaucetError::MismatchedTransfer {
                denominations: denominations.len(),
                amounts: amounts.len(),
            });
        }
        if denominations.is_empty() {
            return Err(FaucetError::EmptyTransfer);
        }
        let coins = denominations
            .iter()
            .zip(amounts)
            .map(|(denom, amount)| Coin::new(denom.clone(), *amount))
            .collect();
        Ok(Self { coins })
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }
}

/// Chain-wide transaction parameters taken verbatim from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxParams {
    pub chain_id: String,
    pub gas_limit: u64,
    pub fee: Coin,
    pub memo: String,
}

/// One coin transfer from the faucet to a recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgSend {
    pub from_address: String,
    pub to_address: String,
    pub coin: Coin,
}

impl MsgSend {
    pub fn to_json(&self) -> Value {
        json!({
            "type": "cosmos-sdk/MsgSend",
            "value": {
                "from_address": self.from_address,
                "to_address": self.to_address,
                "amount": [{ "denom": self.coin.denom, "amount": self.coin.amount.to_string() }],
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastMode {
    Sync,
}

impl BroadcastMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastMode::Sync => "sync",
        }
    }
}

/// An unsigned transaction bound to one account sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub messages: Vec<MsgSend>,
    pub fee: Coin,
    pub gas_limit: u64,
    pub memo: String,
    pub chain_id: String,
    pub sequence: u64,
    pub account_number: u64,
    pub mode: BroadcastMode,
}

impl ChainTransaction {
    pub fn messages_json(&self) -> Value {
        Value::Array(self.messages.iter().map(MsgSend::to_json).collect())
    }

    pub fn fee_json(&self) -> Value {
        json!({
            "amount": [self.fee.to_json()],
            "gas": self.gas_limit.to_string(),
        })
    }

    /// Compact JSON with lexicographically sorted keys and numbers as strings.
    pub fn sign_bytes(&self) -> Vec<u8> {
        // serde_json maps are ordered by key unless `preserve_order` is enabled.
        let doc = json!({
            "account_number": self.account_number.to_string(),
            "chain_id": self.chain_id,
            "fee": self.fee_json(),
            "memo": self.memo,
            "msgs": self.messages_json(),
            "sequence": self.sequence.to_string(),
        });
        doc.to_string().into_bytes()
    }
}

/// Builds transfer transactions from the faucet account.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    from_address: String,
    params: TxParams,
}

impl TransactionBuilder {
    pub fn new(from_address: impl Into<String>, params: TxParams) -> Self {
        Self { from_address: from_address.into(), params }
    }

    pub fn params(&self) -> &TxParams {
        &self.params
    }

    /// One message per (denomination, amount) pair, in the order supplied.
    pub fn build(
        &self,
        recipient: &str,
        sequence: u64,
        account_number: u64,
        denominations: &[String],
        amounts: &[u128],
    ) -> FaucetResult<ChainTransaction> {
        let plan = TransferPlan::new(denominations, amounts)?;
        Ok(self.build_plan(recipient, sequence, account_number, &plan))
    }

    pub fn build_plan(
        &self,
        recipient: &str,
        sequence: u64,
        account_number: u64,
        plan: &TransferPlan,
    ) -> ChainTransaction {
        let messages = plan
            .coins()
            .iter()
            .map(|coin| MsgSend {
                from_address: self.from_address.clone(),
                to_address: recipient.to_string(),
                coin: coin.clone(),
            })
            .collect();

        ChainTransaction {
            messages,
            fee: self.params.fee.clone(),
            gas_limit: self.params.gas_limit,
            memo: self.params.memo.clone(),
            chain_id: self.params.chain_id.clone(),
            sequence,
            account_number,
            mode: BroadcastMode::Sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> TransactionBuilder {
        TransactionBuilder::new(
            "cosmos1faucet",
            TxParams {
                chain_id: "testnet-1".to_string(),
                gas_limit: 200_000,
                fee: Coin::new("uatom", 500),
                memo: String::new(),
            },
        )
    }

    fn denoms(list: &[&str]) -> Vec<String> {
        list.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_messages_follow_list_order() {
        let tx = builder()
            .build("cosmos1dest", 7, 12, &denoms(&["uatom", "ustake"]), &[100, 250])
            .unwrap();

        assert_eq!(tx.messages.len(), 2);
        assert_eq!(tx.messages[0].coin, Coin::new("uatom", 100));
        assert_eq!(tx.messages[1].coin, Coin::new("ustake", 250));
        assert!(tx.messages.iter().all(|m| m.to_address == "cosmos1dest"));
        assert_eq!(tx.sequence, 7);
        assert_eq!(tx.account_number, 12);
        assert_eq!(tx.gas_limit, 200_000);
    }

    #[test]
    fn test_mismatched_lists_fail() {
        let err = builder()
            .build("cosmos1dest", 0, 0, &denoms(&["uatom", "ustake"]), &[100])
            .unwrap_err();
        assert!(matches!(
            err,
            FaucetError::MismatchedTransfer { denominations: 2, amounts: 1 }
        ));

        assert!(builder().build("cosmos1dest", 0, 0, &denoms(&["uatom"]), &[1, 2]).is_err());
    }

    #[test]
    fn test_empty_lists_fail() {
        let err = builder().build("cosmos1dest", 0, 0, &[], &[]).unwrap_err();
        assert!(matches!(err, FaucetError::EmptyTransfer));
    }

    #[test]
    fn test_sign_bytes_are_sorted_compact_json() {
        let tx = builder()
            .build("cosmos1dest", 3, 9, &denoms(&["uatom"]), &[10])
            .unwrap();
        let bytes = String::from_utf8(tx.sign_bytes()).unwrap();

        assert_eq!(
            bytes,
            concat!(
                r#"{"account_number":"9","chain_id":"testnet-1","#,
                r#""fee":{"amount":[{"amount":"500","denom":"uatom"}],"gas":"200000"},"#,
                r#""memo":"","msgs":[{"type":"cosmos-sdk/MsgSend","value":{"amount":[{"amount":"10","denom":"uatom"}],"#,
                r#""from_address":"cosmos1faucet","to_address":"cosmos1dest"}}],"sequence":"3"}"#
            )
        );
    }
}
