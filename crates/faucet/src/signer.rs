//! Signs transfer transactions with the faucet key.

use crate::tx::ChainTransaction;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tap_crypto::{address_from_key, CryptoError, FaucetKey};

const PUB_KEY_TYPE: &str = "tendermint/PubKeySecp256k1";

/// Owns the faucet key; the secret never leaves this type.
pub struct FaucetSigner {
    key: FaucetKey,
    address: String,
}

impl FaucetSigner {
    /// Derives the faucet address for `prefix` once, up front.
    pub fn new(key: FaucetKey, prefix: &str) -> Result<Self, CryptoError> {
        let address = address_from_key(&key, prefix)?;
        Ok(Self { key, address })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.key.public_key_bytes())
    }

    /// Signs the canonical sign bytes of `tx`. The transaction is not modified.
    pub fn sign(&self, tx: &ChainTransaction) -> SignedTransaction {
        let signature = self.key.sign(&tx.sign_bytes());
        SignedTransaction {
            tx: tx.clone(),
            signature: BASE64.encode(signature),
            public_key: self.public_key_base64(),
        }
    }
}

impl std::fmt::Debug for FaucetSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaucetSigner").field("address", &self.address).finish_non_exhaustive()
    }
}

/// A network-ready transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: ChainTransaction,
    signature: String,
    public_key: String,
}

impl SignedTransaction {
    pub fn transaction(&self) -> &ChainTransaction {
        &self.tx
    }

    pub fn sequence(&self) -> u64 {
        self.tx.sequence
    }

    pub fn account_number(&self) -> u64 {
        self.tx.account_number
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The body posted to the node's `txs` endpoint.
    pub fn to_json(&self) -> Value {
        json!({
            "tx": {
                "msg": self.tx.messages_json(),
                "fee": self.tx.fee_json(),
                "memo": self.tx.memo,
                "signatures": [{
                    "signature": self.signature,
                    "pub_key": { "type": PUB_KEY_TYPE, "value": self.public_key },
                    "account_number": self.tx.account_number.to_string(),
                    "sequence": self.tx.sequence.to_string(),
                }],
            },
            "mode": self.tx.mode.as_str(),
        })
    }
}
