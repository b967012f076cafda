//! Chat-driven token faucet for Cosmos SDK chains.
//!
//! Requests are checked against the chain's address format and a
//! per-requester cooldown, then dispatched one at a time from the faucet
//! account:
//! - Address validation
//! - Cooldown gate with release on failure
//! - Serialized fetch, sign and broadcast
//! - Append-only request ledger
//! - Chat command router and HTTP bridge

pub mod address;
pub mod api;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod node;
pub mod service;
pub mod signer;
pub mod tx;

pub use address::AddressRules;
pub use commands::{ChatMessage, Command, CommandRouter};
pub use config::{FaucetConfig, FaucetSettings};
pub use error::{FaucetError, FaucetResult};
pub use gate::{GateDecision, RequestGate};
pub use ledger::{CsvLedger, RequestLedger, RequestRecord, ResultOutcome, ResultRecord};
pub use node::{AccountState, Balances, BroadcastResult, NodeApi, NodeStatus, RestNodeClient, TxLookup, TxSummary};
pub use service::{Dispatched, FaucetService, FaucetStatus, TransferRequest};
pub use signer::{FaucetSigner, SignedTransaction};
pub use tx::{ChainTransaction, Coin, TransactionBuilder, TransferPlan, TxParams};
