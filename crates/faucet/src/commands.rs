//! Chat command parsing and replies.

use crate::error::FaucetError;
use crate::node::{Balances, TxLookup};
use crate::service::{FaucetService, TransferRequest};
use chrono::Utc;
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_HELP: &str = "\
Faucet commands:
$request <address>       send test coins to <address>
$balance <address>       show the balance of <address>
$faucet_status           node status and faucet balance
$faucet_address          the faucet's own address
$tx_info <hash>          details of a transaction
$help                    this message";

/// An inbound chat message, as delivered by the chat adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub requester_id: String,
    pub requester_name: String,
    pub channel: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Balance(String),
    Help,
    FaucetStatus,
    FaucetAddress,
    TxInfo(String),
    Request(String),
}

impl Command {
    /// Parses a message. Arguments lose all spaces; addresses are lowercased.
    pub fn parse(content: &str) -> Option<Self> {
        let content = content.trim_start();
        let argument = |prefix: &str| -> String {
            content[prefix.len()..].replace(' ', "")
        };

        if content.starts_with("$balance") {
            Some(Command::Balance(argument("$balance").to_lowercase()))
        } else if content.starts_with("$help") {
            Some(Command::Help)
        } else if content.starts_with("$faucet_status") {
            Some(Command::FaucetStatus)
        } else if content.starts_with("$faucet_address") || content.starts_with("$tap_address") {
            Some(Command::FaucetAddress)
        } else if content.starts_with("$tx_info") {
            Some(Command::TxInfo(argument("$tx_info")))
        } else if content.starts_with("$request") {
            Some(Command::Request(argument("$request").to_lowercase()))
        } else {
            None
        }
    }

    /// Commands only served in the configured channels.
    pub fn is_channel_gated(&self) -> bool {
        matches!(self, Command::FaucetAddress | Command::TxInfo(_) | Command::Request(_))
    }
}

/// Turns chat messages into faucet operations and plain text replies.
pub struct CommandRouter {
    service: Arc<FaucetService>,
    channels: Vec<String>,
    help: String,
}

impl CommandRouter {
    pub fn new(service: Arc<FaucetService>, channels: Vec<String>, help: Option<String>) -> Self {
        Self {
            service,
            channels,
            help: help.unwrap_or_else(|| DEFAULT_HELP.to_string()),
        }
    }

    pub fn service(&self) -> &Arc<FaucetService> {
        &self.service
    }

    fn listens_on(&self, channel: &str) -> bool {
        self.channels.is_empty() || self.channels.iter().any(|c| c == channel)
    }

    /// `None` when the message is not a command served in its channel.
    pub async fn handle(&self, message: &ChatMessage) -> Option<String> {
        let command = Command::parse(&message.content)?;
        if command.is_channel_gated() && !self.listens_on(&message.channel) {
            debug!(channel = %message.channel, ?command, "ignoring command outside faucet channels");
            return None;
        }

        let mention = format!("@{}", message.requester_name);
        let reply = match command {
            Command::Help => self.help.clone(),
            Command::FaucetAddress => self.service.faucet_address().to_string(),
            Command::Balance(address) => self.balance(&mention, &address).await,
            Command::FaucetStatus => self.status().await,
            Command::TxInfo(hash) => self.tx_info(&mention, &hash).await,
            Command::Request(address) => self.request(&mention, message, address).await,
        };
        Some(reply)
    }

    async fn balance(&self, mention: &str, address: &str) -> String {
        match self.service.balance(address).await {
            Ok(state) if state.balances.is_empty() && state.account_number == 0 => {
                format!("{mention} account is not initialized (balance is empty)")
            }
            Ok(state) => format!("{mention}\n{}", format_balances(&state.balances)),
            Err(err) => format!("{mention}, {err}"),
        }
    }

    async fn status(&self) -> String {
        match self.service.status().await {
            Ok(status) => format!(
                "Moniker:       {}\n\
                 Address:       {}\n\
                 Syncs?:        {}\n\
                 Last block:    {}\n\
                 Voting power:  {}\n\
                 Faucet balance:\n{}",
                status.node.moniker,
                status.address,
                status.node.catching_up,
                status.node.latest_block_height,
                status.node.voting_power,
                format_balances(&status.balances)
            ),
            Err(err) => {
                warn!("Status request failed: {}", err);
                format!("Can't get faucet status: {err}")
            }
        }
    }

    async fn tx_info(&self, mention: &str, hash: &str) -> String {
        match self.service.tx_info(hash).await {
            Ok(TxLookup::Found(summary)) => {
                let mut amount = String::new();
                for coin in &summary.coins {
                    let _ = writeln!(amount, "{}: {}", coin.denom, coin.amount);
                }
                format!("From:    {}\nTo:      {}\nAmount:\n{}", summary.from, summary.to, amount)
            }
            Ok(TxLookup::NotFound) => format!("{mention}, error: {hash} not found"),
            Err(err @ FaucetError::InvalidHashLength(_)) => err.to_string(),
            Err(err) => format!("Can't get transaction info: {err}"),
        }
    }

    async fn request(&self, mention: &str, message: &ChatMessage, address: String) -> String {
        let request = TransferRequest {
            requester_id: message.requester_id.clone(),
            requester_name: message.requester_name.clone(),
            recipient: address.clone(),
            submitted_at: Utc::now(),
        };

        match self.service.request(request).await {
            Ok(dispatched) => format!("{mention}, `$tx_info` {}", dispatched.link),
            Err(FaucetError::Cooldown(remaining)) => {
                let hours = self.service.cooldown().num_seconds() as f64 / 3600.0;
                format!(
                    "{mention}, You can request coins no more than once every {hours} hours. \
                     The next attempt is possible after {:.2} minutes",
                    remaining as f64 / 60.0
                )
            }
            Err(FaucetError::InvalidAddress(_)) => {
                let rules = self.service.rules();
                format!(
                    "{mention}, Invalid address format `{}`\n\
                     Address length must be equal {} and the prefix must be `{}`",
                    address,
                    rules.length(),
                    rules.prefix()
                )
            }
            Err(FaucetError::BroadcastRejected { raw, .. }) => {
                format!("{mention}, Can't send transaction. Try making another one request\n{raw}")
            }
            Err(err) => {
                format!("{mention}, Can't send transaction. Try making another one request\n{err}")
            }
        }
    }
}

fn format_balances(balances: &Balances) -> String {
    if balances.is_empty() {
        return "(empty)".to_string();
    }
    balances
        .iter()
        .map(|(denom, amount)| format!("{denom}: {amount}"))
        .collect::<Vec<_>>()
        .join("\n")
}
