//! Faucet configuration

use crate::address::AddressRules;
use crate::error::{FaucetError, FaucetResult};
use crate::tx::{Coin, TransferPlan, TxParams};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tap_common::utils::logging::LoggingConfig;
use tap_crypto::{address_from_key, FaucetKey};

/// Prefix of environment variables overriding file settings.
pub const ENV_PREFIX: &str = "TAP";

/// A value that never shows up in `Debug` output.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Faucet service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FaucetConfig {
    #[serde(default)]
    pub chat: ChatConfig,
    pub node: NodeConfig,
    pub chain: ChainConfig,
    pub tx: TxConfig,
    pub faucet: KeyConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatConfig {
    /// Bot credential, handed to the chat adapter untouched
    pub bot_token: Option<SecretString>,
    /// Channels serving gated commands; empty means every channel
    #[serde(default)]
    pub channels: Vec<String>,
    pub help_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub rest_url: String,
    pub rpc_url: String,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: String,
    pub address_prefix: String,
    /// Defaults to the length of the faucet's own address
    pub address_length: Option<usize>,
    /// Either a template containing `{hash}` or a base URL
    pub explorer_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxConfig {
    pub denominations: Vec<String>,
    pub amounts: Vec<u64>,
    pub gas_limit: u64,
    pub fee_amount: u64,
    pub fee_denom: Option<String>,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    pub private_key: Option<SecretString>,
    pub mnemonic: Option<SecretString>,
    pub cooldown_secs: u64,
    pub dispatch_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_requests_path")]
    pub requests_path: PathBuf,
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { requests_path: default_requests_path(), results_path: default_results_path() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: default_server_addr() }
    }
}

fn default_http_timeout() -> u64 { 30 }
fn default_requests_path() -> PathBuf { PathBuf::from("tx_log.csv") }
fn default_results_path() -> PathBuf { PathBuf::from("transactions.csv") }
fn default_server_addr() -> String { "127.0.0.1:3000".to_string() }

/// Checked settings the faucet runs with.
#[derive(Debug, Clone)]
pub struct FaucetSettings {
    pub key: FaucetKey,
    pub address: String,
    pub rules: AddressRules,
    pub plan: TransferPlan,
    pub params: TxParams,
    pub cooldown: chrono::Duration,
    pub dispatch_timeout: Option<Duration>,
    pub explorer_url: Option<String>,
}

impl FaucetConfig {
    /// Reads `path`, then applies `TAP__SECTION__KEY` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        tap_common::utils::config::load_layered_config(path, Some(ENV_PREFIX))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.node.http_timeout_secs)
    }

    /// Loads the faucet key from exactly one of `private_key` and `mnemonic`.
    pub fn faucet_key(&self) -> FaucetResult<FaucetKey> {
        let private_key = self.faucet.private_key.as_ref().filter(|k| !k.is_blank());
        let mnemonic = self.faucet.mnemonic.as_ref().filter(|m| !m.is_blank());
        match (private_key, mnemonic) {
            (Some(key), None) => Ok(FaucetKey::from_private_key_hex(key.expose())?),
            (None, Some(phrase)) => Ok(FaucetKey::from_mnemonic(phrase.expose(), "")?),
            (Some(_), Some(_)) => Err(FaucetError::Config(
                "set either faucet.private_key or faucet.mnemonic, not both".into(),
            )),
            (None, None) => Err(FaucetError::Config(
                "one of faucet.private_key or faucet.mnemonic is required".into(),
            )),
        }
    }

    pub fn validate(&self) -> FaucetResult<FaucetSettings> {
        if self.faucet.cooldown_secs == 0 {
            return Err(FaucetError::Config("faucet.cooldown_secs must be positive".into()));
        }
        let cooldown_secs = i64::try_from(self.faucet.cooldown_secs)
            .map_err(|_| FaucetError::Config("faucet.cooldown_secs is too large".into()))?;
        if self.chain.address_prefix.is_empty() {
            return Err(FaucetError::Config("chain.address_prefix must not be empty".into()));
        }

        let amounts: Vec<u128> = self.tx.amounts.iter().map(|a| u128::from(*a)).collect();
        let plan = TransferPlan::new(&self.tx.denominations, &amounts)
            .map_err(|err| FaucetError::Config(format!("tx.denominations / tx.amounts: {err}")))?;

        let key = self.faucet_key()?;
        let address = address_from_key(&key, &self.chain.address_prefix)?;
        let length = self.chain.address_length.unwrap_or(address.len());

        let fee_denom = match &self.tx.fee_denom {
            Some(denom) => denom.clone(),
            None => plan.coins()[0].denom.clone(),
        };

        Ok(FaucetSettings {
            key,
            rules: AddressRules::new(self.chain.address_prefix.clone(), length),
            address,
            plan,
            params: TxParams {
                chain_id: self.chain.chain_id.clone(),
                gas_limit: self.tx.gas_limit,
                fee: Coin::new(fee_denom, u128::from(self.tx.fee_amount)),
                memo: self.tx.memo.clone(),
            },
            cooldown: chrono::Duration::seconds(cooldown_secs),
            dispatch_timeout: self
                .faucet
                .dispatch_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            explorer_url: self.chain.explorer_url.clone().filter(|url| !url.trim().is_empty()),
        })
    }
}
