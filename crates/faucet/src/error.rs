//! Error types for the faucet service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tap_crypto::CryptoError;
use thiserror::Error;

/// Faucet service errors
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Incorrect length hash id: {0} instead 64")]
    InvalidHashLength(usize),

    #[error("Mismatched transfer lists: {denominations} denominations, {amounts} amounts")]
    MismatchedTransfer { denominations: usize, amounts: usize },

    #[error("Transfer carries no coins")]
    EmptyTransfer,

    #[error("Cooldown active: try again in {0} seconds")]
    Cooldown(u64),

    #[error("Node request failed: {0}")]
    Transport(String),

    #[error("Malformed node response: {0}")]
    MalformedResponse(String),

    #[error("Broadcast rejected (code {code:?}): {raw}")]
    BroadcastRejected { code: Option<i64>, raw: String },

    #[error("Dispatch timed out after {0} seconds")]
    DispatchTimeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] std::io::Error),
}

impl FaucetError {
    /// Transport-level failures that a manual retry may resolve.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FaucetError::Transport(_) | FaucetError::MalformedResponse(_) | FaucetError::DispatchTimeout(_)
        )
    }
}

impl From<reqwest::Error> for FaucetError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FaucetError::MalformedResponse(err.to_string())
        } else {
            FaucetError::Transport(err.to_string())
        }
    }
}

impl IntoResponse for FaucetError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            FaucetError::InvalidAddress(_) => (StatusCode::BAD_REQUEST, "INVALID_ADDRESS"),
            FaucetError::InvalidHashLength(_) => (StatusCode::BAD_REQUEST, "INVALID_HASH"),
            FaucetError::MismatchedTransfer { .. } | FaucetError::EmptyTransfer => {
                (StatusCode::BAD_REQUEST, "INVALID_TRANSFER")
            }
            FaucetError::Cooldown(_) => (StatusCode::TOO_MANY_REQUESTS, "COOLDOWN"),
            FaucetError::Transport(_) | FaucetError::MalformedResponse(_) => {
                (StatusCode::BAD_GATEWAY, "NODE_ERROR")
            }
            FaucetError::BroadcastRejected { .. } => (StatusCode::BAD_GATEWAY, "BROADCAST_REJECTED"),
            FaucetError::DispatchTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "DISPATCH_TIMEOUT"),
            FaucetError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            FaucetError::Crypto(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CRYPTO_ERROR"),
            FaucetError::Ledger(_) => (StatusCode::INTERNAL_SERVER_ERROR, "LEDGER_ERROR"),
        };

        let body = Json(json!({
            "error": error_code,
            "message": self.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));

        (status, body).into_response()
    }
}

pub type FaucetResult<T> = Result<T, FaucetError>;
