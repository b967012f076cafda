use thiserror::Error;

/// Errors raised while loading keys, deriving addresses or signing.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid Hex String")]
    HexError(#[from] hex::FromHexError),

    #[error("Invalid Key: {0}")]
    InvalidKey(String),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Invalid derivation path: {0}")]
    InvalidPath(String),

    #[error("Key derivation failed: {0}")]
    Derivation(String),

    #[error("Address encoding failed: {0}")]
    AddressEncoding(#[from] bech32::Error),
}
