//! Key handling for the faucet account: secp256k1 keys, HD derivation from a
//! BIP39 mnemonic, bech32 account addresses and deterministic signatures.

pub mod address;
pub mod bip32;
pub mod ecdsa;
mod error;

pub use address::{account_id, address_from_key, bech32_address};
pub use bip39;
pub use ecdsa::{verify, FaucetKey, COSMOS_HD_PATH};
pub use error::CryptoError;
