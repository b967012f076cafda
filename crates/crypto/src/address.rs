//! Bech32 account addresses.
use crate::ecdsa::FaucetKey;
use crate::error::CryptoError;
use bech32::{ToBase32, Variant};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// RIPEMD-160 of the SHA-256 of a compressed public key.
pub fn account_id(public_key: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(public_key);
    let ripemd = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripemd);
    out
}

/// Encodes the account id of `public_key` under a human readable prefix.
pub fn bech32_address(prefix: &str, public_key: &[u8]) -> Result<String, CryptoError> {
    let id = account_id(public_key);
    Ok(bech32::encode(prefix, id.to_base32(), Variant::Bech32)?)
}

pub fn address_from_key(key: &FaucetKey, prefix: &str) -> Result<String, CryptoError> {
    bech32_address(prefix, &key.public_key_bytes())
}
