use crate::bip32::{DerivationPath, DerivedSecretKey};
use crate::error::CryptoError;
use bip39::Mnemonic;
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::RngCore;
use std::fmt;

/// HD path of the first account under coin type 118.
pub const COSMOS_HD_PATH: &str = "m/44'/118'/0'/0/0";

/// The faucet's secp256k1 signing key.
#[derive(Clone)]
pub struct FaucetKey {
    signing_key: SigningKey,
}

impl FaucetKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|_| CryptoError::InvalidKey("not a valid secp256k1 scalar".to_string()))?;
        Ok(Self { signing_key })
    }

    /// Parses a 32-byte hex private key, with or without a `0x` prefix.
    pub fn from_private_key_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let trimmed = hex_str.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits)?;
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        Self::from_bytes(&bytes)
    }

    /// Derives the key at [`COSMOS_HD_PATH`] from a BIP39 phrase.
    pub fn from_mnemonic(phrase: &str, passphrase: &str) -> Result<Self, CryptoError> {
        Self::from_mnemonic_path(phrase, passphrase, COSMOS_HD_PATH)
    }

    pub fn from_mnemonic_path(
        phrase: &str,
        passphrase: &str,
        path: &str,
    ) -> Result<Self, CryptoError> {
        let mnemonic = Mnemonic::parse_normalized(phrase.trim())
            .map_err(|err| CryptoError::InvalidMnemonic(err.to_string()))?;
        let path: DerivationPath = path.parse()?;
        let seed = mnemonic.to_seed(passphrase);
        let derived = DerivedSecretKey::master(&seed)?.derive_path(&path)?;
        Ok(Self { signing_key: derived.secret_key().clone() })
    }

    /// Creates a fresh 24-word mnemonic and the key it derives.
    pub fn generate() -> Result<(Mnemonic, Self), CryptoError> {
        let mut entropy = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut entropy);
        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|err| CryptoError::InvalidMnemonic(err.to_string()))?;
        let key = Self::from_mnemonic(&mnemonic.to_string(), "")?;
        Ok((mnemonic, key))
    }

    /// 33-byte compressed SEC1 public key.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Signs SHA-256(`msg`) with an RFC 6979 nonce and returns the 64-byte
    /// `r || s` encoding with low S.
    pub fn sign(&self, msg: &[u8]) -> [u8; 64] {
        let signature: Signature = self.signing_key.sign(msg);
        let signature = signature.normalize_s().unwrap_or(signature);
        let mut out = [0u8; 64];
        out.copy_from_slice(&signature.to_bytes());
        out
    }
}

impl fmt::Debug for FaucetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaucetKey")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

/// Checks a 64-byte compact signature against a SEC1 public key.
pub fn verify(public_key_bytes: &[u8], msg: &[u8], signature_bytes: &[u8]) -> Result<bool, CryptoError> {
    let public_key = VerifyingKey::from_sec1_bytes(public_key_bytes)
        .map_err(|_| CryptoError::InvalidKey("not a valid SEC1 public key".to_string()))?;
    let signature = Signature::from_slice(signature_bytes)
        .map_err(|_| CryptoError::InvalidKey("malformed signature".to_string()))?;

    Ok(public_key.verify(msg, &signature).is_ok())
}
