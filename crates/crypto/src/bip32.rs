//! BIP32 hierarchical key derivation for secp256k1.
use crate::error::CryptoError;
use hmac::{Hmac, Mac};
use k256::{ecdsa::SigningKey, NonZeroScalar, Scalar};
use sha2::Sha512;
use std::fmt;
use std::str::FromStr;

const HARDENED_BIT: u32 = 1 << 31;

/// Index of a child key, with the hardened flag in the high bit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChildNumber(u32);

impl ChildNumber {
    pub const fn hardened_from_u32(index: u32) -> Self {
        Self(index | HARDENED_BIT)
    }

    pub const fn non_hardened_from_u32(index: u32) -> Self {
        Self(index & !HARDENED_BIT)
    }

    pub const fn is_hardened(&self) -> bool {
        self.0 & HARDENED_BIT != 0
    }

    pub const fn index(&self) -> u32 {
        self.0 & !HARDENED_BIT
    }

    pub const fn to_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// The following index of the same kind, used when a derived key is invalid.
    fn next(self) -> Result<Self, CryptoError> {
        let index = self.index() + 1;
        if index & HARDENED_BIT != 0 {
            return Err(CryptoError::Derivation("child index overflow".to_string()));
        }
        Ok(if self.is_hardened() {
            Self::hardened_from_u32(index)
        } else {
            Self::non_hardened_from_u32(index)
        })
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_hardened() {
            write!(f, "{}'", self.index())
        } else {
            write!(f, "{}", self.index())
        }
    }
}

impl FromStr for ChildNumber {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (digits, hardened) = match s.strip_suffix('\'').or_else(|| s.strip_suffix('h')) {
            Some(digits) => (digits, true),
            None => (s, false),
        };
        let index: u32 = digits
            .parse()
            .map_err(|_| CryptoError::InvalidPath(format!("invalid child number `{s}`")))?;
        if index & HARDENED_BIT != 0 {
            return Err(CryptoError::InvalidPath(format!("child number `{s}` out of range")));
        }
        Ok(if hardened {
            Self::hardened_from_u32(index)
        } else {
            Self::non_hardened_from_u32(index)
        })
    }
}

/// A derivation path such as `m/44'/118'/0'/0/0`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DerivationPath(Vec<ChildNumber>);

impl DerivationPath {
    pub fn children(&self) -> &[ChildNumber] {
        &self.0
    }
}

impl FromStr for DerivationPath {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        if parts.next() != Some("m") {
            return Err(CryptoError::InvalidPath(format!("`{s}` must start with `m`")));
        }
        let children = parts.map(ChildNumber::from_str).collect::<Result<Vec<_>, _>>()?;
        Ok(Self(children))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for child in &self.0 {
            write!(f, "/{child}")?;
        }
        Ok(())
    }
}

/// Secret key and chain code used for hierarchical key derivation.
#[derive(Clone)]
pub struct DerivedSecretKey {
    secret_key: SigningKey,
    chain_code: [u8; 32],
}

impl DerivedSecretKey {
    /// Derives the BIP32 master key from a seed.
    pub fn master(seed: &[u8]) -> Result<Self, CryptoError> {
        let (secret_key, chain_code) = hmac_sha512(b"Bitcoin seed", &[seed])?;
        let secret_key = SigningKey::from_slice(&secret_key)
            .map_err(|_| CryptoError::Derivation("seed yields an invalid master key".to_string()))?;
        Ok(Self { secret_key, chain_code })
    }

    /// The secret key used to sign messages.
    pub fn secret_key(&self) -> &SigningKey {
        &self.secret_key
    }

    /// The chain code used to derive child keys.
    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    /// Derives a child secret key.
    pub fn derive(&self, child: ChildNumber) -> Result<Self, CryptoError> {
        let index = child.to_bytes();
        let (tweak, chain_code) = if child.is_hardened() {
            let secret = self.secret_key.to_bytes();
            hmac_sha512(&self.chain_code, &[&[0u8][..], secret.as_slice(), &index[..]])?
        } else {
            let public = self.secret_key.verifying_key().to_encoded_point(true);
            hmac_sha512(&self.chain_code, &[public.as_bytes(), &index[..]])?
        };

        // An out of range tweak or a zero sum skips to the next index.
        let tweak = match SigningKey::from_slice(&tweak) {
            Ok(tweak) => tweak,
            Err(_) => return self.derive(child.next()?),
        };
        let sum: Scalar = **self.secret_key.as_nonzero_scalar() + **tweak.as_nonzero_scalar();
        let scalar: Option<NonZeroScalar> = Option::from(NonZeroScalar::new(sum));
        match scalar {
            Some(scalar) => Ok(Self { secret_key: SigningKey::from(scalar), chain_code }),
            None => self.derive(child.next()?),
        }
    }

    /// Derives every child along `path`.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, CryptoError> {
        path.children()
            .iter()
            .try_fold(self.clone(), |key, child| key.derive(*child))
    }
}

fn hmac_sha512(key: &[u8], data: &[&[u8]]) -> Result<([u8; 32], [u8; 32]), CryptoError> {
    let mut hmac = Hmac::<Sha512>::new_from_slice(key)
        .map_err(|err| CryptoError::Derivation(err.to_string()))?;
    for chunk in data {
        hmac.update(chunk);
    }
    let result = hmac.finalize().into_bytes();
    let mut left = [0u8; 32];
    let mut right = [0u8; 32];
    left.copy_from_slice(&result[..32]);
    right.copy_from_slice(&result[32..]);
    Ok((left, right))
}
