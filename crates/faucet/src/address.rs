//! Syntactic recipient address checks.

use crate::error::{FaucetError, FaucetResult};

/// Expected prefix and length of every account address on the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRules {
    prefix: String,
    length: usize,
}

impl AddressRules {
    pub fn new(prefix: impl Into<String>, length: usize) -> Self {
        Self { prefix: prefix.into(), length }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Accepts `address` iff it starts with the prefix and has the expected length.
    pub fn validate(&self, address: &str) -> FaucetResult<()> {
        if address.starts_with(&self.prefix) && address.len() == self.length {
            Ok(())
        } else {
            Err(FaucetError::InvalidAddress(format!(
                "`{address}`: address length must be equal {} and the prefix must be `{}`",
                self.length, self.prefix
            )))
        }
    }

    pub fn is_valid(&self, address: &str) -> bool {
        self.validate(address).is_ok()
    }
}
