//! Transaction signature (TSIG) keys.
//!
//! Signing and response verification are done by `domain`'s TSIG
//! machinery; this module parses keys in the `name:secret[:algorithm]`
//! form used by `nsupdate -y`. HMAC-MD5 is not offered.

use crate::error::{Result, UpdateError};
use domain::tsig::{Algorithm, Key, KeyName};
use domain::utils::base64;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A shared secret used to sign update messages.
///
/// Cloning is cheap; clones share the key material.
///
/// # Example
///
/// ```
/// use dns_update::{TsigAlgorithm, TsigKey};
///
/// let key: TsigKey = "ddns-key.example.com:c2VjcmV0:hmac-sha512".parse().unwrap();
/// assert_eq!(key.algorithm(), TsigAlgorithm::Sha512);
/// assert_eq!(key.name().to_string(), "ddns-key.example.com");
/// ```
#[derive(Clone)]
pub struct TsigKey {
    key: Arc<Key>,
}

impl TsigKey {
    /// Creates a key from its name, algorithm and secret octets.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidKey`] if `secret` is empty or the key
    /// is rejected for `algorithm`.
    pub fn new(name: KeyName, algorithm: Algorithm, secret: &[u8]) -> Result<Self> {
        if secret.is_empty() {
            return Err(UpdateError::InvalidKey(format!("{name}: empty secret")));
        }
        let key = Key::new(algorithm, secret, name, None, None)
            .map_err(|e| UpdateError::InvalidKey(format!("TSIG key is invalid: {e}")))?;
        Ok(Self { key: Arc::new(key) })
    }

    #[must_use]
    pub fn name(&self) -> &KeyName {
        self.key.name()
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.key.algorithm()
    }

    /// The key in the form the `domain` signing transports take.
    #[must_use]
    pub fn shared(&self) -> Arc<Key> {
        Arc::clone(&self.key)
    }
}

impl FromStr for TsigKey {
    type Err = UpdateError;

    /// Parses `name:secret[:algorithm]`, with a base64 secret.
    ///
    /// The algorithm defaults to `hmac-sha256`.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        let (Some(name), Some(secret)) = (parts.next(), parts.next()) else {
            return Err(UpdateError::InvalidKey(
                "expected name:secret[:algorithm]".to_string(),
            ));
        };
        let algorithm = match parts.next() {
            Some(alg) => parse_algorithm(alg)?,
            None => Algorithm::Sha256,
        };
        let name = KeyName::from_str(name)
            .map_err(|e| UpdateError::InvalidKey(format!("key name: {e}")))?;
        let secret: Vec<u8> = base64::decode(secret.trim())
            .map_err(|e| UpdateError::InvalidKey(format!("{name}: {e}")))?;
        Self::new(name, algorithm, &secret)
    }
}

fn parse_algorithm(s: &str) -> Result<Algorithm> {
    s.trim_end_matches('.')
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| UpdateError::InvalidKey(format!("unsupported algorithm: {s}")))
}

impl fmt::Debug for TsigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TsigKey")
            .field("name", self.name())
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}
