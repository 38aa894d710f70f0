//! Citadel ETM SDK: public API surface
//!
//! # API Stability Promise
//!
//! These exports are stable across minor versions:
//! - `Crypto`: encryption engine
//! - `Key`: master key
//! - `Encoding`, `Version`: explicit configuration
//! - `Error`: the three error kinds
//!
//! Internal modules (`engine`, `kdf`, `cipher`) are NOT part of the public
//! API and may change without notice.

use core::fmt;
use std::borrow::Cow;
use std::sync::Arc;

use crate::engine;
use crate::error::{Error, InvalidCiphertext};
use crate::key::Key;
use crate::selftest::{self, SelfTestGate, SelfTestState};
use crate::version::{self, Version};

/// Representation of ciphertext bytes at the API boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Binary.
    Raw,
    /// Lowercase hex, safe for text transports.
    #[default]
    Hex,
}

impl Encoding {
    fn encode(self, bytes: Vec<u8>) -> Vec<u8> {
        match self {
            Self::Raw => bytes,
            Self::Hex => hex::encode(bytes).into_bytes(),
        }
    }

    fn decode(self, input: &[u8]) -> Result<Cow<'_, [u8]>, Error> {
        match self {
            Self::Raw => Ok(Cow::Borrowed(input)),
            Self::Hex => hex::decode(input)
                .map(Cow::Owned)
                .map_err(|_| InvalidCiphertext::BadEncoding.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Main SDK interface
// ---------------------------------------------------------------------------

/// Citadel ETM encryption engine.
///
/// Every method passes the runtime self-test gate first. If the self-test
/// ever failed, every method returns [`Error::SelfTestFailed`].
///
/// # Example
///
/// ```
/// use citadel_etm::{Crypto, Encoding};
///
/// let crypto = Crypto::new();
/// let key = crypto.generate_key()?;
///
/// let ciphertext = crypto.encrypt(b"secret data", key.as_bytes(), Encoding::Hex)?;
/// let plaintext = crypto.decrypt(&ciphertext, key.as_bytes(), Encoding::Hex)?;
///
/// assert_eq!(plaintext, b"secret data");
/// # Ok::<(), citadel_etm::Error>(())
/// ```
#[derive(Clone)]
pub struct Crypto {
    version: Version,
    gate: Arc<SelfTestGate>,
}

impl Default for Crypto {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Crypto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crypto")
            .field("version", &self.version)
            .field("self_test", &self.gate.state())
            .finish()
    }
}

impl Crypto {
    /// Engine that writes the current version, behind the process-wide gate.
    pub fn new() -> Self {
        Self {
            version: Version::default(),
            gate: selftest::global(),
        }
    }

    /// Write ciphertexts of `version`. Decryption accepts every version.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Swap in a gate with corrupted fixtures. Outside tests every engine
    /// shares the process-wide gate.
    #[cfg(test)]
    pub(crate) fn with_gate(mut self, gate: Arc<SelfTestGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Run (or recall the result of) the self-test.
    pub fn self_test(&self) -> Result<(), Error> {
        self.gate.check()
    }

    pub fn self_test_state(&self) -> SelfTestState {
        self.gate.state()
    }

    /// Generate a new random master key.
    pub fn generate_key(&self) -> Result<Key, Error> {
        self.gate.check()?;
        Ok(Key::random()?)
    }

    /// Encrypt and authenticate `plaintext` under `key`.
    ///
    /// `key` must be exactly [`crate::KEY_BYTE_SIZE`] bytes.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        key: &[u8],
        encoding: Encoding,
    ) -> Result<Vec<u8>, Error> {
        self.gate.check()?;
        let ciphertext = engine::encrypt(self.version.config(), plaintext, key)?;
        Ok(encoding.encode(ciphertext))
    }

    /// Verify and decrypt a ciphertext produced by [`Crypto::encrypt`].
    ///
    /// # Error Behavior
    ///
    /// Never returns an empty or partial plaintext on failure:
    /// - tampered, truncated, extended, or wrong-key input:
    ///   `InvalidCiphertext(IntegrityCheckFailed)`
    /// - unknown header: `InvalidCiphertext(UnknownVersion)`
    /// - too few bytes: `InvalidCiphertext(TooShort)`
    /// - a cipher failure after the MAC verified: `CannotPerformOperation`
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8],
        encoding: Encoding,
    ) -> Result<Vec<u8>, Error> {
        self.gate.check()?;
        let raw = encoding.decode(ciphertext)?;
        engine::decrypt(&raw, key)
    }

    /// Decrypt a binary ciphertext from before version headers existed.
    pub fn legacy_decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, Error> {
        self.gate.check()?;
        engine::legacy_decrypt(ciphertext, key)
    }

    /// Ciphertext metadata, without a key and without decrypting.
    pub fn inspect(&self, ciphertext: &[u8], encoding: Encoding) -> Result<CiphertextInfo, Error> {
        self.gate.check()?;
        let raw = encoding.decode(ciphertext)?;
        let parts = version::decode_tagged(&raw)?;
        let config = parts.config;

        Ok(CiphertextInfo {
            major: config.major(),
            minor: config.minor(),
            cipher: config.cipher.name(),
            hash: config.hash.name(),
            total_bytes: raw.len(),
            payload_bytes: raw.len().saturating_sub(config.overhead()),
        })
    }
}

// ---------------------------------------------------------------------------
// Inspection utilities (for ops/debugging)
// ---------------------------------------------------------------------------

/// Ciphertext metadata (extracted without decryption).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiphertextInfo {
    pub major: u8,
    pub minor: u8,
    pub cipher: &'static str,
    pub hash: &'static str,
    /// Binary length of the whole ciphertext.
    pub total_bytes: usize,
    /// Encrypted payload (total minus header, MAC, salt and IV).
    pub payload_bytes: usize,
}

impl fmt::Display for CiphertextInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Citadel ETM v{}.{} | {} + HMAC-{} | {} bytes ({} payload)",
            self.major, self.minor, self.cipher, self.hash, self.total_bytes, self.payload_bytes
        )
    }
}

// ---------------------------------------------------------------------------
// Version info
// ---------------------------------------------------------------------------

/// SDK version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Header written by default.
pub const CURRENT_VERSION_HEADER: [u8; 4] = version::CURRENT_VERSION_HEADER;

/// Smallest valid tagged ciphertext, in bytes.
pub const MIN_CIPHERTEXT_BYTES: usize = version::MIN_CIPHERTEXT_BYTES;
