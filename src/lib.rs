//! # Citadel ETM
//!
//! Versioned encrypt-then-MAC for applications that just need to store
//! secrets safely.
//!
//! ## Quick Start
//!
//! ```rust
//! use citadel_etm::{Encoding, Key};
//!
//! let key = Key::generate()?;
//!
//! let ciphertext = citadel_etm::encrypt(b"secret", key.as_bytes(), Encoding::Hex)?;
//! let plaintext = citadel_etm::decrypt(&ciphertext, key.as_bytes(), Encoding::Hex)?;
//!
//! assert_eq!(plaintext, b"secret");
//! # Ok::<(), citadel_etm::Error>(())
//! ```
//!
//! ## Security Properties
//!
//! - **Encrypt-then-MAC**: HMAC-SHA-256 is verified in constant time before
//!   any byte is decrypted
//! - **Per-message subkeys**: HKDF with a fresh salt, separate info strings
//!   for encryption and authentication
//! - **Self-test gate**: every operation refuses to run until the known-answer
//!   suite has passed, and a failure is permanent for the process
//! - **Loud errors**: bad input is always an `Err`, never an empty plaintext
//!
//! ## What's NOT Provided
//!
//! - Key storage or rotation
//! - Password hashing or key exchange
//! - Streaming encryption

#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/citadel-etm/0.1.0")]

// ---------------------------------------------------------------------------
// Internal modules (not part of public API)
// ---------------------------------------------------------------------------

mod cipher;
mod ct;
mod engine;
mod error;
mod key;
mod random;

// Exposed for known-answer tests and the fuzz targets, not stable API.
#[doc(hidden)]
pub mod kdf;
#[doc(hidden)]
pub mod version;

pub mod selftest;

// ---------------------------------------------------------------------------
// Public SDK interface
// ---------------------------------------------------------------------------

mod sdk;

pub use ct::constant_time_eq;
pub use error::{Error, InvalidCiphertext, OperationFault, SelfTestFailure};
pub use key::Key;
pub use sdk::{
    // Main types
    Crypto,
    Encoding,

    // Inspection
    CiphertextInfo,

    // Constants
    CURRENT_VERSION_HEADER,
    MIN_CIPHERTEXT_BYTES,
    VERSION,
};
pub use selftest::{SelfTestFixtures, SelfTestGate, SelfTestState};
pub use version::{Version, KEY_BYTE_SIZE};

// ---------------------------------------------------------------------------
// Process-wide shortcuts
// ---------------------------------------------------------------------------

/// Generate a master key. See [`Crypto::generate_key`].
pub fn generate_key() -> Result<Key, Error> {
    Crypto::new().generate_key()
}

/// Encrypt with the current version. See [`Crypto::encrypt`].
pub fn encrypt(plaintext: &[u8], key: &[u8], encoding: Encoding) -> Result<Vec<u8>, Error> {
    Crypto::new().encrypt(plaintext, key, encoding)
}

/// See [`Crypto::decrypt`].
pub fn decrypt(ciphertext: &[u8], key: &[u8], encoding: Encoding) -> Result<Vec<u8>, Error> {
    Crypto::new().decrypt(ciphertext, key, encoding)
}

/// See [`Crypto::legacy_decrypt`].
pub fn legacy_decrypt(ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, Error> {
    Crypto::new().legacy_decrypt(ciphertext, key)
}

/// See [`Crypto::inspect`].
pub fn inspect(ciphertext: &[u8], encoding: Encoding) -> Result<CiphertextInfo, Error> {
    Crypto::new().inspect(ciphertext, encoding)
}

/// Run the process-wide self-test, or return its recorded outcome.
pub fn self_test() -> Result<(), Error> {
    selftest::global().check()
}

pub fn self_test_state() -> SelfTestState {
    selftest::global().state()
}
