//! Unified error types for Citadel ETM.
//!
//! Three kinds, and only three:
//!
//! - [`Error::CannotPerformOperation`]: the environment (or the caller's key)
//!   is unfit for cryptographic work.
//! - [`Error::InvalidCiphertext`]: the input was malformed, forged, or
//!   encrypted under another key.
//! - [`Error::SelfTestFailed`]: the runtime self-test failed. Sticky for the
//!   lifetime of the process.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("cannot perform operation: {0}")]
    CannotPerformOperation(OperationFault),

    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(InvalidCiphertext),

    #[error("{0}")]
    SelfTestFailed(SelfTestFailure),
}

/// Why an operation could not be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OperationFault {
    #[error("bad key length: expected {expected} bytes, got {actual}")]
    BadKeyLength { expected: usize, actual: usize },

    #[error("key is not valid hex")]
    BadKeyEncoding,

    #[error("random byte generation failed")]
    RandomSourceFailed,

    #[error("required cipher is unavailable")]
    CipherUnavailable,

    #[error("HMAC rejected its key")]
    MacUnavailable,

    /// The cipher rejected input that had already passed the MAC check.
    #[error("cipher operation failed")]
    CipherFailed,

    #[error("requested key derivation output is too long")]
    KdfOutputTooLong,
}

/// Why a ciphertext was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidCiphertext {
    #[error("unknown version")]
    UnknownVersion,

    #[error("ciphertext is too short")]
    TooShort,

    #[error("integrity check failed")]
    IntegrityCheckFailed,

    #[error("ciphertext is not valid hex")]
    BadEncoding,
}

/// A runtime self-test check did not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("self-test failed: {check}")]
pub struct SelfTestFailure {
    /// Name of the first check that failed.
    pub check: &'static str,
}

impl Error {
    /// True for a MAC mismatch (tampering, wrong key).
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidCiphertext(InvalidCiphertext::IntegrityCheckFailed)
        )
    }

    pub fn is_invalid_ciphertext(&self) -> bool {
        matches!(self, Self::InvalidCiphertext(_))
    }

    pub fn is_self_test_failure(&self) -> bool {
        matches!(self, Self::SelfTestFailed(_))
    }
}

impl From<InvalidCiphertext> for Error {
    fn from(e: InvalidCiphertext) -> Self {
        Self::InvalidCiphertext(e)
    }
}

impl From<OperationFault> for Error {
    fn from(e: OperationFault) -> Self {
        Self::CannotPerformOperation(e)
    }
}

impl From<SelfTestFailure> for Error {
    fn from(e: SelfTestFailure) -> Self {
        Self::SelfTestFailed(e)
    }
}
