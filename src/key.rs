//! Master key.
//!
//! Serialization:
//!   Key = raw[16]                        (binary)
//!   Key = hex(raw[16])                   (32 lowercase hex chars)

use core::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::ct::constant_time_eq;
use crate::error::{Error, OperationFault};
use crate::random;
use crate::version::KEY_BYTE_SIZE;

/// Random master key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key {
    bytes: [u8; KEY_BYTE_SIZE],
}

impl Key {
    /// Draw a fresh key from the OS CSPRNG, without the self-test gate.
    pub(crate) fn random() -> Result<Self, OperationFault> {
        let mut bytes = [0u8; KEY_BYTE_SIZE];
        random::fill(&mut bytes)?;
        Ok(Self { bytes })
    }

    /// Generate a new random key. Passes the process-wide self-test gate.
    pub fn generate() -> Result<Self, Error> {
        crate::selftest::global().check()?;
        Ok(Self::random()?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; KEY_BYTE_SIZE] = bytes.try_into().map_err(|_| {
            OperationFault::BadKeyLength {
                expected: KEY_BYTE_SIZE,
                actual: bytes.len(),
            }
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_BYTE_SIZE] {
        &self.bytes
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }

    /// Parse the output of [`Key::to_hex`]. Surrounding whitespace is ignored.
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        let raw = Zeroizing::new(hex::decode(s).map_err(|_| OperationFault::BadKeyEncoding)?);
        Self::from_bytes(&raw)
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.bytes, &other.bytes)
    }
}

impl Eq for Key {}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key").field("bytes", &"[REDACTED]").finish()
    }
}
