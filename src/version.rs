//! Version headers and wire layout
//!
//! Format (tagged, v2.x):
//!   header[4] || mac[32] || salt[32] || iv[16] || payload[N]
//!
//! Format (legacy, pre-header):
//!   mac[32] || iv[16] || payload[N]
//!
//! header = 0xDE 0xF5 major minor
//!
//! The MAC covers `header || salt || iv || payload` for tagged ciphertexts
//! and `iv || payload` for legacy ones.

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

use crate::error::InvalidCiphertext;
use crate::kdf::HashFunction;

/// Fixed magic bytes at the start of every tagged ciphertext.
pub const MAGIC: [u8; 2] = [0xDE, 0xF5];

pub const HEADER_BYTES: usize = 4;

/// Master key size for every supported version.
pub const KEY_BYTE_SIZE: usize = 16;

pub const MAC_BYTES: usize = 32;
pub const SALT_BYTES: usize = 32;
pub const IV_BYTES: usize = 16;
pub const BLOCK_BYTES: usize = 16;

/// Smallest tagged ciphertext: v2.0 (CBC) always carries at least one block.
pub const MIN_CIPHERTEXT_BYTES: usize =
    HEADER_BYTES + MAC_BYTES + SALT_BYTES + IV_BYTES + BLOCK_BYTES; // 100

/// Header used by [`crate::encrypt`] unless a [`Version`] is chosen.
pub const CURRENT_VERSION_HEADER: [u8; HEADER_BYTES] = [0xDE, 0xF5, 0x02, 0x00];

/// Header that selects the legacy parameter set. Never written to the wire.
pub const LEGACY_VERSION_HEADER: [u8; HEADER_BYTES] = [0xDE, 0xF5, 0x01, 0x00];

// ---------------------------------------------------------------------------
// Parameter sets
// ---------------------------------------------------------------------------

/// Block cipher and mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    /// AES-128-CBC with PKCS#7 padding.
    Aes128Cbc,
    /// AES-128-CTR, 128-bit big-endian counter starting at the IV.
    Aes128Ctr,
}

impl CipherMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Aes128Cbc => "AES-128-CBC",
            Self::Aes128Ctr => "AES-128-CTR",
        }
    }

    /// Payload bytes required after the IV. Padding guarantees CBC
    /// output is never empty; CTR output is as long as the plaintext.
    pub fn min_payload_bytes(self) -> usize {
        match self {
            Self::Aes128Cbc => 1,
            Self::Aes128Ctr => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Header and salt present; header is authenticated.
    Tagged,
    /// No header, no salt.
    Legacy,
}

/// Immutable algorithm parameters for one format generation.
#[derive(Debug, PartialEq, Eq)]
pub struct VersionConfig {
    pub header: [u8; HEADER_BYTES],
    pub format: Format,
    pub cipher: CipherMode,
    pub key_size: usize,
    pub iv_size: usize,
    pub hash: HashFunction,
    pub mac_size: usize,
    pub salt_size: usize,
    pub encryption_info: &'static [u8],
    pub authentication_info: &'static [u8],
}

impl VersionConfig {
    pub fn major(&self) -> u8 {
        self.header[2]
    }

    pub fn minor(&self) -> u8 {
        self.header[3]
    }

    /// Bytes of the header actually present on the wire.
    pub fn wire_header_bytes(&self) -> usize {
        match self.format {
            Format::Tagged => HEADER_BYTES,
            Format::Legacy => 0,
        }
    }

    /// Everything except the encrypted payload.
    pub fn overhead(&self) -> usize {
        self.wire_header_bytes() + self.mac_size + self.salt_size + self.iv_size
    }
}

pub static V2_0: VersionConfig = VersionConfig {
    header: CURRENT_VERSION_HEADER,
    format: Format::Tagged,
    cipher: CipherMode::Aes128Cbc,
    key_size: KEY_BYTE_SIZE,
    iv_size: IV_BYTES,
    hash: HashFunction::Sha256,
    mac_size: MAC_BYTES,
    salt_size: SALT_BYTES,
    encryption_info: b"CitadelEtm|V2|KeyForEncryption",
    authentication_info: b"CitadelEtm|V2|KeyForAuthentication",
};

pub static V2_1: VersionConfig = VersionConfig {
    header: [0xDE, 0xF5, 0x02, 0x01],
    format: Format::Tagged,
    cipher: CipherMode::Aes128Ctr,
    key_size: KEY_BYTE_SIZE,
    iv_size: IV_BYTES,
    hash: HashFunction::Sha256,
    mac_size: MAC_BYTES,
    salt_size: SALT_BYTES,
    encryption_info: b"CitadelEtm|V2|KeyForEncryption",
    authentication_info: b"CitadelEtm|V2|KeyForAuthentication",
};

pub static LEGACY: VersionConfig = VersionConfig {
    header: LEGACY_VERSION_HEADER,
    format: Format::Legacy,
    cipher: CipherMode::Aes128Cbc,
    key_size: KEY_BYTE_SIZE,
    iv_size: IV_BYTES,
    hash: HashFunction::Sha256,
    mac_size: MAC_BYTES,
    salt_size: 0,
    encryption_info: b"CitadelEtm|KeyForEncryption",
    authentication_info: b"CitadelEtm|KeyForAuthentication",
};

/// Every header the resolver recognizes, legacy sentinel included.
pub static SUPPORTED: [&VersionConfig; 3] = [&V2_0, &V2_1, &LEGACY];

/// Versions available for new encryption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Version {
    /// v2.0, AES-128-CBC.
    #[default]
    V2Cbc,
    /// v2.1, AES-128-CTR.
    V2Ctr,
}

impl Version {
    pub fn config(self) -> &'static VersionConfig {
        match self {
            Self::V2Cbc => &V2_0,
            Self::V2Ctr => &V2_1,
        }
    }

    pub fn all() -> [Version; 2] {
        [Self::V2Cbc, Self::V2Ctr]
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Map a header to its parameter set.
///
/// Magic, major and minor are all compared before the outcome is inspected;
/// no byte mismatch returns early.
pub fn resolve(header: &[u8; HEADER_BYTES]) -> Result<&'static VersionConfig, InvalidCiphertext> {
    let mut valid: Choice = header[0].ct_eq(&MAGIC[0]) & header[1].ct_eq(&MAGIC[1]);

    let mut matched = Choice::from(0);
    let mut index = 0u8;
    for (i, cfg) in SUPPORTED.iter().enumerate() {
        let hit = header[2].ct_eq(&cfg.header[2]) & header[3].ct_eq(&cfg.header[3]);
        index.conditional_assign(&(i as u8), hit);
        matched |= hit;
    }
    valid &= matched;

    if !bool::from(valid) {
        return Err(InvalidCiphertext::UnknownVersion);
    }
    SUPPORTED
        .get(usize::from(index))
        .copied()
        .ok_or(InvalidCiphertext::UnknownVersion)
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

/// Borrowed view of a ciphertext, before authentication.
#[derive(Debug, Clone, Copy)]
pub struct WireComponents<'a> {
    pub config: &'static VersionConfig,
    /// Empty for legacy ciphertexts.
    pub header: &'a [u8],
    pub mac: &'a [u8],
    /// Empty for legacy ciphertexts.
    pub salt: &'a [u8],
    /// `iv || payload`, not yet length-checked against the IV size.
    pub iv_and_payload: &'a [u8],
}

/// Parse a tagged ciphertext. Only the lengths needed to locate the MAC
/// and salt are checked here; the IV length is checked after the MAC.
pub fn decode_tagged(data: &[u8]) -> Result<WireComponents<'_>, InvalidCiphertext> {
    if data.len() < HEADER_BYTES {
        return Err(InvalidCiphertext::TooShort);
    }
    let (header, rest) = data.split_at(HEADER_BYTES);
    let header_arr: &[u8; HEADER_BYTES] = header
        .try_into()
        .map_err(|_| InvalidCiphertext::TooShort)?;

    let config = resolve(header_arr)?;
    if config.format != Format::Tagged {
        return Err(InvalidCiphertext::UnknownVersion);
    }

    if rest.len() <= config.mac_size || rest.len() < config.mac_size + config.salt_size {
        return Err(InvalidCiphertext::TooShort);
    }
    let (mac, rest) = rest.split_at(config.mac_size);
    let (salt, iv_and_payload) = rest.split_at(config.salt_size);

    Ok(WireComponents {
        config,
        header,
        mac,
        salt,
        iv_and_payload,
    })
}

/// Parse a legacy ciphertext against the fixed legacy parameters.
pub fn decode_legacy(data: &[u8]) -> Result<WireComponents<'_>, InvalidCiphertext> {
    let config = resolve(&LEGACY_VERSION_HEADER)?;
    if data.len() <= config.mac_size {
        return Err(InvalidCiphertext::TooShort);
    }
    let (mac, iv_and_payload) = data.split_at(config.mac_size);

    Ok(WireComponents {
        config,
        header: &[],
        mac,
        salt: &[],
        iv_and_payload,
    })
}
