//! Encrypt-then-MAC orchestration.
//!
//! These functions do not pass the self-test gate; the gate calls them
//! directly while it runs. Public entry points live in `sdk`.
//!
//! Encrypt:
//!   salt = random[salt_size]
//!   ek = HKDF(key, info=encryption_info, salt)
//!   ak = HKDF(key, info=authentication_info, salt)
//!   iv = random[iv_size]
//!   body = salt || iv || Cipher(ek, iv, plaintext)
//!   out = header || HMAC(ak, header || body) || body
//!
//! Decrypt verifies the MAC in constant time before anything is decrypted.

use zeroize::Zeroizing;

use crate::ct::constant_time_eq;
use crate::error::{Error, InvalidCiphertext, OperationFault};
use crate::version::{self, Format, VersionConfig, WireComponents, KEY_BYTE_SIZE, LEGACY};
use crate::{cipher, kdf, random};

fn check_key(key: &[u8]) -> Result<(), OperationFault> {
    if key.len() != KEY_BYTE_SIZE {
        return Err(OperationFault::BadKeyLength {
            expected: KEY_BYTE_SIZE,
            actual: key.len(),
        });
    }
    Ok(())
}

fn encryption_key(
    config: &VersionConfig,
    key: &[u8],
    salt: &[u8],
) -> Result<Zeroizing<Vec<u8>>, OperationFault> {
    kdf::derive_subkey(config.hash, key, config.key_size, config.encryption_info, salt)
}

fn authentication_key(
    config: &VersionConfig,
    key: &[u8],
    salt: &[u8],
) -> Result<Zeroizing<Vec<u8>>, OperationFault> {
    kdf::derive_subkey(config.hash, key, config.key_size, config.authentication_info, salt)
}

/// Encrypt under a tagged-format config. Salt and IV are fresh per call;
/// reusing an IV under one key breaks CTR outright.
pub(crate) fn encrypt(
    config: &'static VersionConfig,
    plaintext: &[u8],
    key: &[u8],
) -> Result<Vec<u8>, Error> {
    check_key(key)?;
    if config.format != Format::Tagged {
        return Err(OperationFault::CipherUnavailable.into());
    }

    let salt = random::bytes(config.salt_size)?;
    let ek = encryption_key(config, key, &salt)?;
    let ak = authentication_key(config, key, &salt)?;
    let iv = random::bytes(config.iv_size)?;

    let raw = cipher::encrypt(config.cipher, &ek, &iv, plaintext)?;
    let mac = kdf::hmac(
        config.hash,
        &ak,
        &[&config.header[..], &salt[..], &iv[..], &raw[..]],
    )?;

    let mut out = Vec::with_capacity(config.overhead() + raw.len());
    out.extend_from_slice(&config.header);
    out.extend_from_slice(&mac);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&raw);
    Ok(out)
}

/// Decrypt a tagged ciphertext; the version comes from its header.
pub(crate) fn decrypt(ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, Error> {
    check_key(key)?;
    let parts = version::decode_tagged(ciphertext)?;
    open(&parts, key)
}

/// Decrypt a ciphertext written before version headers existed.
pub(crate) fn legacy_decrypt(ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, Error> {
    check_key(key)?;
    let parts = version::decode_legacy(ciphertext)?;
    open(&parts, key)
}

fn open(parts: &WireComponents<'_>, key: &[u8]) -> Result<Vec<u8>, Error> {
    let config = parts.config;

    let ak = authentication_key(config, key, parts.salt)?;
    let expected = kdf::hmac(
        config.hash,
        &ak,
        &[parts.header, parts.salt, parts.iv_and_payload],
    )?;
    if !constant_time_eq(&expected, parts.mac) {
        tracing::debug!(
            major = config.major(),
            minor = config.minor(),
            "integrity check failed"
        );
        return Err(InvalidCiphertext::IntegrityCheckFailed.into());
    }

    let ek = encryption_key(config, key, parts.salt)?;
    if parts.iv_and_payload.len() < config.iv_size + config.cipher.min_payload_bytes() {
        return Err(InvalidCiphertext::TooShort.into());
    }
    let (iv, payload) = parts.iv_and_payload.split_at(config.iv_size);

    cipher::decrypt(config.cipher, &ek, iv, payload).map_err(|fault| {
        tracing::warn!(%fault, "cipher failed on an authenticated ciphertext");
        fault.into()
    })
}

/// Build a legacy ciphertext: `HMAC(ak, iv || ct) || iv || ct`.
/// Only the self-test writes this format.
pub(crate) fn encrypt_legacy(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, Error> {
    check_key(key)?;
    let config = &LEGACY;

    let ek = encryption_key(config, key, &[])?;
    let ak = authentication_key(config, key, &[])?;
    let iv = random::bytes(config.iv_size)?;

    let raw = cipher::encrypt(config.cipher, &ek, &iv, plaintext)?;
    let mac = kdf::hmac(config.hash, &ak, &[&iv[..], &raw[..]])?;

    let mut out = Vec::with_capacity(config.overhead() + raw.len());
    out.extend_from_slice(&mac);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&raw);
    Ok(out)
}
