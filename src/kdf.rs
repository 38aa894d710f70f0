//! HMAC + HKDF (RFC 5869)
//!
//! PRK = HMAC(salt or zeros[hash_len], ikm)
//! T(i) = HMAC(PRK, T(i-1) || info || i),  T(0) = ""
//! OKM = first L bytes of T(1) || T(2) || ...

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::OperationFault;

/// Hash functions available to HMAC and HKDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashFunction {
    /// Only used by known-answer vectors.
    Sha1,
    Sha256,
}

impl HashFunction {
    pub const fn output_size(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
        }
    }
}

/// HMAC over the concatenation of `parts`.
pub fn hmac(hash: HashFunction, key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>, OperationFault> {
    match hash {
        HashFunction::Sha1 => hmac_with::<Hmac<Sha1>>(key, parts),
        HashFunction::Sha256 => hmac_with::<Hmac<Sha256>>(key, parts),
    }
}

fn hmac_with<M: Mac + KeyInit>(key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>, OperationFault> {
    let mut mac =
        <M as KeyInit>::new_from_slice(key).map_err(|_| OperationFault::MacUnavailable)?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

/// HKDF extract-and-expand.
///
/// An absent or empty `salt` is replaced by `hash.output_size()` zero bytes.
/// Asking for more than `255 * hash.output_size()` bytes is a caller bug and
/// reported as [`OperationFault::KdfOutputTooLong`].
pub fn derive(
    hash: HashFunction,
    ikm: &[u8],
    length: usize,
    info: &[u8],
    salt: Option<&[u8]>,
) -> Result<Zeroizing<Vec<u8>>, OperationFault> {
    let digest_len = hash.output_size();
    if length > 255 * digest_len {
        return Err(OperationFault::KdfOutputTooLong);
    }

    let zeros = [0u8; 64];
    let salt = match salt {
        Some(s) if !s.is_empty() => s,
        _ => &zeros[..digest_len],
    };

    let prk = Zeroizing::new(hmac(hash, salt, &[ikm])?);

    let mut okm = Zeroizing::new(Vec::with_capacity(length + digest_len));
    let mut block: Zeroizing<Vec<u8>> = Zeroizing::new(Vec::new());
    let mut counter = 1u8;
    while okm.len() < length {
        let counter_byte = [counter];
        let parts = [block.as_slice(), info, &counter_byte[..]];
        let next = Zeroizing::new(hmac(hash, prk.as_slice(), &parts)?);
        block.clear();
        block.extend_from_slice(&next);
        okm.extend_from_slice(&next);
        counter = counter.wrapping_add(1);
    }
    okm.truncate(length);

    Ok(okm)
}

/// Derive a subkey of `key_size` bytes for one operation.
pub(crate) fn derive_subkey(
    hash: HashFunction,
    master: &[u8],
    key_size: usize,
    info: &[u8],
    salt: &[u8],
) -> Result<Zeroizing<Vec<u8>>, OperationFault> {
    derive(hash, master, key_size, info, Some(salt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    // RFC 4231 test case 1
    #[test]
    fn hmac_sha256_rfc4231_case1() {
        let mac = hmac(HashFunction::Sha256, &[0x0b; 20], &[b"Hi There"]).unwrap();
        assert_eq!(
            mac,
            h("b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7")
        );
    }

    #[test]
    fn hmac_parts_equal_concatenation() {
        let key = b"key";
        let joined = hmac(HashFunction::Sha256, key, &[b"hello world"]).unwrap();
        let split = hmac(HashFunction::Sha256, key, &[b"hello", b" ", b"world"]).unwrap();
        assert_eq!(joined, split);
        assert_eq!(hmac(HashFunction::Sha1, key, &[b"x"]).unwrap().len(), 20);
    }

    // RFC 5869 test case 1
    #[test]
    fn hkdf_sha256_case1() {
        let okm = derive(
            HashFunction::Sha256,
            &[0x0b; 22],
            42,
            &h("f0f1f2f3f4f5f6f7f8f9"),
            Some(&h("000102030405060708090a0b0c")),
        )
        .unwrap();
        assert_eq!(
            okm.as_slice(),
            h(concat!(
                "3cb25f25faacd57a90434f64d0362f2a",
                "2d2d0a90cf1a5a4c5db02d56ecc4c5bf",
                "34007208d5b887185865",
            ))
        );
    }

    // RFC 5869 test case 3: empty salt and info
    #[test]
    fn hkdf_sha256_case3() {
        let okm = derive(HashFunction::Sha256, &[0x0b; 22], 42, b"", None).unwrap();
        assert_eq!(
            okm.as_slice(),
            h(concat!(
                "8da4e775a563c18f715f802a063c5a31",
                "b8a11f5c5ee1879ec3454e5f3c738d2d",
                "9d201395faa4b61a96c8",
            ))
        );
    }

    // RFC 5869 test case 7: SHA-1, absent salt
    #[test]
    fn hkdf_sha1_case7() {
        let okm = derive(HashFunction::Sha1, &[0x0c; 22], 42, b"", None).unwrap();
        assert_eq!(
            okm.as_slice(),
            h(concat!(
                "2c91117204d745f3500d636a62f64f0a",
                "b3bae548aa53d423b0d1f27ebba6f5e5",
                "673a081d70cce7acfc48",
            ))
        );
    }

    #[test]
    fn empty_salt_is_zero_block() {
        let a = derive(HashFunction::Sha256, b"ikm", 32, b"info", None).unwrap();
        let b = derive(HashFunction::Sha256, b"ikm", 32, b"info", Some(b"")).unwrap();
        let c = derive(HashFunction::Sha256, b"ikm", 32, b"info", Some(&[0u8; 32])).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn output_length_limit() {
        assert_eq!(
            derive(HashFunction::Sha256, b"ikm", 255 * 32 + 1, b"", None).unwrap_err(),
            OperationFault::KdfOutputTooLong
        );
        let max = derive(HashFunction::Sha256, b"ikm", 255 * 32, b"", None).unwrap();
        assert_eq!(max.len(), 255 * 32);
        assert!(derive(HashFunction::Sha1, b"ikm", 0, b"", None).unwrap().is_empty());
    }

    #[test]
    fn matches_hkdf_crate() {
        let salt = [7u8; 32];
        for len in [1usize, 16, 31, 32, 33, 100] {
            let ours = derive(HashFunction::Sha256, b"master", len, b"ctx", Some(&salt)).unwrap();
            let hk = ::hkdf::Hkdf::<Sha256>::new(Some(&salt), b"master");
            let mut theirs = vec![0u8; len];
            hk.expand(b"ctx", &mut theirs).unwrap();
            assert_eq!(ours.as_slice(), theirs.as_slice());
        }
    }

    #[test]
    fn distinct_info_gives_distinct_subkeys() {
        let salt = [1u8; 32];
        let a = derive_subkey(HashFunction::Sha256, &[9u8; 16], 16, b"enc", &salt).unwrap();
        let b = derive_subkey(HashFunction::Sha256, &[9u8; 16], 16, b"auth", &salt).unwrap();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }
}
