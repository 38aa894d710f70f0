//! Known Answer / wire-format tests (tagged v2 and legacy)

use citadel_etm::kdf::{self, HashFunction};
use citadel_etm::version::{
    self, CipherMode, Format, HEADER_BYTES, IV_BYTES, LEGACY_VERSION_HEADER, MAC_BYTES,
    SALT_BYTES,
};
use citadel_etm::{
    Crypto, Encoding, Error, InvalidCiphertext, Version, CURRENT_VERSION_HEADER, KEY_BYTE_SIZE,
    MIN_CIPHERTEXT_BYTES,
};

// Fixed key, salt 20..3f, IV 40..4f, plaintext "Citadel ETM known answer".
const KAT_KEY: &str = "000102030405060708090a0b0c0d0e0f";
const KAT_PLAINTEXT: &[u8] = b"Citadel ETM known answer";

const KAT_V2_0: &str = concat!(
    "def50200",
    "f9edf4d5811e19c2c81242c4262b03fc7f5865b89002ac67219a2ae37daa61a2",
    "202122232425262728292a2b2c2d2e2f303132333435363738393a3b3c3d3e3f",
    "404142434445464748494a4b4c4d4e4f",
    "c717cf0884f82ec05397542fde360ee6f1f4047ace8b28352af856cb8c56ca2f",
);

const KAT_V2_1: &str = concat!(
    "def50201",
    "defa04dd0140da411c14db53b0b862a7a05d7155da93c032756a77bfca65e3a7",
    "202122232425262728292a2b2c2d2e2f303132333435363738393a3b3c3d3e3f",
    "404142434445464748494a4b4c4d4e4f",
    "58befacddfdbe17cf7a6d477a98ad80ab0844efa050b5a55",
);

const KAT_LEGACY: &str = concat!(
    "c48deafa0603ace85c2c5170f90f9123e22bf29fd7b4a5bf7e9f06074be73b6c",
    "404142434445464748494a4b4c4d4e4f",
    "520ddfe52b451a413a6e47330c31b84be0929d52deb1fc23faabc8fced222ded",
);

fn h(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

#[test]
fn test_wire_constants() {
    assert_eq!(KEY_BYTE_SIZE, 16);
    assert_eq!(HEADER_BYTES, 4);
    assert_eq!(MAC_BYTES, 32);
    assert_eq!(SALT_BYTES, 32);
    assert_eq!(IV_BYTES, 16);
    assert_eq!(CURRENT_VERSION_HEADER, [0xDE, 0xF5, 0x02, 0x00]);
    assert_eq!(LEGACY_VERSION_HEADER, [0xDE, 0xF5, 0x01, 0x00]);
    assert_eq!(MIN_CIPHERTEXT_BYTES, 4 + 32 + 32 + 16 + 16);
}

#[test]
fn test_version_table() {
    let v20 = version::resolve(&[0xDE, 0xF5, 0x02, 0x00]).unwrap();
    assert_eq!(v20.cipher, CipherMode::Aes128Cbc);
    assert_eq!(v20.hash, HashFunction::Sha256);
    assert_eq!(v20.format, Format::Tagged);

    let v21 = version::resolve(&[0xDE, 0xF5, 0x02, 0x01]).unwrap();
    assert_eq!(v21.cipher, CipherMode::Aes128Ctr);
    assert_eq!(v21.key_size, v20.key_size);
    assert_eq!(v21.encryption_info, v20.encryption_info);

    let legacy = version::resolve(&LEGACY_VERSION_HEADER).unwrap();
    assert_eq!(legacy.format, Format::Legacy);
    assert_eq!(legacy.salt_size, 0);

    for header in [[0xDE, 0xF5, 0x03, 0x00], [0xDE, 0xF5, 0x02, 0x02], [0xDF, 0xF5, 0x02, 0x00]] {
        assert_eq!(version::resolve(&header).unwrap_err(), InvalidCiphertext::UnknownVersion);
    }
}

#[test]
fn test_wire_format_structure() {
    let key = citadel_etm::generate_key().unwrap();
    let ct = citadel_etm::encrypt(b"test", key.as_bytes(), Encoding::Raw).unwrap();

    let parts = version::decode_tagged(&ct).unwrap();
    assert_eq!(parts.header, &CURRENT_VERSION_HEADER);
    assert_eq!(parts.mac.len(), 32);
    assert_eq!(parts.salt.len(), 32);
    // One padded CBC block after the IV.
    assert_eq!(parts.iv_and_payload.len(), 16 + 16);
}

#[test]
fn test_minimum_ciphertext_roundtrip() {
    let key = citadel_etm::generate_key().unwrap();

    let ct = citadel_etm::encrypt(b"", key.as_bytes(), Encoding::Raw).unwrap();
    assert_eq!(ct.len(), MIN_CIPHERTEXT_BYTES);
    assert!(citadel_etm::decrypt(&ct, key.as_bytes(), Encoding::Raw).unwrap().is_empty());

    let ctr = Crypto::new().with_version(Version::V2Ctr);
    let ct = ctr.encrypt(b"", key.as_bytes(), Encoding::Raw).unwrap();
    assert_eq!(ct.len(), MIN_CIPHERTEXT_BYTES - 16);
    assert!(ctr.decrypt(&ct, key.as_bytes(), Encoding::Raw).unwrap().is_empty());
}

#[test]
fn test_known_ciphertext_v2_0() {
    let pt = citadel_etm::decrypt(KAT_V2_0.as_bytes(), &h(KAT_KEY), Encoding::Hex).unwrap();
    assert_eq!(pt, KAT_PLAINTEXT);
}

#[test]
fn test_known_ciphertext_v2_1() {
    let pt = citadel_etm::decrypt(&h(KAT_V2_1), &h(KAT_KEY), Encoding::Raw).unwrap();
    assert_eq!(pt, KAT_PLAINTEXT);
}

#[test]
fn test_known_ciphertext_legacy() {
    let pt = citadel_etm::legacy_decrypt(&h(KAT_LEGACY), &h(KAT_KEY)).unwrap();
    assert_eq!(pt, KAT_PLAINTEXT);
}

#[test]
fn test_known_ciphertexts_do_not_cross_formats() {
    let key = h(KAT_KEY);
    assert!(citadel_etm::decrypt(&h(KAT_LEGACY), &key, Encoding::Raw).is_err());
    assert!(citadel_etm::legacy_decrypt(&h(KAT_V2_0), &key).is_err());

    // Relabelling a 2.0 ciphertext as 2.1 breaks the MAC, since the header is authenticated.
    let mut relabelled = h(KAT_V2_0);
    relabelled[3] = 0x01;
    assert_eq!(
        citadel_etm::decrypt(&relabelled, &key, Encoding::Raw).unwrap_err(),
        Error::InvalidCiphertext(InvalidCiphertext::IntegrityCheckFailed)
    );
}

#[test]
fn test_rejects_invalid_version() {
    let key = h(KAT_KEY);

    let mut ct = h(KAT_V2_0);
    ct[2] = 0x09;
    assert_eq!(
        citadel_etm::decrypt(&ct, &key, Encoding::Raw).unwrap_err(),
        Error::InvalidCiphertext(InvalidCiphertext::UnknownVersion)
    );

    // The legacy sentinel never appears on the wire.
    let mut ct = h(KAT_V2_0);
    ct[..4].copy_from_slice(&LEGACY_VERSION_HEADER);
    assert_eq!(
        citadel_etm::decrypt(&ct, &key, Encoding::Raw).unwrap_err(),
        Error::InvalidCiphertext(InvalidCiphertext::UnknownVersion)
    );
}

#[test]
fn test_inspect_known_ciphertext() {
    let info = citadel_etm::inspect(KAT_V2_1.as_bytes(), Encoding::Hex).unwrap();
    assert_eq!((info.major, info.minor), (2, 1));
    assert_eq!(info.cipher, "AES-128-CTR");
    assert_eq!(info.total_bytes, 84 + KAT_PLAINTEXT.len());
    assert_eq!(info.payload_bytes, KAT_PLAINTEXT.len());
}

// RFC 5869 A.1
#[test]
fn test_hkdf_rfc5869_case1() {
    let okm = kdf::derive(
        HashFunction::Sha256,
        &[0x0b; 22],
        42,
        &h("f0f1f2f3f4f5f6f7f8f9"),
        Some(h("000102030405060708090a0b0c").as_slice()),
    )
    .unwrap();
    assert_eq!(
        hex::encode(&*okm),
        "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
    );
}

// RFC 5869 A.7
#[test]
fn test_hkdf_rfc5869_case7() {
    let okm = kdf::derive(HashFunction::Sha1, &[0x0c; 22], 42, b"", None).unwrap();
    assert_eq!(
        hex::encode(&*okm),
        "2c91117204d745f3500d636a62f64f0ab3bae548aa53d423b0d1f27ebba6f5e5673a081d70cce7acfc48"
    );
}

// RFC 4231 4.2
#[test]
fn test_hmac_rfc4231_case1() {
    let tag = kdf::hmac(HashFunction::Sha256, &[0x0b; 20], &[&b"Hi There"[..]]).unwrap();
    assert_eq!(
        hex::encode(tag),
        "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7"
    );
}

#[test]
fn test_constant_time_eq() {
    assert!(citadel_etm::constant_time_eq(b"abc", b"abc"));
    assert!(!citadel_etm::constant_time_eq(b"abc", b"abd"));
    assert!(!citadel_etm::constant_time_eq(b"abc", b"ab"));
    assert!(citadel_etm::constant_time_eq(b"", b""));
}

#[test]
fn test_error_messages_name_the_reason() {
    let key = h(KAT_KEY);
    let mut ct = h(KAT_V2_0);
    let last = ct.len() - 1;
    ct[last] ^= 0x01;

    let err = citadel_etm::decrypt(&ct, &key, Encoding::Raw).unwrap_err();
    assert!(err.is_integrity_failure());
    assert_eq!(err.to_string(), "invalid ciphertext: integrity check failed");
}
