//! Runtime self-test gate.
//!
//! Every public operation calls [`SelfTestGate::check`] on the process-wide
//! gate first. The suite runs once per process; concurrent first callers
//! block until it finishes and then see its final outcome. A failure is
//! sticky: every later `check` reports it again.
//!
//! The suite calls the ungated functions in `engine` directly, so it never
//! re-enters the gate.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::ct::constant_time_eq;
use crate::error::{Error, InvalidCiphertext, SelfTestFailure};
use crate::key::Key;
use crate::kdf::{self, HashFunction};
use crate::version::{
    CipherMode, Version, CURRENT_VERSION_HEADER, HEADER_BYTES, KEY_BYTE_SIZE, SUPPORTED,
};
use crate::{cipher, engine, random};

// ---------------------------------------------------------------------------
// Check names (reported in SelfTestFailure)
// ---------------------------------------------------------------------------

pub const CHECK_CIPHER_AVAILABLE: &str = "cipher availability";
pub const CHECK_AES: &str = "AES known answer";
pub const CHECK_HMAC: &str = "HMAC known answer";
pub const CHECK_HKDF: &str = "HKDF known answer";
pub const CHECK_ROUNDTRIP: &str = "encrypt/decrypt round trip";
pub const CHECK_TAMPER: &str = "tamper detection";
pub const CHECK_WRONG_KEY: &str = "wrong key rejection";
pub const CHECK_SHORT: &str = "short ciphertext rejection";
pub const CHECK_KEY_SIZE: &str = "random key size";
pub const CHECK_DOMAIN_SEPARATION: &str = "subkey domain separation";
pub const CHECK_PANICKED: &str = "suite panicked";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SelfTestState {
    NotRun = 0,
    Running = 1,
    Passed = 2,
    Failed = 3,
}

impl SelfTestState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Running,
            2 => Self::Passed,
            3 => Self::Failed,
            _ => Self::NotRun,
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// One RFC 5869 vector, hex-encoded.
#[derive(Debug, Clone)]
pub struct HkdfVector {
    pub hash: HashFunction,
    pub ikm: &'static str,
    pub salt: Option<&'static str>,
    pub info: &'static str,
    pub length: usize,
    pub okm: &'static str,
}

/// Known-answer vectors used by the suite, hex-encoded.
#[derive(Debug, Clone)]
pub struct SelfTestFixtures {
    pub aes_key: &'static str,
    pub aes_iv: &'static str,
    pub aes_plaintext: &'static str,
    /// Includes the trailing PKCS#7 padding block.
    pub aes_ciphertext: &'static str,
    pub hmac_key: &'static str,
    pub hmac_data: &'static str,
    pub hmac_digest: &'static str,
    pub hkdf: [HkdfVector; 2],
}

impl SelfTestFixtures {
    pub fn standard() -> Self {
        Self {
            // NIST SP 800-38A F.2.1 (CBC-AES128)
            aes_key: "2b7e151628aed2a6abf7158809cf4f3c",
            aes_iv: "000102030405060708090a0b0c0d0e0f",
            aes_plaintext: concat!(
                "6bc1bee22e409f96e93d7e117393172a",
                "ae2d8a571e03ac9c9eb76fac45af8e51",
                "30c81c46a35ce411e5fbc1191a0a52ef",
                "f69f2445df4f9b17ad2b417be66c3710",
            ),
            aes_ciphertext: concat!(
                "7649abac8119b246cee98e9b12e9197d",
                "5086cb9b507219ee95db113a917678b2",
                "73bed6b8e3c1743b7116e69e22229516",
                "3ff1caa1681fac09120eca307586e1a7",
                // padding block
                "8cb82807230e1321d3fae00d18cc2012",
            ),
            // RFC 4231 test case 1
            hmac_key: "0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b",
            hmac_data: "4869205468657265",
            hmac_digest: "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7",
            hkdf: [
                // RFC 5869 test case 1
                HkdfVector {
                    hash: HashFunction::Sha256,
                    ikm: "0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b",
                    salt: Some("000102030405060708090a0b0c"),
                    info: "f0f1f2f3f4f5f6f7f8f9",
                    length: 42,
                    okm: concat!(
                        "3cb25f25faacd57a90434f64d0362f2a",
                        "2d2d0a90cf1a5a4c5db02d56ecc4c5bf",
                        "34007208d5b887185865",
                    ),
                },
                // RFC 5869 test case 7
                HkdfVector {
                    hash: HashFunction::Sha1,
                    ikm: "0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c",
                    salt: None,
                    info: "",
                    length: 42,
                    okm: concat!(
                        "2c91117204d745f3500d636a62f64f0a",
                        "b3bae548aa53d423b0d1f27ebba6f5e5",
                        "673a081d70cce7acfc48",
                    ),
                },
            ],
        }
    }
}

impl Default for SelfTestFixtures {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

thread_local! {
    /// Address of the gate whose suite is running on this thread, or 0.
    static RUNNING_ON_THIS_THREAD: Cell<usize> = const { Cell::new(0) };
}

/// Run-once, fail-closed self-test gate.
///
/// Public operations only ever go through the process-wide gate returned by
/// [`global`], so a failure there stops every operation in the process.
pub struct SelfTestGate {
    fixtures: SelfTestFixtures,
    state: AtomicU8,
    runs: AtomicUsize,
    outcome: OnceCell<Result<(), SelfTestFailure>>,
}

impl SelfTestGate {
    pub(crate) fn new() -> Self {
        Self::with_fixtures(SelfTestFixtures::standard())
    }

    pub(crate) fn with_fixtures(fixtures: SelfTestFixtures) -> Self {
        Self {
            fixtures,
            state: AtomicU8::new(SelfTestState::NotRun as u8),
            runs: AtomicUsize::new(0),
            outcome: OnceCell::new(),
        }
    }

    fn id(&self) -> usize {
        self as *const Self as usize
    }

    pub fn state(&self) -> SelfTestState {
        SelfTestState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// How many times the suite has executed. Never more than one.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::Acquire)
    }

    /// Pass the gate, running the suite if nobody has yet.
    pub fn check(&self) -> Result<(), Error> {
        if let Some(outcome) = self.outcome.get() {
            return (*outcome).map_err(Error::from);
        }
        // Reentered from inside this gate's own suite: blocking here would
        // deadlock. Any other gate still runs or reports its own outcome.
        if RUNNING_ON_THIS_THREAD.with(Cell::get) == self.id() {
            return Ok(());
        }
        let outcome = self.outcome.get_or_init(|| self.run());
        (*outcome).map_err(Error::from)
    }

    fn run(&self) -> Result<(), SelfTestFailure> {
        self.state.store(SelfTestState::Running as u8, Ordering::Release);
        self.runs.fetch_add(1, Ordering::AcqRel);
        tracing::debug!("running cryptographic self-test");

        let outer = RUNNING_ON_THIS_THREAD.with(|c| c.replace(self.id()));
        let result = panic::catch_unwind(AssertUnwindSafe(|| run_suite(&self.fixtures)))
            .unwrap_or(Err(SelfTestFailure { check: CHECK_PANICKED }));
        RUNNING_ON_THIS_THREAD.with(|c| c.set(outer));

        match result {
            Ok(()) => {
                self.state.store(SelfTestState::Passed as u8, Ordering::Release);
                tracing::info!("cryptographic self-test passed");
            }
            Err(failure) => {
                self.state.store(SelfTestState::Failed as u8, Ordering::Release);
                tracing::error!(check = failure.check, "cryptographic self-test failed");
            }
        }
        result
    }
}

static GLOBAL: OnceCell<Arc<SelfTestGate>> = OnceCell::new();

/// The process-wide gate. Built from the standard fixtures unless
/// [`install_global_fixtures`] ran first.
pub fn global() -> Arc<SelfTestGate> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(SelfTestGate::new())))
}

/// Build the process-wide gate from `fixtures` instead of the standard set.
///
/// Only takes effect before the gate is first used; returns whether it did.
/// Fixtures that do not match the primitives fail the gate, and with it every
/// operation for the rest of the process.
#[doc(hidden)]
pub fn install_global_fixtures(fixtures: SelfTestFixtures) -> bool {
    GLOBAL
        .set(Arc::new(SelfTestGate::with_fixtures(fixtures)))
        .is_ok()
}

// ---------------------------------------------------------------------------
// Suite
// ---------------------------------------------------------------------------

fn fail(check: &'static str) -> SelfTestFailure {
    SelfTestFailure { check }
}

fn ensure(cond: bool, check: &'static str) -> Result<(), SelfTestFailure> {
    if cond {
        Ok(())
    } else {
        Err(fail(check))
    }
}

fn unhex(s: &str, check: &'static str) -> Result<Vec<u8>, SelfTestFailure> {
    hex::decode(s).map_err(|_| fail(check))
}

/// Expect an integrity failure and nothing else: success, a panic-free
/// cipher error, or a length error all fail the check.
fn expect_integrity_failure(
    result: Result<Vec<u8>, Error>,
    check: &'static str,
) -> Result<(), SelfTestFailure> {
    match result {
        Err(e) if e.is_integrity_failure() => Ok(()),
        _ => Err(fail(check)),
    }
}

fn run_suite(f: &SelfTestFixtures) -> Result<(), SelfTestFailure> {
    check_cipher_available()?;
    check_aes(f)?;
    check_hmac(f)?;
    check_hkdf(f)?;
    check_roundtrip()?;
    check_tamper()?;
    check_wrong_key()?;
    check_short()?;
    check_key_size()?;
    check_domain_separation()
}

fn check_cipher_available() -> Result<(), SelfTestFailure> {
    for mode in [CipherMode::Aes128Cbc, CipherMode::Aes128Ctr] {
        ensure(cipher::is_available(mode), CHECK_CIPHER_AVAILABLE)?;
    }
    Ok(())
}

fn check_aes(f: &SelfTestFixtures) -> Result<(), SelfTestFailure> {
    let key = unhex(f.aes_key, CHECK_AES)?;
    let iv = unhex(f.aes_iv, CHECK_AES)?;
    let pt = unhex(f.aes_plaintext, CHECK_AES)?;
    let ct = unhex(f.aes_ciphertext, CHECK_AES)?;

    let got = cipher::encrypt(CipherMode::Aes128Cbc, &key, &iv, &pt)
        .map_err(|_| fail(CHECK_AES))?;
    ensure(got == ct, CHECK_AES)?;
    let back = cipher::decrypt(CipherMode::Aes128Cbc, &key, &iv, &ct)
        .map_err(|_| fail(CHECK_AES))?;
    ensure(back == pt, CHECK_AES)
}

fn check_hmac(f: &SelfTestFixtures) -> Result<(), SelfTestFailure> {
    let key = unhex(f.hmac_key, CHECK_HMAC)?;
    let data = unhex(f.hmac_data, CHECK_HMAC)?;
    let digest = unhex(f.hmac_digest, CHECK_HMAC)?;

    let got =
        kdf::hmac(HashFunction::Sha256, &key, &[&data[..]]).map_err(|_| fail(CHECK_HMAC))?;
    ensure(!digest.is_empty() && got.starts_with(&digest), CHECK_HMAC)
}

fn check_hkdf(f: &SelfTestFixtures) -> Result<(), SelfTestFailure> {
    for v in &f.hkdf {
        let ikm = unhex(v.ikm, CHECK_HKDF)?;
        let info = unhex(v.info, CHECK_HKDF)?;
        let okm = unhex(v.okm, CHECK_HKDF)?;
        let salt = v.salt.map(|s| unhex(s, CHECK_HKDF)).transpose()?;

        let got = kdf::derive(v.hash, &ikm, v.length, &info, salt.as_deref())
            .map_err(|_| fail(CHECK_HKDF))?;
        ensure(got.as_slice() == okm.as_slice(), CHECK_HKDF)?;
    }
    Ok(())
}

fn random_key(check: &'static str) -> Result<Key, SelfTestFailure> {
    Key::random().map_err(|_| fail(check))
}

/// Random plaintext of 0..=255 bytes.
fn random_plaintext(check: &'static str) -> Result<Vec<u8>, SelfTestFailure> {
    let mut len = [0u8; 1];
    random::fill(&mut len).map_err(|_| fail(check))?;
    random::bytes(usize::from(len[0])).map_err(|_| fail(check))
}

// Any error here is a self-test failure, never an ordinary bad-ciphertext
// outcome.
fn check_roundtrip() -> Result<(), SelfTestFailure> {
    for version in Version::all() {
        let key = random_key(CHECK_ROUNDTRIP)?;
        let data = random_plaintext(CHECK_ROUNDTRIP)?;
        let ct = engine::encrypt(version.config(), &data, key.as_bytes())
            .map_err(|_| fail(CHECK_ROUNDTRIP))?;
        let pt = engine::decrypt(&ct, key.as_bytes()).map_err(|_| fail(CHECK_ROUNDTRIP))?;
        ensure(constant_time_eq(&pt, &data), CHECK_ROUNDTRIP)?;
    }

    let key = random_key(CHECK_ROUNDTRIP)?;
    let data = random_plaintext(CHECK_ROUNDTRIP)?;
    let ct = engine::encrypt_legacy(&data, key.as_bytes()).map_err(|_| fail(CHECK_ROUNDTRIP))?;
    let pt = engine::legacy_decrypt(&ct, key.as_bytes()).map_err(|_| fail(CHECK_ROUNDTRIP))?;
    ensure(constant_time_eq(&pt, &data), CHECK_ROUNDTRIP)
}

fn check_tamper() -> Result<(), SelfTestFailure> {
    for version in Version::all() {
        let config = version.config();
        let key = random_key(CHECK_TAMPER)?;
        let ct = engine::encrypt(config, b"tamper check", key.as_bytes())
            .map_err(|_| fail(CHECK_TAMPER))?;

        let mut appended = ct.clone();
        appended.push(0);
        expect_integrity_failure(engine::decrypt(&appended, key.as_bytes()), CHECK_TAMPER)?;

        let iv_offset = HEADER_BYTES + config.mac_size + config.salt_size;
        let mut flipped = ct;
        let byte = flipped.get_mut(iv_offset).ok_or_else(|| fail(CHECK_TAMPER))?;
        *byte ^= 0x01;
        expect_integrity_failure(engine::decrypt(&flipped, key.as_bytes()), CHECK_TAMPER)?;
    }
    Ok(())
}

fn check_wrong_key() -> Result<(), SelfTestFailure> {
    for version in Version::all() {
        let key = random_key(CHECK_WRONG_KEY)?;
        let other = random_key(CHECK_WRONG_KEY)?;
        let ct = engine::encrypt(version.config(), b"wrong key check", key.as_bytes())
            .map_err(|_| fail(CHECK_WRONG_KEY))?;
        expect_integrity_failure(engine::decrypt(&ct, other.as_bytes()), CHECK_WRONG_KEY)?;
    }
    Ok(())
}

fn check_short() -> Result<(), SelfTestFailure> {
    let key = random_key(CHECK_SHORT)?;
    let too_short = Err(Error::InvalidCiphertext(InvalidCiphertext::TooShort));

    for config in SUPPORTED {
        let mut tagged = CURRENT_VERSION_HEADER.to_vec();
        tagged.resize(HEADER_BYTES + config.mac_size - 1, 0);
        ensure(engine::decrypt(&tagged, key.as_bytes()) == too_short, CHECK_SHORT)?;

        let legacy = vec![0u8; config.mac_size - 1];
        ensure(engine::legacy_decrypt(&legacy, key.as_bytes()) == too_short, CHECK_SHORT)?;
    }
    Ok(())
}

fn check_key_size() -> Result<(), SelfTestFailure> {
    let key = random_key(CHECK_KEY_SIZE)?;
    ensure(key.as_ref().len() == KEY_BYTE_SIZE, CHECK_KEY_SIZE)
}

fn check_domain_separation() -> Result<(), SelfTestFailure> {
    let key = random_key(CHECK_DOMAIN_SEPARATION)?;
    let salt = random::bytes(32).map_err(|_| fail(CHECK_DOMAIN_SEPARATION))?;

    for config in SUPPORTED {
        ensure(
            config.encryption_info != config.authentication_info,
            CHECK_DOMAIN_SEPARATION,
        )?;
        let salt = &salt[..config.salt_size];
        let derive = |info: &[u8]| {
            kdf::derive_subkey(config.hash, key.as_bytes(), config.key_size, info, salt)
                .map_err(|_| fail(CHECK_DOMAIN_SEPARATION))
        };
        let ek = derive(config.encryption_info)?;
        let ak = derive(config.authentication_info)?;
        ensure(!constant_time_eq(&ek, &ak), CHECK_DOMAIN_SEPARATION)?;
    }
    Ok(())
}
