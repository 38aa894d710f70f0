#![no_main]

use citadel_etm::{Encoding, Key};
use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

static KEY: Lazy<Key> = Lazy::new(|| citadel_etm::generate_key().unwrap());

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the entry point, the rest is the ciphertext.
    let (selector, ct) = (data[0], &data[1..]);
    let key = KEY.as_bytes();

    let result = match selector % 3 {
        0 => citadel_etm::decrypt(ct, key, Encoding::Raw),
        1 => citadel_etm::decrypt(ct, key, Encoding::Hex),
        _ => citadel_etm::legacy_decrypt(ct, key),
    };

    // Nothing the fuzzer writes carries a valid MAC under a random key.
    assert!(result.is_err());
});
