//! Self-test gate behaviour through the public API.

use std::sync::Arc;
use std::thread;

use citadel_etm::selftest;
use citadel_etm::{Crypto, Encoding, Key, SelfTestFixtures, SelfTestState, Version};

#[test]
fn global_gate_passes_and_is_idempotent() {
    assert_eq!(citadel_etm::self_test(), Ok(()));
    assert_eq!(citadel_etm::self_test_state(), SelfTestState::Passed);

    let runs = selftest::global().runs();
    assert_eq!(runs, 1);
    assert_eq!(citadel_etm::self_test(), Ok(()));
    assert_eq!(selftest::global().runs(), 1);
}

#[test]
fn operations_run_the_gate_first() {
    let crypto = Crypto::new();
    let key = [1u8; 16];
    let ct = crypto.encrypt(b"x", &key, Encoding::Raw).unwrap();
    assert_eq!(crypto.self_test_state(), SelfTestState::Passed);

    crypto.decrypt(&ct, &key, Encoding::Raw).unwrap();
    crypto.inspect(&ct, Encoding::Raw).unwrap();
    crypto.generate_key().unwrap();
    Key::generate().unwrap();
    assert_eq!(selftest::global().runs(), 1);
}

#[test]
fn every_engine_shares_the_global_gate() {
    let engines = [Crypto::new(), Crypto::new().with_version(Version::V2Ctr), Crypto::default()];
    for crypto in &engines {
        assert_eq!(crypto.self_test(), Ok(()));
    }
    assert!(Arc::ptr_eq(&selftest::global(), &selftest::global()));
    assert_eq!(selftest::global().runs(), 1);
}

#[test]
fn concurrent_callers_share_one_run() {
    let handles: Vec<_> = (0..4)
        .map(|_| thread::spawn(|| citadel_etm::encrypt(b"x", &[0u8; 16], Encoding::Raw)))
        .collect();
    for h in handles {
        assert!(h.join().unwrap().is_ok());
    }
    assert_eq!(selftest::global().runs(), 1);
}

#[test]
fn fixtures_cannot_be_swapped_after_first_use() {
    assert_eq!(citadel_etm::self_test(), Ok(()));

    let mut fixtures = SelfTestFixtures::standard();
    fixtures.hmac_digest = "00";
    assert!(!selftest::install_global_fixtures(fixtures));
    assert_eq!(citadel_etm::self_test(), Ok(()));
    assert_eq!(citadel_etm::self_test_state(), SelfTestState::Passed);
}
