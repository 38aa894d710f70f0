#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = <[u8; 4]>::try_from(data.get(..4).unwrap_or_default()) {
        if let Ok(config) = citadel_etm::version::resolve(&header) {
            assert_eq!(config.header, header);
        }
    }
    let _ = citadel_etm::version::decode_tagged(data);
    let _ = citadel_etm::version::decode_legacy(data);
});
