#![no_main]

use bugsnag_deploy_manifest::parse_package_json;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_package_json(text);
    }
});
