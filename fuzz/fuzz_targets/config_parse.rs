#![no_main]

use bugsnag_deploy::config::FileConfig;
use bugsnag_deploy::options::DeployOptions;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = FileConfig::parse(text) {
        // Validation may reject, but must never panic.
        let _ = DeployOptions::from_map(&config.options);
    }
});
