#![no_main]

use bugsnag_deploy_git::sanitize_remote_url;
use libfuzzer_sys::fuzz_target;
use url::Url;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let sanitized = sanitize_remote_url(raw);
    if let Ok(url) = Url::parse(&sanitized) {
        if !url.cannot_be_a_base() {
            assert!(url.username().is_empty());
            assert!(url.password().is_none());
        }
    }
});
