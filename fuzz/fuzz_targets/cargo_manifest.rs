#![no_main]

use bugsnag_deploy_manifest::{CARGO_MANIFEST, ManifestKind, read_manifest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let path = dir.path().join(CARGO_MANIFEST);
    if std::fs::write(&path, data).is_err() {
        return;
    }
    let _ = read_manifest(&path, ManifestKind::Cargo);
});
