//! Package manifest lookup for bugsnag-deploy.
//!
//! Finds the nearest `Cargo.toml` or `package.json` above a directory and
//! extracts the two fields a deploy notification can use: the package
//! version and the repository URL.
//!
//! # Example
//!
//! ```no_run
//! use bugsnag_deploy_manifest::detect;
//! use std::path::Path;
//!
//! let manifest = detect(Path::new(".")).expect("manifest");
//! if let Some(version) = manifest.version {
//!     println!("app version: {version}");
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Cargo manifest file name
pub const CARGO_MANIFEST: &str = "Cargo.toml";

/// npm manifest file name
pub const NPM_MANIFEST: &str = "package.json";

/// Kind of manifest found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManifestKind {
    Cargo,
    Npm,
}

impl ManifestKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ManifestKind::Cargo => CARGO_MANIFEST,
            ManifestKind::Npm => NPM_MANIFEST,
        }
    }
}

/// Fields extracted from a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

/// Find the nearest manifest in `start` or any of its ancestors.
///
/// Within one directory `Cargo.toml` is preferred over `package.json`.
pub fn find_manifest(start: &Path) -> Option<(PathBuf, ManifestKind)> {
    start.ancestors().find_map(|dir| {
        [ManifestKind::Cargo, ManifestKind::Npm]
            .into_iter()
            .map(|kind| (dir.join(kind.file_name()), kind))
            .find(|(path, _)| path.is_file())
    })
}

/// Read version and repository from a manifest file.
pub fn read_manifest(path: &Path, kind: ManifestKind) -> Result<ManifestMetadata> {
    match kind {
        ManifestKind::Cargo => read_cargo_manifest(path),
        ManifestKind::Npm => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            parse_package_json(&text).with_context(|| format!("invalid {}", path.display()))
        }
    }
}

/// Locate the nearest manifest above `start` and read it.
pub fn detect(start: &Path) -> Result<ManifestMetadata> {
    let start = start
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", start.display()))?;

    let Some((path, kind)) = find_manifest(&start) else {
        bail!(
            "no {} or {} found in {} or its parents",
            CARGO_MANIFEST,
            NPM_MANIFEST,
            start.display()
        );
    };

    read_manifest(&path, kind)
}

/// Parse the `version` and `repository` fields of a `package.json` document.
///
/// `repository` may be a plain string or an object with a `url` field.
pub fn parse_package_json(text: &str) -> Result<ManifestMetadata> {
    let value: serde_json::Value = serde_json::from_str(text).context("malformed JSON")?;

    let version = value
        .get("version")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);

    let repository = match value.get("repository") {
        Some(serde_json::Value::String(url)) => Some(url.clone()),
        Some(serde_json::Value::Object(repo)) => repo
            .get("url")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    Ok(ManifestMetadata {
        version,
        repository,
    })
}

fn load_toml(path: &Path) -> Result<toml::Table> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid {}", path.display()))
}

fn string_field(table: Option<&toml::Table>, field: &str) -> Option<String> {
    table
        .and_then(|t| t.get(field))
        .and_then(toml::Value::as_str)
        .map(str::to_string)
}

fn is_workspace_inherited(value: &toml::Table) -> bool {
    value.get("workspace").and_then(toml::Value::as_bool) == Some(true)
}

fn shared_package(doc: &toml::Table) -> Option<Option<toml::Table>> {
    doc.get("workspace").map(|ws| {
        ws.get("package")
            .and_then(toml::Value::as_table)
            .cloned()
    })
}

/// `[workspace.package]` of the nearest manifest declaring `[workspace]`,
/// starting with `doc` itself.
///
/// Ancestor manifests that cannot be read or parsed are skipped.
fn workspace_package(path: &Path, doc: &toml::Table) -> Option<toml::Table> {
    if let Some(shared) = shared_package(doc) {
        return shared;
    }

    let dir = path.parent()?;
    dir.ancestors()
        .skip(1)
        .map(|ancestor| ancestor.join(CARGO_MANIFEST))
        .filter(|candidate| candidate.is_file())
        .filter_map(|candidate| load_toml(&candidate).ok())
        .find_map(|ancestor| shared_package(&ancestor))
        .flatten()
}

fn read_cargo_manifest(path: &Path) -> Result<ManifestMetadata> {
    let doc = load_toml(path)?;

    let Some(package) = doc.get("package").and_then(toml::Value::as_table) else {
        // Virtual workspace root
        let shared = shared_package(&doc).flatten();
        return Ok(ManifestMetadata {
            version: string_field(shared.as_ref(), "version"),
            repository: string_field(shared.as_ref(), "repository"),
        });
    };

    let mut shared: Option<Option<toml::Table>> = None;
    let mut resolve = |field: &str| match package.get(field) {
        Some(toml::Value::String(value)) => Some(value.clone()),
        Some(toml::Value::Table(value)) if is_workspace_inherited(value) => {
            let shared = shared.get_or_insert_with(|| workspace_package(path, &doc));
            string_field(shared.as_ref(), field)
        }
        _ => None,
    };

    let version = resolve("version");
    let repository = resolve("repository");

    Ok(ManifestMetadata {
        version,
        repository,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_debug_snapshot;
    use tempfile::tempdir;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    #[test]
    fn package_json_string_repository() {
        let meta = parse_package_json(
            r#"{"name":"web","version":"2.4.1","repository":"https://github.com/acme/web.git"}"#,
        )
        .expect("parse");

        assert_eq!(meta.version.as_deref(), Some("2.4.1"));
        assert_eq!(
            meta.repository.as_deref(),
            Some("https://github.com/acme/web.git")
        );
    }

    #[test]
    fn package_json_object_repository_uses_url() {
        let meta = parse_package_json(
            r#"{"version":"1.0.0","repository":{"type":"git","url":"git+https://github.com/acme/web.git"}}"#,
        )
        .expect("parse");

        assert_eq!(
            meta.repository.as_deref(),
            Some("git+https://github.com/acme/web.git")
        );
    }

    #[test]
    fn package_json_without_fields_is_empty() {
        let meta = parse_package_json(r#"{"name":"web","version":3}"#).expect("parse");
        assert_eq!(meta, ManifestMetadata::default());
    }

    #[test]
    fn package_json_malformed_is_error() {
        assert!(parse_package_json("{ not json").is_err());
    }

    #[test]
    fn find_manifest_walks_upward() {
        let td = tempdir().expect("tempdir");
        write_file(&td.path().join("package.json"), r#"{"version":"1.2.3"}"#);
        let nested = td.path().join("src/components/deep");
        fs::create_dir_all(&nested).expect("mkdir");

        let (path, kind) = find_manifest(&nested).expect("found");
        assert_eq!(path, td.path().join("package.json"));
        assert_eq!(kind, ManifestKind::Npm);

        let meta = detect(&nested).expect("detect");
        assert_eq!(meta.version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn nearest_manifest_wins() {
        let td = tempdir().expect("tempdir");
        write_file(&td.path().join("package.json"), r#"{"version":"9.9.9"}"#);
        write_file(&td.path().join("app/package.json"), r#"{"name":"app"}"#);

        // The nearer file is used even though it has no version.
        let meta = detect(&td.path().join("app")).expect("detect");
        assert!(meta.version.is_none());
    }

    #[test]
    fn cargo_preferred_over_package_json_in_same_dir() {
        let td = tempdir().expect("tempdir");
        write_file(&td.path().join("package.json"), r#"{"version":"0.0.1"}"#);
        write_file(
            &td.path().join("Cargo.toml"),
            "[package]\nname = \"demo\"\nversion = \"0.3.0\"\n",
        );

        let (_, kind) = find_manifest(td.path()).expect("found");
        assert_eq!(kind, ManifestKind::Cargo);
        assert_eq!(
            detect(td.path()).expect("detect").version.as_deref(),
            Some("0.3.0")
        );
    }

    #[test]
    fn cargo_package_fields() {
        let td = tempdir().expect("tempdir");
        write_file(
            &td.path().join("Cargo.toml"),
            r#"
[package]
name = "demo"
version = "1.4.0"
repository = "https://github.com/acme/demo"
"#,
        );

        assert_debug_snapshot!(detect(td.path()).expect("detect"), @r#"
        ManifestMetadata {
            version: Some(
                "1.4.0",
            ),
            repository: Some(
                "https://github.com/acme/demo",
            ),
        }
        "#);
    }

    #[test]
    fn cargo_fields_inherited_from_workspace() {
        let td = tempdir().expect("tempdir");
        write_file(
            &td.path().join("Cargo.toml"),
            r#"
[workspace]
members = ["crates/demo"]

[workspace.package]
version = "0.7.2"
repository = "https://github.com/acme/mono"
"#,
        );
        write_file(
            &td.path().join("crates/demo/Cargo.toml"),
            r#"
[package]
name = "demo"
version.workspace = true
repository = { workspace = true }
"#,
        );

        let meta = detect(&td.path().join("crates/demo")).expect("detect");
        assert_eq!(meta.version.as_deref(), Some("0.7.2"));
        assert_eq!(meta.repository.as_deref(), Some("https://github.com/acme/mono"));
    }

    #[test]
    fn virtual_workspace_root_uses_workspace_package() {
        let td = tempdir().expect("tempdir");
        write_file(
            &td.path().join("Cargo.toml"),
            "[workspace]\nmembers = []\n\n[workspace.package]\nversion = \"2.0.0\"\n",
        );

        let meta = detect(td.path()).expect("detect");
        assert_eq!(meta.version.as_deref(), Some("2.0.0"));
        assert!(meta.repository.is_none());
    }

    #[test]
    fn inherited_field_without_workspace_is_absent() {
        let td = tempdir().expect("tempdir");
        write_file(
            &td.path().join("Cargo.toml"),
            "[package]\nname = \"demo\"\nversion.workspace = true\n",
        );

        let meta = detect(td.path()).expect("detect");
        assert!(meta.version.is_none());
    }

    #[test]
    fn malformed_cargo_toml_is_error() {
        let td = tempdir().expect("tempdir");
        write_file(&td.path().join("Cargo.toml"), "[package\nname = ");

        assert!(detect(td.path()).is_err());
    }

    #[test]
    fn malformed_ancestor_keeps_member_fields() {
        let td = tempdir().expect("tempdir");
        write_file(&td.path().join("Cargo.toml"), "[workspace\nmembers = ");
        write_file(
            &td.path().join("app/Cargo.toml"),
            r#"
[package]
name = "app"
version.workspace = true
repository = "https://github.com/acme/app"
"#,
        );

        let meta = detect(&td.path().join("app")).expect("detect");
        assert!(meta.version.is_none());
        assert_eq!(meta.repository.as_deref(), Some("https://github.com/acme/app"));
    }

    #[test]
    fn malformed_ancestor_is_skipped_for_outer_workspace() {
        let td = tempdir().expect("tempdir");
        write_file(
            &td.path().join("Cargo.toml"),
            "[workspace]\nmembers = [\"nested/app\"]\n\n[workspace.package]\nversion = \"4.0.0\"\n",
        );
        write_file(&td.path().join("nested/Cargo.toml"), "not = [valid");
        write_file(
            &td.path().join("nested/app/Cargo.toml"),
            "[package]\nname = \"app\"\nversion.workspace = true\n",
        );

        let meta = detect(&td.path().join("nested/app")).expect("detect");
        assert_eq!(meta.version.as_deref(), Some("4.0.0"));
    }

    #[test]
    fn detect_missing_directory_is_error() {
        let td = tempdir().expect("tempdir");
        assert!(detect(&td.path().join("does-not-exist")).is_err());
    }
}
