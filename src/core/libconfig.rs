//! `lib.config.json` handling
//!
//! The author-facing manifest: name and version are required, everything
//! else optional. Dependency constraints are validated leniently — an
//! unparseable range is kept verbatim with a warning so the author's intent
//! survives, but empty or non-string entries are dropped.

use crate::error::{Result, TpkmError};
use crate::utils::validate_library_name;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const LIB_CONFIG_FILE: &str = "lib.config.json";

#[derive(Debug, Serialize, Deserialize)]
struct RawLibConfig {
    name: String,
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dependencies: Option<serde_json::Map<String, Value>>,
}

/// Validated manifest, ready for the publish pipeline
#[derive(Debug, Clone)]
pub struct LibConfig {
    pub name: String,
    pub version: Version,
    pub description: String,
    pub language: String,
    pub dependencies: Vec<(String, String)>,
}

fn sanitize_dependencies(map: serde_json::Map<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(map.len());
    for (name, value) in map {
        let constraint = match value.as_str() {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => {
                log::warn!("dropping dependency {name:?}: constraint must be a non-empty string");
                continue;
            }
        };
        if let Err(e) = validate_library_name(&name) {
            log::warn!("dependency name {name:?} looks invalid: {e}");
        }
        if VersionReq::parse(&constraint).is_err() {
            log::warn!("constraint {constraint:?} for dependency {name:?} is not a valid range; keeping it as written");
        }
        out.push((name, constraint));
    }
    out
}

impl LibConfig {
    /// Load and validate `<dir>/lib.config.json`, optionally overriding the
    /// manifest version
    pub fn load(dir: &Path, version_override: Option<&str>) -> Result<LibConfig> {
        let path = dir.join(LIB_CONFIG_FILE);
        if !path.exists() {
            return Err(TpkmError::Validation(format!(
                "no {LIB_CONFIG_FILE} in {}; run `tpkm init` there first",
                dir.display()
            )));
        }
        let contents = fs::read_to_string(&path)?;
        let raw: RawLibConfig = serde_json::from_str(&contents)
            .map_err(|e| TpkmError::Validation(format!("cannot parse {}: {e}", path.display())))?;

        validate_library_name(&raw.name)?;
        let version_str = version_override.unwrap_or(&raw.version);
        let version = Version::parse(version_str)
            .map_err(|e| TpkmError::Validation(format!("invalid version {version_str:?}: {e}")))?;

        Ok(LibConfig {
            name: raw.name,
            version,
            description: raw.description.unwrap_or_default(),
            language: raw.language.unwrap_or_default(),
            dependencies: raw
                .dependencies
                .map(sanitize_dependencies)
                .unwrap_or_default(),
        })
    }

    /// Write a starter manifest into `dir`. Overwrite decisions belong to
    /// the caller.
    pub fn write_template(dir: &Path, name: &str) -> Result<PathBuf> {
        let template = RawLibConfig {
            name: name.to_string(),
            version: "0.1.0".to_string(),
            description: Some(String::new()),
            language: Some(String::new()),
            dependencies: Some(serde_json::Map::new()),
        };
        let path = dir.join(LIB_CONFIG_FILE);
        let mut contents = serde_json::to_string_pretty(&template)
            .map_err(|e| TpkmError::Unknown(format!("cannot serialize template: {e}")))?;
        contents.push('\n');
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Template name guess for `init`: the directory name when it already
    /// satisfies the naming rules
    pub fn default_name(dir: &Path) -> String {
        dir.file_name()
            .and_then(|n| n.to_str())
            .filter(|n| validate_library_name(n).is_ok())
            .unwrap_or("my-library")
            .to_string()
    }
}
