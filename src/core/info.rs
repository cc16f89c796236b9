//! Library info view
//!
//! Assembles the library record, optional version detail, and the caller's
//! access standing into one renderable value. Version detail is withheld
//! when the gate denies the caller.

use crate::chain::{LibraryRecord, VersionRecord};
use crate::core::{access, AccessStatus, RegistrySource};
use crate::error::Result;
use crate::utils::{format_eth, Address};
use num_bigint::BigUint;
use semver::Version;
use std::fmt;

#[derive(Debug)]
pub struct LibraryView {
    pub name: String,
    pub record: LibraryRecord,
    pub access: AccessStatus,
    pub versions: Option<Vec<Version>>,
    pub version_detail: Option<(Version, VersionRecord)>,
}

/// Assemble the view for `info`
pub fn library_view(
    registry: &dyn RegistrySource,
    name: &str,
    version: Option<&str>,
    list_versions: bool,
    caller: Option<Address>,
) -> Result<LibraryView> {
    let record = registry.get_library_info(name)?;
    let status = access::evaluate(registry, name, &record, caller)?;

    let versions = if list_versions {
        Some(registry.get_version_numbers(name)?)
    } else {
        None
    };

    let version_detail = match version {
        Some(v) => {
            let parsed = Version::parse(v).map_err(|e| {
                crate::error::TpkmError::Validation(format!("invalid version {v:?}: {e}"))
            })?;
            // Version contents are what the gate protects. Without a wallet
            // only fully open libraries are visible.
            let visible = match status {
                AccessStatus::NoWallet => !record.is_private && !record.license_required,
                other => other.can_read(),
            };
            if !visible {
                return Err(access::denial(name, &record));
            }
            Some((parsed.clone(), registry.get_version_info(name, &parsed)?))
        }
        None => None,
    };

    Ok(LibraryView {
        name: name.to_string(),
        record,
        access: status,
        versions,
        version_detail,
    })
}

fn license_line(record: &LibraryRecord) -> String {
    if record.license_required {
        format!("required, fee {} ETH", format_eth(&record.license_fee))
    } else if record.license_fee > BigUint::from(0u8) {
        format!("not required (fee {} ETH set)", format_eth(&record.license_fee))
    } else {
        "not required".to_string()
    }
}

impl fmt::Display for LibraryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Library:     {}", self.name)?;
        writeln!(f, "Owner:       {}", self.record.owner.to_checksum())?;
        if !self.record.description.is_empty() {
            writeln!(f, "Description: {}", self.record.description)?;
        }
        if !self.record.language.is_empty() {
            writeln!(f, "Language:    {}", self.record.language)?;
        }
        if !self.record.tags.is_empty() {
            writeln!(f, "Tags:        {}", self.record.tags.join(", "))?;
        }
        writeln!(
            f,
            "Visibility:  {}",
            if self.record.is_private { "private" } else { "public" }
        )?;
        writeln!(f, "License:     {}", license_line(&self.record))?;
        writeln!(f, "Access:      {}", self.access)?;

        if let Some(versions) = &self.versions {
            if versions.is_empty() {
                writeln!(f, "Versions:    (none published)")?;
            } else {
                let listed: Vec<String> = versions.iter().map(Version::to_string).collect();
                writeln!(f, "Versions:    {}", listed.join(", "))?;
            }
        }

        if let Some((version, detail)) = &self.version_detail {
            writeln!(f)?;
            writeln!(f, "Version {version}:")?;
            writeln!(f, "  CID:        {}", detail.ipfs_hash)?;
            writeln!(f, "  Publisher:  {}", detail.publisher.to_checksum())?;
            writeln!(f, "  Published:  unix {}", detail.published_at)?;
            if detail.deprecated {
                writeln!(f, "  Deprecated: yes")?;
            }
            if detail.dependencies.is_empty() {
                writeln!(f, "  Dependencies: none")?;
            } else {
                writeln!(f, "  Dependencies:")?;
                for (dep, constraint) in &detail.dependencies {
                    writeln!(f, "    {dep} {constraint}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TpkmError;
    use std::collections::HashMap;

    struct InfoFake {
        record: LibraryRecord,
        versions: Vec<Version>,
        detail: Option<VersionRecord>,
        access: HashMap<String, bool>,
    }

    impl RegistrySource for InfoFake {
        fn get_library_info(&self, _name: &str) -> Result<LibraryRecord> {
            Ok(self.record.clone())
        }

        fn get_version_numbers(&self, _name: &str) -> Result<Vec<Version>> {
            Ok(self.versions.clone())
        }

        fn get_version_info(&self, name: &str, version: &Version) -> Result<VersionRecord> {
            self.detail
                .clone()
                .ok_or_else(|| TpkmError::NotFound(format!("{name}@{version} does not exist")))
        }

        fn has_access(&self, name: &str, _user: Address) -> Result<bool> {
            Ok(*self.access.get(name).unwrap_or(&true))
        }

        fn has_user_license(&self, _name: &str, _user: Address) -> Result<bool> {
            Ok(false)
        }
    }

    fn owner() -> Address {
        "0x00000000000000000000000000000000000000aa".parse().unwrap()
    }

    fn caller() -> Address {
        "0x00000000000000000000000000000000000000bb".parse().unwrap()
    }

    fn fake() -> InfoFake {
        InfoFake {
            record: LibraryRecord {
                owner: owner(),
                description: "fast curves".to_string(),
                tags: vec!["math".to_string(), "crypto".to_string()],
                is_private: false,
                language: "rust".to_string(),
                license_fee: BigUint::from(0u8),
                license_required: false,
            },
            versions: vec![Version::new(1, 0, 0), Version::new(1, 1, 0)],
            detail: Some(VersionRecord {
                ipfs_hash: "QmArchive".to_string(),
                publisher: owner(),
                published_at: 1_700_000_000,
                deprecated: true,
                dependencies: vec![("base".to_string(), "^1.0.0".to_string())],
            }),
            access: HashMap::new(),
        }
    }

    #[test]
    fn renders_full_card() {
        let registry = fake();
        let view =
            library_view(&registry, "curves", Some("1.1.0"), true, Some(caller())).unwrap();
        let text = view.to_string();
        assert!(text.contains("Library:     curves"));
        assert!(text.contains("fast curves"));
        assert!(text.contains("math, crypto"));
        assert!(text.contains("Versions:    1.0.0, 1.1.0"));
        assert!(text.contains("CID:        QmArchive"));
        assert!(text.contains("Deprecated: yes"));
        assert!(text.contains("base ^1.0.0"));
    }

    #[test]
    fn version_detail_denied_without_access() {
        let mut registry = fake();
        registry.record.is_private = true;
        registry.access.insert("curves".to_string(), false);

        let err = library_view(&registry, "curves", Some("1.0.0"), false, Some(caller()))
            .unwrap_err();
        assert_eq!(err.kind(), "PERMISSION");

        // The card without version detail still renders
        let view = library_view(&registry, "curves", None, false, Some(caller())).unwrap();
        assert_eq!(view.access, AccessStatus::PrivateUnauthorized);
    }

    #[test]
    fn no_wallet_sees_public_metadata() {
        let registry = fake();
        let view = library_view(&registry, "curves", Some("1.0.0"), false, None).unwrap();
        assert_eq!(view.access, AccessStatus::NoWallet);
        assert!(view.version_detail.is_some());
    }
}
