//! Dependency resolution and installation
//!
//! Depth-first, strictly sequential resolution over the on-chain dependency
//! graph. The resolved set is the conflict oracle: a name is marked before
//! any side effect so cycles terminate, and every later constraint on that
//! name must accept the already-chosen version.

use crate::core::{access, ArtifactStore, RegistrySource};
use crate::error::{Result, TpkmError};
use crate::utils::{validate_library_name, Address};
use semver::{Version, VersionReq};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Directory under the working directory that receives installed trees
pub const INSTALL_ROOT: &str = "tpkm_installed_libs";

/// Exact version chosen for each library this run
pub type ResolvedSet = BTreeMap<String, Version>;

fn max_satisfying(available: &[Version], req: &VersionReq) -> Option<Version> {
    available.iter().filter(|v| req.matches(v)).max().cloned()
}

fn exact_req(version: &Version) -> Result<VersionReq> {
    VersionReq::parse(&format!("={version}"))
        .map_err(|e| TpkmError::Validation(format!("cannot pin version {version}: {e}")))
}

pub struct Installer<'a> {
    registry: &'a dyn RegistrySource,
    store: &'a dyn ArtifactStore,
    caller: Option<Address>,
    install_root: PathBuf,
}

impl<'a> Installer<'a> {
    pub fn new(
        registry: &'a dyn RegistrySource,
        store: &'a dyn ArtifactStore,
        caller: Option<Address>,
        install_root: PathBuf,
    ) -> Installer<'a> {
        Installer {
            registry,
            store,
            caller,
            install_root,
        }
    }

    /// Install `name` at the requested version, or at the latest stable
    /// release when no version is given. Returns the full resolved set.
    pub fn install(&self, name: &str, version: Option<&str>) -> Result<ResolvedSet> {
        validate_library_name(name)?;
        let pinned = match version {
            Some(v) => Version::parse(v)
                .map_err(|e| TpkmError::Validation(format!("invalid version {v:?}: {e}")))?,
            None => self.latest_stable(name)?,
        };
        self.check_access(name)?;

        let mut resolved = ResolvedSet::new();
        let mut origins = BTreeMap::new();
        self.resolve(name, &exact_req(&pinned)?, &mut resolved, &mut origins)?;
        Ok(resolved)
    }

    /// Highest non-pre-release version
    fn latest_stable(&self, name: &str) -> Result<Version> {
        let available = self.registry.get_version_numbers(name)?;
        if available.is_empty() {
            return Err(TpkmError::NotFound(format!(
                "library '{name}' has no published versions"
            )));
        }
        available
            .iter()
            .filter(|v| v.pre.is_empty())
            .max()
            .cloned()
            .ok_or_else(|| {
                TpkmError::NotFound(format!(
                    "library '{name}' has only pre-release versions; request one explicitly \
                     with {name}@<version>"
                ))
            })
    }

    /// Abort with a denial message naming the reason when the caller cannot
    /// read this library. No caller means nothing to check.
    fn check_access(&self, name: &str) -> Result<()> {
        let caller = match self.caller {
            Some(caller) => caller,
            None => return Ok(()),
        };
        if self.registry.has_access(name, caller)? {
            return Ok(());
        }
        let record = self.registry.get_library_info(name)?;
        Err(access::denial(name, &record))
    }

    fn resolve(
        &self,
        name: &str,
        constraint: &VersionReq,
        resolved: &mut ResolvedSet,
        origins: &mut BTreeMap<String, VersionReq>,
    ) -> Result<()> {
        if let Some(existing) = resolved.get(name) {
            if constraint.matches(existing) {
                return Ok(());
            }
            let first = origins
                .get(name)
                .map(VersionReq::to_string)
                .unwrap_or_else(|| "an earlier requirement".to_string());
            return Err(TpkmError::Conflict(format!(
                "version conflict for '{name}': {existing} was selected by {first}, \
                 but another dependency requires {constraint}"
            )));
        }

        let available = self.registry.get_version_numbers(name)?;
        if available.is_empty() {
            return Err(TpkmError::NotFound(format!(
                "library '{name}' has no published versions"
            )));
        }
        let chosen = max_satisfying(&available, constraint).ok_or_else(|| {
            let listed: Vec<String> = available.iter().map(Version::to_string).collect();
            TpkmError::NotFound(format!(
                "no version of '{name}' satisfies {constraint} (available: {})",
                listed.join(", ")
            ))
        })?;

        self.check_access(name)?;

        // Mark before any side effect; this is what terminates cycles
        resolved.insert(name.to_string(), chosen.clone());
        origins.insert(name.to_string(), constraint.clone());

        let info = self.registry.get_version_info(name, &chosen)?;
        if !info.has_usable_cid() {
            resolved.remove(name);
            origins.remove(name);
            return Err(TpkmError::BadRecord(format!(
                "{name}@{chosen} has no artifact CID on-chain"
            )));
        }
        if info.deprecated {
            log::warn!("{name}@{chosen} is deprecated");
        }

        let target = self.install_root.join(name).join(chosen.to_string());
        log::info!("installing {name}@{chosen}");
        self.store.fetch_into(&info.ipfs_hash, &target)?;

        for (dep_name, dep_constraint) in &info.dependencies {
            let req = VersionReq::parse(dep_constraint).map_err(|e| {
                TpkmError::Validation(format!(
                    "bad constraint {dep_constraint:?} on dependency '{dep_name}' of \
                     '{name}': {e}"
                ))
            })?;
            self.resolve(dep_name, &req, resolved, origins)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{LibraryRecord, VersionRecord};
    use num_bigint::BigUint;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    struct FakeLib {
        record: LibraryRecord,
        versions: Vec<(Version, VersionRecord)>,
    }

    #[derive(Default)]
    struct FakeRegistry {
        libs: HashMap<String, FakeLib>,
        denied: HashSet<String>,
    }

    fn owner() -> Address {
        "0x00000000000000000000000000000000000000aa".parse().unwrap()
    }

    fn caller() -> Address {
        "0x00000000000000000000000000000000000000bb".parse().unwrap()
    }

    fn open_record() -> LibraryRecord {
        LibraryRecord {
            owner: owner(),
            description: String::new(),
            tags: vec![],
            is_private: false,
            language: String::new(),
            license_fee: BigUint::from(0u8),
            license_required: false,
        }
    }

    impl FakeRegistry {
        fn add(&mut self, name: &str, version: &str, deps: &[(&str, &str)]) {
            self.add_with_record(name, version, deps, open_record());
        }

        fn add_with_record(
            &mut self,
            name: &str,
            version: &str,
            deps: &[(&str, &str)],
            record: LibraryRecord,
        ) {
            let parsed = Version::parse(version).unwrap();
            let version_record = VersionRecord {
                ipfs_hash: format!("Qm-{name}-{version}"),
                publisher: owner(),
                published_at: 1_700_000_000,
                deprecated: false,
                dependencies: deps
                    .iter()
                    .map(|(n, c)| (n.to_string(), c.to_string()))
                    .collect(),
            };
            let lib = self.libs.entry(name.to_string()).or_insert_with(|| FakeLib {
                record,
                versions: vec![],
            });
            lib.versions.push((parsed, version_record));
        }

        fn deny(&mut self, name: &str) {
            self.denied.insert(name.to_string());
        }
    }

    impl RegistrySource for FakeRegistry {
        fn get_library_info(&self, name: &str) -> Result<LibraryRecord> {
            self.libs
                .get(name)
                .map(|l| l.record.clone())
                .ok_or_else(|| TpkmError::NotFound(format!("library '{name}' is not registered")))
        }

        fn get_version_numbers(&self, name: &str) -> Result<Vec<Version>> {
            Ok(self
                .libs
                .get(name)
                .map(|l| l.versions.iter().map(|(v, _)| v.clone()).collect())
                .unwrap_or_default())
        }

        fn get_version_info(&self, name: &str, version: &Version) -> Result<VersionRecord> {
            self.libs
                .get(name)
                .and_then(|l| l.versions.iter().find(|(v, _)| v == version))
                .map(|(_, r)| r.clone())
                .ok_or_else(|| TpkmError::NotFound(format!("{name}@{version} does not exist")))
        }

        fn has_access(&self, name: &str, _user: Address) -> Result<bool> {
            Ok(!self.denied.contains(name))
        }

        fn has_user_license(&self, _name: &str, _user: Address) -> Result<bool> {
            Ok(false)
        }
    }

    /// Store that extracts a marker file per CID and counts fetches
    struct FakeStore {
        fetched: RefCell<Vec<String>>,
    }

    impl FakeStore {
        fn new() -> FakeStore {
            FakeStore {
                fetched: RefCell::new(vec![]),
            }
        }
    }

    impl ArtifactStore for FakeStore {
        fn fetch_into(&self, cid: &str, target: &Path) -> Result<()> {
            self.fetched.borrow_mut().push(cid.to_string());
            fs::create_dir_all(target)?;
            fs::write(target.join("marker"), cid)?;
            Ok(())
        }
    }

    fn run_install(
        registry: &FakeRegistry,
        root: &Path,
        spec: (&str, Option<&str>),
    ) -> (Result<ResolvedSet>, Vec<String>) {
        let store = FakeStore::new();
        let installer =
            Installer::new(registry, &store, Some(caller()), root.to_path_buf());
        let result = installer.install(spec.0, spec.1);
        (result, store.fetched.into_inner())
    }

    #[test]
    fn latest_stable_excludes_prereleases() {
        let mut registry = FakeRegistry::default();
        registry.add("lib", "1.0.0", &[]);
        registry.add("lib", "1.1.0", &[]);
        registry.add("lib", "2.0.0-beta.1", &[]);

        let dir = tempdir().unwrap();
        let (result, fetched) = run_install(&registry, dir.path(), ("lib", None));
        let resolved = result.unwrap();
        assert_eq!(resolved["lib"], Version::parse("1.1.0").unwrap());
        assert_eq!(fetched, vec!["Qm-lib-1.1.0"]);
        assert!(dir.path().join("lib/1.1.0/marker").exists());
    }

    #[test]
    fn diamond_without_conflict_downloads_shared_dep_once() {
        let mut registry = FakeRegistry::default();
        registry.add("a", "1.0.0", &[("b", "^1.0.0"), ("c", "^1.0.0")]);
        registry.add("b", "1.0.0", &[("d", "^1.2.0")]);
        registry.add("c", "1.0.0", &[("d", "^1.2.0")]);
        registry.add("d", "1.2.0", &[]);
        registry.add("d", "1.2.3", &[]);

        let dir = tempdir().unwrap();
        let (result, fetched) = run_install(&registry, dir.path(), ("a", Some("1.0.0")));
        let resolved = result.unwrap();
        assert_eq!(resolved.len(), 4);
        assert_eq!(resolved["d"], Version::parse("1.2.3").unwrap());
        assert_eq!(fetched.iter().filter(|c| c.contains("-d-")).count(), 1);
    }

    #[test]
    fn diamond_with_conflict_aborts() {
        let mut registry = FakeRegistry::default();
        registry.add("a", "1.0.0", &[("b", "^1.0.0"), ("c", "^1.0.0")]);
        registry.add("b", "1.0.0", &[("d", "^1.2.0")]);
        registry.add("c", "1.0.0", &[("d", "^2.0.0")]);
        registry.add("d", "1.2.3", &[]);
        registry.add("d", "2.0.1", &[]);

        let dir = tempdir().unwrap();
        let (result, _) = run_install(&registry, dir.path(), ("a", Some("1.0.0")));
        let err = result.unwrap_err();
        assert_eq!(err.kind(), "CONFLICT");
        let msg = err.to_string();
        assert!(msg.contains("'d'"), "{msg}");
        assert!(msg.contains("1.2.3"), "{msg}");
        assert!(msg.contains("^1.2.0"), "{msg}");
        assert!(msg.contains("^2.0.0"), "{msg}");
    }

    #[test]
    fn cycle_terminates_with_each_name_once() {
        let mut registry = FakeRegistry::default();
        registry.add("a", "1.0.0", &[("b", "^1.0.0")]);
        registry.add("b", "1.0.0", &[("a", "^1.0.0")]);

        let dir = tempdir().unwrap();
        let (result, fetched) = run_install(&registry, dir.path(), ("a", Some("1.0.0")));
        let resolved = result.unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(fetched.len(), 2);
    }

    #[test]
    fn private_dependency_denial_names_the_library() {
        let mut registry = FakeRegistry::default();
        registry.add("pub", "1.0.0", &[("priv", "^1.0.0")]);
        let private = LibraryRecord {
            is_private: true,
            ..open_record()
        };
        registry.add_with_record("priv", "1.0.0", &[], private);
        registry.deny("priv");

        let dir = tempdir().unwrap();
        let (result, fetched) = run_install(&registry, dir.path(), ("pub", Some("1.0.0")));
        let err = result.unwrap_err();
        assert_eq!(err.kind(), "PERMISSION");
        let msg = err.to_string();
        assert!(msg.contains("priv"), "{msg}");
        assert!(msg.contains(&owner().to_checksum()), "{msg}");
        // The top-level library was already extracted; it stays as cache
        assert_eq!(fetched, vec!["Qm-pub-1.0.0"]);
        assert!(dir.path().join("pub/1.0.0/marker").exists());
    }

    #[test]
    fn licensed_dependency_denial_mentions_license() {
        let mut registry = FakeRegistry::default();
        let licensed = LibraryRecord {
            license_required: true,
            license_fee: BigUint::from(10u64).pow(16),
            ..open_record()
        };
        registry.add_with_record("paid", "1.0.0", &[], licensed);
        registry.deny("paid");

        let dir = tempdir().unwrap();
        let (result, _) = run_install(&registry, dir.path(), ("paid", Some("1.0.0")));
        let err = result.unwrap_err();
        assert_eq!(err.kind(), "PERMISSION");
        assert!(err.to_string().contains("license"), "{err}");
    }

    #[test]
    fn no_caller_skips_access_checks() {
        let mut registry = FakeRegistry::default();
        registry.add("lib", "1.0.0", &[]);
        registry.deny("lib");

        let dir = tempdir().unwrap();
        let store = FakeStore::new();
        let installer = Installer::new(&registry, &store, None, dir.path().to_path_buf());
        assert!(installer.install("lib", Some("1.0.0")).is_ok());
    }

    #[test]
    fn bad_cid_rolls_back_resolution() {
        let mut registry = FakeRegistry::default();
        registry.add("lib", "1.0.0", &[]);
        registry.libs.get_mut("lib").unwrap().versions[0].1.ipfs_hash = String::new();

        let dir = tempdir().unwrap();
        let (result, fetched) = run_install(&registry, dir.path(), ("lib", Some("1.0.0")));
        let err = result.unwrap_err();
        assert_eq!(err.kind(), "BAD_RECORD");
        assert!(fetched.is_empty());
    }

    #[test]
    fn unsatisfiable_constraint_lists_available() {
        let mut registry = FakeRegistry::default();
        registry.add("lib", "1.0.0", &[]);

        let dir = tempdir().unwrap();
        let (result, _) = run_install(&registry, dir.path(), ("lib", Some("2.0.0")));
        let err = result.unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");
        assert!(err.to_string().contains("1.0.0"), "{err}");
    }

    #[test]
    fn unknown_library_is_not_found() {
        let registry = FakeRegistry::default();
        let dir = tempdir().unwrap();
        let (result, _) = run_install(&registry, dir.path(), ("ghost", None));
        assert_eq!(result.unwrap_err().kind(), "NOT_FOUND");
    }

    #[test]
    fn reinstall_is_idempotent() {
        let mut registry = FakeRegistry::default();
        registry.add("lib", "1.0.0", &[("dep", "^0.5.0")]);
        registry.add("dep", "0.5.2", &[]);

        let dir = tempdir().unwrap();
        let (first, _) = run_install(&registry, dir.path(), ("lib", None));
        let (second, _) = run_install(&registry, dir.path(), ("lib", None));
        assert_eq!(first.unwrap(), second.unwrap());
        assert!(dir.path().join("lib/1.0.0/marker").exists());
        assert!(dir.path().join("dep/0.5.2/marker").exists());
    }

    #[test]
    fn prerelease_only_latest_is_refused() {
        let mut registry = FakeRegistry::default();
        registry.add("lib", "1.0.0-rc.1", &[]);

        let dir = tempdir().unwrap();
        let (result, _) = run_install(&registry, dir.path(), ("lib", None));
        let err = result.unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");
        assert!(err.to_string().contains("pre-release"), "{err}");

        // But an explicit pin still works
        let (result, _) = run_install(&registry, dir.path(), ("lib", Some("1.0.0-rc.1")));
        assert!(result.is_ok());
    }
}
