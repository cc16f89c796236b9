//! Core operations
//!
//! The resolver/installer, the publish pipeline, the access gate, license
//! operations, and the info view. Core code depends on the registry and the
//! artifact store only through the traits below, so every operation can run
//! against scripted fakes in tests.

pub mod access;
pub mod info;
pub mod libconfig;
pub mod license;
pub mod publisher;
pub mod resolver;

pub use access::AccessStatus;
pub use info::LibraryView;
pub use libconfig::LibConfig;
pub use publisher::PublishOutcome;
pub use resolver::{Installer, ResolvedSet, INSTALL_ROOT};

use crate::chain::{LibraryRecord, Registry, VersionRecord};
use crate::error::Result;
use crate::ipfs::IpfsClient;
use crate::utils::Address;
use semver::Version;
use std::path::Path;

/// The read surface of the registry the core operations consume
pub trait RegistrySource {
    fn get_library_info(&self, name: &str) -> Result<LibraryRecord>;
    fn get_version_numbers(&self, name: &str) -> Result<Vec<Version>>;
    fn get_version_info(&self, name: &str, version: &Version) -> Result<VersionRecord>;
    fn has_access(&self, name: &str, user: Address) -> Result<bool>;
    fn has_user_license(&self, name: &str, user: Address) -> Result<bool>;
}

impl RegistrySource for Registry {
    fn get_library_info(&self, name: &str) -> Result<LibraryRecord> {
        Registry::get_library_info(self, name)
    }

    fn get_version_numbers(&self, name: &str) -> Result<Vec<Version>> {
        Registry::get_version_numbers(self, name)
    }

    fn get_version_info(&self, name: &str, version: &Version) -> Result<VersionRecord> {
        Registry::get_version_info(self, name, version)
    }

    fn has_access(&self, name: &str, user: Address) -> Result<bool> {
        Registry::has_access(self, name, user)
    }

    fn has_user_license(&self, name: &str, user: Address) -> Result<bool> {
        Registry::has_user_license(self, name, user)
    }
}

/// Content-addressed artifact retrieval
pub trait ArtifactStore {
    /// Fetch the archive named by `cid` and extract it into `target`
    fn fetch_into(&self, cid: &str, target: &Path) -> Result<()>;
}

impl ArtifactStore for IpfsClient {
    fn fetch_into(&self, cid: &str, target: &Path) -> Result<()> {
        let stream = self.cat(cid)?;
        crate::archive::extract(stream, target)
    }
}
