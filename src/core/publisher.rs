//! Publish pipeline
//!
//! Manifest load, ownership pre-check, deterministic archive, IPFS upload,
//! then the registry transaction. The chain is the commit point: an
//! uploaded blob whose transaction fails is left to the content-addressed
//! store, where a retry reproduces the same CID. The temp archive is
//! removed on every exit path.

use crate::archive;
use crate::chain::SignerRegistry;
use crate::core::libconfig::LibConfig;
use crate::error::{Result, TpkmError};
use crate::ipfs::IpfsClient;
use crate::utils::current_timestamp;
use semver::Version;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// What a successful publish produced
#[derive(Debug)]
pub struct PublishOutcome {
    pub name: String,
    pub version: Version,
    pub cid: String,
    pub transaction_hash: String,
}

/// Temp file that cleans up after itself; removal failure is logged, never
/// fatal
struct TempArchive {
    path: PathBuf,
}

impl TempArchive {
    fn create(signer_prefix: &str) -> Result<TempArchive> {
        let stamp = current_timestamp()?;
        let path = env::temp_dir().join(format!("tpkm-{signer_prefix}-{stamp}.tgz"));
        Ok(TempArchive { path })
    }
}

impl Drop for TempArchive {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                log::warn!("could not remove temp archive {}: {e}", self.path.display());
            }
        }
    }
}

/// Run the full publish pipeline for the library in `dir`
pub fn publish(
    registry: &SignerRegistry,
    ipfs: &IpfsClient,
    dir: &Path,
    version_override: Option<&str>,
) -> Result<PublishOutcome> {
    let config = LibConfig::load(dir, version_override)?;
    let name = &config.name;
    let version = &config.version;

    // Ownership pre-check, before any archiving or upload
    let record = match registry.read().get_library_info(name) {
        Ok(record) => record,
        Err(TpkmError::NotFound(_)) => {
            return Err(TpkmError::NotFound(format!(
                "library '{name}' is not registered; run `tpkm register {name}` first"
            )));
        }
        Err(e) => return Err(e),
    };
    let signer = registry.signer_address();
    if record.owner != signer {
        return Err(TpkmError::Permission(format!(
            "library '{name}' is owned by {}, not by the loaded wallet {}",
            record.owner.to_checksum(),
            signer.to_checksum()
        )));
    }

    // Existing version is a predictable failure; catch it before spending gas
    let published = registry.read().get_version_numbers(name)?;
    if published.contains(version) {
        return Err(TpkmError::Conflict(format!(
            "{name}@{version} already exists on the registry"
        )));
    }

    let checksum = signer.to_checksum();
    let prefix = checksum[2..10].to_lowercase();
    let temp = TempArchive::create(&prefix)?;
    log::info!("archiving {} -> {}", dir.display(), temp.path.display());
    archive::archive_dir(dir, &temp.path)?;

    let cid = ipfs.add_file(&temp.path)?;
    log::info!("uploaded archive as {cid}");

    let receipt = registry.publish_version(name, version, &cid, &config.dependencies)?;
    log::info!(
        "published {name}@{version} in block {}",
        receipt.block_number
    );

    Ok(PublishOutcome {
        name: name.clone(),
        version: version.clone(),
        cid,
        transaction_hash: receipt.transaction_hash,
    })
}
