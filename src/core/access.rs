//! Access gate
//!
//! Single source of truth for whether a caller may read a library, shared
//! by the installer pre-flight, the info view, and the license commands.

use crate::chain::LibraryRecord;
use crate::core::RegistrySource;
use crate::error::{Result, TpkmError};
use crate::utils::{format_eth, Address};
use std::fmt;

/// The caller's standing toward one library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Owner,
    PublicOpen,
    PublicLicensedOwned,
    PublicLicensedUnowned,
    PrivateAuthorized,
    PrivateUnauthorized,
    NoWallet,
}

impl AccessStatus {
    /// Whether this standing permits reading the artifact
    pub fn can_read(&self) -> bool {
        !matches!(
            self,
            AccessStatus::PublicLicensedUnowned
                | AccessStatus::PrivateUnauthorized
                | AccessStatus::NoWallet
        )
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AccessStatus::Owner => "owner",
            AccessStatus::PublicOpen => "public, open access",
            AccessStatus::PublicLicensedOwned => "licensed (license held)",
            AccessStatus::PublicLicensedUnowned => "licensed (no license held)",
            AccessStatus::PrivateAuthorized => "private (authorized)",
            AccessStatus::PrivateUnauthorized => "private (not authorized)",
            AccessStatus::NoWallet => "no wallet loaded",
        };
        write!(f, "{text}")
    }
}

/// Derive the caller's standing for one library
pub fn evaluate(
    registry: &dyn RegistrySource,
    name: &str,
    record: &LibraryRecord,
    caller: Option<Address>,
) -> Result<AccessStatus> {
    let caller = match caller {
        Some(caller) => caller,
        None => return Ok(AccessStatus::NoWallet),
    };
    if caller == record.owner {
        return Ok(AccessStatus::Owner);
    }
    if !registry.has_access(name, caller)? {
        if record.license_required {
            return Ok(AccessStatus::PublicLicensedUnowned);
        }
        if record.is_private {
            return Ok(AccessStatus::PrivateUnauthorized);
        }
        log::warn!("registry denied access to open library '{name}'");
        return Ok(AccessStatus::PublicOpen);
    }
    if registry.has_user_license(name, caller)? {
        return Ok(AccessStatus::PublicLicensedOwned);
    }
    if record.is_private {
        return Ok(AccessStatus::PrivateAuthorized);
    }
    Ok(AccessStatus::PublicOpen)
}

/// The error for a caller the registry turned away, with the reason spelled
/// out from the library record
pub fn denial(name: &str, record: &LibraryRecord) -> TpkmError {
    if record.is_private {
        TpkmError::Permission(format!(
            "library '{name}' is private; ask its owner {} for authorization",
            record.owner.to_checksum()
        ))
    } else if record.license_required {
        TpkmError::Permission(format!(
            "library '{name}' requires a license (fee {} ETH); run `tpkm purchase-license {name}`",
            format_eth(&record.license_fee)
        ))
    } else {
        TpkmError::Permission(format!("access to library '{name}' was denied"))
    }
}
