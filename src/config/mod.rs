//! Network configuration
//!
//! Named network profiles persisted under `~/.tacopkm/networks.json`, plus
//! the precedence resolution that turns profiles, environment variables and
//! defaults into the effective endpoints for a command.

pub mod networks;
pub mod precedence;

pub use networks::{NetworkProfile, NetworkStore};
pub use precedence::{resolve_effective, EffectiveNetwork};

use std::path::PathBuf;

pub const RPC_URL_VAR: &str = "RPC_URL";
pub const CONTRACT_ADDRESS_VAR: &str = "CONTRACT_ADDRESS";
pub const IPFS_API_URL_VAR: &str = "IPFS_API_URL";
pub const DEFAULT_IPFS_API_URL: &str = "http://127.0.0.1:5001/api/v0";

/// Directory holding the keystore and network profile files
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tacopkm"))
}
