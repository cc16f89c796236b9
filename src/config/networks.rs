//! Network profile store
//!
//! On-disk contract:
//! `{ "activeNetwork": <string|null>, "networks": { <name>: { "rpcUrl", "contractAddress" } } }`
//! pretty-printed with two-space indent. Unknown fields round-trip.

use crate::error::{Result, TpkmError};
use crate::utils::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const NETWORKS_FILE: &str = "networks.json";

const ALLOWED_SCHEMES: [&str; 4] = ["http", "https", "ws", "wss"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    pub rpc_url: String,
    pub contract_address: String,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl NetworkProfile {
    pub fn new(rpc_url: String, contract_address: String) -> Self {
        Self {
            rpc_url,
            contract_address,
            extra: BTreeMap::new(),
        }
    }

    /// Check both fields; a stored profile can go stale by hand-editing
    pub fn validate(&self) -> Result<Address> {
        validate_rpc_url(&self.rpc_url)?;
        self.contract_address.parse()
    }
}

pub fn validate_rpc_url(url: &str) -> Result<()> {
    let scheme = url.split("://").next().unwrap_or("");
    if url.contains("://") && ALLOWED_SCHEMES.contains(&scheme) {
        Ok(())
    } else {
        Err(TpkmError::Validation(format!(
            "RPC URL {url:?} must use one of: http, https, ws, wss"
        )))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStoreData {
    pub active_network: Option<String>,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkProfile>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

/// Profile store bound to its file path
#[derive(Debug)]
pub struct NetworkStore {
    path: PathBuf,
    pub data: NetworkStoreData,
}

impl NetworkStore {
    /// Load the store from the default location, creating an empty in-memory
    /// store when the file does not exist
    pub fn load() -> Result<NetworkStore> {
        let dir = crate::config::config_dir()
            .ok_or_else(|| TpkmError::Config("cannot determine home directory".to_string()))?;
        Self::load_from(dir.join(NETWORKS_FILE))
    }

    pub fn load_from(path: PathBuf) -> Result<NetworkStore> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents).map_err(|e| {
                TpkmError::Config(format!("cannot parse {}: {e}", path.display()))
            })?
        } else {
            NetworkStoreData::default()
        };
        Ok(NetworkStore { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut contents = serde_json::to_string_pretty(&self.data)
            .map_err(|e| TpkmError::Config(format!("cannot serialize profiles: {e}")))?;
        contents.push('\n');
        fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Upsert a profile after validating the RPC URL and contract address
    pub fn add(
        &mut self,
        name: &str,
        rpc_url: String,
        contract_address: String,
        set_active: bool,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(TpkmError::Validation("profile name is empty".to_string()));
        }
        validate_rpc_url(&rpc_url)?;
        let canonical: Address = contract_address.parse()?;
        self.data.networks.insert(
            name.to_string(),
            NetworkProfile::new(rpc_url, canonical.to_checksum()),
        );
        if set_active || self.data.active_network.is_none() {
            self.data.active_network = Some(name.to_string());
        }
        self.save()
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        if !self.data.networks.contains_key(name) {
            return Err(TpkmError::NotFound(format!(
                "no network profile named {name:?}"
            )));
        }
        self.data.active_network = Some(name.to_string());
        self.save()
    }

    /// Remove a profile. Returns true when the removed profile was active,
    /// in which case `activeNetwork` has been cleared.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        if self.data.networks.remove(name).is_none() {
            return Err(TpkmError::NotFound(format!(
                "no network profile named {name:?}"
            )));
        }
        let was_active = self.data.active_network.as_deref() == Some(name);
        if was_active {
            self.data.active_network = None;
        }
        self.save()?;
        Ok(was_active)
    }

    pub fn get(&self, name: &str) -> Option<&NetworkProfile> {
        self.data.networks.get(name)
    }

    /// The active profile, if the `activeNetwork` pointer is present and
    /// names an existing entry. A dangling pointer logs a warning.
    pub fn active(&self) -> Option<(&str, &NetworkProfile)> {
        let name = self.data.active_network.as_deref()?;
        match self.data.networks.get(name) {
            Some(profile) => Some((name, profile)),
            None => {
                log::warn!("activeNetwork {name:?} does not exist in {}", self.path.display());
                None
            }
        }
    }
}
