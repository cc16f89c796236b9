//! Effective network resolution
//!
//! Precedence for the chain endpoints: valid active profile, then the
//! RPC_URL / CONTRACT_ADDRESS environment variables, then failure. The IPFS
//! API URL alone may fall back to the local daemon default.

use crate::config::networks::{validate_rpc_url, NetworkStore};
use crate::config::{CONTRACT_ADDRESS_VAR, DEFAULT_IPFS_API_URL, IPFS_API_URL_VAR, RPC_URL_VAR};
use crate::error::{Result, TpkmError};
use crate::utils::Address;
use std::collections::HashMap;
use std::env;

/// Where each endpoint came from, for the startup log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Profile,
    Environment,
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Profile => write!(f, "active profile"),
            ConfigSource::Environment => write!(f, "environment"),
            ConfigSource::Default => write!(f, "default"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EffectiveNetwork {
    pub rpc_url: String,
    pub contract_address: Address,
    pub ipfs_url: String,
    pub chain_source: ConfigSource,
    pub ipfs_source: ConfigSource,
}

/// Resolve the endpoints for this invocation from the store and the given
/// environment snapshot
pub fn resolve_effective_from(
    store: &NetworkStore,
    env_vars: &HashMap<String, String>,
) -> Result<EffectiveNetwork> {
    let env_ipfs = env_vars.get(IPFS_API_URL_VAR).filter(|v| !v.is_empty());
    let (ipfs_url, ipfs_source) = match env_ipfs {
        Some(url) => (url.clone(), ConfigSource::Environment),
        None => (DEFAULT_IPFS_API_URL.to_string(), ConfigSource::Default),
    };

    if let Some((name, profile)) = store.active() {
        match profile.validate() {
            Ok(contract_address) => {
                return Ok(EffectiveNetwork {
                    rpc_url: profile.rpc_url.clone(),
                    contract_address,
                    ipfs_url,
                    chain_source: ConfigSource::Profile,
                    ipfs_source,
                });
            }
            Err(e) => {
                log::warn!("active profile {name:?} is invalid ({e}); trying environment");
            }
        }
    }

    let env_rpc = env_vars.get(RPC_URL_VAR).filter(|v| !v.is_empty());
    let env_contract = env_vars.get(CONTRACT_ADDRESS_VAR).filter(|v| !v.is_empty());
    match (env_rpc, env_contract) {
        (Some(rpc_url), Some(contract)) => {
            validate_rpc_url(rpc_url)?;
            let contract_address: Address = contract.parse()?;
            Ok(EffectiveNetwork {
                rpc_url: rpc_url.clone(),
                contract_address,
                ipfs_url,
                chain_source: ConfigSource::Environment,
                ipfs_source,
            })
        }
        _ => Err(TpkmError::ConfigMissing(
            "no active network profile and RPC_URL/CONTRACT_ADDRESS are not set".to_string(),
        )),
    }
}

/// [`resolve_effective_from`] against the process environment
pub fn resolve_effective(store: &NetworkStore) -> Result<EffectiveNetwork> {
    let vars: HashMap<String, String> = [RPC_URL_VAR, CONTRACT_ADDRESS_VAR, IPFS_API_URL_VAR]
        .iter()
        .filter_map(|k| env::var(k).ok().map(|v| (k.to_string(), v)))
        .collect();
    resolve_effective_from(store, &vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::networks::NETWORKS_FILE;
    use tempfile::tempdir;

    const CONTRACT: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn empty_store() -> NetworkStore {
        let dir = tempdir().unwrap();
        NetworkStore::load_from(dir.path().join(NETWORKS_FILE)).unwrap()
    }

    #[test]
    fn profile_wins_over_environment() {
        let dir = tempdir().unwrap();
        let mut store = NetworkStore::load_from(dir.path().join(NETWORKS_FILE)).unwrap();
        store
            .add("local", "http://profile:8545".to_string(), CONTRACT.to_string(), true)
            .unwrap();

        let env = env_of(&[
            ("RPC_URL", "http://env:8545"),
            ("CONTRACT_ADDRESS", "0x0000000000000000000000000000000000000001"),
        ]);
        let effective = resolve_effective_from(&store, &env).unwrap();
        assert_eq!(effective.rpc_url, "http://profile:8545");
        assert_eq!(effective.chain_source, ConfigSource::Profile);
    }

    #[test]
    fn invalid_profile_does_not_mask_environment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(NETWORKS_FILE);
        std::fs::write(
            &path,
            r#"{ "activeNetwork": "bad",
                 "networks": { "bad": { "rpcUrl": "ftp://nope", "contractAddress": "0x1" } } }"#,
        )
        .unwrap();
        let store = NetworkStore::load_from(path).unwrap();

        let env = env_of(&[
            ("RPC_URL", "http://env:8545"),
            ("CONTRACT_ADDRESS", CONTRACT),
        ]);
        let effective = resolve_effective_from(&store, &env).unwrap();
        assert_eq!(effective.chain_source, ConfigSource::Environment);
        assert_eq!(effective.rpc_url, "http://env:8545");
    }

    #[test]
    fn missing_everything_fails_with_guidance() {
        let store = empty_store();
        let err = resolve_effective_from(&store, &HashMap::new()).unwrap_err();
        assert_eq!(err.kind(), "CONFIG_MISSING");
        assert!(err.hint().is_some());
    }

    #[test]
    fn partial_environment_is_not_enough() {
        let store = empty_store();
        let env = env_of(&[("RPC_URL", "http://env:8545")]);
        let err = resolve_effective_from(&store, &env).unwrap_err();
        assert_eq!(err.kind(), "CONFIG_MISSING");
    }

    #[test]
    fn ipfs_url_defaults_independently() {
        let store = empty_store();
        let env = env_of(&[
            ("RPC_URL", "http://env:8545"),
            ("CONTRACT_ADDRESS", CONTRACT),
        ]);
        let effective = resolve_effective_from(&store, &env).unwrap();
        assert_eq!(effective.ipfs_url, DEFAULT_IPFS_API_URL);
        assert_eq!(effective.ipfs_source, ConfigSource::Default);

        let env = env_of(&[
            ("RPC_URL", "http://env:8545"),
            ("CONTRACT_ADDRESS", CONTRACT),
            ("IPFS_API_URL", "http://ipfs:5001/api/v0"),
        ]);
        let effective = resolve_effective_from(&store, &env).unwrap();
        assert_eq!(effective.ipfs_url, "http://ipfs:5001/api/v0");
        assert_eq!(effective.ipfs_source, ConfigSource::Environment);
    }
}
