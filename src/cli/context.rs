//! Command context
//!
//! Explicit value built by the command layer and threaded through the core
//! operations: effective network, connected registry handle, and (when the
//! command needs it) a probed IPFS client. No process-wide clients.

use crate::chain::{Registry, SignerRegistry};
use crate::cli::ui::Ui;
use crate::config::{resolve_effective, NetworkStore};
use crate::error::{Result, TpkmError};
use crate::ipfs::IpfsClient;
use crate::utils::Address;
use crate::wallet::{Keystore, Signer};
use std::env;

pub const WALLET_PASSWORD_VAR: &str = "TPKM_WALLET_PASSWORD";

pub struct Context {
    pub registry: Registry,
    ipfs: Option<IpfsClient>,
}

impl Context {
    /// Resolve the effective network and open the chain (and optionally
    /// IPFS) connections
    pub fn connect(need_ipfs: bool) -> Result<Context> {
        let store = NetworkStore::load()?;
        let network = resolve_effective(&store)?;
        log::info!(
            "registry {} via {} ({})",
            network.contract_address.to_checksum(),
            network.rpc_url,
            network.chain_source
        );
        let registry = Registry::connect(&network.rpc_url, network.contract_address)?;

        let ipfs = if need_ipfs {
            let client = IpfsClient::new(&network.ipfs_url)?;
            let version = client.probe()?;
            log::debug!("IPFS {} at {} ({})", version, network.ipfs_url, network.ipfs_source);
            Some(client)
        } else {
            None
        };

        Ok(Context { registry, ipfs })
    }

    pub fn ipfs(&self) -> Result<&IpfsClient> {
        self.ipfs
            .as_ref()
            .ok_or_else(|| TpkmError::Unknown("IPFS client was not initialized".to_string()))
    }

    /// Detach the IPFS client, for commands that also need a signing handle
    pub fn take_ipfs(&mut self) -> Result<IpfsClient> {
        self.ipfs
            .take()
            .ok_or_else(|| TpkmError::Unknown("IPFS client was not initialized".to_string()))
    }

    /// Decrypt the keystore and wrap the registry handle for writes,
    /// consuming the read-only handle
    pub fn into_signing(self, ui: &mut dyn Ui) -> Result<SignerRegistry> {
        let signer = load_signer(ui)?;
        log::info!("wallet {}", signer.address().to_checksum());
        Ok(SignerRegistry::new(self.registry, signer))
    }
}

/// The wallet password: environment variable first, interactive prompt
/// otherwise. Empty passwords are rejected either way.
pub fn wallet_password(ui: &mut dyn Ui) -> Result<String> {
    let password = match env::var(WALLET_PASSWORD_VAR) {
        Ok(value) if !value.is_empty() => value,
        _ => ui.prompt_password("Wallet password")?,
    };
    if password.is_empty() {
        return Err(TpkmError::Auth("password must not be empty".to_string()));
    }
    Ok(password)
}

/// Decrypt the default keystore
pub fn load_signer(ui: &mut dyn Ui) -> Result<Signer> {
    let keystore = Keystore::open_default()?;
    if !keystore.exists() {
        return Err(TpkmError::KeystoreMissing(
            keystore.path().display().to_string(),
        ));
    }
    let password = wallet_password(ui)?;
    keystore.decrypt(&password)
}

/// The keystore address when a keystore exists, without needing a password.
/// Used for read-side access gating.
pub fn keystore_address() -> Option<Address> {
    let keystore = Keystore::open_default().ok()?;
    if !keystore.exists() {
        return None;
    }
    match keystore.address_without_decrypt() {
        Ok(address) => Some(address),
        Err(e) => {
            log::warn!("ignoring unreadable keystore: {e}");
            None
        }
    }
}
