//! Command-line interface
//!
//! Thin command layer: each verb maps to one core operation, with the
//! confirmations and pre-checks that keep predictable failures from
//! reaching the chain.

pub mod commands;
pub mod context;
pub mod ui;

pub use commands::{Command, ConfigCommand, Opt, WalletCommand};
pub use context::Context;
pub use ui::{ConsoleUi, ScriptedUi, Ui};

use crate::config::NetworkStore;
use crate::core::{info, libconfig::LibConfig, license, publisher, resolver, Installer};
use crate::error::{Result, TpkmError};
use crate::utils::{format_eth, parse_library_spec, validate_library_name, Address};
use crate::wallet::Keystore;
use semver::Version;
use std::env;
use std::path::PathBuf;

const BURN_ADDRESS: &str = "0x000000000000000000000000000000000000dEaD";

fn user_abort() -> TpkmError {
    TpkmError::Unknown("aborted by user".to_string())
}

pub fn run(command: Command, ui: &mut dyn Ui) -> Result<()> {
    match command {
        Command::Wallet(cmd) => run_wallet(cmd, ui),
        Command::Config(cmd) => run_config(cmd, ui),
        Command::Init => run_init(ui),
        Command::Register {
            name,
            description,
            tags,
            language,
            private,
        } => run_register(ui, &name, &description, tags.as_deref(), &language, private),
        Command::List => run_list(),
        Command::Info { spec, versions } => run_info(&spec, versions),
        Command::Publish { directory, version } => run_publish(ui, &directory, version.as_deref()),
        Command::Install { spec } => run_install(&spec),
        Command::Deprecate { spec } => run_deprecate(ui, &spec),
        Command::Authorize { name, user } => run_authorize(ui, &name, &user),
        Command::Revoke { name, user } => run_revoke(ui, &name, &user),
        Command::SetLicense {
            name,
            fee,
            required,
        } => run_set_license(ui, &name, &fee, required),
        Command::PurchaseLicense { name, amount } => {
            run_purchase_license(ui, &name, amount.as_deref())
        }
        Command::Delete { name } => run_delete(ui, &name),
        Command::AbandonRegistry { burn_address } => {
            run_abandon_registry(ui, burn_address.as_deref())
        }
    }
}

fn keystore_password(ui: &mut dyn Ui, flag: Option<&str>) -> Result<String> {
    match flag {
        Some(password) if !password.is_empty() => Ok(password.to_string()),
        Some(_) => Err(TpkmError::Auth("password must not be empty".to_string())),
        None => context::wallet_password(ui),
    }
}

fn confirm_keystore_overwrite(ui: &mut dyn Ui, keystore: &Keystore) -> Result<()> {
    if keystore.exists() {
        let overwrite = ui.confirm(&format!(
            "A keystore already exists at {}. Overwrite it? The old key will be lost",
            keystore.path().display()
        ))?;
        if !overwrite {
            return Err(user_abort());
        }
    }
    Ok(())
}

fn run_wallet(command: WalletCommand, ui: &mut dyn Ui) -> Result<()> {
    match command {
        WalletCommand::Create { password } => {
            let keystore = Keystore::open_default()?;
            confirm_keystore_overwrite(ui, &keystore)?;
            let password = keystore_password(ui, password.as_deref())?;
            let address = keystore.create(&password)?;
            println!("Created wallet {}", address.to_checksum());
        }
        WalletCommand::Import {
            private_key,
            password,
        } => {
            let keystore = Keystore::open_default()?;
            confirm_keystore_overwrite(ui, &keystore)?;
            let password = keystore_password(ui, password.as_deref())?;
            let address = keystore.import(&private_key, &password)?;
            println!("Imported wallet {}", address.to_checksum());
        }
        WalletCommand::Address => {
            let signer = context::load_signer(ui)?;
            println!("{}", signer.address().to_checksum());
        }
        WalletCommand::Balance => {
            let keystore = Keystore::open_default()?;
            if !keystore.exists() {
                return Err(TpkmError::KeystoreMissing(
                    keystore.path().display().to_string(),
                ));
            }
            let address = keystore.address_without_decrypt()?;
            let ctx = Context::connect(false)?;
            let balance = ctx.registry.get_balance(address)?;
            println!(
                "{}: {} ETH ({balance} wei)",
                address.to_checksum(),
                format_eth(&balance)
            );
        }
    }
    Ok(())
}

fn run_config(command: ConfigCommand, _ui: &mut dyn Ui) -> Result<()> {
    match command {
        ConfigCommand::Add {
            name,
            rpc,
            contract,
            set_active,
        } => {
            let mut store = NetworkStore::load()?;
            store.add(&name, rpc, contract, set_active)?;
            println!("Saved profile '{name}'");
            if store.data.active_network.as_deref() == Some(name.as_str()) {
                println!("'{name}' is the active network");
            }
        }
        ConfigCommand::SetActive { name } => {
            let mut store = NetworkStore::load()?;
            store.set_active(&name)?;
            println!("Active network is now '{name}'");
        }
        ConfigCommand::List => {
            let store = NetworkStore::load()?;
            if store.data.networks.is_empty() {
                println!("No network profiles. Add one with `tpkm config add`.");
                return Ok(());
            }
            let active = store.data.active_network.as_deref();
            for (name, profile) in &store.data.networks {
                let marker = if Some(name.as_str()) == active { "*" } else { " " };
                println!("{marker} {name}  {}  {}", profile.rpc_url, profile.contract_address);
            }
        }
        ConfigCommand::Show { name } => {
            let store = NetworkStore::load()?;
            let (name, profile) = match &name {
                Some(name) => {
                    let profile = store.get(name).ok_or_else(|| {
                        TpkmError::NotFound(format!("no network profile named {name:?}"))
                    })?;
                    (name.as_str(), profile)
                }
                None => store.active().ok_or_else(|| {
                    TpkmError::ConfigMissing("no active network profile".to_string())
                })?,
            };
            println!("Name:     {name}");
            println!("RPC:      {}", profile.rpc_url);
            println!("Contract: {}", profile.contract_address);
        }
        ConfigCommand::Remove { name } => {
            let mut store = NetworkStore::load()?;
            let was_active = store.remove(&name)?;
            println!("Removed profile '{name}'");
            if was_active {
                log::warn!("'{name}' was the active network; no network is active now");
            }
        }
    }
    Ok(())
}

fn run_init(ui: &mut dyn Ui) -> Result<()> {
    let dir = env::current_dir()?;
    let path = dir.join(crate::core::libconfig::LIB_CONFIG_FILE);
    if path.exists() {
        let overwrite =
            ui.confirm(&format!("{} already exists. Overwrite it?", path.display()))?;
        if !overwrite {
            return Err(user_abort());
        }
    }
    let name = LibConfig::default_name(&dir);
    let written = LibConfig::write_template(&dir, &name)?;
    println!("Wrote {}", written.display());
    Ok(())
}

fn parse_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn run_register(
    ui: &mut dyn Ui,
    name: &str,
    description: &str,
    tags: Option<&str>,
    language: &str,
    private: bool,
) -> Result<()> {
    validate_library_name(name)?;
    let ctx = Context::connect(false)?;
    match ctx.registry.get_library_info(name) {
        Ok(_) => {
            return Err(TpkmError::Conflict(format!(
                "library name '{name}' is already taken"
            )));
        }
        Err(TpkmError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }
    let registry = ctx.into_signing(ui)?;
    let receipt = registry.register_library(name, description, parse_tags(tags), private, language)?;
    println!(
        "Registered {}'{name}' in block {}",
        if private { "private " } else { "" },
        receipt.block_number
    );
    Ok(())
}

fn run_list() -> Result<()> {
    let ctx = Context::connect(false)?;
    let names = ctx.registry.get_all_library_names()?;
    if names.is_empty() {
        println!("The registry has no libraries yet.");
        return Ok(());
    }
    println!("{} libraries:", names.len());
    for name in names {
        println!("  {name}");
    }
    Ok(())
}

fn run_info(spec: &str, versions: bool) -> Result<()> {
    let (name, version) = parse_library_spec(spec)?;
    let ctx = Context::connect(false)?;
    let caller = context::keystore_address();
    let view = info::library_view(&ctx.registry, &name, version.as_deref(), versions, caller)?;
    print!("{view}");
    Ok(())
}

fn run_publish(ui: &mut dyn Ui, directory: &PathBuf, version: Option<&str>) -> Result<()> {
    if !directory.is_dir() {
        return Err(TpkmError::Validation(format!(
            "{} is not a directory",
            directory.display()
        )));
    }
    let mut ctx = Context::connect(true)?;
    let ipfs = ctx.take_ipfs()?;
    let registry = ctx.into_signing(ui)?;
    let outcome = publisher::publish(&registry, &ipfs, directory, version)?;
    println!(
        "Published {}@{} as {} (tx {})",
        outcome.name, outcome.version, outcome.cid, outcome.transaction_hash
    );
    Ok(())
}

fn run_install(spec: &str) -> Result<()> {
    let (name, version) = parse_library_spec(spec)?;
    let ctx = Context::connect(true)?;
    let caller = context::keystore_address();
    if caller.is_none() {
        log::warn!("no wallet; private and licensed libraries will be unavailable");
    }
    let installer = Installer::new(
        &ctx.registry,
        ctx.ipfs()?,
        caller,
        PathBuf::from(resolver::INSTALL_ROOT),
    );
    let resolved = installer.install(&name, version.as_deref())?;
    println!("Installed {} librar{}:", resolved.len(), if resolved.len() == 1 { "y" } else { "ies" });
    for (lib, ver) in &resolved {
        println!("  {lib}@{ver} -> {}/{lib}/{ver}/", resolver::INSTALL_ROOT);
    }
    Ok(())
}

fn run_deprecate(ui: &mut dyn Ui, spec: &str) -> Result<()> {
    let (name, version) = parse_library_spec(spec)?;
    let version = version.ok_or_else(|| {
        TpkmError::Validation("deprecate requires <name>@<version>".to_string())
    })?;
    let version = Version::parse(&version)
        .map_err(|e| TpkmError::Validation(format!("invalid version {version:?}: {e}")))?;

    let ctx = Context::connect(false)?;
    let record = ctx.registry.get_library_info(&name)?;
    let published = ctx.registry.get_version_numbers(&name)?;
    if !published.contains(&version) {
        return Err(TpkmError::NotFound(format!("{name}@{version} does not exist")));
    }
    let registry = ctx.into_signing(ui)?;
    if record.owner != registry.signer_address() {
        return Err(TpkmError::Permission(format!(
            "only the owner {} can deprecate versions of '{name}'",
            record.owner.to_checksum()
        )));
    }
    if !ui.confirm(&format!("Mark {name}@{version} as deprecated?"))? {
        return Err(user_abort());
    }
    let receipt = registry.deprecate_version(&name, &version)?;
    println!("Deprecated {name}@{version} in block {}", receipt.block_number);
    Ok(())
}

fn run_authorize(ui: &mut dyn Ui, name: &str, user: &str) -> Result<()> {
    validate_library_name(name)?;
    let user: Address = user.parse()?;
    let ctx = Context::connect(false)?;
    let record = ctx.registry.get_library_info(name)?;
    if !record.is_private {
        return Err(TpkmError::Policy(format!(
            "library '{name}' is not private; everyone already has access"
        )));
    }
    if user == record.owner {
        return Err(TpkmError::Permission(
            "the owner cannot be authorized; owners always have access".to_string(),
        ));
    }
    if ctx.registry.has_access(name, user)? {
        log::warn!("{} is already authorized for '{name}'", user.to_checksum());
        return Ok(());
    }
    let registry = ctx.into_signing(ui)?;
    let receipt = registry.authorize_user(name, user)?;
    println!(
        "Authorized {} for '{name}' in block {}",
        user.to_checksum(),
        receipt.block_number
    );
    Ok(())
}

fn run_revoke(ui: &mut dyn Ui, name: &str, user: &str) -> Result<()> {
    validate_library_name(name)?;
    let user: Address = user.parse()?;
    let ctx = Context::connect(false)?;
    let record = ctx.registry.get_library_info(name)?;
    if !record.is_private {
        return Err(TpkmError::Policy(format!(
            "library '{name}' is not private; there is nothing to revoke"
        )));
    }
    if user == record.owner {
        return Err(TpkmError::Permission(
            "the owner's access cannot be revoked".to_string(),
        ));
    }
    if !ctx.registry.has_access(name, user)? {
        log::warn!("{} is not authorized for '{name}'; nothing to do", user.to_checksum());
        return Ok(());
    }
    let registry = ctx.into_signing(ui)?;
    let receipt = registry.revoke_authorization(name, user)?;
    println!(
        "Revoked {} from '{name}' in block {}",
        user.to_checksum(),
        receipt.block_number
    );
    Ok(())
}

fn run_set_license(ui: &mut dyn Ui, name: &str, fee: &str, required: bool) -> Result<()> {
    let ctx = Context::connect(false)?;
    let registry = ctx.into_signing(ui)?;
    let receipt = license::set_license(&registry, name, fee, required)?;
    println!("Updated license terms of '{name}' in block {}", receipt.block_number);
    Ok(())
}

fn run_purchase_license(ui: &mut dyn Ui, name: &str, amount: Option<&str>) -> Result<()> {
    let ctx = Context::connect(false)?;
    let registry = ctx.into_signing(ui)?;
    let receipt = license::purchase_license(&registry, name, amount)?;
    println!("Purchased a license for '{name}' in block {}", receipt.block_number);
    Ok(())
}

fn run_delete(ui: &mut dyn Ui, name: &str) -> Result<()> {
    validate_library_name(name)?;
    let ctx = Context::connect(false)?;
    let record = ctx.registry.get_library_info(name)?;
    // The contract guards this too; checking here saves the user gas
    let published = ctx.registry.get_version_numbers(name)?;
    if !published.is_empty() {
        return Err(TpkmError::Policy(format!(
            "library '{name}' has {} published version(s); libraries with versions cannot \
             be deleted",
            published.len()
        )));
    }
    let registry = ctx.into_signing(ui)?;
    if record.owner != registry.signer_address() {
        return Err(TpkmError::Permission(format!(
            "only the owner {} can delete '{name}'",
            record.owner.to_checksum()
        )));
    }

    let first = ui.prompt_line(&format!(
        "Deleting '{name}' removes its registry entry permanently. Type 'yes' to continue"
    ))?;
    if first.trim() != "yes" {
        return Err(user_abort());
    }
    let second = ui.prompt_line("Type the library name to confirm")?;
    if second.trim() != name {
        return Err(user_abort());
    }

    let receipt = registry.delete_library(name)?;
    println!("Deleted '{name}' in block {}", receipt.block_number);
    Ok(())
}

fn run_abandon_registry(ui: &mut dyn Ui, burn_address: Option<&str>) -> Result<()> {
    let burn: Address = burn_address.unwrap_or(BURN_ADDRESS).parse()?;
    let ctx = Context::connect(false)?;
    let registry = ctx.into_signing(ui)?;
    let contract_owner = registry.read().owner()?;
    if contract_owner != registry.signer_address() {
        return Err(TpkmError::Permission(format!(
            "the registry contract is owned by {}, not by the loaded wallet",
            contract_owner.to_checksum()
        )));
    }

    let understood = ui.confirm(&format!(
        "This transfers ownership of the registry contract to {} and cannot be undone. \
         Do you understand?",
        burn.to_checksum()
    ))?;
    if !understood {
        return Err(user_abort());
    }
    let phrase = ui.prompt_line("Type 'abandon the registry' to proceed")?;
    if phrase.trim() != "abandon the registry" {
        return Err(user_abort());
    }

    let receipt = registry.transfer_ownership(burn)?;
    println!(
        "Registry ownership transferred to {} in block {}",
        burn.to_checksum(),
        receipt.block_number
    );
    Ok(())
}
