use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "tpkm",
    version,
    about = "Decentralized package manager backed by an EVM registry and IPFS"
)]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand, about = "Local wallet operations")]
    Wallet(WalletCommand),
    #[command(subcommand, about = "Network profile operations")]
    Config(ConfigCommand),
    #[command(about = "Create a lib.config.json template in the current directory")]
    Init,
    #[command(about = "Register a new library name")]
    Register {
        #[arg(help = "Library name (lowercase, '-', '_', '.' separators)")]
        name: String,
        #[arg(long, default_value = "", help = "Short description")]
        description: String,
        #[arg(long, help = "Comma-separated tags")]
        tags: Option<String>,
        #[arg(long, default_value = "", help = "Implementation language")]
        language: String,
        #[arg(long, help = "Register as a private library")]
        private: bool,
    },
    #[command(about = "List every library name in the registry (may be slow)")]
    List,
    #[command(about = "Show a library, optionally one version")]
    Info {
        #[arg(help = "<name> or <name>@<version>")]
        spec: String,
        #[arg(long, help = "List all published versions")]
        versions: bool,
    },
    #[command(about = "Publish a library version from a directory")]
    Publish {
        #[arg(help = "Directory containing lib.config.json")]
        directory: PathBuf,
        #[arg(long, help = "Override the version in lib.config.json")]
        version: Option<String>,
    },
    #[command(about = "Install a library and its dependencies")]
    Install {
        #[arg(help = "<name> or <name>@<version>; no version means latest stable")]
        spec: String,
    },
    #[command(about = "Mark a published version as deprecated")]
    Deprecate {
        #[arg(help = "<name>@<version>")]
        spec: String,
    },
    #[command(about = "Grant a user access to a private library")]
    Authorize {
        name: String,
        #[arg(help = "Address to authorize")]
        user: String,
    },
    #[command(about = "Revoke a user's access to a private library")]
    Revoke {
        name: String,
        #[arg(help = "Address to revoke")]
        user: String,
    },
    #[command(name = "set-license", about = "Set license fee and requirement (owner)")]
    SetLicense {
        name: String,
        #[arg(long, help = "Fee as '<amount> <unit>' (eth, ether, gwei, wei), '0', or 'none'")]
        fee: String,
        #[arg(long, help = "Require a license for access")]
        required: bool,
    },
    #[command(name = "purchase-license", about = "Buy a license for a library")]
    PurchaseLicense {
        name: String,
        #[arg(long, help = "Amount to pay; defaults to the exact on-chain fee")]
        amount: Option<String>,
    },
    #[command(about = "Delete a library that has no published versions")]
    Delete { name: String },
    #[command(
        name = "abandon-registry",
        about = "Transfer registry contract ownership to a burn address"
    )]
    AbandonRegistry {
        #[arg(long = "burn-address", help = "Recipient of contract ownership")]
        burn_address: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum WalletCommand {
    #[command(about = "Create a new keystore")]
    Create {
        #[arg(long, help = "Password (prompted when omitted)")]
        password: Option<String>,
    },
    #[command(about = "Import an existing private key")]
    Import {
        #[arg(help = "64-hex-digit private key, 0x prefix optional")]
        private_key: String,
        #[arg(long, help = "Password (prompted when omitted)")]
        password: Option<String>,
    },
    #[command(about = "Print the wallet address")]
    Address,
    #[command(about = "Print the ETH balance on the active network")]
    Balance,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    #[command(about = "Add or update a network profile")]
    Add {
        name: String,
        #[arg(long, help = "JSON-RPC endpoint (http, https, ws, wss)")]
        rpc: String,
        #[arg(long, help = "Registry contract address")]
        contract: String,
        #[arg(long = "set-active", help = "Make this the active profile")]
        set_active: bool,
    },
    #[command(name = "set-active", about = "Select the active profile")]
    SetActive { name: String },
    #[command(about = "List stored profiles")]
    List,
    #[command(about = "Show the active profile, or a named one")]
    Show { name: Option<String> },
    #[command(about = "Remove a profile")]
    Remove { name: String },
}
