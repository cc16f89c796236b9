//! # TacoPKM client core
//!
//! A decentralized package manager client: the registry of record is an EVM
//! smart contract, the artifact store is IPFS. This crate turns user intent
//! (install, publish, info, license, authorize) into correct interactions
//! with those two back-ends.
//!
//! ## How the code is organized
//! - `chain/`: JSON-RPC transport, ABI codec, transaction signing, typed
//!   registry handles, and the single error-classification choke point
//! - `ipfs/`: IPFS HTTP API client (probe, add, cat)
//! - `archive/`: deterministic tar.gz build and streaming extraction
//! - `core/`: the resolver/installer, publish pipeline, access gate,
//!   license rules, and info view
//! - `wallet/`: encrypted keystore and the secp256k1 signer
//! - `config/`: network profile store and endpoint precedence
//! - `cli/`: clap surface, command context, and the injectable UI
//! - `error/`: the user-visible error taxonomy
//! - `utils/`: Ethereum primitives, wei units, name validation
//!
//! ## Where to start reading
//! 1. `cli/mod.rs` for what each verb does
//! 2. `core/resolver.rs` for install semantics
//! 3. `core/publisher.rs` for the publish pipeline
//! 4. `chain/translate.rs` for how raw chain errors become user messages

pub mod archive;
pub mod chain;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod ipfs;
pub mod utils;
pub mod wallet;

// Re-export commonly used types for convenience
pub use chain::{LibraryRecord, Registry, SignerRegistry, VersionRecord};
pub use cli::{Command, Opt};
pub use config::{EffectiveNetwork, NetworkStore};
pub use core::{AccessStatus, Installer, LibConfig, ResolvedSet};
pub use error::{Result, TpkmError};
pub use ipfs::IpfsClient;
pub use utils::Address;
pub use wallet::{Keystore, Signer};
