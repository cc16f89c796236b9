//! EVM registry access
//!
//! Everything that touches the chain goes through this module: the JSON-RPC
//! transport, the ABI codec for the registry's fixed function surface,
//! legacy transaction assembly and signing, and the typed read/write
//! contract handles. Raw RPC and revert errors are classified exactly once,
//! in [`translate`].

pub mod abi;
pub mod registry;
pub mod rpc;
pub mod translate;
pub mod tx;

pub use registry::{LibraryRecord, Registry, SignerRegistry, TxReceipt, VersionRecord};
pub use rpc::{RawRpcError, RpcClient, RpcError};
