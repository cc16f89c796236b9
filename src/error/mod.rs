//! Error handling for the package manager client
//!
//! Every fallible operation in the crate returns [`Result`]. The variants
//! mirror the user-visible error taxonomy: classification of raw chain and
//! RPC errors into these variants happens once, in `chain::translate`.

use std::fmt;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, TpkmError>;

/// Classified error carried from the core up to the command layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TpkmError {
    /// No usable network configuration (no active profile, no env vars)
    ConfigMissing(String),
    /// Network profile store is present but unreadable
    Config(String),
    /// Wrong password or missing required password
    Auth(String),
    /// Keystore file does not exist
    KeystoreMissing(String),
    /// Keystore file exists but cannot be parsed
    KeystoreCorrupt(String),
    /// Malformed name, version, address, fee, or identifier (pre-network)
    Validation(String),
    /// Library or version absent on-chain
    NotFound(String),
    /// Version conflict, name taken, version exists, license already owned
    Conflict(String),
    /// Caller is not owner / not authorized
    Permission(String),
    /// Operation rejected by registry policy
    Policy(String),
    /// Insufficient funds or insufficient ether sent
    Funds(String),
    /// Transaction-level failure (nonce, replacement, denial, gas estimation)
    Tx(String),
    /// CID unresolvable on IPFS
    IpfsNotFound(String),
    /// IPFS endpoint down
    IpfsUnreachable(String),
    /// RPC endpoint down
    RpcUnreachable(String),
    /// On-chain version record has an empty or invalid CID
    BadRecord(String),
    /// File I/O errors
    Io(String),
    /// Anything else, with the cleaned original message
    Unknown(String),
}

impl TpkmError {
    /// Stable taxonomy tag for this error
    pub fn kind(&self) -> &'static str {
        match self {
            TpkmError::ConfigMissing(_) => "CONFIG_MISSING",
            TpkmError::Config(_) => "CONFIG",
            TpkmError::Auth(_) => "AUTH",
            TpkmError::KeystoreMissing(_) => "KEYSTORE_MISSING",
            TpkmError::KeystoreCorrupt(_) => "KEYSTORE_CORRUPT",
            TpkmError::Validation(_) => "VALIDATION",
            TpkmError::NotFound(_) => "NOT_FOUND",
            TpkmError::Conflict(_) => "CONFLICT",
            TpkmError::Permission(_) => "PERMISSION",
            TpkmError::Policy(_) => "POLICY",
            TpkmError::Funds(_) => "FUNDS",
            TpkmError::Tx(_) => "TX",
            TpkmError::IpfsNotFound(_) => "IPFS_NOT_FOUND",
            TpkmError::IpfsUnreachable(_) => "IPFS_UNREACHABLE",
            TpkmError::RpcUnreachable(_) => "RPC_UNREACHABLE",
            TpkmError::BadRecord(_) => "BAD_RECORD",
            TpkmError::Io(_) => "IO",
            TpkmError::Unknown(_) => "UNKNOWN",
        }
    }

    /// One-line guidance shown under the error, when there is something
    /// actionable to say
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            TpkmError::ConfigMissing(_) => Some(
                "Run `tpkm config add <name> --rpc <url> --contract <address> --set-active` \
                 or set RPC_URL and CONTRACT_ADDRESS",
            ),
            TpkmError::KeystoreMissing(_) => {
                Some("Run `tpkm wallet create` or `tpkm wallet import <privateKey>` first")
            }
            TpkmError::Auth(_) => {
                Some("Check the wallet password (or the TPKM_WALLET_PASSWORD variable)")
            }
            TpkmError::IpfsUnreachable(_) => Some("Is the IPFS daemon running? Check IPFS_API_URL"),
            TpkmError::RpcUnreachable(_) => Some("Check the RPC URL of the active network profile"),
            _ => None,
        }
    }
}

impl fmt::Display for TpkmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TpkmError::ConfigMissing(msg) => write!(f, "No network configured: {msg}"),
            TpkmError::Config(msg) => write!(f, "Configuration error: {msg}"),
            TpkmError::Auth(msg) => write!(f, "Authentication failed: {msg}"),
            TpkmError::KeystoreMissing(msg) => write!(f, "Keystore not found: {msg}"),
            TpkmError::KeystoreCorrupt(msg) => write!(f, "Keystore unreadable: {msg}"),
            TpkmError::Validation(msg) => write!(f, "Invalid input: {msg}"),
            TpkmError::NotFound(msg) => write!(f, "Not found: {msg}"),
            TpkmError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            TpkmError::Permission(msg) => write!(f, "Permission denied: {msg}"),
            TpkmError::Policy(msg) => write!(f, "Not allowed: {msg}"),
            TpkmError::Funds(msg) => write!(f, "Insufficient funds: {msg}"),
            TpkmError::Tx(msg) => write!(f, "Transaction failed: {msg}"),
            TpkmError::IpfsNotFound(msg) => write!(f, "IPFS content not found: {msg}"),
            TpkmError::IpfsUnreachable(msg) => write!(f, "IPFS unreachable: {msg}"),
            TpkmError::RpcUnreachable(msg) => write!(f, "RPC unreachable: {msg}"),
            TpkmError::BadRecord(msg) => write!(f, "Bad registry record: {msg}"),
            TpkmError::Io(msg) => write!(f, "I/O error: {msg}"),
            TpkmError::Unknown(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for TpkmError {}

impl From<std::io::Error> for TpkmError {
    fn from(err: std::io::Error) -> Self {
        TpkmError::Io(err.to_string())
    }
}
