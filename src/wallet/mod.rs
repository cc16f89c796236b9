//! Wallet and keystore
//!
//! A single encrypted keystore file holds the signing key. The address is
//! stored in the clear so commands can show it without a password; the
//! private key is recoverable only from the encrypted blob plus password.

pub mod keystore;
pub mod signer;

pub use keystore::Keystore;
pub use signer::Signer;
