//! Utility functions and helpers
//!
//! This module contains the Ethereum primitive helpers (hashing, addresses),
//! wei unit parsing, and identifier validation used throughout the client.

pub mod eth;
pub mod names;
pub mod units;

pub use eth::{current_timestamp, keccak256, Address};
pub use names::{parse_library_spec, validate_library_name};
pub use units::{format_eth, parse_fee, parse_units, WEI_PER_ETH};
