//! License operations
//!
//! Fee configuration by the owner, and license purchase by everyone else.
//! Predictable refusals happen here, before any transaction is built.

use crate::chain::{SignerRegistry, TxReceipt};
use crate::error::{Result, TpkmError};
use crate::utils::{format_eth, parse_fee, validate_library_name};
use num_bigint::BigUint;

/// Set or clear the license terms of an owned library
pub fn set_license(
    registry: &SignerRegistry,
    name: &str,
    fee_input: &str,
    required: bool,
) -> Result<TxReceipt> {
    validate_library_name(name)?;
    let fee = parse_fee(fee_input)?;

    let record = registry.read().get_library_info(name)?;
    if record.owner != registry.signer_address() {
        return Err(TpkmError::Permission(format!(
            "only the owner {} can change license terms of '{name}'",
            record.owner.to_checksum()
        )));
    }
    if record.is_private && required {
        return Err(TpkmError::Policy(format!(
            "library '{name}' is private; a private library cannot require a license"
        )));
    }
    if fee > BigUint::from(0u8) && !required {
        log::warn!(
            "fee of {} ETH set while the license is not required; nobody will be charged",
            format_eth(&fee)
        );
    }
    registry.set_library_license(name, fee, required)
}

/// Buy a license, paying exactly the on-chain fee unless the caller offers
/// a specific amount
pub fn purchase_license(
    registry: &SignerRegistry,
    name: &str,
    amount: Option<&str>,
) -> Result<TxReceipt> {
    validate_library_name(name)?;
    let caller = registry.signer_address();

    let record = registry.read().get_library_info(name)?;
    if record.owner == caller {
        return Err(TpkmError::Policy(format!(
            "you own '{name}'; owners do not need a license"
        )));
    }
    if record.is_private {
        return Err(TpkmError::Policy(format!(
            "library '{name}' is private; licenses do not apply to private libraries"
        )));
    }
    if !record.license_required {
        return Err(TpkmError::Policy(format!(
            "library '{name}' does not require a license"
        )));
    }
    if registry.read().has_user_license(name, caller)? {
        return Err(TpkmError::Conflict(format!(
            "a license for '{name}' is already owned by this wallet"
        )));
    }

    let value = match amount {
        Some(input) => {
            let offered = parse_fee(input)?;
            if offered < record.license_fee {
                return Err(TpkmError::Funds(format!(
                    "offered {} ETH but the license fee for '{name}' is {} ETH",
                    format_eth(&offered),
                    format_eth(&record.license_fee)
                )));
            }
            if offered > record.license_fee {
                log::warn!(
                    "paying {} ETH for a {} ETH license; any refund is up to the contract",
                    format_eth(&offered),
                    format_eth(&record.license_fee)
                );
            }
            offered
        }
        None => record.license_fee.clone(),
    };
    registry.purchase_library_license(name, value)
}
