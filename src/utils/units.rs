//! Wei amount parsing and rendering
//!
//! Fees are entered as `<amount> <unit>` with unit one of eth, ether, gwei,
//! wei. A bare integer is taken as wei. `"0"`, `"0 eth"` and `"none"` all
//! mean zero.

use crate::error::{Result, TpkmError};
use num_bigint::BigUint;
use once_cell::sync::Lazy;

pub static WEI_PER_ETH: Lazy<BigUint> = Lazy::new(|| BigUint::from(10u64).pow(18));

fn unit_decimals(unit: &str) -> Option<u32> {
    match unit {
        "eth" | "ether" => Some(18),
        "gwei" => Some(9),
        "wei" => Some(0),
        _ => None,
    }
}

/// Parse a decimal amount with the given number of fractional decimals into
/// an integer base-unit value
pub fn parse_units(amount: &str, decimals: u32) -> Result<BigUint> {
    let amount = amount.trim();
    if amount.is_empty() || amount.starts_with('-') {
        return Err(TpkmError::Validation(format!("invalid amount {amount:?}")));
    }
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(TpkmError::Validation(format!("invalid amount {amount:?}")));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(TpkmError::Validation(format!("invalid amount {amount:?}")));
    }
    if frac_part.len() as u32 > decimals {
        return Err(TpkmError::Validation(format!(
            "amount {amount:?} has more than {decimals} fractional digits"
        )));
    }

    let scale = BigUint::from(10u64).pow(decimals);
    let int_value = if int_part.is_empty() {
        BigUint::from(0u8)
    } else {
        BigUint::parse_bytes(int_part.as_bytes(), 10)
            .ok_or_else(|| TpkmError::Validation(format!("invalid amount {amount:?}")))?
    };
    let mut value = int_value * scale;
    if !frac_part.is_empty() {
        let frac_scale = BigUint::from(10u64).pow(decimals - frac_part.len() as u32);
        let frac_value = BigUint::parse_bytes(frac_part.as_bytes(), 10)
            .ok_or_else(|| TpkmError::Validation(format!("invalid amount {amount:?}")))?;
        value += frac_value * frac_scale;
    }
    Ok(value)
}

/// Parse a license fee expression into wei
pub fn parse_fee(input: &str) -> Result<BigUint> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("none") {
        return Ok(BigUint::from(0u8));
    }
    let mut parts = input.split_whitespace();
    let amount = parts
        .next()
        .ok_or_else(|| TpkmError::Validation("empty fee expression".to_string()))?;
    let unit = parts.next();
    if parts.next().is_some() {
        return Err(TpkmError::Validation(format!(
            "fee must be `<amount> <unit>`, got {input:?}"
        )));
    }
    let decimals = match unit {
        Some(u) => unit_decimals(&u.to_ascii_lowercase()).ok_or_else(|| {
            TpkmError::Validation(format!(
                "unknown fee unit {u:?} (expected eth, ether, gwei, or wei)"
            ))
        })?,
        None => 0,
    };
    parse_units(amount, decimals)
}

/// Render a wei amount as a decimal ETH string, full precision
pub fn format_eth(wei: &BigUint) -> String {
    let whole = wei / &*WEI_PER_ETH;
    let frac = wei % &*WEI_PER_ETH;
    if frac == BigUint::from(0u8) {
        return whole.to_string();
    }
    let frac_str = format!("{:0>18}", frac.to_string());
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}
