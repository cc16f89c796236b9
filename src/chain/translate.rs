//! Revert and RPC error classification
//!
//! Single choke point turning raw chain failures into the user-visible
//! taxonomy. Extraction order: ABI revert reason, decoded custom error,
//! nested provider message, top-level message. The tables below are pure
//! data and carry no network dependency.

use crate::chain::rpc::{RawRpcError, RpcError};
use crate::error::TpkmError;
use crate::utils::keccak256;
use serde_json::Value;

/// Internal classification target, mapped to a constructor at the end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    NotFound,
    Conflict,
    Permission,
    Policy,
    Funds,
    Tx,
    Unknown,
}

/// Known registry revert strings, matched by case-insensitive substring
const REVERT_TABLE: &[(&str, Kind)] = &[
    ("library does not exist", Kind::NotFound),
    ("version does not exist", Kind::NotFound),
    ("library not found", Kind::NotFound),
    ("caller is not the owner", Kind::Permission),
    ("not the library owner", Kind::Permission),
    ("not authorized", Kind::Permission),
    ("cannot authorize owner", Kind::Permission),
    ("cannot revoke owner", Kind::Permission),
    ("library already registered", Kind::Conflict),
    ("name already taken", Kind::Conflict),
    ("version already exists", Kind::Conflict),
    ("license already owned", Kind::Conflict),
    ("already has a license", Kind::Conflict),
    ("library is not private", Kind::Policy),
    ("library is private", Kind::Policy),
    ("license is not required", Kind::Policy),
    ("license not required", Kind::Policy),
    ("private library cannot require a license", Kind::Policy),
    ("cannot delete library with published versions", Kind::Policy),
    ("insufficient ether sent", Kind::Funds),
];

/// Known provider / node failure messages
const RPC_TABLE: &[(&str, Kind)] = &[
    ("insufficient funds", Kind::Funds),
    ("nonce too low", Kind::Tx),
    ("nonce has already been used", Kind::Tx),
    ("nonce expired", Kind::Tx),
    ("replacement transaction underpriced", Kind::Tx),
    ("transaction underpriced", Kind::Tx),
    ("user denied", Kind::Tx),
    ("user rejected", Kind::Tx),
    ("cannot estimate gas", Kind::Tx),
    ("unpredictable_gas_limit", Kind::Tx),
    ("gas required exceeds allowance", Kind::Tx),
];

/// Custom errors the registry contract is known to raise, as an alternative
/// to string reverts
const CUSTOM_ERRORS: &[(&str, &str)] = &[
    ("LibraryDoesNotExist()", "library does not exist"),
    ("VersionDoesNotExist()", "version does not exist"),
    ("NotLibraryOwner()", "caller is not the owner"),
    ("NotAuthorized()", "not authorized"),
    ("LibraryAlreadyRegistered()", "library already registered"),
    ("VersionAlreadyExists()", "version already exists"),
    ("LicenseAlreadyOwned()", "license already owned"),
    ("LibraryNotPrivate()", "library is not private"),
    ("LibraryIsPrivate()", "library is private"),
    ("LicenseNotRequired()", "license not required"),
    ("LibraryHasVersions()", "cannot delete library with published versions"),
    ("InsufficientFee()", "insufficient ether sent"),
];

const MESSAGE_PREFIXES: &[&str] = &["execution reverted: ", "Error: ", "RPC Error: "];

/// Strip the boilerplate prefixes providers wrap around revert reasons
pub fn clean_message(message: &str) -> String {
    let mut msg = message.trim();
    loop {
        let mut stripped = false;
        for prefix in MESSAGE_PREFIXES {
            if let Some(rest) = msg.strip_prefix(prefix) {
                msg = rest.trim();
                stripped = true;
            }
        }
        if !stripped {
            break;
        }
    }
    msg.to_string()
}

fn first_hex_blob(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::String(s) => {
            let hex_part = s.strip_prefix("0x")?;
            hex::decode(hex_part).ok().filter(|b| !b.is_empty())
        }
        Value::Object(map) => map.values().find_map(first_hex_blob),
        Value::Array(items) => items.iter().find_map(first_hex_blob),
        _ => None,
    }
}

/// Decode `Error(string)` revert data: selector 0x08c379a0 followed by an
/// ABI-encoded string
fn decode_error_string(blob: &[u8]) -> Option<String> {
    if blob.len() < 4 + 64 || blob[..4] != [0x08, 0xc3, 0x79, 0xa0] {
        return None;
    }
    let tokens =
        crate::chain::abi::decode(&[crate::chain::abi::ParamType::Str], &blob[4..]).ok()?;
    tokens.into_iter().next()?.into_str().ok()
}

fn decode_custom_error(blob: &[u8]) -> Option<String> {
    if blob.len() < 4 {
        return None;
    }
    for (signature, message) in CUSTOM_ERRORS {
        let hash = keccak256(signature.as_bytes());
        if blob[..4] == hash[..4] {
            return Some((*message).to_string());
        }
    }
    None
}

fn nested_message(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| map.values().find_map(nested_message)),
        Value::Array(items) => items.iter().find_map(nested_message),
        _ => None,
    }
}

fn make(kind: Kind, message: String) -> TpkmError {
    match kind {
        Kind::NotFound => TpkmError::NotFound(message),
        Kind::Conflict => TpkmError::Conflict(message),
        Kind::Permission => TpkmError::Permission(message),
        Kind::Policy => TpkmError::Policy(message),
        Kind::Funds => TpkmError::Funds(message),
        Kind::Tx => TpkmError::Tx(message),
        Kind::Unknown => TpkmError::Unknown(message),
    }
}

/// Classify an already-extracted message against the fixed tables
pub fn classify_message(message: &str, code: Option<i64>) -> TpkmError {
    let cleaned = clean_message(message);
    let lowered = cleaned.to_lowercase();
    for (needle, kind) in REVERT_TABLE {
        if lowered.contains(needle) {
            return make(*kind, cleaned);
        }
    }
    for (needle, kind) in RPC_TABLE {
        if lowered.contains(needle) {
            return make(*kind, cleaned);
        }
    }
    match code {
        Some(-32003) => TpkmError::Tx(cleaned),
        _ => TpkmError::Unknown(cleaned),
    }
}

/// Pull the most specific failure description out of a raw RPC error
fn extract_message(raw: &RawRpcError) -> String {
    if let Some(data) = &raw.data {
        if let Some(blob) = first_hex_blob(data) {
            if let Some(reason) = decode_error_string(&blob) {
                return reason;
            }
            if let Some(reason) = decode_custom_error(&blob) {
                return reason;
            }
        }
        if let Some(msg) = nested_message(data) {
            return msg;
        }
    }
    raw.message.clone()
}

/// The single entry point: every chain error funnels through here
pub fn translate(err: RpcError) -> TpkmError {
    match err {
        RpcError::Transport(msg) => TpkmError::RpcUnreachable(msg),
        RpcError::Rpc(raw) => classify_message(&extract_message(&raw), raw.code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::abi::{encode, Token};
    use serde_json::json;

    fn revert_data(reason: &str) -> String {
        let mut blob = vec![0x08, 0xc3, 0x79, 0xa0];
        blob.extend(encode(&[Token::Str(reason.to_string())]));
        format!("0x{}", hex::encode(blob))
    }

    fn rpc_err(message: &str, code: Option<i64>, data: Option<Value>) -> RpcError {
        RpcError::Rpc(RawRpcError {
            code,
            message: message.to_string(),
            data,
        })
    }

    #[test]
    fn revert_strings_map_to_fixed_kinds() {
        let cases = [
            ("library does not exist", "NOT_FOUND"),
            ("Library does not exist", "NOT_FOUND"),
            ("caller is not the owner", "PERMISSION"),
            ("version already exists", "CONFLICT"),
            ("license already owned", "CONFLICT"),
            ("library is not private", "POLICY"),
            ("cannot delete library with published versions", "POLICY"),
            ("insufficient ether sent", "FUNDS"),
        ];
        for (reason, kind) in cases {
            let err = classify_message(reason, None);
            assert_eq!(err.kind(), kind, "{reason}");
        }
    }

    #[test]
    fn reason_is_extracted_from_revert_data() {
        let err = translate(rpc_err(
            "execution reverted",
            Some(3),
            Some(json!(revert_data("library does not exist"))),
        ));
        assert_eq!(err.kind(), "NOT_FOUND");
    }

    #[test]
    fn reason_found_in_nested_data() {
        let err = translate(rpc_err(
            "processing response error",
            Some(-32000),
            Some(json!({"originalError": {"data": revert_data("version already exists")}})),
        ));
        assert_eq!(err.kind(), "CONFLICT");
    }

    #[test]
    fn custom_error_selector_is_decoded() {
        let hash = keccak256(b"LicenseAlreadyOwned()");
        let err = translate(rpc_err(
            "execution reverted",
            Some(3),
            Some(json!(format!("0x{}", hex::encode(&hash[..4])))),
        ));
        assert_eq!(err.kind(), "CONFLICT");
    }

    #[test]
    fn nested_provider_message_is_used() {
        let err = translate(rpc_err(
            "Internal JSON-RPC error.",
            Some(-32603),
            Some(json!({"message": "nonce too low: next nonce 5"})),
        ));
        assert_eq!(err.kind(), "TX");
    }

    #[test]
    fn rpc_codes_and_messages() {
        assert_eq!(
            classify_message("insufficient funds for gas * price + value", Some(-32000)).kind(),
            "FUNDS"
        );
        assert_eq!(classify_message("replacement transaction underpriced", None).kind(), "TX");
        assert_eq!(classify_message("User denied transaction signature.", None).kind(), "TX");
        assert_eq!(
            classify_message("cannot estimate gas; transaction may fail", None).kind(),
            "TX"
        );
        assert_eq!(classify_message("something odd", Some(-32003)).kind(), "TX");
    }

    #[test]
    fn unknown_messages_are_cleaned() {
        let err = classify_message("execution reverted: Error: mystery condition", None);
        assert_eq!(err.kind(), "UNKNOWN");
        assert_eq!(err, TpkmError::Unknown("mystery condition".to_string()));
    }

    #[test]
    fn transport_failure_is_unreachable() {
        let err = translate(RpcError::Transport("connection refused".to_string()));
        assert_eq!(err.kind(), "RPC_UNREACHABLE");
    }
}
