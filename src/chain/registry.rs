//! Typed read and write handles over the registry contract
//!
//! `Registry` wraps a read-only JSON-RPC connection; `SignerRegistry` adds
//! a local signer and submits state-changing transactions, awaiting one
//! confirmation. All raw errors pass through the translator.

use crate::chain::abi::{self, ParamType, Token, SELECTORS};
use crate::chain::rpc::RpcClient;
use crate::chain::translate::translate;
use crate::chain::tx::LegacyTransaction;
use crate::error::{Result, TpkmError};
use crate::utils::Address;
use crate::wallet::Signer;
use num_bigint::BigUint;
use semver::Version;
use serde_json::{json, Value};
use std::thread;
use std::time::Duration;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const RECEIPT_POLL_ATTEMPTS: u32 = 60;

/// On-chain library record
#[derive(Debug, Clone)]
pub struct LibraryRecord {
    pub owner: Address,
    pub description: String,
    pub tags: Vec<String>,
    pub is_private: bool,
    pub language: String,
    pub license_fee: BigUint,
    pub license_required: bool,
}

/// On-chain version record
#[derive(Debug, Clone)]
pub struct VersionRecord {
    pub ipfs_hash: String,
    pub publisher: Address,
    pub published_at: u64,
    pub deprecated: bool,
    pub dependencies: Vec<(String, String)>,
}

impl VersionRecord {
    /// An absent artifact shows up as an empty or sentinel CID field
    pub fn has_usable_cid(&self) -> bool {
        let h = self.ipfs_hash.trim();
        !(h.is_empty()
            || h == "0x"
            || h.trim_start_matches("0x").chars().all(|c| c == '0') && h.starts_with("0x"))
    }
}

/// Confirmation of a mined write transaction
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
}

fn parse_quantity(value: &Value) -> Result<BigUint> {
    let s = value
        .as_str()
        .ok_or_else(|| TpkmError::Unknown(format!("expected hex quantity, got {value}")))?;
    let hex_part = s.strip_prefix("0x").unwrap_or(s);
    if hex_part.is_empty() {
        return Ok(BigUint::from(0u8));
    }
    BigUint::parse_bytes(hex_part.as_bytes(), 16)
        .ok_or_else(|| TpkmError::Unknown(format!("bad hex quantity {s:?}")))
}

fn parse_u64_quantity(value: &Value) -> Result<u64> {
    let big = parse_quantity(value)?;
    u64::try_from(&big).map_err(|_| TpkmError::Unknown(format!("quantity {big} exceeds u64")))
}

fn quantity(value: &BigUint) -> String {
    format!("0x{}", value.to_str_radix(16))
}

fn data_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// Read-only contract handle
pub struct Registry {
    rpc: RpcClient,
    contract: Address,
    chain_id: u64,
}

impl Registry {
    /// Open a connection and confirm the endpoint answers. The contract
    /// address is canonicalized here, once.
    pub fn connect(rpc_url: &str, contract: Address) -> Result<Registry> {
        let rpc = RpcClient::new(rpc_url)?;
        let chain_id = rpc
            .call("eth_chainId", json!([]))
            .map_err(translate)
            .and_then(|v| parse_u64_quantity(&v))?;
        log::debug!("connected to chain {chain_id} at {rpc_url}");
        Ok(Registry {
            rpc,
            contract,
            chain_id,
        })
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let params = json!([
            { "to": self.contract.to_checksum(), "data": data_hex(&data) },
            "latest",
        ]);
        let result = self.rpc.call("eth_call", params).map_err(translate)?;
        let s = result
            .as_str()
            .ok_or_else(|| TpkmError::Unknown(format!("eth_call returned {result}")))?;
        hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| TpkmError::Unknown(format!("bad eth_call return data: {e}")))
    }

    fn call_decode<const N: usize>(
        &self,
        data: Vec<u8>,
        types: &[ParamType; N],
    ) -> Result<[Token; N]> {
        let raw = self.eth_call(data)?;
        let tokens = abi::decode(types, &raw)?;
        tokens
            .try_into()
            .map_err(|_| TpkmError::Unknown("ABI decode returned a short tuple".to_string()))
    }

    pub fn get_library_info(&self, name: &str) -> Result<LibraryRecord> {
        let data = abi::encode_call(SELECTORS.get_library_info, &[Token::Str(name.to_string())]);
        let [owner, description, tags, is_private, language, license_fee, license_required] = self
            .call_decode(
                data,
                &[
                    ParamType::Address,
                    ParamType::Str,
                    ParamType::StrArray,
                    ParamType::Bool,
                    ParamType::Str,
                    ParamType::Uint,
                    ParamType::Bool,
                ],
            )?;
        let record = LibraryRecord {
            owner: owner.into_address()?,
            description: description.into_str()?,
            tags: tags.into_str_array()?,
            is_private: is_private.into_bool()?,
            language: language.into_str()?,
            license_fee: license_fee.into_uint()?,
            license_required: license_required.into_bool()?,
        };
        if record.owner.is_zero() {
            return Err(TpkmError::NotFound(format!(
                "library '{name}' is not registered"
            )));
        }
        if record.is_private && record.license_required {
            return Err(TpkmError::BadRecord(format!(
                "library '{name}' is marked both private and license-required"
            )));
        }
        Ok(record)
    }

    pub fn get_version_numbers(&self, name: &str) -> Result<Vec<Version>> {
        let data =
            abi::encode_call(SELECTORS.get_version_numbers, &[Token::Str(name.to_string())]);
        let [tokens] = self.call_decode(data, &[ParamType::StrArray])?;
        let raw = tokens.into_str_array()?;
        let mut versions = Vec::with_capacity(raw.len());
        for v in raw {
            match Version::parse(&v) {
                Ok(parsed) => versions.push(parsed),
                Err(e) => log::warn!("skipping unparseable version {v:?} of '{name}': {e}"),
            }
        }
        Ok(versions)
    }

    pub fn get_version_info(&self, name: &str, version: &Version) -> Result<VersionRecord> {
        let data = abi::encode_call(
            SELECTORS.get_version_info,
            &[Token::Str(name.to_string()), Token::Str(version.to_string())],
        );
        let [ipfs_hash, publisher, published_at, deprecated, dep_names, dep_constraints] = self
            .call_decode(
                data,
                &[
                    ParamType::Str,
                    ParamType::Address,
                    ParamType::Uint,
                    ParamType::Bool,
                    ParamType::StrArray,
                    ParamType::StrArray,
                ],
            )?;
        let ipfs_hash = ipfs_hash.into_str()?;
        let publisher = publisher.into_address()?;
        let published_at = u64::try_from(&published_at.into_uint()?)
            .map_err(|_| TpkmError::BadRecord(format!("timestamp overflow for {name}@{version}")))?;
        let deprecated = deprecated.into_bool()?;
        let dep_names = dep_names.into_str_array()?;
        let dep_constraints = dep_constraints.into_str_array()?;
        if dep_names.len() != dep_constraints.len() {
            return Err(TpkmError::BadRecord(format!(
                "dependency arrays of {name}@{version} have different lengths"
            )));
        }
        Ok(VersionRecord {
            ipfs_hash,
            publisher,
            published_at,
            deprecated,
            dependencies: dep_names.into_iter().zip(dep_constraints).collect(),
        })
    }

    pub fn has_access(&self, name: &str, user: Address) -> Result<bool> {
        let data = abi::encode_call(
            SELECTORS.has_access,
            &[Token::Str(name.to_string()), Token::Address(user)],
        );
        let [granted] = self.call_decode(data, &[ParamType::Bool])?;
        granted.into_bool()
    }

    pub fn has_user_license(&self, name: &str, user: Address) -> Result<bool> {
        let data = abi::encode_call(
            SELECTORS.has_user_license,
            &[Token::Str(name.to_string()), Token::Address(user)],
        );
        let [held] = self.call_decode(data, &[ParamType::Bool])?;
        held.into_bool()
    }

    /// Every library name ever registered. Unpaged; may be slow on large
    /// registries.
    pub fn get_all_library_names(&self) -> Result<Vec<String>> {
        let data = abi::encode_call(SELECTORS.get_all_library_names, &[]);
        let [names] = self.call_decode(data, &[ParamType::StrArray])?;
        names.into_str_array()
    }

    /// The registry contract's own owner
    pub fn owner(&self) -> Result<Address> {
        let data = abi::encode_call(SELECTORS.owner, &[]);
        let [owner] = self.call_decode(data, &[ParamType::Address])?;
        owner.into_address()
    }

    pub fn get_balance(&self, address: Address) -> Result<BigUint> {
        let result = self
            .rpc
            .call("eth_getBalance", json!([address.to_checksum(), "latest"]))
            .map_err(translate)?;
        parse_quantity(&result)
    }
}

/// Contract handle that can submit transactions
pub struct SignerRegistry {
    read: Registry,
    signer: Signer,
}

impl SignerRegistry {
    pub fn new(read: Registry, signer: Signer) -> SignerRegistry {
        SignerRegistry { read, signer }
    }

    pub fn read(&self) -> &Registry {
        &self.read
    }

    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    /// Build, sign, submit and await one confirmation
    fn send(&self, data: Vec<u8>, value: BigUint) -> Result<TxReceipt> {
        let rpc = &self.read.rpc;
        let from = self.signer.address().to_checksum();
        let to = self.read.contract.to_checksum();

        let nonce = rpc
            .call("eth_getTransactionCount", json!([from, "pending"]))
            .map_err(translate)
            .and_then(|v| parse_u64_quantity(&v))?;
        let gas_price = rpc
            .call("eth_gasPrice", json!([]))
            .map_err(translate)
            .and_then(|v| parse_quantity(&v))?;
        // Predictable reverts surface here, before any gas is spent
        let estimate = rpc
            .call(
                "eth_estimateGas",
                json!([{
                    "from": from,
                    "to": to,
                    "data": data_hex(&data),
                    "value": quantity(&value),
                }]),
            )
            .map_err(translate)
            .and_then(|v| parse_u64_quantity(&v))?;
        let gas_limit = estimate + estimate / 5;

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit,
            to: self.read.contract,
            value,
            data,
        };
        let raw = tx.sign(self.read.chain_id, &self.signer)?;
        let hash = rpc
            .call("eth_sendRawTransaction", json!([data_hex(&raw)]))
            .map_err(translate)?;
        let tx_hash = hash
            .as_str()
            .ok_or_else(|| TpkmError::Unknown(format!("unexpected send result {hash}")))?
            .to_string();
        log::info!("submitted transaction {tx_hash}, awaiting confirmation");
        self.await_receipt(&tx_hash)
    }

    fn await_receipt(&self, tx_hash: &str) -> Result<TxReceipt> {
        for _ in 0..RECEIPT_POLL_ATTEMPTS {
            let receipt = self
                .read
                .rpc
                .call("eth_getTransactionReceipt", json!([tx_hash]))
                .map_err(translate)?;
            if receipt.is_null() {
                thread::sleep(RECEIPT_POLL_INTERVAL);
                continue;
            }
            let status = receipt
                .get("status")
                .map(parse_u64_quantity)
                .transpose()?
                .unwrap_or(1);
            if status == 0 {
                return Err(TpkmError::Tx(format!(
                    "transaction {tx_hash} reverted on-chain"
                )));
            }
            let block_number = receipt
                .get("blockNumber")
                .map(parse_u64_quantity)
                .transpose()?
                .unwrap_or(0);
            return Ok(TxReceipt {
                transaction_hash: tx_hash.to_string(),
                block_number,
            });
        }
        Err(TpkmError::Tx(format!(
            "timed out waiting for confirmation of {tx_hash}"
        )))
    }

    pub fn register_library(
        &self,
        name: &str,
        description: &str,
        tags: Vec<String>,
        is_private: bool,
        language: &str,
    ) -> Result<TxReceipt> {
        let data = abi::encode_call(
            SELECTORS.register_library,
            &[
                Token::Str(name.to_string()),
                Token::Str(description.to_string()),
                Token::StrArray(tags),
                Token::Bool(is_private),
                Token::Str(language.to_string()),
            ],
        );
        self.send(data, BigUint::from(0u8))
    }

    pub fn publish_version(
        &self,
        name: &str,
        version: &Version,
        cid: &str,
        dependencies: &[(String, String)],
    ) -> Result<TxReceipt> {
        let (dep_names, dep_constraints): (Vec<String>, Vec<String>) =
            dependencies.iter().cloned().unzip();
        let data = abi::encode_call(
            SELECTORS.publish_version,
            &[
                Token::Str(name.to_string()),
                Token::Str(version.to_string()),
                Token::Str(cid.to_string()),
                Token::StrArray(dep_names),
                Token::StrArray(dep_constraints),
            ],
        );
        self.send(data, BigUint::from(0u8))
    }

    pub fn deprecate_version(&self, name: &str, version: &Version) -> Result<TxReceipt> {
        let data = abi::encode_call(
            SELECTORS.deprecate_version,
            &[Token::Str(name.to_string()), Token::Str(version.to_string())],
        );
        self.send(data, BigUint::from(0u8))
    }

    pub fn authorize_user(&self, name: &str, user: Address) -> Result<TxReceipt> {
        let data = abi::encode_call(
            SELECTORS.authorize_user,
            &[Token::Str(name.to_string()), Token::Address(user)],
        );
        self.send(data, BigUint::from(0u8))
    }

    pub fn revoke_authorization(&self, name: &str, user: Address) -> Result<TxReceipt> {
        let data = abi::encode_call(
            SELECTORS.revoke_authorization,
            &[Token::Str(name.to_string()), Token::Address(user)],
        );
        self.send(data, BigUint::from(0u8))
    }

    pub fn delete_library(&self, name: &str) -> Result<TxReceipt> {
        let data = abi::encode_call(SELECTORS.delete_library, &[Token::Str(name.to_string())]);
        self.send(data, BigUint::from(0u8))
    }

    pub fn set_library_license(
        &self,
        name: &str,
        fee: BigUint,
        required: bool,
    ) -> Result<TxReceipt> {
        let data = abi::encode_call(
            SELECTORS.set_library_license,
            &[
                Token::Str(name.to_string()),
                Token::Uint(fee),
                Token::Bool(required),
            ],
        );
        self.send(data, BigUint::from(0u8))
    }

    pub fn purchase_library_license(&self, name: &str, value: BigUint) -> Result<TxReceipt> {
        let data = abi::encode_call(
            SELECTORS.purchase_library_license,
            &[Token::Str(name.to_string())],
        );
        self.send(data, value)
    }

    pub fn transfer_ownership(&self, new_owner: Address) -> Result<TxReceipt> {
        let data =
            abi::encode_call(SELECTORS.transfer_ownership, &[Token::Address(new_owner)]);
        self.send(data, BigUint::from(0u8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_u64_quantity(&json!("0x0")).unwrap(), 0);
        assert_eq!(parse_u64_quantity(&json!("0x539")).unwrap(), 1337);
        assert_eq!(
            parse_quantity(&json!("0xde0b6b3a7640000")).unwrap(),
            BigUint::from(10u64).pow(18)
        );
        assert!(parse_quantity(&json!(42)).is_err());
        assert!(parse_quantity(&json!("0xzz")).is_err());
    }

    #[test]
    fn quantity_formatting() {
        assert_eq!(quantity(&BigUint::from(0u8)), "0x0");
        assert_eq!(quantity(&BigUint::from(1337u32)), "0x539");
    }

    #[test]
    fn usable_cid_detection() {
        let mut record = VersionRecord {
            ipfs_hash: "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG".to_string(),
            publisher: Address::ZERO,
            published_at: 0,
            deprecated: false,
            dependencies: vec![],
        };
        assert!(record.has_usable_cid());
        record.ipfs_hash = String::new();
        assert!(!record.has_usable_cid());
        record.ipfs_hash = "  ".to_string();
        assert!(!record.has_usable_cid());
        record.ipfs_hash = "0x".to_string();
        assert!(!record.has_usable_cid());
        record.ipfs_hash = "0x0000000000000000000000000000000000000000".to_string();
        assert!(!record.has_usable_cid());
    }
}
