//! ABI codec for the registry's fixed function surface
//!
//! The contract surface only uses address, uint256, bool, string and
//! string[], so the codec covers exactly those. Function selectors are
//! computed once per process.

use crate::error::{Result, TpkmError};
use crate::utils::{keccak256, Address};
use num_bigint::BigUint;
use once_cell::sync::Lazy;

const WORD: usize = 32;

/// First four bytes of the Keccak-256 of the canonical signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Selectors for every registry function the client consumes
pub struct Selectors {
    pub get_library_info: [u8; 4],
    pub get_version_numbers: [u8; 4],
    pub get_version_info: [u8; 4],
    pub has_access: [u8; 4],
    pub has_user_license: [u8; 4],
    pub get_all_library_names: [u8; 4],
    pub owner: [u8; 4],
    pub register_library: [u8; 4],
    pub publish_version: [u8; 4],
    pub deprecate_version: [u8; 4],
    pub authorize_user: [u8; 4],
    pub revoke_authorization: [u8; 4],
    pub delete_library: [u8; 4],
    pub set_library_license: [u8; 4],
    pub purchase_library_license: [u8; 4],
    pub transfer_ownership: [u8; 4],
}

pub static SELECTORS: Lazy<Selectors> = Lazy::new(|| Selectors {
    get_library_info: selector("getLibraryInfo(string)"),
    get_version_numbers: selector("getVersionNumbers(string)"),
    get_version_info: selector("getVersionInfo(string,string)"),
    has_access: selector("hasAccess(string,address)"),
    has_user_license: selector("hasUserLicense(string,address)"),
    get_all_library_names: selector("getAllLibraryNames()"),
    owner: selector("owner()"),
    register_library: selector("registerLibrary(string,string,string[],bool,string)"),
    publish_version: selector("publishVersion(string,string,string,string[],string[])"),
    deprecate_version: selector("deprecateVersion(string,string)"),
    authorize_user: selector("authorizeUser(string,address)"),
    revoke_authorization: selector("revokeAuthorization(string,address)"),
    delete_library: selector("deleteLibrary(string)"),
    set_library_license: selector("setLibraryLicense(string,uint256,bool)"),
    purchase_library_license: selector("purchaseLibraryLicense(string)"),
    transfer_ownership: selector("transferOwnership(address)"),
});

/// Value crossing the ABI boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(BigUint),
    Bool(bool),
    Str(String),
    StrArray(Vec<String>),
}

/// Type tag for decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Uint,
    Bool,
    Str,
    StrArray,
}

impl Token {
    pub fn into_address(self) -> Result<Address> {
        match self {
            Token::Address(a) => Ok(a),
            other => Err(decode_mismatch("address", &other)),
        }
    }

    pub fn into_uint(self) -> Result<BigUint> {
        match self {
            Token::Uint(u) => Ok(u),
            other => Err(decode_mismatch("uint256", &other)),
        }
    }

    pub fn into_bool(self) -> Result<bool> {
        match self {
            Token::Bool(b) => Ok(b),
            other => Err(decode_mismatch("bool", &other)),
        }
    }

    pub fn into_str(self) -> Result<String> {
        match self {
            Token::Str(s) => Ok(s),
            other => Err(decode_mismatch("string", &other)),
        }
    }

    pub fn into_str_array(self) -> Result<Vec<String>> {
        match self {
            Token::StrArray(v) => Ok(v),
            other => Err(decode_mismatch("string[]", &other)),
        }
    }
}

fn decode_mismatch(expected: &str, got: &Token) -> TpkmError {
    TpkmError::Unknown(format!("ABI decode: expected {expected}, got {got:?}"))
}

fn decode_err(msg: &str) -> TpkmError {
    TpkmError::Unknown(format!("ABI decode: {msg}"))
}

fn pad_right(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    let rem = out.len() % WORD;
    if rem != 0 {
        out.resize(out.len() + WORD - rem, 0);
    }
    out
}

fn uint_word(value: &BigUint) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    let mut word = vec![0u8; WORD - bytes.len()];
    word.extend_from_slice(&bytes);
    word
}

fn usize_word(value: usize) -> Vec<u8> {
    uint_word(&BigUint::from(value))
}

fn encode_str(s: &str) -> Vec<u8> {
    let mut out = usize_word(s.len());
    out.extend(pad_right(s.as_bytes()));
    out
}

fn encode_str_array(items: &[String]) -> Vec<u8> {
    let mut out = usize_word(items.len());
    let mut heads = Vec::new();
    let mut tails: Vec<u8> = Vec::new();
    let base = items.len() * WORD;
    for item in items {
        heads.push(usize_word(base + tails.len()));
        tails.extend(encode_str(item));
    }
    for head in heads {
        out.extend(head);
    }
    out.extend(tails);
    out
}

/// Head/tail encoding of an argument tuple
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head: Vec<u8> = Vec::new();
    let mut tail: Vec<u8> = Vec::new();
    for token in tokens {
        match token {
            Token::Address(a) => {
                let mut word = vec![0u8; 12];
                word.extend_from_slice(a.as_bytes());
                head.extend(word);
            }
            Token::Uint(u) => head.extend(uint_word(u)),
            Token::Bool(b) => head.extend(usize_word(usize::from(*b))),
            Token::Str(s) => {
                head.extend(usize_word(head_len + tail.len()));
                tail.extend(encode_str(s));
            }
            Token::StrArray(items) => {
                head.extend(usize_word(head_len + tail.len()));
                tail.extend(encode_str_array(items));
            }
        }
    }
    head.extend(tail);
    head
}

/// Selector plus encoded arguments: the `data` field of a call
pub fn encode_call(selector: [u8; 4], tokens: &[Token]) -> Vec<u8> {
    let mut out = selector.to_vec();
    out.extend(encode(tokens));
    out
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8]> {
    data.get(offset..offset + WORD)
        .ok_or_else(|| decode_err("truncated data"))
}

fn usize_at(data: &[u8], offset: usize) -> Result<usize> {
    let word = word_at(data, offset)?;
    if word[..WORD - 8].iter().any(|&b| b != 0) {
        return Err(decode_err("offset or length out of range"));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(buf) as usize)
}

fn decode_str_at(data: &[u8], offset: usize) -> Result<String> {
    let len = usize_at(data, offset)?;
    let start = offset + WORD;
    let bytes = data
        .get(start..start + len)
        .ok_or_else(|| decode_err("truncated string"))?;
    String::from_utf8(bytes.to_vec()).map_err(|_| decode_err("string is not UTF-8"))
}

fn decode_str_array_at(data: &[u8], offset: usize) -> Result<Vec<String>> {
    let count = usize_at(data, offset)?;
    let base = offset + WORD;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let rel = usize_at(data, base + i * WORD)?;
        out.push(decode_str_at(data, base + rel)?);
    }
    Ok(out)
}

/// Decode a return-data tuple against its expected types
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>> {
    let mut out = Vec::with_capacity(types.len());
    for (i, ty) in types.iter().enumerate() {
        let head_offset = i * WORD;
        let token = match ty {
            ParamType::Address => {
                let word = word_at(data, head_offset)?;
                let mut bytes = [0u8; 20];
                bytes.copy_from_slice(&word[12..]);
                Token::Address(Address(bytes))
            }
            ParamType::Uint => {
                let word = word_at(data, head_offset)?;
                Token::Uint(BigUint::from_bytes_be(word))
            }
            ParamType::Bool => {
                let word = word_at(data, head_offset)?;
                Token::Bool(word.iter().any(|&b| b != 0))
            }
            ParamType::Str => Token::Str(decode_str_at(data, usize_at(data, head_offset)?)?),
            ParamType::StrArray => {
                Token::StrArray(decode_str_array_at(data, usize_at(data, head_offset)?)?)
            }
        };
        out.push(token);
    }
    Ok(out)
}
