//! Legacy (EIP-155) transaction assembly and signing

use crate::error::Result;
use crate::utils::{keccak256, Address};
use crate::wallet::Signer;
use num_bigint::BigUint;

fn rlp_length_prefix(len: usize, offset: u8) -> Vec<u8> {
    if len < 56 {
        vec![offset + len as u8]
    } else {
        let len_bytes: Vec<u8> = len
            .to_be_bytes()
            .iter()
            .copied()
            .skip_while(|&b| b == 0)
            .collect();
        let mut out = vec![offset + 55 + len_bytes.len() as u8];
        out.extend(len_bytes);
        out
    }
}

/// RLP-encode a byte string
pub fn rlp_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }
    let mut out = rlp_length_prefix(data.len(), 0x80);
    out.extend_from_slice(data);
    out
}

/// RLP-encode a list of already-encoded items
pub fn rlp_list(encoded_items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = encoded_items.concat();
    let mut out = rlp_length_prefix(payload.len(), 0xc0);
    out.extend(payload);
    out
}

fn int_bytes(value: &BigUint) -> Vec<u8> {
    if *value == BigUint::from(0u8) {
        Vec::new()
    } else {
        value.to_bytes_be()
    }
}

fn rlp_uint(value: &BigUint) -> Vec<u8> {
    rlp_bytes(&int_bytes(value))
}

fn rlp_u64(value: u64) -> Vec<u8> {
    rlp_uint(&BigUint::from(value))
}

/// Pre-EIP-1559 transaction, the lowest common denominator every dev chain
/// accepts
#[derive(Debug, Clone)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: BigUint,
    pub gas_limit: u64,
    pub to: Address,
    pub value: BigUint,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    fn body_items(&self) -> Vec<Vec<u8>> {
        vec![
            rlp_u64(self.nonce),
            rlp_uint(&self.gas_price),
            rlp_u64(self.gas_limit),
            rlp_bytes(self.to.as_bytes()),
            rlp_uint(&self.value),
            rlp_bytes(&self.data),
        ]
    }

    /// The EIP-155 signing hash: keccak of the body with (chainId, 0, 0)
    /// appended
    pub fn sighash(&self, chain_id: u64) -> [u8; 32] {
        let mut items = self.body_items();
        items.push(rlp_u64(chain_id));
        items.push(rlp_bytes(&[]));
        items.push(rlp_bytes(&[]));
        keccak256(&rlp_list(&items))
    }

    /// Sign and serialize to raw bytes for `eth_sendRawTransaction`
    pub fn sign(&self, chain_id: u64, signer: &Signer) -> Result<Vec<u8>> {
        let digest = self.sighash(chain_id);
        let sig = signer.sign_digest(&digest)?;
        let v = chain_id * 2 + 35 + u64::from(sig.recovery_id);

        let mut items = self.body_items();
        items.push(rlp_u64(v));
        items.push(rlp_uint(&BigUint::from_bytes_be(&sig.r)));
        items.push(rlp_uint(&BigUint::from_bytes_be(&sig.s)));
        Ok(rlp_list(&items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rlp_primitives() {
        assert_eq!(rlp_bytes(b""), vec![0x80]);
        assert_eq!(rlp_bytes(&[0x7f]), vec![0x7f]);
        assert_eq!(rlp_bytes(&[0x80]), vec![0x81, 0x80]);
        assert_eq!(rlp_bytes(b"dog"), vec![0x83, b'd', b'o', b'g']);
        assert_eq!(rlp_list(&[]), vec![0xc0]);
        assert_eq!(
            rlp_list(&[rlp_bytes(b"cat"), rlp_bytes(b"dog")]),
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
        // 56-byte payload needs a long-form prefix
        let long = vec![0u8; 56];
        let encoded = rlp_bytes(&long);
        assert_eq!(&encoded[..2], &[0xb8, 56]);
    }

    #[test]
    fn eip155_reference_vector() {
        // The worked example from the EIP-155 specification
        let tx = LegacyTransaction {
            nonce: 9,
            gas_price: BigUint::from(20_000_000_000u64),
            gas_limit: 21_000,
            to: "0x3535353535353535353535353535353535353535".parse().unwrap(),
            value: BigUint::from(10u64).pow(18),
            data: vec![],
        };
        assert_eq!(
            hex::encode(tx.sighash(1)),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );

        let signer = Signer::from_hex(
            "0x4646464646464646464646464646464646464646464646464646464646464646",
        )
        .unwrap();
        let raw = tx.sign(1, &signer).unwrap();
        assert_eq!(
            hex::encode(raw),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880\
             de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e\
             1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb\
             1966a3b6d83"
        );
    }

    #[test]
    fn sighash_depends_on_chain_id() {
        let tx = LegacyTransaction {
            nonce: 0,
            gas_price: BigUint::from(1u8),
            gas_limit: 21_000,
            to: Address::ZERO,
            value: BigUint::from(0u8),
            data: vec![],
        };
        assert_ne!(tx.sighash(1), tx.sighash(31337));
    }
}
