use crate::error::{Result, TpkmError};
use crate::utils::{keccak256, Address};
use k256::ecdsa::{SigningKey, VerifyingKey};
use zeroize::Zeroizing;

/// A secp256k1 signing key with its derived Ethereum address
pub struct Signer {
    key: SigningKey,
    address: Address,
}

/// Recoverable ECDSA signature, ready for transaction assembly
#[derive(Debug, Clone)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

fn address_of(key: &VerifyingKey) -> Address {
    // keccak256 of the uncompressed public key without the 0x04 tag,
    // last 20 bytes
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Address(out)
}

impl Signer {
    pub fn random() -> Signer {
        let key = SigningKey::random(&mut rand::thread_rng());
        let address = address_of(key.verifying_key());
        Signer { key, address }
    }

    /// Build a signer from a raw 32-byte secret key
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Signer> {
        let key = SigningKey::from_slice(bytes)
            .map_err(|e| TpkmError::Validation(format!("invalid private key: {e}")))?;
        let address = address_of(key.verifying_key());
        Ok(Signer { key, address })
    }

    /// Parse a 64-hex-digit private key, `0x` prefix optional
    pub fn from_hex(private_key: &str) -> Result<Signer> {
        let hex_part = private_key
            .strip_prefix("0x")
            .or_else(|| private_key.strip_prefix("0X"))
            .unwrap_or(private_key);
        if hex_part.len() != 64 {
            return Err(TpkmError::Validation(
                "private key must be 32 bytes of hex".to_string(),
            ));
        }
        let bytes = Zeroizing::new(
            hex::decode(hex_part)
                .map_err(|e| TpkmError::Validation(format!("invalid private key hex: {e}")))?,
        );
        Self::from_secret_bytes(&bytes)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.key.to_bytes().to_vec())
    }

    /// Sign a 32-byte digest, returning the signature with its recovery id
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<RecoverableSignature> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|e| TpkmError::Unknown(format!("signing failed: {e}")))?;
        let (r_bytes, s_bytes) = signature.split_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(r_bytes.as_slice());
        s.copy_from_slice(s_bytes.as_slice());
        Ok(RecoverableSignature {
            r,
            s,
            recovery_id: recovery_id.to_byte(),
        })
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").field("address", &self.address).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The well-known test key used across Ethereum tooling
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDR: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn derives_known_address() {
        let signer = Signer::from_hex(TEST_KEY).unwrap();
        assert_eq!(signer.address().to_checksum(), TEST_ADDR);
    }

    #[test]
    fn hex_parsing_rules() {
        assert!(Signer::from_hex(TEST_KEY.strip_prefix("0x").unwrap()).is_ok());
        assert!(Signer::from_hex("0x1234").is_err());
        assert!(Signer::from_hex(&"g".repeat(64)).is_err());
        // Out-of-range scalar (all 0xff) is rejected by the curve
        assert!(Signer::from_hex(&"ff".repeat(32)).is_err());
    }

    #[test]
    fn random_signers_differ() {
        let a = Signer::random();
        let b = Signer::random();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn secret_roundtrip() {
        let a = Signer::random();
        let b = Signer::from_secret_bytes(&a.secret_bytes()).unwrap();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn signature_is_recoverable_shape() {
        let signer = Signer::from_hex(TEST_KEY).unwrap();
        let digest = crate::utils::keccak256(b"message");
        let sig = signer.sign_digest(&digest).unwrap();
        assert!(sig.recovery_id <= 1);
        assert_ne!(sig.r, [0u8; 32]);
        assert_ne!(sig.s, [0u8; 32]);
    }
}
