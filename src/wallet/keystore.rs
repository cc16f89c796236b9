//! Encrypted keystore file
//!
//! JSON file at `~/.tacopkm/keystore.json` with a plaintext `address` field
//! and a `crypto` section: Argon2id-derived key, AES-256-GCM ciphertext.
//! A wrong password surfaces as the AEAD authentication failure.

use crate::error::{Result, TpkmError};
use crate::utils::Address;
use crate::wallet::Signer;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

pub const KEYSTORE_FILE: &str = "keystore.json";

const KEYSTORE_VERSION: u32 = 3;
const CIPHER_NAME: &str = "aes-256-gcm";
const KDF_NAME: &str = "argon2id";

#[derive(Debug, Serialize, Deserialize)]
struct CryptoSection {
    cipher: String,
    ciphertext: String,
    nonce: String,
    kdf: String,
    salt: String,
    m_cost: u32,
    t_cost: u32,
    p_cost: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct KeystoreFile {
    version: u32,
    address: String,
    crypto: CryptoSection,
}

/// Keystore bound to its file path
#[derive(Debug)]
pub struct Keystore {
    path: PathBuf,
}

fn derive_key(password: &str, salt: &[u8], m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Zeroizing<[u8; 32]>> {
    let params = Params::new(m_cost, t_cost, p_cost, Some(32))
        .map_err(|e| TpkmError::Unknown(format!("invalid Argon2 parameters: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password.as_bytes(), salt, key.as_mut())
        .map_err(|e| TpkmError::Unknown(format!("key derivation failed: {e}")))?;
    Ok(key)
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

impl Keystore {
    const M_COST: u32 = 65536;
    const T_COST: u32 = 3;
    const P_COST: u32 = 1;

    pub fn at(path: PathBuf) -> Keystore {
        Keystore { path }
    }

    pub fn open_default() -> Result<Keystore> {
        let dir = crate::config::config_dir()
            .ok_or_else(|| TpkmError::Config("cannot determine home directory".to_string()))?;
        Ok(Keystore::at(dir.join(KEYSTORE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create a keystore around a fresh random key. Overwrites whatever is
    /// at the path; callers confirm before clobbering an existing file.
    pub fn create(&self, password: &str) -> Result<Address> {
        let signer = Signer::random();
        self.write(&signer, password)?;
        Ok(signer.address())
    }

    /// Import an existing private key
    pub fn import(&self, private_key: &str, password: &str) -> Result<Address> {
        let signer = Signer::from_hex(private_key)?;
        self.write(&signer, password)?;
        Ok(signer.address())
    }

    fn write(&self, signer: &Signer, password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(TpkmError::Auth("password must not be empty".to_string()));
        }
        let salt = random_bytes(32);
        let nonce = random_bytes(12);
        let key = derive_key(password, &salt, Self::M_COST, Self::T_COST, Self::P_COST)?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_ref()));
        let secret = signer.secret_bytes();
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), secret.as_slice())
            .map_err(|e| TpkmError::Unknown(format!("encryption failed: {e}")))?;

        let file = KeystoreFile {
            version: KEYSTORE_VERSION,
            address: signer.address().to_checksum(),
            crypto: CryptoSection {
                cipher: CIPHER_NAME.to_string(),
                ciphertext: hex::encode(ciphertext),
                nonce: hex::encode(nonce),
                kdf: KDF_NAME.to_string(),
                salt: hex::encode(salt),
                m_cost: Self::M_COST,
                t_cost: Self::T_COST,
                p_cost: Self::P_COST,
            },
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut contents = serde_json::to_string_pretty(&file)
            .map_err(|e| TpkmError::Unknown(format!("cannot serialize keystore: {e}")))?;
        contents.push('\n');
        fs::write(&self.path, contents)?;
        log::info!("Wrote keystore for {} to {}", file.address, self.path.display());
        Ok(())
    }

    fn read_file(&self) -> Result<KeystoreFile> {
        if !self.exists() {
            return Err(TpkmError::KeystoreMissing(self.path.display().to_string()));
        }
        let contents = fs::read_to_string(&self.path)?;
        serde_json::from_str(&contents)
            .map_err(|e| TpkmError::KeystoreCorrupt(format!("{}: {e}", self.path.display())))
    }

    /// Read the address field only; never needs a password
    pub fn address_without_decrypt(&self) -> Result<Address> {
        let file = self.read_file()?;
        file.address
            .parse()
            .map_err(|_| TpkmError::KeystoreCorrupt(format!("bad address field {:?}", file.address)))
    }

    /// Decrypt the private key and return a signer
    pub fn decrypt(&self, password: &str) -> Result<Signer> {
        if password.is_empty() {
            return Err(TpkmError::Auth("password must not be empty".to_string()));
        }
        let file = self.read_file()?;
        if file.crypto.cipher != CIPHER_NAME || file.crypto.kdf != KDF_NAME {
            return Err(TpkmError::KeystoreCorrupt(format!(
                "unsupported cipher {:?} / kdf {:?}",
                file.crypto.cipher, file.crypto.kdf
            )));
        }
        let salt = hex::decode(&file.crypto.salt)
            .map_err(|e| TpkmError::KeystoreCorrupt(format!("bad salt: {e}")))?;
        let nonce = hex::decode(&file.crypto.nonce)
            .map_err(|e| TpkmError::KeystoreCorrupt(format!("bad nonce: {e}")))?;
        let ciphertext = hex::decode(&file.crypto.ciphertext)
            .map_err(|e| TpkmError::KeystoreCorrupt(format!("bad ciphertext: {e}")))?;

        let key = derive_key(
            password,
            &salt,
            file.crypto.m_cost,
            file.crypto.t_cost,
            file.crypto.p_cost,
        )?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_ref()));
        let secret = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
                .map_err(|_| TpkmError::Auth("incorrect wallet password".to_string()))?,
        );
        Signer::from_secret_bytes(&secret)
    }
}
