//! Botmeter credential vault
//!
//! **Security Invariant: credential plaintext is never logged or cached.**
//!
//! Per-tenant third-party credentials (provider auth tokens) are stored in
//! the relational store as ciphertext only and decrypted at resolution
//! time. Encryption is AES-256-GCM with a fresh random 96-bit nonce per
//! call; the wire format is `enc1:<base64(nonce || ciphertext)>` so a
//! stored value is self-describing and a format bump stays detectable.
//!
//! The symmetric key is process-wide, supplied via `ENCRYPTION_KEY`
//! (64 hex characters = 32 bytes). A missing or malformed key is a fatal
//! configuration error at startup, never a runtime fallback.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use rand::RngCore;
use thiserror::Error;

/// Nonce size for AES-256-GCM (12 bytes / 96 bits).
const NONCE_SIZE: usize = 12;

/// Prefix marking vault-encrypted values in the store.
const CIPHERTEXT_PREFIX: &str = "enc1:";

/// Environment variable holding the hex-encoded 256-bit key.
pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";

/// Vault errors
#[derive(Debug, Error)]
pub enum VaultError {
    /// Key missing or malformed. Fatal at startup.
    #[error("Encryption key configuration error: {0}")]
    Configuration(String),

    #[error("Encryption failed: {0}")]
    Encrypt(String),

    #[error("Decryption failed: {0}")]
    Decrypt(String),

    #[error("Ciphertext is not in the expected {CIPHERTEXT_PREFIX} format")]
    Malformed,
}

pub type VaultResult<T> = Result<T, VaultError>;

/// Symmetric credential vault, constructed once at process startup and
/// shared across the core via `Arc`.
pub struct CredentialVault {
    key: [u8; 32],
}

impl CredentialVault {
    /// Create a vault from raw key bytes.
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Load the key from `ENCRYPTION_KEY`.
    ///
    /// Absence or a wrong-length key is a hard configuration error; the
    /// process must refuse to start rather than run without credential
    /// encryption.
    pub fn from_env() -> VaultResult<Self> {
        let hex_key = std::env::var(ENCRYPTION_KEY_ENV).map_err(|_| {
            VaultError::Configuration(format!("{ENCRYPTION_KEY_ENV} must be set"))
        })?;
        Self::from_hex_key(&hex_key)
    }

    /// Parse a 64-character hex key.
    pub fn from_hex_key(hex_key: &str) -> VaultResult<Self> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| VaultError::Configuration(format!("key is not valid hex: {e}")))?;
        let key: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            VaultError::Configuration(format!("key must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self::new(key))
    }

    /// Generate a random key. Useful for provisioning and tests.
    pub fn generate_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Encrypt a credential, returning the prefixed base64 ciphertext.
    pub fn encrypt(&self, plaintext: &str) -> VaultResult<String> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| VaultError::Encrypt(format!("cipher init: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| VaultError::Encrypt(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        let encoded = base64::engine::general_purpose::STANDARD.encode(&combined);
        Ok(format!("{CIPHERTEXT_PREFIX}{encoded}"))
    }

    /// Decrypt a prefixed base64 ciphertext back to the credential.
    pub fn decrypt(&self, stored: &str) -> VaultResult<String> {
        let encoded = stored
            .strip_prefix(CIPHERTEXT_PREFIX)
            .ok_or(VaultError::Malformed)?;

        let combined = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| VaultError::Decrypt(format!("base64: {e}")))?;

        if combined.len() < NONCE_SIZE {
            return Err(VaultError::Decrypt("ciphertext too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| VaultError::Decrypt(format!("cipher init: {e}")))?;

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| VaultError::Decrypt(e.to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| VaultError::Decrypt(format!("invalid UTF-8: {e}")))
    }

    /// Whether a stored value carries the vault ciphertext prefix.
    pub fn is_encrypted(value: &str) -> bool {
        value.starts_with(CIPHERTEXT_PREFIX)
    }
}

impl std::fmt::Debug for CredentialVault {
    // Key bytes stay out of Debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> CredentialVault {
        CredentialVault::new(CredentialVault::generate_key())
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let vault = vault();
        let plaintext = "SKxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx";

        let encrypted = vault.encrypt(plaintext).unwrap();
        assert!(CredentialVault::is_encrypted(&encrypted));
        assert_ne!(encrypted, plaintext);

        assert_eq!(vault.decrypt(&encrypted).unwrap(), plaintext);
    }

    #[test]
    fn roundtrip_empty_string() {
        let vault = vault();
        let encrypted = vault.encrypt("").unwrap();
        assert_eq!(vault.decrypt(&encrypted).unwrap(), "");
    }

    #[test]
    fn roundtrip_delimiter_characters() {
        // Colons and base64 alphabet characters in the plaintext must not
        // confuse the prefixed wire format.
        let vault = vault();
        for plaintext in ["enc1:", "a:b:c==", "::::", "enc1:enc1:enc1"] {
            let encrypted = vault.encrypt(plaintext).unwrap();
            assert_eq!(vault.decrypt(&encrypted).unwrap(), plaintext);
        }
    }

    #[test]
    fn roundtrip_unicode() {
        let vault = vault();
        let plaintext = "رمز سري 🔐 token";
        let encrypted = vault.encrypt(plaintext).unwrap();
        assert_eq!(vault.decrypt(&encrypted).unwrap(), plaintext);
    }

    #[test]
    fn nonce_makes_ciphertext_nondeterministic() {
        let vault = vault();
        let a = vault.encrypt("same input").unwrap();
        let b = vault.encrypt("same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let a = vault();
        let b = vault();
        let encrypted = a.encrypt("secret").unwrap();
        assert!(b.decrypt(&encrypted).is_err());
    }

    #[test]
    fn missing_prefix_is_malformed() {
        let vault = vault();
        assert!(matches!(
            vault.decrypt("not-a-vault-value"),
            Err(VaultError::Malformed)
        ));
    }

    #[test]
    fn truncated_ciphertext_fails() {
        let vault = vault();
        // Shorter than the nonce.
        assert!(vault.decrypt("enc1:AQID").is_err());
    }

    #[test]
    fn hex_key_parsing() {
        let key = CredentialVault::generate_key();
        let vault = CredentialVault::from_hex_key(&hex::encode(key)).unwrap();
        let encrypted = vault.encrypt("x").unwrap();
        assert_eq!(vault.decrypt(&encrypted).unwrap(), "x");

        assert!(matches!(
            CredentialVault::from_hex_key("zzzz"),
            Err(VaultError::Configuration(_))
        ));
        assert!(matches!(
            CredentialVault::from_hex_key("abcd"),
            Err(VaultError::Configuration(_))
        ));
    }
}
