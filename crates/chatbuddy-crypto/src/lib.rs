//! ChatBuddy Crypto - at-rest encryption for the profile document.
//!
//! Provides AES-256-GCM authenticated encryption with a single long-lived
//! symmetric key:
//! - The key is 256 bits of OS randomness, generated once per deployment
//! - Every encryption gets a fresh random nonce (no reuse)
//! - Ciphertext is authenticated, so a wrong key, a truncated file or a
//!   flipped bit all fail to decrypt instead of yielding garbage
//! - Key material implements `Zeroize` for automatic memory cleanup

#![forbid(unsafe_code)]

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a profile key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of a GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Current envelope format version.
pub const FORMAT_VERSION: u8 = 1;

/// Error types for crypto operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Encryption failed
    EncryptionFailed,
    /// Decryption failed (wrong key, tampered data, or invalid nonce)
    DecryptionFailed,
    /// Invalid data format
    InvalidFormat(String),
}

impl std::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EncryptionFailed => write!(f, "encryption failed"),
            Self::DecryptionFailed => write!(f, "decryption failed"),
            Self::InvalidFormat(msg) => write!(f, "invalid format: {}", msg),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;

/// A 256-bit symmetric key for the profile document.
///
/// Zeroized on drop. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ProfileKey {
    bytes: [u8; KEY_LEN],
}

impl ProfileKey {
    /// Generate a new random key from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Build a key from raw bytes read off disk.
    ///
    /// Fails with [`CryptoError::InvalidFormat`] unless exactly
    /// [`KEY_LEN`] bytes are supplied.
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        if raw.len() != KEY_LEN {
            return Err(CryptoError::InvalidFormat(format!(
                "expected {} key bytes, found {}",
                KEY_LEN,
                raw.len()
            )));
        }
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(raw);
        Ok(Self { bytes })
    }

    /// Raw key material, for persisting to the key file.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for ProfileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Encrypted data bundle.
///
/// Contains everything needed to decrypt (except the key):
/// version, nonce, and ciphertext with GCM auth tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    /// Format version (currently 1)
    pub version: u8,
    /// 12-byte nonce (GCM standard)
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext including GCM authentication tag (16 bytes appended)
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Encode as the on-disk envelope: `version || nonce || ciphertext`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + NONCE_LEN + self.ciphertext.len());
        out.push(self.version);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Decode the on-disk envelope produced by [`EncryptedData::to_bytes`].
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        // version byte + nonce + at least the 16-byte tag
        if raw.len() < 1 + NONCE_LEN + 16 {
            return Err(CryptoError::InvalidFormat(format!(
                "envelope too short: {} bytes",
                raw.len()
            )));
        }
        let (version, rest) = raw.split_at(1);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);
        Ok(Self {
            version: version[0],
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Document cipher using AES-256-GCM.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ProfileCipher {
    key: [u8; KEY_LEN],
}

impl ProfileCipher {
    /// Create a cipher from a profile key.
    #[must_use]
    pub fn new(key: &ProfileKey) -> Self {
        Self { key: key.bytes }
    }

    /// Create a cipher from a raw 256-bit key.
    #[must_use]
    pub fn from_key(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Encrypt plaintext with a fresh random nonce.
    ///
    /// Each call generates a unique nonce, so encrypting the same plaintext
    /// twice produces different ciphertext.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedData> {
        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::EncryptionFailed)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok(EncryptedData {
            version: FORMAT_VERSION,
            nonce: nonce_bytes,
            ciphertext,
        })
    }

    /// Decrypt an encrypted data bundle.
    pub fn decrypt(&self, data: &EncryptedData) -> Result<Vec<u8>> {
        if data.version != FORMAT_VERSION {
            return Err(CryptoError::InvalidFormat(format!(
                "unsupported version: {}",
                data.version
            )));
        }

        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::DecryptionFailed)?;
        let nonce = Nonce::from_slice(&data.nonce);

        cipher
            .decrypt(nonce, data.ciphertext.as_ref())
            .map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Encrypt straight to the on-disk envelope.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(self.encrypt(plaintext)?.to_bytes())
    }

    /// Decode an on-disk envelope and decrypt it.
    pub fn open(&self, envelope: &[u8]) -> Result<Vec<u8>> {
        let data = EncryptedData::from_bytes(envelope)?;
        self.decrypt(&data)
    }
}

impl std::fmt::Debug for ProfileCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = ProfileCipher::from_key([42u8; 32]);

        let plaintext = br#"{"alice":{"name":"Alice","interests":"chess"}}"#;
        let encrypted = cipher.encrypt(plaintext).unwrap();

        assert_eq!(encrypted.version, FORMAT_VERSION);
        assert_ne!(&encrypted.ciphertext[..], &plaintext[..]);

        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert_eq!(&decrypted, plaintext);
    }

    #[test]
    fn test_different_nonces() {
        let cipher = ProfileCipher::from_key([42u8; 32]);
        let plaintext = b"same document";

        let enc1 = cipher.encrypt(plaintext).unwrap();
        let enc2 = cipher.encrypt(plaintext).unwrap();

        assert_ne!(enc1.nonce, enc2.nonce);
        assert_ne!(enc1.ciphertext, enc2.ciphertext);

        assert_eq!(cipher.decrypt(&enc1).unwrap(), plaintext);
        assert_eq!(cipher.decrypt(&enc2).unwrap(), plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let cipher1 = ProfileCipher::new(&ProfileKey::generate());
        let cipher2 = ProfileCipher::new(&ProfileKey::generate());

        let sealed = cipher1.seal(b"secret").unwrap();

        // GCM authentication rejects the other key
        assert_eq!(cipher2.open(&sealed), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn test_tampered_data_fails() {
        let cipher = ProfileCipher::from_key([42u8; 32]);
        let mut sealed = cipher.seal(b"original").unwrap();

        if let Some(byte) = sealed.last_mut() {
            *byte ^= 0xFF;
        }

        assert_eq!(cipher.open(&sealed), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn test_truncated_envelope() {
        let cipher = ProfileCipher::from_key([7u8; 32]);
        let sealed = cipher.seal(b"a longer document body").unwrap();

        // Header only
        let result = cipher.open(&sealed[..10]);
        assert!(matches!(result, Err(CryptoError::InvalidFormat(_))));

        // Cut inside the ciphertext
        let result = cipher.open(&sealed[..sealed.len() - 3]);
        assert_eq!(result, Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn test_envelope_layout() {
        let cipher = ProfileCipher::from_key([1u8; 32]);
        let encrypted = cipher.encrypt(b"xyz").unwrap();
        let bytes = encrypted.to_bytes();

        assert_eq!(bytes[0], FORMAT_VERSION);
        assert_eq!(&bytes[1..1 + NONCE_LEN], &encrypted.nonce);
        // 3 bytes of plaintext + 16-byte tag
        assert_eq!(bytes.len(), 1 + NONCE_LEN + 3 + 16);
        assert_eq!(EncryptedData::from_bytes(&bytes).unwrap(), encrypted);
    }

    #[test]
    fn test_empty_plaintext() {
        let cipher = ProfileCipher::from_key([42u8; 32]);
        let sealed = cipher.seal(b"").unwrap();
        assert!(cipher.open(&sealed).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_version() {
        let cipher = ProfileCipher::from_key([42u8; 32]);
        let data = EncryptedData {
            version: 99,
            nonce: [0u8; 12],
            ciphertext: vec![1, 2, 3],
        };
        let result = cipher.decrypt(&data);
        assert!(matches!(result, Err(CryptoError::InvalidFormat(_))));
    }

    #[test]
    fn test_key_from_slice() {
        let key = ProfileKey::generate();
        let restored = ProfileKey::from_slice(key.as_bytes()).unwrap();
        assert_eq!(key, restored);

        assert!(matches!(
            ProfileKey::from_slice(&[0u8; 16]),
            Err(CryptoError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let cipher = ProfileCipher::from_key([42u8; 32]);
        let encrypted = cipher.encrypt(b"test").unwrap();

        let json = serde_json::to_string(&encrypted).unwrap();
        let parsed: EncryptedData = serde_json::from_str(&json).unwrap();

        assert_eq!(cipher.decrypt(&parsed).unwrap(), b"test");
    }

    #[test]
    fn test_debug_redacts_key() {
        let cipher = ProfileCipher::from_key([42u8; 32]);
        let debug = format!("{:?}", cipher);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("42"));

        let key = ProfileKey::from_slice(&[9u8; 32]).unwrap();
        assert!(!format!("{:?}", key).contains('9'));
    }
}
