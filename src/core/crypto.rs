//! Envelope crypto engine.
//!
//! Two layers, matching the envelope model:
//!
//! - The shared symmetric content-key is wrapped per device with age
//!   (x25519, ASCII armor). One armored envelope per device.
//! - Secret file contents are encrypted with the content-key using
//!   XChaCha20-Poly1305 with a fresh random 24-byte nonce per call.
//!
//! Encrypted file layout: `knk1 || nonce(24) || ciphertext+tag`.

use std::io::{Read, Write};

use age::x25519;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use zeroize::Zeroizing;

use crate::core::constants::{CONTENT_KEY_LEN, FILE_MAGIC};
use crate::error::{CryptoError, Result};

const NONCE_LEN: usize = 24;

/// The project's shared symmetric content-key.
///
/// Wiped from memory on drop. Never leaves the process except wrapped
/// inside a per-device envelope.
pub struct ContentKey(Zeroizing<[u8; CONTENT_KEY_LEN]>);

impl ContentKey {
    /// Generate a fresh random content-key.
    pub fn generate() -> Self {
        let key = XChaCha20Poly1305::generate_key(&mut OsRng);
        let mut bytes = Zeroizing::new([0u8; CONTENT_KEY_LEN]);
        bytes.copy_from_slice(&key);
        Self(bytes)
    }

    /// Reconstruct a content-key from unwrapped envelope bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyDecryptFailed` if the length is wrong,
    /// which indicates a corrupt or foreign envelope.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != CONTENT_KEY_LEN {
            return Err(CryptoError::KeyDecryptFailed(format!(
                "unexpected key length {}",
                bytes.len()
            ))
            .into());
        }
        let mut out = Zeroizing::new([0u8; CONTENT_KEY_LEN]);
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    fn as_bytes(&self) -> &[u8; CONTENT_KEY_LEN] {
        &self.0
    }

    /// Constant-size comparison for tests and consistency checks.
    pub fn same_as(&self, other: &ContentKey) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// Generate a fresh device keypair.
pub fn generate_device_keypair() -> x25519::Identity {
    x25519::Identity::generate()
}

/// Parse a public key string into an age recipient.
///
/// # Errors
///
/// Returns `CryptoError::InvalidPublicKey` if the key format is invalid.
pub fn parse_recipient(key: &str) -> Result<x25519::Recipient> {
    key.trim()
        .parse::<x25519::Recipient>()
        .map_err(|_| CryptoError::InvalidPublicKey(key.trim().to_string()).into())
}

/// Parse a private key string into an age identity.
///
/// # Errors
///
/// Returns `CryptoError::InvalidPrivateKey` if the key format is invalid.
pub fn parse_identity(key: &str) -> Result<x25519::Identity> {
    key.trim()
        .parse::<x25519::Identity>()
        .map_err(|e: &str| CryptoError::InvalidPrivateKey(e.to_string()).into())
}

/// Wrap the content-key for one device, producing its armored envelope.
///
/// # Errors
///
/// Returns `CryptoError` if encryption or armoring fails.
pub fn wrap_key(key: &ContentKey, recipient: &x25519::Recipient) -> Result<String> {
    let encryptor =
        age::Encryptor::with_recipients(std::iter::once(recipient as &dyn age::Recipient))
            .map_err(|e| CryptoError::EncryptionFailed(format!("{}", e)))?;

    let mut encrypted = Vec::new();
    let mut writer = encryptor
        .wrap_output(age::armor::ArmoredWriter::wrap_output(
            &mut encrypted,
            age::armor::Format::AsciiArmor,
        )?)
        .map_err(|e| CryptoError::EncryptionFailed(format!("{}", e)))?;

    writer.write_all(key.as_bytes())?;
    let armored = writer
        .finish()
        .map_err(|e| CryptoError::EncryptionFailed(format!("{}", e)))?;
    armored
        .finish()
        .map_err(|e| CryptoError::ArmorFailed(format!("{}", e)))?;

    String::from_utf8(encrypted)
        .map_err(|e| CryptoError::EncryptionFailed(format!("UTF-8 error: {}", e)).into())
}

/// Unwrap a device envelope back into the content-key.
///
/// # Errors
///
/// Returns `CryptoError::KeyDecryptFailed` on corruption or when the
/// identity does not match the envelope.
pub fn unwrap_key(envelope: &str, identity: &x25519::Identity) -> Result<ContentKey> {
    let reader = age::armor::ArmoredReader::new(envelope.as_bytes());
    let decryptor = age::Decryptor::new(reader)
        .map_err(|e| CryptoError::KeyDecryptFailed(format!("{}", e)))?;

    let mut decrypted = Zeroizing::new(Vec::new());
    let mut reader = decryptor
        .decrypt(std::iter::once(identity as &dyn age::Identity))
        .map_err(|e| CryptoError::KeyDecryptFailed(format!("{}", e)))?;

    reader
        .read_to_end(&mut decrypted)
        .map_err(|e| CryptoError::KeyDecryptFailed(format!("{}", e)))?;

    ContentKey::from_bytes(&decrypted)
}

/// Encrypt plaintext under the content-key.
///
/// Non-deterministic: a fresh nonce is drawn per call, so re-encrypting
/// identical plaintext yields different ciphertext bytes.
///
/// # Errors
///
/// Returns `CryptoError::EncryptionFailed` if the AEAD rejects the input.
pub fn encrypt_content(key: &ContentKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(format!("{}", e)))?;

    let mut out = Vec::with_capacity(FILE_MAGIC.len() + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(FILE_MAGIC);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a secret file produced by [`encrypt_content`].
///
/// # Errors
///
/// Returns `CryptoError::DecryptFailed` on a missing header, tampered
/// ciphertext, or the wrong content-key.
pub fn decrypt_content(key: &ContentKey, data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if data.len() < FILE_MAGIC.len() + NONCE_LEN || &data[..FILE_MAGIC.len()] != FILE_MAGIC {
        return Err(CryptoError::DecryptFailed("missing kanuka header".to_string()).into());
    }

    let nonce = XNonce::from_slice(&data[FILE_MAGIC.len()..FILE_MAGIC.len() + NONCE_LEN]);
    let ciphertext = &data[FILE_MAGIC.len() + NONCE_LEN..];

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptFailed("ciphertext corrupt or wrong key".to_string()))?;

    Ok(Zeroizing::new(plaintext))
}
