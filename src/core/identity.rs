//! Device identity (private key) management.
//!
//! The private half of a device keypair lives only on the owning machine,
//! under `~/.kanuka/keys/<project-uuid>/<device-uuid>.key` (0600 on Unix).
//! It is never written inside the project tree and never transmitted.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use age::x25519;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::constants;
use crate::core::crypto;
use crate::error::{Result, StoreError};

/// A device's private key, bound to one project on this machine.
pub struct DeviceIdentity {
    inner: x25519::Identity,
    path: Option<PathBuf>,
}

impl DeviceIdentity {
    /// Directory holding this machine's private keys for a project.
    pub fn key_dir(project: &Uuid) -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            StoreError::WriteFailed(std::io::Error::other("unable to determine home directory"))
        })?;
        Ok(home.join(constants::KEY_DIR).join(project.to_string()))
    }

    /// Private key path for one device of one project.
    pub fn key_path(project: &Uuid, device: &Uuid) -> Result<PathBuf> {
        Ok(Self::key_dir(project)?.join(format!("{}.key", device)))
    }

    /// Whether a private key exists locally for this device.
    pub fn exists(project: &Uuid, device: &Uuid) -> bool {
        Self::key_path(project, device)
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    /// Generate a new identity and persist it for this machine.
    pub fn generate(project: &Uuid, device: &Uuid) -> Result<Self> {
        let dir = Self::key_dir(project)?;
        debug!(path = %dir.display(), "generating device identity");

        let inner = crypto::generate_device_keypair();

        fs::create_dir_all(&dir).map_err(StoreError::WriteFailed)?;
        let key_path = dir.join(format!("{}.key", device));

        // Write identity using Display trait (outputs AGE-SECRET-KEY-...)
        use age::secrecy::ExposeSecret;
        let secret_str = inner.to_string();
        fs::write(&key_path, format!("{}\n", secret_str.expose_secret()))
            .map_err(StoreError::WriteFailed)?;

        // Restrict permissions on key file (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&key_path, fs::Permissions::from_mode(0o600))
                .map_err(StoreError::WriteFailed)?;
        }

        debug!(path = %key_path.display(), "device identity saved");

        Ok(Self {
            inner,
            path: Some(key_path),
        })
    }

    /// Generate an identity that is never written to disk.
    ///
    /// Used by `ci-init`: the caller is responsible for displaying the
    /// secret exactly once.
    pub fn ephemeral() -> Self {
        Self {
            inner: crypto::generate_device_keypair(),
            path: None,
        }
    }

    /// Load this machine's private key for a device.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoPrivateKey` when the key file is missing,
    /// or `StoreError::InvalidKeyFormat` when it doesn't parse.
    pub fn load(project: &Uuid, device: &Uuid) -> Result<Self> {
        let key_path = Self::key_path(project, device)?;
        debug!(path = %key_path.display(), "loading device identity");

        if !key_path.exists() {
            return Err(StoreError::NoPrivateKey(key_path.display().to_string()).into());
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = fs::metadata(&key_path) {
                let mode = metadata.permissions().mode() & 0o777;
                if mode != 0o600 {
                    warn!(
                        path = %key_path.display(),
                        mode = %format!("{:o}", mode),
                        "insecure key file permissions"
                    );
                }
            }
        }

        let contents = fs::read_to_string(&key_path).map_err(StoreError::ReadFailed)?;
        let inner: x25519::Identity = contents
            .trim()
            .parse()
            .map_err(|e: &str| StoreError::InvalidKeyFormat(e.to_string()))?;

        Ok(Self {
            inner,
            path: Some(key_path),
        })
    }

    /// Parse an identity from a reader (pipe or stream), for automation
    /// contexts where no key file exists on disk.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut contents = String::new();
        reader
            .read_to_string(&mut contents)
            .map_err(StoreError::ReadFailed)?;
        let inner = crypto::parse_identity(&contents)?;
        Ok(Self { inner, path: None })
    }

    /// Corresponding public key string (starts with "age1...").
    pub fn public_key(&self) -> String {
        self.inner.to_public().to_string()
    }

    /// The secret key string, for one-time display only.
    pub fn secret_string(&self) -> String {
        use age::secrecy::ExposeSecret;
        self.inner.to_string().expose_secret().to_string()
    }

    /// Reference to the inner age identity for unwrapping envelopes.
    pub fn as_age(&self) -> &x25519::Identity {
        &self.inner
    }

    /// Key file path, if this identity is persisted.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Remove the private key file for a device, if present.
    pub fn delete(project: &Uuid, device: &Uuid) -> Result<()> {
        let key_path = Self::key_path(project, device)?;
        if key_path.exists() {
            debug!(path = %key_path.display(), "deleting device identity");
            fs::remove_file(&key_path).map_err(StoreError::WriteFailed)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("path", &self.path)
            .field("public_key", &self.public_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // HOME is process-global; tests that touch it run in one test to
    // avoid cross-test interference.
    #[test]
    fn ephemeral_identity_is_not_persisted() {
        let identity = DeviceIdentity::ephemeral();
        assert!(identity.path().is_none());
        assert!(identity.public_key().starts_with("age1"));
        assert!(identity.secret_string().starts_with("AGE-SECRET-KEY-"));
    }

    #[test]
    fn from_reader_parses_a_piped_key() {
        let source = DeviceIdentity::ephemeral();
        let piped = format!("{}\n", source.secret_string());

        let parsed = DeviceIdentity::from_reader(piped.as_bytes()).unwrap();
        assert_eq!(parsed.public_key(), source.public_key());
    }

    #[test]
    fn from_reader_rejects_garbage() {
        let err = DeviceIdentity::from_reader("not a key".as_bytes()).unwrap_err();
        assert!(matches!(err, crate::error::Error::Crypto(_)));
    }
}
