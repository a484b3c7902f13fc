//! On-disk key store.
//!
//! Owns the fixed project layout for committed key material:
//! `public_keys/<uuid>.pub` and `secrets/<uuid>.kanuka` (the per-device
//! content-key envelopes). All operations are single-file reads, writes
//! and deletes; files whose names are not a UUID with the expected
//! extension are ignored by the listings.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::core::constants;
use crate::error::{Result, StoreError};

/// Access to a project's committed key material.
#[derive(Debug, Clone)]
pub struct KeyStore {
    public_keys: PathBuf,
    secrets: PathBuf,
}

impl KeyStore {
    /// Key store rooted at a project's `.kanuka` directory.
    pub fn new(kanuka_dir: &Path) -> Self {
        Self {
            public_keys: kanuka_dir.join(constants::PUBLIC_KEYS_DIR),
            secrets: kanuka_dir.join(constants::SECRETS_DIR),
        }
    }

    /// Create both directories if missing.
    pub fn ensure_layout(&self) -> Result<()> {
        fs::create_dir_all(&self.public_keys).map_err(StoreError::WriteFailed)?;
        fs::create_dir_all(&self.secrets).map_err(StoreError::WriteFailed)?;
        Ok(())
    }

    /// Path of a device's committed public key.
    pub fn public_key_path(&self, uuid: &Uuid) -> PathBuf {
        self.public_keys
            .join(format!("{}.{}", uuid, constants::PUBKEY_EXT))
    }

    /// Path of a device's content-key envelope.
    pub fn envelope_path(&self, uuid: &Uuid) -> PathBuf {
        self.secrets
            .join(format!("{}.{}", uuid, constants::SECRET_EXT))
    }

    pub fn has_public_key(&self, uuid: &Uuid) -> bool {
        self.public_key_path(uuid).exists()
    }

    pub fn has_envelope(&self, uuid: &Uuid) -> bool {
        self.envelope_path(uuid).exists()
    }

    /// Write a device's public key.
    pub fn put_public_key(&self, uuid: &Uuid, key: &str) -> Result<()> {
        let path = self.public_key_path(uuid);
        debug!(path = %path.display(), "writing public key");
        fs::write(&path, format!("{}\n", key.trim())).map_err(StoreError::WriteFailed)?;
        Ok(())
    }

    /// Read a device's public key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::PublicKeyNotFound` when the file is absent.
    pub fn get_public_key(&self, uuid: &Uuid) -> Result<String> {
        let path = self.public_key_path(uuid);
        if !path.exists() {
            return Err(StoreError::PublicKeyNotFound(uuid.to_string()).into());
        }
        let contents = fs::read_to_string(&path).map_err(StoreError::ReadFailed)?;
        Ok(contents.trim().to_string())
    }

    /// Delete a device's public key, if present.
    pub fn delete_public_key(&self, uuid: &Uuid) -> Result<()> {
        let path = self.public_key_path(uuid);
        if path.exists() {
            debug!(path = %path.display(), "deleting public key");
            fs::remove_file(&path).map_err(StoreError::WriteFailed)?;
        }
        Ok(())
    }

    /// Write a device's content-key envelope.
    pub fn put_envelope(&self, uuid: &Uuid, armored: &str) -> Result<()> {
        let path = self.envelope_path(uuid);
        debug!(path = %path.display(), "writing envelope");
        fs::write(&path, armored).map_err(StoreError::WriteFailed)?;
        Ok(())
    }

    /// Read a device's content-key envelope.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::EnvelopeNotFound` when the file is absent.
    pub fn get_envelope(&self, uuid: &Uuid) -> Result<String> {
        let path = self.envelope_path(uuid);
        if !path.exists() {
            return Err(StoreError::EnvelopeNotFound(uuid.to_string()).into());
        }
        fs::read_to_string(&path)
            .map_err(StoreError::ReadFailed)
            .map_err(Into::into)
    }

    /// Delete a device's envelope, if present.
    pub fn delete_envelope(&self, uuid: &Uuid) -> Result<()> {
        let path = self.envelope_path(uuid);
        if path.exists() {
            debug!(path = %path.display(), "deleting envelope");
            fs::remove_file(&path).map_err(StoreError::WriteFailed)?;
        }
        Ok(())
    }

    /// UUIDs with a committed public key, sorted.
    pub fn list_public_key_uuids(&self) -> Result<Vec<Uuid>> {
        Self::list_uuids(&self.public_keys, constants::PUBKEY_EXT)
    }

    /// UUIDs with a content-key envelope, sorted.
    pub fn list_envelope_uuids(&self) -> Result<Vec<Uuid>> {
        Self::list_uuids(&self.secrets, constants::SECRET_EXT)
    }

    fn list_uuids(dir: &Path, ext: &str) -> Result<Vec<Uuid>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut uuids = Vec::new();
        for entry in fs::read_dir(dir).map_err(StoreError::ReadFailed)? {
            let entry = entry.map_err(StoreError::ReadFailed)?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(uuid) = Uuid::parse_str(stem) {
                uuids.push(uuid);
            }
        }
        uuids.sort();
        Ok(uuids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, KeyStore) {
        let tmp = TempDir::new().unwrap();
        let store = KeyStore::new(tmp.path());
        store.ensure_layout().unwrap();
        (tmp, store)
    }

    #[test]
    fn put_get_delete_public_key() {
        let (_tmp, store) = store();
        let uuid = Uuid::new_v4();

        store.put_public_key(&uuid, "age1example").unwrap();
        assert_eq!(store.get_public_key(&uuid).unwrap(), "age1example");

        store.delete_public_key(&uuid).unwrap();
        let err = store.get_public_key(&uuid).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Store(StoreError::PublicKeyNotFound(_))
        ));
    }

    #[test]
    fn envelope_not_found_is_distinct() {
        let (_tmp, store) = store();
        let err = store.get_envelope(&Uuid::new_v4()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Store(StoreError::EnvelopeNotFound(_))
        ));
    }

    #[test]
    fn listings_ignore_foreign_files() {
        let (tmp, store) = store();
        let uuid = Uuid::new_v4();
        store.put_public_key(&uuid, "age1example").unwrap();
        store.put_envelope(&uuid, "armored").unwrap();

        // Files that are not <uuid>.<ext> must not appear in the listings.
        std::fs::write(tmp.path().join("public_keys/README.md"), "docs").unwrap();
        std::fs::write(tmp.path().join("secrets/not-a-uuid.kanuka"), "x").unwrap();
        std::fs::write(tmp.path().join("secrets").join(format!("{}.bak", uuid)), "x").unwrap();

        assert_eq!(store.list_public_key_uuids().unwrap(), vec![uuid]);
        assert_eq!(store.list_envelope_uuids().unwrap(), vec![uuid]);
    }

    #[test]
    fn delete_missing_is_a_no_op() {
        let (_tmp, store) = store();
        store.delete_public_key(&Uuid::new_v4()).unwrap();
        store.delete_envelope(&Uuid::new_v4()).unwrap();
    }
}
