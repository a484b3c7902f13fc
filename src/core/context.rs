//! Execution context.
//!
//! An immutable value constructed once per invocation and threaded into
//! every lifecycle operation: project root, derived `.kanuka` paths, the
//! user config, and actor resolution. There is no process-global state,
//! so operations (and their tests) can run against independent contexts
//! in parallel.

use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::core::config::{Registry, UserConfig};
use crate::core::constants;
use crate::core::crypto::{self, ContentKey};
use crate::core::identity::DeviceIdentity;
use crate::core::keystore::KeyStore;
use crate::error::{AccessError, ConfigError, Error, Result, StoreError};

/// Per-invocation execution context.
pub struct Ctx {
    root: PathBuf,
    user: Option<UserConfig>,
}

impl Ctx {
    /// Discover the project by walking up from the current directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotInitialized` when no ancestor contains a
    /// `.kanuka` directory.
    pub fn discover() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::discover_from(&cwd)
    }

    /// Discover the project by walking up from `start`.
    pub fn discover_from(start: &Path) -> Result<Self> {
        let mut dir = start;
        loop {
            if dir.join(constants::KANUKA_DIR).is_dir() {
                debug!(root = %dir.display(), "found project root");
                return Ok(Self {
                    root: dir.to_path_buf(),
                    user: UserConfig::load().ok(),
                });
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => return Err(ConfigError::NotInitialized.into()),
            }
        }
    }

    /// Context for a directory that is not yet a project (`init` only).
    pub fn uninitialized(root: &Path, user: UserConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            user: Some(user),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kanuka_dir(&self) -> PathBuf {
        self.root.join(constants::KANUKA_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.kanuka_dir().join(constants::CONFIG_FILE)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.kanuka_dir().join(constants::AUDIT_FILE)
    }

    /// Key store for this project.
    pub fn keystore(&self) -> KeyStore {
        KeyStore::new(&self.kanuka_dir())
    }

    /// Load the project registry.
    pub fn registry(&self) -> Result<Registry> {
        Registry::load(&self.config_path())
    }

    /// The user config, which must exist for identity-bearing operations.
    pub fn user(&self) -> Result<&UserConfig> {
        self.user.as_ref().ok_or_else(|| ConfigError::MissingUser.into())
    }

    /// Acting user's email.
    pub fn actor_email(&self) -> Result<&str> {
        Ok(self.user()?.user.email.as_str())
    }

    /// Resolve the acting device for this machine.
    ///
    /// Candidates are the registry devices owned by the user's email; among
    /// those, a device whose private key exists locally wins, with the
    /// configured device-name preference breaking ties.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::NoAccess` when no owned device has a local
    /// private key.
    pub fn actor_device(&self, registry: &Registry) -> Result<Uuid> {
        let user = self.user()?;
        let owned = registry.devices_for_email(&user.user.email);
        let project = registry.project.uuid;

        let mut local: Vec<(Uuid, &str)> = owned
            .iter()
            .filter(|(uuid, _)| DeviceIdentity::exists(&project, uuid))
            .map(|(uuid, record)| (*uuid, record.name.as_str()))
            .collect();

        if local.is_empty() {
            return Err(AccessError::NoAccess.into());
        }
        if local.len() > 1 {
            let preferred = user.device_name_for(&project);
            if let Some(pos) = local.iter().position(|(_, name)| *name == preferred) {
                return Ok(local.swap_remove(pos).0);
            }
        }
        Ok(local[0].0)
    }

    /// Load the acting device's identity.
    pub fn actor_identity(&self, registry: &Registry) -> Result<(Uuid, DeviceIdentity)> {
        let device = self.actor_device(registry)?;
        let identity = DeviceIdentity::load(&registry.project.uuid, &device)?;
        Ok((device, identity))
    }

    /// Unwrap the current content-key as the acting device.
    ///
    /// With `identity_override` (a key read from a pipe), the device is
    /// found by matching the identity's public key against the committed
    /// public keys instead of consulting the registry.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::NoAccess` when the actor has no envelope, or
    /// `CryptoError::KeyDecryptFailed` when the envelope doesn't match
    /// the private key.
    pub fn unwrap_content_key(
        &self,
        registry: &Registry,
        identity_override: Option<&DeviceIdentity>,
    ) -> Result<ContentKey> {
        let keystore = self.keystore();
        let envelope_for = |device: &Uuid| {
            keystore.get_envelope(device).map_err(|e| match e {
                Error::Store(StoreError::EnvelopeNotFound(_)) => AccessError::NoAccess.into(),
                other => other,
            })
        };

        match identity_override {
            Some(identity) => {
                let device = self.device_for_public_key(&identity.public_key())?;
                crypto::unwrap_key(&envelope_for(&device)?, identity.as_age())
            }
            None => {
                let (device, identity) = self.actor_identity(registry)?;
                crypto::unwrap_key(&envelope_for(&device)?, identity.as_age())
            }
        }
    }

    /// Find the device UUID whose committed public key matches.
    fn device_for_public_key(&self, public_key: &str) -> Result<Uuid> {
        let keystore = self.keystore();
        for uuid in keystore.list_public_key_uuids()? {
            if keystore.get_public_key(&uuid)? == public_key {
                return Ok(uuid);
            }
        }
        Err(AccessError::NoAccess.into())
    }
}

impl std::fmt::Debug for Ctx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ctx")
            .field("root", &self.root)
            .field("user", &self.user.as_ref().map(|u| u.user.email.clone()))
            .finish()
    }
}
