//! Registry and user configuration.
//!
//! Two TOML files, both owned by this module:
//!
//! - `.kanuka/config.toml` is the project registry: project identity plus
//!   the device table. Authoritative for "who is allowed access"; every
//!   lifecycle operation keeps `public_keys/` and `secrets/` consistent
//!   with it.
//! - `~/.kanuka/config.toml` is the per-user config: email, user UUID and
//!   per-project device-name preference. Never committed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::core::constants;
use crate::error::{AccessError, ConfigError, Result};

/// A registered device: the unit of access, not necessarily one per human.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Owner email, the lookup handle for `register`/`revoke`.
    pub email: String,
    /// Human-readable device name, disambiguates multiple devices per email.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Project metadata section of the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMeta {
    /// Stable project identifier; never changes after `init`.
    pub uuid: Uuid,
    /// Display name.
    pub name: String,
}

/// The project registry stored in `.kanuka/config.toml`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Registry {
    pub project: ProjectMeta,
    /// Device UUID (string form) to device record.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceRecord>,
}

impl Registry {
    /// Create a registry for a new project.
    pub fn new(name: &str) -> Self {
        Self {
            project: ProjectMeta {
                uuid: Uuid::new_v4(),
                name: name.to_string(),
            },
            devices: BTreeMap::new(),
        }
    }

    /// Load and validate the registry.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotInitialized` if the file doesn't exist,
    /// or `ConfigError::Parse` if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading registry");

        if !path.exists() {
            return Err(ConfigError::NotInitialized.into());
        }
        let contents = fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let registry: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;

        debug!(devices = registry.devices.len(), "registry loaded");

        registry.validate()?;
        Ok(registry)
    }

    /// Save the registry.
    pub fn save(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "saving registry");
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate structure and contents.
    fn validate(&self) -> Result<()> {
        if self.project.name.is_empty() {
            return Err(ConfigError::InvalidValue("project name is empty".to_string()).into());
        }
        for (uuid, record) in &self.devices {
            if Uuid::parse_str(uuid).is_err() {
                return Err(
                    ConfigError::InvalidValue(format!("invalid device uuid: {}", uuid)).into(),
                );
            }
            if record.email.is_empty() || record.name.is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "device {} has an empty email or name",
                    uuid
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Look up a device record.
    pub fn get(&self, uuid: &Uuid) -> Option<&DeviceRecord> {
        self.devices.get(&uuid.to_string())
    }

    /// Add or replace a device record.
    pub fn insert(&mut self, uuid: Uuid, record: DeviceRecord) {
        self.devices.insert(uuid.to_string(), record);
    }

    /// Remove a device record. Returns the removed record, if any.
    pub fn remove(&mut self, uuid: &Uuid) -> Option<DeviceRecord> {
        self.devices.remove(&uuid.to_string())
    }

    /// All devices owned by an email, sorted by device name.
    pub fn devices_for_email(&self, email: &str) -> Vec<(Uuid, &DeviceRecord)> {
        let mut out: Vec<(Uuid, &DeviceRecord)> = self
            .devices
            .iter()
            .filter(|(_, r)| r.email == email)
            .filter_map(|(u, r)| Uuid::parse_str(u).ok().map(|u| (u, r)))
            .collect();
        out.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        out
    }

    /// Resolve exactly one device by email and optional device name.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::TargetNotFound` when nothing matches, or
    /// `AccessError::AmbiguousTarget` when the email maps to several
    /// devices and no name was given.
    pub fn find_device(&self, email: &str, name: Option<&str>) -> Result<(Uuid, &DeviceRecord)> {
        let matches = self.devices_for_email(email);

        match name {
            Some(name) => matches
                .into_iter()
                .find(|(_, r)| r.name == name)
                .ok_or_else(|| {
                    AccessError::TargetNotFound(format!("{} ({})", email, name)).into()
                }),
            None => match matches.len() {
                0 => Err(AccessError::TargetNotFound(email.to_string()).into()),
                1 => Ok(matches.into_iter().next().unwrap()),
                n => Err(AccessError::AmbiguousTarget {
                    email: email.to_string(),
                    count: n,
                }
                .into()),
            },
        }
    }
}

/// User section of the per-user config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMeta {
    pub email: String,
    pub uuid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_device_name: Option<String>,
}

/// Per-user configuration stored outside any project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub user: UserMeta,
    /// Project UUID (string form) to preferred device name.
    #[serde(default)]
    pub projects: BTreeMap<String, String>,
}

impl UserConfig {
    /// Path to the user config (`~/.kanuka/config.toml`).
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ConfigError::InvalidValue("no home directory".to_string()))?;
        Ok(home.join(constants::USER_CONFIG_FILE))
    }

    /// Whether a user config exists on this machine.
    pub fn exists() -> bool {
        Self::path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Load the user config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingUser` if no config has been written yet.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Err(ConfigError::MissingUser.into());
        }
        let contents = fs::read_to_string(&path).map_err(ConfigError::ReadFile)?;
        Ok(toml::from_str(&contents).map_err(ConfigError::Parse)?)
    }

    /// Save the user config, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(&path, contents)?;
        Ok(())
    }

    /// Load the user config, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingUser` when no config exists and no
    /// email was supplied to bootstrap one.
    pub fn load_or_create(email: Option<&str>, name: Option<&str>) -> Result<Self> {
        if Self::exists() {
            return Self::load();
        }
        let email = email.ok_or(ConfigError::MissingUser)?;
        let config = Self {
            user: UserMeta {
                email: email.to_string(),
                uuid: Uuid::new_v4(),
                name: name.map(str::to_string),
                default_device_name: None,
            },
            projects: BTreeMap::new(),
        };
        config.save()?;
        debug!(email = %email, "created user config");
        Ok(config)
    }

    /// Device name to use for a project.
    ///
    /// Preference order: per-project override, default device name,
    /// this machine's hostname.
    pub fn device_name_for(&self, project: &Uuid) -> String {
        self.projects
            .get(&project.to_string())
            .cloned()
            .or_else(|| self.user.default_device_name.clone())
            .unwrap_or_else(whoami::devicename)
    }

    /// Record the device name used for a project.
    pub fn set_project_device(&mut self, project: &Uuid, device_name: &str) {
        self.projects
            .insert(project.to_string(), device_name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str, name: &str) -> DeviceRecord {
        DeviceRecord {
            email: email.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn registry_round_trips_through_toml() {
        let mut registry = Registry::new("demo");
        let uuid = Uuid::new_v4();
        registry.insert(uuid, record("alice@example.com", "laptop"));

        let serialized = toml::to_string_pretty(&registry).unwrap();
        let parsed: Registry = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.project.uuid, registry.project.uuid);
        assert_eq!(parsed.get(&uuid).unwrap().email, "alice@example.com");
    }

    #[test]
    fn find_device_by_email() {
        let mut registry = Registry::new("demo");
        let uuid = Uuid::new_v4();
        registry.insert(uuid, record("alice@example.com", "laptop"));

        let (found, rec) = registry.find_device("alice@example.com", None).unwrap();
        assert_eq!(found, uuid);
        assert_eq!(rec.name, "laptop");
    }

    #[test]
    fn find_device_requires_disambiguation() {
        let mut registry = Registry::new("demo");
        registry.insert(Uuid::new_v4(), record("alice@example.com", "laptop"));
        registry.insert(Uuid::new_v4(), record("alice@example.com", "desktop"));

        let err = registry.find_device("alice@example.com", None).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Access(AccessError::AmbiguousTarget { count: 2, .. })
        ));

        let (_, rec) = registry
            .find_device("alice@example.com", Some("desktop"))
            .unwrap();
        assert_eq!(rec.name, "desktop");
    }

    #[test]
    fn find_device_unknown_email() {
        let registry = Registry::new("demo");
        let err = registry.find_device("nobody@example.com", None).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Access(AccessError::TargetNotFound(_))
        ));
    }

    #[test]
    fn invalid_device_uuid_is_rejected() {
        let toml_str = r#"
            [project]
            uuid = "8c41a1a2-95b2-4f3b-9f9f-3a1f2f2b1c11"
            name = "demo"

            [devices.not-a-uuid]
            email = "a@b.c"
            name = "laptop"
            created_at = "2026-01-01T00:00:00Z"
        "#;
        let registry: Registry = toml::from_str(toml_str).unwrap();
        assert!(registry.validate().is_err());
    }
}
