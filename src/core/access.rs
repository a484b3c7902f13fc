//! Access classification and consistency checking.
//!
//! The single place that decides what a device UUID *is*: every UUID
//! appearing under `public_keys/` or `secrets/` lands in exactly one of
//! active, pending or orphan. `access`, `clean` and `doctor` all consume
//! this classification rather than re-deriving it.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::core::config::{DeviceRecord, Registry};
use crate::core::context::Ctx;
use crate::core::keystore::KeyStore;
use crate::error::{AccessError, CryptoError, Error, Result};

/// Consistency classification of a device UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Public key and envelope both present: can decrypt.
    Active,
    /// Public key only: awaiting `register`.
    Pending,
    /// Envelope only: inconsistency, removable by `clean`.
    Orphan,
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DeviceState::Active => "active",
            DeviceState::Pending => "pending",
            DeviceState::Orphan => "orphan",
        })
    }
}

/// One classified UUID, joined with its registry record when present.
#[derive(Debug, Clone)]
pub struct AccessEntry {
    pub uuid: Uuid,
    pub state: DeviceState,
    pub record: Option<DeviceRecord>,
}

/// Full classification of a project's key material.
#[derive(Debug, Clone)]
pub struct AccessReport {
    pub entries: Vec<AccessEntry>,
}

impl AccessReport {
    /// Classify every UUID found in either store.
    pub fn gather(keystore: &KeyStore, registry: &Registry) -> Result<Self> {
        let with_key: BTreeSet<Uuid> = keystore.list_public_key_uuids()?.into_iter().collect();
        let with_envelope: BTreeSet<Uuid> = keystore.list_envelope_uuids()?.into_iter().collect();

        let entries = with_key
            .union(&with_envelope)
            .map(|uuid| {
                let state = match (with_key.contains(uuid), with_envelope.contains(uuid)) {
                    (true, true) => DeviceState::Active,
                    (true, false) => DeviceState::Pending,
                    (false, _) => DeviceState::Orphan,
                };
                AccessEntry {
                    uuid: *uuid,
                    state,
                    record: registry.get(uuid).cloned(),
                }
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn active(&self) -> impl Iterator<Item = &AccessEntry> {
        self.entries
            .iter()
            .filter(|e| e.state == DeviceState::Active)
    }

    pub fn pending(&self) -> impl Iterator<Item = &AccessEntry> {
        self.entries
            .iter()
            .filter(|e| e.state == DeviceState::Pending)
    }

    pub fn orphans(&self) -> impl Iterator<Item = &AccessEntry> {
        self.entries
            .iter()
            .filter(|e| e.state == DeviceState::Orphan)
    }
}

/// Severity of one health check finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckLevel {
    Ok,
    Warning,
    Error,
}

/// One health check finding.
#[derive(Debug, Clone)]
pub struct Check {
    pub level: CheckLevel,
    pub message: String,
}

impl Check {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            level: CheckLevel::Ok,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: CheckLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: CheckLevel::Error,
            message: message.into(),
        }
    }
}

/// Read-only cross-check of registry, public keys and envelopes.
///
/// Findings, not failures: the caller decides what exit code the set of
/// levels maps to.
pub fn health_checks(ctx: &Ctx) -> Result<Vec<Check>> {
    let registry = ctx.registry()?;
    let keystore = ctx.keystore();
    let report = AccessReport::gather(&keystore, &registry)?;

    let mut checks = Vec::new();

    for entry in report.orphans() {
        checks.push(Check::error(format!(
            "orphan envelope for {} (no public key); run `kanuka clean`",
            entry.uuid
        )));
    }

    for entry in report.pending() {
        let who = entry
            .record
            .as_ref()
            .map(|r| format!("{} ({})", r.email, r.name))
            .unwrap_or_else(|| entry.uuid.to_string());
        checks.push(Check::warning(format!(
            "pending device {}; an active device must run `kanuka register`",
            who
        )));
    }

    for entry in &report.entries {
        if entry.state != DeviceState::Orphan && entry.record.is_none() {
            checks.push(Check::warning(format!(
                "public key {} is not in the registry",
                entry.uuid
            )));
        }
    }

    for (uuid_str, record) in &registry.devices {
        if let Ok(uuid) = Uuid::parse_str(uuid_str) {
            if !keystore.has_public_key(&uuid) && !keystore.has_envelope(&uuid) {
                checks.push(Check::warning(format!(
                    "registry lists {} ({}) but no key material exists",
                    record.email, record.name
                )));
            }
        }
    }

    match ctx.unwrap_content_key(&registry, None) {
        Ok(_) => checks.push(Check::ok("content key decrypts with this device".to_string())),
        Err(Error::Access(AccessError::NoAccess)) | Err(Error::Config(_)) => {
            checks.push(Check::warning(
                "this machine has no active device in the project".to_string(),
            ));
        }
        Err(Error::Crypto(CryptoError::KeyDecryptFailed(e))) => {
            checks.push(Check::error(format!(
                "own envelope does not decrypt: {}; ask for a re-register",
                e
            )));
        }
        Err(Error::Store(e)) => checks.push(Check::warning(format!("{}", e))),
        Err(e) => return Err(e),
    }

    if checks.iter().all(|c| c.level == CheckLevel::Ok) {
        checks.push(Check::ok(format!(
            "{} active device(s), registry consistent",
            report.active().count()
        )));
    }

    Ok(checks)
}
