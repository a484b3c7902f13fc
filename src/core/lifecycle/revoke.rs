//! Revoking devices.
//!
//! Deletes the target's key material and registry record, then rotates
//! the content-key for every remaining active device. Only the key
//! *envelopes* are rotated: ciphertext produced before revocation is
//! still decryptable by anyone who kept a copy of the old content-key.
//! `sync` closes that gap by re-encrypting the tracked files as well.

use std::path::PathBuf;

use tracing::info;
use uuid::Uuid;

use crate::core::access::AccessReport;
use crate::core::audit::{AuditEntry, AuditLog, Operation};
use crate::core::context::Ctx;
use crate::core::crypto::{self, ContentKey};
use crate::core::lifecycle::Confirm;
use crate::error::{AccessError, Result};

/// How the devices to revoke are identified.
#[derive(Debug)]
pub enum RevokeTarget {
    /// Every device owned by the email, optionally narrowed to one
    /// device name.
    Email {
        email: String,
        device_name: Option<String>,
    },
    /// A single envelope file (`secrets/<uuid>.kanuka`).
    EnvelopePath(PathBuf),
}

/// Request for `revoke`.
#[derive(Debug)]
pub struct RevokeRequest {
    pub target: RevokeTarget,
    /// Skip the confirmation prompt when several devices match.
    pub yes: bool,
    pub dry_run: bool,
}

/// One revoked device, with registry data when it was known.
#[derive(Debug)]
pub struct RemovedDevice {
    pub uuid: Uuid,
    pub email: Option<String>,
    pub device_name: Option<String>,
}

/// Outcome of `revoke`.
#[derive(Debug)]
pub struct RevokeOutcome {
    pub removed: Vec<RemovedDevice>,
    /// Key and envelope files deleted.
    pub files_removed: usize,
    /// Remaining active devices whose envelopes were re-wrapped.
    pub rewrapped: usize,
    /// False for dry runs and declined confirmations.
    pub performed: bool,
    pub declined: bool,
}

/// Revoke one or more devices and rotate the content-key for the rest.
pub fn run(ctx: &Ctx, req: &RevokeRequest, confirm: Confirm) -> Result<RevokeOutcome> {
    let mut registry = ctx.registry()?;
    let keystore = ctx.keystore();

    // Membership check before any mutation.
    ctx.unwrap_content_key(&registry, None)?;

    let targets: Vec<Uuid> = match &req.target {
        RevokeTarget::Email { email, device_name } => {
            let owned = registry.devices_for_email(email);
            match device_name {
                Some(name) => {
                    let (uuid, _) = registry.find_device(email, Some(name))?;
                    vec![uuid]
                }
                None if owned.is_empty() => {
                    return Err(AccessError::TargetNotFound(email.clone()).into());
                }
                None => owned.into_iter().map(|(uuid, _)| uuid).collect(),
            }
        }
        RevokeTarget::EnvelopePath(path) => {
            let uuid = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| AccessError::TargetNotFound(path.display().to_string()))?;
            if !keystore.has_envelope(&uuid) && !keystore.has_public_key(&uuid) {
                return Err(AccessError::TargetNotFound(uuid.to_string()).into());
            }
            vec![uuid]
        }
    };

    let removed: Vec<RemovedDevice> = targets
        .iter()
        .map(|uuid| {
            let record = registry.get(uuid);
            RemovedDevice {
                uuid: *uuid,
                email: record.map(|r| r.email.clone()),
                device_name: record.map(|r| r.name.clone()),
            }
        })
        .collect();

    // Count the remaining active devices as they will be after deletion.
    let report = AccessReport::gather(&keystore, &registry)?;
    let survivors: Vec<Uuid> = report
        .active()
        .map(|e| e.uuid)
        .filter(|uuid| !targets.contains(uuid))
        .collect();

    let planned_files: usize = targets
        .iter()
        .map(|u| keystore.has_public_key(u) as usize + keystore.has_envelope(u) as usize)
        .sum();

    if req.dry_run {
        return Ok(RevokeOutcome {
            removed,
            files_removed: planned_files,
            rewrapped: survivors.len(),
            performed: false,
            declined: false,
        });
    }

    // Several devices going at once needs an explicit opt-in.
    if removed.len() > 1 && !req.yes {
        let listing = removed
            .iter()
            .map(|d| match (&d.email, &d.device_name) {
                (Some(email), Some(name)) => format!("{} ({})", email, name),
                _ => d.uuid.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        let question = format!("revoke {} devices: {}?", removed.len(), listing);
        if !confirm(&question) {
            return Ok(RevokeOutcome {
                removed,
                files_removed: 0,
                rewrapped: 0,
                performed: false,
                declined: true,
            });
        }
    }

    info!(count = removed.len(), "revoking devices");

    let mut files_removed = 0;
    for uuid in &targets {
        if keystore.has_public_key(uuid) {
            keystore.delete_public_key(uuid)?;
            files_removed += 1;
        }
        if keystore.has_envelope(uuid) {
            keystore.delete_envelope(uuid)?;
            files_removed += 1;
        }
        registry.remove(uuid);
    }
    registry.save(&ctx.config_path())?;

    // Rotate the envelopes of everyone left so the departed key is dead.
    let mut rewrapped = 0;
    if !survivors.is_empty() {
        let new_key = ContentKey::generate();
        for uuid in &survivors {
            let public_key = keystore.get_public_key(uuid)?;
            let recipient = crypto::parse_recipient(&public_key)?;
            let envelope = crypto::wrap_key(&new_key, &recipient)?;
            keystore.put_envelope(uuid, &envelope)?;
            rewrapped += 1;
        }
    }

    let actor = ctx.actor_device(&registry).ok();
    let target_label = match &req.target {
        RevokeTarget::Email { email, .. } => email.clone(),
        RevokeTarget::EnvelopePath(path) => path.display().to_string(),
    };
    AuditLog::new(ctx.audit_path()).append(
        &AuditEntry::new(Operation::Revoke, ctx.actor_email()?, actor)
            .target(target_label)
            .devices_affected(removed.len())
            .files_changed(files_removed),
    )?;

    Ok(RevokeOutcome {
        removed,
        files_removed,
        rewrapped,
        performed: true,
        declined: false,
    })
}
