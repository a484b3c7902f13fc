//! Full re-key.
//!
//! Rotation alone leaves old ciphertext readable by anyone who cached
//! the previous content-key. `sync` closes that gap: it decrypts every
//! tracked secret file under the current key, generates a new key,
//! re-encrypts everything, and re-wraps the new key for all active
//! devices. After `sync`, a revoked device's cached key opens nothing.

use std::fs;
use std::path::PathBuf;

use tracing::info;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::core::access::AccessReport;
use crate::core::audit::{AuditEntry, AuditLog, Operation};
use crate::core::context::Ctx;
use crate::core::crypto::{self, ContentKey};
use crate::core::files;
use crate::error::{Error, FileError, Result};

/// Request for `sync`.
#[derive(Debug, Default)]
pub struct SyncRequest {
    pub dry_run: bool,
}

/// Outcome of `sync`.
#[derive(Debug)]
pub struct SyncOutcome {
    /// Tracked files re-encrypted (or counted, in dry-run mode).
    pub files: Vec<PathBuf>,
    /// Active devices re-wrapped.
    pub devices: Vec<Uuid>,
    pub performed: bool,
}

/// Re-encrypt all tracked files and re-wrap all envelopes under a new key.
pub fn run(ctx: &Ctx, req: &SyncRequest) -> Result<SyncOutcome> {
    let registry = ctx.registry()?;
    let keystore = ctx.keystore();

    let old_key = ctx.unwrap_content_key(&registry, None)?;

    let targets = match files::resolve_ciphertext_targets(ctx.root(), &[]) {
        Ok(targets) => targets,
        Err(Error::File(FileError::NoFilesFound)) => Vec::new(),
        Err(e) => return Err(e),
    };

    let report = AccessReport::gather(&keystore, &registry)?;
    let devices: Vec<Uuid> = report.active().map(|e| e.uuid).collect();

    if req.dry_run {
        return Ok(SyncOutcome {
            files: targets,
            devices,
            performed: false,
        });
    }

    // Decrypt everything up front so a corrupt file aborts the operation
    // before any write.
    let mut plaintexts: Vec<(PathBuf, Zeroizing<Vec<u8>>)> = Vec::with_capacity(targets.len());
    for path in &targets {
        let ciphertext = fs::read(path)?;
        let plaintext = crypto::decrypt_content(&old_key, &ciphertext)?;
        plaintexts.push((path.clone(), plaintext));
    }

    info!(
        files = plaintexts.len(),
        devices = devices.len(),
        "re-keying project"
    );

    let new_key = ContentKey::generate();
    for (path, plaintext) in &plaintexts {
        let ciphertext = crypto::encrypt_content(&new_key, plaintext)?;
        fs::write(path, ciphertext)?;
    }

    for uuid in &devices {
        let public_key = keystore.get_public_key(uuid)?;
        let recipient = crypto::parse_recipient(&public_key)?;
        let envelope = crypto::wrap_key(&new_key, &recipient)?;
        keystore.put_envelope(uuid, &envelope)?;
    }

    let actor = ctx.actor_device(&registry)?;
    AuditLog::new(ctx.audit_path()).append(
        &AuditEntry::new(Operation::Sync, ctx.actor_email()?, Some(actor))
            .devices_affected(devices.len())
            .files_changed(targets.len()),
    )?;

    Ok(SyncOutcome {
        files: targets,
        devices,
        performed: true,
    })
}
