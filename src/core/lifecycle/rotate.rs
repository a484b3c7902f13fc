//! Content-key rotation (envelopes only).
//!
//! Generates a new content-key and re-wraps it for every active device.
//! Tracked secret files are NOT re-encrypted; they remain under the old
//! key until the next `encrypt` or a full `sync`.

use tracing::info;
use uuid::Uuid;

use crate::core::access::AccessReport;
use crate::core::audit::{AuditEntry, AuditLog, Operation};
use crate::core::context::Ctx;
use crate::core::crypto::{self, ContentKey};
use crate::error::Result;

/// Request for `rotate`.
#[derive(Debug, Default)]
pub struct RotateRequest {
    pub dry_run: bool,
}

/// Outcome of `rotate`.
#[derive(Debug)]
pub struct RotateOutcome {
    /// Devices whose envelopes were (or would be) re-wrapped.
    pub devices: Vec<Uuid>,
    pub performed: bool,
}

/// Re-wrap a fresh content-key for every active device.
pub fn run(ctx: &Ctx, req: &RotateRequest) -> Result<RotateOutcome> {
    let registry = ctx.registry()?;
    let keystore = ctx.keystore();

    // The actor must hold access before it may rotate everyone's key.
    ctx.unwrap_content_key(&registry, None)?;

    let report = AccessReport::gather(&keystore, &registry)?;
    let devices: Vec<Uuid> = report.active().map(|e| e.uuid).collect();

    if req.dry_run {
        return Ok(RotateOutcome {
            devices,
            performed: false,
        });
    }

    info!(devices = devices.len(), "rotating content key");

    let new_key = ContentKey::generate();
    for uuid in &devices {
        let public_key = keystore.get_public_key(uuid)?;
        let recipient = crypto::parse_recipient(&public_key)?;
        let envelope = crypto::wrap_key(&new_key, &recipient)?;
        keystore.put_envelope(uuid, &envelope)?;
    }

    let actor = ctx.actor_device(&registry)?;
    AuditLog::new(ctx.audit_path()).append(
        &AuditEntry::new(Operation::Rotate, ctx.actor_email()?, Some(actor))
            .devices_affected(devices.len()),
    )?;

    Ok(RotateOutcome {
        devices,
        performed: true,
    })
}
