//! Orphan envelope cleanup.
//!
//! An interrupted `revoke` can leave an envelope with no matching public
//! key. `clean` lists such orphans and deletes them after confirmation.
//! Idempotent: a second run reports nothing to do.

use tracing::info;
use uuid::Uuid;

use crate::core::access::AccessReport;
use crate::core::audit::{AuditEntry, AuditLog, Operation};
use crate::core::context::Ctx;
use crate::core::lifecycle::Confirm;
use crate::error::Result;

/// Request for `clean`.
#[derive(Debug, Default)]
pub struct CleanRequest {
    /// Delete without asking.
    pub force: bool,
    pub dry_run: bool,
}

/// Outcome of `clean`.
#[derive(Debug)]
pub struct CleanOutcome {
    pub orphans: Vec<Uuid>,
    /// True when the orphans were actually deleted.
    pub removed: bool,
    pub declined: bool,
}

/// Detect and remove orphan envelopes.
pub fn run(ctx: &Ctx, req: &CleanRequest, confirm: Confirm) -> Result<CleanOutcome> {
    let registry = ctx.registry()?;
    let keystore = ctx.keystore();

    let report = AccessReport::gather(&keystore, &registry)?;
    let orphans: Vec<Uuid> = report.orphans().map(|e| e.uuid).collect();

    if orphans.is_empty() || req.dry_run {
        return Ok(CleanOutcome {
            orphans,
            removed: false,
            declined: false,
        });
    }

    if !req.force {
        let question = format!("delete {} orphan envelope(s)?", orphans.len());
        if !confirm(&question) {
            return Ok(CleanOutcome {
                orphans,
                removed: false,
                declined: true,
            });
        }
    }

    info!(count = orphans.len(), "removing orphan envelopes");
    for uuid in &orphans {
        keystore.delete_envelope(uuid)?;
    }

    AuditLog::new(ctx.audit_path()).append(
        &AuditEntry::new(Operation::Clean, ctx.actor_email()?, None)
            .files_changed(orphans.len()),
    )?;

    Ok(CleanOutcome {
        orphans,
        removed: true,
        declined: false,
    })
}
