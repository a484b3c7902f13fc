//! Joining a project: publish a pending device.

use tracing::info;
use uuid::Uuid;

use crate::core::audit::{AuditEntry, AuditLog, Operation};
use crate::core::config::DeviceRecord;
use crate::core::context::Ctx;
use crate::core::identity::DeviceIdentity;
use crate::error::{AccessError, Result};

/// Request for `create`.
#[derive(Debug, Default)]
pub struct CreateRequest {
    /// Device name for this machine; defaults to the user's preference.
    pub device_name: Option<String>,
    /// Replace an existing envelope-less registration with the same name.
    pub force: bool,
}

/// Outcome of `create`.
#[derive(Debug)]
pub struct CreateOutcome {
    pub device: Uuid,
    pub device_name: String,
    pub public_key: String,
    /// A previous pending registration was replaced.
    pub replaced: Option<Uuid>,
}

/// Publish a new pending device for the acting user.
///
/// The device has a public key but no envelope; it cannot decrypt
/// anything until an already-active device runs `register` for it.
///
/// # Errors
///
/// `AccessError::AlreadyActive` when a device with the same email and
/// name already holds an envelope; `AccessError::PendingExists` when a
/// pending one exists and `force` is not set.
pub fn run(ctx: &Ctx, req: &CreateRequest) -> Result<CreateOutcome> {
    let mut registry = ctx.registry()?;
    let user = ctx.user()?.clone();
    let project = registry.project.uuid;

    let device_name = req
        .device_name
        .clone()
        .unwrap_or_else(|| user.device_name_for(&project));

    let keystore = ctx.keystore();

    // A same-named device for this email is a conflict; other devices of
    // the same person (different machines) are not.
    let mut replaced = None;
    let existing = registry
        .devices_for_email(&user.user.email)
        .into_iter()
        .find(|(_, record)| record.name == device_name)
        .map(|(uuid, _)| uuid);

    if let Some(existing) = existing {
        if keystore.has_envelope(&existing) {
            return Err(AccessError::AlreadyActive(user.user.email.clone()).into());
        }
        if !req.force {
            return Err(AccessError::PendingExists(device_name).into());
        }
        keystore.delete_public_key(&existing)?;
        DeviceIdentity::delete(&project, &existing)?;
        registry.remove(&existing);
        replaced = Some(existing);
    }

    let device = Uuid::new_v4();
    info!(device = %device, name = %device_name, "creating pending device");

    keystore.ensure_layout()?;
    let identity = DeviceIdentity::generate(&project, &device)?;
    keystore.put_public_key(&device, &identity.public_key())?;

    registry.insert(
        device,
        DeviceRecord {
            email: user.user.email.clone(),
            name: device_name.clone(),
            created_at: chrono::Utc::now(),
        },
    );
    registry.save(&ctx.config_path())?;

    let mut user = user;
    user.set_project_device(&project, &device_name);
    user.save()?;

    AuditLog::new(ctx.audit_path()).append(
        &AuditEntry::new(Operation::Create, &user.user.email, Some(device))
            .detail(format!("device {}", device_name)),
    )?;

    Ok(CreateOutcome {
        device,
        device_name,
        public_key: identity.public_key(),
        replaced,
    })
}
