//! Project initialization.

use std::fs;

use tracing::{debug, info};
use uuid::Uuid;

use crate::core::audit::{AuditEntry, AuditLog, Operation};
use crate::core::config::{DeviceRecord, Registry};
use crate::core::constants;
use crate::core::context::Ctx;
use crate::core::crypto::{self, ContentKey};
use crate::core::identity::DeviceIdentity;
use crate::error::Result;

/// Request for `init`.
#[derive(Debug, Default)]
pub struct InitRequest {
    /// Project display name; defaults to the directory name.
    pub project_name: Option<String>,
    /// Device name for the initializing machine.
    pub device_name: Option<String>,
}

/// Outcome of `init`.
#[derive(Debug)]
pub enum InitOutcome {
    /// The project was already initialized; nothing was changed.
    AlreadyInitialized,
    Created {
        project: Uuid,
        device: Uuid,
        device_name: String,
    },
}

/// Initialize a project in the context's root directory.
///
/// Creates the `.kanuka` layout, a device keypair for the initializing
/// actor, a fresh content-key wrapped under the new device's public key,
/// and the registry with that one device. Re-running against an
/// initialized project is a reported no-op.
pub fn run(ctx: &Ctx, req: &InitRequest) -> Result<InitOutcome> {
    if ctx.config_path().exists() {
        debug!(root = %ctx.root().display(), "already initialized");
        return Ok(InitOutcome::AlreadyInitialized);
    }

    let user = ctx.user()?.clone();
    let project_name = req
        .project_name
        .clone()
        .or_else(|| {
            ctx.root()
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
        })
        .unwrap_or_else(|| "kanuka-project".to_string());

    let mut registry = Registry::new(&project_name);
    let project = registry.project.uuid;
    let device = Uuid::new_v4();
    let device_name = req
        .device_name
        .clone()
        .unwrap_or_else(|| user.device_name_for(&project));

    info!(project = %project, device = %device, "initializing project");

    let keystore = ctx.keystore();
    keystore.ensure_layout()?;

    let identity = DeviceIdentity::generate(&project, &device)?;
    keystore.put_public_key(&device, &identity.public_key())?;

    let content_key = ContentKey::generate();
    let recipient = crypto::parse_recipient(&identity.public_key())?;
    let envelope = crypto::wrap_key(&content_key, &recipient)?;
    keystore.put_envelope(&device, &envelope)?;

    registry.insert(
        device,
        DeviceRecord {
            email: user.user.email.clone(),
            name: device_name.clone(),
            created_at: chrono::Utc::now(),
        },
    );
    registry.save(&ctx.config_path())?;

    ensure_gitignore(ctx)?;

    let mut user = user;
    user.set_project_device(&project, &device_name);
    user.save()?;

    AuditLog::new(ctx.audit_path()).append(
        &AuditEntry::new(Operation::Init, &user.user.email, Some(device))
            .detail(format!("project {}", project_name)),
    )?;

    Ok(InitOutcome::Created {
        project,
        device,
        device_name,
    })
}

/// Make sure plaintext secrets stay out of version control.
fn ensure_gitignore(ctx: &Ctx) -> Result<()> {
    let path = ctx.root().join(".gitignore");
    let existing = if path.exists() {
        fs::read_to_string(&path)?
    } else {
        String::new()
    };

    let missing: Vec<&str> = constants::GITIGNORE_ENTRIES
        .iter()
        .copied()
        .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let mut contents = existing;
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    for entry in missing {
        contents.push_str(entry);
        contents.push('\n');
    }
    fs::write(&path, contents)?;
    Ok(())
}
