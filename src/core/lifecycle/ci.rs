//! Automation (CI) onboarding.
//!
//! Creates a device whose private key is never written to persistent
//! storage: the engine returns it in memory exactly once and the caller
//! is responsible for the one-time terminal display. The public half is
//! registered like any other device and activated immediately.

use tracing::info;
use uuid::Uuid;

use crate::core::audit::{AuditEntry, AuditLog, Operation};
use crate::core::config::DeviceRecord;
use crate::core::constants;
use crate::core::context::Ctx;
use crate::core::crypto;
use crate::core::identity::DeviceIdentity;
use crate::error::{AccessError, Result};

/// Request for `ci-init`.
#[derive(Debug, Default)]
pub struct CiInitRequest {}

/// Outcome of `ci-init`.
pub struct CiInitOutcome {
    pub device: Uuid,
    pub public_key: String,
    /// The private key, held only in memory. Display once, then drop.
    pub secret_key: String,
}

impl std::fmt::Debug for CiInitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CiInitOutcome")
            .field("device", &self.device)
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Register an ephemeral automation device.
///
/// # Errors
///
/// `AccessError::CiAlreadyConfigured` when a CI device already exists;
/// the usual access errors when the actor cannot unwrap its envelope.
pub fn run(ctx: &Ctx, _req: &CiInitRequest) -> Result<CiInitOutcome> {
    let mut registry = ctx.registry()?;
    let keystore = ctx.keystore();

    let content_key = ctx.unwrap_content_key(&registry, None)?;

    let exists = registry
        .devices
        .values()
        .any(|record| record.name == constants::CI_DEVICE_NAME);
    if exists {
        return Err(AccessError::CiAlreadyConfigured.into());
    }

    let identity = DeviceIdentity::ephemeral();
    let device = Uuid::new_v4();

    info!(device = %device, "registering CI device");

    let recipient = crypto::parse_recipient(&identity.public_key())?;
    let envelope = crypto::wrap_key(&content_key, &recipient)?;

    keystore.put_public_key(&device, &identity.public_key())?;
    keystore.put_envelope(&device, &envelope)?;
    registry.insert(
        device,
        DeviceRecord {
            email: ctx.actor_email()?.to_string(),
            name: constants::CI_DEVICE_NAME.to_string(),
            created_at: chrono::Utc::now(),
        },
    );
    registry.save(&ctx.config_path())?;

    let actor = ctx.actor_device(&registry)?;
    AuditLog::new(ctx.audit_path()).append(
        &AuditEntry::new(Operation::CiInit, ctx.actor_email()?, Some(actor))
            .target(constants::CI_DEVICE_NAME),
    )?;

    Ok(CiInitOutcome {
        device,
        public_key: identity.public_key(),
        secret_key: identity.secret_string(),
    })
}
