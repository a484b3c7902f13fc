//! Activating a pending device.
//!
//! The actor unwraps the current content-key with its own private key and
//! re-wraps it under the target's public key, writing the target's
//! envelope. All preconditions (actor access, target existence) are
//! verified before the first write.

use std::fs;
use std::path::PathBuf;

use tracing::info;
use uuid::Uuid;

use crate::core::audit::{AuditEntry, AuditLog, Operation};
use crate::core::config::DeviceRecord;
use crate::core::context::Ctx;
use crate::core::crypto;
use crate::error::{AccessError, ConfigError, Error, FileError, Result, StoreError};

/// How the target device is identified.
#[derive(Debug)]
pub enum RegisterTarget {
    /// Registry lookup by email, with an optional device-name
    /// disambiguator when the email maps to several devices.
    Email {
        email: String,
        device_name: Option<String>,
    },
    /// A raw public-key file. The email is required unless the file name
    /// is the UUID of a registered device.
    KeyFile {
        path: PathBuf,
        email: Option<String>,
        device_name: Option<String>,
    },
    /// Inline public-key text; the email is always required since no
    /// UUID exists yet to look up.
    KeyText {
        key: String,
        email: String,
        device_name: Option<String>,
    },
}

/// Request for `register`.
#[derive(Debug)]
pub struct RegisterRequest {
    pub target: RegisterTarget,
    pub dry_run: bool,
}

/// Outcome of `register`.
#[derive(Debug)]
pub struct RegisterOutcome {
    pub device: Uuid,
    pub email: String,
    pub device_name: String,
    pub envelope_path: PathBuf,
    /// False in dry-run mode: nothing was written.
    pub performed: bool,
}

struct ResolvedTarget {
    device: Uuid,
    email: String,
    device_name: String,
    public_key: String,
    /// Key material and registry entry still need to be written.
    new_record: bool,
}

/// Activate a device: wrap the current content-key under its public key.
pub fn run(ctx: &Ctx, req: &RegisterRequest) -> Result<RegisterOutcome> {
    let mut registry = ctx.registry()?;
    let keystore = ctx.keystore();

    // Actor must be able to unwrap its own envelope before anything is
    // touched; failure here aborts with no writes.
    let content_key = ctx.unwrap_content_key(&registry, None)?;

    let target = resolve_target(ctx, &registry, &req.target)?;
    let recipient = crypto::parse_recipient(&target.public_key)?;
    let envelope = crypto::wrap_key(&content_key, &recipient)?;
    let envelope_path = keystore.envelope_path(&target.device);

    if req.dry_run {
        return Ok(RegisterOutcome {
            device: target.device,
            email: target.email,
            device_name: target.device_name,
            envelope_path,
            performed: false,
        });
    }

    info!(device = %target.device, email = %target.email, "registering device");

    if target.new_record {
        keystore.put_public_key(&target.device, &target.public_key)?;
        registry.insert(
            target.device,
            DeviceRecord {
                email: target.email.clone(),
                name: target.device_name.clone(),
                created_at: chrono::Utc::now(),
            },
        );
        registry.save(&ctx.config_path())?;
    }
    keystore.put_envelope(&target.device, &envelope)?;

    let actor = ctx.actor_device(&registry)?;
    AuditLog::new(ctx.audit_path()).append(
        &AuditEntry::new(Operation::Register, ctx.actor_email()?, Some(actor))
            .target(format!("{} ({})", target.email, target.device_name)),
    )?;

    Ok(RegisterOutcome {
        device: target.device,
        email: target.email,
        device_name: target.device_name,
        envelope_path,
        performed: true,
    })
}

fn resolve_target(
    ctx: &Ctx,
    registry: &crate::core::config::Registry,
    target: &RegisterTarget,
) -> Result<ResolvedTarget> {
    let keystore = ctx.keystore();

    match target {
        RegisterTarget::Email { email, device_name } => {
            let (device, record) = registry.find_device(email, device_name.as_deref())?;
            let public_key = keystore.get_public_key(&device).map_err(|e| match e {
                Error::Store(StoreError::PublicKeyNotFound(_)) => {
                    AccessError::TargetNotFound(format!("{} has no public key", email)).into()
                }
                other => other,
            })?;
            Ok(ResolvedTarget {
                device,
                email: record.email.clone(),
                device_name: record.name.clone(),
                public_key,
                new_record: false,
            })
        }
        RegisterTarget::KeyFile {
            path,
            email,
            device_name,
        } => {
            if !path.exists() {
                return Err(FileError::FileNotFound(path.display().to_string()).into());
            }
            let contents = fs::read_to_string(path).map_err(StoreError::ReadFailed)?;
            let key = contents.trim().to_string();
            crypto::parse_recipient(&key)?;

            // A file named after a registered device refers to that device.
            let stem_uuid = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok());

            if let Some(device) = stem_uuid {
                if let Some(record) = registry.get(&device) {
                    return Ok(ResolvedTarget {
                        device,
                        email: record.email.clone(),
                        device_name: record.name.clone(),
                        public_key: key,
                        new_record: false,
                    });
                }
            }

            let email = email.clone().ok_or_else(|| {
                ConfigError::InvalidValue(
                    "target email is required when registering from a key file".to_string(),
                )
            })?;
            Ok(ResolvedTarget {
                device: Uuid::new_v4(),
                email,
                device_name: device_name.clone().unwrap_or_else(|| "imported".to_string()),
                public_key: key,
                new_record: true,
            })
        }
        RegisterTarget::KeyText {
            key,
            email,
            device_name,
        } => {
            let key = key.trim().to_string();
            crypto::parse_recipient(&key)?;
            Ok(ResolvedTarget {
                device: Uuid::new_v4(),
                email: email.clone(),
                device_name: device_name.clone().unwrap_or_else(|| "imported".to_string()),
                public_key: key,
                new_record: true,
            })
        }
    }
}
