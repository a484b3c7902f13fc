//! Per-file encryption and decryption.
//!
//! Neither operation changes project membership: the actor unwraps its
//! own envelope to obtain the current content-key and applies it per
//! file. The private key can come from local disk or from a pipe (for
//! automation); dry runs report source→destination mappings without
//! touching anything.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::audit::{AuditEntry, AuditLog, Operation};
use crate::core::context::Ctx;
use crate::core::crypto;
use crate::core::files;
use crate::core::identity::DeviceIdentity;
use crate::error::Result;

/// Request for `encrypt` or `decrypt`.
#[derive(Debug, Default)]
pub struct SecretsRequest {
    /// Explicit paths, glob patterns or directories; empty means every
    /// tracked file under the project root.
    pub patterns: Vec<String>,
    pub dry_run: bool,
    /// Private key supplied via a pipe instead of local disk.
    pub identity: Option<DeviceIdentity>,
}

/// One planned or performed file transformation.
#[derive(Debug)]
pub struct FileMapping {
    pub source: PathBuf,
    pub dest: PathBuf,
    /// The destination already exists and would be overwritten.
    pub overwrite: bool,
}

/// Outcome of `encrypt`/`decrypt`.
#[derive(Debug)]
pub struct SecretsOutcome {
    pub mappings: Vec<FileMapping>,
    pub performed: bool,
}

/// Encrypt the resolved plaintext files under the current content-key.
pub fn encrypt(ctx: &Ctx, req: &SecretsRequest) -> Result<SecretsOutcome> {
    let registry = ctx.registry()?;
    let content_key = ctx.unwrap_content_key(&registry, req.identity.as_ref())?;

    let targets = files::resolve_plaintext_targets(ctx.root(), &req.patterns)?;
    let mappings: Vec<FileMapping> = targets
        .iter()
        .map(|source| {
            let dest = files::encrypted_path(source);
            FileMapping {
                overwrite: dest.exists(),
                source: source.clone(),
                dest,
            }
        })
        .collect();

    if req.dry_run {
        return Ok(SecretsOutcome {
            mappings,
            performed: false,
        });
    }

    info!(files = mappings.len(), "encrypting secret files");
    for mapping in &mappings {
        let plaintext = fs::read(&mapping.source)?;
        let ciphertext = crypto::encrypt_content(&content_key, &plaintext)?;
        fs::write(&mapping.dest, ciphertext)?;
    }

    append_audit(ctx, Operation::Encrypt, &mappings)?;

    Ok(SecretsOutcome {
        mappings,
        performed: true,
    })
}

/// Decrypt the resolved ciphertext files back to their plaintext siblings.
pub fn decrypt(ctx: &Ctx, req: &SecretsRequest) -> Result<SecretsOutcome> {
    let registry = ctx.registry()?;
    let content_key = ctx.unwrap_content_key(&registry, req.identity.as_ref())?;

    let targets = files::resolve_ciphertext_targets(ctx.root(), &req.patterns)?;
    let mappings: Vec<FileMapping> = targets
        .iter()
        .map(|source| {
            let dest = files::plaintext_path(source)?;
            Ok(FileMapping {
                overwrite: dest.exists(),
                source: source.clone(),
                dest,
            })
        })
        .collect::<Result<_>>()?;

    if req.dry_run {
        return Ok(SecretsOutcome {
            mappings,
            performed: false,
        });
    }

    info!(files = mappings.len(), "decrypting secret files");
    for mapping in &mappings {
        let ciphertext = fs::read(&mapping.source)?;
        let plaintext = crypto::decrypt_content(&content_key, &ciphertext)?;
        fs::write(&mapping.dest, &plaintext)?;
    }

    append_audit(ctx, Operation::Decrypt, &mappings)?;

    Ok(SecretsOutcome {
        mappings,
        performed: true,
    })
}

fn append_audit(ctx: &Ctx, operation: Operation, mappings: &[FileMapping]) -> Result<()> {
    let files: Vec<String> = mappings
        .iter()
        .map(|m| relative_display(ctx.root(), &m.source))
        .collect();

    // Piped-identity automation has no user config; log the device role.
    let actor = ctx.actor_email().unwrap_or("automation").to_string();

    AuditLog::new(ctx.audit_path()).append(
        &AuditEntry::new(operation, &actor, None)
            .files(files)
            .files_changed(mappings.len()),
    )
}

fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
