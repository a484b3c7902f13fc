//! Revoke command - remove devices and rotate the content key.

use std::path::PathBuf;

use crate::cli::{output, prompt};
use crate::core::context::Ctx;
use crate::core::lifecycle::revoke::{self, RevokeRequest, RevokeTarget};
use crate::error::{ConfigError, Result};

pub fn execute(
    email: Option<String>,
    device: Option<String>,
    file: Option<PathBuf>,
    yes: bool,
    dry_run: bool,
) -> Result<()> {
    let ctx = Ctx::discover()?;

    let target = match (email, file) {
        (Some(email), None) => RevokeTarget::Email {
            email,
            device_name: device,
        },
        (None, Some(path)) => RevokeTarget::EnvelopePath(path),
        _ => {
            return Err(
                ConfigError::InvalidValue("pass --email or --file".to_string()).into(),
            )
        }
    };

    let outcome = revoke::run(
        &ctx,
        &RevokeRequest {
            target,
            yes,
            dry_run,
        },
        &prompt::confirm,
    )?;

    if outcome.declined {
        output::warn("aborted; nothing revoked");
        return Ok(());
    }

    let label = |d: &revoke::RemovedDevice| match (&d.email, &d.device_name) {
        (Some(email), Some(name)) => format!("{} ({})", email, name),
        _ => d.uuid.to_string(),
    };

    if outcome.performed {
        for removed in &outcome.removed {
            output::success(&format!("revoked {}", label(removed)));
        }
        output::kv("files removed", outcome.files_removed);
        output::kv("envelopes re-wrapped", outcome.rewrapped);
        output::dimmed("old ciphertext stays readable to cached keys; run: kanuka sync");
    } else {
        output::header("dry run - nothing written");
        for removed in &outcome.removed {
            output::list_item(&format!("would revoke {}", label(removed)));
        }
        output::kv("files to remove", outcome.files_removed);
        output::kv("envelopes to re-wrap", outcome.rewrapped);
    }
    Ok(())
}
