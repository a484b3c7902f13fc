//! Register command - activate a pending device.

use std::path::PathBuf;

use crate::cli::output;
use crate::core::context::Ctx;
use crate::core::lifecycle::register::{self, RegisterRequest, RegisterTarget};
use crate::error::{ConfigError, Result};

pub fn execute(
    email: Option<String>,
    device: Option<String>,
    file: Option<PathBuf>,
    key: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let ctx = Ctx::discover()?;

    let target = match (file, key, email) {
        (Some(path), None, email) => RegisterTarget::KeyFile {
            path,
            email,
            device_name: device,
        },
        (None, Some(key), Some(email)) => RegisterTarget::KeyText {
            key,
            email,
            device_name: device,
        },
        (None, None, Some(email)) => RegisterTarget::Email {
            email,
            device_name: device,
        },
        _ => {
            return Err(ConfigError::InvalidValue(
                "pass --email, --file, or --key with --email".to_string(),
            )
            .into())
        }
    };

    let outcome = register::run(&ctx, &RegisterRequest { target, dry_run })?;

    if outcome.performed {
        output::success(&format!(
            "registered {} ({})",
            outcome.email, outcome.device_name
        ));
        output::kv("envelope", outcome.envelope_path.display());
    } else {
        output::header("dry run - nothing written");
        output::kv(
            "would register",
            format!("{} ({})", outcome.email, outcome.device_name),
        );
        output::kv("would write", outcome.envelope_path.display());
    }
    Ok(())
}
