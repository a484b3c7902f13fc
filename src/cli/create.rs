//! Create command - join a project as a pending device.

use crate::cli::{output, prompt};
use crate::core::context::Ctx;
use crate::core::lifecycle::create::{self, CreateRequest};
use crate::error::Result;

pub fn execute(email: Option<String>, device: Option<String>, force: bool) -> Result<()> {
    prompt::ensure_user(email)?;
    let ctx = Ctx::discover()?;

    let outcome = create::run(
        &ctx,
        &CreateRequest {
            device_name: device,
            force,
        },
    )?;

    if let Some(replaced) = outcome.replaced {
        output::warn(&format!("replaced pending device {}", replaced));
    }
    output::success(&format!(
        "created pending device {} ({})",
        outcome.device_name, outcome.device
    ));
    output::kv("public key", &outcome.public_key);
    output::dimmed("an active device must now run: kanuka register --email <you>");
    Ok(())
}
