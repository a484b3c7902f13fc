//! Rotate command - re-wrap a fresh content key for active devices.

use crate::cli::output;
use crate::core::context::Ctx;
use crate::core::lifecycle::rotate::{self, RotateRequest};
use crate::error::Result;

pub fn execute(dry_run: bool) -> Result<()> {
    let ctx = Ctx::discover()?;
    let outcome = rotate::run(&ctx, &RotateRequest { dry_run })?;

    if outcome.performed {
        output::success(&format!(
            "rotated content key for {} device(s)",
            outcome.devices.len()
        ));
        output::dimmed("secret files still use the previous key until the next encrypt or sync");
    } else {
        output::header("dry run - nothing written");
        output::kv("envelopes to re-wrap", outcome.devices.len());
    }
    Ok(())
}
