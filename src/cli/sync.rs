//! Sync command - full re-key of envelopes and tracked files.

use crate::cli::output;
use crate::core::context::Ctx;
use crate::core::lifecycle::sync::{self, SyncRequest};
use crate::error::Result;

pub fn execute(dry_run: bool) -> Result<()> {
    let ctx = Ctx::discover()?;
    let outcome = sync::run(&ctx, &SyncRequest { dry_run })?;

    if outcome.performed {
        output::success(&format!(
            "re-keyed {} file(s) for {} device(s)",
            outcome.files.len(),
            outcome.devices.len()
        ));
    } else {
        output::header("dry run - nothing written");
        output::kv("files to re-encrypt", outcome.files.len());
        output::kv("envelopes to re-wrap", outcome.devices.len());
    }
    Ok(())
}
