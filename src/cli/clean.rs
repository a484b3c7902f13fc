//! Clean command - remove orphan envelopes.

use crate::cli::{output, prompt};
use crate::core::context::Ctx;
use crate::core::lifecycle::clean::{self, CleanRequest};
use crate::error::Result;

pub fn execute(force: bool, dry_run: bool) -> Result<()> {
    let ctx = Ctx::discover()?;
    let outcome = clean::run(&ctx, &CleanRequest { force, dry_run }, &prompt::confirm)?;

    if outcome.orphans.is_empty() {
        output::success("no orphan envelopes");
        return Ok(());
    }

    for uuid in &outcome.orphans {
        output::list_item(&format!("orphan envelope {}", uuid));
    }

    if outcome.removed {
        output::success(&format!("removed {} orphan envelope(s)", outcome.orphans.len()));
    } else if outcome.declined {
        output::warn("aborted; nothing removed");
    } else if dry_run {
        output::header("dry run - nothing removed");
    }
    Ok(())
}
