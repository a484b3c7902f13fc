//! Doctor command - project health report.

use crate::cli::output;
use crate::core::access::{self, CheckLevel};
use crate::core::context::Ctx;
use crate::error::Result;

/// Run all health checks.
///
/// Exit code: 0 clean, 1 warnings only, 2 at least one error.
pub fn execute() -> Result<i32> {
    let ctx = Ctx::discover()?;
    let checks = access::health_checks(&ctx)?;

    for check in &checks {
        match check.level {
            CheckLevel::Ok => output::success(&check.message),
            CheckLevel::Warning => output::warn(&check.message),
            CheckLevel::Error => output::error(&check.message),
        }
    }

    let worst = checks
        .iter()
        .map(|c| c.level)
        .max()
        .unwrap_or(CheckLevel::Ok);
    Ok(match worst {
        CheckLevel::Ok => 0,
        CheckLevel::Warning => 1,
        CheckLevel::Error => 2,
    })
}
