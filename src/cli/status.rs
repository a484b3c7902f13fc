//! Status command - quick project overview.

use crate::cli::output;
use crate::core::access::AccessReport;
use crate::core::context::Ctx;
use crate::error::Result;

pub fn execute() -> Result<()> {
    let ctx = Ctx::discover()?;
    let registry = ctx.registry()?;
    let report = AccessReport::gather(&ctx.keystore(), &registry)?;

    output::header(&registry.project.name);
    output::kv("project", registry.project.uuid);
    output::kv("active", report.active().count());
    output::kv("pending", report.pending().count());
    output::kv("orphans", report.orphans().count());

    match ctx.unwrap_content_key(&registry, None) {
        Ok(_) => output::success("this machine can decrypt"),
        Err(_) => output::warn("this machine cannot decrypt"),
    }
    Ok(())
}
