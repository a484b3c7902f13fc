//! Access command - classify every device UUID.

use crate::cli::output;
use crate::core::access::AccessReport;
use crate::core::context::Ctx;
use crate::error::Result;

pub fn execute(json: bool) -> Result<()> {
    let ctx = Ctx::discover()?;
    let registry = ctx.registry()?;
    let report = AccessReport::gather(&ctx.keystore(), &registry)?;

    if json {
        let entries: Vec<serde_json::Value> = report
            .entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "uuid": e.uuid,
                    "state": e.state.to_string(),
                    "email": e.record.as_ref().map(|r| r.email.clone()),
                    "device": e.record.as_ref().map(|r| r.name.clone()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries).unwrap());
        return Ok(());
    }

    if report.entries.is_empty() {
        output::dimmed("no devices");
        return Ok(());
    }

    output::header(&format!("{} ({})", registry.project.name, registry.project.uuid));
    for entry in &report.entries {
        let who = entry
            .record
            .as_ref()
            .map(|r| format!("{} ({})", r.email, r.name))
            .unwrap_or_else(|| "<unregistered>".to_string());
        output::list_item(&format!("{:<8} {}  {}", entry.state.to_string(), entry.uuid, who));
    }
    Ok(())
}
