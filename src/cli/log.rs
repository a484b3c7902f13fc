//! Log command - query the audit trail.

use chrono::{DateTime, NaiveDate, Utc};

use crate::cli::output;
use crate::core::audit::{AuditFilter, AuditLog, Operation};
use crate::core::context::Ctx;
use crate::error::{ConfigError, Result};

pub fn execute(
    user: Option<String>,
    operation: Option<String>,
    since: Option<String>,
    until: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = Ctx::discover()?;

    let operation = operation
        .map(|s| {
            s.parse::<Operation>()
                .map_err(ConfigError::InvalidValue)
        })
        .transpose()?;

    let filter = AuditFilter {
        actor: user,
        operation,
        since: since.map(|s| parse_date(&s, false)).transpose()?,
        until: until.map(|s| parse_date(&s, true)).transpose()?,
    };

    let entries = AuditLog::new(ctx.audit_path()).query(&filter)?;

    if json {
        for entry in &entries {
            println!("{}", serde_json::to_string(entry).unwrap());
        }
        return Ok(());
    }

    if entries.is_empty() {
        output::dimmed("no matching audit entries");
        return Ok(());
    }

    for entry in &entries {
        let mut line = format!(
            "{}  {:<9} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.operation.to_string(),
            entry.actor
        );
        if let Some(target) = &entry.target {
            line.push_str(&format!("  -> {}", target));
        }
        if let Some(count) = entry.files_changed {
            line.push_str(&format!("  [{} file(s)]", count));
        }
        output::list_item(&line);
    }
    Ok(())
}

/// Accept RFC 3339 timestamps or bare dates; a bare `--until` date means
/// the end of that day.
fn parse_date(input: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| ConfigError::InvalidValue(format!("unparsable date: {}", input)))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59).unwrap()
    } else {
        date.and_hms_opt(0, 0, 0).unwrap()
    };
    Ok(time.and_utc())
}
