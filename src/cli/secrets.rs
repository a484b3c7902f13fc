//! Encrypt/decrypt commands.

use crate::cli::output;
use crate::core::context::Ctx;
use crate::core::identity::DeviceIdentity;
use crate::core::lifecycle::secrets::{self, SecretsOutcome, SecretsRequest};
use crate::error::Result;

pub fn encrypt(paths: Vec<String>, dry_run: bool, key_stdin: bool) -> Result<()> {
    let ctx = Ctx::discover()?;
    let request = build_request(paths, dry_run, key_stdin)?;
    let outcome = secrets::encrypt(&ctx, &request)?;
    render(&outcome, "encrypted");
    Ok(())
}

pub fn decrypt(paths: Vec<String>, dry_run: bool, key_stdin: bool) -> Result<()> {
    let ctx = Ctx::discover()?;
    let request = build_request(paths, dry_run, key_stdin)?;
    let outcome = secrets::decrypt(&ctx, &request)?;
    render(&outcome, "decrypted");
    Ok(())
}

fn build_request(patterns: Vec<String>, dry_run: bool, key_stdin: bool) -> Result<SecretsRequest> {
    let identity = if key_stdin {
        Some(DeviceIdentity::from_reader(std::io::stdin().lock())?)
    } else {
        None
    };
    Ok(SecretsRequest {
        patterns,
        dry_run,
        identity,
    })
}

fn render(outcome: &SecretsOutcome, verb: &str) {
    if outcome.performed {
        for mapping in &outcome.mappings {
            output::list_item(&format!(
                "{} -> {}",
                mapping.source.display(),
                mapping.dest.display()
            ));
        }
        output::success(&format!("{} {} file(s)", verb, outcome.mappings.len()));
    } else {
        output::header("dry run - nothing written");
        for mapping in &outcome.mappings {
            let overwrite = if mapping.overwrite { " (overwrite)" } else { "" };
            output::list_item(&format!(
                "{} -> {}{}",
                mapping.source.display(),
                mapping.dest.display(),
                overwrite
            ));
        }
    }
}
