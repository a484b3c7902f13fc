//! CI init command - one-time display of an automation key.

use crate::cli::output;
use crate::core::context::Ctx;
use crate::core::lifecycle::ci::{self, CiInitRequest};
use crate::error::{AccessError, Result};

pub fn execute() -> Result<()> {
    // The private key is displayed exactly once, so there must be a
    // human terminal on the other end before any state changes.
    if !atty::is(atty::Stream::Stdout) || !atty::is(atty::Stream::Stdin) {
        return Err(AccessError::TtyRequired.into());
    }

    let ctx = Ctx::discover()?;
    let outcome = ci::run(&ctx, &CiInitRequest::default())?;

    output::success(&format!("registered CI device {}", outcome.device));
    output::kv("public key", &outcome.public_key);
    println!();
    output::warn("the private key below is shown once and never stored:");
    show_secret(&outcome.secret_key)?;
    println!();
    output::dimmed("copy it into your CI secret store, then pipe it to:");
    output::dimmed("  kanuka decrypt --key-stdin");
    Ok(())
}

/// Write the secret straight to the controlling terminal so it cannot
/// land in a redirected stdout.
#[cfg(unix)]
fn show_secret(secret: &str) -> Result<()> {
    use std::io::Write;
    let mut tty = std::fs::OpenOptions::new()
        .write(true)
        .open("/dev/tty")
        .map_err(|_| AccessError::TtyRequired)?;
    writeln!(tty, "{}", secret)?;
    Ok(())
}

#[cfg(not(unix))]
fn show_secret(secret: &str) -> Result<()> {
    println!("{}", secret);
    Ok(())
}
