//! Kanuka - team secrets manager with per-device envelope encryption.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kanuka::cli::{execute, output, Cli};
use kanuka::error::{AccessError, ConfigError, Error, StoreError};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env("KANUKA_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("kanuka=debug")
        } else {
            EnvFilter::new("kanuka=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time())
        .init();

    match execute(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let suggestion = match &e {
                Error::Config(ConfigError::NotInitialized) => Some("run: kanuka init"),
                Error::Config(ConfigError::MissingUser) => {
                    Some("pass --email to init or create")
                }
                Error::Store(StoreError::NoPrivateKey(_)) => Some("run: kanuka create"),
                Error::Access(AccessError::NoAccess) => {
                    Some("ask an active device to run: kanuka register --email <you>")
                }
                Error::Access(AccessError::PendingExists(_)) => {
                    Some("re-run with --force to replace it")
                }
                _ => None,
            };

            output::error(&e.to_string());
            if let Some(hint) = suggestion {
                output::hint(hint);
            }
            std::process::exit(1);
        }
    }
}
