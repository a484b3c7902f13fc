//! Command-line interface.
//!
//! A thin adapter over the lifecycle engine: parses arguments, resolves
//! the execution context, renders outcomes, and supplies the interactive
//! prompts the engine requests through callbacks. No business logic
//! lives here.

pub mod access;
pub mod ci;
pub mod clean;
pub mod completions;
pub mod create;
pub mod doctor;
pub mod init;
pub mod log;
pub mod output;
pub mod prompt;
pub mod register;
pub mod revoke;
pub mod rotate;
pub mod secrets;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kanuka - share encrypted secrets in a version-controlled repository.
#[derive(Parser)]
#[command(
    name = "kanuka",
    about = "Team secrets manager with per-device envelope encryption",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Initialize a kanuka project in the current directory
    Init {
        /// Project display name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
        /// Your email (stored in the user config on first use)
        #[arg(long)]
        email: Option<String>,
        /// Device name for this machine
        #[arg(long)]
        device: Option<String>,
    },

    /// Join a project: publish a pending device awaiting registration
    Create {
        /// Your email (stored in the user config on first use)
        #[arg(long)]
        email: Option<String>,
        /// Device name for this machine
        #[arg(long)]
        device: Option<String>,
        /// Replace an existing pending registration with the same name
        #[arg(short, long)]
        force: bool,
    },

    /// Grant a device access by wrapping the content key for it
    Register {
        /// Target email (registry lookup)
        #[arg(long)]
        email: Option<String>,
        /// Device name, when the email maps to several devices
        #[arg(long)]
        device: Option<String>,
        /// Path to a public key file instead of an email lookup
        #[arg(long, conflicts_with = "key")]
        file: Option<PathBuf>,
        /// Inline public key text (requires --email)
        #[arg(long, requires = "email")]
        key: Option<String>,
        /// Report intended effects without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Revoke devices and rotate the content key for the rest
    Revoke {
        /// Target email (all of their devices unless --device is given)
        #[arg(long)]
        email: Option<String>,
        /// Only the device with this name
        #[arg(long)]
        device: Option<String>,
        /// Target a single envelope file instead of an email
        #[arg(long, conflicts_with = "email")]
        file: Option<PathBuf>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Report intended effects without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate a new content key and re-wrap every active envelope
    Rotate {
        /// Report intended effects without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Full re-key: rotate and re-encrypt every tracked secret file
    Sync {
        /// Report file/device counts without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show every device as active, pending or orphan
    Access {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove orphan envelopes left behind by interrupted operations
    Clean {
        /// Delete without asking
        #[arg(short, long)]
        force: bool,
        /// List orphans without deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Encrypt tracked secret files with the current content key
    Encrypt {
        /// Files, directories or glob patterns (default: all tracked files)
        paths: Vec<String>,
        /// Show source -> destination mappings without writing
        #[arg(long)]
        dry_run: bool,
        /// Read the private key from stdin instead of local disk
        #[arg(long)]
        key_stdin: bool,
    },

    /// Decrypt tracked secret files
    Decrypt {
        /// Files, directories or glob patterns (default: all .kanuka files)
        paths: Vec<String>,
        /// Show source -> destination mappings without writing
        #[arg(long)]
        dry_run: bool,
        /// Read the private key from stdin instead of local disk
        #[arg(long)]
        key_stdin: bool,
    },

    /// Register an automation device whose key is shown once, never stored
    CiInit,

    /// Cross-check registry, public keys and envelopes
    Doctor,

    /// Quick project overview
    Status,

    /// Show the audit log
    Log {
        /// Filter by acting user email
        #[arg(long)]
        user: Option<String>,
        /// Filter by operation name
        #[arg(long)]
        operation: Option<String>,
        /// Entries at or after this date (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// Entries at or before this date (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        until: Option<String>,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Execute a command, returning the process exit code.
pub fn execute(command: Command) -> crate::error::Result<i32> {
    match command {
        Command::Init {
            name,
            email,
            device,
        } => init::execute(name, email, device).map(|_| 0),
        Command::Create {
            email,
            device,
            force,
        } => create::execute(email, device, force).map(|_| 0),
        Command::Register {
            email,
            device,
            file,
            key,
            dry_run,
        } => register::execute(email, device, file, key, dry_run).map(|_| 0),
        Command::Revoke {
            email,
            device,
            file,
            yes,
            dry_run,
        } => revoke::execute(email, device, file, yes, dry_run).map(|_| 0),
        Command::Rotate { dry_run } => rotate::execute(dry_run).map(|_| 0),
        Command::Sync { dry_run } => sync::execute(dry_run).map(|_| 0),
        Command::Access { json } => access::execute(json).map(|_| 0),
        Command::Clean { force, dry_run } => clean::execute(force, dry_run).map(|_| 0),
        Command::Encrypt {
            paths,
            dry_run,
            key_stdin,
        } => secrets::encrypt(paths, dry_run, key_stdin).map(|_| 0),
        Command::Decrypt {
            paths,
            dry_run,
            key_stdin,
        } => secrets::decrypt(paths, dry_run, key_stdin).map(|_| 0),
        Command::CiInit => ci::execute().map(|_| 0),
        Command::Doctor => doctor::execute(),
        Command::Status => status::execute().map(|_| 0),
        Command::Log {
            user,
            operation,
            since,
            until,
            json,
        } => log::execute(user, operation, since, until, json).map(|_| 0),
        Command::Completions { shell } => {
            completions::execute(shell);
            Ok(0)
        }
    }
}
