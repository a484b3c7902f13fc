//! Lifecycle operations.
//!
//! Each operation takes the execution context plus a request value and
//! returns a structured outcome for the CLI adapter to render. Mutating
//! operations support dry-run; every precondition is checked before the
//! first write, so a failed precondition leaves the filesystem untouched.
//!
//! The engine is terminal-free: where an operation needs user
//! confirmation it calls a caller-supplied [`Confirm`] hook.

pub mod ci;
pub mod clean;
pub mod create;
pub mod init;
pub mod register;
pub mod revoke;
pub mod rotate;
pub mod secrets;
pub mod sync;

/// Caller-supplied confirmation hook.
///
/// Receives a human-readable question and returns whether to proceed.
/// The CLI adapter backs this with an interactive prompt; tests and
/// `--yes`/`--force` paths pass a constant.
pub type Confirm<'a> = &'a dyn Fn(&str) -> bool;
