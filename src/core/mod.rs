//! Core library components.
//!
//! The envelope-encryption key-lifecycle engine: identity and key
//! storage, the crypto layer, lifecycle operations, audit trail and
//! consistency checking. Terminal-free by design; the `cli` module is
//! the only consumer of user-facing prompts and output.

pub mod access;
pub mod audit;
pub mod config;
pub mod constants;
pub mod context;
pub mod crypto;
pub mod files;
pub mod identity;
pub mod keystore;
pub mod lifecycle;
