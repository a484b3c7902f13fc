//! Kanuka - share encrypted secrets inside a version-controlled repo.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Thin command adapter (prompts, output, clap)
//! └── core/             # The lifecycle engine
//!     ├── config        # Project registry + per-user config
//!     ├── crypto        # Envelope wrap/unwrap, file AEAD
//!     ├── keystore      # public_keys/ and secrets/ layout
//!     ├── identity      # Per-machine private keys
//!     ├── context       # Immutable per-invocation execution context
//!     ├── lifecycle/    # init, create, register, revoke, rotate,
//!     │                 # sync, clean, encrypt/decrypt, ci-init
//!     ├── access        # active/pending/orphan classification, doctor
//!     ├── audit         # Append-only JSON-lines audit trail
//!     └── files         # Tracked secret file discovery
//! ```
//!
//! Every collaborator device owns an age keypair; a single symmetric
//! content-key is distributed as one age envelope per device and
//! encrypts the tracked secret files (XChaCha20-Poly1305). Revocation
//! rotates the envelopes; `sync` re-encrypts the files as well.

pub mod cli;
pub mod core;
pub mod error;
