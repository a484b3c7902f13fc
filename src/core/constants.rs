//! Constants used throughout kanuka.
//!
//! Centralizes magic strings and layout names.

/// Project metadata directory (relative to the project root).
pub const KANUKA_DIR: &str = ".kanuka";

/// Registry file inside the metadata directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Public key directory inside the metadata directory.
pub const PUBLIC_KEYS_DIR: &str = "public_keys";

/// Key envelope directory inside the metadata directory.
pub const SECRETS_DIR: &str = "secrets";

/// Audit log file inside the metadata directory.
pub const AUDIT_FILE: &str = "audit.log";

/// Extension shared by key envelopes and encrypted secret files.
pub const SECRET_EXT: &str = "kanuka";

/// Public key file extension.
pub const PUBKEY_EXT: &str = "pub";

/// Private key storage directory relative to HOME (~/.kanuka/keys).
pub const KEY_DIR: &str = ".kanuka/keys";

/// Per-user configuration file relative to HOME (~/.kanuka/config.toml).
pub const USER_CONFIG_FILE: &str = ".kanuka/config.toml";

/// Device name used by the automation (CI) device.
pub const CI_DEVICE_NAME: &str = "ci";

/// Magic header prepended to encrypted secret files.
pub const FILE_MAGIC: &[u8; 4] = b"knk1";

/// Content-key length in bytes (XChaCha20-Poly1305).
pub const CONTENT_KEY_LEN: usize = 32;

/// Gitignore entries to protect plaintext secrets.
pub const GITIGNORE_ENTRIES: &[&str] = &[".env", ".env.*", "!.env.example", "!*.kanuka"];
