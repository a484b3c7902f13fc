//! Error types.
//!
//! One top-level [`Error`] wraps a closed set of sub-enums so callers can
//! match exhaustively on the condition they care about instead of string
//! matching. Expected, user-actionable kinds are mapped to a message plus
//! a remedial hint at the binary boundary in `main.rs`.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for all kanuka operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Project and user configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("not a kanuka project (no .kanuka directory found)")]
    NotInitialized,

    #[error("invalid project config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to read config: {0}")]
    ReadFile(std::io::Error),

    #[error("no user identity configured")]
    MissingUser,

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Key store errors: public keys, envelopes, private keys on disk.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no public key for device {0}")]
    PublicKeyNotFound(String),

    #[error("no key envelope for device {0}")]
    EnvelopeNotFound(String),

    #[error("no private key found at {0}")]
    NoPrivateKey(String),

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("failed to read key material: {0}")]
    ReadFailed(std::io::Error),

    #[error("failed to write key material: {0}")]
    WriteFailed(std::io::Error),
}

/// Cryptographic failures.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("failed to unwrap content key: {0}")]
    KeyDecryptFailed(String),

    #[error("decryption failed: {0}")]
    DecryptFailed(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("armor encoding failed: {0}")]
    ArmorFailed(String),
}

/// Membership and target-resolution errors for lifecycle operations.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("you have no active key envelope in this project")]
    NoAccess,

    #[error("no matching device: {0}")]
    TargetNotFound(String),

    #[error("{email} has {count} devices; pass a device name to pick one")]
    AmbiguousTarget { email: String, count: usize },

    #[error("{0} already has an active device in this project")]
    AlreadyActive(String),

    #[error("a pending device named {0} already exists (use --force to replace it)")]
    PendingExists(String),

    #[error("a CI device is already registered for this project")]
    CiAlreadyConfigured,

    #[error("an interactive terminal is required for this operation")]
    TtyRequired,
}

/// Secret-file resolution errors.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("no matching secret files found")]
    NoFilesFound,

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file type: {0}")]
    InvalidFileType(String),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}
