//! Audit trail.
//!
//! Append-only JSON-lines log at `.kanuka/audit.log`. Every mutating
//! lifecycle operation appends exactly one entry; dry runs append nothing.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;

/// Operations recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Init,
    Create,
    Register,
    Revoke,
    Rotate,
    Sync,
    Clean,
    Encrypt,
    Decrypt,
    CiInit,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Init => "init",
            Operation::Create => "create",
            Operation::Register => "register",
            Operation::Revoke => "revoke",
            Operation::Rotate => "rotate",
            Operation::Sync => "sync",
            Operation::Clean => "clean",
            Operation::Encrypt => "encrypt",
            Operation::Decrypt => "decrypt",
            Operation::CiInit => "ci_init",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "init" => Ok(Operation::Init),
            "create" => Ok(Operation::Create),
            "register" => Ok(Operation::Register),
            "revoke" => Ok(Operation::Revoke),
            "rotate" => Ok(Operation::Rotate),
            "sync" => Ok(Operation::Sync),
            "clean" => Ok(Operation::Clean),
            "encrypt" => Ok(Operation::Encrypt),
            "decrypt" => Ok(Operation::Decrypt),
            "ci_init" | "ci-init" => Ok(Operation::CiInit),
            other => Err(format!("unknown operation: {}", other)),
        }
    }
}

/// A single audit log entry (one JSON line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    /// Acting user's email.
    pub actor: String,
    /// Acting device, when one is resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Uuid>,
    pub operation: Operation,
    /// Project-relative paths touched by the operation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// Target user or device for register/revoke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Devices affected by a rotation or revocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices_affected: Option<usize>,
    /// Secret files re-encrypted or removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_changed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEntry {
    pub fn new(operation: Operation, actor: &str, device: Option<Uuid>) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: actor.to_string(),
            device,
            operation,
            files: Vec::new(),
            target: None,
            devices_affected: None,
            files_changed: None,
            detail: None,
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    pub fn devices_affected(mut self, count: usize) -> Self {
        self.devices_affected = Some(count);
        self
    }

    pub fn files_changed(mut self, count: usize) -> Self {
        self.files_changed = Some(count);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Filter for querying the audit log.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub actor: Option<String>,
    pub operation: Option<Operation>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl AuditFilter {
    fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(actor) = &self.actor {
            if &entry.actor != actor {
                return false;
            }
        }
        if let Some(operation) = self.operation {
            if entry.operation != operation {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.timestamp > until {
                return false;
            }
        }
        true
    }
}

/// The project audit log.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one entry as a JSON line.
    pub fn append(&self, entry: &AuditEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Read every entry, oldest first. Unparsable lines are skipped
    /// with a warning so a merge-mangled log still yields its history.
    pub fn read_all(&self) -> Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let mut entries = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(line = idx + 1, error = %e, "skipping malformed audit entry"),
            }
        }
        Ok(entries)
    }

    /// Entries matching a filter, oldest first.
    pub fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect())
    }
}
