//! Secret file discovery.
//!
//! Resolves the target sets for `encrypt`/`decrypt`/`sync`: explicit
//! paths, glob patterns, directories, or the default sweep of all tracked
//! files under the project root. The `.kanuka` metadata directory (and
//! `.git`) are always excluded.
//!
//! A file is *tracked* when it is a dotenv-style file (`.env`,
//! `.env.local`, ...) or already has an encrypted `<name>.kanuka` sibling.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::constants;
use crate::error::{FileError, Result};

/// Ciphertext path for a plaintext secret file (`.env` -> `.env.kanuka`).
pub fn encrypted_path(plaintext: &Path) -> PathBuf {
    let mut name = plaintext.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(constants::SECRET_EXT);
    plaintext.with_file_name(name)
}

/// Plaintext path for an encrypted secret file (`.env.kanuka` -> `.env`).
///
/// # Errors
///
/// Returns `FileError::InvalidFileType` when the path doesn't carry the
/// `.kanuka` extension.
pub fn plaintext_path(encrypted: &Path) -> Result<PathBuf> {
    let name = encrypted
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let suffix = format!(".{}", constants::SECRET_EXT);
    match name.strip_suffix(&suffix) {
        Some(stem) if !stem.is_empty() => Ok(encrypted.with_file_name(stem)),
        _ => Err(FileError::InvalidFileType(encrypted.display().to_string()).into()),
    }
}

fn is_dotenv(name: &str) -> bool {
    name == ".env" || (name.starts_with(".env.") && name != ".env.example")
}

fn is_excluded(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .map(|rel| {
            rel.components().any(|c| {
                let name = c.as_os_str().to_string_lossy();
                name == constants::KANUKA_DIR || name == ".git"
            })
        })
        .unwrap_or(false)
}

fn is_tracked_plaintext(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.ends_with(&format!(".{}", constants::SECRET_EXT)) {
        return false;
    }
    is_dotenv(name) || encrypted_path(path).exists()
}

fn is_secret_ciphertext(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(constants::SECRET_EXT)
}

fn walk_files(root: &Path, under: &Path) -> Vec<PathBuf> {
    WalkDir::new(under)
        .into_iter()
        .filter_entry(|e| !is_excluded(root, e.path()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || pattern.contains('[')
}

/// Resolve plaintext files to encrypt.
///
/// With no patterns, every tracked file under the root is selected.
/// Explicit file paths are taken as-is and must exist.
///
/// # Errors
///
/// `FileError::FileNotFound` for a missing explicit path,
/// `FileError::NoFilesFound` when nothing matches at all.
pub fn resolve_plaintext_targets(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut out = BTreeSet::new();

    if patterns.is_empty() {
        for file in walk_files(root, root) {
            if is_tracked_plaintext(&file) {
                out.insert(file);
            }
        }
    } else {
        for pattern in patterns {
            let candidate = root.join(pattern);
            if candidate.is_file() && is_secret_ciphertext(&candidate) {
                return Err(FileError::InvalidFileType(candidate.display().to_string()).into());
            }
            resolve_one(root, pattern, &mut out, &|p| is_tracked_plaintext(p))?;
        }
    }

    if out.is_empty() {
        return Err(FileError::NoFilesFound.into());
    }
    Ok(out.into_iter().collect())
}

/// Resolve encrypted files to decrypt.
///
/// With no patterns, every `.kanuka` file under the root (outside the
/// metadata directory) is selected. Explicit paths may name either the
/// ciphertext or its plaintext sibling.
///
/// # Errors
///
/// `FileError::FileNotFound` for a missing explicit path,
/// `FileError::NoFilesFound` when nothing matches at all.
pub fn resolve_ciphertext_targets(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut out = BTreeSet::new();

    if patterns.is_empty() {
        for file in walk_files(root, root) {
            if is_secret_ciphertext(&file) {
                out.insert(file);
            }
        }
    } else {
        for pattern in patterns {
            let candidate = root.join(pattern);
            // An explicit plaintext path stands in for its ciphertext sibling.
            if candidate.is_file() && !is_secret_ciphertext(&candidate) {
                let sibling = encrypted_path(&candidate);
                if sibling.exists() {
                    out.insert(sibling);
                    continue;
                }
                return Err(FileError::FileNotFound(sibling.display().to_string()).into());
            }
            if !candidate.exists() && !has_glob_chars(pattern) {
                let sibling = encrypted_path(&candidate);
                if sibling.exists() {
                    out.insert(sibling);
                    continue;
                }
            }
            resolve_one(root, pattern, &mut out, &|p| is_secret_ciphertext(p))?;
        }
    }

    if out.is_empty() {
        return Err(FileError::NoFilesFound.into());
    }
    Ok(out.into_iter().collect())
}

fn resolve_one(
    root: &Path,
    pattern: &str,
    out: &mut BTreeSet<PathBuf>,
    keep: &dyn Fn(&Path) -> bool,
) -> Result<()> {
    let candidate = root.join(pattern);

    if candidate.is_file() {
        if is_excluded(root, &candidate) {
            return Err(FileError::InvalidFileType(candidate.display().to_string()).into());
        }
        out.insert(candidate);
        return Ok(());
    }

    if candidate.is_dir() {
        for file in walk_files(root, &candidate) {
            if keep(&file) {
                out.insert(file);
            }
        }
        return Ok(());
    }

    if has_glob_chars(pattern) {
        let full = root.join(pattern);
        let full = full.to_string_lossy();
        for entry in glob::glob(&full).map_err(FileError::Pattern)? {
            let path = entry.map_err(|e| FileError::FileNotFound(e.to_string()))?;
            if path.is_file() && !is_excluded(root, &path) && keep(&path) {
                out.insert(path);
            }
        }
        return Ok(());
    }

    Err(FileError::FileNotFound(candidate.display().to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x").unwrap();
    }

    #[test]
    fn encrypted_and_plaintext_paths_are_inverse() {
        let enc = encrypted_path(Path::new("api/.env"));
        assert_eq!(enc, Path::new("api/.env.kanuka"));
        assert_eq!(plaintext_path(&enc).unwrap(), Path::new("api/.env"));
    }

    #[test]
    fn plaintext_path_rejects_non_kanuka_files() {
        assert!(plaintext_path(Path::new(".env")).is_err());
    }

    #[test]
    fn default_sweep_finds_dotenv_files_and_skips_metadata() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join(".env"));
        touch(&root.join("api/.env.local"));
        touch(&root.join("api/readme.md"));
        touch(&root.join(".env.example"));
        touch(&root.join(".kanuka/secrets/ignored.kanuka"));

        let targets = resolve_plaintext_targets(root, &[]).unwrap();
        assert_eq!(
            targets,
            vec![root.join(".env"), root.join("api/.env.local")]
        );
    }

    #[test]
    fn files_with_encrypted_siblings_are_tracked() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("config/secrets.json"));
        touch(&root.join("config/secrets.json.kanuka"));
        touch(&root.join("config/other.json"));

        let targets = resolve_plaintext_targets(root, &[]).unwrap();
        assert_eq!(targets, vec![root.join("config/secrets.json")]);
    }

    #[test]
    fn explicit_path_must_exist() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_plaintext_targets(tmp.path(), &["missing.env".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::File(FileError::FileNotFound(_))
        ));
    }

    #[test]
    fn glob_pattern_selects_tracked_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("a/.env"));
        touch(&root.join("b/.env"));
        touch(&root.join("b/notes.txt"));

        let targets = resolve_plaintext_targets(root, &["*/.env".to_string()]).unwrap();
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn ciphertext_sweep_excludes_envelopes_in_metadata_dir() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join(".env.kanuka"));
        touch(&root.join(".kanuka/secrets/device.kanuka"));

        let targets = resolve_ciphertext_targets(root, &[]).unwrap();
        assert_eq!(targets, vec![root.join(".env.kanuka")]);
    }

    #[test]
    fn decrypt_accepts_the_plaintext_name() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join(".env"));
        touch(&root.join(".env.kanuka"));

        let targets = resolve_ciphertext_targets(root, &[".env".to_string()]).unwrap();
        assert_eq!(targets, vec![root.join(".env.kanuka")]);
    }

    #[test]
    fn encrypting_ciphertext_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join(".env.kanuka"));

        let err = resolve_plaintext_targets(root, &[".env.kanuka".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::File(FileError::InvalidFileType(_))
        ));
    }

    #[test]
    fn empty_result_is_no_files_found() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_plaintext_targets(tmp.path(), &[]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::File(FileError::NoFilesFound)
        ));
    }
}
