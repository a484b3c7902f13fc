//! Per-file encrypt/decrypt integration tests.

mod support;
use support::{Test, BOB};

use std::fs;

#[test]
fn test_encrypt_decrypt_round_trips_a_directory() {
    let t = Test::init();
    t.write("api/.env", "A=1\n");
    t.write("api/.env.staging", "B=2\n");
    t.write("api/nested/.env.local", "C=3\n");

    let output = t.encrypt(&["api"]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(t.path("api/.env.kanuka").exists());
    assert!(t.path("api/.env.staging.kanuka").exists());
    assert!(t.path("api/nested/.env.local.kanuka").exists());

    for rel in ["api/.env", "api/.env.staging", "api/nested/.env.local"] {
        fs::remove_file(t.path(rel)).unwrap();
    }

    assert!(t.decrypt(&["api"]).status.success());
    assert_eq!(t.read("api/.env"), b"A=1\n");
    assert_eq!(t.read("api/.env.staging"), b"B=2\n");
    assert_eq!(t.read("api/nested/.env.local"), b"C=3\n");
}

#[test]
fn test_encrypt_is_non_deterministic() {
    let t = Test::init();
    t.write(".env", "SECRET=value\n");

    assert!(t.encrypt(&[]).status.success());
    let first = t.read(".env.kanuka");

    assert!(t.encrypt(&[]).status.success());
    let second = t.read(".env.kanuka");

    assert_ne!(first, second, "re-encryption must produce fresh bytes");

    // Both decrypt to the same plaintext regardless.
    fs::remove_file(t.path(".env")).unwrap();
    assert!(t.decrypt(&[]).status.success());
    assert_eq!(t.read(".env"), b"SECRET=value\n");
}

#[test]
fn test_encrypt_dry_run_reports_without_writing() {
    let t = Test::init();
    t.write(".env", "SECRET=value\n");

    let before = Test::snapshot(t.dir.path());
    let output = t
        .cmd()
        .args(["encrypt", "--dry-run"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dry run"));
    assert!(stdout.contains(".env.kanuka"));

    assert_eq!(Test::snapshot(t.dir.path()), before);
}

#[test]
fn test_decrypt_dry_run_flags_overwrites() {
    let t = Test::init();
    t.write(".env", "SECRET=value\n");
    assert!(t.encrypt(&[]).status.success());

    // Plaintext still on disk: decrypt would overwrite it.
    let output = t
        .cmd()
        .args(["decrypt", "--dry-run"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("(overwrite)"));
}

#[test]
fn test_encrypt_without_matching_files_fails() {
    let t = Test::init();
    let output = t.encrypt(&[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no matching secret files"));
}

#[test]
fn test_explicit_missing_path_fails() {
    let t = Test::init();
    let output = t.encrypt(&["does-not-exist.env"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("file not found"));
}

#[test]
fn test_pending_device_cannot_decrypt() {
    let t = Test::init();
    t.write(".env", "SECRET=value\n");
    assert!(t.encrypt(&[]).status.success());

    let bob_home = t.new_home();
    assert!(t.create_as(bob_home.path(), BOB, "desktop").status.success());

    let output = t.decrypt_as(bob_home.path(), &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no active key envelope"));
    assert!(stderr.contains("kanuka register"));
}

#[test]
fn test_decrypt_with_piped_private_key() {
    let t = Test::init();
    t.write(".env", "SECRET=value\n");
    assert!(t.encrypt(&[]).status.success());
    fs::remove_file(t.path(".env")).unwrap();

    // Read alice's private key, then run from a home with no keys at all,
    // the way a CI job would.
    let key = read_private_key(&t);
    let bare_home = t.new_home();

    let output = t
        .cmd_as(bare_home.path())
        .args(["decrypt", "--key-stdin"])
        .write_stdin(key)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(t.read(".env"), b"SECRET=value\n");
}

#[test]
fn test_piped_garbage_key_is_rejected() {
    let t = Test::init();
    t.write(".env", "SECRET=value\n");
    assert!(t.encrypt(&[]).status.success());

    let output = t
        .cmd()
        .args(["decrypt", "--key-stdin"])
        .write_stdin("definitely not an age key")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid private key"));
}

#[test]
fn test_corrupt_ciphertext_fails_with_decrypt_error() {
    let t = Test::init();
    t.write(".env", "SECRET=value\n");
    assert!(t.encrypt(&[]).status.success());

    // Flip a byte near the end of the ciphertext.
    let mut bytes = t.read(".env.kanuka");
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(t.path(".env.kanuka"), bytes).unwrap();

    let output = t.decrypt(&[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("decryption failed"));
}

fn read_private_key(t: &Test) -> String {
    let keys_root = t.home.path().join(".kanuka/keys");
    let project_dir = fs::read_dir(&keys_root)
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.path().is_dir())
        .unwrap();
    let key_file = fs::read_dir(project_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.path().extension().map(|x| x == "key").unwrap_or(false))
        .unwrap();
    fs::read_to_string(key_file.path()).unwrap()
}
