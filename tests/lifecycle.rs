//! Lifecycle integration tests: init, create, register.

mod support;
use support::{Test, ALICE, BOB};

use std::fs;

/// UUID stems of the files under a project subdirectory.
fn uuid_stems(t: &Test, rel: &str) -> Vec<String> {
    let dir = t.path(rel);
    if !dir.exists() {
        return Vec::new();
    }
    let mut stems: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            e.path()
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
        })
        .collect();
    stems.sort();
    stems
}

// --- init ---

#[test]
fn test_init_creates_layout_with_one_active_device() {
    let t = Test::init();

    assert!(t.path(".kanuka/public_keys").is_dir());
    assert!(t.path(".kanuka/secrets").is_dir());
    assert!(t.path(".kanuka/config.toml").is_file());

    // Exactly one public key and one envelope, sharing the same UUID.
    let keys = uuid_stems(&t, ".kanuka/public_keys");
    let envelopes = uuid_stems(&t, ".kanuka/secrets");
    assert_eq!(keys.len(), 1);
    assert_eq!(keys, envelopes);

    // Registry lists that one device.
    let config = String::from_utf8(t.read(".kanuka/config.toml")).unwrap();
    assert!(config.contains(&format!("[devices.{}]", keys[0])));
    assert!(config.contains(ALICE));
}

#[test]
fn test_init_twice_is_a_reported_no_op() {
    let t = Test::init();
    let registry_before = t.read(".kanuka/config.toml");

    let output = t.init_cmd(ALICE, "laptop");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("already initialized"));

    assert_eq!(t.read(".kanuka/config.toml"), registry_before);
}

#[test]
fn test_init_writes_gitignore_entries() {
    let t = Test::init();
    let gitignore = String::from_utf8(t.read(".gitignore")).unwrap();
    assert!(gitignore.lines().any(|l| l == ".env"));
    assert!(gitignore.lines().any(|l| l == "!*.kanuka"));
}

#[test]
fn test_commands_require_initialization() {
    let t = Test::new();
    // Write a user config so the failure is about the project, not the user.
    let output = t.init_cmd(ALICE, "laptop");
    assert!(output.status.success());
    fs::remove_dir_all(t.path(".kanuka")).unwrap();

    let output = t.rotate();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not a kanuka project"));
    assert!(stderr.contains("kanuka init"));
}

// --- create ---

#[test]
fn test_create_publishes_a_pending_device() {
    let t = Test::init();
    let bob_home = t.new_home();

    let output = t.create_as(bob_home.path(), BOB, "desktop");
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    // Two public keys now, but still only one envelope.
    assert_eq!(uuid_stems(&t, ".kanuka/public_keys").len(), 2);
    assert_eq!(uuid_stems(&t, ".kanuka/secrets").len(), 1);

    let access = String::from_utf8(t.access_json().stdout).unwrap();
    let entries: serde_json::Value = serde_json::from_str(&access).unwrap();
    let bob = entries
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["email"] == BOB)
        .expect("bob should be listed");
    assert_eq!(bob["state"], "pending");
}

#[test]
fn test_create_twice_needs_force() {
    let t = Test::init();
    let bob_home = t.new_home();

    assert!(t.create_as(bob_home.path(), BOB, "desktop").status.success());

    let output = t.create_as(bob_home.path(), BOB, "desktop");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--force"));

    let output = t
        .cmd_as(bob_home.path())
        .args(["create", "--email", BOB, "--device", "desktop", "--force"])
        .output()
        .unwrap();
    assert!(output.status.success());

    // Still exactly one pending key for bob: the replacement.
    assert_eq!(uuid_stems(&t, ".kanuka/public_keys").len(), 2);
}

#[test]
fn test_create_rejects_an_already_active_device_name() {
    let t = Test::init();
    let output = t
        .cmd()
        .args(["create", "--device", "laptop", "--force"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already has an active device"));
}

// --- register ---

#[test]
fn test_register_activates_pending_device() {
    let t = Test::init();
    t.write(".env", "SECRET=one\n");
    assert!(t.encrypt(&[]).status.success());

    let bob_home = t.new_home();
    assert!(t.create_as(bob_home.path(), BOB, "desktop").status.success());

    // Bob cannot decrypt while pending.
    assert!(!t.decrypt_as(bob_home.path(), &[]).status.success());

    let output = t.register(BOB);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(uuid_stems(&t, ".kanuka/secrets").len(), 2);

    // Bob's envelope now unwraps to the current content key: he decrypts.
    fs::remove_file(t.path(".env")).unwrap();
    assert!(t.decrypt_as(bob_home.path(), &[]).status.success());
    assert_eq!(t.read(".env"), b"SECRET=one\n");
}

#[test]
fn test_register_unknown_email_fails_cleanly() {
    let t = Test::init();
    let before = Test::snapshot(t.dir.path());

    let output = t.register("nobody@example.com");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no matching device"));

    assert_eq!(Test::snapshot(t.dir.path()), before);
}

#[test]
fn test_register_ambiguous_email_requires_device_name() {
    let t = Test::init();
    let home_a = t.new_home();
    let home_b = t.new_home();
    assert!(t.create_as(home_a.path(), BOB, "desktop").status.success());
    assert!(t.create_as(home_b.path(), BOB, "tablet").status.success());

    let output = t.register(BOB);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("device name"));

    let output = t.register_device(BOB, "tablet");
    assert!(output.status.success());
}

#[test]
fn test_register_fails_atomically_without_access() {
    let t = Test::init();
    let bob_home = t.new_home();
    let carol_home = t.new_home();
    assert!(t.create_as(bob_home.path(), BOB, "desktop").status.success());
    assert!(t
        .create_as(carol_home.path(), "carol@example.com", "laptop")
        .status
        .success());

    let before = Test::snapshot(t.dir.path());

    // Bob is pending: he has no envelope, so he cannot grant access.
    let output = t
        .cmd_as(bob_home.path())
        .args(["register", "--email", "carol@example.com"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no active key envelope"));

    assert_eq!(Test::snapshot(t.dir.path()), before);
}

#[test]
fn test_register_dry_run_writes_nothing() {
    let t = Test::init();
    let bob_home = t.new_home();
    assert!(t.create_as(bob_home.path(), BOB, "desktop").status.success());

    let before = Test::snapshot(t.dir.path());

    let output = t
        .cmd()
        .args(["register", "--email", BOB, "--dry-run"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("dry run"));

    assert_eq!(Test::snapshot(t.dir.path()), before);
}

#[test]
fn test_register_from_inline_key_text() {
    let t = Test::init();

    // A well-formed age public key with no pre-existing device.
    let key = "age1ql3z7hjy54pw3hyww5ayyfg7zqgvc7w3j2elw8zmrj2kg5sfn9aqmcac8p";
    let output = t
        .cmd()
        .args(["register", "--key", key, "--email", "ci@example.com"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert_eq!(uuid_stems(&t, ".kanuka/public_keys").len(), 2);
    assert_eq!(uuid_stems(&t, ".kanuka/secrets").len(), 2);

    let config = String::from_utf8(t.read(".kanuka/config.toml")).unwrap();
    assert!(config.contains("ci@example.com"));
}
