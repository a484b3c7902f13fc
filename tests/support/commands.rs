//! Command helper methods for Test.

use std::path::Path;
use std::process::Output;

use assert_cmd::Command;

use super::Test;

impl Test {
    /// Create a kanuka command running as the first user.
    pub fn cmd(&self) -> Command {
        self.cmd_as(self.home.path())
    }

    /// Create a kanuka command running as the user owning `home`.
    pub fn cmd_as(&self, home: &Path) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("kanuka").expect("failed to find kanuka binary");
        cmd.env("HOME", home);
        // Windows uses USERPROFILE instead of HOME for home directory
        cmd.env("USERPROFILE", home);
        cmd.env("NO_COLOR", "1");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Shortcut for `kanuka init`.
    pub fn init_cmd(&self, email: &str, device: &str) -> Output {
        self.cmd()
            .args(["init", "--email", email, "--device", device])
            .output()
            .expect("failed to run kanuka init")
    }

    /// Shortcut for `kanuka create` as another user.
    pub fn create_as(&self, home: &Path, email: &str, device: &str) -> Output {
        self.cmd_as(home)
            .args(["create", "--email", email, "--device", device])
            .output()
            .expect("failed to run kanuka create")
    }

    /// Shortcut for `kanuka register --email`.
    pub fn register(&self, email: &str) -> Output {
        self.cmd()
            .args(["register", "--email", email])
            .output()
            .expect("failed to run kanuka register")
    }

    /// Shortcut for `kanuka register --email --device`.
    pub fn register_device(&self, email: &str, device: &str) -> Output {
        self.cmd()
            .args(["register", "--email", email, "--device", device])
            .output()
            .expect("failed to run kanuka register")
    }

    /// Shortcut for `kanuka revoke --email --yes`.
    pub fn revoke(&self, email: &str) -> Output {
        self.cmd()
            .args(["revoke", "--email", email, "--yes"])
            .output()
            .expect("failed to run kanuka revoke")
    }

    /// Shortcut for `kanuka rotate`.
    pub fn rotate(&self) -> Output {
        self.cmd()
            .arg("rotate")
            .output()
            .expect("failed to run kanuka rotate")
    }

    /// Shortcut for `kanuka sync`.
    pub fn sync(&self) -> Output {
        self.cmd()
            .arg("sync")
            .output()
            .expect("failed to run kanuka sync")
    }

    /// Shortcut for `kanuka access --json`.
    pub fn access_json(&self) -> Output {
        self.cmd()
            .args(["access", "--json"])
            .output()
            .expect("failed to run kanuka access")
    }

    /// Shortcut for `kanuka clean --force`.
    pub fn clean_force(&self) -> Output {
        self.cmd()
            .args(["clean", "--force"])
            .output()
            .expect("failed to run kanuka clean")
    }

    /// Shortcut for `kanuka encrypt`.
    pub fn encrypt(&self, paths: &[&str]) -> Output {
        let mut cmd = self.cmd();
        cmd.arg("encrypt");
        for path in paths {
            cmd.arg(path);
        }
        cmd.output().expect("failed to run kanuka encrypt")
    }

    /// Shortcut for `kanuka decrypt` as a given user.
    pub fn decrypt_as(&self, home: &Path, paths: &[&str]) -> Output {
        let mut cmd = self.cmd_as(home);
        cmd.arg("decrypt");
        for path in paths {
            cmd.arg(path);
        }
        cmd.output().expect("failed to run kanuka decrypt")
    }

    /// Shortcut for `kanuka decrypt`.
    pub fn decrypt(&self, paths: &[&str]) -> Output {
        self.decrypt_as(self.home.path(), paths)
    }

    /// Shortcut for `kanuka doctor`.
    pub fn doctor(&self) -> Output {
        self.cmd()
            .arg("doctor")
            .output()
            .expect("failed to run kanuka doctor")
    }

    /// Shortcut for `kanuka log --json`.
    pub fn log_json(&self, extra: &[&str]) -> Output {
        let mut cmd = self.cmd();
        cmd.args(["log", "--json"]);
        for arg in extra {
            cmd.arg(arg);
        }
        cmd.output().expect("failed to run kanuka log")
    }
}
