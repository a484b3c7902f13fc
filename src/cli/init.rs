//! Init command - set up a project in the current directory.

use crate::cli::{output, prompt};
use crate::core::context::Ctx;
use crate::core::lifecycle::init::{self, InitOutcome, InitRequest};
use crate::error::Result;

pub fn execute(name: Option<String>, email: Option<String>, device: Option<String>) -> Result<()> {
    let user = prompt::ensure_user(email)?;
    let cwd = std::env::current_dir()?;
    let ctx = Ctx::uninitialized(&cwd, user);

    let outcome = init::run(
        &ctx,
        &InitRequest {
            project_name: name,
            device_name: device,
        },
    )?;

    match outcome {
        InitOutcome::AlreadyInitialized => {
            output::warn("already initialized (.kanuka exists); nothing to do");
        }
        InitOutcome::Created {
            project,
            device,
            device_name,
        } => {
            output::success("initialized kanuka project");
            output::kv("project", project);
            output::kv("device", format!("{} ({})", device_name, device));
            output::dimmed("teammates can now run: kanuka create");
        }
    }
    Ok(())
}
