//! Interactive prompt helpers.
//!
//! The engine never talks to a terminal; these functions are what the
//! CLI passes in as callbacks, and they degrade to non-interactive
//! defaults when stdin is not a TTY.

use dialoguer::{Confirm, Input};

use crate::core::config::UserConfig;
use crate::error::{ConfigError, Result};

/// Load the user config, bootstrapping it on first use.
///
/// Prefers the `--email` flag, then an interactive prompt; without a
/// terminal the caller gets `ConfigError::MissingUser`.
pub fn ensure_user(email: Option<String>) -> Result<UserConfig> {
    if UserConfig::exists() || email.is_some() {
        return UserConfig::load_or_create(email.as_deref(), None);
    }

    if !atty::is(atty::Stream::Stdin) {
        return Err(ConfigError::MissingUser.into());
    }

    let email: String = Input::new()
        .with_prompt("your email")
        .interact_text()
        .map_err(|e| std::io::Error::other(e))?;
    UserConfig::load_or_create(Some(email.trim()), None)
}

/// Ask a yes/no question; "no" when stdin is not interactive.
pub fn confirm(question: &str) -> bool {
    if !atty::is(atty::Stream::Stdin) {
        return false;
    }
    Confirm::new()
        .with_prompt(question)
        .default(false)
        .interact()
        .unwrap_or(false)
}
