use std::borrow::Cow;

use colored::Colorize;
use tracing::debug;

const FALLBACK_HOST: &str = "localhost";

/// Renders `user@host:path$ ` prompts.
#[derive(Debug, Clone)]
pub struct Prompt {
    user: String,
    host: String,
    colorize: bool,
}

impl Prompt {
    pub fn new(user: impl Into<String>, host: impl Into<String>, colorize: bool) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            colorize,
        }
    }

    /// Picks up the user and host names of the machine running the shell.
    pub fn detect(colorize: bool) -> Self {
        let user = whoami::username();
        let host = hostname::get()
            .inspect_err(|e| debug!("Failed to read the hostname: {}", e))
            .ok()
            .map(|name| name.to_string_lossy().trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_HOST.to_string());

        Self::new(user, host, colorize)
    }

    pub fn render(&self, current_path: &str, home: &str) -> String {
        let identity = format!("{}@{}", self.user, self.host);
        let location = abbreviate_home(current_path, home);

        if self.colorize {
            format!("{}:{}$ ", identity.green().bold(), location.blue().bold())
        } else {
            format!("{identity}:{location}$ ")
        }
    }
}

/// Replaces a leading `home` component with `~`.
fn abbreviate_home<'a>(path: &'a str, home: &str) -> Cow<'a, str> {
    match path.strip_prefix(home) {
        Some("") => Cow::Borrowed("~"),
        Some(rest) if rest.starts_with('/') && home != "/" => Cow::Owned(format!("~{rest}")),
        _ => Cow::Borrowed(path),
    }
}
