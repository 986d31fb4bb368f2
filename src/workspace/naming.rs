//! Deterministic names for per-agent workspaces and logs.
//!
//! Names depend only on the agent name and the run's naming token, so a
//! caller that knows both can find (or remove) a workspace after the
//! supervisor has exited.

use std::path::{Path, PathBuf};

const SLUG_PREFIX: &str = "verify-";

/// Between agent and token. [`sanitize_component`] never emits a double
/// hyphen, so a slug splits back into exactly one agent/token pair.
const SLUG_SEPARATOR: &str = "--";

/// Generate the shared stem for an agent's workspace and log.
///
/// Format: `verify-{agent}--{token}`
/// Example: `verify-codex--20260226-143000`
pub fn run_slug(agent: &str, token: &str) -> String {
    format!(
        "{}{}{}{}",
        SLUG_PREFIX,
        sanitize_component(agent),
        SLUG_SEPARATOR,
        sanitize_component(token)
    )
}

/// Split a slug back into its sanitized `(agent, token)` parts.
///
/// Returns `None` for names [`run_slug`] could not have produced.
pub fn parse_run_slug(slug: &str) -> Option<(&str, &str)> {
    let rest = slug.strip_prefix(SLUG_PREFIX)?;
    let (agent, token) = rest.split_once(SLUG_SEPARATOR)?;
    let valid = |part: &str| !part.is_empty() && sanitize_component(part) == part;
    (valid(agent) && valid(token)).then_some((agent, token))
}

/// `<base>/verify-{agent}--{token}`
pub fn workspace_path(base: &Path, agent: &str, token: &str) -> PathBuf {
    base.join(run_slug(agent, token))
}

/// Lowercase ASCII alphanumerics separated by single hyphens.
///
/// An input with no usable characters maps to `"x"` so a path component is
/// never empty.
pub(crate) fn sanitize_component(s: &str) -> String {
    let mut result = String::new();
    let mut last_was_hyphen = true;

    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            result.push('-');
            last_was_hyphen = true;
        }
    }

    while result.ends_with('-') {
        result.pop();
    }

    if result.is_empty() {
        result.push('x');
    }
    result
}
