//! Diagnostic logging.
//!
//! Tracing output goes to stderr so it never mixes with the JSON report on
//! stdout. Agent output is not routed through here; it lives in the per-run
//! log files.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "MULTIVERIFY_LOG";

/// Filter used when `MULTIVERIFY_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "multiverify=debug"
    } else {
        "multiverify=info"
    }
}

/// Install the global subscriber.
///
/// ```bash
/// MULTIVERIFY_LOG=multiverify=trace multiverify run --prompt-file prompt.md
/// ```
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "multiverify=info");
        assert_eq!(default_directive(true), "multiverify=debug");
    }
}
