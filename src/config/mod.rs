//! Configuration for a supervised run.
//!
//! - **Agents**: the immutable, ordered list of agent definitions
//! - **Template**: placeholder expansion in agent arguments
//! - **Settings**: paths, naming token and timeout limits for one run

mod agents;
mod settings;
pub mod template;

// Re-export public API
pub use agents::{AgentSpec, AgentsConfig, NESTING_MARKERS, PromptDelivery};
pub use settings::{
    DEFAULT_GRACE_PERIOD_SECS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_STALE_TIMEOUT_SECS,
    DEFAULT_STATE_DIR, Settings,
};
