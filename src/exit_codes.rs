//! Exit code constants for the multiverify CLI.
//!
//! - 0: at least one agent completed
//! - 1: no agent completed, or the inputs were rejected before launch
//! - 124: the only configured agent hit the hard or inactivity timeout
//! - 130: the supervisor was interrupted

/// At least one agent produced a usable result.
pub const SUCCESS: i32 = 0;

/// Total failure, or a fatal input error.
pub const FAILURE: i32 = 1;

/// Single-agent run ended by a supervisor-imposed limit (timeout or stale).
pub const TIMEOUT: i32 = 124;

/// Process-level interruption (SIGINT/SIGTERM).
pub const INTERRUPTED: i32 = 130;
