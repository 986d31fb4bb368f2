//! Filesystem utilities for multiverify.
//!
//! Status snapshots and reports are rewritten while other tools may be
//! reading them, so they go through atomic replacement.

pub mod atomic;

pub use atomic::atomic_write_file;
