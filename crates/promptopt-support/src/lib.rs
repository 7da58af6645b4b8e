//! Low-level utilities shared across the optimization engine's crates.
//!
//! Provides atomic file-write helpers, NDJSON log rotation, and time
//! utilities used by champion persistence, telemetry, and task-store expiry.

pub mod atomic_io;
pub mod log_rotation;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use log_rotation::{append_line_with_rotation, LogRotationPolicy};
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms, is_expired_unix};
