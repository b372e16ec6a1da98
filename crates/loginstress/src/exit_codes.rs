//! Stable process exit codes.

/// Every credential was attempted (individual login failures included).
pub const OK: i32 = 0;
/// The target rate-limited or blocked the run.
pub const STOPPED: i32 = 1;
/// Startup failed: bad configuration, unreadable credential file or invalid URL.
pub const INVALID: i32 = 2;
/// The run was interrupted with Ctrl-C.
pub const INTERRUPTED: i32 = 130;
