//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Verification error - checksum annotations or value parity failed
pub const VERIFICATION_ERROR: i32 = 2;

/// Render error - helm failed, timed out or produced unreadable output
pub const RENDER_ERROR: i32 = 3;

/// Chart error - missing chart, unreadable templates or values schema
pub const CHART_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
