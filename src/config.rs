//! Build-time configuration.
//!
//! The core boots from a fixed image, so tuning knobs are plain constants rather than
//! a parsed config file or environment-driven system. Gathering them here keeps magic
//! numbers out of the component modules; change a value here to retarget a deployment.

/// Byte capacity of each `stdin_buf` / `stdout_buf` ring in a program's stdio pair (§4.G).
pub const STDIO_RING_CAPACITY: usize = 256;

/// Hard cap on simultaneously probed driver instances (§4.D.3). Exceeding it returns `NoSpace`.
pub const MAX_DRIVER_INSTANCES: usize = 32;

/// Hard cap on simultaneously mounted filesystems (§4.E.2). Exceeding it returns `NoSpace`.
pub const MAX_MOUNTS: usize = 16;

/// Level the log sink (§4.I) starts at before any runtime reconfiguration.
pub const DEFAULT_LOG_LEVEL: crate::log::Level = crate::log::Level::Info;

/// Timeout, in milliseconds, callers of the driver-framework-wide mutex use when they
/// do not supply one explicitly (§4.D.3).
pub const FRAMEWORK_LOCK_DEFAULT_TIMEOUT_MS: u32 = 1000;

/// Sentinel byte a program writes to `stdout_buf` immediately before returning
/// successfully (§4.G).
pub const STATUS_OK: u8 = 0x00;

/// Sentinel byte a program writes to `stdout_buf` immediately before returning with a
/// fatal error (§4.G).
pub const STATUS_ERROR: u8 = 0x01;
