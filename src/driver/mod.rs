//! # Device Driver Framework
//!
//! A driver contract (trait object) plus a [`registry::DriverRegistry`] that tracks
//! loaded drivers and the instances probed from them, keyed by `(name, major, minor)`
//! — the same identity the VFS's `devfs` bridge (`fs::devfs`) uses to resolve a path
//! to a driver instance.
//!
//! Devices are discovered by explicit registration rather than parsed off a device
//! tree: a driver calls `DriverRegistry::load` then `probe` for each instance it
//! wants to attach, since this crate targets boards without a device-tree blob to
//! walk at boot.

extern crate alloc;

pub mod instance;
pub mod registry;

pub use instance::DriverInstance;
pub use registry::{DriverKey, DriverRegistry};

use alloc::boxed::Box;

use crate::error::Result;
use crate::ioctl;

/// Per-instance operations a driver must implement. `state` is the opaque context the
/// registry handed back from [`DriverOps::probe`]; drivers are otherwise stateless from
/// the registry's point of view. The nine operations of the driver contract (init,
/// release, open, close, write, read, ioctl, flush, stat) all live here; `probe` plays
/// the role of the contract's `init` (this crate's established name for per-instance
/// setup, see `DriverRegistry::probe`).
pub trait DriverOps: Send + Sync {
    /// Allocate and initialize whatever a single instance of this driver needs, e.g.
    /// mapping a peripheral's registers. Called once per `(major, minor)` registered.
    fn probe(&self, minor: u16) -> Result<Box<dyn DriverState>>;

    /// Tear down a probed instance. Called by `DriverRegistry::release` once it has
    /// confirmed no handle is still open on the instance. Default: nothing to tear down.
    fn release(&self, state: &mut dyn DriverState) -> Result<()> {
        let _ = state;
        Ok(())
    }

    /// Claim the instance for use. A driver with exclusive-access semantics overrides
    /// this to reject a second concurrent open with `Busy` or `PermissionDenied`;
    /// default: no exclusivity, always succeeds.
    fn open(&self, state: &mut dyn DriverState) -> Result<()> {
        let _ = state;
        Ok(())
    }

    /// Release a previous `open`. `force` bypasses a driver's own refusal to close
    /// while it considers itself busy (e.g. mid-transfer); default: always succeeds.
    fn close(&self, state: &mut dyn DriverState, force: bool) -> Result<()> {
        let _ = (state, force);
        Ok(())
    }

    /// Synchronous read. `state` is the value this driver's `probe` returned for the
    /// instance being read from.
    fn read(&self, state: &mut dyn DriverState, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Synchronous write.
    fn write(&self, state: &mut dyn DriverState, offset: u64, buf: &[u8]) -> Result<usize>;

    /// Device-control call. `request` is a code produced by [`ioctl::encode`] (or the
    /// [`crate::define_ioctl!`] macro); drivers should reject unrecognized requests
    /// with [`crate::error::ErrorKind::InvalidArgument`] rather than ignoring them.
    fn ioctl(&self, state: &mut dyn DriverState, request: u32, payload: &mut [u8]) -> Result<()> {
        let _ = (state, payload, ioctl::decode(request));
        Err(crate::err!(InvalidArgument, "driver", "unrecognized ioctl request"))
    }

    /// Push any buffered output to the device. Default: no internal buffering, no-op.
    fn flush(&self, state: &mut dyn DriverState) -> Result<()> {
        let _ = state;
        Ok(())
    }

    /// Device-reported size, kind and permission bits. Default: an empty, non-directory
    /// device with no permission bits set — a reasonable shape for a byte-stream device
    /// that tracks none of these (a UART has no meaningful "size").
    fn stat(&self, state: &dyn DriverState) -> Result<DriverStat> {
        let _ = state;
        Ok(DriverStat::default())
    }
}

/// Device-reported shape returned by [`DriverOps::stat`]; `fs::devfs` forwards this
/// verbatim as a `fs::Metadata` when a program stats a device path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverStat {
    pub size: u64,
    pub is_directory: bool,
    pub mode: u32,
}

/// Opaque per-instance state a driver's `probe` produces and every later call on that
/// instance receives back. A marker trait rather than a concrete struct because each
/// driver's state shape is its own business.
pub trait DriverState: Send {}

/// A loaded driver: its name (used in diagnostics and devfs paths) and its operations.
pub struct Driver {
    pub name: &'static str,
    pub major: u16,
    pub ops: Box<dyn DriverOps>,
}
