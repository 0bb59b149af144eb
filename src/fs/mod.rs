//! # Virtual File System
//!
//! A mount tree of named [`FileSystemOperations`] providers, resolved by longest
//! mount-path prefix (§4.E.2), plus two built-in filesystems: [`devfs`] (a bridge to
//! the driver framework) and [`tmpfs`] (a volatile in-memory reference filesystem).
//! [`appfs`] is a third built-in resolving the Open Question over whether the
//! application registry gets a filesystem presence — it does, read-only.
//!
//! Every filesystem operation returns this crate's single closed
//! [`crate::error::ErrorKind`] vocabulary (§7) rather than a filesystem-specific error
//! enum, since one error type is shared across every module.

extern crate alloc;

pub mod appfs;
pub mod devfs;
pub mod mount;
pub mod path;
pub mod tmpfs;

pub use mount::{MountOptions, Vfs};

use alloc::boxed::Box;
use alloc::string::String;

use crate::error::Result;

/// File-open mode flags (§4.E.4). Not a true bitflags type to avoid pulling in another
/// dependency for four booleans; combined with bitwise OR by callers.
pub mod open_flags {
    pub const READ: u32 = 0b0001;
    pub const WRITE: u32 = 0b0010;
    pub const CREATE: u32 = 0b0100;
    pub const APPEND: u32 = 0b1000;
}

/// Metadata returned by `stat`/`fstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub size: u64,
    pub is_directory: bool,
    pub mode: u32,
}

/// Capacity summary returned by `statfs`. Both fields are `0` for every filesystem
/// this crate ships (§6.4: none of `tmpfs`/`devfs`/`appfs` models a fixed-size backing
/// store), but the operation itself is still part of the contract so a filesystem
/// that does track capacity (a real block-device filesystem) has somewhere to report
/// it without a breaking trait change later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatFs {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

/// Per-mount state a filesystem's `init` hands back; opaque to the VFS, but each
/// filesystem implementation casts it back to its own concrete type via `as_any`.
pub trait MountState: Send + Sync {
    fn as_any(&self) -> &dyn core::any::Any;
}

/// The filesystem contract of §4.E.1. A mount is one `Box<dyn FileSystemOperations>`
/// plus the [`MountState`] its `init` produced; every other call receives that state
/// back so a filesystem implementation can stay free of interior `static`s.
pub trait FileSystemOperations: Send + Sync {
    fn name(&self) -> &'static str;

    /// `source` is the backing device's VFS path, or empty for a virtual filesystem.
    fn init(&self, source: &str) -> Result<Box<dyn MountState>>;
    fn release(&self, state: &dyn MountState) -> Result<()>;

    fn open(&self, state: &dyn MountState, path: &str, flags: u32) -> Result<u64>;
    fn close(&self, state: &dyn MountState, handle: u64) -> Result<()>;
    fn read(&self, state: &dyn MountState, handle: u64, offset: u64, buf: &mut [u8]) -> Result<usize>;
    fn write(&self, state: &dyn MountState, handle: u64, offset: u64, buf: &[u8]) -> Result<usize>;
    fn ioctl(&self, state: &dyn MountState, handle: u64, request: u32, payload: &mut [u8]) -> Result<()> {
        let _ = (state, handle, request, payload);
        Err(crate::err!(NotSupported, "fs", "ioctl not supported on this filesystem"))
    }

    fn mkdir(&self, state: &dyn MountState, path: &str) -> Result<()>;
    fn remove(&self, state: &dyn MountState, path: &str) -> Result<()>;
    fn rename(&self, state: &dyn MountState, old: &str, new: &str) -> Result<()>;
    fn stat(&self, state: &dyn MountState, path: &str) -> Result<Metadata>;

    /// Create a device node at `path` bound to `descriptor` (§4.E.3, §6.1). Default:
    /// `NotSupported` — only a filesystem that bridges to the driver framework
    /// (`devfs`) has anywhere to put the binding.
    fn mknod(&self, state: &dyn MountState, path: &str, descriptor: crate::driver::DriverKey) -> Result<()> {
        let _ = (state, path, descriptor);
        Err(crate::err!(NotSupported, "fs", "mknod not supported on this filesystem"))
    }

    /// Change permission bits. Default verifies `path` exists and otherwise no-ops:
    /// permission *enforcement* is out of scope (§1 Non-goals), but the operation
    /// itself — and a filesystem's ability to actually store a changed mode, as
    /// `tmpfs` does — is not.
    fn chmod(&self, state: &dyn MountState, path: &str, mode: u32) -> Result<()> {
        let _ = mode;
        self.stat(state, path).map(|_| ())
    }

    /// Change owning uid/gid. As `chmod`: existence-checked no-op by default, since
    /// ownership enforcement is the same excluded Non-goal.
    fn chown(&self, state: &dyn MountState, path: &str, uid: u32, gid: u32) -> Result<()> {
        let _ = (uid, gid);
        self.stat(state, path).map(|_| ())
    }

    /// Filesystem-wide capacity summary. Default: an all-zero [`StatFs`] — see its
    /// doc comment for why that's a legitimate default rather than a stub.
    fn statfs(&self, state: &dyn MountState) -> Result<StatFs> {
        let _ = state;
        Ok(StatFs::default())
    }

    /// Push any buffered writes for one open handle to stable storage. Default
    /// delegates to the whole-mount `sync`, since a filesystem with no per-handle
    /// buffering (every filesystem this crate ships) has nothing finer-grained to do.
    fn flush(&self, state: &dyn MountState, handle: u64) -> Result<()> {
        let _ = handle;
        self.sync(state)
    }

    /// `stat` by open handle rather than path. Default: `NotSupported` — recovering a
    /// path (or an equivalent metadata source) from a bare handle is bookkeeping each
    /// filesystem implementation has to supply for itself; there's no generic way to
    /// do it from this trait alone.
    fn fstat(&self, state: &dyn MountState, handle: u64) -> Result<Metadata> {
        let _ = (state, handle);
        Err(crate::err!(NotSupported, "fs", "fstat not supported on this filesystem"))
    }

    /// Return the next directory entry after `cursor` (0 to start), or `None` once
    /// exhausted. Lazy, one entry per call (§4.E.4).
    fn readdir(&self, state: &dyn MountState, path: &str, cursor: usize) -> Result<Option<DirEntry>>;

    fn sync(&self, state: &dyn MountState) -> Result<()> {
        let _ = state;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_directory: bool,
}

/// An open file: which mount it resolved into, the filesystem-relative handle the
/// filesystem's own `open` returned, and the current seek position.
#[derive(Debug)]
pub struct FileHandle {
    pub(crate) mount_path: String,
    pub(crate) inner: u64,
    pub(crate) position: u64,
}

impl FileHandle {
    pub fn position(&self) -> u64 {
        self.position
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}
