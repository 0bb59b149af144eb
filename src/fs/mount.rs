//! Mount table and path resolution (§4.E.2).
//!
//! A flat `Vec<Mount>` rather than a trie: this crate's mount counts are bounded by
//! [`crate::config::MAX_MOUNTS`] and stay small (a handful of filesystems on a
//! microcontroller), so a linear longest-prefix scan is simpler than a trie for no
//! meaningful cost, while keeping the same observable semantics (longest mount-path
//! prefix wins).

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use super::path;
use super::{DirEntry, FileHandle, FileSystemOperations, Metadata, MountState, StatFs, Whence};
use crate::config::MAX_MOUNTS;
use crate::driver::DriverKey;
use crate::err;
use crate::error::Result;

const TARGET: &str = "fs::mount";

struct Mount {
    path: String,
    fs: Arc<dyn FileSystemOperations>,
    state: Box<dyn MountState>,
    open_handles: usize,
}

pub struct MountOptions {
    pub source: String,
}

impl MountOptions {
    pub fn source(path: &str) -> Self {
        MountOptions { source: path.to_string() }
    }

    pub fn none() -> Self {
        MountOptions { source: String::new() }
    }
}

/// A directory opened with [`Vfs::opendir`]; tracks which mount it resolved into and
/// how far [`Vfs::readdir`] has advanced through it.
pub struct DirHandle {
    mount_path: String,
    dir_path: String,
    cursor: usize,
}

pub struct Vfs {
    mounts: Mutex<Vec<Mount>>,
}

impl Vfs {
    pub fn new() -> Self {
        Vfs { mounts: Mutex::new(Vec::new()) }
    }

    /// Attach `fs` at `mount_path`. Fails with `AlreadyExists` if a mount already sits
    /// at exactly that path, or `NoSpace` if the mount table is full.
    pub fn mount(&self, fs: Arc<dyn FileSystemOperations>, mount_path: &str, options: MountOptions) -> Result<()> {
        let mut mounts = self.mounts.lock();
        if mounts.iter().any(|m| m.path == mount_path) {
            return Err(err!(AlreadyExists, TARGET, "mount point already in use"));
        }
        if mounts.len() >= MAX_MOUNTS {
            return Err(err!(NoSpace, TARGET, "mount table full"));
        }
        let state = fs.init(&options.source)?;
        mounts.push(Mount { path: mount_path.to_string(), fs, state, open_handles: 0 });
        crate::log_info!(TARGET, "mounted filesystem at '{}'", mount_path);
        Ok(())
    }

    /// Detach the mount at exactly `mount_path`. Fails with `Busy` if any handle
    /// opened through it is still outstanding (§4.E.2).
    pub fn unmount(&self, mount_path: &str) -> Result<()> {
        let mut mounts = self.mounts.lock();
        let idx = mounts
            .iter()
            .position(|m| m.path == mount_path)
            .ok_or_else(|| err!(NotFound, TARGET, "no mount at that path"))?;
        if mounts[idx].open_handles > 0 {
            return Err(err!(Busy, TARGET, "mount has open handles"));
        }
        let mount = mounts.remove(idx);
        mount.fs.release(&*mount.state)?;
        crate::log_info!(TARGET, "unmounted '{}'", mount_path);
        Ok(())
    }

    /// Find the mount whose path is the longest component-wise prefix of `path`;
    /// returns the index and the filesystem-relative remainder. Matching by component
    /// rather than by raw string prefix means a mount at `/mnt` never matches a lookup
    /// under `/mnt2` (§4.E.2).
    fn resolve(mounts: &[Mount], lookup_path: &str) -> Result<(usize, String)> {
        let target = path::components(lookup_path);
        let mut best: Option<(usize, usize)> = None; // (index, matched component count)
        for (i, m) in mounts.iter().enumerate() {
            let prefix = path::components(&m.path);
            if target.len() < prefix.len() || target[..prefix.len()] != prefix[..] {
                continue;
            }
            if best.map_or(true, |(_, len)| prefix.len() > len) {
                best = Some((i, prefix.len()));
            }
        }
        let (idx, matched) = best.ok_or_else(|| err!(NotFound, TARGET, "no mount covers this path"))?;
        let remainder = path::join(&target[matched..]);
        Ok((idx, remainder))
    }

    pub fn open(&self, path: &str, flags: u32) -> Result<FileHandle> {
        let mut mounts = self.mounts.lock();
        let (idx, remainder) = Self::resolve(&mounts, path)?;
        let inner = mounts[idx].fs.open(&*mounts[idx].state, &remainder, flags)?;
        mounts[idx].open_handles += 1;
        let mount_path = mounts[idx].path.clone();
        Ok(FileHandle { mount_path, inner, position: 0 })
    }

    pub fn close(&self, handle: FileHandle) -> Result<()> {
        let mut mounts = self.mounts.lock();
        let mount = mounts
            .iter_mut()
            .find(|m| m.path == handle.mount_path)
            .ok_or_else(|| err!(NotFound, TARGET, "mount no longer present"))?;
        mount.fs.close(&*mount.state, handle.inner)?;
        mount.open_handles = mount.open_handles.saturating_sub(1);
        Ok(())
    }

    pub fn read(&self, handle: &mut FileHandle, buf: &mut [u8]) -> Result<usize> {
        let mounts = self.mounts.lock();
        let mount = mounts
            .iter()
            .find(|m| m.path == handle.mount_path)
            .ok_or_else(|| err!(NotFound, TARGET, "mount no longer present"))?;
        let n = mount.fs.read(&*mount.state, handle.inner, handle.position, buf)?;
        handle.position += n as u64;
        Ok(n)
    }

    pub fn write(&self, handle: &mut FileHandle, buf: &[u8]) -> Result<usize> {
        let mounts = self.mounts.lock();
        let mount = mounts
            .iter()
            .find(|m| m.path == handle.mount_path)
            .ok_or_else(|| err!(NotFound, TARGET, "mount no longer present"))?;
        let n = mount.fs.write(&*mount.state, handle.inner, handle.position, buf)?;
        handle.position += n as u64;
        Ok(n)
    }

    pub fn seek(&self, handle: &mut FileHandle, position: i64, whence: Whence) -> Result<u64> {
        handle.position = match whence {
            Whence::Start => position.max(0) as u64,
            Whence::Current => (handle.position as i64 + position).max(0) as u64,
            Whence::End => position.max(0) as u64,
        };
        Ok(handle.position)
    }

    pub fn ioctl(&self, handle: &FileHandle, request: u32, payload: &mut [u8]) -> Result<()> {
        let mounts = self.mounts.lock();
        let mount = mounts
            .iter()
            .find(|m| m.path == handle.mount_path)
            .ok_or_else(|| err!(NotFound, TARGET, "mount no longer present"))?;
        mount.fs.ioctl(&*mount.state, handle.inner, request, payload)
    }

    pub fn mkdir(&self, path: &str) -> Result<()> {
        let mounts = self.mounts.lock();
        let (idx, remainder) = Self::resolve(&mounts, path)?;
        mounts[idx].fs.mkdir(&*mounts[idx].state, &remainder)
    }

    pub fn remove(&self, path: &str) -> Result<()> {
        let mounts = self.mounts.lock();
        let (idx, remainder) = Self::resolve(&mounts, path)?;
        mounts[idx].fs.remove(&*mounts[idx].state, &remainder)
    }

    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        let mounts = self.mounts.lock();
        let (old_idx, old_remainder) = Self::resolve(&mounts, old)?;
        let (new_idx, new_remainder) = Self::resolve(&mounts, new)?;
        if old_idx != new_idx {
            return Err(err!(NotSupported, TARGET, "rename across mounts"));
        }
        mounts[old_idx].fs.rename(&*mounts[old_idx].state, &old_remainder, &new_remainder)
    }

    pub fn stat(&self, path: &str) -> Result<Metadata> {
        let mounts = self.mounts.lock();
        let (idx, remainder) = Self::resolve(&mounts, path)?;
        mounts[idx].fs.stat(&*mounts[idx].state, &remainder)
    }

    pub fn mknod(&self, path: &str, descriptor: DriverKey) -> Result<()> {
        let mounts = self.mounts.lock();
        let (idx, remainder) = Self::resolve(&mounts, path)?;
        mounts[idx].fs.mknod(&*mounts[idx].state, &remainder, descriptor)
    }

    pub fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        let mounts = self.mounts.lock();
        let (idx, remainder) = Self::resolve(&mounts, path)?;
        mounts[idx].fs.chmod(&*mounts[idx].state, &remainder, mode)
    }

    pub fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<()> {
        let mounts = self.mounts.lock();
        let (idx, remainder) = Self::resolve(&mounts, path)?;
        mounts[idx].fs.chown(&*mounts[idx].state, &remainder, uid, gid)
    }

    pub fn statfs(&self, path: &str) -> Result<StatFs> {
        let mounts = self.mounts.lock();
        let (idx, _remainder) = Self::resolve(&mounts, path)?;
        mounts[idx].fs.statfs(&*mounts[idx].state)
    }

    pub fn flush(&self, handle: &FileHandle) -> Result<()> {
        let mounts = self.mounts.lock();
        let mount = mounts
            .iter()
            .find(|m| m.path == handle.mount_path)
            .ok_or_else(|| err!(NotFound, TARGET, "mount no longer present"))?;
        mount.fs.flush(&*mount.state, handle.inner)
    }

    pub fn fstat(&self, handle: &FileHandle) -> Result<Metadata> {
        let mounts = self.mounts.lock();
        let mount = mounts
            .iter()
            .find(|m| m.path == handle.mount_path)
            .ok_or_else(|| err!(NotFound, TARGET, "mount no longer present"))?;
        mount.fs.fstat(&*mount.state, handle.inner)
    }

    /// Open a directory for iteration (§4.E.4, §6.1). Fails with `NotDirectory` if
    /// `path` doesn't resolve to a directory.
    pub fn opendir(&self, path: &str) -> Result<DirHandle> {
        let mounts = self.mounts.lock();
        let (idx, remainder) = Self::resolve(&mounts, path)?;
        let meta = mounts[idx].fs.stat(&*mounts[idx].state, &remainder)?;
        if !meta.is_directory {
            return Err(err!(NotDirectory, TARGET, "not a directory"));
        }
        Ok(DirHandle { mount_path: mounts[idx].path.clone(), dir_path: remainder, cursor: 0 })
    }

    /// Return the next entry of a directory opened with [`Vfs::opendir`], advancing
    /// its cursor; `None` once exhausted. The cursor/lease bookkeeping lives here,
    /// once, rather than duplicated inside every [`FileSystemOperations`] implementor
    /// — each filesystem only has to answer "entry after cursor N" statelessly.
    pub fn readdir(&self, dir: &mut DirHandle) -> Result<Option<DirEntry>> {
        let mounts = self.mounts.lock();
        let mount = mounts
            .iter()
            .find(|m| m.path == dir.mount_path)
            .ok_or_else(|| err!(NotFound, TARGET, "mount no longer present"))?;
        let entry = mount.fs.readdir(&*mount.state, &dir.dir_path, dir.cursor)?;
        if entry.is_some() {
            dir.cursor += 1;
        }
        Ok(entry)
    }

    /// Close a directory handle. A no-op beyond consuming it: `DirHandle` holds no
    /// resource beyond its own cursor.
    pub fn closedir(&self, _dir: DirHandle) -> Result<()> {
        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        let mounts = self.mounts.lock();
        for m in mounts.iter() {
            m.fs.sync(&*m.state)?;
        }
        Ok(())
    }
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}
