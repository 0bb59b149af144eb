//! Volatile in-memory reference filesystem (§6.4: devfs/tmpfs/procfs-like filesystems
//! are volatile by design — persistent formats are out of scope).
//!
//! A flat path-keyed `BTreeMap<String, Node>` held behind one lock; this crate has no
//! hard-link or permission-bit semantics to preserve, so nodes stay one of two shapes:
//! a directory marker or a byte vector.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use spin::Mutex;

use super::{open_flags, DirEntry, FileSystemOperations, Metadata, MountState};
use crate::err;
use crate::error::Result;

const TARGET: &str = "fs::tmpfs";

enum Node {
    Directory,
    File(Vec<u8>, u32),
}

struct State {
    nodes: Mutex<BTreeMap<String, Node>>,
    handles: Mutex<BTreeMap<u64, String>>,
    next_handle: Mutex<u64>,
}
impl MountState for State {
    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

pub struct TmpFs;

impl TmpFs {
    pub fn new() -> Self {
        TmpFs
    }
}

impl Default for TmpFs {
    fn default() -> Self {
        Self::new()
    }
}

fn state_of(state: &dyn MountState) -> &State {
    state.as_any().downcast_ref::<State>().expect("tmpfs always receives its own state")
}

impl FileSystemOperations for TmpFs {
    fn name(&self) -> &'static str {
        "tmpfs"
    }

    fn init(&self, _source: &str) -> Result<Box<dyn MountState>> {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Directory);
        Ok(Box::new(State { nodes: Mutex::new(nodes), handles: Mutex::new(BTreeMap::new()), next_handle: Mutex::new(1) }))
    }

    fn release(&self, _state: &dyn MountState) -> Result<()> {
        Ok(())
    }

    fn open(&self, state: &dyn MountState, path: &str, flags: u32) -> Result<u64> {
        let s = state_of(state);
        let mut nodes = s.nodes.lock();
        match nodes.get(path) {
            Some(Node::Directory) => return Err(err!(IsDirectory, TARGET, "cannot open a directory as a file")),
            Some(Node::File(_, _)) => {}
            None => {
                if flags & open_flags::CREATE == 0 {
                    return Err(err!(NotFound, TARGET, "no such file"));
                }
                nodes.insert(path.to_string(), Node::File(Vec::new(), 0));
            }
        }
        drop(nodes);
        let mut next = s.next_handle.lock();
        let handle = *next;
        *next += 1;
        s.handles.lock().insert(handle, path.to_string());
        Ok(handle)
    }

    fn close(&self, state: &dyn MountState, handle: u64) -> Result<()> {
        state_of(state).handles.lock().remove(&handle);
        Ok(())
    }

    fn read(&self, state: &dyn MountState, handle: u64, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let s = state_of(state);
        let path = s.handles.lock().get(&handle).cloned().ok_or_else(|| err!(BadHandle, TARGET, "unknown handle"))?;
        let nodes = s.nodes.lock();
        let Some(Node::File(data, _)) = nodes.get(&path) else {
            return Err(err!(BadHandle, TARGET, "handle no longer refers to a file"));
        };
        let offset = offset as usize;
        if offset >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - offset);
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }

    fn write(&self, state: &dyn MountState, handle: u64, offset: u64, buf: &[u8]) -> Result<usize> {
        let s = state_of(state);
        let path = s.handles.lock().get(&handle).cloned().ok_or_else(|| err!(BadHandle, TARGET, "unknown handle"))?;
        let mut nodes = s.nodes.lock();
        let Some(Node::File(data, _)) = nodes.get_mut(&path) else {
            return Err(err!(BadHandle, TARGET, "handle no longer refers to a file"));
        };
        let offset = offset as usize;
        if data.len() < offset + buf.len() {
            data.resize(offset + buf.len(), 0);
        }
        data[offset..offset + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn mkdir(&self, state: &dyn MountState, path: &str) -> Result<()> {
        let s = state_of(state);
        let mut nodes = s.nodes.lock();
        if nodes.contains_key(path) {
            return Err(err!(AlreadyExists, TARGET, "path already exists"));
        }
        nodes.insert(path.to_string(), Node::Directory);
        Ok(())
    }

    fn remove(&self, state: &dyn MountState, path: &str) -> Result<()> {
        let s = state_of(state);
        s.nodes.lock().remove(path).ok_or_else(|| err!(NotFound, TARGET, "no such path")).map(|_| ())
    }

    fn rename(&self, state: &dyn MountState, old: &str, new: &str) -> Result<()> {
        let s = state_of(state);
        let mut nodes = s.nodes.lock();
        let node = nodes.remove(old).ok_or_else(|| err!(NotFound, TARGET, "no such path"))?;
        nodes.insert(new.to_string(), node);
        Ok(())
    }

    fn stat(&self, state: &dyn MountState, path: &str) -> Result<Metadata> {
        let s = state_of(state);
        match s.nodes.lock().get(path) {
            Some(Node::Directory) => Ok(Metadata { size: 0, is_directory: true, mode: 0 }),
            Some(Node::File(data, mode)) => Ok(Metadata { size: data.len() as u64, is_directory: false, mode: *mode }),
            None => Err(err!(NotFound, TARGET, "no such path")),
        }
    }

    /// Sets the stored mode on a file. Directories carry no mode in this model
    /// (§6.4: no permission-bit semantics to preserve), so `chmod` on one is accepted
    /// as a no-op rather than rejected.
    fn chmod(&self, state: &dyn MountState, path: &str, mode: u32) -> Result<()> {
        let s = state_of(state);
        match s.nodes.lock().get_mut(path) {
            Some(Node::Directory) => Ok(()),
            Some(Node::File(_, stored)) => {
                *stored = mode;
                Ok(())
            }
            None => Err(err!(NotFound, TARGET, "no such path")),
        }
    }

    fn readdir(&self, state: &dyn MountState, path: &str, cursor: usize) -> Result<Option<DirEntry>> {
        let s = state_of(state);
        let nodes = s.nodes.lock();
        let prefix = if path == "/" { "/".to_string() } else { path.to_string() + "/" };
        let mut children: Vec<(&String, &Node)> = nodes
            .iter()
            .filter(|(p, _)| p.as_str() != path && p.starts_with(&prefix) && !p[prefix.len()..].contains('/'))
            .collect();
        children.sort_by(|a, b| a.0.cmp(b.0));
        Ok(children.get(cursor).map(|(p, n)| DirEntry {
            name: p[prefix.len()..].to_string(),
            is_directory: matches!(n, Node::Directory),
        }))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let fs = TmpFs::new();
        let state = fs.init("").unwrap();
        let h = fs.open(&*state, "/f", open_flags::CREATE | open_flags::WRITE).unwrap();
        fs.write(&*state, h, 0, b"hello").unwrap();
        let mut buf = [0u8; 5];
        fs.read(&*state, h, 0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn read_past_end_of_file_returns_zero() {
        let fs = TmpFs::new();
        let state = fs.init("").unwrap();
        let h = fs.open(&*state, "/f", open_flags::CREATE | open_flags::WRITE).unwrap();
        fs.write(&*state, h, 0, b"hi").unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(fs.read(&*state, h, 10, &mut buf).unwrap(), 0);
    }

    #[test]
    fn zero_length_read_and_write_are_no_ops() {
        let fs = TmpFs::new();
        let state = fs.init("").unwrap();
        let h = fs.open(&*state, "/f", open_flags::CREATE | open_flags::WRITE).unwrap();
        assert_eq!(fs.write(&*state, h, 0, b"").unwrap(), 0);
        let mut buf: [u8; 0] = [];
        assert_eq!(fs.read(&*state, h, 0, &mut buf).unwrap(), 0);
        assert_eq!(fs.stat(&*state, "/f").unwrap().size, 0);
    }

    #[test]
    fn opening_missing_file_without_create_is_not_found() {
        let fs = TmpFs::new();
        let state = fs.init("").unwrap();
        let err = fs.open(&*state, "/missing", open_flags::READ).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn opening_a_directory_as_a_file_fails() {
        let fs = TmpFs::new();
        let state = fs.init("").unwrap();
        fs.mkdir(&*state, "/d").unwrap();
        let err = fs.open(&*state, "/d", open_flags::READ).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::IsDirectory);
    }

    #[test]
    fn readdir_lists_immediate_children_only() {
        let fs = TmpFs::new();
        let state = fs.init("").unwrap();
        fs.mkdir(&*state, "/d").unwrap();
        fs.open(&*state, "/d/a", open_flags::CREATE).unwrap();
        fs.open(&*state, "/d/b", open_flags::CREATE).unwrap();

        let mut names = Vec::new();
        let mut cursor = 0;
        while let Some(entry) = fs.readdir(&*state, "/d", cursor).unwrap() {
            names.push(entry.name);
            cursor += 1;
        }
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }
}
