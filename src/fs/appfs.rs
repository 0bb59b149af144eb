//! Read-only listing of the application registry as a filesystem (resolves the Open
//! Question of whether the registry gets VFS presence — it does, mounted read-only so
//! a shell program can `opendir`/`readdir` `/app` to discover what it can `spawn`,
//! without the registry itself growing a bespoke listing API). Writes of any kind fail
//! with `PermissionDenied`; the registry is append-only at build time (§4.F).

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use super::{DirEntry, FileSystemOperations, Metadata, MountState};
use crate::app::AppRegistry;
use crate::err;
use crate::error::Result;

const TARGET: &str = "fs::appfs";

struct State;
impl MountState for State {
    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

pub struct AppFs {
    registry: Arc<AppRegistry>,
}

impl AppFs {
    pub fn new(registry: Arc<AppRegistry>) -> Self {
        AppFs { registry }
    }
}

impl FileSystemOperations for AppFs {
    fn name(&self) -> &'static str {
        "appfs"
    }

    fn init(&self, _source: &str) -> Result<Box<dyn MountState>> {
        Ok(Box::new(State))
    }

    fn release(&self, _state: &dyn MountState) -> Result<()> {
        Ok(())
    }

    fn open(&self, _state: &dyn MountState, path: &str, _flags: u32) -> Result<u64> {
        let name = path.trim_start_matches('/');
        if self.registry.lookup(name).is_none() {
            return Err(err!(NotFound, TARGET, "no such program"));
        }
        Ok(0)
    }

    fn close(&self, _state: &dyn MountState, _handle: u64) -> Result<()> {
        Ok(())
    }

    fn read(&self, _state: &dyn MountState, _handle: u64, _offset: u64, _buf: &mut [u8]) -> Result<usize> {
        // Program entries carry no readable byte content; the directory listing is
        // the entire interface appfs exposes.
        Ok(0)
    }

    fn write(&self, _state: &dyn MountState, _handle: u64, _offset: u64, _buf: &[u8]) -> Result<usize> {
        Err(err!(PermissionDenied, TARGET, "the application registry is read-only"))
    }

    fn mkdir(&self, _state: &dyn MountState, _path: &str) -> Result<()> {
        Err(err!(PermissionDenied, TARGET, "the application registry is read-only"))
    }

    fn remove(&self, _state: &dyn MountState, _path: &str) -> Result<()> {
        Err(err!(PermissionDenied, TARGET, "the application registry is read-only"))
    }

    fn rename(&self, _state: &dyn MountState, _old: &str, _new: &str) -> Result<()> {
        Err(err!(PermissionDenied, TARGET, "the application registry is read-only"))
    }

    fn mknod(&self, _state: &dyn MountState, _path: &str, _descriptor: crate::driver::DriverKey) -> Result<()> {
        Err(err!(PermissionDenied, TARGET, "the application registry is read-only"))
    }

    fn chmod(&self, _state: &dyn MountState, _path: &str, _mode: u32) -> Result<()> {
        Err(err!(PermissionDenied, TARGET, "the application registry is read-only"))
    }

    fn chown(&self, _state: &dyn MountState, _path: &str, _uid: u32, _gid: u32) -> Result<()> {
        Err(err!(PermissionDenied, TARGET, "the application registry is read-only"))
    }

    fn stat(&self, _state: &dyn MountState, path: &str) -> Result<Metadata> {
        if path == "/" {
            return Ok(Metadata { size: 0, is_directory: true, mode: 0 });
        }
        let name = path.trim_start_matches('/');
        self.registry.lookup(name).ok_or_else(|| err!(NotFound, TARGET, "no such program"))?;
        Ok(Metadata { size: 0, is_directory: false, mode: 0 })
    }

    fn readdir(&self, _state: &dyn MountState, path: &str, cursor: usize) -> Result<Option<DirEntry>> {
        if path != "/" {
            return Ok(None);
        }
        let mut names: Vec<String> = self.registry.names().into_iter().map(|n| n.to_string()).collect();
        names.sort();
        Ok(names.get(cursor).cloned().map(|name| DirEntry { name, is_directory: false }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ProgramEntry;

    fn entry_point(_argc: usize, _argv: &[&str], _stdio: &crate::stdio::StdioPair) -> crate::sync::TaskStatus {
        crate::sync::TaskStatus::Ok
    }

    #[test]
    fn lists_registered_programs() {
        let registry = Arc::new(AppRegistry::new());
        registry.register(ProgramEntry { name: "shell", entry: entry_point, stack_hint: 4096 }).unwrap();
        let fs = AppFs::new(registry);
        let state = fs.init("").unwrap();
        let first = fs.readdir(&*state, "/", 0).unwrap().unwrap();
        assert_eq!(first.name, "shell");
        assert!(fs.readdir(&*state, "/", 1).unwrap().is_none());
    }

    #[test]
    fn writes_are_rejected() {
        let registry = Arc::new(AppRegistry::new());
        let fs = AppFs::new(registry);
        let state = fs.init("").unwrap();
        let err = fs.write(&*state, 0, 0, b"x").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::PermissionDenied);
    }
}
