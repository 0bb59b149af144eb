//! Device filesystem (§4.E.3): files under this mount forward to driver instances
//! instead of storing bytes. `open("/dev/uart0")` resolves the path to a
//! `(name, major, minor)` key registered at `driver_init` time; every other call is a
//! thin passthrough to the resolved [`crate::driver::DriverInstance`].

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use super::{DirEntry, FileSystemOperations, Metadata, MountState};
use crate::driver::{DriverKey, DriverRegistry};
use crate::err;
use crate::error::Result;

const TARGET: &str = "fs::devfs";

struct State {
    paths: Mutex<BTreeMap<String, DriverKey>>,
    handles: Mutex<BTreeMap<u64, DriverKey>>,
    next_handle: Mutex<u64>,
}
impl MountState for State {
    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

fn state_of(state: &dyn MountState) -> &State {
    state.as_any().downcast_ref::<State>().expect("devfs always receives its own state")
}

pub struct DevFs {
    registry: Arc<DriverRegistry>,
}

impl DevFs {
    pub fn new(registry: Arc<DriverRegistry>) -> Self {
        DevFs { registry }
    }
}

impl FileSystemOperations for DevFs {
    fn name(&self) -> &'static str {
        "devfs"
    }

    fn init(&self, _source: &str) -> Result<Box<dyn MountState>> {
        Ok(Box::new(State { paths: Mutex::new(BTreeMap::new()), handles: Mutex::new(BTreeMap::new()), next_handle: Mutex::new(1) }))
    }

    fn release(&self, _state: &dyn MountState) -> Result<()> {
        Ok(())
    }

    fn open(&self, state: &dyn MountState, path: &str, _flags: u32) -> Result<u64> {
        let s = state_of(state);
        let key = *s.paths.lock().get(path).ok_or_else(|| err!(NotFound, TARGET, "no device bound at this path"))?;
        // Resolving the instance here, rather than only at read/write time, makes an
        // unregistered device fail at open with NotFound instead of later.
        let instance =
            self.registry.instance(key).ok_or_else(|| err!(NotFound, TARGET, "device path bound but instance gone"))?;
        instance.open()?;
        let mut next = s.next_handle.lock();
        let handle = *next;
        *next += 1;
        s.handles.lock().insert(handle, key);
        Ok(handle)
    }

    fn close(&self, state: &dyn MountState, handle: u64) -> Result<()> {
        let key = self.key_for(state, handle)?;
        if let Some(instance) = self.registry.instance(key) {
            instance.close(false)?;
        }
        state_of(state).handles.lock().remove(&handle);
        Ok(())
    }

    fn read(&self, state: &dyn MountState, handle: u64, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let key = self.key_for(state, handle)?;
        let instance = self.registry.instance(key).ok_or_else(|| err!(BadHandle, TARGET, "device no longer registered"))?;
        instance.read(offset, buf)
    }

    fn write(&self, state: &dyn MountState, handle: u64, offset: u64, buf: &[u8]) -> Result<usize> {
        let key = self.key_for(state, handle)?;
        let instance = self.registry.instance(key).ok_or_else(|| err!(BadHandle, TARGET, "device no longer registered"))?;
        instance.write(offset, buf)
    }

    fn ioctl(&self, state: &dyn MountState, handle: u64, request: u32, payload: &mut [u8]) -> Result<()> {
        let key = self.key_for(state, handle)?;
        let instance = self.registry.instance(key).ok_or_else(|| err!(BadHandle, TARGET, "device no longer registered"))?;
        instance.ioctl(request, payload)
    }

    fn mkdir(&self, _state: &dyn MountState, _path: &str) -> Result<()> {
        Err(err!(NotSupported, TARGET, "devfs has no subdirectories"))
    }

    fn remove(&self, _state: &dyn MountState, _path: &str) -> Result<()> {
        Err(err!(NotSupported, TARGET, "device nodes are unbound by the driver framework, not removed"))
    }

    fn rename(&self, _state: &dyn MountState, _old: &str, _new: &str) -> Result<()> {
        Err(err!(NotSupported, TARGET, "device paths are not renameable"))
    }

    fn stat(&self, state: &dyn MountState, path: &str) -> Result<Metadata> {
        let key = *state_of(state)
            .paths
            .lock()
            .get(path)
            .ok_or_else(|| err!(NotFound, TARGET, "no device bound at this path"))?;
        let instance =
            self.registry.instance(key).ok_or_else(|| err!(NotFound, TARGET, "device path bound but instance gone"))?;
        let stat = instance.stat()?;
        Ok(Metadata { size: stat.size, is_directory: stat.is_directory, mode: stat.mode })
    }

    fn mknod(&self, state: &dyn MountState, path: &str, descriptor: DriverKey) -> Result<()> {
        state_of(state).paths.lock().insert(path.to_string(), descriptor);
        Ok(())
    }

    fn flush(&self, state: &dyn MountState, handle: u64) -> Result<()> {
        let key = self.key_for(state, handle)?;
        let instance = self.registry.instance(key).ok_or_else(|| err!(BadHandle, TARGET, "device no longer registered"))?;
        instance.flush()
    }

    fn readdir(&self, state: &dyn MountState, path: &str, cursor: usize) -> Result<Option<DirEntry>> {
        if path != "/" {
            return Ok(None);
        }
        let s = state_of(state);
        let paths = s.paths.lock();
        let mut names: Vec<&String> = paths.keys().collect();
        names.sort();
        Ok(names.get(cursor).map(|p| DirEntry { name: p.trim_start_matches('/').to_string(), is_directory: false }))
    }
}

impl DevFs {
    fn key_for(&self, state: &dyn MountState, handle: u64) -> Result<DriverKey> {
        state_of(state).handles.lock().get(&handle).copied().ok_or_else(|| err!(BadHandle, TARGET, "unknown handle"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Driver, DriverOps, DriverState};
    use alloc::boxed::Box;

    struct NullState;
    impl DriverState for NullState {}
    struct NullDriver;
    impl DriverOps for NullDriver {
        fn probe(&self, _minor: u16) -> Result<Box<dyn DriverState>> {
            Ok(Box::new(NullState))
        }
        fn read(&self, _s: &mut dyn DriverState, _o: u64, buf: &mut [u8]) -> Result<usize> {
            Ok(buf.len())
        }
        fn write(&self, _s: &mut dyn DriverState, _o: u64, buf: &[u8]) -> Result<usize> {
            Ok(buf.len())
        }
    }

    #[test]
    fn open_unbound_path_is_not_found() {
        let registry = Arc::new(DriverRegistry::new());
        let fs = DevFs::new(registry);
        let state = fs.init("").unwrap();
        let err = fs.open(&*state, "/uart0", 0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn bound_path_forwards_to_the_driver_instance() {
        let registry = Arc::new(DriverRegistry::new());
        registry.load(Driver { name: "uart", major: 4, ops: Box::new(NullDriver) }).unwrap();
        let key = registry.probe("uart", 4, 0).unwrap();

        let fs = DevFs::new(registry);
        let state = fs.init("").unwrap();
        fs.mknod(&*state, "/uart0", key).unwrap();

        let h = fs.open(&*state, "/uart0", 0).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(fs.read(&*state, h, 0, &mut buf).unwrap(), 8);
    }

    #[test]
    fn close_forwards_to_the_driver_instance() {
        let registry = Arc::new(DriverRegistry::new());
        registry.load(Driver { name: "uart", major: 4, ops: Box::new(NullDriver) }).unwrap();
        let key = registry.probe("uart", 4, 0).unwrap();

        let fs = DevFs::new(registry.clone());
        let state = fs.init("").unwrap();
        fs.mknod(&*state, "/uart0", key).unwrap();

        let h = fs.open(&*state, "/uart0", 0).unwrap();
        let instance = registry.instance(key).unwrap();
        assert!(instance.is_busy());
        fs.close(&*state, h).unwrap();
        assert!(!instance.is_busy());
    }

    #[test]
    fn stat_forwards_device_reported_shape() {
        let registry = Arc::new(DriverRegistry::new());
        registry.load(Driver { name: "uart", major: 4, ops: Box::new(NullDriver) }).unwrap();
        let key = registry.probe("uart", 4, 0).unwrap();

        let fs = DevFs::new(registry);
        let state = fs.init("").unwrap();
        fs.mknod(&*state, "/uart0", key).unwrap();

        let meta = fs.stat(&*state, "/uart0").unwrap();
        assert_eq!(meta, Metadata { size: 0, is_directory: false, mode: 0 });
    }
}
