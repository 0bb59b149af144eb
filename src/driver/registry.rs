//! Registry of loaded drivers and the instances probed from them.
//!
//! An owned, instance-based registry rather than a `static`-backed one, keyed by
//! `(name, major, minor)` since `fs::devfs` resolves device paths to instances by that
//! triple rather than by a bare integer handle.
//!
//! `load`/`probe`/`release` (the structural, modification side of §4.D.3) serialize
//! behind a framework-wide [`RecursiveMutex`], timed out by
//! [`crate::config::FRAMEWORK_LOCK_DEFAULT_TIMEOUT_MS`] the same way every other
//! blocking primitive in this crate bounds its wait; `instance` (the read side, on
//! every devfs read/write/ioctl dispatch) stays a bare lock-free map lookup so the hot
//! I/O path never pays a framework-wide timeout for a lookup nothing else is mutating.

use core::sync::atomic::AtomicUsize;

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use super::{Driver, DriverInstance};
use crate::config::{FRAMEWORK_LOCK_DEFAULT_TIMEOUT_MS, MAX_DRIVER_INSTANCES};
use crate::defer::defer;
use crate::err;
use crate::error::Result;
use crate::sync::{RecursiveMutex, TaskId, TickClock, Timeout};

const TARGET: &str = "driver::registry";

/// The registry itself, not a caller, is the owner identity for the framework-wide
/// mutex: `load`/`probe`/`release` never run concurrently with each other *or
/// themselves* from the registry's own point of view, so a single fixed owner is
/// enough to serialize them without threading a per-caller `TaskId` through every
/// public method (§4.D.3's ordering guarantee only needs "totally ordered", not
/// "attributed to the calling task").
const FRAMEWORK_OWNER: TaskId = TaskId(0);

/// Identity of a probed instance: driver name plus the major/minor pair it was probed
/// with. Used both as the registry's lookup key and as the identity `fs::devfs` hands
/// the VFS when it mounts a device node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DriverKey {
    pub name: &'static str,
    pub major: u16,
    pub minor: u16,
}

pub struct DriverRegistry {
    drivers: Mutex<BTreeMap<&'static str, Arc<Driver>>>,
    instances: Mutex<BTreeMap<DriverKey, Arc<DriverInstance>>>,
    framework_lock: RecursiveMutex,
    clock: TickClock,
}

impl DriverRegistry {
    pub fn new() -> Self {
        DriverRegistry {
            drivers: Mutex::new(BTreeMap::new()),
            instances: Mutex::new(BTreeMap::new()),
            framework_lock: RecursiveMutex::new(),
            clock: TickClock::new(),
        }
    }

    /// Acquire the framework-wide mutex bounded by the configured default timeout,
    /// returning a guard that releases it on drop regardless of how the caller exits.
    fn lock_framework(&self) -> Result<impl Drop + '_> {
        self.framework_lock.lock(
            FRAMEWORK_OWNER,
            Timeout::After(FRAMEWORK_LOCK_DEFAULT_TIMEOUT_MS as u64),
            &self.clock,
        )?;
        Ok(defer(move || {
            let _ = self.framework_lock.unlock(FRAMEWORK_OWNER);
        }))
    }

    /// Load a driver under its name. Fails with `AlreadyExists` if the name is taken —
    /// driver names are a flat namespace shared with devfs paths.
    pub fn load(&self, driver: Driver) -> Result<()> {
        let _framework = self.lock_framework()?;
        let mut drivers = self.drivers.lock();
        if drivers.contains_key(driver.name) {
            return Err(err!(AlreadyExists, TARGET, "driver name already loaded"));
        }
        let name = driver.name;
        drivers.insert(name, Arc::new(driver));
        crate::log_info!(TARGET, "loaded driver '{}'", name);
        Ok(())
    }

    /// Probe a new instance of an already-loaded driver at `(major, minor)`. An
    /// already-used key returns `Busy` rather than `AlreadyExists`, since the blocking
    /// condition is the existing instance's outstanding state, not a naming conflict —
    /// releasing it first (`DriverRegistry::release`) frees the key to be probed again.
    /// The same `Busy` also covers a key whose instance failed to tear down on a prior
    /// `release`: it stays in the table (§4.D.4 "leaked"), so reprobing it is refused
    /// exactly as if it were still open.
    pub fn probe(&self, name: &'static str, major: u16, minor: u16) -> Result<DriverKey> {
        let _framework = self.lock_framework()?;
        let driver = {
            let drivers = self.drivers.lock();
            drivers.get(name).cloned().ok_or_else(|| err!(NotFound, TARGET, "no such driver"))?
        };
        let key = DriverKey { name, major, minor };
        let mut instances = self.instances.lock();
        if instances.len() >= MAX_DRIVER_INSTANCES {
            return Err(err!(NoSpace, TARGET, "driver instance table full"));
        }
        if instances.contains_key(&key) {
            return Err(err!(Busy, TARGET, "instance already probed"));
        }
        let state = driver.ops.probe(minor)?;
        let instance = Arc::new(DriverInstance {
            major,
            minor,
            driver,
            state: Mutex::new(state),
            open_count: AtomicUsize::new(0),
        });
        instances.insert(key, instance);
        crate::log_debug!(TARGET, "probed instance minor={} for '{}'", minor, name);
        Ok(key)
    }

    /// Look up a probed instance by key. Not gated by the framework-wide mutex: this is
    /// the hot path every devfs read/write/ioctl dispatch takes, and a plain map lookup
    /// needs no serialization against `load`/`probe`/`release`'s structural changes.
    pub fn instance(&self, key: DriverKey) -> Option<Arc<DriverInstance>> {
        self.instances.lock().get(&key).cloned()
    }

    /// Tear an instance down. `Busy` if a handle is still open on it (§4.D.4); otherwise
    /// runs the driver's own teardown and removes the instance. If teardown itself fails,
    /// the instance is left in the table rather than removed — a leaked instance, whose
    /// key stays refused by `probe` with `Busy` until the process restarts, which is the
    /// only way this crate tracks "leaked" without a second bookkeeping structure.
    pub fn release(&self, key: DriverKey) -> Result<()> {
        let _framework = self.lock_framework()?;
        let mut instances = self.instances.lock();
        let instance = instances.get(&key).cloned().ok_or_else(|| err!(NotFound, TARGET, "no such instance"))?;
        if instance.is_busy() {
            return Err(err!(Busy, TARGET, "instance has open handles"));
        }
        if let Err(e) = instance.release() {
            crate::log_error!(TARGET, "driver teardown failed for instance, leaking it: {:?}", e.kind());
            return Err(e);
        }
        instances.remove(&key);
        Ok(())
    }

    pub fn instance_keys(&self) -> Vec<DriverKey> {
        self.instances.lock().keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
