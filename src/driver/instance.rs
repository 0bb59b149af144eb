//! A single probed instance of a driver: the `(major, minor)` identity plus the
//! opaque state the driver's own `probe` produced for it.

use core::sync::atomic::{AtomicUsize, Ordering};

use alloc::boxed::Box;
use alloc::sync::Arc;
use spin::Mutex;

use super::{Driver, DriverState, DriverStat};
use crate::err;
use crate::error::Result;

const TARGET: &str = "driver::instance";

pub struct DriverInstance {
    pub major: u16,
    pub minor: u16,
    pub(crate) driver: Arc<Driver>,
    pub(crate) state: Mutex<Box<dyn DriverState>>,
    pub(crate) open_count: AtomicUsize,
}

impl DriverInstance {
    /// Claim the instance for use (§4.D.2 `open`). Tracks an open count so
    /// `DriverRegistry::release` can refuse to tear down an instance still in use.
    pub fn open(&self) -> Result<()> {
        self.driver.ops.open(&mut **self.state.lock())?;
        self.open_count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Release a previous `open`. `BadHandle` if called without a matching open.
    pub fn close(&self, force: bool) -> Result<()> {
        if self.open_count.load(Ordering::Acquire) == 0 {
            return Err(err!(BadHandle, TARGET, "close without a matching open"));
        }
        self.driver.ops.close(&mut **self.state.lock(), force)?;
        self.open_count.fetch_sub(1, Ordering::AcqRel);
        Ok(())
    }

    /// Whether any `open` is currently outstanding on this instance.
    pub fn is_busy(&self) -> bool {
        self.open_count.load(Ordering::Acquire) > 0
    }

    /// Tear the instance down. Only meaningful once `is_busy()` is `false`; callers
    /// (`DriverRegistry::release`) are responsible for checking that first.
    pub(crate) fn release(&self) -> Result<()> {
        self.driver.ops.release(&mut **self.state.lock())
    }

    pub fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.driver.ops.read(&mut **self.state.lock(), offset, buf)
    }

    pub fn write(&self, offset: u64, buf: &[u8]) -> Result<usize> {
        self.driver.ops.write(&mut **self.state.lock(), offset, buf)
    }

    pub fn ioctl(&self, request: u32, payload: &mut [u8]) -> Result<()> {
        self.driver.ops.ioctl(&mut **self.state.lock(), request, payload)
    }

    pub fn flush(&self) -> Result<()> {
        self.driver.ops.flush(&mut **self.state.lock())
    }

    pub fn stat(&self) -> Result<DriverStat> {
        self.driver.ops.stat(&**self.state.lock())
    }
}
