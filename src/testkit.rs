//! # Test Harness
//!
//! `#[cfg(test)]`-only doubles used across this crate's test suites: a driver that
//! echoes into a fixed byte, a console that records everything written to it, and a
//! [`ThreadScheduler`] standing in for the scheduler abstraction this crate is
//! parameterized over (§9 Design Notes) so blocking-primitive tests can exercise real
//! concurrent contention with real OS threads rather than a simulated clock.

#![cfg(test)]

extern crate alloc;

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::boot::{ConsoleDriver, TaskSpawner};
use crate::driver::{DriverOps, DriverState};
use crate::error::Result;

/// Driver double: reads return a fixed fill byte, writes are recorded.
pub struct MockDriver {
    pub fill: u8,
    pub writes: Arc<Mutex<Vec<u8>>>,
}

struct MockDriverState;
impl DriverState for MockDriverState {}

impl MockDriver {
    pub fn new(fill: u8) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let writes = Arc::new(Mutex::new(Vec::new()));
        (MockDriver { fill, writes: writes.clone() }, writes)
    }
}

impl DriverOps for MockDriver {
    fn probe(&self, _minor: u16) -> Result<Box<dyn DriverState>> {
        Ok(Box::new(MockDriverState))
    }

    fn read(&self, _state: &mut dyn DriverState, _offset: u64, buf: &mut [u8]) -> Result<usize> {
        for b in buf.iter_mut() {
            *b = self.fill;
        }
        Ok(buf.len())
    }

    fn write(&self, _state: &mut dyn DriverState, _offset: u64, buf: &[u8]) -> Result<usize> {
        self.writes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }
}

/// Console double for boot-sequence tests: captures output, replays a scripted input
/// sequence one byte per `try_read_byte` call.
pub struct MockConsole {
    pub output: Mutex<Vec<u8>>,
    pub input: Mutex<Vec<u8>>,
}

impl MockConsole {
    pub fn new(scripted_input: &[u8]) -> Self {
        let mut input: Vec<u8> = scripted_input.to_vec();
        input.reverse();
        MockConsole { output: Mutex::new(Vec::new()), input: Mutex::new(input) }
    }
}

impl ConsoleDriver for MockConsole {
    fn write_byte(&self, byte: u8) {
        self.output.lock().push(byte);
    }

    fn try_read_byte(&self) -> Option<u8> {
        self.input.lock().pop()
    }
}

/// Runs a closure on a real `std::thread`, returning a join handle. Stands in for the
/// scheduler abstraction this crate's primitives are designed to sit underneath, for
/// tests that need genuine concurrent contention (e.g. one thread holding a mutex
/// while another waits on it with a timeout).
pub struct ThreadScheduler;

impl ThreadScheduler {
    pub fn spawn<F: FnOnce() + Send + 'static>(f: F) -> std::thread::JoinHandle<()> {
        std::thread::spawn(f)
    }
}

/// `TaskSpawner` over real OS threads: the init daemon's foreground program runs on
/// its own thread, detached, exactly as a real scheduler would run it as its own unit
/// of execution concurrently with the daemon's pump loop. Fire-and-forget because the
/// real daemon never joins a handle either — it learns the program has finished from
/// the status sentinel on its stdout queue, not from the unit of execution exiting.
impl TaskSpawner for ThreadScheduler {
    fn spawn(&self, task: Box<dyn FnOnce() + Send>) {
        std::thread::spawn(move || task());
    }
}

/// `TaskSpawner` that drops the task instead of running it, for tests that drive
/// `InitDaemon`'s pump loop by hand (e.g. feeding bytes directly into the foreground
/// stdio pair) without a real program racing the assertions.
pub struct NoopSpawner;

impl TaskSpawner for NoopSpawner {
    fn spawn(&self, task: Box<dyn FnOnce() + Send>) {
        drop(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_driver_records_writes_and_fills_reads() {
        let (driver, writes) = MockDriver::new(0x5A);
        let mut state = MockDriverState;
        let mut buf = [0u8; 3];
        driver.read(&mut state, 0, &mut buf).unwrap();
        assert_eq!(buf, [0x5A; 3]);
        driver.write(&mut state, 0, &[1, 2, 3]).unwrap();
        assert_eq!(writes.lock().as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn mock_console_replays_scripted_input() {
        let console = MockConsole::new(&[b'a', b'b']);
        assert_eq!(console.try_read_byte(), Some(b'a'));
        assert_eq!(console.try_read_byte(), Some(b'b'));
        assert_eq!(console.try_read_byte(), None);
    }

    #[test]
    fn thread_scheduler_runs_closure() {
        let flag = Arc::new(Mutex::new(false));
        let flag2 = flag.clone();
        let handle = ThreadScheduler::spawn(move || {
            *flag2.lock() = true;
        });
        handle.join().unwrap();
        assert!(*flag.lock());
    }
}
