//! # Bootstrap / Init Daemon
//!
//! The single task that brings the runtime up and then pumps console I/O for the
//! foreground program forever (§4.H), concurrently with that program running as its
//! own unit of execution (§5: "the init daemon suspends either on the foreground
//! program's stdout queue or on the console driver's input probe"). This module does
//! not itself provide a scheduler (§9 Design Notes): [`TaskSpawner`] is the seam a
//! real deployment's scheduler fills in, and [`InitDaemon::pump_once`] is one
//! iteration of the loop §4.H describes, left for a caller to drive repeatedly.

extern crate alloc;

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::app::AppRegistry;
use crate::config::STDIO_RING_CAPACITY;
use crate::mem::MemoryAllocator;
use crate::stdio::{StdioPair, STATUS_ERROR, STATUS_OK};

/// Minimal console contract the init daemon pumps bytes through. A real console
/// driver is registered with the [`crate::driver::DriverRegistry`] like any other
/// device; this trait is the narrow byte-level slice of it the pump loop needs,
/// independent of the generic offset-addressed `DriverOps::read`/`write`.
pub trait ConsoleDriver: Send + Sync {
    fn write_byte(&self, byte: u8);
    /// Non-blocking probe for one input byte (§4.H step 2).
    fn try_read_byte(&self) -> Option<u8>;
}

/// The seam a real deployment's scheduler fills in: a way to run a unit of work as
/// its own concurrent thing, independent of the caller that asked for it to start.
/// `testkit::ThreadScheduler` implements this over real OS threads for tests;
/// `testkit::NoopSpawner` drops the task for tests that only want to drive the pump
/// loop by hand.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, task: Box<dyn FnOnce() + Send>);
}

/// Outcome of one program reaching its stdout sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramOutcome {
    Ok,
    Error,
}

pub struct InitDaemon {
    console: Arc<dyn ConsoleDriver>,
    registry: Arc<AppRegistry>,
    allocator: Arc<MemoryAllocator>,
    foreground: Option<Arc<StdioPair>>,
}

impl InitDaemon {
    pub fn new(console: Arc<dyn ConsoleDriver>, registry: Arc<AppRegistry>, allocator: Arc<MemoryAllocator>) -> Self {
        crate::log_info!("boot", "console driver ready");
        InitDaemon { console, registry, allocator, foreground: None }
    }

    /// Run each collaborator init closure in order; a failure is logged but never
    /// aborts the daemon (§4.H step 2).
    pub fn bring_up_collaborators(&self, collaborators: &[(&str, &dyn Fn() -> crate::error::Result<()>)]) {
        for (name, init) in collaborators {
            if let Err(e) = init() {
                crate::log_error!("boot", "collaborator '{}' failed to initialize: {:?}", name, e);
            } else {
                crate::log_debug!("boot", "collaborator '{}' initialized", name);
            }
        }
    }

    /// Spawn the first program (§4.H step 3) onto `spawner`, running concurrently
    /// with this daemon's own pump loop — the one unit of execution §8 scenario 1
    /// describes bytes flowing to and from while the program is still live. `argv` is
    /// copied so the spawned unit of execution doesn't need to borrow from the caller.
    pub fn spawn_foreground(
        &mut self,
        name: &'static str,
        argv: &[&str],
        spawner: &dyn TaskSpawner,
    ) -> crate::error::Result<()> {
        self.registry.lookup(name).ok_or_else(|| crate::err!(NotFound, "boot", "first program not registered"))?;
        let stdio = Arc::new(StdioPair::new(STDIO_RING_CAPACITY));
        let registry = self.registry.clone();
        let allocator = self.allocator.clone();
        let task_stdio = stdio.clone();
        let owned_argv: Vec<alloc::string::String> = argv.iter().map(|s| alloc::string::String::from(*s)).collect();
        spawner.spawn(Box::new(move || {
            let argv_refs: Vec<&str> = owned_argv.iter().map(|s| s.as_str()).collect();
            let _ = registry.spawn(&allocator, name, &argv_refs, &task_stdio);
        }));
        self.foreground = Some(stdio);
        crate::log_info!("boot", "spawned foreground program '{}'", name);
        Ok(())
    }

    pub fn foreground_stdio(&self) -> Option<&StdioPair> {
        self.foreground.as_deref()
    }

    /// The allocator a deployment's scheduler should charge the foreground program's
    /// task stack to when it actually runs the entry this daemon looked up — running
    /// the entry itself is the scheduler's job, not this module's (see module docs).
    pub fn allocator(&self) -> &Arc<MemoryAllocator> {
        &self.allocator
    }

    /// One iteration of the pump loop (§4.H step 4). Returns `Some(outcome)` once the
    /// foreground program's sentinel is observed, at which point its stdio pair is
    /// freed and the daemon has nothing left to pump until another program is spawned.
    pub fn pump_once(&mut self) -> Option<ProgramOutcome> {
        let Some(stdio) = self.foreground.as_ref() else {
            return None;
        };

        let mut did_work = false;

        if let Some(byte) = stdio.drain_stdout() {
            did_work = true;
            match byte {
                STATUS_OK | STATUS_ERROR => {
                    let outcome = if byte == STATUS_OK { ProgramOutcome::Ok } else { ProgramOutcome::Error };
                    // §8 scenario 1: the sentinel is itself part of console output, not
                    // just an internal signal, so it's written before the pair is freed.
                    self.console.write_byte(byte);
                    crate::log_info!("boot", "foreground program terminated: {:?}", outcome);
                    self.foreground = None;
                    return Some(outcome);
                }
                b => self.console.write_byte(b),
            }
        }

        if let Some(byte) = self.console.try_read_byte() {
            did_work = true;
            stdio.feed_stdin(byte);
        }

        if !did_work {
            // §4.H: "if both sides were idle this iteration, sleep one tick" — left to
            // the caller's scheduler, which is the only thing that knows how to yield.
        }

        None
    }
}
