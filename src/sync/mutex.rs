//! Recursive mutual exclusion (§4.B).
//!
//! The same task may lock a [`RecursiveMutex`] it already holds without deadlocking
//! itself; every `lock` must be matched by an `unlock`. Waiting is a busy poll against
//! a [`TickClock`], not a scheduler block/wake — this crate has no scheduler of its
//! own, only the abstraction point other code can plug one into (§9 Design Notes).

use spin::Mutex as SpinMutex;

use super::task::{Isr, TaskId};
use super::time::{TickClock, Timeout};
use crate::err;
use crate::error::Result;

const TARGET: &str = "sync::mutex";

struct State {
    owner: Option<TaskId>,
    depth: u32,
}

pub struct RecursiveMutex {
    state: SpinMutex<State>,
}

impl RecursiveMutex {
    pub const fn new() -> Self {
        RecursiveMutex { state: SpinMutex::new(State { owner: None, depth: 0 }) }
    }

    /// Attempt to acquire once, without waiting.
    pub fn try_lock(&self, owner: TaskId) -> bool {
        let mut s = self.state.lock();
        match s.owner {
            None => {
                s.owner = Some(owner);
                s.depth = 1;
                true
            }
            Some(current) if current == owner => {
                s.depth += 1;
                true
            }
            Some(_) => false,
        }
    }

    /// Acquire, waiting up to `timeout` if another task currently holds the lock.
    pub fn lock(&self, owner: TaskId, timeout: Timeout, clock: &TickClock) -> Result<()> {
        let deadline = timeout.deadline_ms(clock);
        loop {
            if self.try_lock(owner) {
                return Ok(());
            }
            if clock.now_ms() >= deadline {
                return Err(err!(Timeout, TARGET, "mutex not acquired before deadline"));
            }
            core::hint::spin_loop();
        }
    }

    /// Release one level of recursion. Fails with `PermissionDenied` if `owner` does
    /// not currently hold the lock.
    pub fn unlock(&self, owner: TaskId) -> Result<()> {
        let mut s = self.state.lock();
        match s.owner {
            Some(current) if current == owner => {
                s.depth -= 1;
                if s.depth == 0 {
                    s.owner = None;
                }
                Ok(())
            }
            _ => Err(err!(PermissionDenied, TARGET, "unlock by non-owner")),
        }
    }

    /// Interrupt handlers must never block; acquiring from interrupt context always
    /// fails rather than spinning with interrupts masked.
    pub fn try_lock_from_isr(&self, _isr: &Isr) -> Result<()> {
        Err(err!(WouldDeadlock, TARGET, "mutex acquire attempted in interrupt context"))
    }
}

impl Default for RecursiveMutex {
    fn default() -> Self {
        Self::new()
    }
}
