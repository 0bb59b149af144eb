//! Bounded inter-task queue (§4.B). Backs, among other things, the stdio ring buffers
//! in the `stdio` module — that module wraps this one rather than re-implementing a
//! second ring buffer with its own locking.

use alloc::collections::VecDeque;
use spin::Mutex;

use super::time::{TickClock, Timeout};
use crate::err;
use crate::error::Result;

const TARGET: &str = "sync::queue";

pub struct Queue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> Queue<T> {
    pub fn new(capacity: usize) -> Self {
        Queue { items: Mutex::new(VecDeque::with_capacity(capacity)), capacity }
    }

    pub fn try_push(&self, value: T) -> core::result::Result<(), T> {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            return Err(value);
        }
        items.push_back(value);
        Ok(())
    }

    pub fn push(&self, value: T, timeout: Timeout, clock: &TickClock) -> Result<()> {
        let deadline = timeout.deadline_ms(clock);
        let mut value = value;
        loop {
            match self.try_push(value) {
                Ok(()) => return Ok(()),
                Err(rejected) => value = rejected,
            }
            if clock.now_ms() >= deadline {
                return Err(err!(Timeout, TARGET, "queue full past deadline"));
            }
            core::hint::spin_loop();
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    pub fn pop(&self, timeout: Timeout, clock: &TickClock) -> Result<T> {
        let deadline = timeout.deadline_ms(clock);
        loop {
            if let Some(value) = self.try_pop() {
                return Ok(value);
            }
            if clock.now_ms() >= deadline {
                return Err(err!(Timeout, TARGET, "queue empty past deadline"));
            }
            core::hint::spin_loop();
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
