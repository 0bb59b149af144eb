//! Counting semaphore (§4.B). Unlike the mutex this carries no owner — any task (or,
//! via [`Semaphore::give_from_isr`], an interrupt handler) may post to it.

use core::sync::atomic::{AtomicUsize, Ordering};

use super::task::Isr;
use super::time::{TickClock, Timeout};
use crate::err;
use crate::error::Result;

const TARGET: &str = "sync::semaphore";

pub struct Semaphore {
    count: AtomicUsize,
    max: usize,
}

impl Semaphore {
    pub const fn new(initial: usize, max: usize) -> Self {
        Semaphore { count: AtomicUsize::new(initial), max }
    }

    pub fn try_take(&self) -> bool {
        loop {
            let current = self.count.load(Ordering::Acquire);
            if current == 0 {
                return false;
            }
            if self
                .count
                .compare_exchange_weak(current, current - 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    pub fn take(&self, timeout: Timeout, clock: &TickClock) -> Result<()> {
        let deadline = timeout.deadline_ms(clock);
        loop {
            if self.try_take() {
                return Ok(());
            }
            if clock.now_ms() >= deadline {
                return Err(err!(Timeout, TARGET, "semaphore not available before deadline"));
            }
            core::hint::spin_loop();
        }
    }

    /// Post a permit. Saturates at `max` rather than erroring: a driver ISR that races
    /// a task drain is expected to occasionally over-post, and the count is a bound,
    /// not a ledger that must balance exactly.
    pub fn give(&self) {
        loop {
            let current = self.count.load(Ordering::Acquire);
            let next = (current + 1).min(self.max);
            if current == next
                || self
                    .count
                    .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            {
                return;
            }
        }
    }

    /// Interrupt-safe post: identical to [`Semaphore::give`], the `&Isr` only
    /// documents the call site's context since this path never allocates or blocks.
    pub fn give_from_isr(&self, _isr: &Isr) {
        self.give();
    }

    pub fn available(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_drains_and_blocks() {
        let s = Semaphore::new(1, 1);
        assert!(s.try_take());
        assert!(!s.try_take());
    }

    #[test]
    fn give_saturates_at_max() {
        let s = Semaphore::new(0, 2);
        s.give();
        s.give();
        s.give();
        assert_eq!(s.available(), 2);
    }

    #[test]
    fn take_times_out_when_empty() {
        let s = Semaphore::new(0, 1);
        let clock = TickClock::new();
        let err = s.take(Timeout::After(10), &clock).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Timeout);
    }

    #[test]
    fn give_from_isr_wakes_a_waiting_take() {
        use alloc::sync::Arc;
        let s = Arc::new(Semaphore::new(0, 1));
        let clock = TickClock::new();

        let s2 = s.clone();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            let isr = unsafe { Isr::assume() };
            s2.give_from_isr(&isr);
        });

        s.take(Timeout::After(500), &clock).unwrap();
    }
}
