//! Event flag group (§4.B): a bitset tasks wait on, set independently by any number of
//! producers (including interrupt handlers). Commonly used by a driver ISR to signal
//! "transfer complete" to the task that queued it without a dedicated queue of one.

use core::sync::atomic::{AtomicU32, Ordering};

use super::task::Isr;
use super::time::{TickClock, Timeout};
use crate::err;
use crate::error::Result;

const TARGET: &str = "sync::flags";

/// Whether [`FlagGroup::wait`] is satisfied by any one of `mask`'s bits, or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    Any,
    All,
}

pub struct FlagGroup {
    bits: AtomicU32,
}

impl FlagGroup {
    pub const fn new() -> Self {
        FlagGroup { bits: AtomicU32::new(0) }
    }

    pub fn set(&self, mask: u32) {
        self.bits.fetch_or(mask, Ordering::AcqRel);
    }

    pub fn set_from_isr(&self, _isr: &Isr, mask: u32) {
        self.set(mask);
    }

    pub fn clear(&self, mask: u32) {
        self.bits.fetch_and(!mask, Ordering::AcqRel);
    }

    pub fn get(&self) -> u32 {
        self.bits.load(Ordering::Acquire)
    }

    fn satisfied(current: u32, mask: u32, mode: WaitMode) -> bool {
        match mode {
            WaitMode::Any => current & mask != 0,
            WaitMode::All => current & mask == mask,
        }
    }

    /// Wait for `mask` to be satisfied under `mode`. On success, the satisfying bits
    /// are cleared from the group (auto-clear-on-consume), and returned to the caller.
    pub fn wait(&self, mask: u32, mode: WaitMode, timeout: Timeout, clock: &TickClock) -> Result<u32> {
        let deadline = timeout.deadline_ms(clock);
        loop {
            let current = self.get();
            if Self::satisfied(current, mask, mode) {
                let observed = current & mask;
                self.clear(observed);
                return Ok(observed);
            }
            if clock.now_ms() >= deadline {
                return Err(err!(Timeout, TARGET, "flag mask not satisfied before deadline"));
            }
            core::hint::spin_loop();
        }
    }
}

impl Default for FlagGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_any_returns_as_soon_as_one_bit_is_set() {
        let g = FlagGroup::new();
        g.set(0b010);
        let clock = TickClock::new();
        let got = g.wait(0b011, WaitMode::Any, Timeout::Try, &clock).unwrap();
        assert_eq!(got, 0b010);
        assert_eq!(g.get(), 0);
    }

    #[test]
    fn wait_all_requires_every_bit() {
        let g = FlagGroup::new();
        g.set(0b01);
        let clock = TickClock::new();
        assert_eq!(
            g.wait(0b11, WaitMode::All, Timeout::Try, &clock).unwrap_err().kind(),
            crate::error::ErrorKind::Timeout
        );
        g.set(0b10);
        let got = g.wait(0b11, WaitMode::All, Timeout::Try, &clock).unwrap();
        assert_eq!(got, 0b11);
    }

    #[test]
    fn set_from_isr_wakes_a_waiter() {
        use alloc::sync::Arc;
        let g = Arc::new(FlagGroup::new());
        let clock = TickClock::new();

        let g2 = g.clone();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            let isr = unsafe { Isr::assume() };
            g2.set_from_isr(&isr, 0b1);
        });

        let got = g.wait(0b1, WaitMode::Any, Timeout::After(500), &clock).unwrap();
        assert_eq!(got, 0b1);
    }
}
