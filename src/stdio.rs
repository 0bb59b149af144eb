//! # Standard-I/O Plumbing
//!
//! A `stdio_pair` (§4.G) is two bounded byte [`crate::sync::Queue`]s of equal fixed
//! capacity. Program-side access is one byte at a time through [`StdioPair::getch`]
//! (blocks on an empty `stdin`) and [`StdioPair::putch`] (blocks on a full `stdout`);
//! both take a [`Timeout`] since every blocking primitive in this crate does (§5
//! Cancellation and timeouts).

use crate::config::STDIO_RING_CAPACITY;
use crate::error::Result;
use crate::sync::{Queue, TickClock, Timeout};

/// Written to `stdout` immediately before a program returns to signal successful
/// completion; interpreted by the init daemon's pump loop (§4.H).
pub const STATUS_OK: u8 = crate::config::STATUS_OK;
/// As [`STATUS_OK`], for an unsuccessful return.
pub const STATUS_ERROR: u8 = crate::config::STATUS_ERROR;

pub struct StdioPair {
    stdin_buf: Queue<u8>,
    stdout_buf: Queue<u8>,
}

impl StdioPair {
    pub fn new(capacity: usize) -> Self {
        StdioPair { stdin_buf: Queue::new(capacity), stdout_buf: Queue::new(capacity) }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(STDIO_RING_CAPACITY)
    }

    /// Blocking read of one byte from `stdin_buf`. Called by the running program.
    pub fn getch(&self, timeout: Timeout, clock: &TickClock) -> Result<u8> {
        self.stdin_buf.pop(timeout, clock)
    }

    /// Blocking write of one byte to `stdout_buf`. Called by the running program.
    pub fn putch(&self, byte: u8, timeout: Timeout, clock: &TickClock) -> Result<()> {
        self.stdout_buf.push(byte, timeout, clock)
    }

    /// Non-blocking enqueue into `stdin_buf`; drops the byte if full (§4.H step 2: the
    /// pump loop never blocks on behalf of the console driver's input).
    pub fn feed_stdin(&self, byte: u8) {
        let _ = self.stdin_buf.try_push(byte);
    }

    /// Non-blocking dequeue from `stdout_buf`, for the pump loop to forward to the
    /// console driver one byte at a time (§4.H step 1).
    pub fn drain_stdout(&self) -> Option<u8> {
        self.stdout_buf.try_pop()
    }

    pub fn stdout_is_idle(&self) -> bool {
        self.stdout_buf.is_empty()
    }

    pub fn stdin_has_input(&self) -> bool {
        !self.stdin_buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn putch_then_getch_round_trips_one_byte() {
        let pair = StdioPair::new(4);
        let clock = TickClock::new();
        pair.putch(b'x', Timeout::Try, &clock).unwrap();
        assert_eq!(pair.getch(Timeout::Try, &clock).unwrap(), b'x');
    }

    #[test]
    fn getch_times_out_when_stdin_is_empty() {
        let pair = StdioPair::new(4);
        let clock = TickClock::new();
        let err = pair.getch(Timeout::After(10), &clock).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Timeout);
    }

    #[test]
    fn putch_blocks_once_stdout_is_full() {
        let pair = StdioPair::new(1);
        let clock = TickClock::new();
        pair.putch(b'a', Timeout::Try, &clock).unwrap();
        let err = pair.putch(b'b', Timeout::After(10), &clock).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Timeout);
    }

    #[test]
    fn pump_loop_style_drain_and_feed_are_non_blocking() {
        let pair = StdioPair::new(4);
        assert!(pair.drain_stdout().is_none());
        pair.feed_stdin(b'q');
        assert!(pair.stdin_has_input());
    }
}
