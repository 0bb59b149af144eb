//! # Diagnostic Log Sink
//!
//! A small leveled logging facade every subsystem in this crate routes its diagnostics
//! through, instead of writing to a console directly. Direct console writes are the
//! exclusive privilege of the init daemon's pump loop (`boot` module); everything else
//! only ever calls [`log`].
//!
//! A sink is installed once, at boot, via [`install`]. Records emitted before
//! installation are dropped — a microcontroller has no durable store to buffer them
//! into. Installing twice replaces the previous sink; callers that care about ordering
//! should install exactly once during boot.
//!
//! ```
//! use ember_core::log::{self, Level};
//!
//! log::log(Level::Info, "boot", "console driver ready");
//! ```

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Arguments;
use spin::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One emitted diagnostic: a level, the static name of the emitting subsystem, and a
/// formatted message.
#[derive(Debug, Clone)]
pub struct Record {
    pub level: Level,
    pub target: &'static str,
    pub message: String,
}

/// A destination for log records. The on-target implementation forwards to the
/// console driver; the host-side test implementation captures into memory.
pub trait Sink: Send {
    fn emit(&mut self, record: Record);
}

struct NullSink;
impl Sink for NullSink {
    fn emit(&mut self, _record: Record) {}
}

static SINK: Mutex<(Level, Option<alloc::boxed::Box<dyn Sink>>)> =
    Mutex::new((Level::Info, None));

/// Install a sink and the minimum level it should receive. Replaces any previously
/// installed sink.
pub fn install(level: Level, sink: alloc::boxed::Box<dyn Sink>) {
    let mut guard = SINK.lock();
    guard.0 = level;
    guard.1 = Some(sink);
}

/// Raise or lower the minimum level records are delivered at, without touching the
/// installed sink.
pub fn set_level(level: Level) {
    SINK.lock().0 = level;
}

/// Emit a record if the sink is installed and `level` meets the current threshold.
///
/// Formatting happens outside the sink lock; only the delivery itself is serialized,
/// matching the console driver's own locking discipline so a partially formatted
/// record is never visible to a concurrent caller.
pub fn log(level: Level, target: &'static str, message: &str) {
    log_args(level, target, format_args!("{}", message));
}

/// As [`log`], but accepting `format_args!` directly so call sites can avoid an
/// intermediate allocation when the sink will discard the record anyway.
pub fn log_args(level: Level, target: &'static str, args: Arguments<'_>) {
    let mut guard = SINK.lock();
    if level < guard.0 {
        return;
    }
    if let Some(sink) = guard.1.as_mut() {
        sink.emit(Record { level, target, message: alloc::format!("{}", args) });
    }
}

#[macro_export]
macro_rules! log_trace {
    ($target:expr, $($arg:tt)*) => ($crate::log::log_args($crate::log::Level::Trace, $target, format_args!($($arg)*)));
}
#[macro_export]
macro_rules! log_debug {
    ($target:expr, $($arg:tt)*) => ($crate::log::log_args($crate::log::Level::Debug, $target, format_args!($($arg)*)));
}
#[macro_export]
macro_rules! log_info {
    ($target:expr, $($arg:tt)*) => ($crate::log::log_args($crate::log::Level::Info, $target, format_args!($($arg)*)));
}
#[macro_export]
macro_rules! log_warn {
    ($target:expr, $($arg:tt)*) => ($crate::log::log_args($crate::log::Level::Warn, $target, format_args!($($arg)*)));
}
#[macro_export]
macro_rules! log_error {
    ($target:expr, $($arg:tt)*) => ($crate::log::log_args($crate::log::Level::Error, $target, format_args!($($arg)*)));
}

/// Host-side sink that records everything into memory so tests can assert on what was
/// logged (§4.K), e.g. that a driver failure during boot was logged but did not abort
/// the daemon.
#[cfg(test)]
pub struct CapturingSink {
    records: alloc::sync::Arc<Mutex<Vec<Record>>>,
}

#[cfg(test)]
impl CapturingSink {
    pub fn install(level: Level) -> alloc::sync::Arc<Mutex<Vec<Record>>> {
        let records = alloc::sync::Arc::new(Mutex::new(Vec::new()));
        install(level, alloc::boxed::Box::new(CapturingSink { records: records.clone() }));
        records
    }
}

#[cfg(test)]
impl Sink for CapturingSink {
    fn emit(&mut self, record: Record) {
        self.records.lock().push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases share the crate-wide SINK static, so they run as one test to avoid
    // cross-test races when the test binary runs cases on multiple threads.
    #[test]
    fn threshold_filters_and_null_sink_drops_silently() {
        install(Level::Error, alloc::boxed::Box::new(NullSink));
        log(Level::Info, "test", "dropped, no sink installed yet conceptually");

        let records = CapturingSink::install(Level::Warn);
        log(Level::Debug, "test", "ignored");
        log(Level::Error, "test", "kept");
        let got = records.lock();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].message, "kept");
    }
}
