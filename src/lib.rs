//! Runtime core of a small real-time operating system targeting resource-constrained
//! ARM microcontrollers: a device driver framework, a virtual file system, an
//! application registry with stdio plumbing, and the bootstrap daemon that ties them
//! together at boot, built on a tagged allocator and a small set of synchronization
//! primitives.
//!
//! Every stateful subsystem here is an owned, constructable struct rather than a
//! global `static`; a deployment assembles the pieces it needs (allocator, driver
//! registry, VFS, app registry) into its own context rather than reaching for
//! singletons, which is also what lets every module's test suite run in isolation
//! under plain `cargo test`.
//!
//! `no_std` on target; this crate links `std` only under `#[cfg(test)]`, which is
//! what lets [`sync::TickClock`] use a real monotonic clock and this crate's test
//! suites spawn real OS threads in `testkit` without a Cargo feature flag.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app;
pub mod boot;
pub mod config;
pub mod defer;
pub mod driver;
pub mod error;
pub mod fs;
pub mod ioctl;
pub mod log;
pub mod mem;
pub mod stdio;
pub mod sync;

#[cfg(test)]
pub mod testkit;
