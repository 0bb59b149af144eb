//! # Application Registry
//!
//! An append-only table of `(name, entry, stack_hint)` built up at boot and never
//! modified afterward (§4.F); `spawn` looks a name up, runs the entry against a
//! caller-supplied [`crate::stdio::StdioPair`] (borrowed, not owned, so the same pair
//! can be shared with [`crate::boot::InitDaemon`]'s pump loop while the entry runs)
//! and returns its [`TaskStatus`] directly. This crate does not itself provide a
//! scheduler to run the entry function on (§9 Design Notes); `spawn` runs it
//! synchronously on the caller, while `boot::InitDaemon::spawn_foreground` runs it on
//! whatever unit of execution a `boot::TaskSpawner` provides instead.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use spin::Mutex;

use crate::err;
use crate::error::Result;
use crate::mem::{MemoryAllocator, Tag};
use crate::stdio::StdioPair;
use crate::sync::TaskStatus;

const TARGET: &str = "app";

pub type EntryFn = fn(argc: usize, argv: &[&str], stdio: &StdioPair) -> TaskStatus;

#[derive(Clone, Copy)]
pub struct ProgramEntry {
    pub name: &'static str,
    pub entry: EntryFn,
    pub stack_hint: usize,
}

pub struct AppRegistry {
    entries: Mutex<BTreeMap<&'static str, ProgramEntry>>,
    next_program_id: Mutex<u32>,
}

impl AppRegistry {
    pub fn new() -> Self {
        AppRegistry { entries: Mutex::new(BTreeMap::new()), next_program_id: Mutex::new(0) }
    }

    /// Register a program. Intended to be called only during boot; nothing enforces
    /// that beyond convention, matching the VFS mount table's own discipline (§5).
    pub fn register(&self, entry: ProgramEntry) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.contains_key(entry.name) {
            return Err(err!(AlreadyExists, TARGET, "program name already registered"));
        }
        entries.insert(entry.name, entry);
        crate::log_info!(TARGET, "registered program '{}'", entry.name);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<ProgramEntry> {
        self.entries.lock().get(name).copied()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.lock().keys().copied().collect()
    }

    /// Look up `name`, charge a program-instance allocation tag for its stack, and run
    /// its entry to completion (§4.F steps 1-4). Returns `NotFound` if unregistered.
    pub fn spawn(&self, allocator: &MemoryAllocator, name: &str, argv: &[&str], stdio: &StdioPair) -> Result<TaskStatus> {
        let entry = self.lookup(name).ok_or_else(|| err!(NotFound, TARGET, "no such program"))?;
        let tag = Tag::Program(self.allocate_program_id());
        let stack = allocator.allocate(tag, entry.stack_hint)?;
        let status = (entry.entry)(argv.len(), argv, stdio);
        allocator.free(tag, stack)?;
        crate::log_info!(TARGET, "program '{}' terminated", name);
        Ok(status)
    }

    fn allocate_program_id(&self) -> u32 {
        let mut id = self.next_program_id.lock();
        let value = *id;
        *id += 1;
        value
    }
}

impl Default for AppRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stdio::StdioPair;

    fn ok_entry(_argc: usize, _argv: &[&str], _stdio: &StdioPair) -> TaskStatus {
        TaskStatus::Ok
    }

    fn error_entry(_argc: usize, _argv: &[&str], _stdio: &StdioPair) -> TaskStatus {
        TaskStatus::Error
    }

    #[test]
    fn spawn_runs_registered_entry_and_returns_its_status() {
        let registry = AppRegistry::new();
        registry.register(ProgramEntry { name: "ok", entry: ok_entry, stack_hint: 1024 }).unwrap();
        let allocator = MemoryAllocator::new();
        let stdio = StdioPair::new(64);
        let status = registry.spawn(&allocator, "ok", &[], &stdio).unwrap();
        assert_eq!(status, TaskStatus::Ok);
        assert_eq!(allocator.total_usage(), 0);
    }

    #[test]
    fn spawn_unregistered_name_is_not_found() {
        let registry = AppRegistry::new();
        let allocator = MemoryAllocator::new();
        let err = registry.spawn(&allocator, "missing", &[], &StdioPair::new(64)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = AppRegistry::new();
        registry.register(ProgramEntry { name: "ok", entry: ok_entry, stack_hint: 1024 }).unwrap();
        let err = registry.register(ProgramEntry { name: "ok", entry: error_entry, stack_hint: 1024 }).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::AlreadyExists);
    }

    #[test]
    fn failing_program_status_is_observable_by_the_caller() {
        let registry = AppRegistry::new();
        registry.register(ProgramEntry { name: "bad", entry: error_entry, stack_hint: 1024 }).unwrap();
        let allocator = MemoryAllocator::new();
        let status = registry.spawn(&allocator, "bad", &[], &StdioPair::new(64)).unwrap();
        assert_eq!(status, TaskStatus::Error);
    }
}
