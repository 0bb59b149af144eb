//! # Synchronization Primitives
//!
//! Mutex, semaphore, bounded queue and event-flag group, all built on the same shape:
//! a busy poll against a [`time::TickClock`] bounded by a [`time::Timeout`]. None of
//! these primitives park a task with a scheduler — there is no scheduler in this
//! crate, only the two context tokens ([`task::TaskId`], [`task::Isr`]) that let a
//! scheduler built on top of this crate tell tasks and interrupt handlers apart at
//! the call site (§9 Design Notes).

pub mod flags;
pub mod mutex;
pub mod queue;
pub mod semaphore;
pub mod task;
pub mod time;

pub use flags::{FlagGroup, WaitMode};
pub use mutex::RecursiveMutex;
pub use queue::Queue;
pub use semaphore::Semaphore;
pub use task::{Isr, TaskId, TaskSpec, TaskStatus};
pub use time::{TickClock, Timeout};
