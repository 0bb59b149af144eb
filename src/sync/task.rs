//! Task identity and the interrupt-context token.
//!
//! The framework does not track "the currently running task" itself — that belongs to
//! whatever scheduler a deployment provides (§4.B is explicitly parameterized over a
//! scheduler abstraction). Callers identify themselves by [`TaskId`] when they acquire
//! a primitive that cares about ownership (the recursive mutex).

extern crate alloc;

/// Opaque identity of a task, stable for the task's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

/// Proof that the caller is executing in interrupt context.
///
/// Only an interrupt handler should ever construct one, via [`Isr::assume`]. Primitives
/// that must never block (the `_from_isr` / `_from_isr` family) take `&Isr` so the
/// handler's call site visibly documents which context it runs in; primitives that can
/// block simply never accept one, which is as close as a zero-cost token gets to
/// "the type system forbids blocking calls from interrupt context" without also
/// tracking call-stack provenance end to end.
pub struct Isr(());

impl Isr {
    /// # Safety
    /// The caller must genuinely be executing with interrupts disabled / in interrupt
    /// context, i.e. calling this from ordinary task context is a soundness violation
    /// of the contract every `_from_isr` method relies on (no allocation, no blocking).
    pub unsafe fn assume() -> Self {
        Isr(())
    }
}

/// Priority, stack and joinability a caller requests when spawning a task (§4.B, §4.F).
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: alloc::string::String,
    pub priority: u8,
    pub stack_size: usize,
    pub joinable: bool,
}

/// Outcome of a task that has run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Ok,
    Error,
}
