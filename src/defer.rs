//! Scope-guard helper used to give fallible multi-resource sequences guaranteed-release
//! cleanup (§7) without threading a manual cleanup call down every early-return path.
//!
//! ```
//! use ember_core::defer::defer;
//!
//! let mut released = false;
//! {
//!     let _guard = defer(|| released = true);
//! }
//! assert!(released);
//! ```

/// Run `f` when the returned guard is dropped, regardless of how the enclosing scope
/// is exited (normal return, early return, or a propagated error).
#[must_use]
pub fn defer<F: FnOnce()>(f: F) -> impl Drop {
    struct Guard<F: FnOnce()>(Option<F>);

    impl<F: FnOnce()> Drop for Guard<F> {
        fn drop(&mut self) {
            if let Some(f) = self.0.take() {
                f();
            }
        }
    }

    Guard(Some(f))
}

/// Concise form of [`defer`] for a block of statements rather than a closure expression.
#[macro_export]
macro_rules! defer {
    ($($body:tt)*) => {
        let _guard = $crate::defer::defer(|| { $($body)* });
    };
}
