//! Closed error vocabulary shared by every layer of the core.
//!
//! Every fallible operation in this crate returns [`Error`], never panics and never
//! throws. The set of [`ErrorKind`] variants is intentionally closed: adding a new
//! failure mode means picking the closest existing kind rather than growing the enum,
//! so callers can match exhaustively without a catch-all arm rotting into a lie.

use core::fmt;

/// The closed set of failure kinds every core operation can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    OutOfMemory,
    InvalidArgument,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    Busy,
    IsDirectory,
    NotDirectory,
    Io,
    Timeout,
    NotSupported,
    NoSpace,
    Interrupted,
    BadHandle,
    /// Acquire attempted on a blocking primitive from interrupt context.
    WouldDeadlock,
}

/// An [`ErrorKind`] tagged with the subsystem that raised it and optional context.
///
/// Carrying the `target` alongside the kind lets a caller correlate a returned error
/// with the log record (§4.I) the subsystem emitted for the same failure, without
/// re-deriving context by re-reading the call site.
#[derive(Clone, Copy)]
pub struct Error {
    kind: ErrorKind,
    target: &'static str,
    context: Option<&'static str>,
}

impl Error {
    pub const fn new(kind: ErrorKind, target: &'static str) -> Self {
        Error { kind, target, context: None }
    }

    pub const fn with_context(kind: ErrorKind, target: &'static str, context: &'static str) -> Self {
        Error { kind, target, context: Some(context) }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn context(&self) -> Option<&'static str> {
        self.context
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.context {
            Some(ctx) => write!(f, "{:?} [{}] {}", self.kind, self.target, ctx),
            None => write!(f, "{:?} [{}]", self.kind, self.target),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Shorthand for constructing an [`Error`] at a call site: `err!(Busy, "driver")`.
#[macro_export]
macro_rules! err {
    ($kind:ident, $target:expr) => {
        $crate::error::Error::new($crate::error::ErrorKind::$kind, $target)
    };
    ($kind:ident, $target:expr, $ctx:expr) => {
        $crate::error::Error::with_context($crate::error::ErrorKind::$kind, $target, $ctx)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_includes_context_when_present() {
        let e = Error::with_context(ErrorKind::Busy, "driver", "instance has open handles");
        let rendered = alloc::format!("{:?}", e);
        assert!(rendered.contains("Busy"));
        assert!(rendered.contains("driver"));
        assert!(rendered.contains("open handles"));
    }

    #[test]
    fn equality_is_by_kind_only() {
        let a = Error::new(ErrorKind::NotFound, "vfs");
        let b = Error::with_context(ErrorKind::NotFound, "driver", "no such device");
        assert_eq!(a, b);
    }
}
