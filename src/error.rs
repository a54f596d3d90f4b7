//! Error types
//!
//! Recoverable failures are reported through these enums. Corrupted
//! blocking-section accounting is not recoverable and goes through
//! [`fatal`] instead.

use crate::blocking::SectionViolation;
use crate::config::ConfigError;
use crate::signal::RuntimeSignal;
use nix::errno::Errno;
use thiserror::Error;

/// Signal numbering and registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("host signal {0} is not supported on this platform")]
    UnsupportedSignal(i32),

    #[error("runtime signal {0} has no host counterpart")]
    UnknownRuntimeSignal(i32),

    #[error("invalid signal {0}: out of range or not interceptable")]
    InvalidSignal(i32),

    #[error("unknown signal name {0:?}")]
    UnknownName(String),

    #[error("failed to set host disposition of {signal}: {source}")]
    Os {
        signal: RuntimeSignal,
        #[source]
        source: Errno,
    },
}

/// Result type for signal operations.
pub type SignalResult<T> = std::result::Result<T, SignalError>;

/// Exceptional control flow raised by a custom signal action.
///
/// Returned unchanged from [`ExecutionContext::poll`](crate::ExecutionContext::poll)
/// so the interpreter can propagate it like any other failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Raise {
    #[error("interrupted by {0}")]
    Interrupt(RuntimeSignal),

    #[error("exit requested with status {0}")]
    Exit(i32),

    #[error("signal action failed: {0}")]
    Failed(String),
}

/// Errors from building a runtime.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error("failed to start tick thread: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Abort the process after a resource-accounting violation.
#[cold]
#[inline(never)]
pub(crate) fn fatal(violation: SectionViolation) -> ! {
    log::error!("fatal runtime error: {}", violation);
    std::process::abort()
}
