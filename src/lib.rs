//! sigdefer - Deferred signal handling and blocking sections for interpreter runtimes
//!
//! An interpreter cannot run arbitrary code inside an OS signal handler. The
//! handler here only records that a signal arrived; the interpreter later
//! runs the registered action at a *safe point*, where its own state is
//! consistent. Around blocking system calls, an execution context releases
//! the runtime so other contexts can run, and reacquires it afterwards.
//!
//! # Features
//!
//! - **Stable numbering**: portable signals have fixed negative numbers on every host
//! - **Coalescing delivery**: async-signal-safe recording into one flag per signal
//! - **Safe-point polling**: one relaxed load on the fast path
//! - **Blocking sections**: raw pairing, closures, and RAII guards
//! - **Pluggable hooks**: single-threaded no-ops or a fair master lock with a ticker
//!
//! # Example
//!
//! ```rust
//! use sigdefer::{NoCollector, Raise, Runtime, RuntimeSignal, SignalAction};
//!
//! let runtime = Runtime::new();
//! let context = runtime.attach();
//!
//! runtime
//!     .register_signal_handler(
//!         RuntimeSignal::INT,
//!         SignalAction::custom(|event| Err(Raise::Interrupt(event.signal))),
//!     )
//!     .unwrap();
//!
//! runtime.record_signal(RuntimeSignal::INT).unwrap();
//! assert_eq!(
//!     context.poll(&mut NoCollector),
//!     Err(Raise::Interrupt(RuntimeSignal::INT))
//! );
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   OS signal     │  async-signal context
//! └────────┬────────┘
//!          │ record (slot + aggregate + attention)
//!          ▼
//! ┌─────────────────┐      ┌──────────────────┐
//! │ PendingSignals  │      │    Attention     │  GC slice / async action
//! └────────┬────────┘      └────────┬─────────┘
//!          │                        │
//!          └──────────┬─────────────┘
//!                     ▼
//!          ┌─────────────────────┐
//!          │ ExecutionContext::  │  safe point
//!          │       poll          │
//!          └──────────┬──────────┘
//!                     ▼
//!          ┌─────────────────────┐
//!          │    SignalTable      │  Default / Ignore / Custom
//!          └─────────────────────┘
//! ```

#![warn(clippy::all)]

pub mod attention;
pub mod blocking;
pub mod config;
pub mod error;
pub mod runtime;
pub mod safepoint;
pub mod signal;
pub mod sys;

pub use attention::Attention;
pub use blocking::{
    BlockingHooks, BlockingSection, ExecutionContext, MasterLock, SectionState, SectionViolation,
    SingleThreaded, Ticker,
};
pub use config::{BlockingMode, ConfigError, RuntimeConfig};
pub use error::{Error, Raise, Result, SignalError, SignalResult};
pub use runtime::{Runtime, RuntimeBuilder};
pub use safepoint::{Collector, NoCollector};
pub use signal::{
    DefaultAction, HostDefault, RuntimeSignal, SignalAction, SignalEvent, SignalNumbering,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
