//! Blocking sections
//!
//! An [`ExecutionContext`] either owns the runtime-exclusive resource
//! (`RuntimeOwned`) or has released it around a blocking call
//! (`Released`). At most one context owns it at a time when the hooks
//! enforce exclusivity ([`MasterLock`]).
//!
//! ```text
//!            enter_blocking_section
//! RuntimeOwned ───────────────────────► Released
//!      ▲                                   │
//!      └───────────────────────────────────┘
//!        leave_blocking_section / try_leave
//! ```
//!
//! Calling `enter` from `Released` or `leave` from `RuntimeOwned` aborts the
//! process. Prefer [`ExecutionContext::blocking`] or
//! [`ExecutionContext::section`], which reacquire on every exit path.

pub mod hooks;
pub mod master_lock;

pub use hooks::{BlockingHooks, SingleThreaded};
pub use master_lock::{MasterLock, Ticker, DEFAULT_TICK};

use crate::error::fatal;
use crate::runtime::Runtime;
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    RuntimeOwned,
    Released,
}

/// Corrupted resource accounting. Always fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SectionViolation {
    #[error("blocking section entered while already released (double release)")]
    DoubleRelease,

    #[error("blocking section left while owning the runtime (double acquire)")]
    DoubleAcquire,

    #[error("safe point polled while the runtime is released")]
    PollWhileReleased,

    #[error("runtime acquired by a thread that already owns it")]
    NestedAcquire,
}

thread_local! {
    /// Runtimes owned by a context on this thread, by address.
    static OWNED: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

fn runtime_key(runtime: &Arc<Runtime>) -> usize {
    Arc::as_ptr(runtime) as usize
}

fn owned_here(key: usize) -> bool {
    OWNED.with(|owned| owned.borrow().contains(&key))
}

fn mark_owned(key: usize) {
    OWNED.with(|owned| owned.borrow_mut().push(key));
}

fn mark_released(key: usize) {
    OWNED.with(|owned| {
        let mut owned = owned.borrow_mut();
        if let Some(index) = owned.iter().position(|&k| k == key) {
            owned.swap_remove(index);
        }
    });
}

/// Per-thread view of the runtime. Not `Send`: ownership of the runtime
/// resource belongs to the thread that acquired it.
pub struct ExecutionContext {
    pub(crate) runtime: Arc<Runtime>,
    state: Cell<SectionState>,
    _not_send: PhantomData<*const ()>,
}

impl ExecutionContext {
    /// Acquire the runtime for a new context; waits under exclusive hooks.
    pub(crate) fn attach(runtime: Arc<Runtime>) -> Self {
        let key = runtime_key(&runtime);
        if owned_here(key) {
            fatal(SectionViolation::NestedAcquire);
        }
        runtime.hooks().leave();
        mark_owned(key);
        Self {
            runtime,
            state: Cell::new(SectionState::RuntimeOwned),
            _not_send: PhantomData,
        }
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn state(&self) -> SectionState {
        self.state.get()
    }

    pub fn owns_runtime(&self) -> bool {
        self.state.get() == SectionState::RuntimeOwned
    }

    /// Release the runtime before a blocking call.
    pub fn enter_blocking_section(&self) {
        if let Err(violation) = self.expect(SectionState::RuntimeOwned) {
            fatal(violation);
        }
        self.runtime.hooks().enter();
        mark_released(runtime_key(&self.runtime));
        self.state.set(SectionState::Released);
    }

    /// Reacquire the runtime after a blocking call. May wait.
    pub fn leave_blocking_section(&self) {
        if let Err(violation) = self.expect(SectionState::Released) {
            fatal(violation);
        }
        let key = runtime_key(&self.runtime);
        if owned_here(key) {
            fatal(SectionViolation::NestedAcquire);
        }
        self.runtime.hooks().leave();
        mark_owned(key);
        self.state.set(SectionState::RuntimeOwned);
    }

    /// Reacquire the runtime if that does not wait. On `false` the context
    /// stays released.
    pub fn try_leave_blocking_section(&self) -> bool {
        if let Err(violation) = self.expect(SectionState::Released) {
            fatal(violation);
        }
        let key = runtime_key(&self.runtime);
        if owned_here(key) {
            return false;
        }
        let acquired = self.runtime.hooks().try_leave();
        if acquired {
            mark_owned(key);
            self.state.set(SectionState::RuntimeOwned);
        }
        acquired
    }

    /// Run `f` with the runtime released, reacquiring afterwards even if
    /// `f` unwinds.
    pub fn blocking<R>(&self, f: impl FnOnce() -> R) -> R {
        let _section = self.section();
        f()
    }

    /// Release the runtime until the returned guard drops.
    pub fn section(&self) -> BlockingSection<'_> {
        self.enter_blocking_section();
        BlockingSection { context: self }
    }

    fn expect(&self, required: SectionState) -> Result<(), SectionViolation> {
        match (required, self.state.get()) {
            (SectionState::RuntimeOwned, SectionState::Released) => {
                Err(SectionViolation::DoubleRelease)
            }
            (SectionState::Released, SectionState::RuntimeOwned) => {
                Err(SectionViolation::DoubleAcquire)
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn expect_owned_for_poll(&self) {
        if !self.owns_runtime() {
            fatal(SectionViolation::PollWhileReleased);
        }
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        if self.owns_runtime() {
            self.runtime.hooks().enter();
            mark_released(runtime_key(&self.runtime));
        }
    }
}

/// Scoped blocking section; reacquires the runtime when dropped.
#[must_use = "the runtime is reacquired as soon as the section is dropped"]
pub struct BlockingSection<'a> {
    context: &'a ExecutionContext,
}

impl Drop for BlockingSection<'_> {
    fn drop(&mut self) {
        self.context.leave_blocking_section();
    }
}
