//! Safe-point dispatch
//!
//! The interpreter calls [`ExecutionContext::poll`] at every instruction
//! boundary designated a safe point. The common case is one relaxed load and
//! a not-taken branch. When attention is raised, the slow path services, in
//! order: a due major GC slice, pending signals, a due async action.

use crate::blocking::ExecutionContext;
use crate::error::Raise;
use crate::runtime::Runtime;
use crate::signal::{SignalAction, SignalEvent};
use libc::c_int;

/// The garbage collector's side of the safe-point protocol.
pub trait Collector {
    /// Perform one incremental slice of major collection.
    fn major_slice(&mut self);
}

/// For runtimes without an incremental collector.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCollector;

impl Collector for NoCollector {
    fn major_slice(&mut self) {}
}

impl<F: FnMut()> Collector for F {
    fn major_slice(&mut self) {
        self()
    }
}

impl ExecutionContext {
    /// Service pending attention requests.
    ///
    /// Never blocks, except inside an async action the hooks define. A
    /// [`Raise`] from a custom signal action is returned as-is; signals not
    /// yet drained stay pending for the next poll.
    #[inline]
    pub fn poll<C: Collector + ?Sized>(&self, collector: &mut C) -> Result<(), Raise> {
        if !self.runtime.attention().is_raised() {
            return Ok(());
        }
        self.service(collector)
    }

    #[cold]
    #[inline(never)]
    fn service<C: Collector + ?Sized>(&self, collector: &mut C) -> Result<(), Raise> {
        self.expect_owned_for_poll();
        let runtime = &*self.runtime;
        let attention = runtime.attention();

        attention.lower();

        if attention.take_major_slice() {
            log::trace!("major slice at safe point");
            collector.major_slice();
        }

        let drained = runtime
            .pending()
            .drain(runtime.numbering().drain_order(), |host| {
                runtime.dispatch(host)
            });

        if drained.is_ok() && attention.take_async_action() {
            runtime.hooks().async_action();
        }

        attention.settle(runtime.pending().are_pending());
        drained
    }
}

impl Runtime {
    /// Run the current action for `host`.
    fn dispatch(&self, host: c_int) -> Result<(), Raise> {
        let Ok(signal) = self.numbering().to_runtime(host) else {
            return Ok(());
        };
        let event = SignalEvent {
            signal,
            host,
            in_signal_handler: false,
        };
        let action = self.table().lookup(host);
        log::trace!("dispatching {} ({})", signal, action.kind());
        match action {
            SignalAction::Ignore => Ok(()),
            SignalAction::Default => {
                self.default_action().perform(&event);
                Ok(())
            }
            SignalAction::Custom(callback) => callback(&event),
        }
    }
}
