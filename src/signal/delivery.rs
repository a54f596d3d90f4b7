//! The asynchronous signal-delivery path
//!
//! Everything reachable from [`SignalDelivery::record`] runs inside an OS
//! signal handler: fixed-array reads and atomic stores only. No allocation,
//! no locks, no logging, and no shared code with the safe-point drain.

use super::number::SignalNumbering;
use super::pending::PendingSignals;
use crate::attention::Attention;
use libc::c_int;

/// Borrowed view of exactly the state the delivery context may touch.
#[derive(Clone, Copy)]
pub struct SignalDelivery<'a> {
    numbering: &'a SignalNumbering,
    pending: &'a PendingSignals,
    attention: &'a Attention,
}

impl<'a> SignalDelivery<'a> {
    pub(crate) fn new(
        numbering: &'a SignalNumbering,
        pending: &'a PendingSignals,
        attention: &'a Attention,
    ) -> Self {
        Self {
            numbering,
            pending,
            attention,
        }
    }

    /// Record an occurrence of host signal `host`.
    ///
    /// Idempotent and reentrant: a nested delivery of the same or another
    /// signal only repeats the same stores. Returns `false` for unsupported
    /// numbers, which are dropped.
    #[inline]
    pub fn record(&self, host: c_int) -> bool {
        let Some(slot) = self.numbering.slot(host) else {
            return false;
        };
        self.pending.mark(slot);
        self.attention.raise();
        true
    }
}
