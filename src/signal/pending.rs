//! Pending-signal indicators
//!
//! One boolean slot per host signal plus an aggregate flag. Slots are set by
//! the delivery path (see [`super::delivery`]) and cleared here, one at a
//! time, by the safe-point drain. Repeated occurrences before a drain
//! coalesce into one.

use super::number::NSIG;
use libc::c_int;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct PendingSignals {
    slots: [AtomicBool; NSIG],
    /// True iff at least one slot is set, outside of a drain in progress.
    signals_are_pending: AtomicBool,
}

impl PendingSignals {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicBool::new(false)),
            signals_are_pending: AtomicBool::new(false),
        }
    }

    /// Delivery context only: one store to the slot, one to the aggregate.
    #[inline(always)]
    pub(super) fn mark(&self, slot: usize) {
        self.slots[slot].store(true, Ordering::SeqCst);
        self.signals_are_pending.store(true, Ordering::SeqCst);
    }

    pub fn are_pending(&self) -> bool {
        self.signals_are_pending.load(Ordering::SeqCst)
    }

    pub fn is_pending(&self, host: c_int) -> bool {
        self.slots
            .get(host as usize)
            .is_some_and(|slot| slot.load(Ordering::SeqCst))
    }

    /// Dispatch every pending signal in `order`, clearing each slot first.
    ///
    /// Rescans until a full pass finds nothing, so occurrences recorded while
    /// draining are handled by the same call. The aggregate flag is cleared
    /// only after a pass comes up empty. An error from `dispatch` stops the
    /// drain; slots not yet visited stay pending and the aggregate reflects
    /// exactly whether any remain.
    pub fn drain<F, E>(&self, order: &[c_int], mut dispatch: F) -> Result<(), E>
    where
        F: FnMut(c_int) -> Result<(), E>,
    {
        loop {
            let mut dispatched = false;
            for &host in order {
                if self.slots[host as usize].swap(false, Ordering::SeqCst) {
                    dispatched = true;
                    if let Err(err) = dispatch(host) {
                        self.resync();
                        return Err(err);
                    }
                }
            }
            if dispatched {
                continue;
            }
            if !self.resync() {
                return Ok(());
            }
        }
    }

    /// Clear the aggregate, then set it back if any slot is still marked.
    /// A delivery racing with the clear has already set its slot, so it is
    /// seen by the recheck.
    fn resync(&self) -> bool {
        self.signals_are_pending.store(false, Ordering::SeqCst);
        let any = self.slots.iter().any(|slot| slot.load(Ordering::SeqCst));
        if any {
            self.signals_are_pending.store(true, Ordering::SeqCst);
        }
        any
    }

    /// Drop everything pending without dispatching it.
    pub fn discard(&self) {
        for slot in &self.slots {
            slot.store(false, Ordering::SeqCst);
        }
        self.signals_are_pending.store(false, Ordering::SeqCst);
    }
}

impl Default for PendingSignals {
    fn default() -> Self {
        Self::new()
    }
}
