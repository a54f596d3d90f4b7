//! Attention aggregator
//!
//! A single flag that the interpreter reads at every safe point. It is raised
//! together with any of its constituents: pending signals, a major GC slice
//! being due, or an async action being due.

use std::sync::atomic::{AtomicBool, Ordering};

pub struct Attention {
    something_to_do: AtomicBool,
    force_major_slice: AtomicBool,
    async_action_due: AtomicBool,
}

impl Attention {
    pub const fn new() -> Self {
        Self {
            something_to_do: AtomicBool::new(false),
            force_major_slice: AtomicBool::new(false),
            async_action_due: AtomicBool::new(false),
        }
    }

    /// The safe-point fast path.
    #[inline(always)]
    pub fn is_raised(&self) -> bool {
        self.something_to_do.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub(crate) fn raise(&self) {
        self.something_to_do.store(true, Ordering::SeqCst);
    }

    pub(crate) fn lower(&self) {
        self.something_to_do.store(false, Ordering::SeqCst);
    }

    pub fn request_major_slice(&self) {
        self.force_major_slice.store(true, Ordering::SeqCst);
        self.raise();
    }

    pub fn request_async_action(&self) {
        self.async_action_due.store(true, Ordering::SeqCst);
        self.raise();
    }

    pub fn major_slice_due(&self) -> bool {
        self.force_major_slice.load(Ordering::SeqCst)
    }

    pub fn async_action_due(&self) -> bool {
        self.async_action_due.load(Ordering::SeqCst)
    }

    pub(crate) fn take_major_slice(&self) -> bool {
        self.force_major_slice.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn take_async_action(&self) -> bool {
        self.async_action_due.swap(false, Ordering::SeqCst)
    }

    /// Re-raise if any constituent is still set after servicing.
    pub(crate) fn settle(&self, signals_pending: bool) {
        if signals_pending || self.major_slice_due() || self.async_action_due() {
            self.raise();
        }
    }
}

impl Default for Attention {
    fn default() -> Self {
        Self::new()
    }
}
