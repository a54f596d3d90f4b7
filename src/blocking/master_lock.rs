//! Threaded hook strategy
//!
//! A single raw mutex is the runtime-exclusive resource. Contexts hold it
//! while running interpreter code and drop it inside blocking sections. A
//! ticker periodically requests an async action, whose hook hands the lock
//! to a waiting context so that long-running code cannot starve the others.

use super::hooks::BlockingHooks;
use crate::runtime::Runtime;
use crossbeam_channel::{bounded, select, tick, Sender};
use parking_lot::lock_api::{RawMutex as _, RawMutexFair as _};
use parking_lot::RawMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default interval between yield requests.
pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

pub struct MasterLock {
    raw: RawMutex,
    /// Contexts blocked in `leave`.
    waiters: AtomicUsize,
}

impl MasterLock {
    pub fn new() -> Self {
        Self {
            raw: RawMutex::INIT,
            waiters: AtomicUsize::new(0),
        }
    }

    pub fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Acquire)
    }

    pub fn is_held(&self) -> bool {
        self.raw.is_locked()
    }
}

impl Default for MasterLock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockingHooks for MasterLock {
    fn enter(&self) {
        // SAFETY: the calling context owns the lock; ExecutionContext rejects
        // an enter from a context that has already released it.
        unsafe { self.raw.unlock() }
    }

    fn leave(&self) {
        if self.raw.try_lock() {
            return;
        }
        self.waiters.fetch_add(1, Ordering::AcqRel);
        self.raw.lock();
        self.waiters.fetch_sub(1, Ordering::AcqRel);
    }

    fn try_leave(&self) -> bool {
        self.raw.try_lock()
    }

    /// Hand the lock to a waiting context, then queue for it again.
    fn async_action(&self) {
        if self.waiters() == 0 {
            return;
        }
        // SAFETY: async actions run at a safe point of the owning context.
        unsafe { self.raw.unlock_fair() }
        self.leave();
    }

    fn name(&self) -> &'static str {
        "master-lock"
    }
}

/// Background thread requesting an async action every interval.
///
/// Stops when dropped or when the runtime it serves is gone.
pub struct Ticker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(runtime: &Arc<Runtime>, interval: Duration) -> std::io::Result<Self> {
        let runtime: Weak<Runtime> = Arc::downgrade(runtime);
        let (stop, stopped) = bounded::<()>(0);
        let ticks = tick(interval);

        let handle = thread::Builder::new()
            .name("sigdefer-tick".to_string())
            .spawn(move || loop {
                select! {
                    recv(stopped) -> _ => break,
                    recv(ticks) -> _ => match runtime.upgrade() {
                        Some(runtime) => runtime.request_async_action(),
                        None => break,
                    },
                }
            })?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            // The tick thread may drop the last runtime reference itself.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}
