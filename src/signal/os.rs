//! Host signal installation
//!
//! Binds the raw OS handler, which forwards every occurrence to the delivery
//! path of the runtime currently attached as the process's delivery target.

use super::table::{DefaultAction, SignalAction, SignalEvent};
use crate::runtime::Runtime;
use libc::c_int;
use nix::errno::Errno;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

/// Runtime receiving host deliveries, or null.
static TARGET: AtomicPtr<Runtime> = AtomicPtr::new(ptr::null_mut());

extern "C" fn handle_signal(host: c_int) {
    let saved = Errno::last_raw();
    let target = TARGET.load(Ordering::Acquire);
    // SAFETY: targets are leaked on attach and never freed.
    if let Some(runtime) = unsafe { target.as_ref() } {
        runtime.delivery().record(host);
    }
    Errno::set_raw(saved);
}

/// Make `runtime` the receiver of host signal deliveries.
///
/// The previous target, if any, stops receiving. Its reference is leaked: a
/// handler running on another thread may still be reading it.
pub(crate) fn attach(runtime: &Arc<Runtime>) {
    let raw = Arc::into_raw(Arc::clone(runtime)) as *mut Runtime;
    TARGET.swap(raw, Ordering::AcqRel);
}

/// Stop delivering to `runtime` if it is the current target.
pub(crate) fn detach(runtime: &Runtime) {
    let ours = runtime as *const Runtime as *mut Runtime;
    let _ = TARGET.compare_exchange(ours, ptr::null_mut(), Ordering::AcqRel, Ordering::Acquire);
}

pub(crate) fn is_target(runtime: &Runtime) -> bool {
    ptr::eq(TARGET.load(Ordering::Acquire), runtime)
}

/// Bind the host disposition matching `action`.
pub(crate) fn install(host: c_int, action: &SignalAction) -> Result<(), Errno> {
    let handler = match action {
        SignalAction::Default => libc::SIG_DFL,
        SignalAction::Ignore => libc::SIG_IGN,
        SignalAction::Custom(_) => handle_signal as extern "C" fn(c_int) as libc::sighandler_t,
    };
    set_disposition(host, handler).map(|_| ())
}

/// Whether the process inherited `SIG_IGN` for `host`.
pub(crate) fn inherited_ignore(host: c_int) -> bool {
    current_disposition(host).is_ok_and(|handler| handler == libc::SIG_IGN)
}

fn set_disposition(host: c_int, handler: libc::sighandler_t) -> Result<libc::sighandler_t, Errno> {
    // SAFETY: both sigaction structs are fully initialized before use.
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler;
        libc::sigemptyset(&mut action.sa_mask);
        // No SA_RESTART: interrupted blocking calls return EINTR so the
        // caller gets back to a safe point.
        action.sa_flags = 0;
        let mut previous = MaybeUninit::<libc::sigaction>::zeroed();
        if libc::sigaction(host, &action, previous.as_mut_ptr()) != 0 {
            return Err(Errno::last());
        }
        Ok(previous.assume_init().sa_sigaction)
    }
}

fn current_disposition(host: c_int) -> Result<libc::sighandler_t, Errno> {
    // SAFETY: a null new action only queries.
    unsafe {
        let mut current = MaybeUninit::<libc::sigaction>::zeroed();
        if libc::sigaction(host, ptr::null(), current.as_mut_ptr()) != 0 {
            return Err(Errno::last());
        }
        Ok(current.assume_init().sa_sigaction)
    }
}

/// Runs the host default disposition by resetting it and re-raising.
///
/// Terminates the process for most signals. For signals whose default is to
/// be ignored (`SIGCHLD`, `SIGWINCH`, ...) execution continues.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostDefault;

impl DefaultAction for HostDefault {
    fn perform(&self, event: &SignalEvent) {
        if let Err(errno) = set_disposition(event.host, libc::SIG_DFL) {
            log::warn!("cannot reset {} to its default: {}", event.signal, errno);
            return;
        }
        // SAFETY: plain libc calls on a locally owned signal set.
        unsafe {
            let mut set = MaybeUninit::<libc::sigset_t>::zeroed();
            libc::sigemptyset(set.as_mut_ptr());
            libc::sigaddset(set.as_mut_ptr(), event.host);
            libc::pthread_sigmask(libc::SIG_UNBLOCK, set.as_ptr(), ptr::null_mut());
            libc::raise(event.host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_does_not_change_disposition() {
        let before = current_disposition(libc::SIGWINCH).unwrap();
        let _ = inherited_ignore(libc::SIGWINCH);
        assert_eq!(current_disposition(libc::SIGWINCH).unwrap(), before);
    }

    #[test]
    fn test_uncatchable_signal_rejected_by_host() {
        assert_eq!(
            install(libc::SIGKILL, &SignalAction::Ignore),
            Err(Errno::EINVAL)
        );
    }
}
