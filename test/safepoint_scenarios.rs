//! Safe-Point Dispatch Tests
//!
//! Drives recorded signals, GC slice requests and async actions through
//! `ExecutionContext::poll` and checks what runs, in which order, and how
//! many times.

use parking_lot::Mutex;
use sigdefer::{
    BlockingHooks, NoCollector, Raise, Runtime, RuntimeSignal, SignalAction, SignalEvent,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Log = Arc<Mutex<Vec<String>>>;

/// Runtime detached from host signals whose `Default` action only counts.
fn detached_runtime(defaults: Arc<AtomicUsize>) -> Arc<Runtime> {
    Runtime::builder()
        .host_signals(false)
        .default_action(Arc::new(move |_: &SignalEvent| {
            defaults.fetch_add(1, Ordering::SeqCst);
        }))
        .build()
        .expect("Failed to build runtime")
}

fn logging_action(log: &Log) -> SignalAction {
    let log = Arc::clone(log);
    SignalAction::custom(move |event| {
        log.lock().push(format!("signal {}", event.signal));
        Ok(())
    })
}

/// Single-threaded hooks that note each async action.
struct AsyncLog(Log);

impl BlockingHooks for AsyncLog {
    fn enter(&self) {}

    fn leave(&self) {}

    fn try_leave(&self) -> bool {
        true
    }

    fn async_action(&self) {
        self.0.lock().push("async".to_string());
    }

    fn name(&self) -> &'static str {
        "async-log"
    }
}

// ============================================================================
// Custom Actions
// ============================================================================

#[test]
fn test_custom_action_runs_once_at_safe_point() {
    let runtime = detached_runtime(Arc::default());
    let context = runtime.attach();
    let events = Arc::new(Mutex::new(Vec::<SignalEvent>::new()));
    {
        let events = Arc::clone(&events);
        runtime
            .register_signal_handler(
                RuntimeSignal::USR1,
                SignalAction::custom(move |event| {
                    events.lock().push(*event);
                    Ok(())
                }),
            )
            .unwrap();
    }

    runtime.record_signal(RuntimeSignal::USR1).unwrap();
    assert!(events.lock().is_empty(), "action ran outside a safe point");

    context.poll(&mut NoCollector).unwrap();

    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].signal, RuntimeSignal::USR1);
    assert_eq!(events[0].host, libc::SIGUSR1);
    assert!(!events[0].in_signal_handler);
    assert!(!runtime.attention().is_raised());
    assert!(!runtime.pending().are_pending());
}

#[test]
fn test_repeated_occurrences_coalesce() {
    let runtime = detached_runtime(Arc::default());
    let context = runtime.attach();
    let log: Log = Arc::default();
    runtime
        .register_signal_handler(RuntimeSignal::USR1, logging_action(&log))
        .unwrap();

    for _ in 0..3 {
        runtime.record_signal(RuntimeSignal::USR1).unwrap();
    }
    context.poll(&mut NoCollector).unwrap();
    context.poll(&mut NoCollector).unwrap();

    assert_eq!(*log.lock(), vec!["signal SIGUSR1"]);
}

#[test]
fn test_action_looked_up_at_dispatch_time() {
    let runtime = detached_runtime(Arc::default());
    let context = runtime.attach();
    let first: Log = Arc::default();
    let second: Log = Arc::default();

    runtime
        .register_signal_handler(RuntimeSignal::TERM, logging_action(&first))
        .unwrap();
    runtime.record_signal(RuntimeSignal::TERM).unwrap();
    runtime
        .register_signal_handler(RuntimeSignal::TERM, logging_action(&second))
        .unwrap();
    context.poll(&mut NoCollector).unwrap();

    assert!(first.lock().is_empty());
    assert_eq!(*second.lock(), vec!["signal SIGTERM"]);
}

#[test]
fn test_drain_in_ascending_runtime_order() {
    let runtime = detached_runtime(Arc::default());
    let context = runtime.attach();
    let log: Log = Arc::default();
    for signal in [RuntimeSignal::HUP, RuntimeSignal::TERM, RuntimeSignal::PROF] {
        runtime
            .register_signal_handler(signal, logging_action(&log))
            .unwrap();
    }

    runtime.record_signal(RuntimeSignal::HUP).unwrap();
    runtime.record_signal(RuntimeSignal::TERM).unwrap();
    runtime.record_signal(RuntimeSignal::PROF).unwrap();
    context.poll(&mut NoCollector).unwrap();

    assert_eq!(
        *log.lock(),
        vec!["signal SIGPROF", "signal SIGTERM", "signal SIGHUP"]
    );
}

#[test]
fn test_signal_recorded_by_action_drained_in_same_poll() {
    let runtime = detached_runtime(Arc::default());
    let context = runtime.attach();
    let log: Log = Arc::default();
    runtime
        .register_signal_handler(RuntimeSignal::USR2, logging_action(&log))
        .unwrap();
    {
        let log = Arc::clone(&log);
        let weak = Arc::downgrade(&runtime);
        runtime
            .register_signal_handler(
                RuntimeSignal::USR1,
                SignalAction::custom(move |event| {
                    log.lock().push(format!("signal {}", event.signal));
                    if let Some(runtime) = weak.upgrade() {
                        runtime.record_signal(RuntimeSignal::USR2).unwrap();
                    }
                    Ok(())
                }),
            )
            .unwrap();
    }

    runtime.record_signal(RuntimeSignal::USR1).unwrap();
    context.poll(&mut NoCollector).unwrap();

    assert_eq!(*log.lock(), vec!["signal SIGUSR1", "signal SIGUSR2"]);
    assert!(!runtime.attention().is_raised());
}

// ============================================================================
// Ignore and Default
// ============================================================================

#[test]
fn test_ignore_consumes_signal_silently() {
    let defaults = Arc::new(AtomicUsize::new(0));
    let runtime = detached_runtime(Arc::clone(&defaults));
    let context = runtime.attach();
    runtime
        .register_signal_handler(RuntimeSignal::PIPE, SignalAction::Ignore)
        .unwrap();

    runtime.record_signal(RuntimeSignal::PIPE).unwrap();
    context.poll(&mut NoCollector).unwrap();

    assert_eq!(defaults.load(Ordering::SeqCst), 0);
    assert!(!runtime.pending().is_pending(libc::SIGPIPE));
    assert!(!runtime.attention().is_raised());
}

#[test]
fn test_default_runs_default_action() {
    let defaults = Arc::new(AtomicUsize::new(0));
    let runtime = detached_runtime(Arc::clone(&defaults));
    let context = runtime.attach();

    runtime.record_signal(RuntimeSignal::CHLD).unwrap();
    context.poll(&mut NoCollector).unwrap();

    assert_eq!(defaults.load(Ordering::SeqCst), 1);
}

// ============================================================================
// GC Slices and Async Actions
// ============================================================================

#[test]
fn test_major_slice_runs_before_signals() {
    let runtime = detached_runtime(Arc::default());
    let context = runtime.attach();
    let log: Log = Arc::default();
    runtime
        .register_signal_handler(RuntimeSignal::USR1, logging_action(&log))
        .unwrap();

    runtime.request_major_slice();
    runtime.record_signal(RuntimeSignal::USR1).unwrap();

    let gc_log = Arc::clone(&log);
    context
        .poll(&mut || gc_log.lock().push("gc".to_string()))
        .unwrap();

    assert_eq!(*log.lock(), vec!["gc", "signal SIGUSR1"]);
    assert!(!runtime.attention().is_raised());
    assert!(!runtime.attention().major_slice_due());
}

#[test]
fn test_async_action_runs_after_signals() {
    let log: Log = Arc::default();
    let runtime = Runtime::builder()
        .host_signals(false)
        .hooks(Arc::new(AsyncLog(Arc::clone(&log))))
        .build()
        .unwrap();
    let context = runtime.attach();
    runtime
        .register_signal_handler(RuntimeSignal::USR1, logging_action(&log))
        .unwrap();

    runtime.request_async_action();
    runtime.request_major_slice();
    runtime.record_signal(RuntimeSignal::USR1).unwrap();

    let gc_log = Arc::clone(&log);
    context
        .poll(&mut || gc_log.lock().push("gc".to_string()))
        .unwrap();

    assert_eq!(*log.lock(), vec!["gc", "signal SIGUSR1", "async"]);
    assert!(!runtime.attention().is_raised());
}

#[test]
fn test_raise_defers_async_action_and_remaining_signals() {
    let log: Log = Arc::default();
    let runtime = Runtime::builder()
        .host_signals(false)
        .hooks(Arc::new(AsyncLog(Arc::clone(&log))))
        .build()
        .unwrap();
    let context = runtime.attach();
    runtime
        .register_signal_handler(
            RuntimeSignal::INT,
            SignalAction::custom(|event| Err(Raise::Interrupt(event.signal))),
        )
        .unwrap();
    runtime
        .register_signal_handler(RuntimeSignal::HUP, logging_action(&log))
        .unwrap();

    runtime.request_async_action();
    runtime.record_signal(RuntimeSignal::HUP).unwrap();
    runtime.record_signal(RuntimeSignal::INT).unwrap();

    assert_eq!(
        context.poll(&mut NoCollector),
        Err(Raise::Interrupt(RuntimeSignal::INT))
    );
    assert!(log.lock().is_empty());
    assert!(runtime.attention().is_raised());
    assert!(runtime.pending().is_pending(libc::SIGHUP));

    context.poll(&mut NoCollector).unwrap();
    assert_eq!(*log.lock(), vec!["signal SIGHUP", "async"]);
    assert!(!runtime.attention().is_raised());
}

#[test]
fn test_idle_poll_is_a_no_op() {
    let runtime = detached_runtime(Arc::default());
    let context = runtime.attach();
    let mut slices = 0;
    for _ in 0..1000 {
        context.poll(&mut || slices += 1).unwrap();
    }
    assert_eq!(slices, 0);
}
