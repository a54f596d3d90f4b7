//! Blocking-section hook strategies

/// How the runtime-exclusive resource is released and reacquired.
///
/// Supplied once when the runtime is built. Callers never invoke these
/// directly; [`ExecutionContext`](super::ExecutionContext) checks pairing
/// before each call.
pub trait BlockingHooks: Send + Sync {
    /// Release the runtime before a blocking call.
    fn enter(&self);

    /// Reacquire the runtime, waiting for exclusivity.
    fn leave(&self);

    /// Reacquire the runtime only if that does not wait.
    fn try_leave(&self) -> bool;

    /// Runs at a safe point, once per [`Runtime::request_async_action`](crate::Runtime::request_async_action).
    fn async_action(&self) {}

    fn name(&self) -> &'static str;
}

/// Hooks for a runtime with a single execution context: nothing to release.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleThreaded;

impl BlockingHooks for SingleThreaded {
    fn enter(&self) {}

    fn leave(&self) {}

    fn try_leave(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "single-threaded"
    }
}
