//! Shared runtime state
//!
//! One [`Runtime`] holds every process-wide piece of signal and
//! blocking-section state. It is built once, shared behind an `Arc`, and
//! reached by each thread through its own [`ExecutionContext`].

use crate::attention::Attention;
use crate::blocking::{BlockingHooks, ExecutionContext, MasterLock, SingleThreaded, Ticker};
use crate::config::{BlockingMode, RuntimeConfig};
use crate::error::{Result, SignalError, SignalResult};
use crate::signal::{
    os, DefaultAction, HostDefault, PendingSignals, RuntimeSignal, SignalAction, SignalDelivery,
    SignalNumbering, SignalTable,
};
use libc::c_int;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct Runtime {
    numbering: SignalNumbering,
    table: SignalTable,
    pending: PendingSignals,
    attention: Attention,
    hooks: Arc<dyn BlockingHooks>,
    default_action: Arc<dyn DefaultAction>,
    /// Host numbers refused by registration
    reserved: Vec<c_int>,
    /// Whether registration binds host dispositions
    host_signals: bool,
    ticker: Mutex<Option<Ticker>>,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Single-threaded runtime not bound to host signals. Occurrences come
    /// only from [`record_signal`](Self::record_signal). Only `SIGKILL` and
    /// `SIGSTOP` are reserved.
    pub fn new() -> Arc<Self> {
        let numbering = SignalNumbering::host();
        let reserved = vec![libc::SIGKILL, libc::SIGSTOP];
        Arc::new(Self::from_parts(
            numbering,
            Arc::new(SingleThreaded),
            Arc::new(HostDefault),
            reserved,
            false,
        ))
    }

    fn from_parts(
        numbering: SignalNumbering,
        hooks: Arc<dyn BlockingHooks>,
        default_action: Arc<dyn DefaultAction>,
        reserved: Vec<c_int>,
        host_signals: bool,
    ) -> Self {
        Self {
            numbering,
            table: SignalTable::new(),
            pending: PendingSignals::new(),
            attention: Attention::new(),
            hooks,
            default_action,
            reserved,
            host_signals,
            ticker: Mutex::new(None),
        }
    }

    /// Create an execution context for the calling thread. It starts out
    /// owning the runtime, waiting for it under exclusive hooks.
    ///
    /// A thread may hold several contexts for one runtime, but at most one
    /// of them may own it. Attaching while another context on this thread
    /// owns the runtime would wait on itself forever, so it aborts the
    /// process instead. Release the first context with a blocking section
    /// before attaching another.
    pub fn attach(self: &Arc<Self>) -> ExecutionContext {
        ExecutionContext::attach(Arc::clone(self))
    }

    /// Set the action for `signal`, returning the previous one.
    ///
    /// Takes effect immediately, including for occurrences already pending.
    pub fn register_signal_handler(
        &self,
        signal: RuntimeSignal,
        action: SignalAction,
    ) -> SignalResult<SignalAction> {
        let host = self
            .numbering
            .to_host(signal)
            .map_err(|_| SignalError::InvalidSignal(signal.raw()))?;
        if self.reserved.contains(&host) {
            log::warn!("refusing to intercept reserved signal {}", signal);
            return Err(SignalError::InvalidSignal(signal.raw()));
        }

        let host_signals = self.host_signals;
        let previous = self
            .table
            .replace_with(host, action.clone(), |action| {
                if host_signals {
                    os::install(host, action)
                } else {
                    Ok(())
                }
            })
            .map_err(|source| SignalError::Os { signal, source })?;
        log::debug!(
            "{}: {} -> {}",
            signal,
            previous.kind(),
            action.kind()
        );
        Ok(previous)
    }

    /// The action currently registered for `signal`.
    pub fn signal_action(&self, signal: RuntimeSignal) -> SignalResult<SignalAction> {
        let host = self.numbering.to_host(signal)?;
        Ok(self.table.lookup(host))
    }

    /// Record an occurrence of `signal` exactly as the host handler would.
    pub fn record_signal(&self, signal: RuntimeSignal) -> SignalResult<()> {
        let host = self.numbering.to_host(signal)?;
        self.delivery().record(host);
        Ok(())
    }

    /// The allocation-free path used from the signal-delivery context.
    #[inline]
    pub fn delivery(&self) -> SignalDelivery<'_> {
        SignalDelivery::new(&self.numbering, &self.pending, &self.attention)
    }

    /// Ask for a major GC slice at the next safe point.
    pub fn request_major_slice(&self) {
        self.attention.request_major_slice();
    }

    /// Ask for the hooks' async action at the next safe point.
    pub fn request_async_action(&self) {
        self.attention.request_async_action();
    }

    pub fn attention(&self) -> &Attention {
        &self.attention
    }

    pub fn pending(&self) -> &PendingSignals {
        &self.pending
    }

    pub fn numbering(&self) -> &SignalNumbering {
        &self.numbering
    }

    pub fn hooks(&self) -> &dyn BlockingHooks {
        &*self.hooks
    }

    pub(crate) fn table(&self) -> &SignalTable {
        &self.table
    }

    pub(crate) fn default_action(&self) -> &dyn DefaultAction {
        &*self.default_action
    }

    /// Whether host deliveries currently reach this runtime.
    pub fn receives_host_signals(&self) -> bool {
        self.host_signals && os::is_target(self)
    }

    /// Restore host defaults for every intercepted signal, stop receiving
    /// host deliveries, and discard whatever is still pending.
    pub fn shutdown(&self) {
        self.ticker.lock().take();
        if self.host_signals {
            for &host in self.numbering.drain_order() {
                if self.table.lookup(host).is_custom() {
                    let _ = os::install(host, &SignalAction::Default);
                }
            }
            os::detach(self);
        }
        self.pending.discard();
    }
}

/// Builds a [`Runtime`] from a [`RuntimeConfig`] plus explicit overrides.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    hooks: Option<Arc<dyn BlockingHooks>>,
    default_action: Option<Arc<dyn DefaultAction>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            hooks: None,
            default_action: None,
        }
    }

    pub fn config(mut self, config: &RuntimeConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Bind host dispositions on registration.
    pub fn host_signals(mut self, enabled: bool) -> Self {
        self.config.signals.install_handlers = enabled;
        self
    }

    /// Override the hook strategy chosen by the configuration.
    pub fn hooks<H: BlockingHooks + 'static>(mut self, hooks: Arc<H>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn default_action<D: DefaultAction + 'static>(mut self, action: Arc<D>) -> Self {
        self.default_action = Some(action);
        self
    }

    pub fn build(self) -> Result<Arc<Runtime>> {
        let numbering = SignalNumbering::host();
        let reserved = self.config.signals.reserved_hosts(&numbering)?;
        let host_signals = self.config.signals.install_handlers;

        let hooks: Arc<dyn BlockingHooks> = match self.hooks {
            Some(hooks) => hooks,
            None => match self.config.blocking.mode {
                BlockingMode::SingleThreaded => Arc::new(SingleThreaded),
                BlockingMode::MasterLock => Arc::new(MasterLock::new()),
            },
        };
        log::debug!("blocking hooks: {}", hooks.name());

        let default_action = self
            .default_action
            .unwrap_or_else(|| Arc::new(HostDefault));

        let runtime = Arc::new(Runtime::from_parts(
            numbering,
            hooks,
            default_action,
            reserved,
            host_signals,
        ));

        if host_signals {
            for &host in runtime.numbering.drain_order() {
                if os::inherited_ignore(host) {
                    runtime.table.replace(host, SignalAction::Ignore);
                }
            }
            os::attach(&runtime);
            log::debug!("attached as host signal target");
        }

        if let Some(interval) = self.config.blocking.tick_interval() {
            let ticker = Ticker::spawn(&runtime, interval)?;
            *runtime.ticker.lock() = Some(ticker);
        }

        Ok(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
