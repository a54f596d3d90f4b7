//! Process-wide signal action table

use super::number::{RuntimeSignal, NSIG};
use crate::error::Raise;
use libc::c_int;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A delivered signal, as seen by a signal action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalEvent {
    pub signal: RuntimeSignal,
    pub host: c_int,
    /// `false` when running from a safe point. The raw OS handler never runs
    /// actions, so the dispatcher always reports `false`.
    pub in_signal_handler: bool,
}

/// Callback run at a safe point for a signal with a custom action.
pub type SignalCallback = Arc<dyn Fn(&SignalEvent) -> Result<(), Raise> + Send + Sync>;

/// What to do when a signal is drained.
#[derive(Clone, Default)]
pub enum SignalAction {
    /// Host default disposition.
    #[default]
    Default,
    Ignore,
    Custom(SignalCallback),
}

impl SignalAction {
    pub fn custom<F>(callback: F) -> Self
    where
        F: Fn(&SignalEvent) -> Result<(), Raise> + Send + Sync + 'static,
    {
        SignalAction::Custom(Arc::new(callback))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, SignalAction::Default)
    }

    pub fn is_ignore(&self) -> bool {
        matches!(self, SignalAction::Ignore)
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, SignalAction::Custom(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SignalAction::Default => "default",
            SignalAction::Ignore => "ignore",
            SignalAction::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalAction::Default => f.write_str("Default"),
            SignalAction::Ignore => f.write_str("Ignore"),
            SignalAction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Strategy for the `Default` action of a drained signal.
pub trait DefaultAction: Send + Sync {
    fn perform(&self, event: &SignalEvent);
}

impl<F> DefaultAction for F
where
    F: Fn(&SignalEvent) + Send + Sync,
{
    fn perform(&self, event: &SignalEvent) {
        self(event)
    }
}

/// Signal number to action, indexed by host number.
///
/// Only safe-point code touches the table; the delivery context never does.
pub struct SignalTable {
    actions: RwLock<Vec<SignalAction>>,
}

impl SignalTable {
    /// Every signal starts with its host default.
    pub fn new() -> Self {
        Self {
            actions: RwLock::new(vec![SignalAction::Default; NSIG]),
        }
    }

    /// Install `action`, returning the one it replaces.
    pub(crate) fn replace(&self, host: c_int, action: SignalAction) -> SignalAction {
        let mut actions = self.actions.write();
        std::mem::replace(&mut actions[host as usize], action)
    }

    /// Install `action` after `bind` accepts it, returning the one it
    /// replaces. The write lock is held across `bind`, so the table and
    /// whatever `bind` mirrors it into change together. On error the table
    /// is left as it was.
    pub(crate) fn replace_with<E>(
        &self,
        host: c_int,
        action: SignalAction,
        bind: impl FnOnce(&SignalAction) -> Result<(), E>,
    ) -> Result<SignalAction, E> {
        let mut actions = self.actions.write();
        bind(&action)?;
        Ok(std::mem::replace(&mut actions[host as usize], action))
    }

    /// Current action. Drains call this at dispatch time, never earlier.
    pub fn lookup(&self, host: c_int) -> SignalAction {
        self.actions
            .read()
            .get(host as usize)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for SignalTable {
    fn default() -> Self {
        Self::new()
    }
}
