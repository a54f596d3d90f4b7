//! Signal numbering, actions, and deferred delivery
//!
//! ```text
//! OS signal ──► os::handle_signal ──► SignalDelivery::record
//!                                      (slot + aggregate + attention)
//!
//! safe point ──► ExecutionContext::poll ──► PendingSignals::drain
//!                                            └─► SignalTable::lookup ─► action
//! ```

pub mod delivery;
pub mod number;
pub(crate) mod os;
pub mod pending;
pub mod table;

pub use delivery::SignalDelivery;
pub use number::{RuntimeSignal, SignalNumbering, NSIG};
pub use os::HostDefault;
pub use pending::PendingSignals;
pub use table::{DefaultAction, SignalAction, SignalCallback, SignalEvent, SignalTable};
