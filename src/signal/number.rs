//! Host and runtime signal numbering
//!
//! Programs name the common POSIX signals with fixed negative numbers so a
//! program behaves the same on every host. Host signals without a portable
//! name (real-time signals, `SIGWINCH`, ...) keep their host number, which is
//! always positive, so the two ranges never collide.

use crate::error::{SignalError, SignalResult};
use libc::c_int;
use nix::sys::signal::Signal;
use std::fmt;
use std::str::FromStr;

/// One past the largest host signal number.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const NSIG: usize = 65;

/// One past the largest host signal number.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const NSIG: usize = 32;

/// Portable signals. Entry `i` has runtime number `-(i + 1)`.
const PORTABLE: [(c_int, &str); 21] = [
    (libc::SIGABRT, "SIGABRT"),
    (libc::SIGALRM, "SIGALRM"),
    (libc::SIGFPE, "SIGFPE"),
    (libc::SIGHUP, "SIGHUP"),
    (libc::SIGILL, "SIGILL"),
    (libc::SIGINT, "SIGINT"),
    (libc::SIGKILL, "SIGKILL"),
    (libc::SIGPIPE, "SIGPIPE"),
    (libc::SIGQUIT, "SIGQUIT"),
    (libc::SIGSEGV, "SIGSEGV"),
    (libc::SIGTERM, "SIGTERM"),
    (libc::SIGUSR1, "SIGUSR1"),
    (libc::SIGUSR2, "SIGUSR2"),
    (libc::SIGCHLD, "SIGCHLD"),
    (libc::SIGCONT, "SIGCONT"),
    (libc::SIGSTOP, "SIGSTOP"),
    (libc::SIGTSTP, "SIGTSTP"),
    (libc::SIGTTIN, "SIGTTIN"),
    (libc::SIGTTOU, "SIGTTOU"),
    (libc::SIGVTALRM, "SIGVTALRM"),
    (libc::SIGPROF, "SIGPROF"),
];

/// A signal number in the runtime's numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuntimeSignal(i32);

impl RuntimeSignal {
    pub const ABRT: Self = Self(-1);
    pub const ALRM: Self = Self(-2);
    pub const FPE: Self = Self(-3);
    pub const HUP: Self = Self(-4);
    pub const ILL: Self = Self(-5);
    pub const INT: Self = Self(-6);
    pub const KILL: Self = Self(-7);
    pub const PIPE: Self = Self(-8);
    pub const QUIT: Self = Self(-9);
    pub const SEGV: Self = Self(-10);
    pub const TERM: Self = Self(-11);
    pub const USR1: Self = Self(-12);
    pub const USR2: Self = Self(-13);
    pub const CHLD: Self = Self(-14);
    pub const CONT: Self = Self(-15);
    pub const STOP: Self = Self(-16);
    pub const TSTP: Self = Self(-17);
    pub const TTIN: Self = Self(-18);
    pub const TTOU: Self = Self(-19);
    pub const VTALRM: Self = Self(-20);
    pub const PROF: Self = Self(-21);

    /// Wrap a raw runtime number. Validity is checked on conversion.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Whether this signal has a stable, host-independent number.
    pub const fn is_portable(self) -> bool {
        self.0 < 0
    }

    fn portable_index(self) -> Option<usize> {
        if self.0 < 0 && self.0 >= -(PORTABLE.len() as i32) {
            Some((-self.0 - 1) as usize)
        } else {
            None
        }
    }
}

impl fmt::Display for RuntimeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.portable_index() {
            Some(index) => f.write_str(PORTABLE[index].1),
            None => match Signal::try_from(self.0) {
                Ok(signal) if self.0 > 0 => f.write_str(signal.as_str()),
                _ => write!(f, "signal {}", self.0),
            },
        }
    }
}

/// Bijection between host signal numbers and [`RuntimeSignal`]s.
///
/// The lookup tables are fixed-size arrays so that [`slot`](Self::slot) can
/// be used from the signal-delivery context.
#[derive(Debug, Clone)]
pub struct SignalNumbering {
    /// Host number to runtime number; `0` marks an unsupported host number.
    to_runtime: [i32; NSIG],
    /// Supported host numbers, sorted by ascending runtime number.
    drain_order: Vec<c_int>,
}

impl SignalNumbering {
    /// Numbering for the signals available on the current host.
    pub fn host() -> Self {
        let mut to_runtime = [0; NSIG];
        for host in 1..NSIG as c_int {
            if host_is_available(host) {
                to_runtime[host as usize] = host;
            }
        }
        for (index, (host, _)) in PORTABLE.iter().enumerate() {
            to_runtime[*host as usize] = -(index as i32) - 1;
        }

        let mut drain_order: Vec<c_int> = (1..NSIG as c_int)
            .filter(|&host| to_runtime[host as usize] != 0)
            .collect();
        drain_order.sort_by_key(|&host| to_runtime[host as usize]);

        Self {
            to_runtime,
            drain_order,
        }
    }

    /// Convert a host signal number to the runtime numbering.
    pub fn to_runtime(&self, host: c_int) -> SignalResult<RuntimeSignal> {
        match self.slot(host) {
            Some(slot) => Ok(RuntimeSignal(self.to_runtime[slot])),
            None => Err(SignalError::UnsupportedSignal(host)),
        }
    }

    /// Convert a runtime signal back to its host number.
    pub fn to_host(&self, signal: RuntimeSignal) -> SignalResult<c_int> {
        if let Some(index) = signal.portable_index() {
            return Ok(PORTABLE[index].0);
        }
        let raw = signal.raw();
        if raw > 0 && (raw as usize) < NSIG && self.to_runtime[raw as usize] == raw {
            Ok(raw)
        } else {
            Err(SignalError::UnknownRuntimeSignal(raw))
        }
    }

    /// Pending-slot index of a host signal, or `None` if unsupported.
    ///
    /// Reads a fixed array only; safe to call from a signal handler.
    #[inline]
    pub fn slot(&self, host: c_int) -> Option<usize> {
        if host <= 0 || host as usize >= NSIG {
            return None;
        }
        let slot = host as usize;
        (self.to_runtime[slot] != 0).then_some(slot)
    }

    /// Supported host numbers in ascending runtime order.
    pub fn drain_order(&self) -> &[c_int] {
        &self.drain_order
    }

    /// All supported signals as `(runtime, host)` pairs in runtime order.
    pub fn supported(&self) -> impl Iterator<Item = (RuntimeSignal, c_int)> + '_ {
        self.drain_order
            .iter()
            .map(move |&host| (RuntimeSignal(self.to_runtime[host as usize]), host))
    }

    /// Resolve a signal by name (`"SIGINT"`, `"INT"`) or runtime number (`"-6"`).
    pub fn parse(&self, name: &str) -> SignalResult<RuntimeSignal> {
        let name = name.trim();
        if let Ok(raw) = name.parse::<i32>() {
            let signal = RuntimeSignal(raw);
            return self.to_host(signal).map(|_| signal);
        }
        let upper = name.to_ascii_uppercase();
        let full = if upper.starts_with("SIG") {
            upper
        } else {
            format!("SIG{}", upper)
        };
        match Signal::from_str(&full) {
            Ok(signal) => self.to_runtime(signal as c_int),
            Err(_) => Err(SignalError::UnknownName(name.to_string())),
        }
    }
}

impl Default for SignalNumbering {
    fn default() -> Self {
        Self::host()
    }
}

/// glibc and musl reserve the signals between 31 and `SIGRTMIN` for threading.
#[cfg(target_os = "linux")]
fn host_is_available(host: c_int) -> bool {
    host < 32 || (libc::SIGRTMIN()..=libc::SIGRTMAX()).contains(&host)
}

#[cfg(not(target_os = "linux"))]
fn host_is_available(host: c_int) -> bool {
    host > 0 && (host as usize) < NSIG
}
