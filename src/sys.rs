//! Blocking system calls
//!
//! Each call runs inside a blocking section so other contexts can use the
//! runtime while this one waits in the kernel. Reads and writes may return
//! `EINTR` when a signal arrives; the caller should poll and retry.

use crate::blocking::ExecutionContext;
use nix::errno::Errno;
use nix::unistd;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::Duration;

/// Real user id of the process.
pub fn getuid(context: &ExecutionContext) -> u32 {
    context.blocking(|| unistd::getuid().as_raw())
}

/// Effective user id of the process.
pub fn geteuid(context: &ExecutionContext) -> u32 {
    context.blocking(|| unistd::geteuid().as_raw())
}

pub fn sleep(context: &ExecutionContext, duration: Duration) {
    context.blocking(|| std::thread::sleep(duration))
}

pub fn read(context: &ExecutionContext, fd: BorrowedFd<'_>, buf: &mut [u8]) -> Result<usize, Errno> {
    context.blocking(|| unistd::read(fd.as_raw_fd(), buf))
}

pub fn write(context: &ExecutionContext, fd: BorrowedFd<'_>, buf: &[u8]) -> Result<usize, Errno> {
    context.blocking(|| unistd::write(fd, buf))
}
