//! Kernel error types for the physical memory subsystem.
//!
//! Almost every fault down here is fatal: once a reverse-map entry, a
//! swap-slot record, or a page-table walk disagrees with what the
//! bookkeeping expects, the kernel has no basis left for trusting its own
//! memory accounting, so the only sound response is to log and panic. The
//! one condition a caller can still recover from is memory pressure with no
//! process left to evict from -- `kalloc` surfaces that as an ordinary
//! `Result` instead of panicking, since a future retry (after a process
//! exits, say) might succeed where this one didn't.

use core::fmt;

/// Errors that can cross an internal boundary before being resolved or
/// turned into a fatal condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "kernel errors must be handled, not silently discarded"]
pub enum KernelError {
    /// The frame allocator's free list was empty and the evictor could not
    /// produce a replacement frame.
    OutOfMemory { available: usize },
    /// No live process is available to serve as an eviction victim.
    NoVictimProcess,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { available } => {
                write!(f, "out of physical memory ({available} frames free)")
            }
            Self::NoVictimProcess => write!(f, "no victim process available for eviction"),
        }
    }
}

/// Panics after logging `$err` at `error!` level. Centralizing this keeps
/// every panic message in this subsystem in the same shape.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
        panic!($($arg)*);
    }};
}
