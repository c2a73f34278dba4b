//! Physical memory subsystem for a small teaching kernel.
//!
//! Built as a library so [`mm`] can be exercised by `cargo test` on the
//! host target; [`main`](../src/main.rs) is the bare-metal entry point that
//! links against it.

#![no_std]
#![cfg_attr(all(target_arch = "x86_64", target_os = "none"), feature(alloc_error_handler))]

#[cfg(feature = "alloc")]
extern crate alloc;

// Bare metal: a real heap backs the `Vec`-based free list, rmap, and
// swap-slot tables. Host (`cargo test`): delegate to the system allocator
// so the same alloc-using code compiles and runs under the standard test
// harness.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
use linked_list_allocator::LockedHeap;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

#[cfg(not(target_os = "none"))]
extern crate std;
#[cfg(not(target_os = "none"))]
#[global_allocator]
static SYSTEM_ALLOCATOR: std::alloc::System = std::alloc::System;

/// Initializes the bare-metal heap from a region handed to us by the
/// bootstrap collaborator. Must run before any [`mm`] operation that
/// allocates (`Rmap::new`, `SwapTable::new`, `PhysicalMemory::new`, or any
/// `kalloc` retry path).
///
/// # Safety
/// `heap_start` must point to at least `heap_size` bytes of memory not
/// otherwise in use, and this must be called at most once.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub unsafe fn init_heap(heap_start: *mut u8, heap_size: usize) {
    // SAFETY: the caller upholds the region and single-initialization
    // contract documented above.
    unsafe {
        ALLOCATOR.lock().init(heap_start, heap_size);
    }
}

#[macro_use]
pub mod print;

pub mod arch;
pub mod error;
pub mod mm;
#[cfg(target_arch = "x86_64")]
pub mod serial;

pub use error::KernelError;
pub use mm::{MemoryConfig, MemoryManager};

/// Heap allocation error handler. Panic is intentional: running out of heap
/// in a no_std kernel is unrecoverable and the `alloc_error_handler` ABI
/// requires `-> !`.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
#[alloc_error_handler]
fn alloc_error_handler(layout: core::alloc::Layout) -> ! {
    panic!("allocation error: {layout:?}");
}
