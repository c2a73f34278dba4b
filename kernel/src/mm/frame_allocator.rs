//! Physical frame allocator.
//!
//! A single free list of 4 KiB frames, guarded by one lock. There is no
//! NUMA placement, buddy system, or size-class bucketing here -- this
//! subsystem only ever hands out whole frames one at a time.
//!
//! The free list is modeled as a plain `Vec<FrameNumber>` stack rather than
//! pointers threaded through the frames' own memory. Doing it with real
//! intrusive pointers would require unsafe raw-pointer writes into frame
//! contents for no behavioral difference observable from outside (push/pop
//! order, free count).

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use super::addr::FrameNumber;
use super::config::PGSIZE;
use super::phys_mem::PhysicalMemory;

struct Inner {
    free: Vec<FrameNumber>,
}

/// Singly-threaded free list of 4 KiB-aligned frames drawn from
/// `[end_of_kernel_image, PHYSTOP)`.
pub struct FrameAllocator {
    start: FrameNumber,
    end: FrameNumber,
    inner: Mutex<Inner>,
    /// Suppresses locking during the two-phase bootstrap. `spin::Mutex` is
    /// cheap enough that there is no correctness reason to bypass it even
    /// during single-threaded bring-up, but the flag lets `kinit1`/`kinit2`
    /// document and assert which phase is active.
    use_lock: AtomicBool,
}

impl FrameAllocator {
    /// Creates an allocator managing no frames yet; call [`Self::kinit1`]
    /// and [`Self::kinit2`] to enroll `[start, end)`.
    pub fn new(start: FrameNumber, end: FrameNumber) -> Self {
        Self {
            start,
            end,
            inner: Mutex::new(Inner { free: Vec::new() }),
            use_lock: AtomicBool::new(false),
        }
    }

    /// Phase 1 of bootstrap: enroll the pages covered by the bootstrap page
    /// table, `[start, boundary)`. Locking is suppressed.
    pub fn kinit1(&self, boundary: FrameNumber) {
        debug_assert!(!self.use_lock.load(Ordering::Relaxed));
        self.enroll_range(self.start, boundary);
    }

    /// Phase 2 of bootstrap: enroll the remainder of RAM, `[boundary, end)`,
    /// then permanently enable locking.
    pub fn kinit2(&self, boundary: FrameNumber) {
        self.enroll_range(boundary, self.end);
        self.use_lock.store(true, Ordering::Release);
    }

    fn enroll_range(&self, from: FrameNumber, to: FrameNumber) {
        let mut inner = self.inner.lock();
        let mut f = from.as_u64();
        while f < to.as_u64() {
            inner.free.push(FrameNumber::new(f));
            f += 1;
        }
        log::info!(
            "[kmem] enrolled frames [{}, {}) ({} free total)",
            from.as_u64(),
            to.as_u64(),
            inner.free.len()
        );
    }

    /// Removes the head of the free list. The returned frame's contents are
    /// undefined. Returns `None` if the free list is empty -- the caller
    /// (the evictor, via [`crate::mm::MemoryManager::kalloc`]) is
    /// responsible for the evict-and-retry recovery path; this leaf
    /// operation never calls into the evictor itself.
    pub fn try_alloc(&self) -> Option<FrameNumber> {
        self.inner.lock().free.pop()
    }

    /// Returns `frame` to the free list after poisoning its contents.
    ///
    /// Panics if `frame` is not page-aligned, lies outside `[start, end)`,
    /// or is already on the free list.
    pub fn free(&self, frame: FrameNumber, phys: &mut PhysicalMemory) {
        let addr = frame.as_addr();
        if !addr.is_page_aligned() {
            crate::fatal!("kfree: frame {:#x} is not page-aligned", addr.as_u64());
        }
        if frame < self.start || frame >= self.end {
            crate::fatal!(
                "kfree: frame {} outside managed range [{}, {})",
                frame.as_u64(),
                self.start.as_u64(),
                self.end.as_u64()
            );
        }

        let mut inner = self.inner.lock();
        if inner.free.contains(&frame) {
            crate::fatal!("kfree: double free of frame {}", frame.as_u64());
        }

        phys.fill(frame, super::config::POISON_BYTE);
        inner.free.push(frame);
    }

    /// Snapshot of the number of free frames.
    pub fn num_free_pages(&self) -> usize {
        self.inner.lock().free.len()
    }

    /// Total frames managed, free or not.
    pub fn total_frames(&self) -> usize {
        (self.end.as_u64() - self.start.as_u64()) as usize
    }
}
