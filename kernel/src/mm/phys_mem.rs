//! Backing storage for frame contents.
//!
//! The allocator, rmap and swap tables reason about physical frames as
//! numbers; this module is where a frame number actually turns into bytes,
//! for the three places this subsystem touches frame contents directly:
//! `kfree`'s poison fill, the COW splitter's copy, and the evictor/pager's
//! swap transfer.

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use super::addr::FrameNumber;
use super::config::PGSIZE;

/// A contiguous span of physical memory, indexed by frame number relative
/// to `start_frame`.
pub struct PhysicalMemory {
    start_frame: FrameNumber,
    frames: Vec<[u8; PGSIZE]>,
}

impl PhysicalMemory {
    /// Allocates backing storage for `frame_count` frames starting at
    /// `start_frame`.
    pub fn new(start_frame: FrameNumber, frame_count: usize) -> Self {
        Self {
            start_frame,
            frames: vec![[0u8; PGSIZE]; frame_count],
        }
    }

    fn index(&self, frame: FrameNumber) -> usize {
        (frame.as_u64() - self.start_frame.as_u64()) as usize
    }

    /// Returns an immutable view of `frame`'s contents.
    pub fn read(&self, frame: FrameNumber) -> &[u8; PGSIZE] {
        &self.frames[self.index(frame)]
    }

    /// Overwrites `frame`'s contents with `data`.
    pub fn write(&mut self, frame: FrameNumber, data: &[u8; PGSIZE]) {
        let idx = self.index(frame);
        self.frames[idx] = *data;
    }

    /// Fills `frame` with a repeated byte, used by `kfree`'s poison fill.
    pub fn fill(&mut self, frame: FrameNumber, byte: u8) {
        let idx = self.index(frame);
        self.frames[idx] = [byte; PGSIZE];
    }

    /// Copies `src`'s contents into `dst`, as the COW splitter requires.
    pub fn copy_frame(&mut self, src: FrameNumber, dst: FrameNumber) {
        let src_data = *self.read(src);
        self.write(dst, &src_data);
    }
}
