//! Physical and virtual address newtypes, so a frame number, a byte
//! address, and a virtual address can never be mixed up at a call site.

use super::config::PGSIZE;

/// Physical frame number: `f = pa / PGSIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameNumber(u64);

impl FrameNumber {
    pub const fn new(num: u64) -> Self {
        Self(num)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub const fn as_addr(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 * PGSIZE as u64)
    }
}

/// Physical memory address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn as_frame(self) -> FrameNumber {
        FrameNumber::new(self.0 / PGSIZE as u64)
    }

    pub const fn is_page_aligned(self) -> bool {
        self.0 % PGSIZE as u64 == 0
    }
}

/// Virtual address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(u64);

impl VirtAddr {
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn page_floor(self) -> Self {
        Self(self.0 & !(PGSIZE as u64 - 1))
    }
}
