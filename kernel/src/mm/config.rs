//! Architectural and subsystem constants.
//!
//! `PHYSTOP` and the swap device geometry are deliberately *not* constants
//! here -- they are supplied at [`crate::mm::MemoryManager::new`] call time,
//! so tests can exercise a tiny physical address space and a tiny swap
//! device without recompiling.

/// Size of a physical frame / virtual page, in bytes.
pub const PGSIZE: usize = 4096;

/// Maximum number of live processes the rmap and swap-slot sets size
/// themselves for.
pub const NPROC: usize = 64;

/// Page-directory and page-table fan-out on the reference (x86-style)
/// architecture this subsystem targets.
pub const NPDENTRIES: usize = 1024;
pub const NPTENTRIES: usize = 1024;

/// Swap area layout: the swap area begins at block 2 (blocks 0-1 are
/// reserved, mirroring the boot sector / superblock convention), and each
/// slot occupies 8 consecutive 512-byte sectors (4 KiB).
pub const SWAP_BASE_BLOCK: u32 = 2;
pub const SECTORS_PER_SLOT: u32 = 8;
pub const SECTOR_SIZE: usize = 512;

/// Byte pattern written over a freed frame to catch use-after-free reads.
/// Chosen to not be confused with a small integer in a test assertion.
pub const POISON_BYTE: u8 = 0xA5;

/// Computes the number of swap slots for a device with `swap_blocks` usable
/// 512-byte blocks (`NSLOTS = SWAPBLOCKS / 8`).
pub const fn num_slots(swap_blocks: u32) -> usize {
    (swap_blocks / SECTORS_PER_SLOT) as usize
}

/// The starting block of swap slot `slot`.
pub const fn slot_start_block(slot: usize) -> u32 {
    SWAP_BASE_BLOCK + (slot as u32) * SECTORS_PER_SLOT
}
