//! External collaborator interfaces.
//!
//! Process lifecycle, the block-layer driver, and trap dispatch are all
//! out of scope for this subsystem; only the hooks it actually consumes
//! from them are named here. Those hooks are modeled as traits the caller
//! implements and hands to [`crate::mm::MemoryManager`], rather than free
//! functions reaching into ambient global state.

use super::addr::VirtAddr;
use super::config::PGSIZE;
use super::pte::RawPte;

/// A stable, non-owning handle to one page-table-entry slot: which process,
/// and which page of its address space. Per Design Notes section 9
/// ("Cyclic references PTE<->frame"), the rmap and swap-slot tables store
/// handles like this rather than raw pointers into page-table pages owned
/// by a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PteHandle {
    pub pid: usize,
    pub vaddr: VirtAddr,
}

/// The process-table accessors this subsystem needs: page-table walking,
/// victim selection, and per-process bookkeeping.
///
/// Implementations own the actual page tables; this subsystem only ever
/// reaches them through this trait, never through a raw pointer.
pub trait ProcessTable {
    /// `is_proc(i)`.
    fn is_proc(&self, pid: usize) -> bool;

    /// The process's virtual address space size in bytes (the `sz` field
    /// the victim selector scans `[0, sz)` over).
    fn proc_size(&self, pid: usize) -> usize;

    /// The process's current resident-set size, in bytes.
    fn proc_rss(&self, pid: usize) -> usize;

    /// Adjusts `pid`'s RSS by `delta_pages * PGSIZE`.
    fn adjust_rss(&mut self, pid: usize, delta_pages: i64);

    /// `victim_proc()`: the live process to scan for an eviction candidate.
    fn victim_proc(&self) -> Option<usize>;

    /// `myproc()`: the process on behalf of which a fault is being handled.
    fn current_pid(&self) -> usize;

    /// `walkpgdir(pgdir, va, alloc)`: returns a handle for `va` in `pid`'s
    /// page directory, allocating intermediate page-table pages iff
    /// `alloc` is true. `None` means no mapping exists and none was
    /// created.
    fn walk(&mut self, pid: usize, vaddr: VirtAddr, alloc: bool) -> Option<PteHandle>;

    /// Reads the raw PTE word at `handle`.
    fn read_pte(&self, handle: PteHandle) -> RawPte;

    /// Writes a raw PTE word at `handle`.
    fn write_pte(&mut self, handle: PteHandle, value: RawPte);
}

/// `read_page` / `write_page`: a synchronous 8-sector (4 KiB) transfer to
/// the backing swap device.
pub trait BlockDevice {
    /// Reads `PGSIZE` bytes starting at `start_block` into `dst`.
    fn read_page(&mut self, start_block: u32, dst: &mut [u8; PGSIZE]);

    /// Writes `PGSIZE` bytes starting at `start_block` from `src`.
    fn write_page(&mut self, start_block: u32, src: &[u8; PGSIZE]);
}

/// `rcr2()` / `lcr3()`: the architectural fault-address read and MMU-root
/// reload.
pub trait Cpu {
    /// Reads the faulting virtual address register.
    fn fault_address(&self) -> VirtAddr;

    /// Reloads the current CPU's MMU root, flushing stale TLB entries.
    fn reload_mmu_root(&mut self);
}
