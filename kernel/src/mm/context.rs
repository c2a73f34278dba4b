//! Owning context for the physical memory subsystem.
//!
//! Nothing in this subsystem reaches through a global/static handle.
//! Instead every operation is a method on [`MemoryManager`], which owns
//! the frame allocator, rmap table and swap-slot table, and borrows its
//! collaborators (process table, block device, CPU) for the duration of
//! each call. `crate::main` is the single place that constructs one and
//! keeps it alive for the kernel's lifetime.

use crate::error::KernelError;

use super::addr::{FrameNumber, VirtAddr};
use super::collab::{BlockDevice, Cpu, ProcessTable};
use super::config::{num_slots, PGSIZE};
use super::frame_allocator::FrameAllocator;
use super::page_fault;
use super::pager;
use super::phys_mem::PhysicalMemory;
use super::pte::Pte;
use super::rmap::Rmap;
use super::swap::SwapTable;

/// Runtime-supplied geometry for a [`MemoryManager`]: the physical frame
/// range this instance manages, and the number of swap-device blocks
/// backing it.
#[derive(Debug, Clone, Copy)]
pub struct MemoryConfig {
    pub start: FrameNumber,
    pub end: FrameNumber,
    pub swap_blocks: u32,
}

/// Owns the allocator, rmap, and swap-slot tables. `B` and `P` are left as
/// type parameters rather than trait objects so a caller on a
/// performance-sensitive path pays no dynamic dispatch cost; `Cpu` is
/// instead borrowed per-call since it is inherently per-core state.
pub struct MemoryManager {
    alloc: FrameAllocator,
    rmap: Rmap,
    swap: SwapTable,
    phys: PhysicalMemory,
}

impl MemoryManager {
    /// `kinit1`/`kinit2`/`init_rmap`/`init_slot`, run in sequence: enrolls
    /// `config.start..config.end` into the allocator in two phases, builds
    /// an empty rmap record per frame, and an empty swap-slot table sized
    /// for `config.swap_blocks`.
    pub fn new(config: MemoryConfig, boundary: FrameNumber) -> Self {
        let alloc = FrameAllocator::new(config.start, config.end);
        alloc.kinit1(boundary);
        alloc.kinit2(config.end);

        let rmap = Rmap::new(config.start, config.end);
        let swap = SwapTable::new(num_slots(config.swap_blocks));
        let frame_count = (config.end.as_u64() - config.start.as_u64()) as usize;
        let phys = PhysicalMemory::new(config.start, frame_count);

        Self {
            alloc,
            rmap,
            swap,
            phys,
        }
    }

    /// A free frame, evicting a victim first if none is on hand.
    pub fn kalloc(
        &mut self,
        block: &mut impl BlockDevice,
        procs: &mut impl ProcessTable,
    ) -> Result<FrameNumber, KernelError> {
        pager::kalloc(&self.alloc, &self.rmap, &self.swap, &mut self.phys, block, procs)
    }

    /// Returns `frame` to the free list after poisoning it.
    pub fn kfree(&mut self, frame: FrameNumber) {
        self.alloc.free(frame, &mut self.phys);
    }

    /// Dispatches a fault for `pid` using `cpu`'s current fault address.
    pub fn page_fault(
        &mut self,
        pid: usize,
        block: &mut impl BlockDevice,
        procs: &mut impl ProcessTable,
        cpu: &mut impl Cpu,
    ) -> Result<(), KernelError> {
        page_fault::page_fault(
            pid,
            &self.alloc,
            &self.rmap,
            &self.swap,
            &mut self.phys,
            block,
            procs,
            cpu,
        )
    }

    /// Tears down every outstanding rmap and swap-slot reference belonging
    /// to a dying process, so neither leaks once the process table
    /// reclaims its page tables. Walks `pid`'s own address space rather
    /// than relying on a caller-supplied slot list, since the process
    /// table is the only authority on which pages it actually mapped.
    pub fn clean_swap(&mut self, pid: usize, procs: &mut impl ProcessTable) {
        let size = procs.proc_size(pid);
        let mut va = 0u64;
        while va < size as u64 {
            let vaddr = VirtAddr::new(va);
            va += PGSIZE as u64;
            let Some(handle) = procs.walk(pid, vaddr, false) else {
                continue;
            };
            match Pte::decode(procs.read_pte(handle)) {
                Pte::Resident { frame, .. } => {
                    self.rmap.share_remove(frame, handle, procs);
                }
                Pte::Swapped { slot, .. } => {
                    self.swap.remove_pte(slot, handle);
                }
                Pte::Absent => {}
            }
        }
    }

    pub fn num_free_pages(&self) -> usize {
        self.alloc.num_free_pages()
    }

    pub fn ref_count(&self, frame: FrameNumber) -> usize {
        self.rmap.ref_count(frame)
    }

    pub fn phys(&mut self) -> &mut PhysicalMemory {
        &mut self.phys
    }

    pub fn rmap(&self) -> &Rmap {
        &self.rmap
    }

    pub fn swap(&self) -> &SwapTable {
        &self.swap
    }
}
