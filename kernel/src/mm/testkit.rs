//! Fake collaborator implementations used by this crate's own tests.
//!
//! Not compiled into the kernel binary -- kept behind `#[cfg(test)]` in the
//! module they support rather than a separate integration-test crate, since
//! every collaborator trait here is `no_std`-clean and has no reason to
//! leave the crate.

#![cfg(test)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::collections::BTreeMap;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use super::addr::{FrameNumber, VirtAddr};
use super::collab::{BlockDevice, Cpu, PteHandle, ProcessTable};
use super::config::PGSIZE;
use super::pte::{Pte, PteFlags, RawPte};

/// A process table over `nproc` processes, each with `size` bytes of
/// address space and its own page table represented as a sparse map from
/// page-aligned virtual address to raw PTE word.
pub struct FakeProcessTable {
    sizes: Vec<usize>,
    rss_pages: Vec<i64>,
    tables: Vec<BTreeMap<VirtAddr, RawPte>>,
    current: usize,
}

impl FakeProcessTable {
    pub fn new(nproc: usize, size: usize) -> Self {
        Self {
            sizes: alloc::vec![size; nproc],
            rss_pages: alloc::vec![0; nproc],
            tables: (0..nproc).map(|_| BTreeMap::new()).collect(),
            current: 0,
        }
    }

    /// Convenience used throughout this crate's tests: installs a resident
    /// PTE for `pid` at `va` mapping `frame`, and returns its handle. Does
    /// not touch rmap or RSS -- callers wire those up explicitly so tests
    /// stay honest about what each module is responsible for.
    pub fn map_resident(
        &mut self,
        pid: usize,
        va: u64,
        frame: FrameNumber,
        flags: PteFlags,
    ) -> PteHandle {
        let vaddr = VirtAddr::new(va).page_floor();
        let pte = Pte::Resident { frame, flags };
        self.tables[pid].insert(vaddr, pte.encode());
        PteHandle { pid, vaddr }
    }

    pub fn set_current(&mut self, pid: usize) {
        self.current = pid;
    }
}

impl ProcessTable for FakeProcessTable {
    fn is_proc(&self, pid: usize) -> bool {
        pid < self.sizes.len()
    }

    fn proc_size(&self, pid: usize) -> usize {
        self.sizes[pid]
    }

    fn proc_rss(&self, pid: usize) -> usize {
        self.rss_pages[pid].max(0) as usize
    }

    fn adjust_rss(&mut self, pid: usize, delta_pages: i64) {
        let new = self.rss_pages[pid] + delta_pages;
        if new < 0 {
            crate::fatal!("fake process table: rss underflow for pid {pid}");
        }
        self.rss_pages[pid] = new;
    }

    fn victim_proc(&self) -> Option<usize> {
        (0..self.sizes.len()).find(|&pid| !self.tables[pid].is_empty())
    }

    fn current_pid(&self) -> usize {
        self.current
    }

    fn walk(&mut self, pid: usize, vaddr: VirtAddr, alloc: bool) -> Option<PteHandle> {
        let floored = vaddr.page_floor();
        if self.tables[pid].contains_key(&floored) {
            return Some(PteHandle { pid, vaddr: floored });
        }
        if alloc {
            self.tables[pid].insert(floored, RawPte(0));
            Some(PteHandle { pid, vaddr: floored })
        } else {
            None
        }
    }

    fn read_pte(&self, handle: PteHandle) -> RawPte {
        *self.tables[handle.pid]
            .get(&handle.vaddr)
            .unwrap_or(&RawPte(0))
    }

    fn write_pte(&mut self, handle: PteHandle, value: RawPte) {
        self.tables[handle.pid].insert(handle.vaddr, value);
    }
}

/// A swap device backed by a sparse map from start-block to page contents,
/// so tests never need to pre-size a contiguous byte buffer.
pub struct FakeBlockDevice {
    pages: BTreeMap<u32, [u8; PGSIZE]>,
}

impl FakeBlockDevice {
    pub fn new(_hint: usize) -> Self {
        Self {
            pages: BTreeMap::new(),
        }
    }
}

impl BlockDevice for FakeBlockDevice {
    fn read_page(&mut self, start_block: u32, dst: &mut [u8; PGSIZE]) {
        *dst = *self.pages.get(&start_block).unwrap_or(&[0u8; PGSIZE]);
    }

    fn write_page(&mut self, start_block: u32, src: &[u8; PGSIZE]) {
        self.pages.insert(start_block, *src);
    }
}

/// A CPU stand-in whose fault address and MMU-reload count are set directly
/// by the test rather than by real trap hardware.
pub struct FakeCpu {
    pub fault_addr: VirtAddr,
    pub reloads: usize,
}

impl FakeCpu {
    pub fn new(fault_addr: VirtAddr) -> Self {
        Self {
            fault_addr,
            reloads: 0,
        }
    }
}

impl Cpu for FakeCpu {
    fn fault_address(&self) -> VirtAddr {
        self.fault_addr
    }

    fn reload_mmu_root(&mut self) {
        self.reloads += 1;
    }
}
