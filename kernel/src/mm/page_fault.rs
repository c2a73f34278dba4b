//! Fault dispatcher.
//!
//! Classifies a fault before acting on it: read the faulting address, walk
//! the page table for it, and decide whether the fault is a legitimate
//! swap-in, a legitimate copy-on-write split, or something this subsystem
//! cannot repair. The three-way classification reads directly off the
//! tagged [`crate::mm::pte::Pte`] the PTE decodes to, rather than testing
//! raw status bits.

use crate::error::KernelError;

use super::collab::{BlockDevice, Cpu, ProcessTable};
use super::frame_allocator::FrameAllocator;
use super::pager::{kalloc, recover_swap};
use super::phys_mem::PhysicalMemory;
use super::pte::Pte;
use super::rmap::Rmap;
use super::swap::SwapTable;

/// `page_fault()`: reads the faulting address from `cpu`, walks `pid`'s page
/// table for it, and resolves the fault:
///
/// * No mapping at all, or a resident mapping that is already writable --
///   fatal. Neither is a condition this subsystem can repair.
/// * A resident mapping with more than one alias -- a copy-on-write fault;
///   splits the frame via [`Rmap::share_split`].
/// * A swapped-out mapping -- brings the page back via
///   [`super::pager::recover_swap`].
///
/// The only non-fatal failure is running out of memory to complete the
/// repair, which propagates the allocator's exhaustion up to the caller
/// instead of panicking, since the fault itself was otherwise legitimate.
#[allow(clippy::too_many_arguments)]
pub fn page_fault(
    pid: usize,
    alloc: &FrameAllocator,
    rmap: &Rmap,
    swap: &SwapTable,
    phys: &mut PhysicalMemory,
    block: &mut impl BlockDevice,
    procs: &mut impl ProcessTable,
    cpu: &mut impl Cpu,
) -> Result<(), KernelError> {
    let vaddr = cpu.fault_address();
    let handle = match procs.walk(pid, vaddr, false) {
        Some(h) => h,
        None => crate::fatal!("page_fault: no mapping for pid {pid} at {vaddr:?}"),
    };

    match Pte::decode(procs.read_pte(handle)) {
        Pte::Absent => {
            crate::fatal!("page_fault: fault on unmapped page for pid {pid} at {vaddr:?}")
        }
        Pte::Resident { frame, .. } if rmap.ref_count(frame) <= 1 => {
            crate::fatal!("page_fault: write fault on exclusively-owned frame {frame:?}")
        }
        Pte::Resident { frame, .. } => {
            let new_frame = kalloc(alloc, rmap, swap, phys, block, procs)?;
            rmap.share_split(frame, handle, new_frame, procs, phys);
            cpu.reload_mmu_root();
            Ok(())
        }
        Pte::Swapped { slot, .. } => {
            let new_frame = kalloc(alloc, rmap, swap, phys, block, procs)?;
            recover_swap(slot, new_frame, swap, rmap, phys, block, procs);
            cpu.reload_mmu_root();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::addr::{FrameNumber, VirtAddr};
    use crate::mm::pte::PteFlags;
    use crate::mm::testkit::{FakeBlockDevice, FakeCpu, FakeProcessTable};

    fn frame(n: u64) -> FrameNumber {
        FrameNumber::new(n)
    }

    #[test]
    fn cow_fault_splits_and_reloads_mmu() {
        let start = frame(0);
        let end = frame(8);
        let alloc = FrameAllocator::new(start, end);
        alloc.kinit1(start);
        alloc.kinit2(end);
        alloc.try_alloc();
        let shared = alloc.try_alloc().unwrap();
        let rmap = Rmap::new(start, end);
        let swap = SwapTable::new(2);
        let mut phys = PhysicalMemory::new(start, 8);
        let mut block = FakeBlockDevice::new(4096);
        let mut procs = FakeProcessTable::new(2, 4096 * 8);

        let h1 = procs.map_resident(0, 0x1000, shared, PteFlags::empty());
        let h2 = procs.map_resident(1, 0x2000, shared, PteFlags::empty());
        rmap.share_add(shared, h1, &procs);
        rmap.share_add(shared, h2, &procs);

        let mut cpu = FakeCpu::new(VirtAddr::new(0x2000));
        page_fault(1, &alloc, &rmap, &swap, &mut phys, &mut block, &mut procs, &mut cpu)
            .expect("cow fault resolves");

        assert_eq!(cpu.reloads, 1);
        assert_eq!(rmap.ref_count(shared), 1);
        match Pte::decode(procs.read_pte(h2)) {
            Pte::Resident { frame, flags } => {
                assert_ne!(frame, shared);
                assert!(flags.contains(PteFlags::WRITABLE));
            }
            other => panic!("expected resident pte, got {other:?}"),
        }
    }

    #[test]
    fn swap_in_fault_restores_residency() {
        let start = frame(0);
        let end = frame(8);
        let alloc = FrameAllocator::new(start, end);
        alloc.kinit1(start);
        alloc.kinit2(end);
        let rmap = Rmap::new(start, end);
        let swap = SwapTable::new(2);
        let mut phys = PhysicalMemory::new(start, 8);
        let mut block = FakeBlockDevice::new(4096);
        let mut procs = FakeProcessTable::new(1, 4096 * 8);

        let slot = swap.claim_free_slot().unwrap();
        let h = procs.map_resident(0, 0x1000, frame(2), PteFlags::WRITABLE);
        let swapped = Pte::Swapped {
            slot,
            flags: PteFlags::WRITABLE,
        };
        procs.write_pte(h, swapped.encode());
        swap.add_pte(slot, h, PteFlags::WRITABLE);

        let mut cpu = FakeCpu::new(VirtAddr::new(0x1000));
        page_fault(0, &alloc, &rmap, &swap, &mut phys, &mut block, &mut procs, &mut cpu)
            .expect("swap-in fault resolves");

        assert_eq!(cpu.reloads, 1);
        assert!(!Pte::decode(procs.read_pte(h)).is_swapped());
    }

    #[test]
    #[should_panic(expected = "exclusively-owned frame")]
    fn write_fault_on_exclusive_page_is_fatal() {
        let start = frame(0);
        let end = frame(4);
        let alloc = FrameAllocator::new(start, end);
        alloc.kinit1(start);
        alloc.kinit2(end);
        let rmap = Rmap::new(start, end);
        let swap = SwapTable::new(1);
        let mut phys = PhysicalMemory::new(start, 4);
        let mut block = FakeBlockDevice::new(4096);
        let mut procs = FakeProcessTable::new(1, 4096 * 4);
        let owned = alloc.try_alloc().unwrap();
        let h = procs.map_resident(0, 0x1000, owned, PteFlags::empty());
        rmap.share_add(owned, h, &procs);

        let mut cpu = FakeCpu::new(VirtAddr::new(0x1000));
        let _ = page_fault(0, &alloc, &rmap, &swap, &mut phys, &mut block, &mut procs, &mut cpu);
    }
}
