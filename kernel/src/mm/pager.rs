//! Evictor and pager: the only places frame contents cross the boundary to
//! the backing block device. Both work in terms of a whole swap slot, since
//! a slot can be shared by every alias of the frame it was evicted from --
//! ref count transfers unchanged from the rmap entry into the slot's PTE
//! set.

use super::addr::FrameNumber;
use super::collab::{BlockDevice, ProcessTable};
use super::config::{slot_start_block, PGSIZE};
use super::frame_allocator::FrameAllocator;
use super::phys_mem::PhysicalMemory;
use super::pte::Pte;
use super::rmap::Rmap;
use super::rss::change_rss;
use super::swap::SwapTable;
use super::victim::victim_page;
use crate::error::KernelError;

/// A free frame if one is on hand, otherwise the evictor's output. Eviction
/// is not a separate path the caller falls back to -- `kalloc` invokes
/// [`allocate_page`] itself whenever the free list is empty.
///
/// Fails with [`KernelError::NoVictimProcess`] if the free list is empty and
/// the process table has nothing left to evict from; fails with
/// [`KernelError::OutOfMemory`] in the (otherwise unreachable) case where a
/// freshly freed frame cannot be reclaimed.
#[allow(clippy::too_many_arguments)]
pub fn kalloc(
    alloc: &FrameAllocator,
    rmap: &Rmap,
    swap: &SwapTable,
    phys: &mut PhysicalMemory,
    block: &mut impl BlockDevice,
    procs: &mut impl ProcessTable,
) -> Result<FrameNumber, KernelError> {
    if let Some(frame) = alloc.try_alloc() {
        return Ok(frame);
    }

    let victim = allocate_page(rmap, swap, phys, block, procs)?;
    alloc.free(victim, phys);
    alloc.try_alloc().ok_or(KernelError::OutOfMemory {
        available: alloc.num_free_pages(),
    })
}

/// The evictor. Selects a victim frame via [`victim_page`], writes its
/// contents out to a freshly claimed swap slot, and rewrites every aliasing
/// PTE to the swap cookie. Returns the now-free victim frame so the caller
/// can hand it straight to the allocation that triggered eviction, without
/// a separate `kalloc` retry.
///
/// Fails with [`KernelError::NoVictimProcess`] if no process is eligible for
/// eviction. Panics if a victim was found but the swap device has no free
/// slot left -- unlike an empty free list, a full swap device cannot be
/// waited out by a future retry.
pub fn allocate_page(
    rmap: &Rmap,
    swap: &SwapTable,
    phys: &mut PhysicalMemory,
    block: &mut impl BlockDevice,
    procs: &mut impl ProcessTable,
) -> Result<FrameNumber, KernelError> {
    let victim = victim_page(rmap, procs).ok_or(KernelError::NoVictimProcess)?;
    let slot = swap
        .claim_free_slot()
        .unwrap_or_else(|| crate::fatal!("allocate_page: no free swap slot"));

    let data = *phys.read(victim);
    block.write_page(slot_start_block(slot), &data);

    rmap.evict(victim, slot, procs, swap);

    Ok(victim)
}

/// Reads `slot`'s contents back into `frame` (already allocated by the
/// caller), rewrites every PTE that was sharing the slot to point at `frame`
/// with the slot's saved permission bits, re-populates `frame`'s rmap entry,
/// credits RSS back to every recovered alias, and frees the slot.
///
/// Panics if `slot` was already free -- the caller is responsible for having
/// obtained `frame` before calling this, which only happens once a fault or
/// eviction has legitimately claimed the slot.
pub fn recover_swap(
    slot: usize,
    frame: FrameNumber,
    swap: &SwapTable,
    rmap: &Rmap,
    phys: &mut PhysicalMemory,
    block: &mut impl BlockDevice,
    procs: &mut impl ProcessTable,
) {
    let (flags, handles) = swap.take_slot(slot);

    let mut data = [0u8; PGSIZE];
    block.read_page(slot_start_block(slot), &mut data);
    phys.write(frame, &data);

    for handle in &handles {
        let resident = Pte::Resident { frame, flags };
        procs.write_pte(*handle, resident.encode());
        rmap.share_add(frame, *handle, procs);
    }
    change_rss(frame, 1, procs);
}
