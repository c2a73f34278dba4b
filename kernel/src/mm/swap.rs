//! Swap-slot table: which PTEs a given backing-device slot currently
//! serves, and the permission bits it saved on their behalf.
//!
//! One record per slot on the backing block device. A slot's lifecycle is
//! driven by a single evictor or a single fault at a time, never both at
//! once, but each slot still gets its own `Mutex` here so the borrow
//! checker enforces that discipline rather than merely document it.

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use spin::Mutex;

use super::collab::PteHandle;
use super::pte::PteFlags;

struct SlotRecord {
    is_free: bool,
    ptes: Vec<PteHandle>,
    saved_flags: Option<PteFlags>,
}

impl SlotRecord {
    const fn empty() -> Self {
        Self {
            is_free: true,
            ptes: Vec::new(),
            saved_flags: None,
        }
    }

    /// Invariant S1/S2: `num == |ptes|` and `is_free <=> num == 0`. `num` is
    /// never stored separately since `ptes.len()` always holds it.
    fn num(&self) -> usize {
        self.ptes.len()
    }
}

/// The swap-slot table, `ss[0..NSLOTS)`.
pub struct SwapTable {
    slots: Vec<Mutex<SlotRecord>>,
    /// Guards the "find a free slot and claim it" scan so two evictors
    /// cannot both claim the same slot.
    claim_lock: Mutex<()>,
}

impl SwapTable {
    /// `init_slot`: creates a table of `num_slots` slots, all free.
    pub fn new(num_slots: usize) -> Self {
        let mut slots = Vec::with_capacity(num_slots);
        for _ in 0..num_slots {
            slots.push(Mutex::new(SlotRecord::empty()));
        }
        Self {
            slots,
            claim_lock: Mutex::new(()),
        }
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    /// Finds and claims the lowest-indexed free slot. Returns `None` if the
    /// swap device is full -- the evictor turns that into a fatal
    /// "no free slot" condition, since there is no way to make progress.
    pub fn claim_free_slot(&self) -> Option<usize> {
        let _guard = self.claim_lock.lock();
        for (idx, slot) in self.slots.iter().enumerate() {
            let mut rec = slot.lock();
            if rec.is_free {
                rec.is_free = false;
                return Some(idx);
            }
        }
        None
    }

    /// Records `saved_flags` for `slot` the first time it is set, then
    /// moves `handle` into the slot's PTE set. Later callers sharing the
    /// slot keep the first occupant's permissions rather than overwriting
    /// them, since every alias of an evicted frame held the same bits.
    pub fn add_pte(&self, slot: usize, handle: PteHandle, flags: PteFlags) {
        let mut rec = self.slots[slot].lock();
        if rec.saved_flags.is_none() {
            rec.saved_flags = Some(flags);
        }
        rec.ptes.push(handle);
    }

    /// Returns `slot`'s saved permission bits and the handles referring to
    /// it, and marks the slot free.
    pub fn take_slot(&self, slot: usize) -> (PteFlags, Vec<PteHandle>) {
        let mut rec = self.slots[slot].lock();
        if rec.is_free {
            crate::fatal!("recover_swap: slot {slot} is already free");
        }
        let flags = rec
            .saved_flags
            .take()
            .unwrap_or_else(|| crate::fatal!("recover_swap: slot {slot} has no saved flags"));
        let ptes = core::mem::take(&mut rec.ptes);
        rec.is_free = true;
        (flags, ptes)
    }

    /// Removes a single `handle` from `slot`'s set, freeing the slot when
    /// it empties. A dying process's last reference to a shared slot
    /// should not evict the other processes still swapped into it.
    ///
    /// Panics (fatal) if `slot` is already free or does not contain
    /// `handle`.
    pub fn remove_pte(&self, slot: usize, handle: PteHandle) {
        let mut rec = self.slots[slot].lock();
        if rec.is_free {
            crate::fatal!("remove_swap: slot {slot} is already free");
        }
        let pos = rec
            .ptes
            .iter()
            .position(|&h| h == handle)
            .unwrap_or_else(|| crate::fatal!("remove_swap: pte not found in slot {slot}"));
        rec.ptes.swap_remove(pos);
        if rec.num() == 0 {
            rec.is_free = true;
            rec.saved_flags = None;
        }
    }

    /// Snapshot for invariant tests: `is_free`, `num`, and the PTE set.
    #[cfg(test)]
    pub fn snapshot(&self, slot: usize) -> (bool, usize, Vec<PteHandle>) {
        let rec = self.slots[slot].lock();
        (rec.is_free, rec.num(), rec.ptes.clone())
    }
}
