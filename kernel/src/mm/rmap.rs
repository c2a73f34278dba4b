//! Reverse-map table: which PTEs currently point at each physical frame.
//!
//! One record per physical frame, each behind its own lock -- the allocator
//! lock and a given frame's rmap lock are the only lock-ordering pair this
//! subsystem has (allocator lock, then a frame's rmap lock), and a thread
//! never holds two rmap locks at once.
//!
//! `ref` is never stored as a separate counter: it is always
//! `ptes.len()`, which makes invariant R1 (`ref == |ptes|`) true by
//! construction instead of something that can drift out of sync.

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use spin::Mutex;

use super::addr::FrameNumber;
use super::collab::{PteHandle, ProcessTable};
use super::config::NPROC;
use super::phys_mem::PhysicalMemory;
use super::pte::{Pte, PteFlags, SlotIndex};
use super::swap::SwapTable;

struct RmapEntry {
    ptes: Vec<PteHandle>,
}

impl RmapEntry {
    const fn empty() -> Self {
        Self { ptes: Vec::new() }
    }
}

/// `rmap[0..total_frames)`, indexed relative to `start`.
pub struct Rmap {
    start: FrameNumber,
    entries: Vec<Mutex<RmapEntry>>,
}

impl Rmap {
    /// `init_rmap`: one empty record per frame in `[start, end)`.
    pub fn new(start: FrameNumber, end: FrameNumber) -> Self {
        let count = (end.as_u64() - start.as_u64()) as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(Mutex::new(RmapEntry::empty()));
        }
        Self { start, entries }
    }

    fn index(&self, frame: FrameNumber) -> usize {
        (frame.as_u64() - self.start.as_u64()) as usize
    }

    /// `ref` for `frame`: the number of PTEs currently mapping it.
    pub fn ref_count(&self, frame: FrameNumber) -> usize {
        self.entries[self.index(frame)].lock().ptes.len()
    }

    /// `share_add(pa, pte)`: asserts `handle`'s PTE is resident, appends it
    /// to `frame`'s set, and increments `ref`. Fails fatally on overflow
    /// (more than `NPROC` aliases) -- that many live processes all mapping
    /// one frame would mean the process table's own bound was violated.
    pub fn share_add(&self, frame: FrameNumber, handle: PteHandle, procs: &impl ProcessTable) {
        match Pte::decode(procs.read_pte(handle)) {
            Pte::Resident { .. } => {}
            _ => crate::fatal!("share_add: pte at {handle:?} is not resident"),
        }

        let mut entry = self.entries[self.index(frame)].lock();
        if entry.ptes.len() >= NPROC {
            crate::fatal!("share_add: rmap overflow for frame {}", frame.as_u64());
        }
        entry.ptes.push(handle);
    }

    /// `share_remove(pa, pte) -> new_ref`. Idempotent: removing a PTE that
    /// is not present is a no-op that returns the unchanged `ref`, unless
    /// the `strict-rmap` feature is enabled, in which case it is fatal.
    ///
    /// When `ref` transitions from 2 to 1, the surviving PTE has its
    /// writable bit restored, completing the COW merge back to exclusive
    /// ownership (invariant R3).
    pub fn share_remove(
        &self,
        frame: FrameNumber,
        handle: PteHandle,
        procs: &mut impl ProcessTable,
    ) -> usize {
        let mut entry = self.entries[self.index(frame)].lock();
        let Some(pos) = entry.ptes.iter().position(|&h| h == handle) else {
            #[cfg(feature = "strict-rmap")]
            crate::fatal!("share_remove: pte at {handle:?} not present in frame {frame:?}");
            #[cfg(not(feature = "strict-rmap"))]
            return entry.ptes.len();
        };
        entry.ptes.remove(pos);
        let new_ref = entry.ptes.len();

        if new_ref == 1 {
            let survivor = entry.ptes[0];
            drop(entry);
            restore_writable(survivor, procs);
        }

        new_ref
    }

    /// `share_split`: the COW fault primitive. `new_frame` must already be
    /// freshly allocated by the caller -- allocating it here would mean
    /// potentially re-entering this module's lock if the allocator itself
    /// needs to evict, so the allocation happens before this call, at the
    /// [`crate::mm::MemoryManager`] orchestration layer.
    ///
    /// Never aliases: on return `handle` points at `new_frame`, distinct
    /// from `old_frame`, and `old_frame`'s rmap set no longer contains
    /// `handle`.
    pub fn share_split(
        &self,
        old_frame: FrameNumber,
        handle: PteHandle,
        new_frame: FrameNumber,
        procs: &mut impl ProcessTable,
        phys: &mut PhysicalMemory,
    ) {
        let flags = match Pte::decode(procs.read_pte(handle)) {
            Pte::Resident { frame, flags } if frame == old_frame => flags,
            other => crate::fatal!("share_split: unexpected pte state {other:?}"),
        };
        let new_flags = flags | PteFlags::WRITABLE;

        self.share_remove(old_frame, handle, procs);
        phys.copy_frame(old_frame, new_frame);

        let new_pte = Pte::Resident {
            frame: new_frame,
            flags: new_flags,
        };
        procs.write_pte(handle, new_pte.encode());
        self.share_add(new_frame, handle, procs);
    }

    /// True iff every PTE mapping `frame` has its accessed bit clear --
    /// the victim selector's "every alias cold" test.
    pub fn all_cold(&self, frame: FrameNumber, procs: &impl ProcessTable) -> bool {
        let entry = self.entries[self.index(frame)].lock();
        entry.ptes.iter().all(|&h| match Pte::decode(procs.read_pte(h)) {
            Pte::Resident { flags, .. } => !flags.contains(PteFlags::ACCESSED),
            _ => true,
        })
    }

    /// Clears the accessed bit on every PTE aliasing `frame`, so that
    /// [`Self::all_cold`] is meaningful the next time this frame is
    /// visited. Clearing only the chosen PTE and not its aliases would let
    /// the "every alias cold" test pass on stale information.
    pub fn clear_accessed_all(&self, frame: FrameNumber, procs: &mut impl ProcessTable) {
        let entry = self.entries[self.index(frame)].lock();
        for &h in entry.ptes.iter() {
            if let Pte::Resident { frame: f, flags } = Pte::decode(procs.read_pte(h)) {
                let cleared = Pte::Resident {
                    frame: f,
                    flags: flags.difference(PteFlags::ACCESSED),
                };
                procs.write_pte(h, cleared.encode());
            }
        }
    }

    /// Under `frame`'s rmap lock, rewrites every referencing PTE to the swap
    /// cookie for `slot`, moves each into the slot's PTE set, and drains
    /// `frame`'s rmap set to empty (`ref` reaches zero). RSS accounting for
    /// the evicted frame is the victim selector's job, done before this
    /// runs while the PTEs are still resident; this step only ever moves
    /// bits, not counters.
    pub fn evict(&self, frame: FrameNumber, slot: SlotIndex, procs: &mut impl ProcessTable, swap: &SwapTable) {
        let mut entry = self.entries[self.index(frame)].lock();
        let mut saved_flags = None;
        for handle in entry.ptes.drain(..) {
            let flags = match Pte::decode(procs.read_pte(handle)) {
                Pte::Resident { flags, .. } => flags,
                other => crate::fatal!("evict: unexpected pte state {other:?}"),
            };
            if saved_flags.is_none() {
                saved_flags = Some(flags);
            }
            let swapped = Pte::Swapped { slot, flags };
            procs.write_pte(handle, swapped.encode());
            swap.add_pte(slot, handle, saved_flags.unwrap());
        }
    }

    /// Snapshot of the PTE set, for invariant tests.
    #[cfg(test)]
    pub fn ptes(&self, frame: FrameNumber) -> Vec<PteHandle> {
        self.entries[self.index(frame)].lock().ptes.clone()
    }
}

fn restore_writable(handle: PteHandle, procs: &mut impl ProcessTable) {
    if let Pte::Resident { frame, flags } = Pte::decode(procs.read_pte(handle)) {
        let restored = Pte::Resident {
            frame,
            flags: flags | PteFlags::WRITABLE,
        };
        procs.write_pte(handle, restored.encode());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::testkit::FakeProcessTable;

    fn frame(n: u64) -> FrameNumber {
        FrameNumber::new(n)
    }

    #[test]
    fn share_add_twice_clears_writable_on_both() {
        let rmap = Rmap::new(frame(0), frame(16));
        let mut procs = FakeProcessTable::new(2, 4096);
        let h1 = procs.map_resident(0, 0x1000, frame(5), PteFlags::WRITABLE);
        let h2 = procs.map_resident(1, 0x2000, frame(5), PteFlags::empty());

        rmap.share_add(frame(5), h1, &procs);
        rmap.share_add(frame(5), h2, &procs);

        assert_eq!(rmap.ref_count(frame(5)), 2);
        assert!(!Pte::decode(procs.read_pte(h1)).is_writable_resident());
        assert!(!Pte::decode(procs.read_pte(h2)).is_writable_resident());
    }

    #[test]
    fn share_remove_restores_writable_on_merge() {
        let rmap = Rmap::new(frame(0), frame(16));
        let mut procs = FakeProcessTable::new(2, 4096);
        let h1 = procs.map_resident(0, 0x1000, frame(5), PteFlags::empty());
        let h2 = procs.map_resident(1, 0x2000, frame(5), PteFlags::empty());
        rmap.share_add(frame(5), h1, &procs);
        rmap.share_add(frame(5), h2, &procs);

        let new_ref = rmap.share_remove(frame(5), h2, &mut procs);
        assert_eq!(new_ref, 1);
        assert!(Pte::decode(procs.read_pte(h1)).is_writable_resident());
    }

    #[test]
    fn share_remove_on_absent_pte_is_idempotent() {
        let rmap = Rmap::new(frame(0), frame(16));
        let mut procs = FakeProcessTable::new(1, 4096);
        let h1 = procs.map_resident(0, 0x1000, frame(5), PteFlags::WRITABLE);
        rmap.share_add(frame(5), h1, &procs);
        let first = rmap.share_remove(frame(5), h1, &mut procs);
        let second = rmap.share_remove(frame(5), h1, &mut procs);
        assert_eq!(first, second);
    }

    #[test]
    fn split_never_aliases_and_copies_contents() {
        let rmap = Rmap::new(frame(0), frame(16));
        let mut procs = FakeProcessTable::new(2, 4096);
        let mut phys = PhysicalMemory::new(frame(0), 16);
        let h1 = procs.map_resident(0, 0x1000, frame(5), PteFlags::empty());
        let h2 = procs.map_resident(1, 0x2000, frame(5), PteFlags::empty());
        rmap.share_add(frame(5), h1, &procs);
        rmap.share_add(frame(5), h2, &procs);

        let mut data = [0u8; 4096];
        data[0] = 0x42;
        phys.write(frame(5), &data);

        rmap.share_split(frame(5), h2, frame(9), &mut procs, &mut phys);

        assert_eq!(rmap.ref_count(frame(5)), 1);
        assert_eq!(rmap.ref_count(frame(9)), 1);
        assert!(Pte::decode(procs.read_pte(h1)).is_writable_resident());
        match Pte::decode(procs.read_pte(h2)) {
            Pte::Resident { frame: f, flags } => {
                assert_eq!(f, frame(9));
                assert!(flags.contains(PteFlags::WRITABLE));
            }
            other => panic!("expected resident pte, got {other:?}"),
        }
        assert_eq!(phys.read(frame(9)), phys.read(frame(5)));
    }
}
