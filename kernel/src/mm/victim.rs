//! Victim page selector and access-bit aging.
//!
//! Approximate LRU, scoped to a single process: the process table names one
//! live process as the eviction victim, and only that process's mapped
//! range is ever scanned or touched here. A page is judged cold only if
//! every PTE aliasing its frame (via [`Rmap::all_cold`]) has its accessed
//! bit clear. A full pass that finds no cold page clears the accessed bit
//! on 10% of the hot pages it saw ("aging") and tries again, so the search
//! is guaranteed to make progress rather than loop forever on a hot working
//! set.

use super::addr::{FrameNumber, VirtAddr};
use super::collab::ProcessTable;
use super::config::PGSIZE;
use super::pte::{Pte, PteFlags};
use super::rmap::Rmap;
use super::rss::change_rss;

/// A defensive bound on full sweeps of the victim process's range before
/// giving up -- a process with zero present pages left to age must not hang
/// the evictor.
const MAX_SWEEPS: usize = 64;

/// Selects a frame to evict: asks the process table for a victim process,
/// then scans that process's `[0, size)` virtual range in page-sized steps
/// for a page whose frame is cold. Returns `None` if no process is eligible
/// to serve as a victim.
///
/// When a cold frame is found, every process still mapping it has its RSS
/// decremented here, before the frame's PTEs are rewritten to point at swap
/// -- this is the only place RSS is debited for an eviction, so there is no
/// second count to keep in step with it.
pub fn victim_page(rmap: &Rmap, procs: &mut impl ProcessTable) -> Option<FrameNumber> {
    let pid = procs.victim_proc()?;
    let size = procs.proc_size(pid);

    for _ in 0..MAX_SWEEPS {
        let mut hot = 0usize;
        let mut va = 0u64;
        while va < size as u64 {
            let vaddr = VirtAddr::new(va);
            va += PGSIZE as u64;
            let Some(handle) = procs.walk(pid, vaddr, false) else {
                continue;
            };
            let Pte::Resident { frame, flags } = Pte::decode(procs.read_pte(handle)) else {
                continue;
            };
            if !flags.contains(PteFlags::ACCESSED) && rmap.all_cold(frame, procs) {
                change_rss(frame, -1, procs);
                return Some(frame);
            }
            hot += 1;
        }

        if hot == 0 {
            return None;
        }
        age(pid, size, rmap, procs, hot);
    }
    None
}

/// Clears the accessed bit on roughly 10% of `pid`'s hot pages, rounding up
/// so a single-digit hot count still ages at least one page per pass.
/// Scans from virtual address 0, the order the contract fixes ties by.
fn age(pid: usize, size: usize, rmap: &Rmap, procs: &mut impl ProcessTable, hot_count: usize) {
    let quota = hot_count.div_ceil(10).max(1);
    let mut cleared = 0usize;
    let mut va = 0u64;
    while va < size as u64 && cleared < quota {
        let vaddr = VirtAddr::new(va);
        va += PGSIZE as u64;
        let Some(handle) = procs.walk(pid, vaddr, false) else {
            continue;
        };
        let Pte::Resident { frame, flags } = Pte::decode(procs.read_pte(handle)) else {
            continue;
        };
        if flags.contains(PteFlags::ACCESSED) {
            unset_access(frame, rmap, procs);
            cleared += 1;
        }
    }
}

/// Clears the accessed bit on every alias of `frame`, propagating through
/// rmap so the next `all_cold` check on this frame is meaningful.
pub fn unset_access(frame: FrameNumber, rmap: &Rmap, procs: &mut impl ProcessTable) {
    rmap.clear_accessed_all(frame, procs);
}
