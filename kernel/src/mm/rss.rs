//! RSS accountant: the one place that walks live processes' page tables
//! purely to keep their resident-set counters honest.
//!
//! A frame's rmap entry and a process's resident-page count are two
//! different views of the same fact, and the exact set of aliases a caller
//! happens to be holding at the moment of eviction or recovery does not
//! always line up with which processes' counters need touching. `change_rss`
//! closes that gap by scanning for the ground truth directly: which live
//! processes currently have a PTE pointing at this exact frame.

use super::addr::{FrameNumber, VirtAddr};
use super::collab::ProcessTable;
use super::config::{NPROC, PGSIZE};
use super::pte::Pte;

/// `change_rss(pa, delta)`: for every live process, walks its address range
/// looking for a resident PTE pointing at `pa`, and adjusts that process's
/// RSS by `delta` pages wherever one is found. A frame shared by several
/// processes is adjusted once per process that maps it.
pub fn change_rss(pa: FrameNumber, delta_pages: i64, procs: &mut impl ProcessTable) {
    for pid in 0..NPROC {
        if !procs.is_proc(pid) {
            continue;
        }
        let size = procs.proc_size(pid);
        let mut va = 0u64;
        while va < size as u64 {
            let vaddr = VirtAddr::new(va);
            va += PGSIZE as u64;
            let Some(handle) = procs.walk(pid, vaddr, false) else {
                continue;
            };
            if let Pte::Resident { frame, .. } = Pte::decode(procs.read_pte(handle)) {
                if frame == pa {
                    procs.adjust_rss(pid, delta_pages);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::pte::PteFlags;
    use crate::mm::testkit::FakeProcessTable;

    fn frame(n: u64) -> FrameNumber {
        FrameNumber::new(n)
    }

    #[test]
    fn credits_every_process_mapping_the_frame() {
        let mut procs = FakeProcessTable::new(2, 4096 * 2);
        procs.map_resident(0, 0x0000, frame(5), PteFlags::empty());
        procs.map_resident(1, 0x1000, frame(5), PteFlags::empty());
        procs.map_resident(1, 0x2000, frame(9), PteFlags::empty());

        change_rss(frame(5), 1, &mut procs);

        assert_eq!(procs.proc_rss(0), 1);
        assert_eq!(procs.proc_rss(1), 1);
    }

    #[test]
    fn debits_only_matching_frame() {
        let mut procs = FakeProcessTable::new(1, 4096 * 2);
        procs.map_resident(0, 0x0000, frame(5), PteFlags::empty());
        procs.adjust_rss(0, 1);

        change_rss(frame(7), -1, &mut procs);
        assert_eq!(procs.proc_rss(0), 1);

        change_rss(frame(5), -1, &mut procs);
        assert_eq!(procs.proc_rss(0), 0);
    }
}
