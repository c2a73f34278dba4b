//! Bare-metal entry point. Boots just far enough to hand a physical
//! address range and a swap device to [`pmm_kernel::MemoryManager`] and
//! start serving faults; everything else (scheduling, process lifecycle,
//! real block I/O) belongs to out-of-scope collaborators, and is stubbed
//! out here only enough to prove the subsystem links and boots.

#![no_std]
#![no_main]

use core::panic::PanicInfo;

use pmm_kernel::mm::addr::FrameNumber;
use pmm_kernel::mm::collab::{BlockDevice, PteHandle, ProcessTable};
use pmm_kernel::mm::pte::RawPte;
use pmm_kernel::{println, MemoryConfig, MemoryManager};

/// Physical memory this demo kernel manages, chosen to fit comfortably
/// above a small bootstrap image in a QEMU `-m 32M` guest.
const PHYSTOP: u64 = 8 * 1024 * 1024;
const KERNEL_END_FRAME: u64 = 256;
const SWAP_BLOCKS: u32 = 8 * 64;

#[no_mangle]
pub extern "C" fn _start() -> ! {
    println!("pmm-kernel v{}", env!("CARGO_PKG_VERSION"));
    pmm_kernel::serial::init_logger();

    let config = MemoryConfig {
        start: FrameNumber::new(KERNEL_END_FRAME),
        end: FrameNumber::new(PHYSTOP / 4096),
        swap_blocks: SWAP_BLOCKS,
    };
    let mut mm = MemoryManager::new(config, FrameNumber::new(KERNEL_END_FRAME));
    println!("[mm] {} frames free", mm.num_free_pages());

    let mut block = NullBlockDevice;
    let mut procs = NullProcessTable;
    match mm.kalloc(&mut block, &mut procs) {
        Ok(frame) => println!("[mm] allocated frame {}", frame.as_u64()),
        Err(e) => println!("[mm] kalloc failed: {e}"),
    }

    loop {
        core::hint::spin_loop();
    }
}

/// Placeholder `BlockDevice` until a real swap device driver exists.
struct NullBlockDevice;

impl BlockDevice for NullBlockDevice {
    fn read_page(&mut self, _start_block: u32, dst: &mut [u8; 4096]) {
        *dst = [0u8; 4096];
    }

    fn write_page(&mut self, _start_block: u32, _src: &[u8; 4096]) {}
}

/// Placeholder `ProcessTable` with no live processes, sufficient to prove
/// `kalloc` links and runs before a real process subsystem exists.
struct NullProcessTable;

impl ProcessTable for NullProcessTable {
    fn is_proc(&self, _pid: usize) -> bool {
        false
    }

    fn proc_size(&self, _pid: usize) -> usize {
        0
    }

    fn proc_rss(&self, _pid: usize) -> usize {
        0
    }

    fn adjust_rss(&mut self, _pid: usize, _delta_pages: i64) {}

    fn victim_proc(&self) -> Option<usize> {
        None
    }

    fn current_pid(&self) -> usize {
        0
    }

    fn walk(&mut self, _pid: usize, _vaddr: pmm_kernel::mm::addr::VirtAddr, _alloc: bool) -> Option<PteHandle> {
        None
    }

    fn read_pte(&self, _handle: PteHandle) -> RawPte {
        RawPte(0)
    }

    fn write_pte(&mut self, _handle: PteHandle, _value: RawPte) {}
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    #[cfg(target_arch = "x86_64")]
    println!("[KERNEL PANIC] {info}");
    pmm_kernel::serial::enter_panic();

    #[cfg(target_arch = "x86_64")]
    pmm_kernel::arch::halt();
    #[cfg(not(target_arch = "x86_64"))]
    loop {
        core::hint::spin_loop();
    }
}
