//! Architecture-specific hooks consumed by the memory subsystem.
//!
//! Everything outside this module treats these as two external collaborator
//! primitives: reading the faulting virtual address (`rcr2`) and reloading
//! the MMU root (`lcr3`). Interrupt/trap dispatch, boot, and page-table
//! bring-up are out of scope for this subsystem and live elsewhere.

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

#[cfg(target_arch = "x86_64")]
pub use self::x86_64::X86Cpu as NativeCpu;

#[cfg(target_arch = "x86_64")]
pub use self::x86_64::halt;
