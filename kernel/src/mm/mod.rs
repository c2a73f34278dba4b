//! Physical memory subsystem: frame allocation, copy-on-write sharing,
//! swapping, and the page-fault dispatcher that ties them together.
//!
//! One file per component -- allocator, rmap, swap table, victim
//! selection, paging -- plus [`collab`] for the external collaborator
//! interfaces and [`context`] for the owning struct that wires them all
//! together.

pub mod addr;
pub mod collab;
pub mod config;
pub mod context;
pub mod frame_allocator;
pub mod page_fault;
pub mod pager;
pub mod phys_mem;
pub mod pte;
pub mod rmap;
pub mod rss;
pub mod swap;
#[cfg(test)]
pub mod testkit;
pub mod victim;

pub use context::{MemoryConfig, MemoryManager};
