//! nmm - Novos Memory Manager Library
//!
//! Reconstructs the chain of page-table entry addresses the MMU would visit for a
//! virtual address, given only the value of the root table register. Nothing here
//! reads memory: every table address is derived arithmetically through the
//! scheme's direct physical map, so the results say *where* the hardware would look,
//! never whether the entries there are present or valid.
#![cfg_attr(not(test), no_std)]

#[cfg(not(feature = "x86_64"))]
compile_error!("Only x86_64 architecture is currently supported.");

extern crate alloc;

pub mod addr;
pub mod arch;
pub mod paging;
pub mod scheme;

pub use addr::{PhysAddr, VirtAddr};
pub use paging::{PageTableIndex, PageWalk, WalkStep};
pub use scheme::{AddressingScheme, Scheme, SchemeConstants, SchemeError, SchemeOverrides};
