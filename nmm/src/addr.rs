//! Address primitives.
//!
//! Unlike the architecture crates these addresses perform no canonicality or width checks:
//! a crash dump can contain any 64-bit value, and the walk has to be reproduced for it anyway.
//! All arithmetic wraps modulo 2^64.

use core::fmt;

/// A location in physical memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PhysAddr(u64);

impl PhysAddr {
    /// Create a new physical address from a u64.
    pub const fn new(addr: u64) -> Self {
        PhysAddr(addr)
    }

    /// Get the underlying u64 value of the physical address.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Adds `offset`, wrapping around at the end of the 64-bit space.
    pub const fn wrapping_add(self, offset: u64) -> Self {
        PhysAddr(self.0.wrapping_add(offset))
    }

    /// Keeps only the bits set in `mask`.
    pub const fn masked(self, mask: u64) -> Self {
        PhysAddr(self.0 & mask)
    }
}

/// A location in a virtual address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct VirtAddr(u64);

impl VirtAddr {
    /// Create a new virtual address from a u64.
    pub const fn new(addr: u64) -> Self {
        VirtAddr(addr)
    }

    /// Get the underlying u64 value of the virtual address.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Adds `offset`, wrapping around at the end of the 64-bit space.
    pub const fn wrapping_add(self, offset: u64) -> Self {
        VirtAddr(self.0.wrapping_add(offset))
    }

    /// Keeps only the bits set in `mask`.
    pub const fn masked(self, mask: u64) -> Self {
        VirtAddr(self.0 & mask)
    }
}

impl From<u64> for PhysAddr {
    fn from(addr: u64) -> Self {
        PhysAddr(addr)
    }
}

impl From<u64> for VirtAddr {
    fn from(addr: u64) -> Self {
        VirtAddr(addr)
    }
}

macro_rules! impl_hex_fmt {
    ($($ty: ident),+) => {
        $(
            impl fmt::LowerHex for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::LowerHex::fmt(&self.0, f)
                }
            }

            impl fmt::UpperHex for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::UpperHex::fmt(&self.0, f)
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{:#x}", self.0)
                }
            }
        )+
    };
}

impl_hex_fmt!(PhysAddr, VirtAddr);
