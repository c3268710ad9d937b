//! Conversions between the scheme-agnostic addresses and the `x86_64` crate's checked ones.

use crate::addr::{PhysAddr, VirtAddr};

impl VirtAddr {
    /// Returns the address as an `x86_64` virtual address, or `None` if it is not canonical
    /// (bits 48..64 are not a sign extension of bit 47).
    pub fn to_canonical(self) -> Option<::x86_64::VirtAddr> {
        ::x86_64::VirtAddr::try_new(self.as_u64()).ok()
    }
}

impl PhysAddr {
    /// Returns the address as an `x86_64` physical address, or `None` if bits 52..64 are set.
    pub fn to_checked(self) -> Option<::x86_64::PhysAddr> {
        ::x86_64::PhysAddr::try_new(self.as_u64()).ok()
    }
}

impl From<::x86_64::VirtAddr> for VirtAddr {
    fn from(addr: ::x86_64::VirtAddr) -> Self {
        VirtAddr::new(addr.as_u64())
    }
}

impl From<::x86_64::PhysAddr> for PhysAddr {
    fn from(addr: ::x86_64::PhysAddr) -> Self {
        PhysAddr::new(addr.as_u64())
    }
}
