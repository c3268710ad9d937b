//! Addressing schemes and the registry that selects one by name.
//!
//! An [`AddressingScheme`] is a [`SchemeConstants`] plus the two translations between the
//! direct map and physical memory. Concrete schemes live under [`crate::arch`]; [`Scheme`]
//! is the closed set of them that can be picked at runtime.

mod constants;

use alloc::string::{String, ToString};
use core::str::FromStr;

use crate::{
    addr::{PhysAddr, VirtAddr},
    arch::x86_64::{self, X86_64},
    paging::{self, PageWalk},
};

pub use constants::{SchemeConstants, SchemeOverrides};

/// The capability set of a page table addressing scheme.
pub trait AddressingScheme {
    /// The identifier the scheme is registered under.
    fn name(&self) -> &'static str;

    /// The bit layout of the scheme.
    fn constants(&self) -> &SchemeConstants;

    /// Whether walks need the value of a root table register.
    fn uses_table_base(&self) -> bool {
        true
    }

    /// Name of the register holding the root table base.
    fn table_base_register(&self) -> &'static str {
        "table_base"
    }

    /// Translates a physical address to its alias in the direct physical map (`__va`).
    ///
    /// Total over the 64-bit domain; wraps on overflow.
    fn physical_to_virtual(&self, addr: PhysAddr) -> VirtAddr {
        VirtAddr::new(addr.as_u64().wrapping_add(self.constants().page_offset))
    }

    /// Translates an address in the kernel static mapping back to physical memory (`__pa`).
    ///
    /// If subtracting the mapping base doesn't borrow, the address is in the kernel image and is
    /// rebased onto `phys_base`. Otherwise it is treated as a direct map address. This is not the
    /// inverse of [`physical_to_virtual`](Self::physical_to_virtual) for kernel image addresses.
    fn virtual_to_physical(&self, addr: VirtAddr) -> PhysAddr {
        let constants = self.constants();
        let x = addr.as_u64();
        let y = x.wrapping_sub(constants.kernel_map_base);

        let phys = if x > y {
            y.wrapping_add(constants.phys_base)
        } else {
            y.wrapping_add(constants.kernel_map_base.wrapping_sub(constants.page_offset))
        };
        PhysAddr::new(phys)
    }

    /// Reconstructs the walk of `address` starting from the root table at `table_base`.
    fn walk(&self, table_base: PhysAddr, address: VirtAddr) -> PageWalk {
        paging::walk(self, table_base, address)
    }
}

/// Failure to select a scheme.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemeError {
    /// No scheme is registered under the name.
    #[error("Not a valid architecture {0}")]
    Unknown(String),
}

/// One of the registered addressing schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// x86_64 paging, either 4-level or 5-level.
    X86_64(X86_64),
}

impl Scheme {
    /// Every name [`Scheme::from_name`] accepts.
    pub const NAMES: &'static [&'static str] = &[x86_64::FOUR_LEVEL_NAME, x86_64::FIVE_LEVEL_NAME];

    /// Looks up a scheme by its registered name.
    pub fn from_name(name: &str) -> Result<Scheme, SchemeError> {
        match name {
            x86_64::FOUR_LEVEL_NAME => Ok(Scheme::X86_64(X86_64::four_level())),
            x86_64::FIVE_LEVEL_NAME => Ok(Scheme::X86_64(X86_64::five_level())),
            _ => Err(SchemeError::Unknown(name.to_string())),
        }
    }

    /// Returns the scheme with the relocatable constants replaced by `overrides`.
    pub fn with_overrides(self, overrides: &SchemeOverrides) -> Scheme {
        match self {
            Scheme::X86_64(scheme) => Scheme::X86_64(scheme.with_overrides(overrides)),
        }
    }
}

impl FromStr for Scheme {
    type Err = SchemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scheme::from_name(s)
    }
}

impl AddressingScheme for Scheme {
    fn name(&self) -> &'static str {
        match self {
            Scheme::X86_64(scheme) => scheme.name(),
        }
    }

    fn constants(&self) -> &SchemeConstants {
        match self {
            Scheme::X86_64(scheme) => scheme.constants(),
        }
    }

    fn uses_table_base(&self) -> bool {
        match self {
            Scheme::X86_64(scheme) => scheme.uses_table_base(),
        }
    }

    fn table_base_register(&self) -> &'static str {
        match self {
            Scheme::X86_64(scheme) => scheme.table_base_register(),
        }
    }

    fn physical_to_virtual(&self, addr: PhysAddr) -> VirtAddr {
        match self {
            Scheme::X86_64(scheme) => scheme.physical_to_virtual(addr),
        }
    }

    fn virtual_to_physical(&self, addr: VirtAddr) -> PhysAddr {
        match self {
            Scheme::X86_64(scheme) => scheme.virtual_to_physical(addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_name_resolves() {
        for name in Scheme::NAMES {
            let scheme = Scheme::from_name(name).unwrap();
            assert_eq!(scheme.name(), *name);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = Scheme::from_name("aarch64").unwrap_err();
        assert_eq!(err, SchemeError::Unknown("aarch64".to_string()));
        assert_eq!(err.to_string(), "Not a valid architecture aarch64");
        assert!("".parse::<Scheme>().is_err());
    }

    #[test]
    fn dispatch_matches_concrete_scheme() {
        let scheme: Scheme = "x86_64".parse().unwrap();
        let concrete = X86_64::four_level();
        let addr = VirtAddr::new(0xffff_ffff_8100_0000);
        let cr3 = PhysAddr::new(0x1000);

        assert!(scheme.uses_table_base());
        assert_eq!(scheme.table_base_register(), "cr3");
        assert_eq!(scheme.constants(), concrete.constants());
        assert_eq!(scheme.walk(cr3, addr), concrete.walk(cr3, addr));
        assert_eq!(
            scheme.virtual_to_physical(addr),
            concrete.virtual_to_physical(addr)
        );
    }

    #[test]
    fn overrides_reach_translation() {
        let overrides = SchemeOverrides {
            page_offset: Some(0xffff_8880_0000_0000),
            ..Default::default()
        };
        let scheme = Scheme::from_name("x86_64").unwrap().with_overrides(&overrides);
        assert_eq!(
            scheme.physical_to_virtual(PhysAddr::new(0x1000)),
            VirtAddr::new(0xffff_8880_0000_1000)
        );
        assert_eq!(scheme.name(), "x86_64");
    }
}
