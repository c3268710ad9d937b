//! Architecture-specific types and implementations for x86_64.

pub mod addr;

use bitflags::bitflags;

use crate::{
    paging::LevelLayout,
    scheme::{AddressingScheme, SchemeConstants, SchemeOverrides},
};

/// Registered name of 4-level paging.
pub const FOUR_LEVEL_NAME: &str = "x86_64";
/// Registered name of 5-level paging (LA57).
pub const FIVE_LEVEL_NAME: &str = "x86_64-la57";

/// The number of bits used for indexing into page tables at each level.
pub const TABLE_INDEX_BITS: usize = 9;
/// The size of a page table in bytes for x86_64 architecture.
pub const TABLE_SIZE: usize = 4096;
/// The number of entries in a page table for x86_64 architecture.
pub const ENTRY_COUNT: usize = TABLE_SIZE / core::mem::size_of::<u64>();
/// log2 of the base page size.
pub const PAGE_SHIFT: u8 = 12;
/// Start of the kernel image mapping (`__START_KERNEL_map`).
pub const START_KERNEL_MAP: u64 = 0xffff_ffff_8000_0000;

const _: () = assert!(ENTRY_COUNT == 1 << TABLE_INDEX_BITS);

bitflags! {
    /// Page table entry flags for x86_64 architecture.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct PageTableFlags: u64 {
        /// The page is present in memory.
        const PRESENT         = 1 << 0;
        /// The page is writable.
        const WRITABLE        = 1 << 1;
        /// The page is accessible from userspace.
        const USER_ACCESSIBLE = 1 << 2;
        /// Write-through caching enabled.
        const WRITE_THROUGH   = 1 << 3;
        /// Cache disabled for this page.
        const NO_CACHE       = 1 << 4;
        /// The page has been accessed.
        const ACCESSED        = 1 << 5;
        /// The page has been written to.
        const DIRTY           = 1 << 6;
        /// This is a huge page (2MB or 1GB).
        const HUGE_PAGE       = 1 << 7;
        /// The page is global and not flushed from TLB on CR3 reload.
        const GLOBAL          = 1 << 8;
        /// No-execute flag; if set, code execution is not allowed from this page.
        const NO_EXECUTE      = 1 << 63;
    }
}

const LARGE_PAGE_BIT: u8 = PageTableFlags::HUGE_PAGE.bits().trailing_zeros() as u8;

// The walk stops at the pmd: the pte below it would only be reachable by reading memory.
//
// Only the pud is marked for large pages. A pmd entry with PSE set maps a 2MB page too, but it is never
// dereferenced by the walk, so its mask would go unused.
const LEVELS: [LevelLayout; 4] = [
    LevelLayout::new("pgd", 48, ENTRY_COUNT as u16),
    LevelLayout::new("p4d", 39, ENTRY_COUNT as u16),
    LevelLayout::new("pud", 30, ENTRY_COUNT as u16).with_large_pages(30),
    LevelLayout::new("pmd", 21, ENTRY_COUNT as u16),
];

/// Constants of 4-level paging with the classic (non randomized) kernel layout.
pub const FOUR_LEVEL: SchemeConstants = SchemeConstants {
    page_offset: 0xffff_8800_0000_0000,
    kernel_map_base: START_KERNEL_MAP,
    phys_base: 0,
    page_shift: PAGE_SHIFT,
    physical_mask_shift: 44,
    large_page_bit: LARGE_PAGE_BIT,
    levels: &LEVELS,
};

/// Constants of 5-level paging with the classic (non randomized) kernel layout.
pub const FIVE_LEVEL: SchemeConstants = SchemeConstants {
    page_offset: 0xff11_0000_0000_0000,
    physical_mask_shift: 52,
    ..FOUR_LEVEL
};

/// x86_64 paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct X86_64 {
    name: &'static str,
    constants: SchemeConstants,
}

impl X86_64 {
    /// 4-level paging, registered as [`FOUR_LEVEL_NAME`].
    pub const fn four_level() -> Self {
        Self::with_constants(FOUR_LEVEL_NAME, FOUR_LEVEL)
    }

    /// 5-level paging, registered as [`FIVE_LEVEL_NAME`].
    pub const fn five_level() -> Self {
        Self::with_constants(FIVE_LEVEL_NAME, FIVE_LEVEL)
    }

    /// A variant with custom constants.
    pub const fn with_constants(name: &'static str, constants: SchemeConstants) -> Self {
        X86_64 { name, constants }
    }

    /// Returns a copy with the relocatable constants replaced by `overrides`.
    pub fn with_overrides(mut self, overrides: &SchemeOverrides) -> Self {
        self.constants.apply(overrides);
        self
    }
}

impl AddressingScheme for X86_64 {
    fn name(&self) -> &'static str {
        self.name
    }

    fn constants(&self) -> &SchemeConstants {
        &self.constants
    }

    fn table_base_register(&self) -> &'static str {
        "cr3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::{PhysAddr, VirtAddr};

    #[test]
    fn assert_flags_correctness() {
        use super::PageTableFlags as OurFlags;
        use x86_64::structures::paging::page_table::PageTableFlags as X86Flags;
        macro_rules! check {
            ($name: ident) => {
                assert_eq!(OurFlags::$name.bits(), X86Flags::$name.bits(), "Flag {} does not match!", stringify!($name));
            };
            (($($name: ident),+)) => {
                $(
                    check!($name);
                )+
            }
        }

        check!((
            PRESENT,
            WRITABLE,
            USER_ACCESSIBLE,
            WRITE_THROUGH,
            NO_CACHE,
            ACCESSED,
            DIRTY,
            HUGE_PAGE,
            GLOBAL,
            NO_EXECUTE
        ));
    }

    #[test]
    fn large_page_bit_is_pse() {
        assert_eq!(FOUR_LEVEL.large_page_bit, 7);
        assert!(FOUR_LEVEL.is_large_page(PageTableFlags::HUGE_PAGE.bits()));
        assert!(!FOUR_LEVEL.is_large_page(PageTableFlags::PRESENT.bits()));
    }

    #[test]
    fn physical_to_virtual_adds_page_offset() {
        let scheme = X86_64::four_level();
        assert_eq!(
            scheme.physical_to_virtual(PhysAddr::new(0x1000)),
            VirtAddr::new(0xffff_8800_0000_1000)
        );
        assert_eq!(
            scheme.physical_to_virtual(PhysAddr::new(0)),
            VirtAddr::new(FOUR_LEVEL.page_offset)
        );
    }

    #[test]
    fn physical_to_virtual_wraps() {
        let scheme = X86_64::four_level();
        assert_eq!(
            scheme.physical_to_virtual(PhysAddr::new(u64::MAX)),
            VirtAddr::new(0xffff_87ff_ffff_ffff)
        );
        assert_eq!(
            scheme.physical_to_virtual(PhysAddr::new(0x0000_7800_0000_0000)),
            VirtAddr::new(0)
        );
    }

    #[test]
    fn virtual_to_physical_kernel_image() {
        // no borrow: rebased onto phys_base
        let scheme = X86_64::four_level();
        assert_eq!(
            scheme.virtual_to_physical(VirtAddr::new(0xffff_ffff_8100_0000)),
            PhysAddr::new(0x100_0000)
        );

        let relocated = scheme.with_overrides(&SchemeOverrides {
            phys_base: Some(0x2_0000_0000),
            ..Default::default()
        });
        assert_eq!(
            relocated.virtual_to_physical(VirtAddr::new(0xffff_ffff_8100_0000)),
            PhysAddr::new(0x2_0100_0000)
        );
    }

    #[test]
    fn virtual_to_physical_direct_map() {
        // borrow: falls back to the direct map rule
        let scheme = X86_64::four_level();
        assert_eq!(
            scheme.virtual_to_physical(VirtAddr::new(0xffff_8800_0000_1000)),
            PhysAddr::new(0x1000)
        );
        assert_eq!(
            scheme.virtual_to_physical(VirtAddr::new(0x1000)),
            PhysAddr::new(0x0000_7800_0000_1000)
        );
    }

    #[test]
    fn direct_map_round_trip() {
        for scheme in [X86_64::four_level(), X86_64::five_level()] {
            for phys in [0u64, 0x1000, 0x1234_5000, 0x7f_ffff_f000] {
                let virt = scheme.physical_to_virtual(PhysAddr::new(phys));
                assert_eq!(scheme.virtual_to_physical(virt), PhysAddr::new(phys));
            }
        }
    }

    #[test]
    fn reference_walk() {
        let walk = X86_64::four_level().walk(
            PhysAddr::new(0x1000),
            VirtAddr::new(0xffff_ffff_8100_0000),
        );
        let entries: Vec<_> = walk.steps().iter().map(|s| (s.level, s.entry.as_u64())).collect();
        assert_eq!(
            entries,
            [
                ("pgd", 0xffff_8800_0000_11ff),
                ("p4d", 0xffff_9000_0000_11ff),
                ("pud", 0xffff_8800_0000_11fe),
                ("pmd", 0xffff_9000_0000_0008),
            ]
        );
        assert_eq!(walk.address, VirtAddr::new(0xffff_ffff_8100_0000));
        assert_eq!(walk.table_base, PhysAddr::new(0x1000));
    }

    #[test]
    fn cr3_control_bits_are_masked() {
        let scheme = X86_64::four_level();
        let address = VirtAddr::new(0xffff_ffff_8100_0000);
        // PCID in the low twelve bits
        let plain = scheme.walk(PhysAddr::new(0x1000), address);
        let tagged = scheme.walk(PhysAddr::new(0x1fe7), address);
        assert_eq!(plain.steps(), tagged.steps());
    }

    #[test]
    fn user_address_walk() {
        let walk = X86_64::four_level().walk(
            PhysAddr::new(0x1234_5000),
            VirtAddr::new(0x0000_7f12_3456_7000),
        );
        let entries: Vec<_> = walk.steps().iter().map(|s| s.entry.as_u64()).collect();
        assert_eq!(
            entries,
            [
                0xffff_8800_1234_5000,
                0xffff_9000_1234_50fe,
                0xffff_8800_1234_5048,
                0xffff_9000_1234_51a2,
            ]
        );
    }

    #[test]
    fn pud_large_page_bit_changes_pmd_table() {
        let scheme = X86_64::four_level();
        let constants = scheme.constants();
        let pud = &constants.levels[2];
        let entry = 0x0000_0001_2345_6000;

        let small = scheme.physical_to_virtual(PhysAddr::new(entry & constants.frame_mask(pud, entry)));
        let huge_entry = entry | PageTableFlags::HUGE_PAGE.bits();
        let huge =
            scheme.physical_to_virtual(PhysAddr::new(huge_entry & constants.frame_mask(pud, huge_entry)));

        assert_eq!(small, VirtAddr::new(0xffff_8801_2345_6000));
        assert_eq!(huge, VirtAddr::new(0xffff_8801_0000_0000));
        assert_ne!(small, huge);
    }

    #[test]
    fn five_level_reference_walk() {
        let walk = X86_64::five_level().walk(
            PhysAddr::new(0x1000),
            VirtAddr::new(0xffff_ffff_8100_0000),
        );
        let entries: Vec<_> = walk.steps().iter().map(|s| s.entry.as_u64()).collect();
        assert_eq!(
            entries,
            [
                0xff11_0000_0000_11ff,
                0xff12_0000_0000_11ff,
                0xff13_0000_0000_11fe,
                0xff14_0000_0000_0008,
            ]
        );
    }
}
