//! Bit layout of an addressing scheme.

use crate::paging::{LevelLayout, PageTableIndex};

/// Everything needed to translate addresses and walk tables for one addressing scheme.
///
/// Values are kept together per scheme so that two schemes can never share a constant by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeConstants {
    /// Base of the direct physical map (`__va(0)`).
    pub page_offset: u64,
    /// Base of the kernel static mapping.
    pub kernel_map_base: u64,
    /// Physical address the kernel image was loaded at.
    pub phys_base: u64,
    /// log2 of the base page size.
    pub page_shift: u8,
    /// Number of implemented physical address bits.
    pub physical_mask_shift: u8,
    /// Bit of an entry that marks it as mapping a large page.
    pub large_page_bit: u8,
    /// Walked levels, from the root table down to the level above the leaf.
    pub levels: &'static [LevelLayout],
}

const fn low_bits(shift: u8) -> u64 {
    if shift >= 64 {
        u64::MAX
    } else {
        (1u64 << shift) - 1
    }
}

impl SchemeConstants {
    /// Mask of the implemented physical address bits.
    pub const fn physical_mask(&self) -> u64 {
        low_bits(self.physical_mask_shift)
    }

    /// Mask clearing the offset within a base page.
    pub const fn page_mask(&self) -> u64 {
        !low_bits(self.page_shift)
    }

    /// Mask extracting the frame address from a regular entry (or from the root table register).
    pub const fn pfn_mask(&self) -> u64 {
        self.page_mask() & self.physical_mask()
    }

    /// Mask extracting the frame address from an entry mapping a `1 << shift` byte page.
    pub const fn large_page_mask(&self, shift: u8) -> u64 {
        !low_bits(shift) & self.physical_mask()
    }

    /// Returns true if `entry` has the large page bit set.
    pub const fn is_large_page(&self, entry: u64) -> bool {
        match 1u64.checked_shl(self.large_page_bit as u32) {
            Some(bit) => entry & bit != 0,
            None => false,
        }
    }

    /// Selects the mask that takes the next frame out of `entry`, an entry of `level`.
    ///
    /// Only a level declaring [`LevelLayout::large_page_shift`] looks at the large page bit.
    pub const fn frame_mask(&self, level: &LevelLayout, entry: u64) -> u64 {
        match level.large_page_shift {
            Some(shift) if self.is_large_page(entry) => self.large_page_mask(shift),
            _ => self.pfn_mask(),
        }
    }

    /// Returns the slot of `address` at the `level`th walked level, or `None` if the scheme has no such level.
    pub fn index(&self, level: usize, address: u64) -> Option<PageTableIndex> {
        self.levels.get(level).map(|layout| layout.index(address))
    }

    /// Applies the values set in `overrides`.
    pub fn apply(&mut self, overrides: &SchemeOverrides) {
        if let Some(page_offset) = overrides.page_offset {
            self.page_offset = page_offset;
        }
        if let Some(kernel_map_base) = overrides.kernel_map_base {
            self.kernel_map_base = kernel_map_base;
        }
        if let Some(phys_base) = overrides.phys_base {
            self.phys_base = phys_base;
        }
    }
}

/// Runtime replacements for the relocatable parts of a scheme.
///
/// Kernels built with address space randomization move the direct map and the kernel image at boot,
/// so the live values have to come from the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemeOverrides {
    /// Replacement for [`SchemeConstants::page_offset`].
    pub page_offset: Option<u64>,
    /// Replacement for [`SchemeConstants::kernel_map_base`].
    pub kernel_map_base: Option<u64>,
    /// Replacement for [`SchemeConstants::phys_base`].
    pub phys_base: Option<u64>,
}

impl SchemeOverrides {
    /// Returns true if no value is overridden.
    pub const fn is_empty(&self) -> bool {
        self.page_offset.is_none() && self.kernel_map_base.is_none() && self.phys_base.is_none()
    }

    /// Layers `other` on top of `self`; values set in `other` win.
    pub fn merge(self, other: SchemeOverrides) -> SchemeOverrides {
        SchemeOverrides {
            page_offset: other.page_offset.or(self.page_offset),
            kernel_map_base: other.kernel_map_base.or(self.kernel_map_base),
            phys_base: other.phys_base.or(self.phys_base),
        }
    }
}
