//! Page index type.

/// A index into a page table. This value will always be less than the entry count of the level it was taken for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PageTableIndex(u16);

impl PageTableIndex {
    /// Creates a new `PageTableIndex` from a raw value, returning `None` if the value is not below `entries`.
    pub const fn try_new(value: u16, entries: u16) -> Option<Self> {
        if value < entries {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Extracts the slot selected by `address` in a table with `entries` slots whose index field starts at bit `shift`.
    ///
    /// `entries` must be a power of two. Shifts past the width of the address select slot 0.
    pub const fn extract(address: u64, shift: u8, entries: u16) -> Self {
        let shifted = match address.checked_shr(shift as u32) {
            Some(shifted) => shifted,
            None => 0,
        };
        // The mask keeps the value below `entries`, so it always fits.
        Self((shifted & (entries as u64 - 1)) as u16)
    }

    /// Returns the raw index value.
    pub const fn value(self) -> u16 {
        self.0
    }
}
