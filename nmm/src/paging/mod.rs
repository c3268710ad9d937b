//! Page table structure and the walk over it.
pub mod index;
pub mod walk;

pub use index::PageTableIndex;
pub use walk::{MAX_LEVELS, PageWalk, WalkStep, walk};

/// One level of a page table hierarchy, as seen by the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelLayout {
    /// Name the level is reported under (e.g. `pgd`).
    pub name: &'static str,
    /// Bit position of the level's index field inside a virtual address.
    pub shift: u8,
    /// Number of entries in a table of this level. Always a power of two.
    pub entries: u16,
    /// When set, an entry of this level with the scheme's large page bit set maps a page of `1 << shift` bytes,
    /// and its frame is taken with the matching coarser mask.
    pub large_page_shift: Option<u8>,
}

impl LevelLayout {
    /// Creates a level without large page support.
    pub const fn new(name: &'static str, shift: u8, entries: u16) -> Self {
        assert!(entries.is_power_of_two(), "entry count must be a power of two");
        LevelLayout {
            name,
            shift,
            entries,
            large_page_shift: None,
        }
    }

    /// Marks entries of this level as able to map large pages of `1 << shift` bytes.
    pub const fn with_large_pages(mut self, shift: u8) -> Self {
        self.large_page_shift = Some(shift);
        self
    }

    /// Returns the slot of `address` in a table of this level.
    pub const fn index(&self, address: u64) -> PageTableIndex {
        PageTableIndex::extract(address, self.shift, self.entries)
    }
}
