//! Arithmetic reconstruction of a page table walk.
//!
//! The walk never dereferences anything. Each computed entry address is fed to the next level
//! as if it already held that level's entry value, so its low bits select the next table frame.
//! The resulting addresses are where the MMU would look, not a claim that the entries are present.

use arrayvec::ArrayVec;
use log::{debug, trace};

use crate::{
    addr::{PhysAddr, VirtAddr},
    paging::{LevelLayout, PageTableIndex},
    scheme::AddressingScheme,
};

/// The deepest hierarchy a walk can report.
pub const MAX_LEVELS: usize = 5;

/// A single reported level of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkStep {
    /// Name of the level (e.g. `pmd`).
    pub level: &'static str,
    /// Slot of the walked address within the level's table.
    pub index: PageTableIndex,
    /// Direct-map virtual address of the entry.
    pub entry: VirtAddr,
}

/// The entries visited while resolving `address`, from the top level down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWalk {
    /// The address being resolved.
    pub address: VirtAddr,
    /// The root table register value, as given (control bits included).
    pub table_base: PhysAddr,
    steps: ArrayVec<WalkStep, MAX_LEVELS>,
}

impl PageWalk {
    /// Returns the visited levels in traversal order.
    pub fn steps(&self) -> &[WalkStep] {
        &self.steps
    }

    /// Returns the entry address computed for the named level.
    pub fn entry(&self, level: &str) -> Option<VirtAddr> {
        self.steps
            .iter()
            .find(|step| step.level == level)
            .map(|step| step.entry)
    }
}

/// Computes the entry address of every level `scheme` describes for `address`, starting at the root table in `table_base`.
///
/// Levels beyond [`MAX_LEVELS`] are not walked.
pub fn walk<S: AddressingScheme + ?Sized>(
    scheme: &S,
    table_base: PhysAddr,
    address: VirtAddr,
) -> PageWalk {
    let constants = scheme.constants();
    debug!(
        "walking {} for {} from table base {}",
        scheme.name(),
        address,
        table_base
    );

    let mut steps = ArrayVec::new();
    let mut table = scheme.physical_to_virtual(table_base.masked(constants.pfn_mask()));
    let mut previous: Option<(&LevelLayout, VirtAddr)> = None;

    for level in constants.levels.iter().take(MAX_LEVELS) {
        if let Some((parent, entry)) = previous {
            let value = entry.as_u64();
            let frame = PhysAddr::new(value & constants.frame_mask(parent, value));
            table = scheme.physical_to_virtual(frame);
        }

        let index = level.index(address.as_u64());
        let entry = table.wrapping_add(u64::from(index.value()));
        trace!(
            "{}: table {} index {} -> {}",
            level.name,
            table,
            index.value(),
            entry
        );

        steps.push(WalkStep {
            level: level.name,
            index,
            entry,
        });
        previous = Some((level, entry));
    }

    PageWalk {
        address,
        table_base,
        steps,
    }
}
