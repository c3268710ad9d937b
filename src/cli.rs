//! Command line interface.

use std::{num::IntErrorKind, path::PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use nmm::{AddressingScheme, PhysAddr};

use crate::error::{InvalidNumber, MmError};

/// Memory management helper utilities.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Addressing scheme to use (see `schemes`)
    #[arg(long, global = true, value_name = "NAME", default_value = nmm::arch::DEFAULT_SCHEME)]
    pub arch: String,

    /// TOML file with per-scheme layout overrides
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log more; repeat for more detail
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Actions the tool can perform.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dumps the page table entries the MMU visits to resolve an address
    Walk(WalkArgs),
    /// Translates a physical address into the direct physical map
    PhysToVirt {
        /// Physical address
        #[arg(value_parser = parse_u64)]
        address: u64,
    },
    /// Translates a kernel virtual address into a physical one
    VirtToPhys {
        /// Kernel virtual address
        #[arg(value_parser = parse_u64)]
        address: u64,
    },
    /// Lists the supported addressing schemes
    Schemes,
}

/// Arguments of the `walk` command.
#[derive(Args, Debug)]
pub struct WalkArgs {
    /// Address of the fault
    #[arg(long, value_parser = parse_u64)]
    pub address: u64,

    /// Value of the root table register (CR3 on x86_64)
    #[arg(long, value_parser = parse_u64)]
    pub cr3: Option<u64>,
}

/// Parses an unsigned 64-bit integer, picking the base from a `0x`, `0o` or `0b` prefix (decimal otherwise).
///
/// Underscores between digits are ignored.
pub fn parse_u64(value: &str) -> Result<u64, InvalidNumber> {
    let invalid = |reason| InvalidNumber {
        value: value.to_string(),
        reason,
    };

    let digits = value.trim().replace('_', "");
    let (radix, body) = match digits.get(..2) {
        Some("0x" | "0X") => (16, &digits[2..]),
        Some("0o" | "0O") => (8, &digits[2..]),
        Some("0b" | "0B") => (2, &digits[2..]),
        _ => (10, digits.as_str()),
    };

    // from_str_radix tolerates a leading `+`, which we don't
    if body.is_empty() || body.starts_with('+') {
        return Err(invalid("expected digits"));
    }

    u64::from_str_radix(body, radix).map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => invalid("does not fit in 64 bits"),
        _ => invalid("not a number in the given base"),
    })
}

/// Checks the root table register value against what `scheme` expects.
///
/// Schemes walking from a root register need one; the others must not be given one.
pub fn table_base<S: AddressingScheme + ?Sized>(
    scheme: &S,
    value: Option<u64>,
) -> Result<Option<PhysAddr>, MmError> {
    match (scheme.uses_table_base(), value) {
        (true, Some(value)) => Ok(Some(PhysAddr::new(value))),
        (true, None) => Err(MmError::MissingTableBase(scheme.name().to_string())),
        (false, Some(_)) => Err(MmError::UnusedTableBase(scheme.name().to_string())),
        (false, None) => Ok(None),
    }
}
