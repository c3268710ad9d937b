//! Rendering of results, as text or JSON.

use core::fmt::Write;

use jzon::JsonValue;
use nmm::{AddressingScheme, PageWalk, Scheme};

use crate::error::MmError;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// One `label: value` line per item.
    Text,
    /// A single JSON document.
    Json,
}

impl Format {
    /// Picks JSON when `json` is set.
    pub fn from_flag(json: bool) -> Format {
        if json { Format::Json } else { Format::Text }
    }
}

/// Direction of a single address translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Physical to direct map.
    PhysToVirt,
    /// Kernel virtual to physical.
    VirtToPhys,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::PhysToVirt => "phys-to-virt",
            Direction::VirtToPhys => "virt-to-phys",
        }
    }
}

fn hex(value: u64) -> String {
    format!("{value:#x}")
}

/// Renders a walk: the inputs first, then every level from the top down.
pub fn walk(scheme: &Scheme, walk: &PageWalk, format: Format) -> Result<String, MmError> {
    let register = scheme.table_base_register();
    match format {
        Format::Text => {
            let mut out = String::new();
            // Writing into a String can't fail.
            let _ = writeln!(out, "address: {}", walk.address);
            if scheme.uses_table_base() {
                let _ = writeln!(out, "{register}: {}", walk.table_base);
            }
            for step in walk.steps() {
                let _ = writeln!(out, "{}: {}", step.level, step.entry);
            }
            Ok(out)
        }
        Format::Json => {
            let mut levels = JsonValue::new_array();
            for step in walk.steps() {
                let mut level = JsonValue::new_object();
                level.insert("level", step.level)?;
                level.insert("index", step.index.value())?;
                level.insert("entry", hex(step.entry.as_u64()))?;
                levels.push(level)?;
            }

            let mut doc = JsonValue::new_object();
            doc.insert("scheme", scheme.name())?;
            doc.insert("address", hex(walk.address.as_u64()))?;
            if scheme.uses_table_base() {
                doc.insert(register, hex(walk.table_base.as_u64()))?;
            }
            doc.insert("levels", levels)?;
            Ok(format!("{}\n", doc.pretty(2)))
        }
    }
}

/// Renders a single translation of `input` to `output`.
pub fn translation(
    scheme: &Scheme,
    direction: Direction,
    input: u64,
    output: u64,
    format: Format,
) -> Result<String, MmError> {
    match format {
        Format::Text => Ok(format!("{} -> {}\n", hex(input), hex(output))),
        Format::Json => {
            let mut doc = JsonValue::new_object();
            doc.insert("scheme", scheme.name())?;
            doc.insert("direction", direction.as_str())?;
            doc.insert("input", hex(input))?;
            doc.insert("output", hex(output))?;
            Ok(format!("{}\n", doc.pretty(2)))
        }
    }
}

/// Renders the names of the registered schemes.
pub fn schemes(names: &[&str], format: Format) -> Result<String, MmError> {
    match format {
        Format::Text => {
            let mut out = String::new();
            for name in names {
                let _ = writeln!(out, "{name}");
            }
            Ok(out)
        }
        Format::Json => {
            let mut list = JsonValue::new_array();
            for name in names {
                list.push(*name)?;
            }
            Ok(format!("{}\n", list.dump()))
        }
    }
}
