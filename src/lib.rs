//! Memory management helper: reconstructs page table walks from a crash dump or register snapshot.
//!
//! The arithmetic lives in [`nmm`]; this crate picks the addressing scheme, applies layout overrides
//! and renders the results.

use log::{LevelFilter, info, warn};
use nmm::{AddressingScheme, PhysAddr, Scheme, VirtAddr};

pub mod cli;
pub mod config;
mod error;
pub mod report;

pub use error::{InvalidNumber, MmError};

use crate::{
    cli::{Cli, Command},
    config::Config,
    report::{Direction, Format},
};

/// Sets up `env_logger`. `RUST_LOG` takes precedence over `verbose`.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Selects the scheme named on the command line with the overrides from `config` applied.
pub fn select_scheme(cli: &Cli, config: &Config) -> Result<Scheme, MmError> {
    let scheme = Scheme::from_name(&cli.arch)?;
    let overrides = config.overrides_for(scheme.name());
    if !overrides.is_empty() {
        info!("Using layout overrides for {}: {:?}", scheme.name(), overrides);
    }
    Ok(scheme.with_overrides(&overrides))
}

/// Runs the command described by `cli` and returns the rendered report.
///
/// The configuration is only loaded for commands that need a scheme.
pub fn run(cli: &Cli) -> Result<String, MmError> {
    run_with(cli, || Config::load(cli.config.as_deref()))
}

/// Like [`run`], but takes the configuration from `load_config`.
pub fn run_with(
    cli: &Cli,
    load_config: impl FnOnce() -> Result<Config, MmError>,
) -> Result<String, MmError> {
    let select = || -> Result<Scheme, MmError> { select_scheme(cli, &load_config()?) };
    let format = Format::from_flag(cli.json);
    match &cli.command {
        Command::Walk(args) => {
            let scheme = select()?;
            let table_base = cli::table_base(&scheme, args.cr3)?;
            let address = VirtAddr::new(args.address);
            if address.to_canonical().is_none() {
                warn!("{} is not a canonical address, walking it anyway", address);
            }
            let walk = scheme.walk(table_base.unwrap_or_default(), address);
            report::walk(&scheme, &walk, format)
        }
        Command::PhysToVirt { address } => {
            let scheme = select()?;
            let virt = scheme.physical_to_virtual(PhysAddr::new(*address));
            report::translation(&scheme, Direction::PhysToVirt, *address, virt.as_u64(), format)
        }
        Command::VirtToPhys { address } => {
            let scheme = select()?;
            let phys = scheme.virtual_to_physical(VirtAddr::new(*address));
            report::translation(&scheme, Direction::VirtToPhys, *address, phys.as_u64(), format)
        }
        Command::Schemes => report::schemes(Scheme::NAMES, format),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[cfg(unix)]
    mod log_internal {
        use ctor::ctor;

        #[ctor]
        static INIT: () = {
            env_logger::builder().is_test(true).init();
        };
    }

    fn run_args(args: &[&str]) -> Result<String, MmError> {
        let cli = Cli::try_parse_from(std::iter::once("mmhelper").chain(args.iter().copied()))
            .expect("valid command line");
        run_with(&cli, || Ok(Config::default()))
    }

    #[test]
    fn reference_walk_end_to_end() {
        let out = run_args(&["walk", "--address", "0xffffffff81000000", "--cr3", "0x1000"]).unwrap();
        assert_eq!(
            out,
            "address: 0xffffffff81000000\n\
             cr3: 0x1000\n\
             pgd: 0xffff8800000011ff\n\
             p4d: 0xffff9000000011ff\n\
             pud: 0xffff8800000011fe\n\
             pmd: 0xffff900000000008\n"
        );
    }

    #[test]
    fn identical_inputs_identical_output() {
        let args = ["walk", "--address", "0x7f1234567000", "--cr3", "0x12345000", "--json"];
        assert_eq!(run_args(&args).unwrap(), run_args(&args).unwrap());
    }

    #[test]
    fn non_canonical_address_still_walks() {
        let out = run_args(&["walk", "--address", "0xdeadbeef00000000", "--cr3", "0x1000"]).unwrap();
        assert_eq!(out.lines().count(), 6);
    }

    #[test]
    fn missing_cr3_is_rejected() {
        let err = run_args(&["walk", "--address", "0xffffffff81000000"]).unwrap_err();
        assert_eq!(err.to_string(), "--arch x86_64 needs --cr3 as well");
    }

    #[test]
    fn unknown_arch_is_rejected() {
        let err = run_args(&["--arch", "sparc", "walk", "--address", "0x0", "--cr3", "0x1000"])
            .unwrap_err();
        assert!(matches!(err, MmError::Scheme(_)));
        assert_eq!(err.to_string(), "Not a valid architecture sparc");
    }

    #[test]
    fn translations() {
        assert_eq!(
            run_args(&["phys-to-virt", "0x1000"]).unwrap(),
            "0x1000 -> 0xffff880000001000\n"
        );
        assert_eq!(
            run_args(&["virt-to-phys", "0xffffffff81000000"]).unwrap(),
            "0xffffffff81000000 -> 0x1000000\n"
        );
        assert_eq!(
            run_args(&["--arch", "x86_64-la57", "phys-to-virt", "0x1000"]).unwrap(),
            "0x1000 -> 0xff11000000001000\n"
        );
    }

    #[test]
    fn overrides_come_from_the_given_config() {
        let config = Config::from_toml(
            "[scheme.x86_64]\npage_offset = \"0xffff888000000000\"\n",
            std::path::Path::new("mmhelper.toml"),
        )
        .unwrap();
        let cli = Cli::try_parse_from(["mmhelper", "phys-to-virt", "0x1000"]).unwrap();
        let out = run_with(&cli, || Ok(config)).unwrap();
        assert_eq!(out, "0x1000 -> 0xffff888000001000\n");
    }

    #[test]
    fn schemes_ignore_arch() {
        let out = run_args(&["--arch", "nonsense", "schemes"]).unwrap();
        assert_eq!(out, "x86_64\nx86_64-la57\n");
    }
}
