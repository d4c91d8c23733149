//! The CPU feature checker.
//!
//! ```text
//! > check_cpu_features
//! Vendor ID        : GenuineIntel
//! Brand String     : Intel(R) Core(TM) i7-8700K CPU @ 3.70GHz
//! Max Basic Leaf   : 0x00000016
//! Max Extended Leaf: 0x80000008
//!
//! CPUID.(7,0): EAX=0x00000000 EBX=0x029c6fbf ECX=0x40000000 EDX=0xbc000400
//! CET_SS (Shadow Stack)       : not supported  - CET: protects return addresses using a hardware shadow stack
//! ...
//! ```

use std::io::{self, Write};

use anyhow::{Context, Result, ensure};
use clap::{ArgAction, Parser};
use cpufeat::{Decoder, NativeCpuid, Report};
use log::LevelFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Print the report of every logical processor
    #[arg(short, long)]
    all_processors: bool,

    /// Log diagnostics to stderr. Repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .init();

    let decoder = Decoder::new(NativeCpuid);
    let mut out = io::stdout().lock();
    if cli.all_processors {
        let core_ids =
            core_affinity::get_core_ids().context("failed to enumerate logical processors")?;
        log::info!("Executing CPUID on {} logical processors", core_ids.len());
        for core_id in core_ids {
            ensure!(
                core_affinity::set_for_current(core_id),
                "failed to run on CPU{}",
                core_id.id
            );
            writeln!(out, "CPU{:2}:", core_id.id)?;
            write!(out, "{}", Report::collect(&decoder))?;
        }
    } else {
        write!(out, "{}", Report::collect(&decoder))?;
    }
    out.flush()?;
    Ok(())
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments() {
        let cli = Cli::try_parse_from(["check_cpu_features"]).unwrap();
        assert!(!cli.all_processors);
        assert_eq!(log_level(cli.verbose), LevelFilter::Warn);
    }

    #[test]
    fn flags() {
        let cli = Cli::try_parse_from(["check_cpu_features", "-a", "-vv"]).unwrap();
        assert!(cli.all_processors);
        assert_eq!(log_level(cli.verbose), LevelFilter::Debug);

        let cli = Cli::try_parse_from(["check_cpu_features", "--verbose", "-vvv"]).unwrap();
        assert_eq!(log_level(cli.verbose), LevelFilter::Trace);
    }

    #[test]
    fn rejects_positional_arguments() {
        assert!(Cli::try_parse_from(["check_cpu_features", "extra"]).is_err());
    }

    #[test]
    fn native_report() {
        let report = Report::collect(&Decoder::new(NativeCpuid));
        assert!(
            report
                .vendor_id
                .as_bytes()
                .iter()
                .all(|b| b.is_ascii_graphic() || *b == b' '),
        );
        assert!(report.to_string().starts_with("Vendor ID        : "));
    }
}
