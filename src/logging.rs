//! Logging setup on the `log` facade with an `env_logger` backend.
//!
//! The effective level is determined by, in priority order:
//!
//! 1. the `RUST_LOG` environment variable, when set
//! 2. `--quiet` (errors only) or `-v`/`-vv` (debug/trace)
//! 3. the default, info

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialise the global logger from the CLI verbosity flags. Call once,
/// before the first log statement.
pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();
    if env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }
    builder.format(|buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        writeln!(buf, "{style}{level:<5}{style:#} {}", record.args())
    });
    builder.init();
}

fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determine_level() {
        assert_eq!(determine_level(0, false), LevelFilter::Info);
        assert_eq!(determine_level(1, false), LevelFilter::Debug);
        assert_eq!(determine_level(2, false), LevelFilter::Trace);
        assert_eq!(determine_level(5, false), LevelFilter::Trace);
    }

    #[test]
    fn test_quiet_overrides_verbose() {
        assert_eq!(determine_level(0, true), LevelFilter::Error);
        assert_eq!(determine_level(2, true), LevelFilter::Error);
    }
}
