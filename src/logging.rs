//! Log output for the command line tools
//!
//! Library code only talks to the `log` facade; binaries call
//! [`init_logging`] once at startup. Records go to stderr so that stdout stays
//! reserved for results.

use std::io::Write;

use env_logger::{Builder, Target};
use log::LevelFilter;

/// Map a repeated `-v` flag onto a level filter
pub fn level_from_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the global logger.
///
/// `level` wins when given; otherwise `RUST_LOG` is parsed as a single
/// level, and failing that `warn` is used. Calling this twice is harmless.
pub fn init_logging(level: Option<LevelFilter>) {
    let log_level = level
        .or_else(|| {
            std::env::var("RUST_LOG")
                .ok()
                .and_then(|v| v.parse::<LevelFilter>().ok())
        })
        .unwrap_or(LevelFilter::Warn);

    let _ = Builder::new()
        .filter_level(log_level)
        .target(Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:5} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();
}
