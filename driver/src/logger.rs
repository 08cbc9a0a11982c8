//! Logger setup for the command line.
use env_logger::Builder;
use log::{LevelFilter, trace};
use std::io::Write;

/// Configures the log with the specified verbosity. Output goes to stderr so
/// that stdout only carries tool output and diagnostics.
pub fn configure(verbosity: u8) {
    let log_level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log_level)
        .target(env_logger::Target::Stderr)
        .init();

    trace!("Logger verbosity {log_level}");
}
