use anyhow::Result;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::Write;

/// Initialize logging on stderr.
///
/// The wrapped tool owns the terminal, so without `verbose` only the
/// wrapper's own warnings and errors are shown, never the child's outcome.
pub fn init(verbose: bool) -> Result<()> {
    Builder::new()
        .filter_level(level_for(verbose))
        .target(Target::Stderr)
        .format(format_log)
        .try_init()?;

    Ok(())
}

fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Coloured, fixed-width level tag.
fn level_label(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "\x1b[31mERROR\x1b[0m",
        log::Level::Warn => "\x1b[33mWARN \x1b[0m",
        log::Level::Info => "\x1b[32mINFO \x1b[0m",
        log::Level::Debug => "\x1b[36mDEBUG\x1b[0m",
        log::Level::Trace => "\x1b[35mTRACE\x1b[0m",
    }
}

/// `tfwrap::common::config` -> `config`
fn short_target(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

fn format_log(buf: &mut env_logger::fmt::Formatter, record: &log::Record) -> std::io::Result<()> {
    writeln!(
        buf,
        "{} {} [{:>8}] {}",
        chrono::Local::now().format("%H:%M:%S"),
        level_label(record.level()),
        short_target(record.target()),
        record.args()
    )
}
