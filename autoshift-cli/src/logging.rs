//! Logger setup: `time [LEVEL] message` on stderr, optionally teed to a file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use env_logger::{Builder, Env};
use log::{Level, LevelFilter};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

use crate::error::CliError;

/// Crates whose messages follow `-v`/`-q`. Everything else is held at warn.
const OWN_CRATES: &[&str] = &["autoshift", "autoshift_core", "autoshift_sources", "autoshift_lib"];

pub(crate) fn level_for(verbose: bool, quiet: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    }
}

/// Install the global logger. `RUST_LOG` directives are applied last.
pub(crate) fn init(verbose: bool, quiet: bool, logfile: Option<&Path>) -> Result<(), CliError> {
    let level = level_for(verbose, quiet);
    let tee = logfile.map(open_logfile).transpose()?.map(Mutex::new);

    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Warn);
    for name in OWN_CRATES {
        builder.filter_module(name, level);
    }
    builder.parse_env(Env::default());

    builder.format(move |buf, record| {
        let line = format_line(
            &chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            record.level(),
            record.module_path(),
            record.line(),
            &record.args().to_string(),
        );
        if let Some(file) = &tee {
            if let Ok(mut file) = file.lock() {
                let _ = file.write_all(&strip_ansi_escapes::strip(&line));
                let _ = file.write_all(b"\n");
            }
        }
        writeln!(buf, "{line}")
    });

    builder
        .try_init()
        .map_err(|e| CliError::logging(e.to_string()))
}

fn open_logfile(path: &Path) -> Result<File, CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| CliError::logging(format!("{}: {e}", parent.display())))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CliError::logging(format!("{}: {e}", path.display())))
}

fn format_line(
    time: &str,
    level: Level,
    module: Option<&str>,
    line: Option<u32>,
    message: &str,
) -> String {
    let label = format!("{:<5}", level);
    let label = match level {
        Level::Error => label.if_supports_color(Stderr, |t| t.red()).to_string(),
        Level::Warn => label.if_supports_color(Stderr, |t| t.yellow()).to_string(),
        Level::Info => label.if_supports_color(Stderr, |t| t.green()).to_string(),
        Level::Debug => label.if_supports_color(Stderr, |t| t.blue()).to_string(),
        Level::Trace => label.if_supports_color(Stderr, |t| t.dimmed()).to_string(),
    };
    if level >= Level::Debug {
        format!(
            "{time} [{label}] {}:{} - {message}",
            module.unwrap_or("?"),
            line.unwrap_or(0)
        )
    } else {
        format!("{time} [{label}] {message}")
    }
}
