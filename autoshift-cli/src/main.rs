//! autoshift CLI
//!
//! Scrapes SHiFT codes from the configured sites into a JSON file, sweeps
//! expired codes, and publishes the file to GitHub.

mod cli_types;
mod commands;
mod error;
mod logging;
mod spinner;

use std::ffi::OsString;
use std::process::ExitCode;

use clap::Parser;

use cli_types::{Cli, Commands, ConfigAction, ScrapeArgs};

/// Extra arguments read from the environment, e.g. in containers.
const ENV_PARSER_ARGS: &str = "PARSER_ARGS";

/// Global options that consume the following token as their value.
const GLOBAL_VALUE_FLAGS: &[&str] = &["--logfile"];

fn main() -> ExitCode {
    let extra = std::env::var(ENV_PARSER_ARGS).ok();
    let cli = Cli::parse_from(splice_parser_args(
        std::env::args_os().collect(),
        extra.as_deref(),
    ));

    if let Err(e) = logging::init(cli.verbose, cli.quiet, cli.logfile.as_deref()) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command.unwrap_or_else(|| Commands::Scrape(ScrapeArgs::default())) {
        Commands::Scrape(args) => commands::scrape::run_scrape(args, cli.quiet),
        Commands::MarkExpired(args) => commands::mark_expired::run_mark_expired(args),
        Commands::Sources { sources_dir } => commands::sources::run_sources(sources_dir),
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => commands::config::run_config_show(),
                ConfigAction::Path => commands::config::run_config_path(),
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Insert the whitespace-separated `extra` arguments ahead of the explicit
/// ones, so explicit flags override them.
///
/// When the command line names a subcommand, `extra` goes right after it.
/// Otherwise `extra` is placed after the program name; if it starts with a
/// flag, `scrape` is assumed.
fn splice_parser_args(args: Vec<OsString>, extra: Option<&str>) -> Vec<OsString> {
    let extra: Vec<OsString> = extra
        .unwrap_or_default()
        .split_whitespace()
        .map(OsString::from)
        .collect();
    if extra.is_empty() || args.is_empty() {
        return args;
    }

    let mut out = Vec::with_capacity(args.len() + extra.len() + 1);
    match subcommand_index(&args) {
        Some(index) => {
            out.extend_from_slice(&args[..=index]);
            out.extend(extra);
            out.extend_from_slice(&args[index + 1..]);
        }
        None => {
            out.push(args[0].clone());
            if extra[0].to_string_lossy().starts_with('-') {
                out.push(OsString::from("scrape"));
            }
            out.extend(extra);
            out.extend_from_slice(&args[1..]);
        }
    }
    out
}

/// Position of the first non-flag argument, skipping values of global options.
fn subcommand_index(args: &[OsString]) -> Option<usize> {
    let mut skip_value = false;
    for (i, arg) in args.iter().enumerate().skip(1) {
        let arg = arg.to_string_lossy();
        if skip_value {
            skip_value = false;
            continue;
        }
        if GLOBAL_VALUE_FLAGS.contains(&arg.as_ref()) {
            skip_value = true;
            continue;
        }
        if !arg.starts_with('-') {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn no_extra_args_is_a_no_op() {
        let args = os(&["autoshift", "scrape", "-n"]);
        assert_eq!(splice_parser_args(args.clone(), None), args);
        assert_eq!(splice_parser_args(args.clone(), Some("   ")), args);
    }

    #[test]
    fn extra_args_follow_the_subcommand() {
        let spliced = splice_parser_args(
            os(&["autoshift", "--logfile", "run.log", "scrape", "--schedule", "5"]),
            Some("--schedule 120 --user octo"),
        );
        assert_eq!(
            strings(spliced),
            [
                "autoshift", "--logfile", "run.log", "scrape", "--schedule", "120", "--user",
                "octo", "--schedule", "5"
            ]
        );
    }

    #[test]
    fn bare_flags_imply_scrape() {
        let spliced = splice_parser_args(os(&["autoshift", "-v"]), Some("--schedule 60"));
        assert_eq!(strings(spliced), ["autoshift", "scrape", "--schedule", "60", "-v"]);
    }

    #[test]
    fn extra_args_may_name_the_subcommand() {
        let spliced = splice_parser_args(os(&["autoshift"]), Some("mark-expired --dry-run"));
        assert_eq!(strings(spliced), ["autoshift", "mark-expired", "--dry-run"]);
    }

    #[test]
    fn explicit_flags_override_environment_ones() {
        let cli = Cli::try_parse_from(splice_parser_args(
            os(&["autoshift", "scrape", "--schedule", "5"]),
            Some("--schedule 120 --only polygon-bl4"),
        ))
        .unwrap();
        let Some(Commands::Scrape(args)) = cli.command else {
            panic!("expected scrape");
        };
        assert_eq!(args.schedule, Some(5));
        assert_eq!(args.only, ["polygon-bl4"]);
    }

    #[test]
    fn parses_mark_expired_codes() {
        let cli = Cli::try_parse_from(os(&[
            "autoshift",
            "mark-expired",
            "AAAAA-BBBBB-CCCCC-DDDDD-EEEEE,",
            "FFFFF-GGGGG-HHHHH-JJJJJ-KKKKK",
            "--expires",
            "2025-09-30",
            "-n",
        ]))
        .unwrap();
        let Some(Commands::MarkExpired(args)) = cli.command else {
            panic!("expected mark-expired");
        };
        assert_eq!(args.codes.len(), 2);
        assert_eq!(args.expires.as_deref(), Some("2025-09-30"));
        assert!(args.dry_run);
    }

    #[test]
    fn subcommand_is_optional() {
        let cli = Cli::try_parse_from(os(&["autoshift", "-q"])).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.quiet);
    }
}
