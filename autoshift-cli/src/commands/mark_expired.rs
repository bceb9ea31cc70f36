use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use autoshift_core::DateNormalizer;
use autoshift_lib::{RepositoryClient, Settings, SweepOptions, mark_expired, parse_target_codes};

use crate::cli_types::MarkExpiredArgs;
use crate::commands::{github_client, settings_with};
use crate::error::CliError;

/// Run the mark-expired command.
pub(crate) fn run_mark_expired(args: MarkExpiredArgs) -> Result<(), CliError> {
    let targets = parse_target_codes(&args.codes)?;
    let explicit = args
        .expires
        .as_deref()
        .map(|raw| parse_timestamp(raw, Utc::now()))
        .transpose()?;

    let settings = settings_with(args.file, args.github);
    let mut options = SweepOptions::new(explicit.unwrap_or_else(Utc::now));
    options.targets = targets;
    options.explicit_expires = explicit.is_some();
    options.dry_run = args.dry_run;

    let publisher = if args.dry_run {
        None
    } else {
        github_client(&settings)?
    };
    let publisher = publisher.as_ref().map(|c| c as &dyn RepositoryClient);

    sweep_file(&settings, &options, publisher)
}

/// Sweep the record file and report the result. A failed upload is logged
/// and does not fail the command, since the local file is already written.
fn sweep_file(
    settings: &Settings,
    options: &SweepOptions,
    publisher: Option<&dyn RepositoryClient>,
) -> Result<(), CliError> {
    let summary = mark_expired(&settings.file, options, publisher)?;
    for line in summary.report.lines() {
        log::info!("{line}");
    }

    if summary.written {
        log::info!(
            "{} Updated {}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            settings.file.display().if_supports_color(Stdout, |t| t.cyan())
        );
    } else if !options.dry_run {
        log::info!("No changes; {} left as is", settings.file.display());
    }

    match summary.publish {
        Some(Ok(outcome)) => log::info!("Uploaded {} ({outcome})", settings.file_name()),
        Some(Err(_)) => log::error!(
            "{} Upload of {} failed, see above",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            settings.file_name()
        ),
        None => {}
    }
    Ok(())
}

/// Parse `--expires`. Anything the date normalizer accepts is allowed; a
/// value without a timezone is read as US Central time.
fn parse_timestamp(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, CliError> {
    DateNormalizer::central(now)
        .normalize(raw, None)
        .ok()
        .flatten()
        .ok_or_else(|| CliError::invalid_timestamp(raw))
}
