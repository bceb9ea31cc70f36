use std::time::Duration;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use autoshift_lib::{
    PublishOutcome, RepositoryClient, RunEvent, RunOptions, RunSummary, SettingsOverrides,
    SourceReport, run_once,
};
use autoshift_sources::{HttpFetcher, resolve_sources};

use crate::cli_types::ScrapeArgs;
use crate::commands::{github_client, settings_with};
use crate::error::CliError;
use crate::spinner::Spinner;

/// Run the scrape command, once or every `--schedule` minutes.
pub(crate) fn run_scrape(args: ScrapeArgs, quiet: bool) -> Result<(), CliError> {
    let settings = settings_with(args.file, args.github).with_overrides(SettingsOverrides {
        schedule: args.schedule,
        sources_dir: args.sources_dir,
        ..Default::default()
    });

    let sources = resolve_sources(settings.sources_dir.as_deref())?;
    let fetcher = HttpFetcher::new()?.with_retries(settings.retries);
    let publisher = if args.dry_run {
        None
    } else {
        github_client(&settings)?
    };
    let publisher = publisher.as_ref().map(|c| c as &dyn RepositoryClient);
    let schedule = settings.schedule.filter(|minutes| *minutes > 0);

    loop {
        let mut options = RunOptions::new(settings.file.clone());
        options.only = args.only.clone();
        options.dry_run = args.dry_run;
        options.permalink = settings.permalink();

        let spinner = Spinner::new(quiet);
        let on_event = |event: RunEvent| match event {
            RunEvent::SourceStarted { id, url } => {
                spinner.set_message(format!("Fetching {id} ({url})..."));
            }
            RunEvent::SourceFinished { id, accepted } => {
                spinner.suspend(|| log::debug!("{id}: {accepted} code(s) accepted"));
            }
            RunEvent::SourceFailed { reason, level, .. } => {
                spinner.suspend(|| log::log!(level, "{reason}"));
            }
            RunEvent::Publishing { target } => {
                spinner.set_message(format!("Publishing to {target}..."));
            }
        };
        let result = run_once(&sources, &options, &fetcher, publisher, &on_event);
        spinner.finish();

        // A failed upload is only logged; the local file is already written.
        match result {
            Ok(summary) => print_summary(&summary, &options),
            Err(e) if schedule.is_some() => log::error!("{e}"),
            Err(e) => return Err(e.into()),
        }

        let Some(minutes) = schedule else {
            return Ok(());
        };
        log::info!("Next run in {minutes} minute(s)");
        std::thread::sleep(Duration::from_secs(minutes * 60));
    }
}

fn print_summary(summary: &RunSummary, options: &RunOptions) {
    log::info!("");
    for report in &summary.sources {
        print_source(report);
    }
    log::info!("");

    let stats = &summary.merge;
    log::info!(
        "{} added, {} updated, {} collapsed, {} code(s) in total",
        stats.added.if_supports_color(Stdout, |t| t.bold()),
        stats.updated.if_supports_color(Stdout, |t| t.bold()),
        stats.collapsed,
        summary.total_codes,
    );
    if summary.written {
        log::info!(
            "Wrote {}",
            options.file.display().if_supports_color(Stdout, |t| t.cyan())
        );
    } else if options.dry_run {
        log::info!(
            "{}",
            "Dry run: nothing written or published".if_supports_color(Stdout, |t| t.dimmed())
        );
    }

    match &summary.publish {
        Some(Ok(PublishOutcome::Unchanged)) => log::info!("Remote copy already up to date"),
        Some(Ok(outcome)) => log::info!(
            "{} Published ({})",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            outcome
        ),
        Some(Err(_)) => log::error!(
            "{} Upload failed, see above",
            "\u{2718}".if_supports_color(Stdout, |t| t.red())
        ),
        None => {}
    }
}

fn print_source(report: &SourceReport) {
    if let Some(error) = &report.error {
        log::info!(
            "  {} {:<16} {}",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            report.id,
            error.if_supports_color(Stdout, |t| t.dimmed()),
        );
        return;
    }

    let rejected = if report.rejected.is_empty() {
        String::new()
    } else {
        let parts: Vec<String> = report
            .rejected
            .iter()
            .map(|(reason, count)| format!("{reason}: {count}"))
            .collect();
        format!(" ({})", parts.join(", "))
    };
    log::info!(
        "  {} {:<16} {} candidate(s), {} accepted, {} rejected{}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        report.id,
        report.candidates,
        report.accepted,
        report.rejected_total(),
        rejected,
    );
}
