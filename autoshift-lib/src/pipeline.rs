//! One scrape pass and one expiry sweep, end to end.
//!
//! The record set is read once, threaded through normalize, merge and
//! publish as a value, and written back. A source that fails to fetch or
//! parse is logged and skipped; only an unreadable existing file or an
//! unwritable output file stops a run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use autoshift_core::{DateNormalizer, ShiftCodeFile};
use autoshift_sources::{Fetcher, SourceConfig, SourceError, extract};
use chrono::{DateTime, Utc};
use scraper::Html;

use crate::error::{PublishError, StoreError};
use crate::merge::{MergeStats, merge};
use crate::normalize::RecordNormalizer;
use crate::publish::{PublishOutcome, RepositoryClient};
use crate::store;
use crate::sweep::{SweepOptions, SweepReport, sweep};

/// Options for one scrape pass.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Record file to merge into and write.
    pub file: PathBuf,
    /// Restrict the run to these source ids. Empty means all.
    pub only: Vec<String>,
    /// Scrape and merge, but neither write nor publish.
    pub dry_run: bool,
    /// Permalink stamped on records and metadata. Empty leaves it unset.
    pub permalink: String,
    /// "Now" for the date normalizer.
    pub reference: DateTime<Utc>,
}

impl RunOptions {
    pub fn new(file: PathBuf) -> Self {
        Self {
            file,
            only: Vec::new(),
            dry_run: false,
            permalink: String::new(),
            reference: Utc::now(),
        }
    }
}

/// Progress events emitted during a run, consumed by the CLI.
#[derive(Debug, Clone)]
pub enum RunEvent {
    SourceStarted { id: String, url: String },
    SourceFinished { id: String, accepted: usize },
    /// Left to the consumer to log at `level`, so it can clear progress
    /// output first.
    SourceFailed {
        id: String,
        reason: String,
        level: log::Level,
    },
    Publishing { target: String },
}

/// Outcome for a single source.
#[derive(Debug, Clone, Default)]
pub struct SourceReport {
    pub id: String,
    pub candidates: usize,
    pub accepted: usize,
    /// Rejection counts by reason tag.
    pub rejected: BTreeMap<&'static str, usize>,
    pub error: Option<String>,
}

impl SourceReport {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// Result of [`run_once`].
#[derive(Debug)]
pub struct RunSummary {
    pub sources: Vec<SourceReport>,
    pub merge: MergeStats,
    pub total_codes: usize,
    pub written: bool,
    pub publish: Option<Result<PublishOutcome, PublishError>>,
}

/// Scrape every selected source, merge into the record file, write it and
/// optionally publish it.
pub fn run_once(
    sources: &[SourceConfig],
    options: &RunOptions,
    fetcher: &dyn Fetcher,
    publisher: Option<&dyn RepositoryClient>,
    on_event: &dyn Fn(RunEvent),
) -> Result<RunSummary, StoreError> {
    let existing = store::load_or_default(&options.file)?;
    let mut normalizer = RecordNormalizer::new(DateNormalizer::central(options.reference));

    for id in &options.only {
        if !sources.iter().any(|s| &s.id == id) {
            log::warn!("Unknown source id '{id}', ignoring");
        }
    }
    let selected: Vec<&SourceConfig> = sources
        .iter()
        .filter(|s| options.only.is_empty() || options.only.contains(&s.id))
        .collect();

    let mut batch = Vec::new();
    let mut reports = Vec::new();
    for source in &selected {
        on_event(RunEvent::SourceStarted {
            id: source.id.clone(),
            url: source.url.clone(),
        });
        let mut report = SourceReport {
            id: source.id.clone(),
            ..Default::default()
        };

        match scrape_source(source, fetcher) {
            Ok(candidates) => {
                report.candidates = candidates.len();
                for candidate in &candidates {
                    match normalizer.normalize(candidate) {
                        Ok(mut record) => {
                            if !options.permalink.is_empty() {
                                record.permalink = options.permalink.clone();
                            }
                            batch.push(record);
                            report.accepted += 1;
                        }
                        Err(rejection) => {
                            log::debug!("{}: rejected {rejection}", source.id);
                            *report.rejected.entry(rejection.reason()).or_default() += 1;
                        }
                    }
                }
                log::debug!(
                    "{}: {} candidate(s), {} accepted, {} rejected",
                    source.id,
                    report.candidates,
                    report.accepted,
                    report.rejected_total()
                );
                on_event(RunEvent::SourceFinished {
                    id: source.id.clone(),
                    accepted: report.accepted,
                });
            }
            Err(e) => {
                let level = match &e {
                    SourceError::Config { .. } => log::Level::Error,
                    _ => log::Level::Warn,
                };
                log::debug!("{}: {e:?}", source.id);
                report.error = Some(e.to_string());
                on_event(RunEvent::SourceFailed {
                    id: source.id.clone(),
                    reason: e.to_string(),
                    level,
                });
            }
        }
        reports.push(report);
    }

    let ShiftCodeFile { mut meta, codes } = existing;
    let (codes, merge_stats) = merge(codes, batch);

    let attribution = attribution(&selected);
    if !attribution.is_empty() && meta.attribution.is_empty() {
        meta.attribution = attribution;
    }
    if !options.permalink.is_empty() && meta.permalink != options.permalink {
        meta.permalink = options.permalink.clone();
    }
    if merge_stats.changed() || meta.generated.is_none() {
        meta.generated = Some(options.reference);
    }
    let file = ShiftCodeFile { meta, codes };

    let mut summary = RunSummary {
        sources: reports,
        merge: merge_stats,
        total_codes: file.codes.len(),
        written: false,
        publish: None,
    };
    if options.dry_run {
        log::info!("Dry run: not writing {}", options.file.display());
        return Ok(summary);
    }

    store::save(&options.file, &file)?;
    summary.written = true;

    if let Some(publisher) = publisher {
        let message = format!(
            "Update {} via autoshift scrape ({} added, {} updated)",
            file_name(&options.file),
            merge_stats.added,
            merge_stats.updated
        );
        on_event(RunEvent::Publishing {
            target: publisher.describe(),
        });
        summary.publish = Some(publish_file(publisher, &options.file, &file, &message));
    }
    Ok(summary)
}

fn scrape_source(
    source: &SourceConfig,
    fetcher: &dyn Fetcher,
) -> Result<Vec<autoshift_sources::RawCandidate>, SourceError> {
    let body = fetcher
        .fetch(&source.url)
        .map_err(|e| SourceError::fetch(&source.id, e))?;
    let doc = Html::parse_document(&body);
    let candidates = extract(&doc, source)?.collect();
    Ok(candidates)
}

/// "Data provided by a and b", from the attribution of each source used.
fn attribution(sources: &[&SourceConfig]) -> String {
    let mut credits: Vec<&str> = Vec::new();
    for credit in sources.iter().filter_map(|s| s.attribution.as_deref()) {
        if !credits.contains(&credit) {
            credits.push(credit);
        }
    }
    if credits.is_empty() {
        String::new()
    } else {
        format!("Data provided by {}", credits.join(" and "))
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "shiftcodes.json".to_string())
}

fn publish_file(
    publisher: &dyn RepositoryClient,
    path: &std::path::Path,
    file: &ShiftCodeFile,
    message: &str,
) -> Result<PublishOutcome, PublishError> {
    let result = store::to_json(file)
        .map_err(PublishError::from)
        .and_then(|content| publisher.publish(&file_name(path), &content, message));
    match &result {
        Ok(outcome) => log::info!(
            "{} {} in {}",
            file_name(path),
            outcome,
            publisher.describe()
        ),
        Err(e) => log::error!("{e}"),
    }
    result
}

/// Result of [`mark_expired`].
#[derive(Debug)]
pub struct MarkExpiredSummary {
    pub report: SweepReport,
    pub written: bool,
    pub publish: Option<Result<PublishOutcome, PublishError>>,
}

/// Load the record file, sweep it, and write and publish it when anything
/// changed. A missing file is an error here.
pub fn mark_expired(
    path: &std::path::Path,
    options: &SweepOptions,
    publisher: Option<&dyn RepositoryClient>,
) -> Result<MarkExpiredSummary, StoreError> {
    let mut file = store::load(path)?;
    let report = sweep(&mut file.codes, options);

    let mut summary = MarkExpiredSummary {
        report,
        written: false,
        publish: None,
    };
    if !summary.report.changed() {
        return Ok(summary);
    }

    store::save(path, &file)?;
    summary.written = true;
    if let Some(publisher) = publisher {
        let message = summary.report.commit_message();
        summary.publish = Some(publish_file(publisher, path, &file, &message));
    }
    Ok(summary)
}
