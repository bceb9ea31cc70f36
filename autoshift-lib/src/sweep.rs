//! Expiry sweeping over the persisted set.
//!
//! Without target codes every record whose expiry has passed is flagged
//! expired. With target codes only those records are touched: their
//! `expires` is stamped, and `expired` is forced unless an explicit expiry
//! was supplied.

use std::collections::BTreeSet;

use autoshift_core::{DateNormalizer, Expiry, Game, ShiftCodeRecord, format_central, to_iso};
use chrono::{DateTime, Utc};

/// Bad positional code arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetCodeError {
    #[error("When passing multiple codes, separate them with commas, e.g. CODE1, CODE2, CODE3")]
    MissingCommas,
    #[error("Invalid code token with spaces. Separate multiple codes with commas, e.g. CODE1, CODE2")]
    SpaceInCode,
}

/// Parse positional code arguments.
///
/// Multiple codes must be comma-separated (`"CODE1, CODE2"` or
/// `CODE1, CODE2` split by the shell). Empty input means bulk mode.
pub fn parse_target_codes(args: &[String]) -> Result<Vec<String>, TargetCodeError> {
    if args.is_empty() {
        return Ok(Vec::new());
    }
    let raw = args.join(" ");
    if args.len() > 1 && !raw.contains(',') {
        return Err(TargetCodeError::MissingCommas);
    }
    let mut codes = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if part.contains(char::is_whitespace) {
            return Err(TargetCodeError::SpaceInCode);
        }
        codes.push(part.to_uppercase());
    }
    Ok(codes)
}

/// Inputs of one sweep.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Comparison instant in bulk mode, stamp in targeted mode.
    pub reference: DateTime<Utc>,
    /// Codes to act on. Empty selects bulk mode.
    pub targets: Vec<String>,
    /// The reference came from an explicit `--expires`: targeted mode then
    /// only overwrites `expires`.
    pub explicit_expires: bool,
    /// Decide and report, but leave the records untouched.
    pub dry_run: bool,
}

impl SweepOptions {
    pub fn new(reference: DateTime<Utc>) -> Self {
        Self {
            reference,
            targets: Vec::new(),
            explicit_expires: false,
            dry_run: false,
        }
    }

    pub fn is_targeted(&self) -> bool {
        !self.targets.is_empty()
    }
}

/// Whether a record gets (or would get) `expired = true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Yes,
    No,
    NotApplicable,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "YES"),
            Self::No => write!(f, "NO"),
            Self::NotApplicable => write!(f, "NA"),
        }
    }
}

/// How a record's stored expiry resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredExpiry {
    Unknown,
    Unparsable(String),
    At(DateTime<Utc>),
}

impl StoredExpiry {
    fn resolve(record: &ShiftCodeRecord, dates: &DateNormalizer) -> Self {
        match &record.expires {
            Expiry::Unknown => Self::Unknown,
            Expiry::At(instant) => Self::At(*instant),
            Expiry::Unparsed(raw) => match dates.normalize(raw, record.archived) {
                Ok(Some(instant)) => Self::At(instant),
                Ok(None) => Self::Unknown,
                Err(_) => Self::Unparsable(raw.clone()),
            },
        }
    }

    /// Text shown in reports.
    pub fn display(&self) -> String {
        match self {
            Self::Unknown => "Unknown".to_string(),
            Self::Unparsable(_) => "Not Found".to_string(),
            Self::At(instant) => format_central(*instant),
        }
    }
}

/// Decision for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepEntry {
    pub code: String,
    pub game: Game,
    pub stored: StoredExpiry,
    pub verdict: Verdict,
    pub expired_before: bool,
    pub expired_after: bool,
    /// New `expires` value, when the sweep stamps one.
    pub new_expires: Option<DateTime<Utc>>,
}

/// Counters for the summary block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub set_expired: usize,
    pub set_expires: usize,
    pub skipped_unknown: usize,
    pub unparsable: usize,
    pub updated_expires_only: usize,
}

/// Full result of a sweep, applied or not.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub reference: DateTime<Utc>,
    pub targets: Vec<String>,
    pub explicit_expires: bool,
    pub dry_run: bool,
    pub entries: Vec<SweepEntry>,
    pub stats: SweepStats,
    /// Target codes that matched nothing.
    pub unmatched: Vec<String>,
    /// Records that were (or would be) modified.
    pub modified: usize,
}

impl SweepReport {
    pub fn is_targeted(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Whether the sweep altered the set. Always false on dry runs.
    pub fn changed(&self) -> bool {
        !self.dry_run && self.modified > 0
    }

    pub fn commit_message(&self) -> String {
        let codes = self.targets.join(", ");
        if !self.is_targeted() {
            format!(
                "Sweep expired by timestamp via autoshift mark-expired ({})",
                to_iso(self.reference)
            )
        } else if self.explicit_expires {
            format!("Targeted overwrite 'expires' via autoshift mark-expired for: {codes}")
        } else {
            format!("Targeted mark expired via autoshift mark-expired for: {codes}")
        }
    }

    /// Report text, one entry per line, separators sized to the longest line.
    pub fn lines(&self) -> Vec<String> {
        let stamp = format!("{} | {}", to_iso(self.reference), format_central(self.reference));

        let mut header = Vec::new();
        if self.dry_run {
            header.push("DRY-RUN:".to_string());
        }
        header.push(format!("Date & Time (ISO): {stamp}"));

        let blocks: Vec<[String; 4]> = self
            .entries
            .iter()
            .map(|entry| {
                let expires = match (entry.new_expires, self.explicit_expires) {
                    (None, _) => entry.stored.display(),
                    (Some(new), true) => format!("{} -> {}", entry.stored.display(), format_central(new)),
                    (Some(_), false) => format!("{} -> {stamp}", entry.stored.display()),
                };
                let expired = if entry.expired_before == entry.expired_after {
                    entry.expired_after.to_string()
                } else {
                    format!("{} -> {}", entry.expired_before, entry.expired_after)
                };
                [
                    format!("Code: {}", entry.code),
                    format!("Expires: {expires}"),
                    format!("Will Set Expired: {}", entry.verdict),
                    format!("Expired: {expired}"),
                ]
            })
            .collect();

        let mut summary = vec![
            format!("Scanned: {}", self.stats.scanned),
            format!("Set expired: {}", self.stats.set_expired),
            format!("Set expires field: {}", self.stats.set_expires),
            format!(
                "Skipped (expires missing/empty or 'Unknown'): {}",
                self.stats.skipped_unknown
            ),
            format!(
                "Unparsable (invalid 'expires' timestamp): {}",
                self.stats.unparsable
            ),
        ];
        if self.stats.updated_expires_only > 0 {
            summary.push(format!(
                "Updated expires only: {}",
                self.stats.updated_expires_only
            ));
        }

        let notes = [
            "Notes:",
            "- 'Skipped' looks only at the 'expires' field (missing, empty, or 'Unknown').",
            "- 'Unparsable' means the 'expires' field could not be parsed as an ISO or common date format.",
        ];
        let unmatched: Vec<String> = self
            .unmatched
            .iter()
            .map(|code| format!("No matches found for {code}"))
            .collect();

        let longest = header
            .iter()
            .chain(blocks.iter().flatten())
            .chain(&summary)
            .chain(&unmatched)
            .map(|line| line.chars().count())
            .chain(
                notes
                    .iter()
                    .filter(|_| self.dry_run)
                    .map(|line| line.chars().count()),
            )
            .max()
            .unwrap_or(0);
        let separator = "-".repeat(longest.max(8));

        let mut out = header;
        out.push(separator.clone());
        for (i, block) in blocks.iter().enumerate() {
            out.extend(block.iter().cloned());
            if i + 1 < blocks.len() {
                out.push(separator.clone());
            }
        }
        if !blocks.is_empty() {
            out.push(separator.clone());
        }
        out.extend(summary);
        if self.dry_run {
            out.push(separator.clone());
            out.extend(notes.iter().map(|s| s.to_string()));
        }
        if !unmatched.is_empty() {
            out.push(separator);
            out.extend(unmatched);
        }
        out
    }
}

/// Run the sweep over `records`, mutating them unless `dry_run` is set.
pub fn sweep(records: &mut [ShiftCodeRecord], options: &SweepOptions) -> SweepReport {
    let dates = DateNormalizer::central(options.reference);
    let mut stats = SweepStats::default();
    let mut entries = Vec::new();
    let mut modified = 0;

    let targets: BTreeSet<String> = options.targets.iter().map(|c| c.to_uppercase()).collect();
    let mut unmatched = targets.clone();

    for record in records.iter_mut() {
        let code = record.code.trim().to_uppercase();
        if options.is_targeted() && !targets.contains(&code) {
            continue;
        }
        unmatched.remove(&code);
        stats.scanned += 1;

        let stored = StoredExpiry::resolve(record, &dates);
        match &stored {
            StoredExpiry::Unknown => stats.skipped_unknown += 1,
            StoredExpiry::Unparsable(_) => stats.unparsable += 1,
            StoredExpiry::At(_) => {}
        }

        let expired_before = record.expired;
        let (verdict, expired_after, new_expires) = if !options.is_targeted() {
            match &stored {
                StoredExpiry::At(instant) if *instant < options.reference => {
                    if !record.expired {
                        stats.set_expired += 1;
                    }
                    (Verdict::Yes, true, None)
                }
                StoredExpiry::At(_) => (Verdict::No, record.expired, None),
                _ => (Verdict::NotApplicable, record.expired, None),
            }
        } else if options.explicit_expires {
            stats.set_expires += 1;
            if !options.dry_run && record.expires != Expiry::At(options.reference) {
                stats.updated_expires_only += 1;
            }
            (Verdict::NotApplicable, record.expired, Some(options.reference))
        } else {
            stats.set_expires += 1;
            if !record.expired {
                stats.set_expired += 1;
            }
            (Verdict::Yes, true, Some(options.reference))
        };

        let would_change = expired_after != expired_before
            || new_expires.is_some_and(|t| record.expires != Expiry::At(t));
        if would_change {
            modified += 1;
            if !options.dry_run {
                record.expired = expired_after;
                if let Some(t) = new_expires {
                    record.expires = Expiry::At(t);
                }
            }
        }

        entries.push(SweepEntry {
            code,
            game: record.game,
            stored,
            verdict,
            expired_before,
            expired_after,
            new_expires,
        });
    }

    if !unmatched.is_empty() {
        log::warn!(
            "No matches found for {}",
            unmatched.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    SweepReport {
        reference: options.reference,
        targets: options.targets.clone(),
        explicit_expires: options.explicit_expires,
        dry_run: options.dry_run,
        entries,
        stats,
        unmatched: unmatched.into_iter().collect(),
        modified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn target_codes_require_commas() {
        assert_eq!(parse_target_codes(&[]).unwrap(), Vec::<String>::new());
        assert_eq!(parse_target_codes(&strings(&["abc"])).unwrap(), vec!["ABC"]);
        assert_eq!(
            parse_target_codes(&strings(&["AAA,", "BBB,", "CCC"])).unwrap(),
            vec!["AAA", "BBB", "CCC"]
        );
        assert_eq!(
            parse_target_codes(&strings(&["AAA, BBB"])).unwrap(),
            vec!["AAA", "BBB"]
        );
        assert_eq!(
            parse_target_codes(&strings(&["AAA", "BBB"])),
            Err(TargetCodeError::MissingCommas)
        );
        assert_eq!(
            parse_target_codes(&strings(&["AAA BBB, CCC"])),
            Err(TargetCodeError::SpaceInCode)
        );
    }

    #[test]
    fn bulk_flags_only_passed_expiries() {
        let mut records = vec![
            ShiftCodeRecord::new("PAST", Game::Bl4).with_expires(Expiry::At(at("2025-09-20T00:00:00Z"))),
            ShiftCodeRecord::new("FUTURE", Game::Bl4).with_expires(Expiry::At(at("2025-10-20T00:00:00Z"))),
            ShiftCodeRecord::new("UNKNOWN", Game::Bl4),
            ShiftCodeRecord::new("JUNK", Game::Bl4).with_expires(Expiry::Unparsed("soon-ish".into())),
            ShiftCodeRecord::new("LEGACY", Game::Bl4).with_expires(Expiry::Unparsed("Sep 1, 2025".into())),
        ];
        let report = sweep(&mut records, &SweepOptions::new(at("2025-10-01T00:00:00Z")));

        assert!(records[0].expired);
        assert_eq!(records[0].expires, Expiry::At(at("2025-09-20T00:00:00Z")));
        assert!(!records[1].expired);
        assert!(!records[2].expired);
        assert!(!records[3].expired);
        assert!(records[4].expired);
        assert_eq!(records[4].expires, Expiry::Unparsed("Sep 1, 2025".into()));

        assert_eq!(
            report.stats,
            SweepStats {
                scanned: 5,
                set_expired: 2,
                set_expires: 0,
                skipped_unknown: 1,
                unparsable: 1,
                updated_expires_only: 0,
            }
        );
        assert!(report.changed());
        let verdicts: Vec<_> = report.entries.iter().map(|e| e.verdict).collect();
        assert_eq!(
            verdicts,
            [Verdict::Yes, Verdict::No, Verdict::NotApplicable, Verdict::NotApplicable, Verdict::Yes]
        );
    }

    #[test]
    fn bulk_never_unsets_expired() {
        let mut records = vec![
            ShiftCodeRecord::new("FUTURE", Game::Bl3)
                .with_expires(Expiry::At(at("2030-01-01T00:00:00Z")))
                .with_expired(true),
        ];
        let report = sweep(&mut records, &SweepOptions::new(at("2025-10-01T00:00:00Z")));
        assert!(records[0].expired);
        assert!(!report.changed());
    }

    #[test]
    fn dry_run_reports_without_mutating() {
        let mut records = vec![
            ShiftCodeRecord::new("PAST", Game::Bl4).with_expires(Expiry::At(at("2025-09-20T00:00:00Z"))),
        ];
        let original = records.clone();
        let options = SweepOptions {
            dry_run: true,
            ..SweepOptions::new(at("2025-10-01T00:00:00Z"))
        };
        let report = sweep(&mut records, &options);
        assert_eq!(records, original);
        assert_eq!(report.stats.set_expired, 1);
        assert_eq!(report.modified, 1);
        assert!(!report.changed());
        let lines = report.lines();
        assert_eq!(lines[0], "DRY-RUN:");
        assert!(lines.iter().any(|l| l == "Notes:"));
    }

    #[test]
    fn targeted_without_expires_stamps_and_expires() {
        let reference = at("2025-09-28T07:11:00Z");
        let mut records = vec![
            ShiftCodeRecord::new("AAAAA", Game::Bl4),
            ShiftCodeRecord::new("AAAAA", Game::Bl3),
            ShiftCodeRecord::new("BBBBB", Game::Bl4),
        ];
        let options = SweepOptions {
            targets: vec!["aaaaa".into(), "ZZZZZ".into()],
            ..SweepOptions::new(reference)
        };
        let report = sweep(&mut records, &options);

        for record in &records[..2] {
            assert!(record.expired);
            assert_eq!(record.expires, Expiry::At(reference));
        }
        assert!(!records[2].expired);
        assert_eq!(records[2].expires, Expiry::Unknown);
        assert_eq!(report.stats.scanned, 2);
        assert_eq!(report.stats.set_expired, 2);
        assert_eq!(report.stats.set_expires, 2);
        assert_eq!(report.unmatched, vec!["ZZZZZ"]);
        assert!(report.lines().iter().any(|l| l == "No matches found for ZZZZZ"));
        assert_eq!(
            report.commit_message(),
            "Targeted mark expired via autoshift mark-expired for: aaaaa, ZZZZZ"
        );
    }

    #[test]
    fn targeted_with_explicit_expires_leaves_expired_alone() {
        let stamp = at("2025-10-05T05:00:00Z");
        let mut records = vec![ShiftCodeRecord::new("AAAAA", Game::Bl4)];
        let options = SweepOptions {
            targets: vec!["AAAAA".into()],
            explicit_expires: true,
            ..SweepOptions::new(stamp)
        };
        let report = sweep(&mut records, &options);
        assert!(!records[0].expired);
        assert_eq!(records[0].expires, Expiry::At(stamp));
        assert_eq!(report.stats.updated_expires_only, 1);
        assert_eq!(report.entries[0].verdict, Verdict::NotApplicable);
        assert!(report.changed());
    }

    #[test]
    fn report_layout() {
        let mut records = vec![
            ShiftCodeRecord::new("PAST", Game::Bl4).with_expires(Expiry::At(at("2025-09-20T05:00:00Z"))),
        ];
        let report = sweep(&mut records, &SweepOptions::new(at("2025-10-01T00:00:00Z")));
        let lines = report.lines();
        let separator = &lines[1];
        assert!(separator.chars().all(|c| c == '-'));
        assert_eq!(
            separator.len(),
            lines.iter().map(|l| l.chars().count()).max().unwrap()
        );
        assert_eq!(
            lines[0],
            "Date & Time (ISO): 2025-10-01T00:00:00Z | Sep 30, 2025, 07:00 PM UTC-05:00"
        );
        assert_eq!(lines[2], "Code: PAST");
        assert_eq!(lines[3], "Expires: Sep 20, 2025, 12:00 AM UTC-05:00");
        assert_eq!(lines[4], "Will Set Expired: YES");
        assert_eq!(lines[5], "Expired: false -> true");
        assert_eq!(lines[7], "Scanned: 1");
    }

    #[test]
    fn targeted_dry_run_shows_stored_and_new_values() {
        let mut records = vec![
            ShiftCodeRecord::new("AAAAA", Game::Bl4).with_expires(Expiry::At(at("2025-09-20T05:00:00Z"))),
        ];
        let original = records.clone();
        let options = SweepOptions {
            targets: vec!["AAAAA".into()],
            dry_run: true,
            ..SweepOptions::new(at("2025-10-05T05:00:00Z"))
        };
        let report = sweep(&mut records, &options);
        assert_eq!(records, original);

        let lines = report.lines();
        assert!(lines.iter().any(|l| l
            == "Expires: Sep 20, 2025, 12:00 AM UTC-05:00 -> 2025-10-05T05:00:00Z | Oct 05, 2025, 12:00 AM UTC-05:00"));
        assert!(lines.iter().any(|l| l == "Expired: false -> true"));
    }

    #[test]
    fn explicit_expires_matching_the_stored_value_is_not_an_update() {
        let stamp = at("2025-10-05T05:00:00Z");
        let mut records = vec![
            ShiftCodeRecord::new("AAAAA", Game::Bl4).with_expires(Expiry::At(stamp)),
            ShiftCodeRecord::new("BBBBB", Game::Bl4),
        ];
        let options = SweepOptions {
            targets: vec!["AAAAA".into(), "BBBBB".into()],
            explicit_expires: true,
            ..SweepOptions::new(stamp)
        };
        let report = sweep(&mut records, &options);
        assert_eq!(report.stats.set_expires, 2);
        assert_eq!(report.stats.updated_expires_only, 1);
        assert_eq!(report.modified, 1);

        let lines = report.lines();
        assert!(lines.iter().any(|l| l == "Updated expires only: 1"));
        assert_eq!(
            lines.iter().filter(|l| *l == "Expired: false").count(),
            2
        );
    }
}
