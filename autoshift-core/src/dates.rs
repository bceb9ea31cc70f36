//! Date normalization for scraped expiry/added strings.
//!
//! Source pages write dates by hand: `Sep 15, 2025`, `28/09/2025`,
//! `Sept. 22nd`, full ISO timestamps, or the literal `Unknown`. Everything
//! naive is interpreted as wall-clock time in Gearbox's timezone
//! (America/Chicago, CST/CDT chosen per date) and converted to UTC.

use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, LocalResult, Month, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    SecondsFormat, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::DateParseError;

/// Timezone all naive source dates are anchored in.
pub const GEARBOX_TZ: Tz = chrono_tz::America::Chicago;

/// Default tolerance, in days, before a month/day-only date rolls into the
/// neighbouring year.
pub const DEFAULT_ROLLOVER_DAYS: i64 = 180;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static date regex must compile")
}

static LABEL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)^(?:expires?|expiry|expiration|expire date|added|archived)(?:\s+(?:on|date))?\s*:?\s+")
});
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| regex(r"^\d{4}-\d{1,2}-\d{1,2}$"));
static ORDINAL: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b"));
static MERIDIEM_DOTS: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\b([ap])\.m\.?"));
static WORD_DOT: LazyLock<Regex> = LazyLock::new(|| regex(r"\b([A-Za-z]{3,9})\."));
static SEPT: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\bsept\b"));
static WEEKDAY: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)^(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*,?\s+"));
static AT: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\s+(?:at|@)\s+"));
static UTC_SUFFIX: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\s*\b(?:utc|gmt)\s*$"));
static COMMA: LazyLock<Regex> = LazyLock::new(|| regex(r"\s*,\s*"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| regex(r"\s+"));
static SLASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^(\d{1,2})/(\d{1,2})/(\d{2}|\d{4})$"));
static SLASH_MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| regex(r"^(\d{1,2})/(\d{1,2})$"));
static NAME_DAY: LazyLock<Regex> = LazyLock::new(|| regex(r"^([A-Za-z]+) (\d{1,2})$"));
static DAY_NAME: LazyLock<Regex> = LazyLock::new(|| regex(r"^(\d{1,2}) ([A-Za-z]+)$"));

/// Offset-carrying ISO layouts that RFC 3339 parsing does not accept.
const ISO_OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%z",
];

const ISO_NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

// `%B` also accepts the three-letter abbreviation when parsing.
const NAMED_DATE_FORMATS: &[&str] = &["%B %d, %Y", "%B %d %Y", "%d %B %Y", "%d %B, %Y"];

const NAMED_DATETIME_FORMATS: &[&str] = &[
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y, %I:%M %p",
    "%B %d %Y %I:%M %p",
    "%B %d, %Y %I:%M%p",
    "%d %B %Y %I:%M %p",
    "%B %d, %Y %H:%M",
    "%B %d %Y %H:%M",
    "%d %B %Y %H:%M",
];

/// Converts human-written dates into UTC instants.
///
/// A normalizer is bound to a reference instant (used to pick a year for
/// month/day-only inputs) and to the timezone naive inputs are read in.
#[derive(Debug, Clone, Copy)]
pub struct DateNormalizer {
    reference: DateTime<Utc>,
    timezone: Tz,
    rollover_days: i64,
}

impl DateNormalizer {
    pub fn new(reference: DateTime<Utc>, timezone: Tz) -> Self {
        Self {
            reference,
            timezone,
            rollover_days: DEFAULT_ROLLOVER_DAYS,
        }
    }

    /// Normalizer anchored in America/Chicago.
    pub fn central(reference: DateTime<Utc>) -> Self {
        Self::new(reference, GEARBOX_TZ)
    }

    /// Set how far (in days) a month/day-only date may sit from its anchor
    /// before it is moved into the adjacent year.
    pub fn with_rollover_days(mut self, days: i64) -> Self {
        self.rollover_days = days.max(0);
        self
    }

    /// Normalize `raw` into a UTC instant.
    ///
    /// Returns `Ok(None)` for the "no date" sentinels (`Unknown`, empty).
    /// `archived`, when known, supplies the year for month/day-only input.
    pub fn normalize(
        &self,
        raw: &str,
        archived: Option<DateTime<Utc>>,
    ) -> Result<Option<DateTime<Utc>>, DateParseError> {
        let fail = || DateParseError(raw.to_string());

        let trimmed = LABEL_PREFIX.replace(raw.trim(), "");
        let trimmed = trimmed.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unknown") {
            return Ok(None);
        }

        if let Some(instant) = parse_iso_with_offset(trimmed) {
            return Ok(Some(instant));
        }

        if ISO_DATE.is_match(trimmed) {
            let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| fail())?;
            return self.midnight(date, false).map(Some).ok_or_else(fail);
        }
        for fmt in ISO_NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return self.localize(naive, false).map(Some).ok_or_else(fail);
            }
        }

        let (cleaned, explicit_utc) = clean(trimmed);

        for fmt in NAMED_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
                return self.localize(naive, explicit_utc).map(Some).ok_or_else(fail);
            }
        }
        for fmt in NAMED_DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
                return self.midnight(date, explicit_utc).map(Some).ok_or_else(fail);
            }
        }

        if let Some(caps) = SLASH_DATE.captures(&cleaned) {
            let a: u32 = caps[1].parse().map_err(|_| fail())?;
            let b: u32 = caps[2].parse().map_err(|_| fail())?;
            let mut year: i32 = caps[3].parse().map_err(|_| fail())?;
            if year < 100 {
                year += 2000;
            }
            let (month, day) = day_month_order(a, b);
            let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(fail)?;
            return self.midnight(date, explicit_utc).map(Some).ok_or_else(fail);
        }

        if let Some((month, day)) = month_day_only(&cleaned) {
            let anchor = archived.unwrap_or(self.reference);
            return self
                .choose_year(month, day, anchor, explicit_utc)
                .map(Some)
                .ok_or_else(fail);
        }

        Err(fail())
    }

    /// Pick a year for a month/day-only date.
    ///
    /// The anchor's local year is tried first. If the candidate falls more
    /// than `rollover_days` before the anchor it moves forward a year; more
    /// than `rollover_days` after, it moves back a year.
    fn choose_year(
        &self,
        month: u32,
        day: u32,
        anchor: DateTime<Utc>,
        explicit_utc: bool,
    ) -> Option<DateTime<Utc>> {
        let year = anchor.with_timezone(&self.timezone).year();
        let at = |y: i32| {
            NaiveDate::from_ymd_opt(y, month, day).and_then(|date| self.midnight(date, explicit_utc))
        };

        // Feb 29 only exists in some years; fall back to the nearest one.
        let candidate = at(year).or_else(|| at(year + 1)).or_else(|| at(year - 1))?;
        let diff = (candidate - anchor).num_days();
        if diff < -self.rollover_days {
            at(year + 1).or(Some(candidate))
        } else if diff > self.rollover_days {
            at(year - 1).or(Some(candidate))
        } else {
            Some(candidate)
        }
    }

    fn midnight(&self, date: NaiveDate, explicit_utc: bool) -> Option<DateTime<Utc>> {
        self.localize(date.and_time(NaiveTime::MIN), explicit_utc)
    }

    /// Resolve a wall-clock time in the configured timezone.
    ///
    /// Ambiguous times (DST fall-back) take the earlier instant; times inside
    /// the spring-forward gap resolve one hour later.
    fn localize(&self, naive: NaiveDateTime, explicit_utc: bool) -> Option<DateTime<Utc>> {
        if explicit_utc {
            return Some(Utc.from_utc_datetime(&naive));
        }
        match self.timezone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => self
                .timezone
                .from_local_datetime(&(naive + TimeDelta::hours(1)))
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

fn parse_iso_with_offset(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let s = match s.strip_suffix(['Z', 'z']) {
        Some(stripped) => format!("{stripped}+00:00"),
        None => s.to_string(),
    };
    ISO_OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&s, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Canonicalize a free-form date string before format matching.
///
/// Returns the cleaned string and whether an explicit UTC marker was present.
fn clean(s: &str) -> (String, bool) {
    let s = WEEKDAY.replace(s, "");
    let s = ORDINAL.replace_all(&s, "$1");
    let s = MERIDIEM_DOTS.replace_all(&s, |caps: &regex::Captures| {
        format!("{}M", caps[1].to_ascii_uppercase())
    });
    let s = WORD_DOT.replace_all(&s, "$1");
    let s = SEPT.replace_all(&s, "Sep");
    let s = AT.replace_all(&s, " ");
    let explicit_utc = UTC_SUFFIX.is_match(&s);
    let s = UTC_SUFFIX.replace(&s, "");
    let s = COMMA.replace_all(&s, ", ");
    let s = WHITESPACE.replace_all(&s, " ");
    (s.trim().trim_end_matches(',').to_string(), explicit_utc)
}

/// Numeric day/month ordering: a first component above 12 can only be a
/// day, otherwise the US month-first convention applies.
fn day_month_order(a: u32, b: u32) -> (u32, u32) {
    if a > 12 { (b, a) } else { (a, b) }
}

fn month_day_only(s: &str) -> Option<(u32, u32)> {
    let (month, day) = if let Some(caps) = NAME_DAY.captures(s) {
        (caps[1].parse::<Month>().ok()?.number_from_month(), caps[2].parse().ok()?)
    } else if let Some(caps) = DAY_NAME.captures(s) {
        (caps[2].parse::<Month>().ok()?.number_from_month(), caps[1].parse().ok()?)
    } else if let Some(caps) = SLASH_MONTH_DAY.captures(s) {
        day_month_order(caps[1].parse().ok()?, caps[2].parse().ok()?)
    } else {
        return None;
    };
    // Validate against a leap year so Feb 29 is accepted here.
    NaiveDate::from_ymd_opt(2000, month, day).map(|_| (month, day))
}

/// Render an instant as canonical ISO UTC (`2025-09-15T05:00:00Z`).
pub fn to_iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render an instant as Central wall-clock time with its UTC offset, e.g.
/// `Sep 28, 2025, 02:11 AM UTC-05:00`.
pub fn format_central(instant: DateTime<Utc>) -> String {
    format_in(instant, GEARBOX_TZ)
}

pub fn format_in(instant: DateTime<Utc>, timezone: Tz) -> String {
    let local = instant.with_timezone(&timezone);
    let minutes = local.offset().fix().local_minus_utc() / 60;
    let sign = if minutes < 0 { '-' } else { '+' };
    format!(
        "{}UTC{}{:02}:{:02}",
        local.format("%b %d, %Y, %I:%M %p "),
        sign,
        minutes.abs() / 60,
        minutes.abs() % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn norm() -> DateNormalizer {
        DateNormalizer::central(utc("2025-09-28T12:00:00Z"))
    }

    fn parse(raw: &str) -> DateTime<Utc> {
        norm()
            .normalize(raw, None)
            .unwrap_or_else(|e| panic!("{raw}: {e}"))
            .unwrap_or_else(|| panic!("{raw}: unexpected skip"))
    }

    #[test]
    fn iso_with_offset_is_converted_directly() {
        assert_eq!(parse("2025-10-01T00:00:00Z"), utc("2025-10-01T00:00:00Z"));
        assert_eq!(parse("2025-10-01T00:00:00+02:00"), utc("2025-09-30T22:00:00Z"));
        assert_eq!(parse("2025-10-01 00:00:00+00:00"), utc("2025-10-01T00:00:00Z"));
        assert_eq!(parse("2025-10-01T08:30Z"), utc("2025-10-01T08:30:00Z"));
    }

    #[test]
    fn iso_date_only_is_central_midnight() {
        // CDT in September, CST in December.
        assert_eq!(parse("2025-09-15"), utc("2025-09-15T05:00:00Z"));
        assert_eq!(parse("2025-12-01"), utc("2025-12-01T06:00:00Z"));
    }

    #[test]
    fn naive_iso_datetime_is_central_wall_clock() {
        assert_eq!(parse("2025-10-01 00:00:00"), utc("2025-10-01T05:00:00Z"));
        assert_eq!(parse("2025-01-15T09:30"), utc("2025-01-15T15:30:00Z"));
    }

    #[test]
    fn named_month_formats() {
        assert_eq!(parse("Sep 15, 2025"), utc("2025-09-15T05:00:00Z"));
        assert_eq!(parse("September 15, 2025"), utc("2025-09-15T05:00:00Z"));
        assert_eq!(parse("Sept. 22nd, 2025"), utc("2025-09-22T05:00:00Z"));
        assert_eq!(parse("15 September 2025"), utc("2025-09-15T05:00:00Z"));
        assert_eq!(parse("Dec 3 2025"), utc("2025-12-03T06:00:00Z"));
        assert_eq!(parse("Thursday, October 2nd, 2025"), utc("2025-10-02T05:00:00Z"));
    }

    #[test]
    fn named_month_with_time() {
        assert_eq!(parse("October 1, 2025 10:00 AM"), utc("2025-10-01T15:00:00Z"));
        assert_eq!(parse("Oct 1, 2025 at 9:00 p.m."), utc("2025-10-02T02:00:00Z"));
        assert_eq!(parse("Jan 10, 2026 11:59 PM"), utc("2026-01-11T05:59:00Z"));
    }

    #[test]
    fn explicit_utc_suffix_skips_timezone_anchor() {
        assert_eq!(parse("Sep 15, 2025 UTC"), utc("2025-09-15T00:00:00Z"));
        assert_eq!(parse("Sep 15, 2025 10:00 AM UTC"), utc("2025-09-15T10:00:00Z"));
    }

    #[test]
    fn slash_dates_pick_order_from_first_component() {
        assert_eq!(parse("28/09/2025"), utc("2025-09-28T05:00:00Z"));
        assert_eq!(parse("09/28/2025"), utc("2025-09-28T05:00:00Z"));
        // Ambiguous: US month-first.
        assert_eq!(parse("09/10/2025"), utc("2025-09-10T05:00:00Z"));
        assert_eq!(parse("1/2/26"), utc("2026-01-02T06:00:00Z"));
    }

    #[test]
    fn month_day_only_uses_reference_year() {
        assert_eq!(parse("Sep 22"), utc("2025-09-22T05:00:00Z"));
        assert_eq!(parse("Sept. 22"), utc("2025-09-22T05:00:00Z"));
        assert_eq!(parse("9/22"), utc("2025-09-22T05:00:00Z"));
        assert_eq!(parse("22 September"), utc("2025-09-22T05:00:00Z"));
    }

    #[test]
    fn month_day_only_rolls_across_year_boundary() {
        let december = DateNormalizer::central(utc("2025-12-20T12:00:00Z"));
        let jan = december.normalize("Jan 5", None).unwrap().unwrap();
        assert_eq!(jan, utc("2026-01-05T06:00:00Z"));

        let january = DateNormalizer::central(utc("2026-01-03T12:00:00Z"));
        let dec = january.normalize("Dec 28", None).unwrap().unwrap();
        assert_eq!(dec, utc("2025-12-28T06:00:00Z"));
    }

    #[test]
    fn month_day_only_prefers_archived_year() {
        let archived = utc("2024-12-30T06:00:00Z");
        let got = norm().normalize("Jan 3", Some(archived)).unwrap().unwrap();
        assert_eq!(got, utc("2025-01-03T06:00:00Z"));

        let archived = utc("2024-03-01T06:00:00Z");
        let got = norm().normalize("Mar 20", Some(archived)).unwrap().unwrap();
        assert_eq!(got, utc("2024-03-20T05:00:00Z"));
    }

    #[test]
    fn rollover_tolerance_is_configurable() {
        let wide = DateNormalizer::central(utc("2025-12-20T12:00:00Z")).with_rollover_days(400);
        let jan = wide.normalize("Jan 5", None).unwrap().unwrap();
        assert_eq!(jan, utc("2025-01-05T06:00:00Z"));
    }

    #[test]
    fn sentinels_skip() {
        assert_eq!(norm().normalize("Unknown", None), Ok(None));
        assert_eq!(norm().normalize("unknown", None), Ok(None));
        assert_eq!(norm().normalize("", None), Ok(None));
        assert_eq!(norm().normalize("   ", None), Ok(None));
        assert_eq!(norm().normalize("Expires: Unknown", None), Ok(None));
    }

    #[test]
    fn label_prefix_is_ignored() {
        assert_eq!(parse("Expires: 2024-12-31"), utc("2024-12-31T06:00:00Z"));
        assert_eq!(parse("Expire Date: Sep 15, 2025"), utc("2025-09-15T05:00:00Z"));
        assert_eq!(parse("added Sept. 22"), utc("2025-09-22T05:00:00Z"));
    }

    #[test]
    fn garbage_fails_with_original_text() {
        assert_eq!(
            norm().normalize("whenever Gearbox feels like it", None),
            Err(DateParseError("whenever Gearbox feels like it".to_string()))
        );
        assert!(norm().normalize("2025-02-30", None).is_err());
        assert!(norm().normalize("31/31/2025", None).is_err());
        assert!(norm().normalize("Smarch 4", None).is_err());
    }

    #[test]
    fn dst_edges() {
        // Fall back: 1:30 AM happens twice, earlier (CDT) wins.
        assert_eq!(parse("Nov 2, 2025 1:30 AM"), utc("2025-11-02T06:30:00Z"));
        // Spring forward: 2:30 AM does not exist, shifts to 3:30 CDT.
        assert_eq!(parse("Mar 9, 2025 2:30 AM"), utc("2025-03-09T08:30:00Z"));
    }

    #[test]
    fn central_formatting_shows_offset() {
        assert_eq!(
            format_central(utc("2025-09-28T07:11:00Z")),
            "Sep 28, 2025, 02:11 AM UTC-05:00"
        );
        assert_eq!(
            format_central(utc("2025-12-01T12:00:00Z")),
            "Dec 01, 2025, 06:00 AM UTC-06:00"
        );
    }

    #[test]
    fn iso_output_is_second_precision_zulu() {
        assert_eq!(to_iso(utc("2025-09-15T05:00:00.123Z")), "2025-09-15T05:00:00Z");
    }
}
