//! Validation and canonicalization of raw candidates.

use std::collections::HashSet;
use std::sync::LazyLock;

use autoshift_core::{DateNormalizer, Expiry, Game, RecordKey, ShiftCodeRecord};
use autoshift_sources::RawCandidate;
use chrono::{DateTime, Utc};
use regex::Regex;

static CODE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]+(?:-[A-Z0-9]+)*$").expect("static regex is valid"));
static DATE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:expires?|expiry|expiration|expire date|added|archived)(?:\s+(?:on|date))?\s*:\s*")
        .expect("static regex is valid")
});

/// Date texts that mean "no date".
const NO_DATE_PHRASES: &[&str] = &[
    "never",
    "no expiration",
    "no expiry",
    "does not expire",
    "n/a",
    "na",
    "none",
    "tbd",
    "tba",
    "-",
    "\u{2013}",
    "\u{2014}",
];

/// Why a candidate did not become a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("invalid_code: '{0}'")]
    InvalidCode(String),
    #[error("unknown_game: '{0}'")]
    UnknownGame(String),
    #[error("duplicate_in_batch: {0} ({1})")]
    DuplicateInBatch(String, Game),
}

impl Rejection {
    /// Stable reason tag used in run summaries.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidCode(_) => "invalid_code",
            Self::UnknownGame(_) => "unknown_game",
            Self::DuplicateInBatch(..) => "duplicate_in_batch",
        }
    }
}

/// Turns raw candidates into canonical records.
///
/// One normalizer covers one batch (a scrape run): it remembers every
/// (code, game) it has accepted so later duplicates are rejected.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    dates: DateNormalizer,
    min_code_chars: usize,
    max_code_chars: usize,
    seen: HashSet<RecordKey>,
}

impl RecordNormalizer {
    pub fn new(dates: DateNormalizer) -> Self {
        Self {
            dates,
            min_code_chars: 20,
            max_code_chars: 30,
            seen: HashSet::new(),
        }
    }

    /// Accepted range of alphanumeric characters in a code (dashes excluded).
    pub fn with_code_length(mut self, min: usize, max: usize) -> Self {
        self.min_code_chars = min;
        self.max_code_chars = max;
        self
    }

    pub fn normalize(&mut self, candidate: &RawCandidate) -> Result<ShiftCodeRecord, Rejection> {
        let code = clean_code(&candidate.code_text);
        if !self.is_valid_code(&code) {
            return Err(Rejection::InvalidCode(candidate.code_text.clone()));
        }

        let game = Game::from_label(&candidate.game_label)
            .map_err(|_| Rejection::UnknownGame(candidate.game_label.clone()))?;

        if !self.seen.insert((code.clone(), game)) {
            return Err(Rejection::DuplicateInBatch(code, game));
        }

        let archived = self.parse_date(&candidate.archived_text, None, &code, "archived");
        let expires = self.parse_date(&candidate.expires_text, archived, &code, "expires");

        let mut record = ShiftCodeRecord::new(code, game)
            .with_reward(candidate.reward_text.trim())
            .with_expires(Expiry::from(expires))
            .with_expired(candidate.expired_hint)
            .with_source(&candidate.source_url);
        if let Some(archived) = archived {
            record = record.with_archived(archived);
        }
        Ok(record)
    }

    fn is_valid_code(&self, code: &str) -> bool {
        let chars = code.chars().filter(|c| *c != '-').count();
        CODE_SHAPE.is_match(code) && (self.min_code_chars..=self.max_code_chars).contains(&chars)
    }

    /// A failed parse only loses this one field.
    fn parse_date(
        &self,
        raw: &str,
        archived: Option<DateTime<Utc>>,
        code: &str,
        field: &str,
    ) -> Option<DateTime<Utc>> {
        let text = clean_date_text(raw);
        match self.dates.normalize(&text, archived) {
            Ok(instant) => instant,
            Err(e) => {
                log::debug!("{code}: {field} left unknown, {e}");
                None
            }
        }
    }
}

/// Strip whitespace, fold Unicode dashes to `-`, uppercase.
pub fn clean_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '\u{2010}'..='\u{2015}' | '\u{2212}' | '\u{FE58}' | '\u{FE63}' | '\u{FF0D}' => '-',
            other => other,
        })
        .flat_map(char::to_uppercase)
        .collect()
}

/// Drop a leading field label and map "no date" phrases to the empty string.
fn clean_date_text(raw: &str) -> String {
    let text = DATE_LABEL.replace(raw.trim(), "");
    let text = text.trim().trim_end_matches('*').trim();
    if NO_DATE_PHRASES.contains(&text.to_lowercase().as_str()) {
        String::new()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoshift_core::RewardType;

    fn reference() -> DateTime<Utc> {
        "2025-09-28T07:11:00Z".parse().unwrap()
    }

    fn normalizer() -> RecordNormalizer {
        RecordNormalizer::new(DateNormalizer::central(reference()))
    }

    fn candidate(code: &str, game: &str) -> RawCandidate {
        RawCandidate {
            source_id: "test".into(),
            source_url: "https://example.com/bl4".into(),
            game_label: game.into(),
            code_text: code.into(),
            reward_text: "1 Golden Key".into(),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_and_canonicalizes() {
        let mut raw = candidate(" j9xbb\u{2013}kk9t3-CRTBW-BBT3T-KTBTW ", "Borderlands 4 SHiFT Codes");
        raw.expires_text = "Expires: Sep 30, 2025".into();
        raw.archived_text = "Sept. 22".into();
        raw.expired_hint = true;

        let record = normalizer().normalize(&raw).unwrap();
        assert_eq!(record.code, "J9XBB-KK9T3-CRTBW-BBT3T-KTBTW");
        assert_eq!(record.game, Game::Bl4);
        assert_eq!(record.reward_type, RewardType::GoldenKey);
        assert_eq!(
            record.expires,
            Expiry::At("2025-09-30T05:00:00Z".parse().unwrap())
        );
        assert_eq!(record.archived, Some("2025-09-22T05:00:00Z".parse().unwrap()));
        assert!(record.expired);
        assert_eq!(record.source, "https://example.com/bl4");
    }

    #[test]
    fn rejects_bad_codes() {
        let mut n = normalizer();
        for bad in ["", "SHIFT CODE", "ABCDE-FGHIJ", "ABCDE--FGHIJ-KLMNO-PQRST-UVWXY", "ABCDE-FGHIJ-KLMNO-PQRST-UVWX!"] {
            let err = n.normalize(&candidate(bad, "bl4")).unwrap_err();
            assert_eq!(err.reason(), "invalid_code", "{bad:?}");
        }
    }

    #[test]
    fn code_length_is_configurable() {
        let mut n = normalizer().with_code_length(10, 10);
        assert!(n.normalize(&candidate("ABCDE-FGHIJ", "bl3")).is_ok());
    }

    #[test]
    fn rejects_unknown_game() {
        let err = normalizer()
            .normalize(&candidate("ABCDE-FGHJK-LMNPQ-RSTVW-XYZ12", "Recent Comments"))
            .unwrap_err();
        assert_eq!(err, Rejection::UnknownGame("Recent Comments".into()));
    }

    #[test]
    fn duplicate_in_batch_keeps_first() {
        let mut n = normalizer();
        let code = "ABCDE-FGHJK-LMNPQ-RSTVW-XYZ12";
        assert!(n.normalize(&candidate(code, "bl4")).is_ok());
        assert_eq!(
            n.normalize(&candidate(&code.to_lowercase(), "Borderlands 4")).unwrap_err().reason(),
            "duplicate_in_batch"
        );
        // Same code for another game is a different record.
        assert!(n.normalize(&candidate(code, "bl3")).is_ok());
    }

    #[test]
    fn unparsable_and_no_date_texts_leave_fields_unknown() {
        let mut n = normalizer();
        let mut raw = candidate("ABCDE-FGHJK-LMNPQ-RSTVW-XYZ12", "bl4");
        raw.expires_text = "when the moon is full".into();
        raw.archived_text = "N/A".into();
        let record = n.normalize(&raw).unwrap();
        assert_eq!(record.expires, Expiry::Unknown);
        assert_eq!(record.archived, None);

        let mut raw = candidate("ABCDE-FGHJK-LMNPQ-RSTVW-XYZ13", "bl4");
        raw.expires_text = "Expires: Never".into();
        assert_eq!(n.normalize(&raw).unwrap().expires, Expiry::Unknown);
    }
}
