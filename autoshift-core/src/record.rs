use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::dates::{self, DateNormalizer};
use crate::error::FileShapeError;
use crate::game::Game;

/// Coarse classification of what a code unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    GoldenKey,
    DiamondKey,
    SkeletonKey,
    Cosmetic,
    #[default]
    Other,
}

const COSMETIC_WORDS: &[&str] = &[
    "skin",
    "head",
    "cosmetic",
    "emote",
    "trinket",
    "banner",
    "echo theme",
    "ornament",
    "decoration",
    "vehicle",
    "outfit",
];

impl RewardType {
    /// Classify free-form reward text ("3 Golden Keys", "Neon Arterial
    /// weapon skin", ...).
    pub fn classify(reward: &str) -> Self {
        let lower = reward.to_lowercase();
        if lower.contains("golden key") || lower.contains("gold key") {
            Self::GoldenKey
        } else if lower.contains("diamond key") {
            Self::DiamondKey
        } else if lower.contains("skeleton key") {
            Self::SkeletonKey
        } else if COSMETIC_WORDS.iter().any(|w| lower.contains(w)) {
            Self::Cosmetic
        } else {
            Self::Other
        }
    }
}

/// Expiry of a code as stored in the published file.
///
/// `Unknown` serializes as the literal `"Unknown"`. Values that could not be
/// interpreted when the file was read are kept verbatim in `Unparsed` so a
/// round-trip never loses data; the sweeper re-parses them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Expiry {
    #[default]
    Unknown,
    At(DateTime<Utc>),
    Unparsed(String),
}

impl Expiry {
    pub fn is_known(&self) -> bool {
        matches!(self, Self::At(_))
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Build an expiry from a wire value.
    pub fn from_wire(value: Option<&str>) -> Self {
        let Some(raw) = value.map(str::trim) else {
            return Self::Unknown;
        };
        if raw.is_empty() || raw.eq_ignore_ascii_case("unknown") {
            return Self::Unknown;
        }
        match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => Self::At(dt.with_timezone(&Utc)),
            Err(_) => Self::Unparsed(raw.to_string()),
        }
    }
}

impl From<Option<DateTime<Utc>>> for Expiry {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Unknown, Self::At)
    }
}

impl std::fmt::Display for Expiry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::At(dt) => write!(f, "{}", dates::to_iso(*dt)),
            Self::Unparsed(raw) => write!(f, "{raw}"),
        }
    }
}

impl Serialize for Expiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Expiry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Loose>::deserialize(deserializer)?;
        Ok(Self::from_wire(value.as_ref().and_then(Loose::text)))
    }
}

/// Accepts any JSON value; only strings carry meaning.
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl Loose {
    fn text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Other(_) => None,
        }
    }
}

/// `Option<DateTime<Utc>>` stored as ISO UTC or `null`.
///
/// Reading is lenient: legacy human-written values go through the Central
/// date normalizer, and anything it cannot read becomes `null`.
mod optional_instant {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dates::to_iso(*dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<Loose>::deserialize(deserializer)?;
        let Some(raw) = value.as_ref().and_then(Loose::text) else {
            return Ok(None);
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw.trim()) {
            return Ok(Some(dt.with_timezone(&Utc)));
        }
        match DateNormalizer::central(Utc::now()).normalize(raw, None) {
            Ok(instant) => Ok(instant),
            Err(e) => {
                log::warn!("Dropping unreadable timestamp: {e}");
                Ok(None)
            }
        }
    }
}

/// A canonical SHiFT code entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftCodeRecord {
    pub code: String,

    #[serde(rename = "type", default)]
    pub reward_type: RewardType,

    pub game: Game,

    #[serde(default)]
    pub reward: String,

    /// When the code was first observed/added.
    #[serde(default, with = "optional_instant")]
    pub archived: Option<DateTime<Utc>>,

    #[serde(default)]
    pub expires: Expiry,

    #[serde(default)]
    pub expired: bool,

    /// URL of the page the code was scraped from.
    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub permalink: String,
}

/// Identity of a record within the persisted set.
pub type RecordKey = (String, Game);

impl ShiftCodeRecord {
    pub fn new(code: impl Into<String>, game: Game) -> Self {
        Self {
            code: code.into(),
            reward_type: RewardType::Other,
            game,
            reward: String::new(),
            archived: None,
            expires: Expiry::Unknown,
            expired: false,
            source: String::new(),
            permalink: String::new(),
        }
    }

    pub fn with_reward(mut self, reward: impl Into<String>) -> Self {
        self.reward = reward.into();
        self.reward_type = RewardType::classify(&self.reward);
        self
    }

    pub fn with_expires(mut self, expires: Expiry) -> Self {
        self.expires = expires;
        self
    }

    pub fn with_archived(mut self, archived: DateTime<Utc>) -> Self {
        self.archived = Some(archived);
        self
    }

    pub fn with_expired(mut self, expired: bool) -> Self {
        self.expired = expired;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn key(&self) -> RecordKey {
        (self.code.clone(), self.game)
    }
}

/// Metadata block at the head of the published file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub attribution: String,

    #[serde(default)]
    pub permalink: String,

    /// Last time the file content was regenerated.
    #[serde(default, with = "optional_instant")]
    pub generated: Option<DateTime<Utc>>,
}

fn default_version() -> String {
    "0.1".to_string()
}

impl Default for FileMeta {
    fn default() -> Self {
        Self {
            version: default_version(),
            description: "GitHub Alternate Source for Shift Codes".to_string(),
            attribution: String::new(),
            permalink: String::new(),
            generated: None,
        }
    }
}

/// The published record set: a JSON array holding one `{ meta, codes }`
/// object. The outer array is kept for compatibility with existing
/// consumers of `shiftcodes.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<FileBlock>", into = "Vec<FileBlock>")]
pub struct ShiftCodeFile {
    pub meta: FileMeta,
    pub codes: Vec<ShiftCodeRecord>,
}

/// Wire form of one element of the published array.
#[derive(Serialize, Deserialize)]
pub struct FileBlock {
    #[serde(default)]
    pub meta: FileMeta,
    pub codes: Vec<ShiftCodeRecord>,
}

impl TryFrom<Vec<FileBlock>> for ShiftCodeFile {
    type Error = FileShapeError;

    fn try_from(blocks: Vec<FileBlock>) -> Result<Self, Self::Error> {
        let mut blocks = blocks.into_iter();
        let first = blocks
            .next()
            .ok_or_else(|| FileShapeError("expected a non-empty array".to_string()))?;
        if blocks.next().is_some() {
            log::warn!("shiftcodes file has more than one block; only the first is used");
        }
        Ok(Self {
            meta: first.meta,
            codes: first.codes,
        })
    }
}

impl From<ShiftCodeFile> for Vec<FileBlock> {
    fn from(file: ShiftCodeFile) -> Self {
        vec![FileBlock {
            meta: file.meta,
            codes: file.codes,
        }]
    }
}
