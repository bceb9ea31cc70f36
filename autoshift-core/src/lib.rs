//! Core types for autoshift: canonical games, the persisted SHiFT code
//! record set, and the date normalizer every scraped date goes through.

pub mod dates;
pub mod error;
pub mod game;
pub mod record;

pub use dates::{DateNormalizer, GEARBOX_TZ, format_central, to_iso};
pub use error::{DateParseError, FileShapeError};
pub use game::{Game, GameParseError};
pub use record::{Expiry, FileMeta, RecordKey, RewardType, ShiftCodeFile, ShiftCodeRecord};
