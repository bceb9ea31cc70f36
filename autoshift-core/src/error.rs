/// A date string matched none of the supported formats.
///
/// Carries the original input so callers can log it. This is always a
/// per-field soft failure: the field becomes unknown and the record is kept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized date: '{0}'")]
pub struct DateParseError(pub String);

/// The persisted file did not have the expected `[ { meta, codes } ]` shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected shiftcodes file layout: {0}")]
pub struct FileShapeError(pub String);
