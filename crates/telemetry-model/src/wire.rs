//! Line-oriented wire format shared by the pipeline stages.
//!
//! Every stage boundary is UTF-8 text, one record per line. Keyed lines are
//! `key<TAB>value`; the host sorts on the key, i.e. the text before the
//! first tab.

/// Key used by point-of-interest lines. These are never grouped.
pub const POI_SENTINEL: &str = "LIEU";

/// Value tag for GPS payloads in validator output.
pub const GPS_TAG: &str = "GPS";

/// Value tag for emission payloads in validator output.
pub const EMISSION_TAG: &str = "EMI";

/// Separator between a value tag and its payload, and between the fields
/// of zone keys and zone samples.
pub const FIELD_SEPARATOR: char = '|';

/// Reasons a line or raw object cannot be turned into a record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object")]
    NotAnObject,

    #[error("record kind not recognized from its fields")]
    Unrecognized,

    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: String, found: usize },

    #[error("invalid number in field '{field}': {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("malformed key: {0:?}")]
    MalformedKey(String),

    #[error("missing key/value tab separator")]
    MissingTab,
}

/// Split a keyed line into `(key, value)` at the first tab.
pub fn split_key_value(line: &str) -> Result<(&str, &str), RecordError> {
    line.split_once('\t').ok_or(RecordError::MissingTab)
}

/// The sort key of a line: the text before the first tab, or the whole
/// line when there is no tab.
pub fn line_key(line: &str) -> &str {
    line.split_once('\t').map_or(line, |(key, _)| key)
}

/// Whether the line is a point-of-interest line.
pub fn is_poi_line(line: &str) -> bool {
    line_key(line) == POI_SENTINEL
}

pub(crate) fn parse_f64(field: &'static str, raw: &str) -> Result<f64, RecordError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| RecordError::InvalidNumber {
            field,
            value: raw.to_string(),
        })?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RecordError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
    }
}

pub(crate) fn parse_i64(field: &'static str, raw: &str) -> Result<i64, RecordError> {
    raw.trim()
        .parse()
        .map_err(|_| RecordError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}
