//! Dump normalization: document-store exports to one JSON object per line.
//!
//! Exports come as a single array, a single object, or a run of
//! concatenated values. Arrays are flattened at any depth.

use serde_json::Value;

/// Lines produced from a dump, plus the error that stopped reading, if any.
#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub lines: Vec<String>,
    /// Set when reading stopped early; `lines` keeps what came before.
    pub error: Option<String>,
}

fn flatten_into(value: Value, lines: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_into(item, lines);
            }
        }
        other => lines.push(other.to_string()),
    }
}

/// Normalize a raw dump. Stops at the first unparseable value.
pub fn normalize_dump(input: &str) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();
    let mut values = serde_json::Deserializer::from_str(input).into_iter::<Value>();

    while let Some(next) = values.next() {
        match next {
            Ok(value) => flatten_into(value, &mut outcome.lines),
            Err(e) => {
                let offset = values.byte_offset();
                tracing::warn!(offset, error = %e, "stopping at unparseable value");
                outcome.error = Some(format!("at byte {offset}: {e}"));
                break;
            }
        }
    }

    tracing::debug!(lines = outcome.lines.len(), "dump normalized");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_dump() {
        let out = normalize_dump(r#"[{"a": 1}, {"b": [1, 2]}]"#);
        assert_eq!(out.lines, vec![r#"{"a":1}"#, r#"{"b":[1,2]}"#]);
        assert!(out.error.is_none());
    }

    #[test]
    fn test_single_object() {
        let out = normalize_dump("  {\"nom\": \"Parc\"}\n");
        assert_eq!(out.lines, vec![r#"{"nom":"Parc"}"#]);
    }

    #[test]
    fn test_concatenated_and_nested() {
        let out = normalize_dump("{\"a\":1}{\"a\":2}\n[[{\"a\":3}], {\"a\":4}]\n{\"a\":5}");
        assert_eq!(
            out.lines,
            vec![r#"{"a":1}"#, r#"{"a":2}"#, r#"{"a":3}"#, r#"{"a":4}"#, r#"{"a":5}"#]
        );
    }

    #[test]
    fn test_stops_at_first_error_keeping_prefix() {
        let out = normalize_dump("{\"a\":1}\n{\"a\":\n");
        assert_eq!(out.lines, vec![r#"{"a":1}"#]);
        assert!(out.error.is_some());
    }

    #[test]
    fn test_empty_input() {
        let out = normalize_dump("   \n");
        assert!(out.lines.is_empty());
        assert!(out.error.is_none());
    }
}
