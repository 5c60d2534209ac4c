//! Intake validation: decides whether a record has anything to score.

use serde_json::Value;
use tracing::warn;

use crate::pipeline::types::MessageRecord;

/// Return the record's `content` if it is usable, or `None` if there is
/// nothing to score.
///
/// Missing, `null`, `false`, `0`, `""`, `[]` and `{}` all count as absent.
/// Any other value is handed on, including non-string values; the
/// classifier decides what to do with those.
pub fn validate(record: &MessageRecord) -> Option<&Value> {
    match record.content() {
        Some(content) if is_truthy(content) => Some(content),
        _ => {
            warn!("No content provided for sentiment analysis");
            None
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}
