//! JSON-text snapshots of the customer's customization choices, stored on
//! order items so later menu edits never change historical orders.

use serde_json::Value;

/// Encodes a selection for storage. `null` and absent selections are stored
/// as NULL.
pub fn encode(selection: Option<&Value>) -> Option<String> {
    match selection {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.to_string()),
    }
}

/// Decodes a stored snapshot for display. Text that is not JSON (rows
/// written before snapshots were structured) is returned as a plain string.
pub fn decode(stored: Option<&str>) -> Value {
    match stored {
        None => Value::Null,
        Some(text) => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
    }
}
