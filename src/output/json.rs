//! JSON rendering, including the `{"success": ...}` envelope used for
//! machine-readable command output.

use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt::Display;

pub fn to_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Wraps an operation outcome.
///
/// `Ok` payloads that serialize to an object get `"success": true` merged
/// into their fields; anything else is placed under `"data"`. Errors become
/// `{"success": false, "error": "<message>"}`.
///
/// ```
/// use extvet::output::json::envelope;
///
/// let failed: Result<u32, String> = Err("Transaction has already been refunded".into());
/// let value = envelope(&failed);
/// assert_eq!(value["success"], false);
/// assert_eq!(value["error"], "Transaction has already been refunded");
/// ```
pub fn envelope<T: Serialize, E: Display>(outcome: &Result<T, E>) -> Value {
    match outcome {
        Ok(payload) => match serde_json::to_value(payload) {
            Ok(Value::Object(fields)) => {
                let mut wrapped = Map::with_capacity(fields.len() + 1);
                wrapped.insert("success".to_string(), Value::Bool(true));
                wrapped.extend(fields);
                Value::Object(wrapped)
            }
            Ok(other) => json!({ "success": true, "data": other }),
            Err(e) => json!({ "success": false, "error": e.to_string() }),
        },
        Err(e) => json!({ "success": false, "error": e.to_string() }),
    }
}
