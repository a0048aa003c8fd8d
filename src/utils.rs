//! Utility functions for tool argument handling

use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::{Validate, ValidationErrors};

/// Deserializes tool arguments into `T` and runs its field validators.
/// The error is a human-readable message naming the offending fields.
pub fn parse_args<T: DeserializeOwned + Validate>(args: &Value) -> Result<T, String> {
    let parsed: T = serde_json::from_value(args.clone())
        .map_err(|e| format!("Missing or invalid arguments: {}", e))?;
    parsed.validate().map_err(|e| describe(&e))?;
    Ok(parsed)
}

fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let reason = errs
                .iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .next()
                .unwrap_or_else(|| "invalid value".to_string());
            format!("Invalid '{}': {}", field, reason)
        })
        .collect();
    fields.sort();
    fields.join("; ")
}
