use serde_json::{Map, Value};

/// Recursively merge the JSON object `patch` into the JSON object `existing`.
///
/// Nested objects merge key by key; any other value in `patch` replaces the
/// existing one. Both sides must be JSON objects.
pub fn merge_json(existing: &str, patch: &str) -> Result<String, String> {
    let mut base = parse_object(existing, "stored value")?;
    let patch = parse_object(patch, "merge value")?;
    merge_into(&mut base, patch);
    serde_json::to_string(&Value::Object(base)).map_err(|e| e.to_string())
}

fn parse_object(text: &str, what: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(format!("{what} is not a JSON object")),
        Err(e) => Err(format!("{what} is not valid JSON: {e}")),
    }
}

fn merge_into(base: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, incoming) in patch {
        match (base.get_mut(&key), incoming) {
            (Some(Value::Object(current)), Value::Object(nested)) => merge_into(current, nested),
            (_, incoming) => {
                base.insert(key, incoming);
            }
        }
    }
}
