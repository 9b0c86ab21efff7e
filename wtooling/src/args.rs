//! Argument helpers for function and trait-based tools.
//!
//! Models occasionally stream arguments as a JSON string instead of an
//! object; [`normalize_arguments`] folds both shapes into an object.
//!
//! ```rust
//! use serde_json::json;
//! use wtooling::{normalize_arguments, required_string};
//!
//! let args = normalize_arguments(&json!(r#"{"query":"rust"}"#)).expect("object should parse");
//! let query = required_string(&args, "query").expect("query should be present");
//! assert_eq!(query, "rust");
//! ```

use serde_json::{Map, Value};

use crate::ToolError;

pub fn parse_json_value(args_json: &str) -> Result<Value, ToolError> {
    serde_json::from_str(args_json)
        .map_err(|err| ToolError::invalid_arguments(format!("invalid JSON arguments: {err}")))
}

pub fn parse_json_object(args_json: &str) -> Result<Map<String, Value>, ToolError> {
    match parse_json_value(args_json)? {
        Value::Object(map) => Ok(map),
        _ => Err(ToolError::invalid_arguments("expected JSON object arguments")),
    }
}

/// Accepts an object, a JSON-encoded object string, or null (as `{}`).
pub fn normalize_arguments(arguments: &Value) -> Result<Map<String, Value>, ToolError> {
    match arguments {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        Value::String(raw) if raw.trim().is_empty() => Ok(Map::new()),
        Value::String(raw) => parse_json_object(raw),
        _ => Err(ToolError::invalid_arguments("expected JSON object arguments")),
    }
}

pub fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required string: '{key}'")))
}

pub fn optional_string(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(ToString::to_string)
}

pub fn required_object<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a Map<String, Value>, ToolError> {
    args.get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required object: '{key}'")))
}

pub fn required_i64(args: &Map<String, Value>, key: &str) -> Result<i64, ToolError> {
    args.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required integer: '{key}'")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ToolErrorKind;

    #[test]
    fn normalize_accepts_objects_strings_and_null() {
        let from_object = normalize_arguments(&json!({"a": 1})).expect("object");
        let from_string = normalize_arguments(&json!("{\"a\":1}")).expect("string");
        let from_null = normalize_arguments(&Value::Null).expect("null");

        assert_eq!(from_object, from_string);
        assert!(from_null.is_empty());
        assert_eq!(required_i64(&from_object, "a").expect("a"), 1);
    }

    #[test]
    fn parse_invalid_json_returns_invalid_arguments() {
        let error = parse_json_value("{").expect_err("json should fail");
        assert_eq!(error.kind, ToolErrorKind::InvalidArguments);

        let error = normalize_arguments(&json!([1, 2])).expect_err("array should fail");
        assert_eq!(error.kind, ToolErrorKind::InvalidArguments);
    }

    #[test]
    fn missing_keys_are_reported() {
        let args = normalize_arguments(&json!({"query": "rust", "filter": {"lang": "en"}}))
            .expect("object");
        assert_eq!(optional_string(&args, "lang"), None);
        let filter = required_object(&args, "filter").expect("filter");
        assert_eq!(optional_string(filter, "lang").as_deref(), Some("en"));
        assert!(required_object(&args, "query").is_err());
        let error = required_string(&args, "lang").expect_err("missing");
        assert!(error.message.contains("lang"));
    }
}
