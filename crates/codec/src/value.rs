//! Field accessors over a JSON argument object.
//!
//! `null` and absent are treated alike: both are "not provided".

use serde_json::{Map, Value};

use crate::error::CodecError;

pub fn optional<'a>(args: &'a Value, field: &str) -> Option<&'a Value> {
    args.get(field).filter(|v| !v.is_null())
}

pub fn require<'a>(args: &'a Value, field: &str) -> Result<&'a Value, CodecError> {
    optional(args, field).ok_or_else(|| CodecError::Missing(field.to_string()))
}

pub fn as_f64(v: &Value, field: &str) -> Result<f64, CodecError> {
    v.as_f64()
        .ok_or_else(|| CodecError::wrong_type(field, "a number"))
}

/// Integers also accept floats, truncated toward zero.
pub fn as_i64(v: &Value, field: &str) -> Result<i64, CodecError> {
    if let Some(i) = v.as_i64() {
        return Ok(i);
    }
    v.as_f64()
        .map(|f| f.trunc() as i64)
        .ok_or_else(|| CodecError::wrong_type(field, "an integer"))
}

pub fn as_bool(v: &Value, field: &str) -> Result<bool, CodecError> {
    v.as_bool()
        .ok_or_else(|| CodecError::wrong_type(field, "a boolean"))
}

pub fn as_str<'a>(v: &'a Value, field: &str) -> Result<&'a str, CodecError> {
    v.as_str()
        .ok_or_else(|| CodecError::wrong_type(field, "a string"))
}

pub fn as_array<'a>(v: &'a Value, field: &str) -> Result<&'a [Value], CodecError> {
    v.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| CodecError::wrong_type(field, "a list"))
}

pub fn as_object<'a>(v: &'a Value, field: &str) -> Result<&'a Map<String, Value>, CodecError> {
    v.as_object()
        .ok_or_else(|| CodecError::wrong_type(field, "a map"))
}

pub fn req_f64(args: &Value, field: &str) -> Result<f64, CodecError> {
    as_f64(require(args, field)?, field)
}

pub fn opt_f64(args: &Value, field: &str) -> Result<Option<f64>, CodecError> {
    optional(args, field).map(|v| as_f64(v, field)).transpose()
}

pub fn req_i64(args: &Value, field: &str) -> Result<i64, CodecError> {
    as_i64(require(args, field)?, field)
}

pub fn opt_i64(args: &Value, field: &str) -> Result<Option<i64>, CodecError> {
    optional(args, field).map(|v| as_i64(v, field)).transpose()
}

pub fn req_bool(args: &Value, field: &str) -> Result<bool, CodecError> {
    as_bool(require(args, field)?, field)
}

pub fn opt_bool(args: &Value, field: &str) -> Result<Option<bool>, CodecError> {
    optional(args, field).map(|v| as_bool(v, field)).transpose()
}

pub fn req_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, CodecError> {
    as_str(require(args, field)?, field)
}

pub fn opt_str<'a>(args: &'a Value, field: &str) -> Result<Option<&'a str>, CodecError> {
    optional(args, field).map(|v| as_str(v, field)).transpose()
}

pub fn req_array<'a>(args: &'a Value, field: &str) -> Result<&'a [Value], CodecError> {
    as_array(require(args, field)?, field)
}

/// A list of strings; absent means empty.
pub fn string_list(args: &Value, field: &str) -> Result<Vec<String>, CodecError> {
    let Some(v) = optional(args, field) else {
        return Ok(Vec::new());
    };
    as_array(v, field)?
        .iter()
        .map(|item| as_str(item, field).map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{opt_f64, req_bool, req_i64, req_str, string_list};
    use crate::error::CodecError;
    use serde_json::json;

    #[test]
    fn null_counts_as_missing() {
        let args = json!({"a": null, "b": 2.5});
        assert_eq!(req_str(&args, "a"), Err(CodecError::Missing("a".into())));
        assert_eq!(opt_f64(&args, "a"), Ok(None));
        assert_eq!(opt_f64(&args, "b"), Ok(Some(2.5)));
    }

    #[test]
    fn wrong_type_names_field() {
        let args = json!({"flag": "yes"});
        let err = req_bool(&args, "flag").unwrap_err();
        assert_eq!(err.field(), Some("flag"));
        assert!(err.to_string().contains("boolean"));
    }

    #[test]
    fn integers_accept_whole_floats() {
        let args = json!({"n": 3.9, "m": 7});
        assert_eq!(req_i64(&args, "n"), Ok(3));
        assert_eq!(req_i64(&args, "m"), Ok(7));
    }

    #[test]
    fn string_lists_default_to_empty() {
        let args = json!({"ids": ["a", "b"]});
        assert_eq!(string_list(&args, "ids").unwrap(), vec!["a", "b"]);
        assert!(string_list(&args, "none").unwrap().is_empty());
        assert!(string_list(&json!({"ids": [1]}), "ids").is_err());
    }
}
