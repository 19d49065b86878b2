//! Cache Key Module
//!
//! Canonical, order-independent keys for a function name plus its parameters.

use std::fmt;

use serde::{ser, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

/// Separator between `name:value` pairs.
const PAIR_SEPARATOR: &str = "|";

// == Generate Cache Key ==
/// Builds the cache key for a call of `function_name` with `params`.
///
/// Parameters must serialize to a map of named values (a struct or a map with
/// string keys); unit or an empty map yields the bare function name. Pairs are
/// sorted by name and values rendered as JSON, so
/// `getUserProfile` with `{ userId: "u1" }` becomes `getUserProfile:userId:"u1"`.
///
/// Names made of anything other than ASCII letters, digits, `_`, `-`, `.` or
/// `$` are rendered as JSON strings. NaN and infinite floats are rejected
/// since JSON would render them as `null`.
pub fn generate_cache_key<P>(function_name: &str, params: &P) -> Result<String>
where
    P: Serialize + ?Sized,
{
    let key_error = |reason: String| CacheError::KeyGeneration {
        function: function_name.to_string(),
        reason,
    };

    params
        .serialize(FiniteCheck)
        .map_err(|err| key_error(err.to_string()))?;
    let value = serde_json::to_value(params).map_err(|err| key_error(err.to_string()))?;

    let fields = match value {
        Value::Null => return Ok(function_name.to_string()),
        Value::Object(fields) => fields,
        other => {
            return Err(key_error(format!(
                "parameters must be a map of named values, got {}",
                kind(&other)
            )))
        }
    };

    if fields.is_empty() {
        return Ok(function_name.to_string());
    }

    let mut pairs: Vec<(&String, &Value)> = fields.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let serialized = pairs
        .into_iter()
        .map(|(name, value)| format!("{}:{}", render_name(name), canonical_json(value)))
        .collect::<Vec<_>>()
        .join(PAIR_SEPARATOR);

    Ok(format!("{}:{}", function_name, serialized))
}

/// Bare parameter name when it cannot be confused with the separators,
/// otherwise a quoted JSON string.
fn render_name(name: &str) -> String {
    let bare = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '$'));
    if bare {
        name.to_string()
    } else {
        Value::from(name).to_string()
    }
}

/// Renders JSON with object keys sorted at every level.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(fields) => {
            let mut pairs: Vec<(&String, &Value)> = fields.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            let body = pairs
                .into_iter()
                .map(|(name, value)| format!("{}:{}", Value::from(name.as_str()), canonical_json(value)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{}}}", body)
        }
        Value::Array(items) => {
            let body = items.iter().map(canonical_json).collect::<Vec<_>>().join(",");
            format!("[{}]", body)
        }
        scalar => scalar.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a map",
    }
}

// == Finite Check ==
#[derive(Debug)]
struct NonFinite(String);

impl fmt::Display for NonFinite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for NonFinite {}

impl ser::Error for NonFinite {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        NonFinite(msg.to_string())
    }
}

/// Walks a value without producing output and fails on NaN or infinite floats.
#[derive(Clone, Copy)]
struct FiniteCheck;

impl FiniteCheck {
    fn float(value: f64) -> std::result::Result<(), NonFinite> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(NonFinite(format!("non-finite number {} has no JSON form", value)))
        }
    }
}

type CheckResult = std::result::Result<(), NonFinite>;

impl ser::Serializer for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _v: bool) -> CheckResult {
        Ok(())
    }
    fn serialize_i8(self, _v: i8) -> CheckResult {
        Ok(())
    }
    fn serialize_i16(self, _v: i16) -> CheckResult {
        Ok(())
    }
    fn serialize_i32(self, _v: i32) -> CheckResult {
        Ok(())
    }
    fn serialize_i64(self, _v: i64) -> CheckResult {
        Ok(())
    }
    fn serialize_u8(self, _v: u8) -> CheckResult {
        Ok(())
    }
    fn serialize_u16(self, _v: u16) -> CheckResult {
        Ok(())
    }
    fn serialize_u32(self, _v: u32) -> CheckResult {
        Ok(())
    }
    fn serialize_u64(self, _v: u64) -> CheckResult {
        Ok(())
    }
    fn serialize_f32(self, v: f32) -> CheckResult {
        Self::float(f64::from(v))
    }
    fn serialize_f64(self, v: f64) -> CheckResult {
        Self::float(v)
    }
    fn serialize_char(self, _v: char) -> CheckResult {
        Ok(())
    }
    fn serialize_str(self, _v: &str) -> CheckResult {
        Ok(())
    }
    fn serialize_bytes(self, _v: &[u8]) -> CheckResult {
        Ok(())
    }
    fn serialize_none(self) -> CheckResult {
        Ok(())
    }
    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> CheckResult {
        value.serialize(self)
    }
    fn serialize_unit(self) -> CheckResult {
        Ok(())
    }
    fn serialize_unit_struct(self, _name: &'static str) -> CheckResult {
        Ok(())
    }
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> CheckResult {
        Ok(())
    }
    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> CheckResult {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> CheckResult {
        value.serialize(self)
    }
    fn serialize_seq(self, _len: Option<usize>) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_tuple(self, _len: usize) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_map(self, _len: Option<usize>) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> CheckResult {
        key.serialize(*self)
    }
    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct ProfileParams<'a> {
        #[serde(rename = "userId")]
        user_id: &'a str,
    }

    #[test]
    fn test_key_for_single_param() {
        let key = generate_cache_key("getUserProfile", &ProfileParams { user_id: "u1" }).unwrap();
        assert_eq!(key, r#"getUserProfile:userId:"u1""#);
    }

    #[test]
    fn test_key_is_order_independent() {
        let ab = generate_cache_key("f", &json!({"a": 1, "b": 2})).unwrap();
        let ba = generate_cache_key("f", &json!({"b": 2, "a": 1})).unwrap();

        assert_eq!(ab, ba);
        assert_eq!(ab, "f:a:1|b:2");
    }

    #[test]
    fn test_key_from_hash_map_is_sorted() {
        let mut params = HashMap::new();
        params.insert("zeta", "z");
        params.insert("alpha", "a");
        params.insert("mid", "m");

        let key = generate_cache_key("search", &params).unwrap();
        assert_eq!(key, r#"search:alpha:"a"|mid:"m"|zeta:"z""#);
    }

    #[test]
    fn test_key_distinguishes_value_types() {
        let number = generate_cache_key("f", &json!({"id": 1})).unwrap();
        let string = generate_cache_key("f", &json!({"id": "1"})).unwrap();

        assert_ne!(number, string);
    }

    #[test]
    fn test_key_distinguishes_function_names() {
        let params = json!({"id": 1});
        assert_ne!(
            generate_cache_key("getUser", &params).unwrap(),
            generate_cache_key("getOrder", &params).unwrap()
        );
    }

    #[test]
    fn test_key_nested_values_are_canonical() {
        let one = generate_cache_key("f", &json!({"filter": {"x": 1, "y": [1, 2]}})).unwrap();
        let two = generate_cache_key("f", &json!({"filter": {"y": [1, 2], "x": 1}})).unwrap();

        assert_eq!(one, two);
        assert_eq!(one, r#"f:filter:{"x":1,"y":[1,2]}"#);
    }

    #[test]
    fn test_key_without_params() {
        assert_eq!(generate_cache_key("listUserProfiles", &()).unwrap(), "listUserProfiles");
        assert_eq!(generate_cache_key("listUserProfiles", &json!({})).unwrap(), "listUserProfiles");
    }

    #[test]
    fn test_key_rejects_bare_scalar() {
        let result = generate_cache_key("f", &42);
        assert!(matches!(result, Err(CacheError::KeyGeneration { .. })));
    }

    #[test]
    fn test_key_rejects_non_string_map_keys() {
        let mut params = HashMap::new();
        params.insert(vec![1u8], "v");

        let result = generate_cache_key("f", &params);
        assert!(matches!(result, Err(CacheError::KeyGeneration { .. })));
    }

    #[test]
    fn test_key_is_deterministic() {
        let params = json!({"page": 2, "role": "trainer"});
        let first = generate_cache_key("listUserProfiles", &params).unwrap();
        for _ in 0..10 {
            assert_eq!(generate_cache_key("listUserProfiles", &params).unwrap(), first);
        }
    }

    #[test]
    fn test_key_quotes_names_with_separators() {
        let plain = generate_cache_key("f", &json!({"a": "x", "b": 1})).unwrap();
        let smuggled = generate_cache_key("f", &json!({"a:\"x\"|b": 1})).unwrap();

        assert_eq!(plain, r#"f:a:"x"|b:1"#);
        assert_eq!(smuggled, r#"f:"a:\"x\"|b":1"#);
        assert_ne!(plain, smuggled);
    }

    #[test]
    fn test_key_rejects_non_finite_numbers() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut params = HashMap::new();
            params.insert("x", bad);
            let result = generate_cache_key("f", &params);
            assert!(matches!(result, Err(CacheError::KeyGeneration { .. })));
        }

        let nested = generate_cache_key("f", &json!({"x": null}));
        assert_eq!(nested.unwrap(), "f:x:null");

        let mut params = HashMap::new();
        params.insert("x", vec![Some(1.5f32), Some(f32::NAN)]);
        assert!(generate_cache_key("f", &params).is_err());
    }
}
