use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use stdkit_base::StdkitResult;
use tracing::instrument;

use super::common::{DEFAULT_MAX_DEPTH, check_depth, json_error, validate_max_depth};

/// Parses JSON text into a [`Value`] or a typed structure.
#[derive(Debug, Clone)]
pub struct JsonDecoder {
    max_depth: u32,
    big_int_as_string: bool,
}

impl Default for JsonDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonDecoder {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            big_int_as_string: false,
        }
    }

    /// Limits nesting; 0 allows scalars only.
    pub fn set_max_depth(&mut self, max_depth: u32) -> StdkitResult<&mut Self> {
        self.max_depth = validate_max_depth(max_depth)?;
        Ok(self)
    }

    /// Integers outside the `i64` range decode as strings instead of floats.
    pub fn decode_big_int_as_string(&mut self, enabled: bool) -> &mut Self {
        self.big_int_as_string = enabled;
        self
    }

    #[instrument(skip_all, fields(len = json.len()))]
    pub fn decode(&self, json: &str) -> StdkitResult<Value> {
        let mut value: Value = serde_json::from_str(json).map_err(|e| json_error(e.to_string()))?;
        check_depth(&value, self.max_depth)?;
        self.convert_big_ints(&mut value);
        Ok(value)
    }

    /// Decodes into `T`, after the same checks as [`decode`](Self::decode).
    pub fn decode_into<T: DeserializeOwned>(&self, json: &str) -> StdkitResult<T> {
        let value = self.decode(json)?;
        serde_json::from_value(value).map_err(|e| json_error(e.to_string()))
    }

    fn convert_big_ints(&self, value: &mut Value) {
        match value {
            Value::Array(items) => items.iter_mut().for_each(|item| self.convert_big_ints(item)),
            Value::Object(map) => map.values_mut().for_each(|item| self.convert_big_ints(item)),
            Value::Number(number) => {
                if let Some(replacement) = self.big_int_replacement(number) {
                    *value = replacement;
                }
            }
            _ => {}
        }
    }

    fn big_int_replacement(&self, number: &Number) -> Option<Value> {
        if number.as_i64().is_some() {
            return None;
        }
        let text = number.to_string();
        if text.contains(['.', 'e', 'E']) {
            return None;
        }
        if self.big_int_as_string {
            return Some(Value::String(text));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use stdkit_base::ErrorKind;

    const BIG_INT: &str = "123456789123456789123456789123456789123456789123456789";

    #[test]
    fn test_decode_values() {
        let decoder = JsonDecoder::new();
        assert_eq!(decoder.decode("123").unwrap(), json!(123));
        assert_eq!(decoder.decode(r#""ABC""#).unwrap(), json!("ABC"));
        assert_eq!(decoder.decode(r#"["a", "b"]"#).unwrap(), json!(["a", "b"]));
        assert_eq!(
            decoder.decode(r#"{"a": "b", "c": "d"}"#).unwrap(),
            json!({"a": "b", "c": "d"})
        );
    }

    #[test]
    fn test_decode_invalid_json() {
        let decoder = JsonDecoder::new();
        for json in ["", "{", "[", ",", "[],", "123,", r#""123"#] {
            let err = decoder.decode(json).unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::Json { .. }), "{json:?}");
        }
    }

    #[test]
    fn test_decode_error_carries_codec_message() {
        let err = JsonDecoder::new().decode("[1,").unwrap_err();
        assert!(err.to_string().starts_with("EOF while parsing"), "{err}");
    }

    #[test]
    fn test_big_int_decodes_as_float() {
        let value = JsonDecoder::new().decode(BIG_INT).unwrap();
        let float = value.as_f64().unwrap();
        assert!(value.as_i64().is_none());
        assert_eq!(float, BIG_INT.parse::<f64>().unwrap());
    }

    #[test]
    fn test_big_int_decodes_as_string() {
        let mut decoder = JsonDecoder::new();
        decoder.decode_big_int_as_string(true);
        assert_eq!(decoder.decode(BIG_INT).unwrap(), json!(BIG_INT));
        let nested = format!(r#"{{"id": {BIG_INT}, "small": 5, "ratio": 0.5}}"#);
        assert_eq!(
            decoder.decode(&nested).unwrap(),
            json!({"id": BIG_INT, "small": 5, "ratio": 0.5})
        );
    }

    #[test]
    fn test_max_depth() {
        let cases = [
            ("123", 0, true),
            ("123", 1, true),
            ("[]", 0, false),
            ("[]", 1, true),
            (r#"["a"]"#, 0, false),
            (r#"["a"]"#, 1, true),
            (r#"{"a":[]}"#, 0, false),
            (r#"{"a":[]}"#, 1, false),
            (r#"{"a":[]}"#, 2, true),
            (r#"{"x":{}}"#, 1, false),
            (r#"{"x":{}}"#, 2, true),
        ];
        for (json, max_depth, ok) in cases {
            let mut decoder = JsonDecoder::new();
            decoder.set_max_depth(max_depth).unwrap();
            assert_eq!(decoder.decode(json).is_ok(), ok, "{json} at {max_depth}");
        }
    }

    #[test]
    fn test_invalid_max_depth() {
        let err = JsonDecoder::new().set_max_depth(u32::MAX).unwrap_err();
        assert_eq!(err.to_string(), "Invalid max depth.");
    }

    #[test]
    fn test_decode_into_struct() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Entry {
            a: String,
            c: String,
        }
        let entry: Entry = JsonDecoder::new()
            .decode_into(r#"{"a": "b", "c": "d"}"#)
            .unwrap();
        assert_eq!(
            entry,
            Entry {
                a: "b".to_string(),
                c: "d".to_string()
            }
        );
        let err = JsonDecoder::new().decode_into::<Entry>(r#"{"a": "b"}"#).unwrap_err();
        assert_eq!(err.to_string(), "missing field `c`");
    }
}
