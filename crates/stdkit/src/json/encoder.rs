use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use stdkit_base::StdkitResult;
use stdkit_base::catcher;
use tracing::{debug, instrument};

use super::common::{DEFAULT_MAX_DEPTH, check_depth, json_error, validate_max_depth};
use super::formatter::EncodingFormatter;

/// Every encoder toggle, loadable from the `[json]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonEncoderOptions {
    /// `<` and `>` become `\u003C` and `\u003E`.
    pub escape_tags: bool,
    /// `&` becomes `\u0026`.
    pub escape_ampersands: bool,
    /// `'` becomes `\u0027`.
    pub escape_apostrophes: bool,
    /// `"` becomes `\u0022` instead of `\"`.
    pub escape_quotes: bool,
    /// Arrays are written as objects keyed `"0"`, `"1"`, ...
    pub force_object: bool,
    /// Strings holding a number are written as that number.
    pub encode_numeric_strings_as_numbers: bool,
    /// Four-space indentation and one value per line.
    pub pretty_print: bool,
    /// `/` becomes `\/`.
    pub escape_slashes: bool,
    /// Non-ASCII characters become `\uXXXX` escapes.
    pub escape_unicode: bool,
    /// U+2028 and U+2029 are escaped even when `escape_unicode` is off.
    pub escape_line_terminators: bool,
    /// Floats with a zero fraction keep their `.0`.
    pub preserve_zero_fraction: bool,
}

impl Default for JsonEncoderOptions {
    fn default() -> Self {
        Self {
            escape_tags: false,
            escape_ampersands: false,
            escape_apostrophes: false,
            escape_quotes: false,
            force_object: false,
            encode_numeric_strings_as_numbers: false,
            pretty_print: false,
            escape_slashes: true,
            escape_unicode: true,
            escape_line_terminators: true,
            preserve_zero_fraction: false,
        }
    }
}

/// Serializes values to JSON text under a set of named options.
#[derive(Debug, Clone)]
pub struct JsonEncoder {
    options: JsonEncoderOptions,
    max_depth: u32,
}

impl Default for JsonEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonEncoder {
    pub fn new() -> Self {
        Self::with_options(JsonEncoderOptions::default())
    }

    pub fn with_options(options: JsonEncoderOptions) -> Self {
        Self {
            options,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn options(&self) -> &JsonEncoderOptions {
        &self.options
    }

    /// Limits nesting; 0 allows scalars only.
    pub fn set_max_depth(&mut self, max_depth: u32) -> StdkitResult<&mut Self> {
        self.max_depth = validate_max_depth(max_depth)?;
        Ok(self)
    }

    pub fn escape_tags(&mut self, enabled: bool) -> &mut Self {
        self.options.escape_tags = enabled;
        self
    }

    pub fn escape_ampersands(&mut self, enabled: bool) -> &mut Self {
        self.options.escape_ampersands = enabled;
        self
    }

    pub fn escape_apostrophes(&mut self, enabled: bool) -> &mut Self {
        self.options.escape_apostrophes = enabled;
        self
    }

    pub fn escape_quotes(&mut self, enabled: bool) -> &mut Self {
        self.options.escape_quotes = enabled;
        self
    }

    pub fn force_object(&mut self, enabled: bool) -> &mut Self {
        self.options.force_object = enabled;
        self
    }

    pub fn encode_numeric_strings_as_numbers(&mut self, enabled: bool) -> &mut Self {
        self.options.encode_numeric_strings_as_numbers = enabled;
        self
    }

    pub fn pretty_print(&mut self, enabled: bool) -> &mut Self {
        self.options.pretty_print = enabled;
        self
    }

    pub fn escape_slashes(&mut self, enabled: bool) -> &mut Self {
        self.options.escape_slashes = enabled;
        self
    }

    pub fn escape_unicode(&mut self, enabled: bool) -> &mut Self {
        self.options.escape_unicode = enabled;
        self
    }

    pub fn escape_line_terminators(&mut self, enabled: bool) -> &mut Self {
        self.options.escape_line_terminators = enabled;
        self
    }

    pub fn preserve_zero_fraction(&mut self, enabled: bool) -> &mut Self {
        self.options.preserve_zero_fraction = enabled;
        self
    }

    #[instrument(skip_all, fields(max_depth = self.max_depth))]
    pub fn encode<T: Serialize + ?Sized>(&self, data: &T) -> StdkitResult<String> {
        catcher::run(|| {
            let mut value = serde_json::to_value(data).map_err(|e| json_error(e.to_string()))?;
            check_depth(&value, self.max_depth)?;
            if self.options.force_object || self.options.encode_numeric_strings_as_numbers {
                self.rewrite(&mut value);
            }
            let mut out = Vec::new();
            let mut serializer =
                serde_json::Serializer::with_formatter(&mut out, EncodingFormatter::new(&self.options));
            value
                .serialize(&mut serializer)
                .map_err(|e| json_error(e.to_string()))?;
            debug!(len = out.len(), "encoded json");
            String::from_utf8(out).map_err(|e| json_error(e.to_string()))
        })
    }

    fn rewrite(&self, value: &mut Value) {
        match value {
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.rewrite(item);
                }
                if self.options.force_object {
                    let map: Map<String, Value> = std::mem::take(items)
                        .into_iter()
                        .enumerate()
                        .map(|(index, item)| (index.to_string(), item))
                        .collect();
                    *value = Value::Object(map);
                }
            }
            Value::Object(map) => {
                for item in map.values_mut() {
                    self.rewrite(item);
                }
            }
            Value::String(text) if self.options.encode_numeric_strings_as_numbers => {
                if let Some(number) = numeric_string(text) {
                    *value = Value::Number(number);
                }
            }
            _ => {}
        }
    }
}

/// Parses strings such as `"42"`, `" -1.5"` or `"1e3"`; anything else is left as text.
fn numeric_string(text: &str) -> Option<Number> {
    let trimmed = text.trim();
    if trimmed.is_empty()
        || !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return None;
    }
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Some(Number::from(integer));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|float| float.is_finite())
        .and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};
    use stdkit_base::ErrorKind;

    fn encode_with(configure: impl FnOnce(&mut JsonEncoder), value: &Value) -> String {
        let mut encoder = JsonEncoder::new();
        configure(&mut encoder);
        encoder.encode(value).unwrap()
    }

    #[test]
    fn test_encode_scalars_and_arrays() {
        let encoder = JsonEncoder::new();
        assert_eq!(encoder.encode(&123).unwrap(), "123");
        assert_eq!(encoder.encode("ABC").unwrap(), r#""ABC""#);
        assert_eq!(encoder.encode(&["a", "b"]).unwrap(), r#"["a","b"]"#);
    }

    #[test]
    fn test_encode_unsupported_map_keys_fails() {
        let mut map = HashMap::new();
        map.insert((1, 2), "pair");
        let err = JsonEncoder::new().encode(&map).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Json { .. }));
        assert_eq!(err.to_string(), "key must be a string");
    }

    #[test]
    fn test_encode_panicking_serializer_is_an_error() {
        struct Exploding;
        impl Serialize for Exploding {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                panic!("cannot serialize")
            }
        }
        let err = JsonEncoder::new().encode(&Exploding).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Panic { .. }));
        assert_eq!(err.to_string(), "Panicked: cannot serialize");
    }

    #[test]
    fn test_escape_tags() {
        let value = json!("<test>");
        assert_eq!(encode_with(|_| {}, &value), r#""<test>""#);
        assert_eq!(encode_with(|e| { e.escape_tags(true); }, &value), r#""\u003Ctest\u003E""#);
    }

    #[test]
    fn test_escape_ampersands() {
        let value = json!("Cats & dogs");
        assert_eq!(encode_with(|_| {}, &value), r#""Cats & dogs""#);
        assert_eq!(encode_with(|e| { e.escape_ampersands(true); }, &value), r#""Cats \u0026 dogs""#);
    }

    #[test]
    fn test_escape_apostrophes() {
        let value = json!("John's car");
        assert_eq!(encode_with(|_| {}, &value), r#""John's car""#);
        assert_eq!(encode_with(|e| { e.escape_apostrophes(true); }, &value), r#""John\u0027s car""#);
    }

    #[test]
    fn test_escape_quotes() {
        let value = json!("She said \"yes\"");
        assert_eq!(encode_with(|_| {}, &value), r#""She said \"yes\"""#);
        assert_eq!(encode_with(|e| { e.escape_quotes(true); }, &value), r#""She said \u0022yes\u0022""#);
    }

    #[test]
    fn test_force_object() {
        let value = json!(["a", "b"]);
        assert_eq!(encode_with(|_| {}, &value), r#"["a","b"]"#);
        assert_eq!(encode_with(|e| { e.force_object(true); }, &value), r#"{"0":"a","1":"b"}"#);
        let nested = json!({"list": [[1], []]});
        assert_eq!(
            encode_with(|e| { e.force_object(true); }, &nested),
            r#"{"list":{"0":{"0":1},"1":{}}}"#
        );
    }

    #[test]
    fn test_force_object_keeps_index_order_past_ten() {
        let value: Value = (0..12).collect::<Vec<_>>().into();
        let encoded = encode_with(|e| { e.force_object(true); }, &value);
        assert!(encoded.starts_with(r#"{"0":0,"1":1,"2":2,"#), "{encoded}");
        assert!(encoded.ends_with(r#""10":10,"11":11}"#), "{encoded}");
    }

    #[test]
    fn test_numeric_strings_as_numbers() {
        let value = json!(["123", "-1.5", "1e3", "12abc", "", "1.0"]);
        assert_eq!(encode_with(|_| {}, &value), r#"["123","-1.5","1e3","12abc","","1.0"]"#);
        assert_eq!(
            encode_with(|e| { e.encode_numeric_strings_as_numbers(true); }, &value),
            r#"[123,-1.5,1000,"12abc","",1]"#
        );
    }

    #[test]
    fn test_escape_slashes() {
        let value = json!("a/b");
        assert_eq!(encode_with(|_| {}, &value), r#""a\/b""#);
        assert_eq!(encode_with(|e| { e.escape_slashes(false); }, &value), r#""a/b""#);
    }

    #[test]
    fn test_escape_unicode() {
        let value = json!("é😀");
        assert_eq!(encode_with(|_| {}, &value), r#""\u00e9\ud83d\ude00""#);
        assert_eq!(encode_with(|e| { e.escape_unicode(false); }, &value), "\"é😀\"");
    }

    #[test]
    fn test_escape_line_terminators() {
        let value = json!("a\u{2028}b\u{2029}");
        assert_eq!(
            encode_with(|e| { e.escape_unicode(false); }, &value),
            r#""a\u2028b\u2029""#
        );
        assert_eq!(
            encode_with(|e| { e.escape_unicode(false).escape_line_terminators(false); }, &value),
            "\"a\u{2028}b\u{2029}\""
        );
    }

    #[test]
    fn test_preserve_zero_fraction() {
        let value = json!([1.0, 2.5, 3]);
        assert_eq!(encode_with(|_| {}, &value), "[1,2.5,3]");
        assert_eq!(encode_with(|e| { e.preserve_zero_fraction(true); }, &value), "[1.0,2.5,3]");
    }

    #[test]
    fn test_escapes_apply_to_keys() {
        let value = json!({"</a>": 1});
        assert_eq!(encode_with(|e| { e.escape_tags(true); }, &value), r#"{"\u003C\/a\u003E":1}"#);
    }

    #[test]
    fn test_pretty_print() {
        let mut data = BTreeMap::new();
        data.insert("name", json!("stdkit"));
        data.insert("tags", json!(["a", "b"]));
        data.insert("empty", json!([]));
        let mut encoder = JsonEncoder::new();
        encoder.pretty_print(true);
        expect![[r#"
            {
                "empty": [],
                "name": "stdkit",
                "tags": [
                    "a",
                    "b"
                ]
            }"#]]
        .assert_eq(&encoder.encode(&data).unwrap());
    }

    #[test]
    fn test_max_depth() {
        let mut encoder = JsonEncoder::new();
        encoder.set_max_depth(1).unwrap();
        assert_eq!(encoder.encode(&json!([1, 2])).unwrap(), "[1,2]");
        let err = encoder.encode(&json!([[1]])).unwrap_err();
        assert_eq!(err.to_string(), "Maximum stack depth exceeded");
        encoder.set_max_depth(0).unwrap();
        assert_eq!(encoder.encode(&json!("scalar")).unwrap(), r#""scalar""#);
        assert!(encoder.encode(&json!([])).is_err());
    }

    #[test]
    fn test_invalid_max_depth() {
        let mut encoder = JsonEncoder::new();
        let err = encoder.set_max_depth(0x7fff_ffff).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidInput { .. }));
        assert_eq!(err.to_string(), "Invalid max depth.");
    }

    #[test]
    fn test_options_from_toml_defaults() {
        let options: JsonEncoderOptions = toml::from_str("escape_tags = true").unwrap();
        assert!(options.escape_tags);
        assert!(options.escape_slashes);
        assert!(options.escape_unicode);
        assert!(!options.pretty_print);
        let encoder = JsonEncoder::with_options(options);
        assert_eq!(encoder.encode("<b>").unwrap(), r#""\u003Cb\u003E""#);
    }
}
