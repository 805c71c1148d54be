use serde_json::Value;
use stdkit_base::{ErrorKind, StdkitError, StdkitResult};

/// Nesting allowed when no limit is configured.
pub const DEFAULT_MAX_DEPTH: u32 = 512;

/// The limit plus one must still fit in a signed 32-bit integer.
const MAX_DEPTH_LIMIT: u32 = 0x7fff_ffff;

pub(crate) fn validate_max_depth(max_depth: u32) -> StdkitResult<u32> {
    if max_depth >= MAX_DEPTH_LIMIT {
        return Err(Box::new(StdkitError::invalid_input("Invalid max depth.")));
    }
    Ok(max_depth)
}

/// Fails when `value` nests arrays and objects deeper than `max_depth`.
///
/// Scalars have depth 0; every array or object, empty or not, adds one level.
pub(crate) fn check_depth(value: &Value, max_depth: u32) -> StdkitResult<()> {
    if exceeds_depth(value, max_depth) {
        return Err(json_error("Maximum stack depth exceeded"));
    }
    Ok(())
}

fn exceeds_depth(value: &Value, allowed: u32) -> bool {
    match value {
        Value::Array(items) => allowed == 0 || items.iter().any(|v| exceeds_depth(v, allowed - 1)),
        Value::Object(map) => allowed == 0 || map.values().any(|v| exceeds_depth(v, allowed - 1)),
        _ => false,
    }
}

pub(crate) fn json_error(message: impl Into<String>) -> Box<StdkitError> {
    Box::new(StdkitError::new(ErrorKind::Json {
        message: message.into(),
    }))
}
