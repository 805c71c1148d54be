/* 📖 # Why route everything through serde_json::Value?

serde_json does the parsing and the serialization. The options offered here
(depth limits, forced objects, numeric strings, oversized integers) are all properties
of the document tree, so they are applied to a `Value` between serde_json and the caller.
Escaping is the exception: it is a property of the output text, so it lives in
[`formatter`] and is applied while serde_json writes.
*/

mod common;
pub mod decoder;
pub mod encoder;
mod formatter;

pub use common::DEFAULT_MAX_DEPTH;
pub use decoder::JsonDecoder;
pub use encoder::{JsonEncoder, JsonEncoderOptions};
