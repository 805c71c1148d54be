pub mod config;
pub mod fixed_array;
pub mod io;
pub mod iterator;
pub mod json;
pub mod object_storage;
pub mod transfer;

pub use config::{StdkitConfig, load_config};
pub use fixed_array::FixedArray;
pub use iterator::{CsvFileIterator, CsvJsonFileIterator, CsvOptions, Field, Header, NamedRecord, Record};
pub use json::{JsonDecoder, JsonEncoder, JsonEncoderOptions};
pub use object_storage::{ObjectArrayStorage, ObjectStorage};
pub use transfer::{HttpMethod, TransferClient, TransferInfo, TransferInfoKey, TransferOption};
