pub mod csv_file;
pub mod csv_json_file;
mod line_tracker;
pub mod record;

pub use csv_file::{CsvFileIterator, CsvOptions};
pub use csv_json_file::CsvJsonFileIterator;
pub use record::{Field, Header, NamedRecord, Record};
