pub mod buffered_writer;
pub mod file_stream;
pub mod file_system;

pub use buffered_writer::BufferedWriter;
pub use file_stream::FileStream;
pub use file_system::WriteOptions;
