use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use serde_json::Value;
use stdkit_base::catcher::run_io;
use stdkit_base::{ErrorKind, ResultExt, StdkitError, StdkitResult};
use tracing::{debug, instrument, warn};

use crate::json::JsonDecoder;

/// Reads lines whose comma-separated fields are JSON values, such as `1, "two", [3]`.
///
/// Each line is decoded as the contents of a JSON array and yielded with its
/// one-based line number. A blank line yields no values.
pub struct CsvJsonFileIterator<R: Read = File> {
    reader: BufReader<R>,
    decoder: JsonDecoder,
    next_line: u64,
    fused: bool,
}

impl CsvJsonFileIterator<File> {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> StdkitResult<Self> {
        let path = path.as_ref();
        let file = run_io(path, || File::open(path)).map_err(|cause| {
            Box::new(
                StdkitError::invalid_input(format!(
                    "Cannot open file for reading: {}",
                    path.display()
                ))
                .caused_by(cause),
            )
        })?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> CsvJsonFileIterator<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            decoder: JsonDecoder::new(),
            next_line: 1,
            fused: false,
        }
    }

    /// Decoder used for every line, e.g. to change its depth limit.
    pub fn decoder_mut(&mut self) -> &mut JsonDecoder {
        &mut self.decoder
    }

    fn read_line(&mut self) -> StdkitResult<Option<(u64, Vec<Value>)>> {
        let mut bytes = Vec::new();
        let read = self
            .reader
            .read_until(b'\n', &mut bytes)
            .map_err(|source| Box::new(StdkitError::new(ErrorKind::Io { source })))?;
        if read == 0 {
            return Ok(None);
        }
        let line = self.next_line;
        self.next_line += 1;
        let text = String::from_utf8(bytes).map_err(|e| {
            Box::new(StdkitError::malformed_input(format!(
                "Invalid UTF-8 on line {line}: {e}"
            )))
        })?;
        let values = match self
            .decoder
            .decode(&format!("[{text}]"))
            .with_context(|| format!("Invalid JSON on line {line}"))?
        {
            Value::Array(values) => values,
            other => vec![other],
        };
        Ok(Some((line, values)))
    }
}

impl<R: Read + Seek> CsvJsonFileIterator<R> {
    /// Restarts from the first line. Returns false when the stream cannot seek.
    #[instrument(skip(self))]
    pub fn rewind(&mut self) -> bool {
        if self.next_line > 1 {
            if let Err(e) = self.reader.seek(SeekFrom::Start(0)) {
                warn!(error = %e, "cannot rewind stream, continuing from the current position");
                return false;
            }
        }
        self.next_line = 1;
        self.fused = false;
        debug!("rewound csv-json stream");
        true
    }
}

impl<R: Read> Iterator for CsvJsonFileIterator<R> {
    type Item = StdkitResult<(u64, Vec<Value>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        match self.read_line() {
            Ok(entry) => entry.map(Ok),
            Err(err) => {
                self.fused = true;
                Some(Err(err))
            }
        }
    }
}
