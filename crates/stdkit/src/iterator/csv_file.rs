use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::Arc;

use csv::{ByteRecord, StringRecord};
use serde::{Deserialize, Serialize};
use stdkit_base::catcher::run_io;
use stdkit_base::{ErrorKind, StdkitError, StdkitResult};
use tracing::{debug, instrument, warn};

use super::line_tracker::LineTracker;
use super::record::{Field, Header, NamedRecord, Record};

/// How a delimited-text stream is read. Loadable from the `[csv]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// The first row holds column names.
    pub header_row: bool,
    pub delimiter: char,
    pub enclosure: char,
    /// Escape character inside enclosed fields; `None` disables escapes.
    ///
    /// The escape itself is dropped and the character after it kept as is, so `"a\"b"` reads
    /// as `a"b` and `"a\b"` as `ab`. Outside an enclosure it is an ordinary character.
    /// A doubled enclosure (`"a""b"`) always reads as one enclosure character.
    pub escape: Option<char>,
    /// Header mode: rows shorter than the header are padded with [`Field::Absent`].
    pub allow_fewer_columns: bool,
    /// Header mode: fields beyond the header's width are dropped.
    pub allow_more_columns: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            header_row: false,
            delimiter: ',',
            enclosure: '"',
            escape: Some('\\'),
            allow_fewer_columns: false,
            allow_more_columns: false,
        }
    }
}

impl CsvOptions {
    fn reader_builder(&self) -> StdkitResult<csv::ReaderBuilder> {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .double_quote(true)
            .delimiter(ascii_byte("Delimiter", self.delimiter)?)
            .quote(ascii_byte("Enclosure", self.enclosure)?)
            .escape(self.escape.map(|c| ascii_byte("Escape", c)).transpose()?);
        Ok(builder)
    }
}

fn ascii_byte(name: &str, c: char) -> StdkitResult<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(Box::new(StdkitError::invalid_input(format!(
            "{name} must be a single ASCII character, got {c:?}."
        ))))
    }
}

/// Lazily reads records from a delimited-text stream.
///
/// Without a header row every non-blank line is yielded as a [`Record::Row`].
/// With one, the first row is validated and consumed, and every later line is
/// yielded as a [`Record::Named`] of exactly the header's width. Blank lines never
/// produce a record. After the first error the iterator yields nothing more.
pub struct CsvFileIterator<R: Read = File> {
    reader: csv::Reader<LineTracker<R>>,
    options: CsvOptions,
    header: Option<Arc<Header>>,
    line: u64,
    fused: bool,
}

impl CsvFileIterator<File> {
    /// Opens `path` for reading.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, options: CsvOptions) -> StdkitResult<Self> {
        let path = path.as_ref();
        let builder = options.reader_builder()?;
        let file = run_io(path, || File::open(path)).map_err(|cause| {
            Box::new(
                StdkitError::invalid_input(format!(
                    "Cannot open file for reading: {}",
                    path.display()
                ))
                .caused_by(cause),
            )
        })?;
        debug!("opened csv file");
        Ok(Self::with_builder(builder, file, options))
    }
}

impl<R: Read> CsvFileIterator<R> {
    /// Reads from an already open stream, which should be positioned at its start.
    ///
    /// Pass `&mut reader` to keep ownership of the stream.
    pub fn from_reader(reader: R, options: CsvOptions) -> StdkitResult<Self> {
        let builder = options.reader_builder()?;
        Ok(Self::with_builder(builder, reader, options))
    }

    fn with_builder(builder: csv::ReaderBuilder, reader: R, options: CsvOptions) -> Self {
        Self {
            reader: builder.from_reader(LineTracker::new(reader)),
            options,
            header: None,
            line: 0,
            fused: false,
        }
    }

    pub fn allow_fewer_columns(&mut self, enabled: bool) -> &mut Self {
        self.options.allow_fewer_columns = enabled;
        self
    }

    pub fn allow_more_columns(&mut self, enabled: bool) -> &mut Self {
        self.options.allow_more_columns = enabled;
        self
    }

    pub fn options(&self) -> &CsvOptions {
        &self.options
    }

    /// The header, once it has been read.
    pub fn header(&self) -> Option<&Arc<Header>> {
        self.header.as_ref()
    }

    /// Line on which the most recently read row starts; 0 before the first read.
    pub fn line(&self) -> u64 {
        self.line
    }

    fn advance(&mut self) -> StdkitResult<Option<Record>> {
        if self.options.header_row && self.header.is_none() {
            let header = self.read_header()?;
            debug!(columns = header.len(), "read csv header");
            self.header = Some(Arc::new(header));
        }
        // csv skips blank lines itself, so every row read here has at least one field.
        let Some(row) = self.read_row()? else {
            return Ok(None);
        };
        match &self.header {
            None => Ok(Some(Record::Row(row.iter().map(str::to_string).collect()))),
            Some(header) => self.reconcile(header, &row).map(|named| Some(Record::Named(named))),
        }
    }

    fn read_header(&mut self) -> StdkitResult<Header> {
        match self.read_row()? {
            None if self.reader.position().byte() == 0 => Err(Box::new(StdkitError::malformed_input(
                "Expected header row, found EOF.",
            ))),
            None => Err(Box::new(StdkitError::malformed_input("Empty header line."))),
            Some(_) if self.line > 1 => Err(Box::new(StdkitError::malformed_input("Empty header line."))),
            Some(row) => Header::new(row.iter()),
        }
    }

    fn read_row(&mut self) -> StdkitResult<Option<StringRecord>> {
        let resume_offset = self.reader.position().byte();
        let mut record = ByteRecord::new();
        if !self.reader.read_byte_record(&mut record).map_err(csv_error)? {
            return Ok(None);
        }
        self.line = self.reader.get_mut().start_line(resume_offset);
        let line = self.line;
        StringRecord::from_byte_record(record)
            .map(Some)
            .map_err(|e| {
                Box::new(StdkitError::malformed_input(format!(
                    "Invalid UTF-8 on line {line}: {}",
                    e.utf8_error()
                )))
            })
    }

    fn reconcile(&self, header: &Arc<Header>, row: &StringRecord) -> StdkitResult<NamedRecord> {
        let expected = header.len();
        let found = row.len();
        if (found < expected && !self.options.allow_fewer_columns)
            || (found > expected && !self.options.allow_more_columns)
        {
            return Err(Box::new(StdkitError::malformed_input(format!(
                "Expected {expected} columns on line {}, found {found}.",
                self.line
            ))));
        }
        let mut values: Vec<Field> = row.iter().take(expected).map(Field::from).collect();
        values.resize(expected, Field::Absent);
        Ok(NamedRecord::new(Arc::clone(header), values))
    }
}

impl<R: Read + Seek> CsvFileIterator<R> {
    /// Restarts from the beginning of the stream, re-reading the header if there is one.
    ///
    /// Returns false when the stream cannot seek; iteration then carries on from
    /// where it was.
    #[instrument(skip(self))]
    pub fn rewind(&mut self) -> bool {
        if self.reader.position().byte() > 0 {
            if let Err(e) = self.reader.seek(csv::Position::new()) {
                warn!(error = %e, "cannot rewind csv stream, continuing from the current position");
                return false;
            }
        }
        self.header = None;
        self.line = 0;
        self.fused = false;
        debug!("rewound csv stream");
        true
    }
}

impl<R: Read> Iterator for CsvFileIterator<R> {
    type Item = StdkitResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        match self.advance() {
            Ok(record) => record.map(Ok),
            Err(err) => {
                debug!(error = %err, "csv iteration failed");
                self.fused = true;
                Some(Err(err))
            }
        }
    }
}

fn csv_error(err: csv::Error) -> Box<StdkitError> {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => Box::new(StdkitError::new(ErrorKind::Io { source })),
        _ => Box::new(StdkitError::malformed_input(message)),
    }
}
