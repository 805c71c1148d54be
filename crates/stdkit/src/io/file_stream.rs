use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use stdkit_base::catcher::run_io;
use stdkit_base::{ResultExt, StdkitError, StdkitResult};
use tracing::{debug, instrument};

/// An open file, read through a buffer and written in place.
///
/// The mode string follows the `fopen` convention: one of `r`, `w`, `a`, `x`, `c`,
/// optionally followed by `+` (read and write) and `b`/`t` (ignored).
#[derive(Debug)]
pub struct FileStream {
    path: PathBuf,
    inner: BufReader<File>,
}

impl FileStream {
    #[instrument(skip_all, fields(path = %path.as_ref().display(), mode = mode))]
    pub fn open(path: impl AsRef<Path>, mode: &str) -> StdkitResult<Self> {
        let path = path.as_ref();
        let options = parse_mode(mode)?;
        let file = run_io(path, || options.open(path)).context("Failed to open stream.")?;
        debug!("stream opened");
        Ok(Self {
            path: path.to_path_buf(),
            inner: BufReader::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when no more bytes can be read from the current position.
    pub fn eof(&mut self) -> StdkitResult<bool> {
        let inner = &mut self.inner;
        run_io(&self.path, || Ok(inner.fill_buf()?.is_empty()))
    }

    /// Reads one line including its `\n`, or at most `max_length` bytes of it.
    /// Returns an empty vector at end of file.
    pub fn gets(&mut self, max_length: Option<usize>) -> StdkitResult<Vec<u8>> {
        let inner = &mut self.inner;
        run_io(&self.path, || {
            let mut line = Vec::new();
            match max_length {
                Some(max_length) => inner.take(max_length as u64).read_until(b'\n', &mut line)?,
                None => inner.read_until(b'\n', &mut line)?,
            };
            Ok(line)
        })
    }

    /// Reads up to `max_length` bytes. Fewer bytes are returned only at end of file.
    pub fn read(&mut self, max_length: usize) -> StdkitResult<Vec<u8>> {
        let inner = &mut self.inner;
        run_io(&self.path, || {
            let mut data = Vec::with_capacity(max_length.min(64 * 1024));
            inner.take(max_length as u64).read_to_end(&mut data)?;
            Ok(data)
        })
    }

    pub fn write(&mut self, data: &[u8]) -> StdkitResult<()> {
        let path = self.path.clone();
        run_io(&path, || self.write_all(data)).context("Failed to write to stream.")
    }
}

fn parse_mode(mode: &str) -> StdkitResult<OpenOptions> {
    let invalid = || Box::new(StdkitError::invalid_input(format!("Invalid file mode: {mode}")));
    let mut chars = mode.chars();
    let kind = chars.next().ok_or_else(invalid)?;
    let mut plus = false;
    for flag in chars {
        match flag {
            '+' if !plus => plus = true,
            'b' | 't' => {}
            _ => return Err(invalid()),
        }
    }
    let mut options = OpenOptions::new();
    match kind {
        'r' => options.read(true).write(plus),
        'w' => options.write(true).create(true).truncate(true).read(plus),
        'a' => options.append(true).create(true).read(plus),
        'x' => options.write(true).create_new(true).read(plus),
        'c' => options.write(true).create(true).read(plus),
        _ => return Err(invalid()),
    };
    Ok(options)
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for FileStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amount: usize) {
        self.inner.consume(amount)
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Drop read-ahead so the file cursor matches the logical position.
        self.inner.seek(SeekFrom::Current(0))?;
        self.inner.get_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.get_mut().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::file_system::{self, WriteOptions};
    use stdkit_base::ErrorKind;
    use tempfile::TempDir;

    fn file_with(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stream.txt");
        file_system::write(&path, content, WriteOptions::default()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_gets_reads_lines() {
        let (_dir, path) = file_with("first\nsecond\nlast");
        let mut stream = FileStream::open(&path, "r").unwrap();
        assert_eq!(stream.gets(None).unwrap(), b"first\n");
        assert_eq!(stream.gets(Some(3)).unwrap(), b"sec");
        assert_eq!(stream.gets(None).unwrap(), b"ond\n");
        assert!(!stream.eof().unwrap());
        assert_eq!(stream.gets(None).unwrap(), b"last");
        assert!(stream.eof().unwrap());
        assert_eq!(stream.gets(None).unwrap(), b"");
    }

    #[test]
    fn test_read_limits_length() {
        let (_dir, path) = file_with("abcdef");
        let mut stream = FileStream::open(&path, "rb").unwrap();
        assert_eq!(stream.read(4).unwrap(), b"abcd");
        assert_eq!(stream.read(4).unwrap(), b"ef");
        assert_eq!(stream.read(4).unwrap(), b"");
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        let mut stream = FileStream::open(&path, "w+").unwrap();
        stream.write(b"hello ").unwrap();
        stream.write(b"world").unwrap();
        stream.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(stream.read(100).unwrap(), b"hello world");
    }

    #[test]
    fn test_write_after_partial_read_lands_at_logical_position() {
        let (_dir, path) = file_with("0123456789");
        let mut stream = FileStream::open(&path, "r+").unwrap();
        assert_eq!(stream.read(2).unwrap(), b"01");
        stream.write(b"ab").unwrap();
        drop(stream);
        assert_eq!(file_system::read(&path, 0, None).unwrap(), b"01ab456789");
    }

    #[test]
    fn test_append_mode() {
        let (_dir, path) = file_with("start");
        let mut stream = FileStream::open(&path, "a").unwrap();
        stream.write(b"+end").unwrap();
        drop(stream);
        assert_eq!(file_system::read(&path, 0, None).unwrap(), b"start+end");
    }

    #[test]
    fn test_exclusive_mode_refuses_existing_file() {
        let (_dir, path) = file_with("x");
        let err = FileStream::open(&path, "x").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FileError { .. }));
        assert_eq!(err.get_context(), ["Failed to open stream."]);
    }

    #[test]
    fn test_write_to_read_only_stream_fails() {
        let (_dir, path) = file_with("x");
        let mut stream = FileStream::open(&path, "r").unwrap();
        let err = stream.write(b"nope").unwrap_err();
        assert_eq!(err.get_context(), ["Failed to write to stream."]);
    }

    #[test]
    fn test_invalid_modes() {
        let (_dir, path) = file_with("x");
        for mode in ["", "q", "r++", "rz", "+r"] {
            let err = FileStream::open(&path, mode).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::InvalidInput { .. }),
                "mode {mode:?}"
            );
        }
    }
}
