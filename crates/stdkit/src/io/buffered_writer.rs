use std::io::{self, Write};

use stdkit_base::{ErrorKind, StdkitError, StdkitResult};
use tracing::{debug, warn};

use super::FileStream;

/// Default buffer size: 1 MiB.
pub const DEFAULT_CAPACITY: usize = 1024 * 1024;

/// Collects small writes and hands them to the underlying writer in large chunks.
///
/// The buffer is written out as soon as it reaches the configured size, and on
/// [`flush`](Self::flush). Data still pending when the writer is dropped is lost,
/// and a warning is logged.
pub struct BufferedWriter<W: Write = FileStream> {
    writer: W,
    capacity: usize,
    buffer: Vec<u8>,
}

impl<W: Write> BufferedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        Self {
            writer,
            capacity,
            buffer: Vec::new(),
        }
    }

    pub fn write(&mut self, data: &[u8]) -> StdkitResult<()> {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() >= self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes out everything buffered so far.
    ///
    /// On failure only the bytes the writer did not accept stay buffered, so a
    /// retried flush continues where the failed one stopped.
    pub fn flush(&mut self) -> StdkitResult<()> {
        debug!(pending = self.buffer.len(), "flushing buffered writer");
        self.drain_buffer()
            .and_then(|()| self.writer.flush())
            .map_err(|source| {
                Box::new(StdkitError::new(ErrorKind::Io { source }).context("Failed to write to stream."))
            })
    }

    fn drain_buffer(&mut self) -> io::Result<()> {
        while !self.buffer.is_empty() {
            match self.writer.write(&self.buffer) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole buffer",
                    ));
                }
                Ok(written) => {
                    self.buffer.drain(..written);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Number of bytes waiting to be written.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }
}

impl<W: Write> Drop for BufferedWriter<W> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            warn!(pending = self.buffer.len(), "buffered writer dropped with unflushed data");
        }
    }
}
