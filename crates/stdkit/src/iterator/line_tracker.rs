/* 📖 # Why track lines outside of the csv reader?

`csv` reports the position where it resumed reading, which is before any blank lines it
skipped on the way to the next record. Error messages must cite the physical line the
record starts on, so the source is wrapped in a reader that remembers where line
terminators were seen. Only terminators at or after the start of the current record are
kept; older ones are folded into a counter.
*/

use std::collections::VecDeque;
use std::io::{self, Read, Seek, SeekFrom};

pub(crate) struct LineTracker<R> {
    inner: R,
    /// Bytes handed out since construction or the last seek.
    offset: u64,
    /// Offset and byte of every `\r` or `\n` not yet folded into `lines_before`.
    terminators: VecDeque<(u64, u8)>,
    lines_before: u64,
}

impl<R> LineTracker<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            terminators: VecDeque::new(),
            lines_before: 0,
        }
    }

    /// One-based line of the first non-terminator byte at or after `resume_offset`.
    ///
    /// `\n`, `\r\n` and a lone `\r` each end one line.
    pub fn start_line(&mut self, resume_offset: u64) -> u64 {
        while let Some(&(offset, byte)) = self.terminators.front() {
            if offset >= resume_offset {
                break;
            }
            self.terminators.pop_front();
            if self.ends_line(offset, byte, 0) {
                self.lines_before += 1;
            }
        }

        let mut leading = 0;
        for (index, &(offset, byte)) in self.terminators.iter().enumerate() {
            if offset != resume_offset + index as u64 {
                break;
            }
            if self.ends_line(offset, byte, index + 1) {
                leading += 1;
            }
        }
        1 + self.lines_before + leading
    }

    /// Whether the terminator at `offset` ends a line; `next` indexes the entry after it.
    fn ends_line(&self, offset: u64, byte: u8, next: usize) -> bool {
        byte == b'\n'
            || !self
                .terminators
                .get(next)
                .is_some_and(|&(next_offset, next_byte)| next_offset == offset + 1 && next_byte == b'\n')
    }
}

impl<R: Read> Read for LineTracker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        for (index, &byte) in buf[..read].iter().enumerate() {
            if byte == b'\n' || byte == b'\r' {
                self.terminators.push_back((self.offset + index as u64, byte));
            }
        }
        self.offset += read as u64;
        Ok(read)
    }
}

impl<R: Seek> Seek for LineTracker<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let offset = self.inner.seek(pos)?;
        self.offset = offset;
        self.terminators.clear();
        self.lines_before = 0;
        Ok(offset)
    }
}
