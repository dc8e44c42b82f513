//! RecordReader: reads packed records back out of a compressed stream.
//!
//! NOTE: This module can read from any I/O source that supports the read() call.
//!
use std::io::{ErrorKind, Read};
use std::iter::FusedIterator;

use super::record::{Record, RECORD_LEN};
use crate::error::{PzipError, Result};

const BUFFER_SIZE: usize = 64 * 1024;

/// Buffered reader over a stream of 5 byte records.
#[derive(Debug)]
pub struct RecordReader<R> {
    source: R,
    buffer: Vec<u8>,
    cursor: usize,
    filled: usize,
    /// Stream offset of buffer[cursor], for error reports.
    offset: u64,
    /// Set at end of stream or after a truncated record; nothing more is read.
    done: bool,
}

impl<R: Read> RecordReader<R> {
    /// Creates a new RecordReader with a 64k buffer.
    pub fn new(source: R) -> Self {
        Self {
            source,
            buffer: vec![0; BUFFER_SIZE],
            cursor: 0,
            filled: 0,
            offset: 0,
            done: false,
        }
    }

    /// Make sure at least one whole record is buffered. Returns the number of bytes available,
    /// which is only below RECORD_LEN when the source has run dry.
    fn fill(&mut self) -> Result<usize> {
        if self.filled - self.cursor >= RECORD_LEN {
            return Ok(self.filled - self.cursor);
        }
        // Shift the partial record to the front before reading more
        self.buffer.copy_within(self.cursor..self.filled, 0);
        self.filled -= self.cursor;
        self.cursor = 0;
        while self.filled < RECORD_LEN {
            match self.source.read(&mut self.buffer[self.filled..]) {
                Ok(0) => break,
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(self.filled)
    }

    /// Return the next record, None at a clean end of stream, or an error if the stream stops
    /// part way through a record.
    /// The truncation is reported once; after that the reader stays at end of stream.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.done {
            return Ok(None);
        }
        match self.fill()? {
            0 => {
                self.done = true;
                Ok(None)
            }
            n if n < RECORD_LEN => {
                self.done = true;
                self.cursor = self.filled;
                Err(PzipError::TruncatedRecord {
                    offset: self.offset,
                    len: n,
                })
            }
            _ => {
                let mut raw = [0_u8; RECORD_LEN];
                raw.copy_from_slice(&self.buffer[self.cursor..self.cursor + RECORD_LEN]);
                self.cursor += RECORD_LEN;
                self.offset += RECORD_LEN as u64;
                Ok(Some(Record::unpack(&raw)))
            }
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record>;
    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

impl<R: Read> FusedIterator for RecordReader<R> {}
