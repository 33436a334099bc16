//! Cycle log playback reader.
//!
//! [`CycleReader`] reads cycles from any `Read` source. Nothing is read
//! until the first call, so constructing a reader never fails.

use std::io::Read;

use looplog_core::Table;

use crate::decoder::Decoder;
use crate::error::CodecError;

/// Reads cycle log data from a byte stream.
///
/// Generic over `R: Read` so tests can use `&[u8]` and production
/// code can use `BufReader<File>`.
pub struct CycleReader<R: Read> {
    reader: R,
    decoder: Decoder,
    tables_read: u64,
}

impl<R: Read> CycleReader<R> {
    /// Reader positioned at the start of a stream.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: Decoder::new(),
            tables_read: 0,
        }
    }

    /// Read the next cycle, or `None` if the stream is exhausted.
    pub fn next_table(&mut self) -> Result<Option<Table>, CodecError> {
        let table = self.decoder.decode_table(&mut self.reader)?;
        if table.is_some() {
            self.tables_read += 1;
        }
        Ok(table)
    }

    /// Number of cycles read so far.
    pub fn tables_read(&self) -> u64 {
        self.tables_read
    }

    /// Convert into a cycle iterator.
    pub fn tables(self) -> TableIter<R> {
        TableIter {
            inner: self,
            done: false,
        }
    }
}

/// Iterator adapter over decoded cycles.
///
/// Yields at most one error, after which iteration ends.
pub struct TableIter<R: Read> {
    inner: CycleReader<R>,
    done: bool,
}

impl<R: Read> Iterator for TableIter<R> {
    type Item = Result<Table, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.inner.next_table() {
            Ok(Some(table)) => Some(Ok(table)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
