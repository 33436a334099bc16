//! Cycle log writer and the file-backed log sink.
//!
//! [`CycleWriter`] streams encoded cycles to any `Write` sink.
//! [`FileSink`] wraps one around a file so the logger's sink pipeline can
//! persist a session.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use looplog_core::{LogSink, Table};

use crate::encoder::Encoder;
use crate::error::CodecError;
use crate::FILE_EXTENSION;

/// A cycle is written only when its timestamp exceeds the last written
/// one by more than this many seconds.
pub const TIMESTAMP_EPSILON: f64 = 1e-12;

/// Writes cycle log data to a byte stream.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and production
/// code can use `BufWriter<File>`. Cycles whose timestamp does not advance
/// past the last written one (see [`TIMESTAMP_EPSILON`]) are skipped.
///
/// # Examples
///
/// ```
/// use looplog_core::Table;
/// use looplog_rlog::{CycleReader, CycleWriter};
///
/// let mut writer = CycleWriter::new(Vec::new());
/// for step in 1..=3 {
///     let mut table = Table::new(f64::from(step) * 0.02);
///     table.put("Step", i64::from(step));
///     writer.write_table(&table).unwrap();
/// }
/// // Same timestamp again: not written.
/// assert!(!writer.write_table(&Table::new(0.06)).unwrap());
/// assert_eq!(writer.cycles_written(), 3);
///
/// let bytes = writer.into_inner();
/// let steps: Vec<i64> = CycleReader::new(bytes.as_slice())
///     .tables()
///     .map(|t| t.unwrap().get("Step", 0i64))
///     .collect();
/// assert_eq!(steps, vec![1, 2, 3]);
/// ```
pub struct CycleWriter<W: Write> {
    writer: W,
    encoder: Encoder,
    last_timestamp: f64,
    cycles_written: u64,
}

impl<W: Write> CycleWriter<W> {
    /// Create a writer at the start of a fresh stream.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            encoder: Encoder::new(),
            last_timestamp: f64::NEG_INFINITY,
            cycles_written: 0,
        }
    }

    /// Encode and write `table` as the next cycle.
    ///
    /// Returns `Ok(false)` when the cycle was skipped because its timestamp
    /// did not advance or is not finite.
    pub fn write_table(&mut self, table: &Table) -> Result<bool, CodecError> {
        let timestamp = table.timestamp();
        if !timestamp.is_finite() {
            log::warn!("cycle with non-finite timestamp {timestamp} not logged");
            return Ok(false);
        }
        if timestamp <= self.last_timestamp + TIMESTAMP_EPSILON {
            return Ok(false);
        }
        let bytes = self.encoder.encode_cycle(table)?;
        self.writer.write_all(&bytes)?;
        self.last_timestamp = timestamp;
        self.cycles_written += 1;
        Ok(true)
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of cycles written so far.
    pub fn cycles_written(&self) -> u64 {
        self.cycles_written
    }

    /// Consume the writer and return the underlying `Write` sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

// ── File sink ───────────────────────────────────────────────────

/// Log sink that persists every cycle to a `.rlog` file.
///
/// The file is (re)created on [`start`](LogSink::start), so each session
/// gets a fresh stream with its own revision byte and key interning.
/// Failures are reported through the `log` facade; a sink never panics
/// the pipeline worker.
pub struct FileSink {
    path: PathBuf,
    writer: Option<CycleWriter<BufWriter<File>>>,
}

impl FileSink {
    /// Sink writing `folder/file_name`, with `.rlog` appended to the file
    /// name when missing.
    pub fn new(folder: impl AsRef<Path>, file_name: &str) -> Self {
        let suffix = format!(".{FILE_EXTENSION}");
        let file_name = if file_name.ends_with(&suffix) {
            file_name.to_owned()
        } else {
            format!("{file_name}{suffix}")
        };
        Self {
            path: folder.as_ref().join(file_name),
            writer: None,
        }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> std::io::Result<CycleWriter<BufWriter<File>>> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        Ok(CycleWriter::new(BufWriter::new(file)))
    }
}

impl LogSink for FileSink {
    fn start(&mut self) {
        match self.open() {
            Ok(writer) => {
                log::info!("cycle log writer started: {}", self.path.display());
                self.writer = Some(writer);
            }
            Err(e) => log::error!("error opening log file {}: {e}", self.path.display()),
        }
    }

    fn put_table(&mut self, table: &Table) {
        let Some(writer) = self.writer.as_mut() else {
            log::error!("file sink must be started before it accepts tables");
            return;
        };
        if let Err(e) = writer.write_table(table) {
            log::error!("error writing {}: {e}", self.path.display());
        }
    }

    fn end(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                log::error!("error closing log file {}: {e}", self.path.display());
            }
        }
    }
}
