//! Collaborator contracts consumed by the logger and the pipeline.

use std::io;

use crate::table::{SubTable, Table};

/// A destination for per-cycle table snapshots (file writer, network
/// server, in-memory recorder).
///
/// Sinks run on the pipeline worker thread, so they may block on I/O.
/// They receive every cycle in timestamp order; failures are reported
/// through the `log` facade and never propagate back to the control loop.
pub trait LogSink: Send {
    /// Called once on the worker thread before the first table.
    fn start(&mut self) {}

    /// Accept one complete cycle snapshot.
    fn put_table(&mut self, table: &Table);

    /// Called once on the worker thread after the last table.
    fn end(&mut self) {}
}

/// A source of recorded cycles driving the logger in replay mode.
pub trait ReplaySource: Send {
    /// Open the underlying recording.
    fn start(&mut self);

    /// Close the underlying recording.
    fn end(&mut self);

    /// Overwrite `table`'s timestamp and recorded entries with the next
    /// cycle and return `true`, or return `false` without touching `table`
    /// once the recording is exhausted.
    fn update(&mut self, table: &mut Table) -> bool;
}

/// A group of inputs that can be captured into, and restored from, a
/// table.
///
/// In live mode the logger calls [`to_log`](Self::to_log); in replay mode it
/// calls [`from_log`](Self::from_log) so the same control code observes the
/// recorded values.
pub trait LoggableInputs {
    /// Write every field into `table`.
    fn to_log(&self, table: &mut SubTable<'_>);

    /// Restore every field from `table`.
    fn from_log(&mut self, table: &SubTable<'_>);
}

/// Byte serialization for a fixed-size user type, published with a
/// schema string so downstream tools can unpack it.
pub trait StructCodec<T> {
    /// Schema type name, without the `struct:` prefix.
    fn type_name(&self) -> &str;

    /// Human-readable schema definition.
    fn schema(&self) -> &str;

    /// Packed size of one value in bytes.
    fn size(&self) -> usize;

    /// Append the packed bytes of `value` to `out`.
    fn pack(&self, value: &T, out: &mut Vec<u8>);

    /// Unpack one value from exactly [`size`](Self::size) bytes.
    fn unpack(&self, bytes: &[u8]) -> Option<T>;
}

/// Supplies console text produced since the previous call.
///
/// The logger polls it once per cycle while console capture is enabled
/// and closes it when the session ends. A closed source is released by
/// the logger and never polled again.
pub trait ConsoleSource: Send {
    /// Text written since the last call; empty if there is none.
    fn new_data(&mut self) -> String;

    /// Stop capturing.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}
