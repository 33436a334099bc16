//! Compact binary cycle log format for looplog.
//!
//! Serializes per-cycle [`Table`](looplog_core::Table) snapshots to a byte
//! stream and reconstructs them, with key interning so every later cycle
//! references a key by a 2-byte ID.
//!
//! # Architecture
//!
//! - [`Encoder`] / [`Decoder`] hold the per-session key-ID interning state
//! - [`CycleWriter`] appends encoded cycles to any `Write` sink
//! - [`CycleReader`] plays cycles back from any `Read` source
//! - [`FileSink`] and [`FileReplay`] adapt those to files for the logger
//!
//! # Format
//!
//! All integers are big-endian.
//!
//! ```text
//! [REVISION u8 = 2]
//! cycle := [0][f64 timestamp]
//!          ([1][u16 id][u16 len][name][u16 len][type])*
//!          ([2][u16 id][u16 len][payload])*
//! ```
//!
//! A timestamp record starts a cycle and terminates the previous one.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod reader;
pub mod replay;
pub mod types;
pub mod writer;

pub use codec::ReadOutcome;
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::CodecError;
pub use reader::{CycleReader, TableIter};
pub use replay::{FileReplay, ReplayPathResolver};
pub use types::KeyDefinition;
pub use writer::{CycleWriter, FileSink, TIMESTAMP_EPSILON};

/// The only log revision this build reads and writes.
pub const REVISION: u8 = 2;

/// Record tag: cycle timestamp.
pub const TAG_TIMESTAMP: u8 = 0;
/// Record tag: key definition.
pub const TAG_KEY: u8 = 1;
/// Record tag: value.
pub const TAG_VALUE: u8 = 2;

/// Conventional file extension of cycle logs.
pub const FILE_EXTENSION: &str = "rlog";
