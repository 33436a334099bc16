//! Looplog: deterministic log and replay for periodic robot control loops.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the looplog sub-crates. Adding `looplog` as a single dependency is
//! enough for most control programs.
//!
//! # Quick start
//!
//! ```rust
//! use looplog::prelude::*;
//! use std::time::Duration;
//!
//! #[derive(Default)]
//! struct Encoders {
//!     left: f64,
//! }
//!
//! impl LoggableInputs for Encoders {
//!     fn to_log(&self, table: &mut SubTable<'_>) {
//!         table.put("Left", self.left);
//!     }
//!     fn from_log(&mut self, table: &SubTable<'_>) {
//!         self.left = table.get("Left", self.left);
//!     }
//! }
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut logger = Logger::new(LoggerConfig::default()).unwrap();
//! logger.disable_console_capture();
//! logger.add_sink(Box::new(FileSink::new(dir.path(), "match")));
//! logger.start().unwrap();
//!
//! let mut encoders = Encoders::default();
//! for i in 0..3 {
//!     logger.cycle_before_user();
//!     encoders.left = f64::from(i);
//!     logger.process_inputs("Drive/Encoders", &mut encoders);
//!     logger.record_output("Drive/Command", encoders.left * 0.5);
//!     logger.cycle_after_user(Duration::ZERO, Duration::ZERO);
//! }
//! let report = logger.end();
//! assert!(report.worker_joined);
//! assert!(dir.path().join("match.rlog").exists());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `looplog-core` | `Table`, `Value`, collaborator traits |
//! | [`rlog`] | `looplog-rlog` | R2 binary codec, file sink, file replay |
//! | [`engine`] | `looplog-engine` | `Logger` coordinator and sink pipeline |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Tables, values and collaborator traits (`looplog-core`).
///
/// Contains the per-cycle [`types::Table`], the tagged [`types::Value`],
/// and the traits implemented by sinks, replay sources and input groups.
pub use looplog_core as types;

/// R2 binary log format (`looplog-rlog`).
///
/// Streaming [`rlog::Encoder`] / [`rlog::Decoder`], the
/// [`rlog::FileSink`] writer and the [`rlog::FileReplay`] source.
pub use looplog_rlog as rlog;

/// Cycle coordinator and sink pipeline (`looplog-engine`).
pub use looplog_engine as engine;

/// Common imports for typical looplog usage.
///
/// ```rust
/// use looplog::prelude::*;
/// ```
pub mod prelude {
    // Tables and traits
    pub use looplog_core::{
        FromValue, LogSink, LoggableInputs, ReplaySource, StructCodec, SubTable, Table, Value,
    };

    // File format
    pub use looplog_rlog::{CodecError, FileReplay, FileSink, ReplayPathResolver};

    // Engine
    pub use looplog_engine::{
        ConfigError, ConsoleSource, Logger, LoggerConfig, SessionReport, TimeSource, TimeUnit,
    };
}
