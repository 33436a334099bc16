//! Cycle coordinator and sink pipeline for looplog.
//!
//! Provides the [`Logger`] that advances a control loop's table every
//! cycle, in live or replay mode, and the bounded [`SinkPipeline`] that
//! ships each cycle's snapshot to the registered sinks on a background
//! thread without ever blocking the loop.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod console;
pub mod logger;
pub mod pipeline;
pub mod timing;

pub use config::{ConfigError, LoggerConfig};
pub use console::{BufferedConsole, ConsoleSource, ConsoleWriter};
pub use logger::{
    Logger, SessionReport, REAL_METADATA, REAL_OUTPUTS, REPLAY_METADATA, REPLAY_OUTPUTS,
};
pub use pipeline::{EnqueueError, SinkPipeline};
pub use timing::{MonotonicClock, TimeSource, TimeUnit, TimedSpan};
