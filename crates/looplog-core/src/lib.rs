//! Core types and traits for looplog.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! per-cycle [`Table`] snapshot, the tagged [`Value`] stored under every
//! key, and the collaborator traits implemented by sinks, replay sources,
//! console sources, input groups and struct codecs.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod table;
pub mod traits;
pub mod value;

pub use table::{normalize_key, SubTable, Table, SCHEMA_ROOT};
pub use traits::{ConsoleSource, LogSink, LoggableInputs, ReplaySource, StructCodec};
pub use value::{FromValue, Value, RAW_TYPE, STRUCT_PREFIX, STRUCT_SCHEMA_TYPE};
