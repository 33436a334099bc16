//! Error types for the cycle log codec.

use std::fmt;
use std::io;

/// Errors that can occur while encoding, decoding, or locating a log.
#[derive(Debug)]
pub enum CodecError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The stream starts with a revision byte this build does not read.
    UnsupportedRevision {
        /// The revision found in the stream.
        found: u8,
    },
    /// A top-level record tag is not recognized; the stream is no longer
    /// aligned and nothing after it can be trusted.
    Desync {
        /// The unrecognized tag.
        tag: u8,
    },
    /// Every 16-bit key ID is already assigned in this session.
    KeyIdsExhausted,
    /// A value payload does not fit the 16-bit length prefix.
    PayloadTooLarge {
        /// Key of the offending value.
        key: String,
        /// Encoded payload length in bytes.
        len: usize,
    },
    /// A key or type name does not fit the 16-bit length prefix.
    KeyTooLong {
        /// Encoded name length in bytes.
        len: usize,
    },
    /// No replay path was configured or discoverable.
    NoReplayPath,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::UnsupportedRevision { found } => {
                write!(f, "log revision {found} is not supported")
            }
            Self::Desync { tag } => {
                write!(f, "unknown record type {tag}, stream desynchronized")
            }
            Self::KeyIdsExhausted => write!(f, "all 65536 key IDs are in use"),
            Self::PayloadTooLarge { key, len } => {
                write!(f, "payload for key \"{key}\" is {len} bytes (max 65535)")
            }
            Self::KeyTooLong { len } => write!(f, "name is {len} bytes (max 65535)"),
            Self::NoReplayPath => write!(f, "no replay log path configured or discovered"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
