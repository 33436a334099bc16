//! Stream decoder: bytes back into per-cycle table snapshots.
//!
//! The decoder owns the session's key-ID map and a carry-forward table, so
//! every returned [`Table`] is a complete snapshot: keys not re-sent in a
//! cycle keep their previous value.

use std::collections::HashMap;
use std::io::Read;

use looplog_core::Table;

use crate::codec::{
    decode_payload, read_bytes, read_f64_be, read_short_str, read_u16_be, read_u8, ReadOutcome,
};
use crate::error::CodecError;
use crate::types::KeyDefinition;
use crate::{REVISION, TAG_KEY, TAG_TIMESTAMP, TAG_VALUE};

/// Outcome of reading one record inside a cycle.
enum Record {
    Applied,
    Incomplete,
}

/// Unwrap a complete read or bail out of a record reader as incomplete.
macro_rules! complete_or_incomplete {
    ($outcome:expr) => {
        match $outcome {
            ReadOutcome::Complete(v) => v,
            ReadOutcome::EndOfData | ReadOutcome::Truncated { .. } => {
                return Ok(Record::Incomplete)
            }
        }
    };
}

/// Decodes a cycle log stream one cycle at a time.
///
/// Once the stream ends, desynchronizes, or fails, the decoder is finished
/// and every further call returns `Ok(None)`.
///
/// # Examples
///
/// ```
/// use looplog_rlog::Decoder;
///
/// let mut bytes = vec![2u8, 0];
/// bytes.extend_from_slice(&1.23f64.to_be_bytes());
///
/// let mut decoder = Decoder::new();
/// let mut input = bytes.as_slice();
/// let table = decoder.decode_table(&mut input).unwrap().unwrap();
/// assert_eq!(table.timestamp(), 1.23);
/// assert!(decoder.decode_table(&mut input).unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct Decoder {
    revision_checked: bool,
    finished: bool,
    key_ids: HashMap<u16, KeyDefinition>,
    next_timestamp: Option<f64>,
    table: Table,
}

impl Decoder {
    /// Create a decoder for a fresh stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// True once no further cycles will be returned.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Key definitions seen so far.
    pub fn key_definitions(&self) -> impl Iterator<Item = &KeyDefinition> {
        self.key_ids.values()
    }

    /// Decode the next cycle.
    ///
    /// Returns `Ok(None)` at end of data. A stream that stops partway
    /// through a record ends cleanly: the partial record is discarded and
    /// the cycle parsed so far is returned. An unsupported revision or an
    /// unknown record tag is returned once as an error and finishes the
    /// decoder.
    pub fn decode_table(&mut self, input: &mut dyn Read) -> Result<Option<Table>, CodecError> {
        if self.finished {
            return Ok(None);
        }
        let result = self.decode_cycle(input);
        if !matches!(result, Ok(Some(_))) {
            self.finished = true;
        }
        result
    }

    fn decode_cycle(&mut self, input: &mut dyn Read) -> Result<Option<Table>, CodecError> {
        if !self.revision_checked {
            match read_u8(input)? {
                ReadOutcome::Complete(REVISION) => self.revision_checked = true,
                ReadOutcome::Complete(found) => {
                    log::error!("log revision {found} is not supported");
                    return Err(CodecError::UnsupportedRevision { found });
                }
                ReadOutcome::EndOfData | ReadOutcome::Truncated { .. } => return Ok(None),
            }
        }

        let timestamp = match self.next_timestamp.take() {
            Some(timestamp) => timestamp,
            None => match read_u8(input)? {
                ReadOutcome::Complete(TAG_TIMESTAMP) => match read_f64_be(input)? {
                    ReadOutcome::Complete(timestamp) => timestamp,
                    _ => return Ok(None),
                },
                ReadOutcome::Complete(tag) => {
                    log::warn!("expected a timestamp record, found record type {tag}; ending replay");
                    return Err(CodecError::Desync { tag });
                }
                ReadOutcome::EndOfData | ReadOutcome::Truncated { .. } => return Ok(None),
            },
        };
        self.table.set_timestamp(timestamp);

        loop {
            let tag = match read_u8(input)? {
                ReadOutcome::Complete(tag) => tag,
                ReadOutcome::EndOfData | ReadOutcome::Truncated { .. } => {
                    log::debug!("end of log reached");
                    self.finished = true;
                    return Ok(Some(self.table.clone()));
                }
            };
            let record = match tag {
                TAG_TIMESTAMP => {
                    match read_f64_be(input)? {
                        ReadOutcome::Complete(next) => self.next_timestamp = Some(next),
                        _ => {
                            log::debug!("end of log reached inside the final timestamp");
                            self.finished = true;
                        }
                    }
                    return Ok(Some(self.table.clone()));
                }
                TAG_KEY => self.decode_key(input)?,
                TAG_VALUE => self.decode_value(input)?,
                other => {
                    log::warn!("unknown record type {other}; ending replay to avoid desync");
                    return Err(CodecError::Desync { tag: other });
                }
            };
            if let Record::Incomplete = record {
                log::warn!("log ends inside a record of the cycle at {timestamp}");
                self.finished = true;
                return Ok(Some(self.table.clone()));
            }
        }
    }

    fn decode_key(&mut self, input: &mut dyn Read) -> Result<Record, CodecError> {
        let id = complete_or_incomplete!(read_u16_be(input)?);
        let name = complete_or_incomplete!(read_short_str(input)?);
        let type_name = complete_or_incomplete!(read_short_str(input)?);
        log::debug!("key defined: id={id}, key={name}, type={type_name}");
        self.key_ids.insert(
            id,
            KeyDefinition {
                id,
                name,
                type_name,
            },
        );
        Ok(Record::Applied)
    }

    fn decode_value(&mut self, input: &mut dyn Read) -> Result<Record, CodecError> {
        let id = complete_or_incomplete!(read_u16_be(input)?);
        let len = complete_or_incomplete!(read_u16_be(input)?);
        // The length prefix bounds the record, so the payload is consumed
        // even when the key is unknown or the payload is malformed.
        let payload = complete_or_incomplete!(read_bytes(input, usize::from(len))?);
        let Some(def) = self.key_ids.get(&id) else {
            log::debug!("value for undefined key id {id} skipped");
            return Ok(Record::Applied);
        };
        match decode_payload(&def.type_name, &payload) {
            ReadOutcome::Complete(value) => self.table.put(&def.name, value),
            ReadOutcome::EndOfData | ReadOutcome::Truncated { .. } => {
                log::warn!("truncated {} payload for key \"{}\"", def.type_name, def.name);
            }
        }
        Ok(Record::Applied)
    }
}
