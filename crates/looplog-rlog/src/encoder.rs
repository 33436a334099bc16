//! Stream encoder: per-cycle table snapshots into bytes.

use indexmap::IndexMap;
use looplog_core::{Table, Value};

use crate::codec::{encode_payload, write_f64_be, write_short_bytes, write_u16_be, write_u8};
use crate::error::CodecError;
use crate::{REVISION, TAG_KEY, TAG_TIMESTAMP, TAG_VALUE};

/// Interned identity of one key: its ID and the type it was defined with.
#[derive(Clone, Debug)]
struct Interned {
    id: u16,
    type_name: String,
}

/// Encodes table snapshots as cycles of one stream.
///
/// Holds the session's key interning: the first cycle that carries a key
/// emits its definition record, every later cycle references it by ID. A
/// key whose value changes type is redefined under a fresh ID.
///
/// # Examples
///
/// ```
/// use looplog_core::Table;
/// use looplog_rlog::{Decoder, Encoder};
///
/// let mut table = Table::new(1.0);
/// table.put("Arm/Angle", 0.5);
///
/// let mut encoder = Encoder::new();
/// let bytes = encoder.encode_cycle(&table).unwrap();
///
/// let mut decoder = Decoder::new();
/// let decoded = decoder.decode_table(&mut bytes.as_slice()).unwrap().unwrap();
/// assert_eq!(decoded, table);
/// ```
#[derive(Debug, Default)]
pub struct Encoder {
    key_ids: IndexMap<String, Interned>,
    next_id: u32,
    revision_written: bool,
}

impl Encoder {
    /// Create an encoder for a fresh stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of key IDs assigned so far.
    pub fn keys_defined(&self) -> usize {
        self.next_id as usize
    }

    /// Encode one cycle: timestamp, definitions of new keys, then values
    /// of every key in `table`. The first call also emits the revision
    /// byte.
    ///
    /// A key that cannot be represented (name or payload longer than
    /// 65535 bytes, or no IDs left) is skipped with a warning; the rest of
    /// the cycle is still encoded.
    pub fn encode_cycle(&mut self, table: &Table) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        if !self.revision_written {
            write_u8(&mut out, REVISION)?;
            self.revision_written = true;
        }
        write_u8(&mut out, TAG_TIMESTAMP)?;
        write_f64_be(&mut out, table.timestamp())?;

        let mut values = Vec::new();
        for (key, value) in table.entries(true) {
            match self.intern(&mut out, key, value) {
                Ok(id) => self.encode_value(&mut values, id, key, value)?,
                Err(CodecError::Io(e)) => return Err(CodecError::Io(e)),
                Err(e) => log::warn!("key \"{key}\" not logged: {e}"),
            }
        }
        out.extend_from_slice(&values);
        Ok(out)
    }

    /// Look up `key`'s ID, writing a definition record if it is new or
    /// its type changed.
    fn intern(&mut self, defs: &mut Vec<u8>, key: &str, value: &Value) -> Result<u16, CodecError> {
        let type_name = value.type_name();
        if let Some(interned) = self.key_ids.get(key) {
            if interned.type_name == type_name {
                return Ok(interned.id);
            }
        }

        let wire_name = format!("/{key}");
        for name in [wire_name.as_str(), type_name] {
            if name.len() > usize::from(u16::MAX) {
                return Err(CodecError::KeyTooLong { len: name.len() });
            }
        }
        let id = u16::try_from(self.next_id).map_err(|_| CodecError::KeyIdsExhausted)?;
        self.next_id += 1;

        write_u8(defs, TAG_KEY)?;
        write_u16_be(defs, id)?;
        write_short_bytes(defs, wire_name.as_bytes())?;
        write_short_bytes(defs, type_name.as_bytes())?;
        self.key_ids.insert(
            key.to_owned(),
            Interned {
                id,
                type_name: type_name.to_owned(),
            },
        );
        Ok(id)
    }

    fn encode_value(
        &self,
        out: &mut Vec<u8>,
        id: u16,
        key: &str,
        value: &Value,
    ) -> Result<(), CodecError> {
        let payload = encode_payload(value);
        if payload.len() > usize::from(u16::MAX) {
            let err = CodecError::PayloadTooLarge {
                key: key.to_owned(),
                len: payload.len(),
            };
            log::warn!("{err}; value skipped");
            return Ok(());
        }
        write_u8(out, TAG_VALUE)?;
        write_u16_be(out, id)?;
        write_short_bytes(out, &payload)?;
        Ok(())
    }
}
