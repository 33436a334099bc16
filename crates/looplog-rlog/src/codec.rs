//! Byte-level primitives and per-type payload encode/decode.
//!
//! All integers and floats are big-endian. Reads never fail on a short
//! stream: they return a [`ReadOutcome`] that tells the caller whether the
//! value was complete, the stream ended cleanly before it, or the stream
//! ended partway through it. Only genuine I/O failures surface as `Err`.

use std::io::{self, Read, Write};

use looplog_core::Value;

/// Result of a single read from a stream or payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ReadOutcome<T> {
    /// The full value was read.
    Complete(T),
    /// The stream ended before the first byte of the value.
    EndOfData,
    /// The stream ended partway through the value.
    Truncated {
        /// Bytes the value needed.
        wanted: usize,
        /// Bytes actually available.
        got: usize,
    },
}

impl<T> ReadOutcome<T> {
    /// Apply `f` to a complete value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ReadOutcome<U> {
        match self {
            Self::Complete(v) => ReadOutcome::Complete(f(v)),
            Self::EndOfData => ReadOutcome::EndOfData,
            Self::Truncated { wanted, got } => ReadOutcome::Truncated { wanted, got },
        }
    }

    /// The complete value, if any.
    pub fn complete(self) -> Option<T> {
        match self {
            Self::Complete(v) => Some(v),
            _ => None,
        }
    }
}

/// Unwrap a [`ReadOutcome::Complete`] or return the incomplete outcome
/// (re-typed) from the enclosing function.
macro_rules! complete_or_return {
    ($outcome:expr) => {
        match $outcome {
            $crate::codec::ReadOutcome::Complete(v) => v,
            $crate::codec::ReadOutcome::EndOfData => {
                return Ok($crate::codec::ReadOutcome::EndOfData)
            }
            $crate::codec::ReadOutcome::Truncated { wanted, got } => {
                return Ok($crate::codec::ReadOutcome::Truncated { wanted, got })
            }
        }
    };
}

// ── Stream readers ──────────────────────────────────────────────

/// Fill `buf` from `r`, distinguishing clean EOF (zero bytes) from a short
/// read.
pub fn read_exact_outcome(r: &mut dyn Read, buf: &mut [u8]) -> io::Result<ReadOutcome<()>> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(ReadOutcome::EndOfData),
            Ok(0) => {
                return Ok(ReadOutcome::Truncated {
                    wanted: buf.len(),
                    got: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(ReadOutcome::Complete(()))
}

fn read_array<const N: usize>(r: &mut dyn Read) -> io::Result<ReadOutcome<[u8; N]>> {
    let mut buf = [0u8; N];
    Ok(read_exact_outcome(r, &mut buf)?.map(|()| buf))
}

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> io::Result<ReadOutcome<u8>> {
    Ok(read_array::<1>(r)?.map(|b| b[0]))
}

/// Read a big-endian u16.
pub fn read_u16_be(r: &mut dyn Read) -> io::Result<ReadOutcome<u16>> {
    Ok(read_array::<2>(r)?.map(u16::from_be_bytes))
}

/// Read a big-endian f64.
pub fn read_f64_be(r: &mut dyn Read) -> io::Result<ReadOutcome<f64>> {
    Ok(read_array::<8>(r)?.map(f64::from_be_bytes))
}

/// Read exactly `len` bytes.
pub fn read_bytes(r: &mut dyn Read, len: usize) -> io::Result<ReadOutcome<Vec<u8>>> {
    let mut buf = vec![0u8; len];
    Ok(read_exact_outcome(r, &mut buf)?.map(|()| buf))
}

/// Read a u16-length-prefixed UTF-8 string (invalid sequences replaced).
pub fn read_short_str(r: &mut dyn Read) -> io::Result<ReadOutcome<String>> {
    let len = complete_or_return!(read_u16_be(r)?);
    let bytes = complete_or_return!(read_bytes(r, usize::from(len))?);
    Ok(ReadOutcome::Complete(
        String::from_utf8_lossy(&bytes).into_owned(),
    ))
}

// ── Stream writers ──────────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> io::Result<()> {
    w.write_all(&[v])
}

/// Write a big-endian u16.
pub fn write_u16_be(w: &mut dyn Write, v: u16) -> io::Result<()> {
    w.write_all(&v.to_be_bytes())
}

/// Write a big-endian f64.
pub fn write_f64_be(w: &mut dyn Write, v: f64) -> io::Result<()> {
    w.write_all(&v.to_be_bytes())
}

/// Write a u16-length-prefixed byte string. The caller guarantees
/// `bytes.len() <= u16::MAX`.
pub fn write_short_bytes(w: &mut dyn Write, bytes: &[u8]) -> io::Result<()> {
    write_u16_be(w, bytes.len() as u16)?;
    w.write_all(bytes)
}

// ── Payload cursor ──────────────────────────────────────────────

/// Bounds-checked reader over one value record's payload.
struct PayloadCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> ReadOutcome<&'a [u8]> {
        let remaining = self.data.len() - self.pos;
        if remaining < n {
            return ReadOutcome::Truncated {
                wanted: n,
                got: remaining,
            };
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        ReadOutcome::Complete(slice)
    }

    fn take_array<const N: usize>(&mut self) -> ReadOutcome<[u8; N]> {
        self.take(N).map(|s| {
            let mut buf = [0u8; N];
            buf.copy_from_slice(s);
            buf
        })
    }
}

// ── Payload decode ──────────────────────────────────────────────

fn fixed_width<T, const N: usize>(
    payload: &[u8],
    from_be: impl Fn([u8; N]) -> T,
) -> ReadOutcome<Vec<T>> {
    if payload.len() % N != 0 {
        return ReadOutcome::Truncated {
            wanted: payload.len().div_ceil(N) * N,
            got: payload.len(),
        };
    }
    ReadOutcome::Complete(
        payload
            .chunks_exact(N)
            .map(|chunk| {
                let mut buf = [0u8; N];
                buf.copy_from_slice(chunk);
                from_be(buf)
            })
            .collect(),
    )
}

fn decode_string_array(payload: &[u8]) -> ReadOutcome<Vec<String>> {
    let mut cursor = PayloadCursor::new(payload);
    let count = match cursor.take_array::<4>() {
        ReadOutcome::Complete(b) => u32::from_be_bytes(b) as usize,
        ReadOutcome::EndOfData => return ReadOutcome::EndOfData,
        ReadOutcome::Truncated { wanted, got } => return ReadOutcome::Truncated { wanted, got },
    };
    // Each element needs at least its 4-byte length; reject absurd counts
    // before allocating.
    if count > payload.len() / 4 {
        return ReadOutcome::Truncated {
            wanted: count.saturating_mul(4),
            got: payload.len() - 4,
        };
    }
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let len = match cursor.take_array::<4>() {
            ReadOutcome::Complete(b) => u32::from_be_bytes(b) as usize,
            ReadOutcome::EndOfData => return ReadOutcome::EndOfData,
            ReadOutcome::Truncated { wanted, got } => {
                return ReadOutcome::Truncated { wanted, got }
            }
        };
        match cursor.take(len) {
            ReadOutcome::Complete(bytes) => out.push(String::from_utf8_lossy(bytes).into_owned()),
            ReadOutcome::EndOfData => return ReadOutcome::EndOfData,
            ReadOutcome::Truncated { wanted, got } => {
                return ReadOutcome::Truncated { wanted, got }
            }
        }
    }
    ReadOutcome::Complete(out)
}

fn single<T, const N: usize>(payload: &[u8], from_be: impl Fn([u8; N]) -> T) -> ReadOutcome<T> {
    PayloadCursor::new(payload).take_array::<N>().map(from_be)
}

/// Interpret `payload` according to a declared type name.
///
/// Numeric scalars read their leading bytes; fixed-width arrays must be an
/// exact multiple of the element width. `structschema`, `struct:*`, and any
/// unrecognized type name are preserved verbatim as [`Value::Raw`] with the
/// declared name, so the format stays forward-compatible.
pub fn decode_payload(type_name: &str, payload: &[u8]) -> ReadOutcome<Value> {
    match type_name {
        "boolean" => ReadOutcome::Complete(Value::Boolean(
            payload.first().is_some_and(|&b| b != 0),
        )),
        "int" | "int64" => single(payload, i64::from_be_bytes).map(Value::Integer),
        "float" => single(payload, f32::from_be_bytes).map(Value::Float),
        "double" => single(payload, f64::from_be_bytes).map(Value::Double),
        "string" => ReadOutcome::Complete(Value::String(
            String::from_utf8_lossy(payload).into_owned(),
        )),
        "boolean[]" => {
            ReadOutcome::Complete(Value::BooleanArray(payload.iter().map(|&b| b != 0).collect()))
        }
        "int[]" | "int64[]" => fixed_width(payload, i64::from_be_bytes).map(Value::IntegerArray),
        "float[]" => fixed_width(payload, f32::from_be_bytes).map(Value::FloatArray),
        "double[]" => fixed_width(payload, f64::from_be_bytes).map(Value::DoubleArray),
        "string[]" => decode_string_array(payload).map(Value::StringArray),
        other => ReadOutcome::Complete(Value::raw(other, payload.to_vec())),
    }
}

// ── Payload encode ──────────────────────────────────────────────

/// Serialize a value's payload bytes (without the record header).
pub fn encode_payload(value: &Value) -> Vec<u8> {
    match value {
        Value::Boolean(v) => vec![u8::from(*v)],
        Value::Integer(v) => v.to_be_bytes().to_vec(),
        Value::Float(v) => v.to_be_bytes().to_vec(),
        Value::Double(v) => v.to_be_bytes().to_vec(),
        Value::String(v) => v.as_bytes().to_vec(),
        Value::BooleanArray(v) => v.iter().map(|&b| u8::from(b)).collect(),
        Value::IntegerArray(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
        Value::FloatArray(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
        Value::DoubleArray(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
        Value::StringArray(v) => {
            let mut buf = Vec::with_capacity(4 + v.iter().map(|s| 4 + s.len()).sum::<usize>());
            buf.extend_from_slice(&(v.len() as u32).to_be_bytes());
            for s in v {
                buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
            buf
        }
        Value::Raw { bytes, .. } => bytes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(value: Value) -> Value {
        let payload = encode_payload(&value);
        decode_payload(value.type_name(), &payload)
            .complete()
            .expect("complete payload")
    }

    #[test]
    fn read_outcomes_distinguish_eof_from_truncation() {
        let mut empty: &[u8] = &[];
        assert_eq!(read_u16_be(&mut empty).unwrap(), ReadOutcome::EndOfData);

        let mut short: &[u8] = &[0x01];
        assert_eq!(
            read_u16_be(&mut short).unwrap(),
            ReadOutcome::Truncated { wanted: 2, got: 1 }
        );

        let mut full: &[u8] = &[0x01, 0x02];
        assert_eq!(read_u16_be(&mut full).unwrap(), ReadOutcome::Complete(0x0102));
    }

    #[test]
    fn short_str_truncated_body() {
        let mut data: &[u8] = &[0x00, 0x05, b'a', b'b'];
        assert_eq!(
            read_short_str(&mut data).unwrap(),
            ReadOutcome::Truncated { wanted: 5, got: 2 }
        );
    }

    #[test]
    fn boolean_uses_first_byte_only() {
        assert_eq!(
            decode_payload("boolean", &[0, 1]).complete(),
            Some(Value::Boolean(false))
        );
        assert_eq!(
            decode_payload("boolean", &[7]).complete(),
            Some(Value::Boolean(true))
        );
        assert_eq!(
            decode_payload("boolean", &[]).complete(),
            Some(Value::Boolean(false))
        );
    }

    #[test]
    fn truncated_scalars_report_truncation() {
        assert_eq!(
            decode_payload("double", &[0; 5]),
            ReadOutcome::Truncated { wanted: 8, got: 5 }
        );
        assert_eq!(
            decode_payload("int", &[0; 7]),
            ReadOutcome::Truncated { wanted: 8, got: 7 }
        );
        assert_eq!(
            decode_payload("float", &[0; 3]),
            ReadOutcome::Truncated { wanted: 4, got: 3 }
        );
    }

    #[test]
    fn ragged_arrays_report_truncation() {
        assert!(matches!(
            decode_payload("double[]", &[0; 12]),
            ReadOutcome::Truncated { .. }
        ));
        assert!(matches!(
            decode_payload("float[]", &[0; 6]),
            ReadOutcome::Truncated { .. }
        ));
    }

    #[test]
    fn string_array_with_bad_lengths_is_truncated() {
        // count = 1, element length = 10, only 2 bytes follow.
        let payload = [0, 0, 0, 1, 0, 0, 0, 10, b'h', b'i'];
        assert!(matches!(
            decode_payload("string[]", &payload),
            ReadOutcome::Truncated { .. }
        ));
        // count far beyond payload size.
        let payload = [0xFF, 0xFF, 0xFF, 0xFF];
        assert!(matches!(
            decode_payload("string[]", &payload),
            ReadOutcome::Truncated { .. }
        ));
    }

    #[test]
    fn int64_alias_reads_as_integer() {
        let payload = 5i64.to_be_bytes();
        assert_eq!(
            decode_payload("int64", &payload).complete(),
            Some(Value::Integer(5))
        );
    }

    #[test]
    fn unknown_and_struct_types_preserved_verbatim() {
        for name in ["structschema", "struct:Pose2d", "struct:Pose2d[]", "msgpack", "raw"] {
            let decoded = decode_payload(name, &[1, 2, 3]).complete().unwrap();
            assert_eq!(decoded, Value::raw(name, vec![1u8, 2, 3]));
        }
    }

    #[test]
    fn string_array_layout() {
        let payload = encode_payload(&Value::StringArray(vec!["ab".into(), "".into()]));
        assert_eq!(payload, vec![0, 0, 0, 2, 0, 0, 0, 2, b'a', b'b', 0, 0, 0, 0]);
    }

    proptest! {
        #[test]
        fn roundtrip_scalars(b in any::<bool>(), i in any::<i64>(), f in any::<u32>(), d in any::<u64>()) {
            prop_assert_eq!(roundtrip(Value::Boolean(b)), Value::Boolean(b));
            prop_assert_eq!(roundtrip(Value::Integer(i)), Value::Integer(i));
            // Compare bit patterns so NaN payloads are covered too.
            match roundtrip(Value::Float(f32::from_bits(f))) {
                Value::Float(back) => prop_assert_eq!(back.to_bits(), f),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
            match roundtrip(Value::Double(f64::from_bits(d))) {
                Value::Double(back) => prop_assert_eq!(back.to_bits(), d),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }

        #[test]
        fn roundtrip_arrays(
            bools in prop::collection::vec(any::<bool>(), 0..32),
            ints in prop::collection::vec(any::<i64>(), 0..32),
            doubles in prop::collection::vec(-1e9f64..1e9, 0..32),
            strings in prop::collection::vec("[a-zA-Z0-9 /_]{0,16}", 0..8),
        ) {
            prop_assert_eq!(roundtrip(Value::BooleanArray(bools.clone())), Value::BooleanArray(bools));
            prop_assert_eq!(roundtrip(Value::IntegerArray(ints.clone())), Value::IntegerArray(ints));
            prop_assert_eq!(roundtrip(Value::DoubleArray(doubles.clone())), Value::DoubleArray(doubles));
            prop_assert_eq!(roundtrip(Value::StringArray(strings.clone())), Value::StringArray(strings));
        }
    }
}
