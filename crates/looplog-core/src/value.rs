//! The tagged [`Value`] stored under every table key.

use std::fmt;

/// Prefix on declared type names of struct-serialized payloads.
pub const STRUCT_PREFIX: &str = "struct:";

/// Declared type name of struct schema payloads.
pub const STRUCT_SCHEMA_TYPE: &str = "structschema";

/// Declared type name of untyped byte payloads.
pub const RAW_TYPE: &str = "raw";

/// A single logged value.
///
/// Covers the scalar types, homogeneous 1-D arrays of each, and an opaque
/// [`Raw`](Value::Raw) blob tagged with a free-form type name. Struct
/// payloads, struct schemas, and type names the decoder does not understand
/// all travel as `Raw`.
///
/// # Examples
///
/// ```
/// use looplog_core::Value;
///
/// let v = Value::from(42.0);
/// assert_eq!(v.type_name(), "double");
/// assert_eq!(Value::from(vec![1i64, 2]).type_name(), "int[]");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A boolean.
    Boolean(bool),
    /// A signed 64-bit integer.
    Integer(i64),
    /// A 32-bit float.
    Float(f32),
    /// A 64-bit float.
    Double(f64),
    /// A UTF-8 string.
    String(String),
    /// An array of booleans.
    BooleanArray(Vec<bool>),
    /// An array of signed 64-bit integers.
    IntegerArray(Vec<i64>),
    /// An array of 32-bit floats.
    FloatArray(Vec<f32>),
    /// An array of 64-bit floats.
    DoubleArray(Vec<f64>),
    /// An array of UTF-8 strings.
    StringArray(Vec<String>),
    /// Opaque bytes tagged with their declared type name.
    Raw {
        /// Declared type name, e.g. `"raw"`, `"struct:Pose2d"`, `"structschema"`.
        type_name: String,
        /// Payload bytes, preserved verbatim.
        bytes: Vec<u8>,
    },
}

impl Value {
    /// Declared type name used on the wire for this value.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "int",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::BooleanArray(_) => "boolean[]",
            Self::IntegerArray(_) => "int[]",
            Self::FloatArray(_) => "float[]",
            Self::DoubleArray(_) => "double[]",
            Self::StringArray(_) => "string[]",
            Self::Raw { type_name, .. } => type_name,
        }
    }

    /// Build a raw value with an explicit type name.
    pub fn raw(type_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Raw {
            type_name: type_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Schema type name of a struct payload, with `struct:` and any `[]`
    /// suffix stripped. `None` for everything that is not a struct payload.
    pub fn struct_type_name(&self) -> Option<&str> {
        match self {
            Self::Raw { type_name, .. } => {
                let schema = type_name.strip_prefix(STRUCT_PREFIX)?;
                Some(schema.strip_suffix("[]").unwrap_or(schema))
            }
            _ => None,
        }
    }

    /// True for struct payloads declared as arrays (`struct:T[]`).
    pub fn is_struct_array(&self) -> bool {
        matches!(
            self,
            Self::Raw { type_name, .. }
                if type_name.starts_with(STRUCT_PREFIX) && type_name.ends_with("[]")
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::BooleanArray(v) => write!(f, "{v:?}"),
            Self::IntegerArray(v) => write!(f, "{v:?}"),
            Self::FloatArray(v) => write!(f, "{v:?}"),
            Self::DoubleArray(v) => write!(f, "{v:?}"),
            Self::StringArray(v) => write!(f, "{v:?}"),
            Self::Raw { type_name, bytes } => write!(f, "<{type_name}: {} bytes>", bytes.len()),
        }
    }
}

// ── Conversions into Value ──────────────────────────────────────

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Boolean,
    i64 => Integer,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<bool> => BooleanArray,
    Vec<i64> => IntegerArray,
    Vec<f32> => FloatArray,
    Vec<f64> => DoubleArray,
    Vec<String> => StringArray,
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<&[bool]> for Value {
    fn from(v: &[bool]) -> Self {
        Self::BooleanArray(v.to_vec())
    }
}

impl From<&[i64]> for Value {
    fn from(v: &[i64]) -> Self {
        Self::IntegerArray(v.to_vec())
    }
}

impl From<&[f32]> for Value {
    fn from(v: &[f32]) -> Self {
        Self::FloatArray(v.to_vec())
    }
}

impl From<&[f64]> for Value {
    fn from(v: &[f64]) -> Self {
        Self::DoubleArray(v.to_vec())
    }
}

impl From<&[&str]> for Value {
    fn from(v: &[&str]) -> Self {
        Self::StringArray(v.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::raw(RAW_TYPE, bytes)
    }
}

// ── Typed reads out of Value ────────────────────────────────────

/// Types that can be read back out of a [`Value`].
///
/// Extraction is strict: a `Double` never reads as `f32`, an `Integer`
/// never reads as `f64`. A mismatch yields `None`, which table getters
/// turn into the caller's default.
pub trait FromValue: Sized {
    /// Extract `Self` from `value`, or `None` on a type mismatch.
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Boolean,
    i64 => Integer,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<bool> => BooleanArray,
    Vec<i64> => IntegerArray,
    Vec<f32> => FloatArray,
    Vec<f64> => DoubleArray,
    Vec<String> => StringArray,
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Raw { bytes, .. } => Some(bytes.clone()),
            _ => None,
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}
