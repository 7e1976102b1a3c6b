use crate::data::SecurityIdentifier;
use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Reasons a raw provider value cannot be converted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// A binary value had the wrong size.
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    /// A security identifier blob ended before its declared sub-authorities.
    #[error("truncated security identifier ({0} bytes)")]
    TruncatedSid(usize),

    /// An integer does not fit in 32 bits, signed or unsigned.
    #[error("{0} does not fit in 32 bits")]
    OutOfRange(i64),

    /// The raw value has a different shape than the conversion expects.
    #[error("expected {expected}, got {actual}")]
    Type {
        expected: &'static str,
        actual: &'static str,
    },
}

/// A point in time read from a large integer attribute.
///
/// Directory timestamps count 100-nanosecond ticks since 1601-01-01. A high part
/// of `0x7fffffff` marks values that never expire, which are kept apart from
/// every real instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timestamp {
    /// The value never occurs, e.g. an account that never expires.
    Never,
    /// A concrete instant (UTC, naive).
    At(NaiveDateTime),
}

impl Timestamp {
    /// The concrete instant, or `None` for `Never`.
    pub fn instant(&self) -> Option<NaiveDateTime> {
        match self {
            Timestamp::Never => None,
            Timestamp::At(instant) => Some(*instant),
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Timestamp::Never)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Never => f.write_str("<never>"),
            Timestamp::At(instant) => write!(f, "{}", instant.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A 16-byte globally unique identifier, rendered as
/// `{xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx}` with the bytes in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(Uuid);

impl Guid {
    /// Builds a GUID from exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValueError> {
        Uuid::from_slice(bytes)
            .map(Guid)
            .map_err(|_| ValueError::Length {
                expected: 16,
                actual: bytes.len(),
            })
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl From<Uuid> for Guid {
    fn from(uuid: Uuid) -> Self {
        Guid(uuid)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.braced())
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A converted attribute value as stored on an `Entry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    String(String),
    /// Binary data with no registered conversion, kept verbatim.
    Binary(Vec<u8>),
    /// Hexadecimal rendering of binary data.
    Hex(String),
    Timestamp(Timestamp),
    Guid(Guid),
    Sid(SecurityIdentifier),
    /// Names of all flags contained in a bitmask.
    Flags(BTreeSet<&'static str>),
    /// Name of an enumeration value.
    Name(&'static str),
    /// A multi-valued attribute.
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Hex(s) => Some(s),
            Value::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&Timestamp> {
        match self {
            Value::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<&Guid> {
        match self {
            Value::Guid(guid) => Some(guid),
            _ => None,
        }
    }

    pub fn as_sid(&self) -> Option<&SecurityIdentifier> {
        match self {
            Value::Sid(sid) => Some(sid),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<&BTreeSet<&'static str>> {
        match self {
            Value::Flags(flags) => Some(flags),
            _ => None,
        }
    }

    /// Whether this is a flag set containing `flag`.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.as_flags().is_some_and(|flags| flags.contains(flag))
    }

    /// The value as an ordered sequence: the items of a list, or a single item.
    pub fn items(&self) -> Vec<&Value> {
        match self {
            Value::List(items) => items.iter().collect(),
            single => vec![single],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::String(s) | Value::Hex(s) => f.write_str(s),
            Value::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Timestamp(ts) => write!(f, "{ts}"),
            Value::Guid(guid) => write!(f, "{guid}"),
            Value::Sid(sid) => write!(f, "{sid}"),
            Value::Flags(flags) => {
                let names: Vec<&str> = flags.iter().copied().collect();
                write!(f, "{{{}}}", names.join(", "))
            }
            Value::Name(name) => f.write_str(name),
            Value::List(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
