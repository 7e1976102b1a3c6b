use crate::constants::{TICKS_PER_MICROSECOND, TIME_NEVER_HIGH_PART};
use crate::data::mapping::{FlagsMapping, IntegerMapping};
use crate::data::{Guid, SecurityIdentifier, Timestamp, Value, ValueError};
use crate::provider::RawValue;
use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::fmt::Write;

/// Reinterprets a signed or unsigned 32-bit reading as unsigned.
///
/// Negative numbers are read as two's complement, so `-1` becomes `0xffffffff`.
/// Numbers outside both the signed and the unsigned 32-bit range are rejected
/// rather than truncated.
pub fn to_unsigned(number: i64) -> std::result::Result<u32, ValueError> {
    u32::try_from(number)
        .or_else(|_| i32::try_from(number).map(|signed| signed as u32))
        .map_err(|_| ValueError::OutOfRange(number))
}

/// 1601-01-01T00:00:00, the origin of directory timestamps.
fn filetime_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1601, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Converts the two halves of a 100-nanosecond tick count since 1601 into a
/// `Timestamp`.
///
/// A high part of `0x7fffffff` yields `Timestamp::Never`. Sub-microsecond ticks
/// are truncated, and instants past the representable range clamp to
/// `NaiveDateTime::MAX`.
pub fn filetime_to_timestamp(high: u32, low: u32) -> Timestamp {
    if high == TIME_NEVER_HIGH_PART {
        return Timestamp::Never;
    }
    let ticks = (u64::from(high) << 32) | u64::from(low);
    let micros = ticks / TICKS_PER_MICROSECOND;
    // u64::MAX / 10 always fits in an i64.
    let delta = TimeDelta::microseconds(micros as i64);
    Timestamp::At(
        filetime_epoch()
            .checked_add_signed(delta)
            .unwrap_or(NaiveDateTime::MAX),
    )
}

/// Lower-case hexadecimal rendering of `bytes`, two digits per byte, no separators.
pub fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Reads a 16-byte GUID blob.
pub fn guid(bytes: &[u8]) -> std::result::Result<Guid, ValueError> {
    Guid::from_slice(bytes)
}

/// Normalizes a possibly multi-valued attribute into an ordered sequence:
/// nothing for an absent value, one item for a scalar, every item of a list.
pub fn values(value: Option<&Value>) -> Vec<&Value> {
    value.map(Value::items).unwrap_or_default()
}

/// How a raw provider value is turned into a `Value`.
///
/// Each entry kind maps attribute names to a `Conversion`; attributes without an
/// entry are stored as they come.
#[derive(Debug, Clone, Copy)]
pub enum Conversion {
    /// Large integer tick count to `Value::Timestamp`.
    Timestamp,
    /// Binary blob to `Value::Hex`.
    Hex,
    /// 16-byte binary blob to `Value::Guid`.
    Guid,
    /// Binary security identifier to `Value::Sid`.
    Sid,
    /// Bitmask to the set of contained flag names.
    Flags(&'static FlagsMapping),
    /// Number to its registered enumeration name.
    EnumName(&'static IntegerMapping),
}

impl Conversion {
    /// Converts `raw`, the value of `attribute`.
    ///
    /// `RawValue::Null` converts to `None`. Lists are converted item by item, with
    /// null items skipped.
    ///
    /// # Errors
    /// Returns `Error::Conversion` if the raw value has an unexpected shape or size,
    /// and `Error::UnknownEnumValue` if an enumeration number is not registered.
    pub fn apply(&self, attribute: &str, raw: &RawValue) -> Result<Option<Value>> {
        let wrap = |source: ValueError| Error::Conversion {
            attribute: attribute.to_string(),
            source,
        };
        let value = match (self, raw) {
            (_, RawValue::Null) => return Ok(None),
            (_, RawValue::List(items)) => {
                let mut converted = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(value) = self.apply(attribute, item)? {
                        converted.push(value);
                    }
                }
                Value::List(converted)
            }
            (Conversion::Timestamp, RawValue::LargeInteger { high, low }) => {
                let high = to_unsigned(*high).map_err(wrap)?;
                let low = to_unsigned(*low).map_err(wrap)?;
                Value::Timestamp(filetime_to_timestamp(high, low))
            }
            (Conversion::Timestamp, RawValue::Integer(ticks)) => {
                let ticks = *ticks as u64;
                Value::Timestamp(filetime_to_timestamp((ticks >> 32) as u32, ticks as u32))
            }
            (Conversion::Hex, RawValue::Binary(bytes)) => Value::Hex(hex(bytes)),
            (Conversion::Guid, RawValue::Binary(bytes)) => Value::Guid(guid(bytes).map_err(wrap)?),
            (Conversion::Sid, RawValue::Binary(bytes)) => {
                Value::Sid(SecurityIdentifier::from_bytes(bytes).map_err(wrap)?)
            }
            (Conversion::Sid, RawValue::String(s)) => Value::Sid(s.parse().map_err(wrap)?),
            (Conversion::Flags(mapping), RawValue::Integer(number)) => {
                let number = to_unsigned(*number).map_err(wrap)?;
                Value::Flags(mapping.flag_names(number))
            }
            (Conversion::EnumName(mapping), RawValue::Integer(number)) => {
                Value::Name(mapping.name(*number)?)
            }
            (conversion, raw) => {
                return Err(wrap(ValueError::Type {
                    expected: conversion.expects(),
                    actual: raw.kind(),
                }));
            }
        };
        Ok(Some(value))
    }

    /// Short description of the raw shape this conversion accepts.
    fn expects(&self) -> &'static str {
        match self {
            Conversion::Timestamp => "large integer",
            Conversion::Hex | Conversion::Guid => "binary",
            Conversion::Sid => "binary or string security identifier",
            Conversion::Flags(_) | Conversion::EnumName(_) => "integer",
        }
    }
}
