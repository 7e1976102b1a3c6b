//!
//! Typed attribute values and the conversions that produce them.
//!
//! Providers hand out attributes in their native representation: integers,
//! strings, binary blobs and pairs of 32-bit integers. This module turns those
//! into semantic values (`Timestamp`, `Guid`, `SecurityIdentifier`, flag sets and
//! enumeration names) through the `Conversion` table entries attached to each
//! entry kind.

mod convert;
pub mod mapping;
mod sid;
mod types;

pub use convert::{Conversion, filetime_to_timestamp, guid, hex, to_unsigned, values};
pub use sid::SecurityIdentifier;
pub use types::{Guid, Timestamp, Value, ValueError};
