use crate::data::ValueError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A Windows security identifier in its binary self-relative layout.
///
/// Layout: revision (1 byte), sub-authority count (1 byte), identifier
/// authority (6 bytes, big-endian), then one little-endian `u32` per
/// sub-authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecurityIdentifier {
    revision: u8,
    authority: u64,
    sub_authorities: Vec<u32>,
}

impl SecurityIdentifier {
    const HEADER_LEN: usize = 8;

    pub fn new(revision: u8, authority: u64, sub_authorities: Vec<u32>) -> Self {
        Self {
            revision,
            authority,
            sub_authorities,
        }
    }

    /// Parses the binary representation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValueError> {
        if bytes.len() < Self::HEADER_LEN {
            return Err(ValueError::TruncatedSid(bytes.len()));
        }
        let revision = bytes[0];
        let count = usize::from(bytes[1]);
        let expected = Self::HEADER_LEN + 4 * count;
        if bytes.len() < expected {
            return Err(ValueError::TruncatedSid(bytes.len()));
        }
        let authority = bytes[2..8]
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
        let sub_authorities = bytes[Self::HEADER_LEN..expected]
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Ok(Self {
            revision,
            authority,
            sub_authorities,
        })
    }

    /// Serializes back into the binary representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::HEADER_LEN + 4 * self.sub_authorities.len());
        bytes.push(self.revision);
        bytes.push(self.sub_authorities.len() as u8);
        bytes.extend_from_slice(&self.authority.to_be_bytes()[2..]);
        for sub_authority in &self.sub_authorities {
            bytes.extend_from_slice(&sub_authority.to_le_bytes());
        }
        bytes
    }

    pub fn revision(&self) -> u8 {
        self.revision
    }

    pub fn authority(&self) -> u64 {
        self.authority
    }

    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authorities
    }

    /// The relative identifier, i.e. the last sub-authority.
    pub fn rid(&self) -> Option<u32> {
        self.sub_authorities.last().copied()
    }
}

impl fmt::Display for SecurityIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}-", self.revision)?;
        // Authorities of 2^32 and above are rendered in hex.
        if self.authority >> 32 == 0 {
            write!(f, "{}", self.authority)?;
        } else {
            write!(f, "0x{:012X}", self.authority)?;
        }
        for sub_authority in &self.sub_authorities {
            write!(f, "-{sub_authority}")?;
        }
        Ok(())
    }
}

impl FromStr for SecurityIdentifier {
    type Err = ValueError;

    /// Parses the `S-1-5-21-...` string form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValueError::Type {
            expected: "security identifier string",
            actual: "string",
        };
        let mut parts = s.strip_prefix("S-").ok_or_else(invalid)?.split('-');
        let revision = parts
            .next()
            .and_then(|r| r.parse().ok())
            .ok_or_else(invalid)?;
        let authority = parts
            .next()
            .and_then(|a| match a.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => a.parse().ok(),
            })
            .ok_or_else(invalid)?;
        let sub_authorities = parts
            .map(|p| p.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(revision, authority, sub_authorities))
    }
}

impl Serialize for SecurityIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
