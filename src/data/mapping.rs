//!
//! Two-way registries between symbolic names and 32-bit numbers.
//!
//! `IntegerMapping` resolves enumeration values (one name per number),
//! `FlagsMapping` resolves bitmasks into the set of contained flag names.
//! Numbers are normalized to unsigned 32 bits, so `-2147483646` and
//! `0x80000002` address the same bits.

use crate::data::to_unsigned;
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

/// A registry of names and unsigned 32-bit numbers with lookups in both directions.
///
/// Several names may share a number. Name lookups see every alias, number lookups
/// resolve to the alias registered first.
#[derive(Debug, Clone)]
pub struct IntegerMapping {
    label: &'static str,
    items: Vec<(&'static str, u32)>,
    names: HashMap<&'static str, u32>,
    numbers: HashMap<u32, &'static str>,
}

impl IntegerMapping {
    /// Creates a registry from `(name, number)` pairs.
    ///
    /// # Arguments
    /// * `label` - Name of the registry, used in error messages.
    /// * `items` - The registered names and their numbers, in registration order.
    pub fn new(label: &'static str, items: &[(&'static str, u32)]) -> Self {
        let mut names = HashMap::with_capacity(items.len());
        let mut numbers = HashMap::with_capacity(items.len());
        for &(name, number) in items {
            names.insert(name, number);
            numbers.entry(number).or_insert(name);
        }
        Self {
            label,
            items: items.to_vec(),
            names,
            numbers,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// The number registered for `name`.
    pub fn number(&self, name: &str) -> Option<u32> {
        self.names.get(name).copied()
    }

    /// The name registered for `number`, which may be given signed or unsigned.
    ///
    /// # Errors
    /// Returns `Error::UnknownEnumValue` if no name is registered for the number.
    pub fn name(&self, number: i64) -> Result<&'static str> {
        let unsigned = to_unsigned(number).map_err(|_| Error::UnknownEnumValue {
            mapping: self.label,
            value: number,
        })?;
        self.numbers
            .get(&unsigned)
            .copied()
            .ok_or(Error::UnknownEnumValue {
                mapping: self.label,
                value: number,
            })
    }

    /// All `(name, number)` pairs in registration order.
    pub fn items(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        self.items.iter().copied()
    }
}

/// A registry of named bitmasks.
#[derive(Debug, Clone)]
pub struct FlagsMapping {
    inner: IntegerMapping,
}

impl FlagsMapping {
    pub fn new(label: &'static str, items: &[(&'static str, u32)]) -> Self {
        Self {
            inner: IntegerMapping::new(label, items),
        }
    }

    pub fn label(&self) -> &'static str {
        self.inner.label()
    }

    /// The bitmask registered for `name`.
    pub fn number(&self, name: &str) -> Option<u32> {
        self.inner.number(name)
    }

    /// The names of all flags whose complete bitmask is set in `number`.
    ///
    /// A flag counts only when `number & mask == mask`; sharing a single bit with
    /// a multi-bit mask is not enough. Zero masks never match.
    pub fn flag_names(&self, number: u32) -> BTreeSet<&'static str> {
        self.inner
            .items()
            .filter(|&(_, mask)| mask != 0 && number & mask == mask)
            .map(|(name, _)| name)
            .collect()
    }

    /// Whether every bit of the flag `name` is set in `number`.
    pub fn contains(&self, number: u32, name: &str) -> bool {
        self.number(name)
            .is_some_and(|mask| mask != 0 && number & mask == mask)
    }

    pub fn items(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        self.inner.items()
    }
}

/// Group type flags (`groupType`).
pub static GROUP_TYPES: LazyLock<FlagsMapping> = LazyLock::new(|| {
    FlagsMapping::new(
        "GROUP_TYPES",
        &[
            ("GLOBAL_GROUP", 0x0000_0002),
            ("DOMAIN_LOCAL_GROUP", 0x0000_0004),
            ("LOCAL_GROUP", 0x0000_0004),
            ("UNIVERSAL_GROUP", 0x0000_0008),
            ("SECURITY_ENABLED", 0x8000_0000),
        ],
    )
});

/// ADSI bind authentication flags.
pub static AUTHENTICATION_TYPES: LazyLock<FlagsMapping> = LazyLock::new(|| {
    FlagsMapping::new(
        "AUTHENTICATION_TYPES",
        &[
            ("SECURE_AUTHENTICATION", 0x01),
            ("USE_ENCRYPTION", 0x02),
            ("USE_SSL", 0x02),
            ("READONLY_SERVER", 0x04),
            ("PROMPT_CREDENTIALS", 0x08),
            ("NO_AUTHENTICATION", 0x10),
            ("FAST_BIND", 0x20),
            ("USE_SIGNING", 0x40),
            ("USE_SEALING", 0x80),
            ("USE_DELEGATION", 0x100),
            ("SERVER_BIND", 0x200),
            ("AUTH_RESERVED", 0x8000_0000),
        ],
    )
});

/// SAM account types (`sAMAccountType`).
pub static SAM_ACCOUNT_TYPES: LazyLock<IntegerMapping> = LazyLock::new(|| {
    IntegerMapping::new(
        "SAM_ACCOUNT_TYPES",
        &[
            ("SAM_DOMAIN_OBJECT", 0x0),
            ("SAM_GROUP_OBJECT", 0x1000_0000),
            ("SAM_NON_SECURITY_GROUP_OBJECT", 0x1000_0001),
            ("SAM_ALIAS_OBJECT", 0x2000_0000),
            ("SAM_NON_SECURITY_ALIAS_OBJECT", 0x2000_0001),
            ("SAM_USER_OBJECT", 0x3000_0000),
            ("SAM_NORMAL_USER_ACCOUNT", 0x3000_0000),
            ("SAM_MACHINE_ACCOUNT", 0x3000_0001),
            ("SAM_TRUST_ACCOUNT", 0x3000_0002),
            ("SAM_APP_BASIC_GROUP", 0x4000_0000),
            ("SAM_APP_QUERY_GROUP", 0x4000_0001),
            ("SAM_ACCOUNT_TYPE_MAX", 0x7fff_ffff),
        ],
    )
});

/// Account control flags (`userAccountControl`).
pub static USER_ACCOUNT_CONTROL: LazyLock<FlagsMapping> = LazyLock::new(|| {
    FlagsMapping::new(
        "USER_ACCOUNT_CONTROL",
        &[
            ("ADS_UF_SCRIPT", 0x0000_0001),
            ("ADS_UF_ACCOUNTDISABLE", 0x0000_0002),
            ("ADS_UF_HOMEDIR_REQUIRED", 0x0000_0008),
            ("ADS_UF_LOCKOUT", 0x0000_0010),
            ("ADS_UF_PASSWD_NOTREQD", 0x0000_0020),
            ("ADS_UF_PASSWD_CANT_CHANGE", 0x0000_0040),
            ("ADS_UF_ENCRYPTED_TEXT_PASSWORD_ALLOWED", 0x0000_0080),
            ("ADS_UF_TEMP_DUPLICATE_ACCOUNT", 0x0000_0100),
            ("ADS_UF_NORMAL_ACCOUNT", 0x0000_0200),
            ("ADS_UF_INTERDOMAIN_TRUST_ACCOUNT", 0x0000_0800),
            ("ADS_UF_WORKSTATION_TRUST_ACCOUNT", 0x0000_1000),
            ("ADS_UF_SERVER_TRUST_ACCOUNT", 0x0000_2000),
            ("ADS_UF_DONT_EXPIRE_PASSWD", 0x0001_0000),
            ("ADS_UF_MNS_LOGON_ACCOUNT", 0x0002_0000),
            ("ADS_UF_SMARTCARD_REQUIRED", 0x0004_0000),
            ("ADS_UF_TRUSTED_FOR_DELEGATION", 0x0008_0000),
            ("ADS_UF_NOT_DELEGATED", 0x0010_0000),
            ("ADS_UF_USE_DES_KEY_ONLY", 0x0020_0000),
            ("ADS_UF_DONT_REQUIRE_PREAUTH", 0x0040_0000),
            ("ADS_UF_PASSWORD_EXPIRED", 0x0080_0000),
            ("ADS_UF_TRUSTED_TO_AUTHENTICATE_FOR_DELEGATION", 0x0100_0000),
        ],
    )
});

/// Name of the account-disabled flag in `USER_ACCOUNT_CONTROL`.
pub const ACCOUNT_DISABLED: &str = "ADS_UF_ACCOUNTDISABLE";
