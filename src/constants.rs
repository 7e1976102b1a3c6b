//! Constants used throughout the library.
//!
//! This module provides central definitions for protocol markers, well-known
//! attribute names and numeric sentinels shared by the path model, the value
//! converters and the search layer.

/// Protocol marker prefixed to a distinguished name to form an absolute path.
pub const LDAP_URL_PREFIX: &str = "LDAP://";

/// Name of the rootDSE pseudo entry holding the naming contexts.
pub const ROOT_DSE: &str = "rootDSE";

/// High part of a large integer timestamp that means "never".
pub const TIME_NEVER_HIGH_PART: u32 = 0x7fff_ffff;

/// Number of 100-nanosecond ticks per microsecond.
pub const TICKS_PER_MICROSECOND: u64 = 10;

/// Default page size requested from the provider for every query.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Attribute returned by every query: the absolute path of the found entry.
pub const ADS_PATH: &str = "ADsPath";

/// Stable unique identifier of a directory object.
pub const OBJECT_GUID: &str = "objectGUID";

/// Multi-valued list of member paths of a group.
pub const MEMBER: &str = "member";

/// Account control bitmask of users and computers.
pub const USER_ACCOUNT_CONTROL: &str = "userAccountControl";

/// Security descriptor; expensive to read and never materialized by default.
pub const NT_SECURITY_DESCRIPTOR: &str = "nTSecurityDescriptor";

/// Attributes `find_user` matches a free-text name against by default.
pub const DEFAULT_USER_SEARCH_FIELDS: [&str; 3] = ["sAMAccountName", "displayName", "cn"];
