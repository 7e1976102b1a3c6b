//!
//! Read access to Active Directory entries through a pluggable directory provider.
//!
//! ## Core Concepts
//!
//! * **Paths (`path::LdapPath`)**: Distinguished names parsed into ordered `keyword=value` components, compared by their canonical form.
//! * **Values (`data::Value`)**: Typed attribute values (timestamps, GUIDs, security identifiers, flag sets) converted from the provider's native representation.
//! * **Registries (`data::mapping`)**: Two-way name/number tables for enumerations and bitmask flags.
//! * **Providers (`provider::Provider`)**: The boundary to the directory service: fetch a record, run a query, describe a class schema.
//! * **Entries (`entry::Entry`)**: One materialized directory object, tagged with its kind (user, group, computer, ...).
//! * **Cache (`cache::EntryCache`)**: At most one entry object per canonical path.
//! * **Directory (`directory::Directory`)**: The session object tying provider, cache and configuration together; entry point for lookups, searches and group walks.

pub mod cache;
pub mod config;
pub mod constants;
pub mod data;
pub mod directory;
pub mod entry;
pub mod path;
pub mod provider;
pub mod search;
pub mod walk;

/// Re-export the `Directory` struct for easier access.
pub use directory::Directory;
pub use entry::{Entry, EntryKind};
pub use path::{LdapPath, PathComponent};

use data::ValueError;
use provider::ProviderError;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A path string could not be parsed.
    #[error("Malformed path {path:?}: {reason}")]
    MalformedPath { path: String, reason: String },

    /// The provider could not fetch the record at `path`.
    #[error("Lookup of {path} failed: {source}")]
    Lookup {
        path: String,
        #[source]
        source: ProviderError,
    },

    /// The provider failed to run, or to continue running, a query.
    #[error("Query failed: {source}\n{query}")]
    Query {
        query: String,
        #[source]
        source: ProviderError,
    },

    /// The provider could not describe the attributes of a class.
    #[error("Schema of class {class} unavailable: {source}")]
    Schema {
        class: String,
        #[source]
        source: ProviderError,
    },

    /// The attribute is not declared for this entry.
    #[error("{entry} has no attribute {name}")]
    UnknownAttribute { entry: String, name: String },

    /// No name is registered for a value in an enumeration.
    #[error("{value} is not a known value of {mapping}")]
    UnknownEnumValue { mapping: &'static str, value: i64 },

    /// A raw attribute value could not be converted.
    #[error("Cannot convert attribute {attribute}: {source}")]
    Conversion {
        attribute: String,
        #[source]
        source: ValueError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A thread panicked while holding the entry cache lock.
    #[error("Entry cache lock poisoned")]
    CacheLock,
}
