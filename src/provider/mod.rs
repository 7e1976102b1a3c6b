//!
//! The boundary to the directory service.
//!
//! A `Provider` is the external collaborator that actually talks to the directory:
//! it fetches single records by path, executes queries and describes class schemas.
//! Everything above this trait (path model, conversions, caching, traversal) is
//! independent of how the provider reaches the directory.

use crate::constants::{ADS_PATH, USER_ACCOUNT_CONTROL};
use crate::path::LdapPath;
use crate::search::Predicate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod in_memory;

pub use in_memory::InMemoryProvider;

/// Errors reported by a `Provider`.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("No such object: {0}")]
    NoSuchObject(String),

    #[error("Unknown object class: {0}")]
    UnknownClass(String),

    #[error("Unsupported query: {0}")]
    Unsupported(String),

    #[error("Provider failure: {0}")]
    Failed(String),

    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Result type of `Provider` calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// A lazily produced sequence of query results.
///
/// A provider that fails while producing results yields an `Err` item; consumers
/// treat it as the end of the sequence.
pub type RecordStream<'a> = Box<dyn Iterator<Item = ProviderResult<RawRecord>> + 'a>;

/// Provider trait abstracting the directory service.
///
/// Implementations must be `Send` and `Sync` so a `Directory` can be shared across
/// threads. Calls may block and may fail; the core neither retries nor times them out.
pub trait Provider: Send + Sync {
    /// Fetches the record stored at `url`, the absolute (`LDAP://`) canonical path.
    fn fetch(&self, url: &str) -> ProviderResult<RawRecord>;

    /// Executes a query and returns its results lazily.
    ///
    /// # Arguments
    /// * `request` - Base path, predicate, selected attributes and the paging hint.
    fn execute_query(&self, request: &QueryRequest) -> ProviderResult<RecordStream<'_>>;

    /// Returns the attribute names declared for `object_class`.
    fn schema(&self, object_class: &str) -> ProviderResult<ClassSchema>;

    /// Returns the default naming context (the domain root's distinguished name),
    /// read from the rootDSE of `server` or of the logged-on domain.
    fn default_naming_context(&self, server: Option<&str>) -> ProviderResult<String>;
}

/// An attribute value in the provider's native representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawValue {
    /// The attribute exists but holds no value.
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
    Binary(#[serde(with = "base64_bytes")] Vec<u8>),
    /// A 64-bit integer delivered as two signed 32-bit halves.
    LargeInteger { high: i64, low: i64 },
    /// An opaque provider-native object (e.g. a COM dispatch handle); never stored.
    Handle(String),
    List(Vec<RawValue>),
}

impl RawValue {
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        RawValue::Binary(bytes.into())
    }

    pub fn large_integer(high: i64, low: i64) -> Self {
        RawValue::LargeInteger { high, low }
    }

    /// Splits a 100-nanosecond tick count into its signed 32-bit halves.
    pub fn from_ticks(ticks: u64) -> Self {
        RawValue::LargeInteger {
            high: i64::from((ticks >> 32) as u32 as i32),
            low: i64::from(ticks as u32 as i32),
        }
    }

    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        RawValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Short name of the value's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Bool(_) => "bool",
            RawValue::Integer(_) => "integer",
            RawValue::String(_) => "string",
            RawValue::Binary(_) => "binary",
            RawValue::LargeInteger { .. } => "large integer",
            RawValue::Handle(_) => "handle",
            RawValue::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Whether this is an opaque handle or a non-empty list of them.
    pub fn is_handle(&self) -> bool {
        match self {
            RawValue::Handle(_) => true,
            RawValue::List(items) => items.first().is_some_and(RawValue::is_handle),
            _ => false,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RawValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::String(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::String(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Integer(i)
    }
}

impl From<i32> for RawValue {
    fn from(i: i32) -> Self {
        RawValue::Integer(i64::from(i))
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

/// One directory object as delivered by the provider.
///
/// Attribute names are looked up case-insensitively, like the directory does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    path: String,
    object_class: String,
    attributes: BTreeMap<String, RawValue>,
}

impl RawRecord {
    /// Creates a record without attributes.
    ///
    /// # Arguments
    /// * `path` - The record's path, with or without the `LDAP://` prefix.
    /// * `object_class` - The most specific declared object class, e.g. `user`.
    pub fn new(path: impl Into<String>, object_class: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            object_class: object_class.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds or replaces an attribute, returning the record for chaining.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Adds or replaces an attribute in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn object_class(&self) -> &str {
        &self.object_class
    }

    /// The value of `name`, or `None` if the record does not carry it at all.
    pub fn get_attribute(&self, name: &str) -> Option<&RawValue> {
        self.attributes.get(name).or_else(|| {
            self.attributes
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    /// Iterates over all attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// The attribute names a class declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSchema {
    #[serde(default)]
    pub mandatory: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
    /// Whether objects of this class may contain other objects.
    #[serde(default)]
    pub container: bool,
}

impl ClassSchema {
    pub fn new(
        mandatory: impl IntoIterator<Item = impl Into<String>>,
        optional: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            mandatory: mandatory.into_iter().map(Into::into).collect(),
            optional: optional.into_iter().map(Into::into).collect(),
            container: false,
        }
    }

    pub fn with_container(mut self, container: bool) -> Self {
        self.container = container;
        self
    }

    /// Mandatory then optional names, each name once.
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.mandatory
            .iter()
            .chain(self.optional.iter())
            .map(String::as_str)
            .filter(|name| seen.insert(name.to_ascii_lowercase()))
            .collect()
    }
}

/// A query as handed to `Provider::execute_query`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    base: LdapPath,
    predicate: Predicate,
    attributes: Vec<String>,
    page_size: u32,
}

impl QueryRequest {
    /// Creates a request selecting the path and account control attributes.
    pub fn new(base: LdapPath, predicate: Predicate, page_size: u32) -> Self {
        Self {
            base,
            predicate,
            attributes: vec![ADS_PATH.to_string(), USER_ACCOUNT_CONTROL.to_string()],
            page_size,
        }
    }

    /// Replaces the selected attributes.
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn base(&self) -> &LdapPath {
        &self.base
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The SQL dialect statement understood by ADSI providers, e.g.
    ///
    /// ```text
    /// SELECT ADsPath, userAccountControl
    /// FROM 'LDAP://dc=example,dc=com'
    /// WHERE objectCategory='group' AND cn='Staff'
    /// ```
    pub fn statement(&self) -> String {
        let mut lines = vec![
            format!("SELECT {}", self.attributes.join(", ")),
            format!("FROM '{}'", self.base.url()),
        ];
        if !self.predicate.is_empty() {
            lines.push(format!("WHERE {}", self.predicate));
        }
        lines.join("\n")
    }
}

/// Serde helper storing binary values as standard base64 strings.
mod base64_bytes {
    use base64ct::{Base64, Encoding};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Base64::decode_vec(&encoded).map_err(serde::de::Error::custom)
    }
}
