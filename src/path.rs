//!
//! Distinguished names and the absolute paths built from them.
//!
//! An `LdapPath` is an ordered, non-empty list of `PathComponent`s, most specific
//! first, e.g. `cn=Users,dc=example,dc=com`. Keywords are normalized to lower case,
//! values keep their case. Commas and equal signs preceded by a backslash are part
//! of a value and never act as separators.

use crate::constants::LDAP_URL_PREFIX;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One `keyword=value` part of a distinguished name.
///
/// Both parts are trimmed and the keyword is lower-cased on construction, so two
/// components compare equal exactly when their normalized string forms do.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathComponent {
    keyword: String,
    value: String,
}

impl PathComponent {
    /// Creates a component from its keyword and value.
    ///
    /// Both parts are taken in their escaped form: a comma, equal sign or
    /// backslash belonging to the value is written with a leading backslash,
    /// e.g. `Doe\, John`. Trimming keeps a backslash-escaped trailing space.
    ///
    /// # Errors
    /// Returns `Error::MalformedPath` if either part is empty after trimming,
    /// contains an unescaped `,` or `=`, or ends in an unpaired backslash.
    pub fn new(keyword: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let keyword = trim_escaped(keyword.as_ref()).to_lowercase();
        let value = trim_escaped(value.as_ref()).to_string();
        let malformed = |reason: &str| Error::MalformedPath {
            path: format!("{keyword}={value}"),
            reason: reason.to_string(),
        };
        if keyword.is_empty() || value.is_empty() {
            return Err(malformed("keyword and value must not be empty"));
        }
        for part in [&keyword, &value] {
            if split_unescaped(part, ',').len() > 1 || split_unescaped(part, '=').len() > 1 {
                return Err(malformed("unescaped ',' or '=' in keyword or value"));
            }
            if ends_with_escape(part) {
                return Err(malformed("trailing unpaired '\\'"));
            }
        }
        Ok(Self { keyword, value })
    }

    /// Parses a single `keyword=value` segment.
    ///
    /// The segment must contain exactly one unescaped `=`.
    pub fn parse(segment: &str) -> Result<Self> {
        let parts = split_unescaped(segment, '=');
        match parts.as_slice() {
            [keyword, value] => Self::new(keyword, value),
            _ => Err(Error::MalformedPath {
                path: segment.to_string(),
                reason: format!(
                    "expected exactly one unescaped '=', found {}",
                    parts.len() - 1
                ),
            }),
        }
    }

    /// The lower-cased keyword, e.g. `cn`.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// The value, case preserved.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.keyword, self.value)
    }
}

impl FromStr for PathComponent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A distinguished name, the canonical address of a directory entry.
///
/// Equality and hashing follow the canonical string form, so two independently
/// parsed instances of the same name are interchangeable as cache keys.
///
/// # Example
///
/// ```
/// # use active_directory::path::LdapPath;
/// let users = LdapPath::parse("LDAP://CN=Users,DC=example,DC=com").unwrap();
/// assert_eq!(users.to_string(), "cn=Users,dc=example,dc=com");
/// assert_eq!(users.rdn(), "Users");
///
/// let alice = users.join("cn=Alice").unwrap();
/// assert_eq!(alice.url(), "LDAP://cn=Alice,cn=Users,dc=example,dc=com");
/// assert_eq!(alice.parent(), Some(users));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LdapPath {
    components: Vec<PathComponent>,
}

impl LdapPath {
    /// Creates a path from its components, most specific first.
    ///
    /// # Errors
    /// Returns `Error::MalformedPath` if `components` is empty.
    pub fn new(components: Vec<PathComponent>) -> Result<Self> {
        if components.is_empty() {
            return Err(Error::MalformedPath {
                path: String::new(),
                reason: "empty paths are not supported".to_string(),
            });
        }
        Ok(Self { components })
    }

    /// Parses a distinguished name, with or without the `LDAP://` prefix.
    ///
    /// The prefix is matched case-insensitively. The remainder is split on commas
    /// not preceded by a backslash and every segment is parsed as a `PathComponent`.
    ///
    /// # Errors
    /// Returns `Error::MalformedPath` for empty input or an invalid segment; the
    /// error carries the complete input string.
    pub fn parse(string: &str) -> Result<Self> {
        let stripped = strip_url_prefix(string);
        if stripped.trim().is_empty() {
            return Err(Error::MalformedPath {
                path: string.to_string(),
                reason: "empty paths are not supported".to_string(),
            });
        }
        let components = split_unescaped(stripped, ',')
            .into_iter()
            .map(PathComponent::parse)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| match e {
                Error::MalformedPath { path, reason } => Error::MalformedPath {
                    path: string.to_string(),
                    reason: format!("invalid component {path:?}: {reason}"),
                },
                other => other,
            })?;
        Self::new(components)
    }

    /// The components, most specific first.
    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    /// Number of components; always at least one.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Always `false`; paths cannot be empty.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterates over the components, most specific first.
    pub fn iter(&self) -> std::slice::Iter<'_, PathComponent> {
        self.components.iter()
    }

    /// The relative distinguished name, i.e. the value of the first component.
    pub fn rdn(&self) -> &str {
        self.components[0].value()
    }

    /// The absolute rendering, prefixed with `LDAP://`.
    pub fn url(&self) -> String {
        format!("{LDAP_URL_PREFIX}{self}")
    }

    /// Returns a new path with `component` prepended. `self` is left unchanged.
    pub fn child(&self, component: PathComponent) -> Self {
        let mut components = Vec::with_capacity(self.components.len() + 1);
        components.push(component);
        components.extend(self.components.iter().cloned());
        Self { components }
    }

    /// Returns a new path with every component of `relative` prepended,
    /// e.g. joining `cn=Alice,ou=Staff` below `dc=example,dc=com`.
    pub fn join(&self, relative: &str) -> Result<Self> {
        let relative = Self::parse(relative)?;
        let mut components = relative.components;
        components.extend(self.components.iter().cloned());
        Ok(Self { components })
    }

    /// The containing path, or `None` for a single-component path.
    pub fn parent(&self) -> Option<Self> {
        if self.components.len() < 2 {
            return None;
        }
        Some(Self {
            components: self.components[1..].to_vec(),
        })
    }

    /// All values stored under `keyword` (case-insensitive), in path order.
    pub fn values(&self, keyword: &str) -> Vec<&str> {
        let keyword = keyword.trim().to_lowercase();
        self.components
            .iter()
            .filter(|component| component.keyword == keyword)
            .map(PathComponent::value)
            .collect()
    }

    /// The first `cn` value, if any.
    pub fn common_name(&self) -> Option<&str> {
        self.values("cn").into_iter().next()
    }

    /// Whether `self` lies at or below `base`.
    pub fn is_within(&self, base: &LdapPath) -> bool {
        self.components.len() >= base.components.len()
            && self.components[self.components.len() - base.components.len()..]
                == base.components[..]
    }
}

impl fmt::Display for LdapPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, component) in self.components.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

impl FromStr for LdapPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LdapPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for LdapPath {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<LdapPath> for String {
    fn from(path: LdapPath) -> Self {
        path.to_string()
    }
}

impl<'a> IntoIterator for &'a LdapPath {
    type Item = &'a PathComponent;
    type IntoIter = std::slice::Iter<'a, PathComponent>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

/// Removes a leading `LDAP://` (any case) from `string`.
fn strip_url_prefix(string: &str) -> &str {
    match string.get(..LDAP_URL_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(LDAP_URL_PREFIX) => &string[LDAP_URL_PREFIX.len()..],
        _ => string,
    }
}

/// Splits `input` on every `separator` not escaped by a backslash. A backslash
/// escapes exactly the character after it, so `\\,` is an escaped backslash
/// followed by a separator.
fn split_unescaped(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (index, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(&input[start..index]);
            start = index + c.len_utf8();
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Whether `input` ends in a backslash that escapes nothing.
fn ends_with_escape(input: &str) -> bool {
    input.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Trims surrounding whitespace, keeping a trailing space escaped by a backslash.
fn trim_escaped(input: &str) -> &str {
    let input = input.trim_start();
    let trimmed = input.trim_end();
    if !ends_with_escape(trimmed) {
        return trimmed;
    }
    match input[trimmed.len()..].chars().next() {
        Some(escaped) => &input[..trimmed.len() + escaped.len_utf8()],
        None => trimmed,
    }
}
