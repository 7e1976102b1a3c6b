//!
//! Search predicates, preset filters and the lazy result sequence.
//!
//! A `SearchFilter` pairs an optional primary-key attribute with fixed constraints
//! that give the filter its identity ("this is a group search"). Combined with
//! caller clauses and constraints it produces a `Predicate`, which renders as the
//! `WHERE` clause of the provider's SQL dialect.

use crate::constants::USER_ACCOUNT_CONTROL;
use crate::data::mapping::{ACCOUNT_DISABLED, USER_ACCOUNT_CONTROL as UAC_FLAGS};
use crate::data::to_unsigned;
use crate::path::LdapPath;
use crate::provider::{RawRecord, RecordStream};
use crate::{Error, Result};
use std::fmt;
use tracing::trace;

/// A boolean condition over directory attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `attribute='value'`; the value may contain `*` wildcards.
    Equals { attribute: String, value: String },
    /// Free-form predicate text passed to the provider verbatim.
    Raw(String),
    /// All conditions hold. An empty conjunction matches everything.
    And(Vec<Predicate>),
    /// At least one condition holds.
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn equals(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Predicate::Raw(text.into())
    }

    /// The predicate matching every entry.
    pub fn everything() -> Self {
        Predicate::And(Vec::new())
    }

    /// Conjunction of `predicates`, flattening nested conjunctions and dropping
    /// empty ones. A single remaining predicate is returned as is.
    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut parts = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::And(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }
        if parts.len() == 1 {
            return parts.remove(0);
        }
        Predicate::And(parts)
    }

    /// Disjunction of `predicates`, flattening nested disjunctions.
    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut parts = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::Or(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }
        if parts.len() == 1 {
            return parts.remove(0);
        }
        Predicate::Or(parts)
    }

    /// Whether this predicate matches everything.
    pub fn is_empty(&self) -> bool {
        matches!(self, Predicate::And(parts) if parts.iter().all(Predicate::is_empty))
    }

    /// Whether any part is free-form text.
    pub fn contains_raw(&self) -> bool {
        match self {
            Predicate::Raw(_) => true,
            Predicate::Equals { .. } => false,
            Predicate::And(parts) | Predicate::Or(parts) => parts.iter().any(Predicate::contains_raw),
        }
    }

    /// Writes `self` as an operand of a compound expression.
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equals { .. } => write!(f, "{self}"),
            Predicate::And(parts) | Predicate::Or(parts) if parts.len() < 2 => write!(f, "{self}"),
            _ => write!(f, "({self})"),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equals { attribute, value } => {
                write!(f, "{attribute}='{}'", value.replace('\'', "''"))
            }
            Predicate::Raw(text) => f.write_str(text),
            Predicate::And(parts) | Predicate::Or(parts) => {
                let separator = if matches!(self, Predicate::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                if let [single] = parts.as_slice() {
                    return write!(f, "{single}");
                }
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        f.write_str(separator)?;
                    }
                    part.fmt_operand(f)?;
                }
                Ok(())
            }
        }
    }
}

/// An optional primary-key attribute plus fixed `attribute=value` constraints.
///
/// # Example
///
/// ```
/// # use active_directory::search::{FilterKind, Predicate, SearchFilter};
/// let filter = SearchFilter::preset(FilterKind::Group);
/// let predicate = filter.build_predicate(Vec::new(), &[], Some("Staff"));
/// assert_eq!(predicate.to_string(), "cn='Staff' AND objectCategory='group'");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchFilter {
    primary_key: Option<String>,
    fixed: Vec<(String, String)>,
}

impl SearchFilter {
    /// Creates a filter.
    ///
    /// # Arguments
    /// * `primary_key` - Attribute matched against a single caller-supplied identifier.
    /// * `fixed` - Constraints every search through this filter carries.
    pub fn new<K, V>(primary_key: Option<&str>, fixed: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            primary_key: primary_key.map(str::to_string),
            fixed: fixed
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The filter matching everything, with no primary key.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// One of the preset filters.
    pub fn preset(kind: FilterKind) -> Self {
        match kind {
            FilterKind::Computer => Self::new(Some("cn"), [("objectCategory", "Computer")]),
            FilterKind::Group => Self::new(Some("cn"), [("objectCategory", "group")]),
            FilterKind::OrganizationalUnit => {
                Self::new(Some("ou"), [("objectClass", "organizationalUnit")])
            }
            FilterKind::PublicFolder => {
                Self::new(Some("displayName"), [("objectClass", "publicFolder")])
            }
            FilterKind::UserId => Self::new(
                Some("sAMAccountName"),
                [("objectCategory", "Person"), ("objectClass", "User")],
            ),
        }
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn fixed(&self) -> &[(String, String)] {
        &self.fixed
    }

    /// Builds the predicate for one search.
    ///
    /// Caller clauses come first, then caller constraints, then the primary key,
    /// then the fixed constraints, all joined with AND. On a key collision
    /// (attribute names compared case-insensitively) the fixed constraints win over
    /// the primary key, and the primary key wins over caller constraints.
    ///
    /// # Arguments
    /// * `clauses` - Free predicates supplied by the caller.
    /// * `constraints` - Caller `attribute=value` constraints.
    /// * `primary_key_value` - Value for the primary-key attribute, if the filter has one.
    pub fn build_predicate(
        &self,
        clauses: Vec<Predicate>,
        constraints: &[(&str, &str)],
        primary_key_value: Option<&str>,
    ) -> Predicate {
        let primary_key = match (&self.primary_key, primary_key_value) {
            (Some(key), Some(value)) if !value.is_empty() => Some((key.as_str(), value)),
            _ => None,
        };
        let fixed_has = |attribute: &str| {
            self.fixed
                .iter()
                .any(|(key, _)| key.eq_ignore_ascii_case(attribute))
        };

        let mut parts = clauses;
        for &(attribute, value) in constraints {
            let overridden = fixed_has(attribute)
                || primary_key.is_some_and(|(key, _)| key.eq_ignore_ascii_case(attribute));
            if !overridden {
                parts.push(Predicate::equals(attribute, value));
            }
        }
        if let Some((key, value)) = primary_key {
            if !fixed_has(key) {
                parts.push(Predicate::equals(key, value));
            }
        }
        parts.extend(
            self.fixed
                .iter()
                .map(|(key, value)| Predicate::equals(key.as_str(), value.as_str())),
        );
        Predicate::and(parts)
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fixed: Vec<String> = self
            .fixed
            .iter()
            .map(|(key, value)| format!("{key}='{value}'"))
            .collect();
        write!(
            f,
            "SearchFilter using {}, with fixed value(s) {}",
            self.primary_key.as_deref().unwrap_or("<none>"),
            fixed.join(", ")
        )
    }
}

/// The preset filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Computer,
    Group,
    OrganizationalUnit,
    PublicFolder,
    /// Users, identified by `sAMAccountName`.
    UserId,
}

/// Lazy sequence of paths found by a query.
///
/// When an account state is requested, records whose `userAccountControl` does not
/// match are skipped; records without that attribute are passed through. A provider
/// failure is yielded once as an `Err`, after which the sequence ends.
pub struct Search<'a> {
    records: RecordStream<'a>,
    query: String,
    active: Option<bool>,
    done: bool,
}

impl<'a> Search<'a> {
    pub(crate) fn new(records: RecordStream<'a>, query: String, active: Option<bool>) -> Self {
        Self {
            records,
            query,
            active,
            done: false,
        }
    }

    /// The statement this search executes.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether `record` passes the account state filter.
    fn admits(&self, record: &RawRecord) -> bool {
        let Some(active) = self.active else {
            return true;
        };
        let Some(number) = record
            .get_attribute(USER_ACCOUNT_CONTROL)
            .and_then(|raw| raw.as_integer())
            .and_then(|number| to_unsigned(number).ok())
        else {
            return true;
        };
        let disabled = UAC_FLAGS.contains(number, ACCOUNT_DISABLED);
        disabled != active
    }
}

impl Iterator for Search<'_> {
    type Item = Result<LdapPath>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.records.next()? {
                Err(source) => {
                    self.done = true;
                    return Some(Err(Error::Query {
                        query: self.query.clone(),
                        source,
                    }));
                }
                Ok(record) => {
                    if self.admits(&record) {
                        return Some(LdapPath::parse(record.path()));
                    }
                    trace!(path = record.path(), active = ?self.active, "Skipping record by account state");
                }
            }
        }
    }
}
