use crate::constants::ROOT_DSE;
use crate::path::LdapPath;
use crate::provider::{
    ClassSchema, Provider, ProviderError, ProviderResult, QueryRequest, RawRecord, RawValue,
    RecordStream,
};
use crate::search::Predicate;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// A directory held entirely in memory.
///
/// Records are keyed by their lower-cased canonical path, schemas by lower-cased
/// class name.
/// Queries support equality predicates with `*` wildcards combined by AND and OR;
/// matching is case-insensitive and limited to the subtree below the query base.
///
/// It provides basic persistence via `save_to_file` and `load_from_file`,
/// serializing the whole directory to JSON (binary values as base64).
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct InMemoryProvider {
    records: BTreeMap<String, RawRecord>,
    schemas: HashMap<String, ClassSchema>,
    naming_context: Option<String>,
}

impl InMemoryProvider {
    /// Creates a new, empty `InMemoryProvider`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the distinguished name reported as the default naming context.
    pub fn with_naming_context(mut self, naming_context: impl Into<String>) -> Self {
        self.naming_context = Some(naming_context.into());
        self
    }

    /// Stores `record`, replacing any record at the same path.
    ///
    /// The record's path is canonicalized, so differently cased or prefixed
    /// spellings of one path address the same record.
    ///
    /// # Errors
    /// Returns `Error::MalformedPath` if the record's path does not parse.
    pub fn insert(&mut self, record: RawRecord) -> Result<()> {
        let path = LdapPath::parse(record.path())?;
        self.records.insert(record_key(&path), record);
        Ok(())
    }

    /// Declares the attributes of `object_class`.
    pub fn add_schema(&mut self, object_class: &str, schema: ClassSchema) {
        self.schemas.insert(object_class.to_ascii_lowercase(), schema);
    }

    /// Removes and returns the record at `path`.
    pub fn remove(&mut self, path: &LdapPath) -> Option<RawRecord> {
        self.records.remove(&record_key(path))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the paths of all stored records, as they were inserted.
    pub fn all_paths(&self) -> Vec<String> {
        self.records
            .values()
            .map(|record| record.path().to_string())
            .collect()
    }

    /// Saves the whole directory to `path` as JSON.
    ///
    /// # Arguments
    /// * `path` - The path to the file where the state should be saved.
    ///
    /// # Returns
    /// A `Result` indicating success or an I/O or serialization error.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Loads a directory from a JSON file.
    ///
    /// If the file does not exist, a new, empty `InMemoryProvider` is returned.
    ///
    /// # Arguments
    /// * `path` - The path to the file from which to load the state.
    ///
    /// # Returns
    /// A `Result` containing the loaded provider or an I/O or deserialization error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Ok(Self::new());
        }
        let json = fs::read_to_string(path)?;
        let loaded: Self = serde_json::from_str(&json)?;
        // Re-key through `insert` so hand-edited files with non-canonical keys still resolve.
        let mut provider = Self {
            records: BTreeMap::new(),
            schemas: HashMap::new(),
            naming_context: loaded.naming_context,
        };
        for (class, schema) in loaded.schemas {
            provider.add_schema(&class, schema);
        }
        for record in loaded.records.into_values() {
            provider.insert(record)?;
        }
        Ok(provider)
    }

    fn record_at(&self, url: &str) -> ProviderResult<&RawRecord> {
        let path = LdapPath::parse(url).map_err(|e| ProviderError::Failed(e.to_string()))?;
        self.records
            .get(&record_key(&path))
            .ok_or_else(|| ProviderError::NoSuchObject(url.to_string()))
    }
}

impl Provider for InMemoryProvider {
    fn fetch(&self, url: &str) -> ProviderResult<RawRecord> {
        self.record_at(url).cloned()
    }

    fn execute_query(&self, request: &QueryRequest) -> ProviderResult<RecordStream<'_>> {
        if request.predicate().contains_raw() {
            return Err(ProviderError::Unsupported(request.predicate().to_string()));
        }
        let base = LdapPath::parse(&record_key(request.base()))
            .map_err(|e| ProviderError::Failed(e.to_string()))?;
        let predicate = request.predicate().clone();
        let records = self.records.iter().filter_map(move |(key, record)| {
            // Keys are canonical paths written by `insert`.
            let path = LdapPath::parse(key).ok()?;
            (path.is_within(&base) && matches(record, &predicate))
                .then(|| Ok::<_, ProviderError>(record.clone()))
        });
        Ok(Box::new(records))
    }

    fn schema(&self, object_class: &str) -> ProviderResult<ClassSchema> {
        self.schemas
            .get(&object_class.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ProviderError::UnknownClass(object_class.to_string()))
    }

    fn default_naming_context(&self, _server: Option<&str>) -> ProviderResult<String> {
        self.naming_context
            .clone()
            .ok_or_else(|| ProviderError::NoSuchObject(ROOT_DSE.to_string()))
    }
}

/// Directory paths compare case-insensitively.
fn record_key(path: &LdapPath) -> String {
    path.to_string().to_lowercase()
}

/// Evaluates `predicate` against `record`. Raw predicates never match.
fn matches(record: &RawRecord, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Equals { attribute, value } => attribute_matches(record, attribute, value),
        Predicate::Raw(_) => false,
        Predicate::And(parts) => parts.iter().all(|part| matches(record, part)),
        Predicate::Or(parts) => parts.iter().any(|part| matches(record, part)),
    }
}

fn attribute_matches(record: &RawRecord, attribute: &str, pattern: &str) -> bool {
    let stored = record.get_attribute(attribute);
    if attribute.eq_ignore_ascii_case("objectClass") {
        return wildcard_match(pattern, record.object_class())
            || stored.is_some_and(|raw| any_text(raw, &|text| wildcard_match(pattern, text)));
    }
    if attribute.eq_ignore_ascii_case("objectCategory") {
        // Categories are stored as the DN of a schema object; its rdn value is the name.
        return match stored {
            Some(raw) => any_text(raw, &|text| {
                wildcard_match(pattern, text)
                    || LdapPath::parse(text)
                        .is_ok_and(|dn| wildcard_match(pattern, dn.rdn()))
            }),
            None => wildcard_match(pattern, default_category(record.object_class())),
        };
    }
    stored.is_some_and(|raw| any_text(raw, &|text| wildcard_match(pattern, text)))
}

/// The category of a class when the record does not name one.
fn default_category(object_class: &str) -> &str {
    if object_class.eq_ignore_ascii_case("user") {
        "Person"
    } else {
        object_class
    }
}

/// Whether the textual form of `raw`, or of any of its items, satisfies `test`.
fn any_text(raw: &RawValue, test: &dyn Fn(&str) -> bool) -> bool {
    match raw {
        RawValue::String(s) => test(s),
        RawValue::Integer(i) => test(&i.to_string()),
        RawValue::Bool(b) => test(if *b { "TRUE" } else { "FALSE" }),
        RawValue::List(items) => items.iter().any(|item| any_text(item, test)),
        _ => false,
    }
}

/// Case-insensitive match where `*` in `pattern` stands for any sequence.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}
