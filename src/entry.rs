//!
//! Materialized directory objects.
//!
//! An `Entry` is built once from a provider record and the schema of its class.
//! Every declared attribute is read through the conversion table of the entry's
//! kind; values with no conversion are stored as delivered. After construction
//! an entry never changes. A fresh view of the object requires producing it
//! again without the cache.

use crate::config::DirectoryConfig;
use crate::constants::{MEMBER, OBJECT_GUID, USER_ACCOUNT_CONTROL};
use crate::data::mapping::{
    ACCOUNT_DISABLED, GROUP_TYPES, SAM_ACCOUNT_TYPES, USER_ACCOUNT_CONTROL as UAC_FLAGS,
};
use crate::data::{Conversion, Guid, Value, values};
use crate::path::{LdapPath, PathComponent};
use crate::provider::{ClassSchema, RawRecord, RawValue};
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::{debug, trace};

/// The closed set of entry kinds, selected by the record's declared class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    User,
    Group,
    Computer,
    OrganizationalUnit,
    /// The domain object at the top of a naming context (`domainDNS`).
    DomainRoot,
    PublicFolder,
    /// Any class without a dedicated kind.
    Generic,
}

impl EntryKind {
    /// Selects the kind for `object_class`, compared case-insensitively.
    pub fn from_class(object_class: &str) -> Self {
        match object_class.to_ascii_lowercase().as_str() {
            "user" => EntryKind::User,
            "group" => EntryKind::Group,
            "computer" => EntryKind::Computer,
            "organizationalunit" => EntryKind::OrganizationalUnit,
            "domaindns" => EntryKind::DomainRoot,
            "publicfolder" => EntryKind::PublicFolder,
            _ => EntryKind::Generic,
        }
    }

    /// The conversion applied to `attribute` for entries of this kind, if any.
    ///
    /// Kind-specific conversions come first; every kind shares the base table.
    pub fn conversion(self, attribute: &str) -> Option<Conversion> {
        let name = attribute.to_ascii_lowercase();
        let specific = match self {
            EntryKind::User => account_conversion(&name, true),
            EntryKind::Computer => account_conversion(&name, false),
            EntryKind::Group => match name.as_str() {
                "grouptype" => Some(Conversion::Flags(&GROUP_TYPES)),
                "objectsid" => Some(Conversion::Sid),
                "samaccounttype" => Some(Conversion::EnumName(&SAM_ACCOUNT_TYPES)),
                _ => None,
            },
            EntryKind::DomainRoot => match name.as_str() {
                "creationtime" | "forcelogoff" | "lockoutduration" | "lockoutobservationwindow"
                | "maxpwdage" | "minpwdage" | "modifiedcount" | "modifiedcountatlastprom" => {
                    Some(Conversion::Timestamp)
                }
                "dsasignature" | "repluptodatevector" | "repsfrom" | "repsto" => {
                    Some(Conversion::Hex)
                }
                "objectsid" => Some(Conversion::Sid),
                _ => None,
            },
            EntryKind::OrganizationalUnit | EntryKind::PublicFolder | EntryKind::Generic => None,
        };
        specific.or_else(|| match name.as_str() {
            "objectguid" => Some(Conversion::Guid),
            "usnchanged" | "usncreated" => Some(Conversion::Timestamp),
            "replicationsignature" => Some(Conversion::Hex),
            _ => None,
        })
    }
}

/// Conversions shared by users and computers. Only user accounts carry lockout
/// and mailbox attributes.
fn account_conversion(name: &str, user: bool) -> Option<Conversion> {
    match name {
        "accountexpires" | "badpasswordtime" | "lastlogoff" | "lastlogon"
        | "lastlogontimestamp" | "pwdlastset" => Some(Conversion::Timestamp),
        "lockouttime" if user => Some(Conversion::Timestamp),
        "msexchmailboxguid" if user => Some(Conversion::Guid),
        "objectsid" => Some(Conversion::Sid),
        "samaccounttype" => Some(Conversion::EnumName(&SAM_ACCOUNT_TYPES)),
        "useraccountcontrol" => Some(Conversion::Flags(&UAC_FLAGS)),
        _ => None,
    }
}

/// One directory object with its converted attributes.
///
/// Attribute names keep the case the schema declares them with and are looked
/// up case-insensitively. A declared attribute whose value is empty reads as
/// `None`; a name the schema does not declare is an error.
///
/// Two entries are equal when they describe the same object: they share an
/// `objectGUID`, or, lacking one, a path.
#[derive(Debug, Clone)]
pub struct Entry {
    kind: EntryKind,
    path: LdapPath,
    object_class: String,
    attributes: HashMap<String, Value>,
    empty: BTreeSet<String>,
    names: HashMap<String, String>,
    container: bool,
}

impl Entry {
    /// Materializes `record` using the attribute names declared by `schema`.
    ///
    /// # Arguments
    /// * `record` - The raw record delivered by the provider.
    /// * `schema` - The attributes declared for the record's class.
    /// * `config` - Supplies the attributes that are never read.
    ///
    /// # Errors
    /// Returns `Error::MalformedPath` if the record's path does not parse,
    /// `Error::Conversion` if a value cannot be converted, and
    /// `Error::UnknownEnumValue` if an enumeration number is not registered.
    pub fn from_record(
        record: &RawRecord,
        schema: &ClassSchema,
        config: &DirectoryConfig,
    ) -> Result<Self> {
        let path = LdapPath::parse(record.path())?;
        let kind = EntryKind::from_class(record.object_class());
        let mut entry = Self {
            kind,
            path,
            object_class: record.object_class().to_string(),
            attributes: HashMap::new(),
            empty: BTreeSet::new(),
            names: HashMap::new(),
            container: schema.container,
        };

        for name in schema.attribute_names() {
            if config.is_ignored(name) {
                continue;
            }
            let Some(raw) = record.get_attribute(name) else {
                trace!(path = %entry.path, attribute = name, "Attribute absent from record");
                entry.insert_empty(name);
                continue;
            };
            if raw.is_handle() {
                debug!(path = %entry.path, attribute = name, "Dropping opaque attribute value");
                continue;
            }
            let value = match kind.conversion(name) {
                Some(conversion) => conversion.apply(name, raw)?,
                None => pass_through(raw),
            };
            match value {
                Some(value) => {
                    entry.names.insert(name.to_ascii_lowercase(), name.to_string());
                    entry.attributes.insert(name.to_string(), value);
                }
                None => entry.insert_empty(name),
            }
        }
        Ok(entry)
    }

    fn insert_empty(&mut self, name: &str) {
        self.names.insert(name.to_ascii_lowercase(), name.to_string());
        self.empty.insert(name.to_string());
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn path(&self) -> &LdapPath {
        &self.path
    }

    /// The declared object class, as reported by the provider.
    pub fn object_class(&self) -> &str {
        &self.object_class
    }

    /// Whether objects of this entry's class may contain other objects.
    pub fn is_container(&self) -> bool {
        self.container
    }

    /// Reads an attribute by name, ignoring case.
    ///
    /// # Returns
    /// The converted value, or `None` if the attribute is declared but empty.
    ///
    /// # Errors
    /// Returns `Error::UnknownAttribute` if the name is not declared for this entry.
    pub fn get(&self, name: &str) -> Result<Option<&Value>> {
        let declared = self
            .names
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| Error::UnknownAttribute {
                entry: self.path.to_string(),
                name: name.to_string(),
            })?;
        Ok(self.attributes.get(declared))
    }

    /// Whether `name` is a declared attribute of this entry.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.names.contains_key(&name.to_ascii_lowercase())
    }

    /// The non-empty attributes, sorted by name.
    pub fn attributes(&self) -> Vec<(&str, &Value)> {
        let mut attributes: Vec<(&str, &Value)> = self
            .attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();
        attributes.sort_by_key(|(name, _)| name.to_ascii_lowercase());
        attributes
    }

    /// The names of declared attributes that hold no value, sorted.
    pub fn empty_attributes(&self) -> Vec<&str> {
        self.empty.iter().map(String::as_str).collect()
    }

    /// The `objectGUID` of the object, if it has one.
    pub fn guid(&self) -> Option<&Guid> {
        self.attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(OBJECT_GUID))
            .and_then(|(_, value)| value.as_guid())
    }

    /// Key identifying the underlying object: its GUID, or its path when the
    /// object has no GUID.
    pub fn identity_key(&self) -> String {
        match self.guid() {
            Some(guid) => guid.to_string(),
            None => self.path.to_string(),
        }
    }

    /// The paths listed in the `member` attribute, in order. An entry whose
    /// class does not declare `member` has no members.
    ///
    /// # Errors
    /// Returns `Error::MalformedPath` for a member value that does not parse.
    pub fn members(&self) -> Result<Vec<LdapPath>> {
        let member = if self.has_attribute(MEMBER) {
            self.get(MEMBER)?
        } else {
            None
        };
        values(member)
            .into_iter()
            .filter_map(|value| value.as_str())
            .map(LdapPath::parse)
            .collect()
    }

    /// Whether the account is disabled. `None` for kinds without accounts or
    /// when `userAccountControl` is empty or undeclared.
    pub fn account_disabled(&self) -> Option<bool> {
        if !matches!(self.kind, EntryKind::User | EntryKind::Computer) {
            return None;
        }
        self.get(USER_ACCOUNT_CONTROL)
            .ok()
            .flatten()
            .map(|value| value.has_flag(ACCOUNT_DISABLED))
    }

    /// The path of the child `component` below this entry.
    pub fn child_path(&self, component: PathComponent) -> LdapPath {
        self.path.child(component)
    }

    /// Renders the entry as a JSON object: its path, class and every declared
    /// attribute, with empty attributes as `null`.
    pub fn to_json(&self) -> Result<String> {
        let mut attributes: BTreeMap<&str, Option<&Value>> = BTreeMap::new();
        for name in &self.empty {
            attributes.insert(name, None);
        }
        for (name, value) in &self.attributes {
            attributes.insert(name, Some(value));
        }
        let document = serde_json::json!({
            "path": self.path.url(),
            "objectClass": self.object_class,
            "attributes": attributes,
        });
        Ok(serde_json::to_string_pretty(&document)?)
    }
}

/// Stores a raw value that has no registered conversion.
fn pass_through(raw: &RawValue) -> Option<Value> {
    match raw {
        RawValue::Null | RawValue::Handle(_) => None,
        RawValue::Bool(b) => Some(Value::Bool(*b)),
        RawValue::Integer(i) => Some(Value::Integer(*i)),
        RawValue::String(s) => Some(Value::String(s.clone())),
        RawValue::Binary(bytes) => Some(Value::Binary(bytes.clone())),
        RawValue::LargeInteger { high, low } => {
            Some(Value::Integer((*high << 32) | i64::from(*low as u32)))
        }
        RawValue::List(items) => Some(Value::List(items.iter().filter_map(pass_through).collect())),
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.identity_key() == other.identity_key()
    }
}

impl Eq for Entry {}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity_key().hash(state);
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.url())
    }
}
