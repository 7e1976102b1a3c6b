//!
//! Settings of a `Directory` session.

use crate::constants::{DEFAULT_PAGE_SIZE, DEFAULT_USER_SEARCH_FIELDS, NT_SECURITY_DESCRIPTOR};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration of a `Directory`.
///
/// Every field has a default, so a JSON file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Server whose rootDSE names the default naming context; `None` uses the
    /// logged-on domain.
    pub server: Option<String>,
    /// Paging hint passed with every query.
    pub page_size: u32,
    /// Maximum number of cached entries. `None` keeps every entry for the
    /// lifetime of the directory.
    pub cache_capacity: Option<usize>,
    /// Attributes `Directory::find_user` matches a free-text name against.
    pub user_search_fields: Vec<String>,
    /// Schema attributes never read from provider records.
    pub ignored_attributes: Vec<String>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            server: None,
            page_size: DEFAULT_PAGE_SIZE,
            cache_capacity: None,
            user_search_fields: DEFAULT_USER_SEARCH_FIELDS
                .iter()
                .map(|field| field.to_string())
                .collect(),
            ignored_attributes: vec![NT_SECURITY_DESCRIPTOR.to_string()],
        }
    }
}

impl DirectoryConfig {
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Whether `attribute` is in `ignored_attributes` (case-insensitive).
    pub fn is_ignored(&self, attribute: &str) -> bool {
        self.ignored_attributes
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(attribute))
    }

    /// Loads a configuration from a JSON file.
    ///
    /// If the file does not exist, the default configuration is returned.
    ///
    /// # Arguments
    /// * `path` - The path to the configuration file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Saves the configuration to `path` as JSON.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
