//!
//! The directory session: provider, entry cache and configuration in one handle.
//!
//! A `Directory` is created by the host with an explicit provider and lives as
//! long as the host needs it. Everything that reads the directory goes through
//! it: producing entries by path, navigating to children and parents, searching
//! and walking groups. Clones are cheap and share the provider and the cache.

use crate::cache::EntryCache;
use crate::config::DirectoryConfig;
use crate::constants::{LDAP_URL_PREFIX, ROOT_DSE};
use crate::entry::Entry;
use crate::path::{LdapPath, PathComponent};
use crate::provider::{Provider, QueryRequest, RawRecord};
use crate::search::{FilterKind, Predicate, Search, SearchFilter};
use crate::walk::GroupWalk;
use crate::{Error, Result};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, instrument};

/// Entry point for reading a directory.
#[derive(Clone)]
pub struct Directory {
    provider: Arc<dyn Provider>,
    cache: Arc<EntryCache>,
    config: DirectoryConfig,
    root: Arc<OnceLock<LdapPath>>,
}

impl Directory {
    /// Creates a directory over `provider` with the default configuration.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self::with_config(provider, DirectoryConfig::default())
    }

    /// Creates a directory over `provider` with a fresh cache sized by `config`.
    pub fn with_config(provider: Arc<dyn Provider>, config: DirectoryConfig) -> Self {
        let cache = match config.cache_capacity {
            Some(capacity) => EntryCache::with_capacity(capacity),
            None => EntryCache::new(),
        };
        Self::with_cache(provider, Arc::new(cache), config)
    }

    /// Creates a directory sharing an existing cache.
    pub fn with_cache(
        provider: Arc<dyn Provider>,
        cache: Arc<EntryCache>,
        config: DirectoryConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            config,
            root: Arc::new(OnceLock::new()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn cache(&self) -> &Arc<EntryCache> {
        &self.cache
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Returns the entry at `path`.
    ///
    /// With `lazy` set, a cached entry is returned as is. Otherwise, or on a cache
    /// miss, the record is fetched and materialized. A lazy producer that loses
    /// a race to another one returns the entry that was cached first; a non-lazy
    /// producer replaces the cached entry.
    ///
    /// # Arguments
    /// * `path` - The entry's path.
    /// * `lazy` - Whether a cached entry may be returned.
    ///
    /// # Errors
    /// Returns `Error::Lookup` if the provider cannot fetch the record,
    /// `Error::Schema` if it cannot describe the record's class, and any error of
    /// `Entry::from_record`.
    #[instrument(level = "debug", skip_all, fields(path = %path, lazy = lazy))]
    pub fn produce(&self, path: &LdapPath, lazy: bool) -> Result<Arc<Entry>> {
        if lazy {
            if let Some(entry) = self.cache.get(path)? {
                debug!("Cache hit");
                return Ok(entry);
            }
            debug!("Cache miss");
        }

        let url = path.url();
        let record = self
            .provider
            .fetch(&url)
            .map_err(|source| Error::Lookup { path: url, source })?;
        let schema = self
            .provider
            .schema(record.object_class())
            .map_err(|source| Error::Schema {
                class: record.object_class().to_string(),
                source,
            })?;
        let entry = Arc::new(Entry::from_record(&record, &schema, &self.config)?);

        if lazy {
            self.cache.insert_if_absent(path, entry)
        } else {
            self.cache.replace(path, Arc::clone(&entry))?;
            Ok(entry)
        }
    }

    /// Parses `path` and returns the (possibly cached) entry there.
    pub fn get(&self, path: &str) -> Result<Arc<Entry>> {
        self.produce(&LdapPath::parse(path)?, true)
    }

    /// Returns the entry named `component` directly below `entry`.
    pub fn child(&self, entry: &Entry, component: PathComponent) -> Result<Arc<Entry>> {
        self.produce(&entry.child_path(component), true)
    }

    /// Returns the entry at `relative` (one or more components) below `entry`,
    /// e.g. `cn=Alice,ou=Staff`.
    pub fn join(&self, entry: &Entry, relative: &str) -> Result<Arc<Entry>> {
        self.produce(&entry.path().join(relative)?, true)
    }

    /// Returns the entry containing `entry`, or `None` at the top of the tree.
    pub fn parent(&self, entry: &Entry) -> Result<Option<Arc<Entry>>> {
        entry
            .path()
            .parent()
            .map(|parent| self.produce(&parent, true))
            .transpose()
    }

    /// The path of the domain root, read once from the provider's default
    /// naming context and remembered afterwards.
    pub fn root(&self) -> Result<LdapPath> {
        if let Some(root) = self.root.get() {
            return Ok(root.clone());
        }
        let server = self.config.server.as_deref();
        let naming_context =
            self.provider
                .default_naming_context(server)
                .map_err(|source| Error::Lookup {
                    path: match server {
                        Some(server) => format!("{LDAP_URL_PREFIX}{server}/{ROOT_DSE}"),
                        None => format!("{LDAP_URL_PREFIX}{ROOT_DSE}"),
                    },
                    source,
                })?;
        let root = LdapPath::parse(&naming_context)?;
        info!(root = %root, "Resolved default naming context");
        // A concurrent resolution may have won; both read the same naming context.
        Ok(self.root.get_or_init(|| root).clone())
    }

    /// The domain root entry.
    pub fn root_entry(&self) -> Result<Arc<Entry>> {
        self.produce(&self.root()?, true)
    }

    /// Searches the subtree at `base` for entries matching `predicate`.
    ///
    /// # Arguments
    /// * `base` - Where the search starts.
    /// * `predicate` - The condition found entries satisfy.
    /// * `active` - If set, only accounts that are enabled (`true`) or disabled
    ///   (`false`) are returned. Entries without account control pass.
    ///
    /// # Returns
    /// A lazy sequence of the paths found.
    pub fn search(
        &self,
        base: &LdapPath,
        predicate: &Predicate,
        active: Option<bool>,
    ) -> Result<Search<'_>> {
        let request = QueryRequest::new(base.clone(), predicate.clone(), self.config.page_size);
        let query = request.statement();
        debug!(query = %query, "Executing search");
        let records = self
            .provider
            .execute_query(&request)
            .map_err(|source| Error::Query {
                query: query.clone(),
                source,
            })?;
        Ok(Search::new(records, query, active))
    }

    /// Executes an explicit request and returns the raw records.
    ///
    /// Unlike `search`, nothing is materialized and no account state filter
    /// applies; records are returned as the provider delivers them. The
    /// sequence ends after the first error.
    pub fn records<'a>(
        &'a self,
        request: &QueryRequest,
    ) -> Result<impl Iterator<Item = Result<RawRecord>> + use<'a>> {
        let query = request.statement();
        let records = self
            .provider
            .execute_query(request)
            .map_err(|source| Error::Query {
                query: query.clone(),
                source,
            })?;
        let mut failed = false;
        Ok(records.map_while(move |record| {
            if failed {
                return None;
            }
            Some(record.map_err(|source| {
                failed = true;
                Error::Query {
                    query: query.clone(),
                    source,
                }
            }))
        }))
    }

    /// Returns the first entry found by a search, if any.
    pub fn find_first(
        &self,
        base: &LdapPath,
        predicate: &Predicate,
        active: Option<bool>,
    ) -> Result<Option<Arc<Entry>>> {
        match self.search(base, predicate, active)?.next() {
            Some(path) => Ok(Some(self.produce(&path?, true)?)),
            None => Ok(None),
        }
    }

    /// Finds the first entry of a preset kind whose primary key equals `name`.
    ///
    /// # Arguments
    /// * `base` - Where the search starts; the domain root if `None`.
    /// * `kind` - The preset filter.
    /// * `name` - Value of the filter's primary key.
    pub fn find(
        &self,
        base: Option<&LdapPath>,
        kind: FilterKind,
        name: &str,
    ) -> Result<Option<Arc<Entry>>> {
        self.find_where(base, kind, Some(name), &[])
    }

    /// Like `find`, with additional `attribute=value` constraints. The preset's
    /// fixed constraints and primary key take precedence over colliding ones.
    pub fn find_where(
        &self,
        base: Option<&LdapPath>,
        kind: FilterKind,
        name: Option<&str>,
        constraints: &[(&str, &str)],
    ) -> Result<Option<Arc<Entry>>> {
        let predicate = SearchFilter::preset(kind).build_predicate(Vec::new(), constraints, name);
        self.find_first(&self.base_or_root(base)?, &predicate, None)
    }

    /// Finds the first user matching `name` and `constraints` below the domain root.
    ///
    /// `name` is matched against every configured user search field the caller
    /// does not constrain explicitly; any of them matching is enough.
    pub fn find_user(
        &self,
        name: Option<&str>,
        constraints: &[(&str, &str)],
    ) -> Result<Option<Arc<Entry>>> {
        let mut clauses = Vec::new();
        if let Some(name) = name.filter(|name| !name.is_empty()) {
            let alternatives: Vec<Predicate> = self
                .config
                .user_search_fields
                .iter()
                .filter(|field| {
                    !constraints
                        .iter()
                        .any(|(attribute, _)| attribute.eq_ignore_ascii_case(field))
                })
                .map(|field| Predicate::equals(field.as_str(), name))
                .collect();
            if !alternatives.is_empty() {
                clauses.push(Predicate::or(alternatives));
            }
        }
        let predicate = SearchFilter::preset(FilterKind::UserId).build_predicate(clauses, constraints, None);
        self.find_first(&self.root()?, &predicate, None)
    }

    pub fn find_group(&self, name: &str) -> Result<Option<Arc<Entry>>> {
        self.find(None, FilterKind::Group, name)
    }

    pub fn find_computer(&self, name: &str) -> Result<Option<Arc<Entry>>> {
        self.find(None, FilterKind::Computer, name)
    }

    pub fn find_ou(&self, name: &str) -> Result<Option<Arc<Entry>>> {
        self.find(None, FilterKind::OrganizationalUnit, name)
    }

    pub fn find_public_folder(&self, name: &str) -> Result<Option<Arc<Entry>>> {
        self.find(None, FilterKind::PublicFolder, name)
    }

    /// Walks the membership of `group` depth-first. See `GroupWalk`.
    pub fn walk(&self, group: Arc<Entry>) -> GroupWalk<'_> {
        GroupWalk::new(self, group)
    }

    fn base_or_root(&self, base: Option<&LdapPath>) -> Result<LdapPath> {
        match base {
            Some(base) => Ok(base.clone()),
            None => self.root(),
        }
    }
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .field("root", &self.root.get())
            .finish_non_exhaustive()
    }
}
