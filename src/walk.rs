//!
//! Depth-first traversal of group membership.
//!
//! Membership graphs are not guaranteed to be acyclic. A walk remembers the
//! identity of every group it has expanded and never expands a group twice, so
//! it terminates on any finite directory.

use crate::directory::Directory;
use crate::entry::{Entry, EntryKind};
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// One expanded group: the group itself, its member groups and its member users.
#[derive(Debug, Clone)]
pub struct WalkStep {
    pub group: Arc<Entry>,
    pub subgroups: Vec<Arc<Entry>>,
    pub users: Vec<Arc<Entry>>,
}

/// Lazy, depth-first, pre-order walk over the groups below a starting group.
///
/// Each group is expanded once. A group that was already expanded in this walk
/// is still listed among the subgroups of every parent that names it, but is
/// not expanded again. Members that are neither users nor groups are left out.
///
/// The first error (an unresolvable member, a malformed member path) is
/// yielded and ends the walk.
pub struct GroupWalk<'a> {
    directory: &'a Directory,
    pending: Vec<Arc<Entry>>,
    visited: HashSet<String>,
    failed: bool,
}

impl<'a> GroupWalk<'a> {
    pub(crate) fn new(directory: &'a Directory, group: Arc<Entry>) -> Self {
        Self {
            directory,
            pending: vec![group],
            visited: HashSet::new(),
            failed: false,
        }
    }

    fn expand(&self, group: Arc<Entry>) -> Result<WalkStep> {
        let mut subgroups = Vec::new();
        let mut users = Vec::new();
        for path in group.members()? {
            let member = self.directory.produce(&path, true)?;
            match member.kind() {
                EntryKind::Group => subgroups.push(member),
                EntryKind::User => users.push(member),
                kind => debug!(member = %path, ?kind, "Ignoring member"),
            }
        }
        Ok(WalkStep {
            group,
            subgroups,
            users,
        })
    }
}

impl Iterator for GroupWalk<'_> {
    type Item = Result<WalkStep>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let group = self.pending.pop()?;
            if !self.visited.insert(group.identity_key()) {
                debug!(group = %group, "Group already walked, skipping");
                continue;
            }
            return match self.expand(group) {
                Ok(step) => {
                    self.pending.extend(step.subgroups.iter().rev().cloned());
                    Some(Ok(step))
                }
                Err(e) => {
                    self.failed = true;
                    Some(Err(e))
                }
            };
        }
    }
}
