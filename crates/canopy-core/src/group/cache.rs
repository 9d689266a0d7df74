//! Group cache with an explicit population and invalidation lifecycle
//!
//! Owned by [`GroupStore`](super::GroupStore). Point lookups are cached
//! including misses; the ordered full list, the ID list and the per-user
//! editable ID lists are derived views that any write drops.

use super::CategoryGroup;
use crate::types::{GroupId, UserId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct GroupCache {
    /// `None` records a lookup that found nothing
    groups: HashMap<GroupId, Option<CategoryGroup>>,
    /// IDs of the full group list in name order, once it has been loaded
    ordered: Option<Vec<GroupId>>,
    ids: Option<Vec<GroupId>>,
    editable: HashMap<UserId, Vec<GroupId>>,
}

/// Result of a point lookup against the cache
#[derive(Debug, PartialEq)]
pub enum Cached<'a> {
    Hit(&'a CategoryGroup),
    /// A previous lookup found no such group
    Missing,
    Unknown,
}

impl GroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, id: GroupId) -> Cached<'_> {
        match self.groups.get(&id) {
            Some(Some(group)) => Cached::Hit(group),
            Some(None) => Cached::Missing,
            None => Cached::Unknown,
        }
    }

    pub fn put(&mut self, group: CategoryGroup) {
        if let Some(id) = group.id {
            self.groups.insert(id, Some(group));
        }
    }

    pub fn put_missing(&mut self, id: GroupId) {
        self.groups.insert(id, None);
    }

    /// The full group list, when it has been materialized
    pub fn all_groups(&self) -> Option<Vec<CategoryGroup>> {
        let ordered = self.ordered.as_ref()?;
        ordered
            .iter()
            .map(|id| self.groups.get(id).cloned().flatten())
            .collect()
    }

    pub fn set_all_groups(&mut self, groups: &[CategoryGroup]) {
        let mut ordered = Vec::with_capacity(groups.len());
        for group in groups {
            if let Some(id) = group.id {
                ordered.push(id);
                self.groups.insert(id, Some(group.clone()));
            }
        }
        self.ordered = Some(ordered);
    }

    /// All group IDs, derived from the full list when that is loaded
    pub fn all_ids(&self) -> Option<Vec<GroupId>> {
        self.ordered.clone().or_else(|| self.ids.clone())
    }

    pub fn set_all_ids(&mut self, ids: Vec<GroupId>) {
        self.ids = Some(ids);
    }

    pub fn editable_ids(&self, user: UserId) -> Option<&[GroupId]> {
        self.editable.get(&user).map(Vec::as_slice)
    }

    pub fn set_editable_ids(&mut self, user: UserId, ids: Vec<GroupId>) {
        self.editable.insert(user, ids);
    }

    /// Record a successfully saved group
    pub fn refresh(&mut self, group: CategoryGroup) {
        self.drop_derived();
        self.put(group);
    }

    /// Forget a deleted group, or one whose save failed midway
    pub fn evict(&mut self, id: GroupId) {
        self.drop_derived();
        self.groups.remove(&id);
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.drop_derived();
    }

    fn drop_derived(&mut self) {
        self.ordered = None;
        self.ids = None;
        self.editable.clear();
    }
}
