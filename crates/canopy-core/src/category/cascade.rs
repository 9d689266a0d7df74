//! Cascading category deletion
//!
//! Every requested category is deleted together with its descendants. The
//! descendants of each category are collected deepest and rightmost first
//! (descending tree position), then the category itself, and everything is
//! removed with a single batch call at the end.

use super::Category;
use crate::events::{CategoryEvent, CategoryHooks};
use crate::storage::{ElementStore, StorageResult};
use crate::types::ElementId;
use std::collections::HashSet;
use tracing::debug;

pub struct CascadeDeleter<'a> {
    elements: &'a dyn ElementStore,
    hooks: &'a CategoryHooks,
}

impl<'a> CascadeDeleter<'a> {
    pub fn new(elements: &'a dyn ElementStore, hooks: &'a CategoryHooks) -> Self {
        Self { elements, hooks }
    }

    /// Delete `categories` and everything below them. Returns false when
    /// nothing was collected.
    ///
    /// Sends `BeforeDelete` for every collected category, descendants
    /// included. `AfterDelete` is left to the caller, which knows whether the
    /// surrounding transaction committed.
    pub fn delete(&self, categories: &[Category]) -> StorageResult<bool> {
        let ids = self.collect(categories)?;
        if ids.is_empty() {
            return Ok(false);
        }

        debug!(count = ids.len(), "Deleting categories");
        self.elements.delete_by_ids(&ids)
    }

    /// IDs to delete, each subtree bottom-up. An ID reached twice (a caller
    /// passing both a parent and its child) is collected once.
    pub fn collect(&self, categories: &[Category]) -> StorageResult<Vec<ElementId>> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        for category in categories {
            let Some(id) = category.id else {
                continue;
            };
            if seen.contains(&id) {
                continue;
            }

            for descendant in self.elements.find_descendants(category)? {
                let Some(descendant_id) = descendant.id else {
                    continue;
                };
                if seen.insert(descendant_id) {
                    self.hooks.emit(CategoryEvent::BeforeDelete {
                        category: &descendant,
                    });
                    ids.push(descendant_id);
                }
            }

            seen.insert(id);
            self.hooks.emit(CategoryEvent::BeforeDelete { category });
            ids.push(id);
        }

        Ok(ids)
    }
}
