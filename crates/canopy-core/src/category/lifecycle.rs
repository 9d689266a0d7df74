use super::{uri, CascadeDeleter, Category, NewParent};
use crate::error::{CategoryError, CategoryResult};
use crate::events::{CategoryEvent, CategoryHooks};
use crate::group::GroupStore;
use crate::storage::{Backends, Boundary, StorageError, TxScope};
use crate::tree::{fill_gaps, Placement, Tree, TreePosition};
use crate::types::{ElementId, LocaleId, SaveOutcome, StructureId};
use crate::validation::ValidationErrors;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What happens to the open transaction when a before-save hook cancels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPolicy {
    /// Commit, keeping whatever the hooks wrote
    #[default]
    Commit,
    /// Roll back, discarding hook writes
    Rollback,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleOptions {
    pub cancel_policy: CancelPolicy,
}

/// Saves and deletes categories inside their group's tree
pub struct CategoryLifecycle {
    backends: Backends,
    groups: Arc<GroupStore>,
    hooks: CategoryHooks,
    options: LifecycleOptions,
}

/// Fields a failed save must put back
struct SavedState {
    id: Option<ElementId>,
    structure_id: Option<StructureId>,
    position: Option<TreePosition>,
}

impl SavedState {
    fn of(category: &Category) -> Self {
        Self {
            id: category.id,
            structure_id: category.structure_id,
            position: category.position,
        }
    }

    fn restore(self, category: &mut Category) {
        category.id = self.id;
        category.structure_id = self.structure_id;
        category.position = self.position;
    }
}

impl CategoryLifecycle {
    pub fn new(backends: Backends, groups: Arc<GroupStore>) -> Self {
        Self {
            backends,
            groups,
            hooks: CategoryHooks::new(),
            options: LifecycleOptions::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: CategoryHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_options(mut self, options: LifecycleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn hooks(&self) -> &CategoryHooks {
        &self.hooks
    }

    pub fn category_by_id(
        &self,
        id: ElementId,
        locale: Option<&LocaleId>,
    ) -> CategoryResult<Option<Category>> {
        Ok(self.backends.elements.get_by_id(id, locale)?)
    }

    /// Whether saving `category` places it somewhere new in its tree
    pub fn has_new_parent(&self, category: &Category) -> CategoryResult<bool> {
        if category.is_new() {
            return Ok(true);
        }

        match category.new_parent {
            NewParent::Unchanged => Ok(false),
            NewParent::Root => Ok(category.level() != Some(1)),
            NewParent::Parent(parent_id) => {
                if category.level() == Some(1) {
                    return Ok(true);
                }
                let (Some(id), Some(structure_id)) = (category.id, category.structure_id) else {
                    return Ok(true);
                };
                let tree = self.backends.trees.load_tree(structure_id)?;
                Ok(tree.parent_of(id) != Some(parent_id))
            }
        }
    }

    pub fn save(&self, category: &mut Category) -> CategoryResult<SaveOutcome> {
        self.save_in(category, Boundary::Owned)
    }

    /// Validate and persist a category, placing it in the tree when it is new
    /// or was given a new parent.
    ///
    /// Returns [`SaveOutcome::Invalid`] with errors on the category when
    /// validation fails or the element store refuses it, and
    /// [`SaveOutcome::Cancelled`] when a before-save hook declines.
    pub fn save_in(&self, category: &mut Category, boundary: Boundary) -> CategoryResult<SaveOutcome> {
        category.errors_mut().clear();
        let is_new = category.is_new();
        let has_new_parent = self.has_new_parent(category)?;

        category.pending_parent = None;
        if has_new_parent {
            if let NewParent::Parent(parent_id) = category.new_parent {
                let parent = self
                    .backends
                    .elements
                    .get_by_id(parent_id, Some(&category.locale))?
                    .ok_or(CategoryError::CategoryNotFound { id: parent_id })?;
                category.pending_parent = Some(Box::new(parent));
            }
        }

        let errors = self.validate(category)?;
        if !errors.is_empty() {
            debug!(category_id = ?category.id, errors = errors.len(), "Category failed validation");
            *category.errors_mut() = errors;
            return Ok(SaveOutcome::Invalid);
        }

        let scope = TxScope::open(self.backends.transactions.as_ref(), boundary)?;

        if !self.hooks.run_before_save(category, is_new) {
            match self.options.cancel_policy {
                CancelPolicy::Commit => scope.commit()?,
                CancelPolicy::Rollback => scope.rollback()?,
            }
            return Ok(SaveOutcome::Cancelled);
        }

        let saved = SavedState::of(category);
        match self.persist(category, is_new, has_new_parent) {
            Ok(true) => {}
            Ok(false) => {
                saved.restore(category);
                scope.rollback()?;
                return Ok(SaveOutcome::Invalid);
            }
            Err(e) => {
                warn!(category_id = ?category.id, error = %e, "Failed to save category");
                saved.restore(category);
                if let Err(rollback) = scope.rollback() {
                    error!(error = %rollback, "Failed to roll back category save");
                }
                return Err(e);
            }
        }

        if let Err(e) = scope.commit() {
            saved.restore(category);
            return Err(e.into());
        }

        info!(
            category_id = ?category.id,
            group_id = %category.group_id,
            is_new,
            moved = has_new_parent,
            "Saved category"
        );
        self.hooks.emit(CategoryEvent::AfterSave {
            category: &*category,
            is_new,
        });
        Ok(SaveOutcome::Saved)
    }

    /// Delete categories with their descendants. False for empty input.
    pub fn delete(&self, categories: &[Category]) -> CategoryResult<bool> {
        self.delete_in(categories, Boundary::Owned)
    }

    pub fn delete_in(&self, categories: &[Category], boundary: Boundary) -> CategoryResult<bool> {
        if categories.is_empty() {
            return Ok(false);
        }

        let scope = TxScope::open(self.backends.transactions.as_ref(), boundary)?;
        let deleter = CascadeDeleter::new(self.backends.elements.as_ref(), &self.hooks);
        let deleted = match deleter.delete(categories) {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(error = %e, "Failed to delete categories");
                if let Err(rollback) = scope.rollback() {
                    error!(error = %rollback, "Failed to roll back category delete");
                }
                return Err(e.into());
            }
        };
        scope.commit()?;

        if deleted {
            for category in categories {
                self.hooks.emit(CategoryEvent::AfterDelete { category });
            }
            info!(count = categories.len(), "Deleted categories");
        }
        Ok(deleted)
    }

    pub fn delete_by_id(&self, id: ElementId) -> CategoryResult<bool> {
        let Some(category) = self.backends.elements.get_by_id(id, None)? else {
            return Err(CategoryError::CategoryNotFound { id });
        };
        self.delete(&[category])
    }

    /// Delete every category among `ids`; unknown IDs are ignored
    pub fn delete_by_ids(&self, ids: &[ElementId]) -> CategoryResult<bool> {
        if ids.is_empty() {
            return Ok(false);
        }

        let categories = self.backends.elements.find_by_ids(ids, None)?;
        self.delete(&categories)
    }

    /// Complete a selection of category IDs with every missing ancestor, in
    /// tree order
    pub fn fill_gaps(&self, ids: &[ElementId]) -> CategoryResult<Vec<ElementId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let categories = self.backends.elements.find_by_ids(ids, None)?;
        let placements: Vec<Placement> = categories
            .iter()
            .filter_map(|c| {
                Some(Placement {
                    element_id: c.id?,
                    structure_id: c.structure_id,
                    position: c.position,
                })
            })
            .collect();

        let mut trees: HashMap<StructureId, Tree> = HashMap::new();
        for structure_id in placements.iter().filter_map(|p| p.structure_id) {
            if !trees.contains_key(&structure_id) {
                trees.insert(structure_id, self.backends.trees.load_tree(structure_id)?);
            }
        }

        Ok(fill_gaps(&placements, &trees))
    }

    fn validate(&self, category: &mut Category) -> CategoryResult<ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let Some(group) = self.groups.group_by_id(category.group_id)? else {
            errors.add("groupId", "Category group is invalid.");
            return Ok(errors);
        };

        if let Some(id) = category.id {
            let stored = self
                .backends
                .repository
                .category_group_id(id)?
                .ok_or(CategoryError::CategoryNotFound { id })?;
            if stored != category.group_id {
                errors.add("groupId", "Categories cannot be moved to another group.");
            }
        }

        if category.title.trim().is_empty() {
            errors.add("title", "Title cannot be blank.");
        }
        uri::ensure_slug(category);
        if category.slug.is_empty() && !category.title.trim().is_empty() {
            errors.add("slug", "Slug cannot be blank.");
        }

        if let Some(parent) = category.pending_parent.as_deref() {
            if parent.group_id != category.group_id {
                errors.add("newParentId", "The parent must belong to the same category group.");
            } else if parent.id.is_some() && parent.id == category.id {
                errors.add("newParentId", "A category cannot be its own parent.");
            } else if let (Some(own), Some(target)) = (category.position, parent.position) {
                if own.contains(&target) {
                    errors.add("newParentId", "A category cannot be moved under one of its descendants.");
                }
            }

            if !errors.has("newParentId") && group.max_levels > 0 {
                let level = parent.level().unwrap_or(1) + 1 + self.subtree_depth(category)?;
                if level > group.max_levels {
                    errors.add(
                        "newParentId",
                        format!("The category group only allows {} levels.", group.max_levels),
                    );
                }
            }
        }

        Ok(errors)
    }

    // Levels below the category in its current place
    fn subtree_depth(&self, category: &Category) -> CategoryResult<u32> {
        let (Some(id), Some(structure_id), Some(position)) =
            (category.id, category.structure_id, category.position)
        else {
            return Ok(0);
        };
        if !position.has_descendants() {
            return Ok(0);
        }

        let tree = self.backends.trees.load_tree(structure_id)?;
        Ok(tree
            .descendants_of(id)
            .into_iter()
            .filter_map(|d| tree.position(d))
            .map(|p| p.level.saturating_sub(position.level))
            .max()
            .unwrap_or(0))
    }

    fn persist(&self, category: &mut Category, is_new: bool, has_new_parent: bool) -> CategoryResult<bool> {
        let b = &self.backends;

        if !b.elements.save_element(category)? {
            debug!(category_id = ?category.id, "Element store refused category");
            return Ok(false);
        }
        let id = category
            .id
            .ok_or_else(|| StorageError::InvalidOperation("saved element has no ID".to_string()))?;

        b.repository.save_category_row(id, category.group_id)?;

        if has_new_parent {
            let group = self
                .groups
                .group_by_id(category.group_id)?
                .ok_or(CategoryError::GroupNotFound { id: category.group_id })?;
            let structure_id = group.structure_id.ok_or_else(|| {
                StorageError::InvalidOperation(format!("category group {} has no structure", group.handle))
            })?;

            match category.pending_parent.take() {
                Some(parent) => {
                    b.trees.append_under(structure_id, category, &parent)?;
                    category.pending_parent = Some(parent);
                }
                None => b.trees.append_to_root(structure_id, category)?,
            }
            debug!(category_id = %id, level = ?category.level(), "Placed category in tree");

            // Other locales still carry URIs built under the old parent
            if !is_new {
                b.elements.update_slug_and_uri(category, true, false)?;
            }
        }

        if !is_new {
            b.elements.update_descendant_slugs_and_uris(category)?;
        }

        Ok(true)
    }
}
