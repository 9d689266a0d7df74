use super::cache::Cached;
use super::{CategoryGroup, GroupCache, GroupLocale};
use crate::error::{CategoryError, CategoryResult};
use crate::storage::{Backends, Boundary, StorageResult, TxScope};
use crate::tree::Structure;
use crate::types::{ElementId, FieldLayoutId, GroupId, LocaleId, SaveOutcome, StructureId, UserId};
use crate::validation::ValidationErrors;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Reads, saves and deletes category groups
pub struct GroupStore {
    backends: Backends,
    cache: RwLock<GroupCache>,
}

/// IDs a save may assign, restored when the save fails
#[derive(Clone, Copy)]
struct AssignedIds {
    id: Option<GroupId>,
    structure_id: Option<StructureId>,
    field_layout_id: Option<FieldLayoutId>,
}

impl AssignedIds {
    fn of(group: &CategoryGroup) -> Self {
        Self {
            id: group.id,
            structure_id: group.structure_id,
            field_layout_id: group.field_layout_id,
        }
    }

    fn restore(self, group: &mut CategoryGroup) {
        group.id = self.id;
        group.structure_id = self.structure_id;
        group.field_layout_id = self.field_layout_id;
        group.field_layout.id = self.field_layout_id;
    }
}

impl GroupStore {
    pub fn new(backends: Backends) -> Self {
        Self::with_cache(backends, GroupCache::new())
    }

    pub fn with_cache(backends: Backends, cache: GroupCache) -> Self {
        Self {
            backends,
            cache: RwLock::new(cache),
        }
    }

    pub fn all_group_ids(&self) -> CategoryResult<Vec<GroupId>> {
        if let Some(ids) = self.cache.read().all_ids() {
            return Ok(ids);
        }

        let ids = self.backends.repository.all_group_ids()?;
        self.cache.write().set_all_ids(ids.clone());
        Ok(ids)
    }

    /// Every group ordered by name, loaded once
    pub fn all_groups(&self) -> CategoryResult<Vec<CategoryGroup>> {
        if let Some(groups) = self.cache.read().all_groups() {
            return Ok(groups);
        }

        let mut groups = self.backends.repository.all_groups()?;
        for group in &mut groups {
            self.hydrate(group)?;
        }
        self.cache.write().set_all_groups(&groups);
        Ok(groups)
    }

    /// All groups keyed by an arbitrary field, e.g. `|g| g.handle.clone()`
    pub fn all_groups_by<K, F>(&self, key: F) -> CategoryResult<BTreeMap<K, CategoryGroup>>
    where
        K: Ord,
        F: Fn(&CategoryGroup) -> K,
    {
        Ok(self
            .all_groups()?
            .into_iter()
            .map(|group| (key(&group), group))
            .collect())
    }

    /// Groups whose categories `user` may edit
    pub fn editable_group_ids(&self, user: UserId) -> CategoryResult<Vec<GroupId>> {
        if let Some(ids) = self.cache.read().editable_ids(user) {
            return Ok(ids.to_vec());
        }

        let permissions = &self.backends.permissions;
        let ids: Vec<GroupId> = self
            .all_group_ids()?
            .into_iter()
            .filter(|id| permissions.check(&CategoryGroup::edit_permission(*id), user))
            .collect();

        self.cache.write().set_editable_ids(user, ids.clone());
        Ok(ids)
    }

    pub fn editable_groups(&self, user: UserId) -> CategoryResult<Vec<CategoryGroup>> {
        let editable = self.editable_group_ids(user)?;
        Ok(self
            .all_groups()?
            .into_iter()
            .filter(|group| group.id.map_or(false, |id| editable.contains(&id)))
            .collect())
    }

    pub fn total_groups(&self) -> CategoryResult<usize> {
        Ok(self.all_group_ids()?.len())
    }

    pub fn group_by_id(&self, id: GroupId) -> CategoryResult<Option<CategoryGroup>> {
        match self.cache.read().lookup(id) {
            Cached::Hit(group) => return Ok(Some(group.clone())),
            Cached::Missing => return Ok(None),
            Cached::Unknown => {}
        }

        let group = self.load_group(id)?;
        let mut cache = self.cache.write();
        match &group {
            Some(group) => cache.put(group.clone()),
            None => cache.put_missing(id),
        }
        Ok(group)
    }

    /// Always queries storage, then refreshes the cached entry
    pub fn group_by_handle(&self, handle: &str) -> CategoryResult<Option<CategoryGroup>> {
        let Some(mut group) = self.backends.repository.group_by_handle(handle)? else {
            return Ok(None);
        };
        self.hydrate(&mut group)?;
        self.cache.write().put(group.clone());
        Ok(Some(group))
    }

    pub fn group_locales(&self, group_id: GroupId) -> CategoryResult<BTreeMap<LocaleId, GroupLocale>> {
        Ok(self.backends.repository.group_locales(group_id)?)
    }

    /// Whether the group's template exists under the site template root.
    /// Always false for groups without URLs.
    pub fn is_group_template_valid(&self, group: &CategoryGroup) -> bool {
        if !group.has_urls {
            return false;
        }

        group
            .template
            .as_deref()
            .map_or(false, |template| self.backends.templates.site_template_exists(template))
    }

    /// Drop every cached group, e.g. after another process changed them
    pub fn invalidate_cache(&self) {
        self.cache.write().clear();
        debug!("Category group cache cleared");
    }

    pub fn save(&self, group: &mut CategoryGroup) -> CategoryResult<SaveOutcome> {
        self.save_in(group, Boundary::Owned)
    }

    /// Validate and persist a group with its structure, field layout and
    /// locales.
    ///
    /// Nothing is written when validation fails; the errors are left on the
    /// group. A storage failure rolls back everything this call wrote.
    pub fn save_in(&self, group: &mut CategoryGroup, boundary: Boundary) -> CategoryResult<SaveOutcome> {
        let old = match group.id {
            Some(id) => Some(self.load_group(id)?.ok_or(CategoryError::GroupNotFound { id })?),
            None => None,
        };

        group.errors_mut().clear();
        if !group.has_urls {
            group.template = None;
        }

        let errors = self.validate(group)?;
        if !errors.is_empty() {
            debug!(handle = %group.handle, errors = errors.len(), "Category group failed validation");
            *group.errors_mut() = errors;
            return Ok(SaveOutcome::Invalid);
        }

        let assigned = AssignedIds::of(group);
        let scope = TxScope::open(self.backends.transactions.as_ref(), boundary)?;

        if let Err(e) = self.persist(group, old.as_ref()) {
            warn!(handle = %group.handle, error = %e, "Failed to save category group");
            self.forget(group, assigned);
            if let Err(rollback) = scope.rollback() {
                error!(error = %rollback, "Failed to roll back category group save");
            }
            return Err(e);
        }

        if let Err(e) = scope.commit() {
            self.forget(group, assigned);
            return Err(e.into());
        }

        self.cache.write().refresh(group.clone());
        info!(
            group_id = ?group.id,
            handle = %group.handle,
            is_new = old.is_none(),
            "Saved category group"
        );
        Ok(SaveOutcome::Saved)
    }

    pub fn delete_by_id(&self, id: GroupId) -> CategoryResult<bool> {
        self.delete_in(id, Boundary::Owned)
    }

    /// Delete a group with its field layout, its categories and its
    /// structure, all or nothing
    pub fn delete_in(&self, id: GroupId, boundary: Boundary) -> CategoryResult<bool> {
        let group = self
            .backends
            .repository
            .group_by_id(id)?
            .ok_or(CategoryError::GroupNotFound { id })?;

        let scope = TxScope::open(self.backends.transactions.as_ref(), boundary)?;
        let deleted = match self.remove(&group, id) {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(group_id = %id, error = %e, "Failed to delete category group");
                if let Err(rollback) = scope.rollback() {
                    error!(error = %rollback, "Failed to roll back category group delete");
                }
                return Err(e.into());
            }
        };
        scope.commit()?;

        self.cache.write().evict(id);
        info!(group_id = %id, handle = %group.handle, "Deleted category group");
        Ok(deleted)
    }

    fn remove(&self, group: &CategoryGroup, id: GroupId) -> StorageResult<bool> {
        let b = &self.backends;

        if let Some(layout_id) = group.field_layout_id {
            b.field_layouts.delete_layout_by_id(layout_id)?;
        }

        let category_ids = b.repository.category_ids_in_group(id)?;
        if !category_ids.is_empty() {
            debug!(group_id = %id, categories = category_ids.len(), "Deleting group categories");
            b.elements.delete_by_ids(&category_ids)?;
        }

        let deleted = b.repository.delete_group(id)?;

        if let Some(structure_id) = group.structure_id {
            b.trees.delete_structure(structure_id)?;
        }

        Ok(deleted)
    }

    fn validate(&self, group: &mut CategoryGroup) -> StorageResult<ValidationErrors> {
        let mut errors = ValidationErrors::new();
        group.validate_record(&mut errors);

        let repository = &self.backends.repository;
        if !group.handle.trim().is_empty() {
            if let Some(other) = repository.group_by_handle(&group.handle)? {
                if other.id != group.id {
                    errors.add("handle", format!("Handle “{}” has already been taken.", group.handle));
                }
            }
        }
        if !group.name.trim().is_empty() {
            if let Some(other) = repository.group_by_name(&group.name)? {
                if other.id != group.id {
                    errors.add("name", format!("Name “{}” has already been taken.", group.name));
                }
            }
        }

        let group_id = group.id;
        let (has_urls, max_levels) = (group.has_urls, group.max_levels);
        for (key, locale) in group.locales.iter_mut() {
            locale.locale = key.clone();
            locale.group_id = group_id;
            locale.apply_url_rules(has_urls, max_levels, &mut errors);
        }

        Ok(errors)
    }

    fn persist(&self, group: &mut CategoryGroup, old: Option<&CategoryGroup>) -> CategoryResult<()> {
        let b = &self.backends;

        let mut structure = match old.and_then(|o| o.structure_id) {
            Some(structure_id) => b.trees.get_structure(structure_id)?.unwrap_or_default(),
            None => Structure::default(),
        };
        structure.max_levels = group.max_levels;
        b.trees.save_structure(&mut structure)?;
        group.structure_id = structure.id;

        if let Some(layout_id) = old.and_then(|o| o.field_layout_id) {
            b.field_layouts.delete_layout_by_id(layout_id)?;
        }
        group.field_layout.id = None;
        b.field_layouts.save_layout(&mut group.field_layout)?;
        group.field_layout_id = group.field_layout.id;

        let group_id = match (old, group.id) {
            (Some(_), Some(id)) => {
                b.repository.update_group(group)?;
                id
            }
            _ => {
                let id = b.repository.insert_group(group)?;
                group.id = Some(id);
                id
            }
        };
        for locale in group.locales.values_mut() {
            locale.group_id = Some(group_id);
        }

        let Some(old) = old else {
            let locales: Vec<GroupLocale> = group.locales.values().cloned().collect();
            if !locales.is_empty() {
                b.repository.insert_group_locales(group_id, &locales)?;
            }
            return Ok(());
        };

        let mut inserted = Vec::new();
        let mut changed = Vec::new();
        for (key, locale) in &group.locales {
            match old.locales.get(key) {
                Some(stored) if locale.formats_differ(stored) => {
                    b.repository.update_group_locale(group_id, locale)?;
                    changed.push(key.clone());
                }
                Some(_) => {}
                None => inserted.push(locale.clone()),
            }
        }
        let dropped: Vec<LocaleId> = old
            .locales
            .keys()
            .filter(|key| !group.locales.contains_key(*key))
            .cloned()
            .collect();

        if !inserted.is_empty() {
            b.repository.insert_group_locales(group_id, &inserted)?;
        }
        if !dropped.is_empty() {
            b.repository.delete_group_locales(group_id, &dropped)?;
        }

        if dropped.is_empty() && changed.is_empty() && (group.has_urls || !old.has_urls) {
            return Ok(());
        }

        let category_ids = b.repository.category_ids_in_group(group_id)?;
        if category_ids.is_empty() {
            return Ok(());
        }

        if !dropped.is_empty() {
            debug!(group_id = %group_id, locales = ?dropped, "Deleting content of dropped locales");
            b.elements.delete_locale_content(&category_ids, &dropped)?;
        }

        if !group.locales.is_empty() && old.has_urls && !group.has_urls {
            debug!(group_id = %group_id, "Clearing category URIs");
            b.elements.clear_uris(&category_ids)?;
        } else if !changed.is_empty() {
            self.refresh_uris(&category_ids, &changed)?;
        }

        Ok(())
    }

    // Ancestors come first in tree order, so nested URIs see the parent's new URI.
    fn refresh_uris(&self, ids: &[ElementId], locales: &[LocaleId]) -> StorageResult<()> {
        for locale in locales {
            let categories = self.backends.elements.find_by_ids(ids, Some(locale))?;
            debug!(locale = %locale, categories = categories.len(), "Updating category URIs");
            for mut category in categories {
                self.backends
                    .elements
                    .update_slug_and_uri(&mut category, false, false)?;
            }
        }
        Ok(())
    }

    fn forget(&self, group: &mut CategoryGroup, assigned: AssignedIds) {
        if let Some(id) = group.id.or(assigned.id) {
            self.cache.write().evict(id);
        }
        assigned.restore(group);
    }

    fn load_group(&self, id: GroupId) -> StorageResult<Option<CategoryGroup>> {
        let Some(mut group) = self.backends.repository.group_by_id(id)? else {
            return Ok(None);
        };
        self.hydrate(&mut group)?;
        Ok(Some(group))
    }

    /// Attach locales, the structure's level limit and the field layout
    fn hydrate(&self, group: &mut CategoryGroup) -> StorageResult<()> {
        if let Some(id) = group.id {
            group.locales = self.backends.repository.group_locales(id)?;
        }
        if let Some(structure_id) = group.structure_id {
            if let Some(structure) = self.backends.trees.get_structure(structure_id)? {
                group.max_levels = structure.max_levels;
            }
        }
        if let Some(layout_id) = group.field_layout_id {
            if let Some(layout) = self.backends.field_layouts.get_layout(layout_id)? {
                group.field_layout = layout;
            }
        }
        Ok(())
    }
}
