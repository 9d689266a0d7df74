//! In-memory backend
//!
//! [`MemoryBackend`] implements every collaborator trait over plain maps. It is:
//!
//! - **Observable**: every write and transaction call is appended to a typed
//!   [`Call`] log
//! - **Error-injecting**: [`MemoryBackend::fail_on`] makes a named operation
//!   return a backend error
//! - **Transactional**: `begin` snapshots the state and `rollback` restores it,
//!   so a rolled-back operation leaves no trace
//!
//! # Example
//!
//! ```rust,ignore
//! use canopy_core::test_support::MemoryBackend;
//! use canopy_core::{CategoryGroup, GroupLocale, GroupStore};
//!
//! let backend = MemoryBackend::new();
//! let groups = GroupStore::new(backend.backends());
//!
//! let mut group = CategoryGroup::new("Topics", "topics")
//!     .with_urls("topics/_category")
//!     .with_locale(
//!         GroupLocale::new("en")
//!             .with_url_format("topics/{slug}")
//!             .with_nested_url_format("{parent.uri}/{slug}"),
//!     );
//! assert!(groups.save(&mut group).unwrap().is_saved());
//! assert_eq!(backend.committed(), 1);
//! ```

use crate::category::uri::{category_uri, ensure_slug};
use crate::category::{Category, NewParent};
use crate::fields::FieldLayout;
use crate::group::{CategoryGroup, GroupLocale};
use crate::storage::{
    Backends, CategoryRepository, ElementStore, FieldLayoutStore, PermissionChecker, StorageError,
    StorageResult, TemplateResolver, TransactionManager, TreeStore,
};
use crate::tree::{Structure, Tree, TreeError};
use crate::types::{ElementId, FieldLayoutId, GroupId, LocaleId, StructureId, UserId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// A recorded write or transaction call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Begin,
    Commit,
    Rollback,
    InsertGroup(String),
    UpdateGroup(GroupId),
    DeleteGroup(GroupId),
    InsertGroupLocales(GroupId, Vec<LocaleId>),
    UpdateGroupLocale(GroupId, LocaleId),
    DeleteGroupLocales(GroupId, Vec<LocaleId>),
    SaveCategoryRow(ElementId),
    SaveElement(Option<ElementId>),
    DeleteByIds(Vec<ElementId>),
    UpdateSlugAndUri(ElementId, LocaleId),
    UpdateDescendantSlugsAndUris(ElementId),
    DeleteLocaleContent(Vec<ElementId>, Vec<LocaleId>),
    ClearUris(Vec<ElementId>),
    SaveStructure(Option<StructureId>),
    DeleteStructure(StructureId),
    AppendToRoot(ElementId),
    AppendUnder(ElementId, ElementId),
    SaveLayout,
    DeleteLayout(FieldLayoutId),
}

impl Call {
    /// Operation name accepted by [`MemoryBackend::fail_on`]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
            Self::InsertGroup(_) => "insert_group",
            Self::UpdateGroup(_) => "update_group",
            Self::DeleteGroup(_) => "delete_group",
            Self::InsertGroupLocales(..) => "insert_group_locales",
            Self::UpdateGroupLocale(..) => "update_group_locale",
            Self::DeleteGroupLocales(..) => "delete_group_locales",
            Self::SaveCategoryRow(_) => "save_category_row",
            Self::SaveElement(_) => "save_element",
            Self::DeleteByIds(_) => "delete_by_ids",
            Self::UpdateSlugAndUri(..) => "update_slug_and_uri",
            Self::UpdateDescendantSlugsAndUris(_) => "update_descendant_slugs_and_uris",
            Self::DeleteLocaleContent(..) => "delete_locale_content",
            Self::ClearUris(_) => "clear_uris",
            Self::SaveStructure(_) => "save_structure",
            Self::DeleteStructure(_) => "delete_structure",
            Self::AppendToRoot(_) => "append_to_root",
            Self::AppendUnder(..) => "append_under",
            Self::SaveLayout => "save_layout",
            Self::DeleteLayout(_) => "delete_layout",
        }
    }

    pub fn is_transaction_control(&self) -> bool {
        matches!(self, Self::Begin | Self::Commit | Self::Rollback)
    }
}

#[derive(Debug, Clone)]
struct LocaleContent {
    title: String,
    slug: String,
    uri: Option<String>,
    enabled: bool,
}

#[derive(Debug, Clone)]
struct ElementRow {
    structure_id: Option<StructureId>,
    date_created: DateTime<Utc>,
    date_updated: DateTime<Utc>,
    content: BTreeMap<LocaleId, LocaleContent>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    groups: BTreeMap<GroupId, CategoryGroup>,
    locales: BTreeMap<(GroupId, LocaleId), GroupLocale>,
    categories: BTreeMap<ElementId, GroupId>,
    elements: BTreeMap<ElementId, ElementRow>,
    structures: BTreeMap<StructureId, Tree>,
    layouts: BTreeMap<FieldLayoutId, FieldLayout>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn group(&self, id: GroupId) -> Option<CategoryGroup> {
        let mut group = self.groups.get(&id)?.clone();
        group.locales = self
            .locales
            .range((id, LocaleId::default())..)
            .take_while(|((group_id, _), _)| *group_id == id)
            .map(|((_, locale), row)| (locale.clone(), row.clone()))
            .collect();
        Some(group)
    }

    fn category(&self, id: ElementId, locale: Option<&LocaleId>) -> Option<Category> {
        let group_id = *self.categories.get(&id)?;
        let row = self.elements.get(&id)?;
        let (locale, content) = match locale {
            Some(locale) => (locale.clone(), row.content.get(locale)?),
            None => row.content.iter().next().map(|(l, c)| (l.clone(), c))?,
        };

        let mut category = Category::new(group_id, locale, content.title.clone());
        category.id = Some(id);
        category.slug = content.slug.clone();
        category.uri = content.uri.clone();
        category.enabled = content.enabled;
        category.structure_id = row.structure_id;
        category.position = row
            .structure_id
            .and_then(|sid| self.structures.get(&sid))
            .and_then(|tree| tree.position(id));
        category.date_created = Some(row.date_created);
        category.date_updated = Some(row.date_updated);
        Some(category)
    }

    fn tree_parent(&self, id: ElementId, locale: &LocaleId) -> Option<Category> {
        let structure_id = self.elements.get(&id)?.structure_id?;
        let parent_id = self.structures.get(&structure_id)?.parent_of(id)?;
        self.category(parent_id, Some(locale))
    }

    fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        self.elements
            .get(&id)
            .and_then(|row| row.structure_id)
            .and_then(|sid| self.structures.get(&sid))
            .map(|tree| tree.descendants_of(id))
            .unwrap_or_default()
    }

    fn refresh_uri(&mut self, id: ElementId, locale: &LocaleId) {
        let Some(category) = self.category(id, Some(locale)) else {
            return;
        };
        let Some(group) = self.group(category.group_id) else {
            return;
        };
        let parent = self.tree_parent(id, locale);
        let uri = category_uri(&group, &category, parent.as_ref());

        if let Some(content) = self
            .elements
            .get_mut(&id)
            .and_then(|row| row.content.get_mut(locale))
        {
            content.uri = uri;
        }
    }

    fn refresh_all_locales(&mut self, id: ElementId) {
        let locales: Vec<LocaleId> = self
            .elements
            .get(&id)
            .map(|row| row.content.keys().cloned().collect())
            .unwrap_or_default();
        for locale in &locales {
            self.refresh_uri(id, locale);
        }
    }

    fn uri_taken(&self, uri: &str, locale: &LocaleId, except: Option<ElementId>) -> bool {
        self.elements.iter().any(|(id, row)| {
            Some(*id) != except
                && row
                    .content
                    .get(locale)
                    .map_or(false, |c| c.uri.as_deref() == Some(uri))
        })
    }
}

/// In-memory implementation of every collaborator, for tests
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    snapshot: Mutex<Option<MemoryState>>,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<String>>,
    grants: Mutex<HashSet<(String, UserId)>>,
    templates: Mutex<HashSet<String>>,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Collaborators backed by this instance
    pub fn backends(self: &Arc<Self>) -> Backends {
        Backends {
            repository: self.clone(),
            elements: self.clone(),
            trees: self.clone(),
            field_layouts: self.clone(),
            permissions: self.clone(),
            templates: self.clone(),
            transactions: self.clone(),
        }
    }

    /// Make every later call of the named operation fail (see [`Call::name`])
    pub fn fail_on(&self, operation: &str) {
        self.failing.lock().insert(operation.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().clear();
    }

    pub fn grant(&self, permission: impl Into<String>, user: UserId) {
        self.grants.lock().insert((permission.into(), user));
    }

    pub fn add_template(&self, path: impl Into<String>) {
        self.templates.lock().insert(path.into());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Recorded calls other than begin, commit and rollback
    pub fn writes(&self) -> Vec<Call> {
        self.calls
            .lock()
            .iter()
            .filter(|c| !c.is_transaction_control())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn committed(&self) -> usize {
        self.calls.lock().iter().filter(|c| **c == Call::Commit).count()
    }

    pub fn rolled_back(&self) -> usize {
        self.calls.lock().iter().filter(|c| **c == Call::Rollback).count()
    }

    pub fn in_transaction(&self) -> bool {
        self.snapshot.lock().is_some()
    }

    pub fn group_count(&self) -> usize {
        self.state.lock().groups.len()
    }

    pub fn structure_count(&self) -> usize {
        self.state.lock().structures.len()
    }

    pub fn layout_count(&self) -> usize {
        self.state.lock().layouts.len()
    }

    pub fn element_count(&self) -> usize {
        self.state.lock().elements.len()
    }

    /// Stored URI of an element in one locale
    pub fn uri_of(&self, id: ElementId, locale: &str) -> Option<String> {
        self.state
            .lock()
            .elements
            .get(&id)
            .and_then(|row| row.content.get(&LocaleId::from(locale)))
            .and_then(|c| c.uri.clone())
    }

    pub fn has_content(&self, id: ElementId, locale: &str) -> bool {
        self.state
            .lock()
            .elements
            .get(&id)
            .map_or(false, |row| row.content.contains_key(&LocaleId::from(locale)))
    }

    fn record(&self, call: Call) -> StorageResult<()> {
        let name = call.name();
        self.calls.lock().push(call);
        if self.failing.lock().contains(name) {
            return Err(StorageError::backend(format!("injected failure in {}", name)));
        }
        Ok(())
    }
}

impl TransactionManager for MemoryBackend {
    fn begin(&self) -> StorageResult<()> {
        self.record(Call::Begin)?;
        let mut snapshot = self.snapshot.lock();
        if snapshot.is_some() {
            return Err(StorageError::transaction("a transaction is already open"));
        }
        *snapshot = Some(self.state.lock().clone());
        Ok(())
    }

    fn commit(&self) -> StorageResult<()> {
        self.record(Call::Commit)?;
        self.snapshot
            .lock()
            .take()
            .map(|_| ())
            .ok_or_else(|| StorageError::transaction("no transaction is open"))
    }

    fn rollback(&self) -> StorageResult<()> {
        self.record(Call::Rollback)?;
        let saved = self
            .snapshot
            .lock()
            .take()
            .ok_or_else(|| StorageError::transaction("no transaction is open"))?;
        *self.state.lock() = saved;
        Ok(())
    }
}

impl CategoryRepository for MemoryBackend {
    fn all_group_ids(&self) -> StorageResult<Vec<GroupId>> {
        Ok(self.state.lock().groups.keys().copied().collect())
    }

    fn all_groups(&self) -> StorageResult<Vec<CategoryGroup>> {
        let mut groups: Vec<CategoryGroup> = self.state.lock().groups.values().cloned().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    fn group_by_id(&self, id: GroupId) -> StorageResult<Option<CategoryGroup>> {
        Ok(self.state.lock().groups.get(&id).cloned())
    }

    fn group_by_handle(&self, handle: &str) -> StorageResult<Option<CategoryGroup>> {
        Ok(self
            .state
            .lock()
            .groups
            .values()
            .find(|g| g.handle == handle)
            .cloned())
    }

    fn group_by_name(&self, name: &str) -> StorageResult<Option<CategoryGroup>> {
        Ok(self
            .state
            .lock()
            .groups
            .values()
            .find(|g| g.name == name)
            .cloned())
    }

    fn insert_group(&self, group: &CategoryGroup) -> StorageResult<GroupId> {
        self.record(Call::InsertGroup(group.handle.clone()))?;
        let mut state = self.state.lock();
        let id = GroupId(state.next_id());
        let mut row = CategoryGroup::new(group.name.clone(), group.handle.clone());
        row.id = Some(id);
        row.has_urls = group.has_urls;
        row.template = group.template.clone();
        row.structure_id = group.structure_id;
        row.field_layout_id = group.field_layout_id;
        state.groups.insert(id, row);
        Ok(id)
    }

    fn update_group(&self, group: &CategoryGroup) -> StorageResult<()> {
        let id = group
            .id
            .ok_or_else(|| StorageError::InvalidOperation("group has no ID".to_string()))?;
        self.record(Call::UpdateGroup(id))?;
        let mut state = self.state.lock();
        let row = state
            .groups
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found(format!("category group {}", id)))?;
        row.name = group.name.clone();
        row.handle = group.handle.clone();
        row.has_urls = group.has_urls;
        row.template = group.template.clone();
        row.structure_id = group.structure_id;
        row.field_layout_id = group.field_layout_id;
        Ok(())
    }

    fn delete_group(&self, id: GroupId) -> StorageResult<bool> {
        self.record(Call::DeleteGroup(id))?;
        let mut state = self.state.lock();
        state.locales.retain(|(group_id, _), _| *group_id != id);
        Ok(state.groups.remove(&id).is_some())
    }

    fn group_locales(&self, group_id: GroupId) -> StorageResult<BTreeMap<LocaleId, GroupLocale>> {
        Ok(self
            .state
            .lock()
            .group(group_id)
            .map(|g| g.locales)
            .unwrap_or_default())
    }

    fn insert_group_locales(&self, group_id: GroupId, locales: &[GroupLocale]) -> StorageResult<()> {
        self.record(Call::InsertGroupLocales(
            group_id,
            locales.iter().map(|l| l.locale.clone()).collect(),
        ))?;
        let mut state = self.state.lock();
        for locale in locales {
            let key = (group_id, locale.locale.clone());
            if state.locales.contains_key(&key) {
                return Err(StorageError::Constraint(format!(
                    "locale {} already enabled for group {}",
                    locale.locale, group_id
                )));
            }
            let mut row = locale.clone();
            row.group_id = Some(group_id);
            state.locales.insert(key, row);
        }
        Ok(())
    }

    fn update_group_locale(&self, group_id: GroupId, locale: &GroupLocale) -> StorageResult<()> {
        self.record(Call::UpdateGroupLocale(group_id, locale.locale.clone()))?;
        let mut state = self.state.lock();
        let row = state
            .locales
            .get_mut(&(group_id, locale.locale.clone()))
            .ok_or_else(|| StorageError::not_found(format!("locale {}", locale.locale)))?;
        row.url_format = locale.url_format.clone();
        row.nested_url_format = locale.nested_url_format.clone();
        Ok(())
    }

    fn delete_group_locales(&self, group_id: GroupId, locales: &[LocaleId]) -> StorageResult<()> {
        self.record(Call::DeleteGroupLocales(group_id, locales.to_vec()))?;
        let mut state = self.state.lock();
        for locale in locales {
            state.locales.remove(&(group_id, locale.clone()));
        }
        Ok(())
    }

    fn category_group_id(&self, id: ElementId) -> StorageResult<Option<GroupId>> {
        Ok(self.state.lock().categories.get(&id).copied())
    }

    fn save_category_row(&self, id: ElementId, group_id: GroupId) -> StorageResult<()> {
        self.record(Call::SaveCategoryRow(id))?;
        self.state.lock().categories.insert(id, group_id);
        Ok(())
    }

    fn category_ids_in_group(&self, group_id: GroupId) -> StorageResult<Vec<ElementId>> {
        Ok(self
            .state
            .lock()
            .categories
            .iter()
            .filter(|(_, g)| **g == group_id)
            .map(|(id, _)| *id)
            .collect())
    }
}

impl ElementStore for MemoryBackend {
    fn save_element(&self, category: &mut Category) -> StorageResult<bool> {
        self.record(Call::SaveElement(category.id))?;
        let mut state = self.state.lock();

        ensure_slug(category);
        let id = match category.id {
            Some(id) => id,
            None => ElementId(state.next_id + 1),
        };

        let parent = match (&category.pending_parent, category.new_parent) {
            (Some(parent), _) => Some(parent.as_ref().clone()),
            (None, NewParent::Root) => None,
            (None, _) => state.tree_parent(id, &category.locale),
        };
        let group = state.group(category.group_id);
        let mut probe = category.clone();
        probe.id = Some(id);
        let uri = group.and_then(|g| category_uri(&g, &probe, parent.as_ref()));

        if let Some(uri) = &uri {
            if state.uri_taken(uri, &category.locale, Some(id)) {
                category
                    .errors_mut()
                    .add("uri", format!("URI “{}” has already been taken.", uri));
                return Ok(false);
            }
        }

        if category.id.is_none() {
            state.next_id();
            category.id = Some(id);
        }

        let now = Utc::now();
        let row = state.elements.entry(id).or_insert_with(|| ElementRow {
            structure_id: None,
            date_created: now,
            date_updated: now,
            content: BTreeMap::new(),
        });
        row.date_updated = now;
        row.content.insert(
            category.locale.clone(),
            LocaleContent {
                title: category.title.clone(),
                slug: category.slug.clone(),
                uri: uri.clone(),
                enabled: category.enabled,
            },
        );

        category.uri = uri;
        category.date_created = Some(row.date_created);
        category.date_updated = Some(now);
        Ok(true)
    }

    fn delete_by_ids(&self, ids: &[ElementId]) -> StorageResult<bool> {
        self.record(Call::DeleteByIds(ids.to_vec()))?;
        let mut state = self.state.lock();

        for id in ids {
            let Some(row) = state.elements.remove(id) else {
                continue;
            };
            state.categories.remove(id);
            if let Some(tree) = row.structure_id.and_then(|sid| state.structures.get_mut(&sid)) {
                match tree.remove(*id) {
                    Ok(_) | Err(TreeError::NodeNotFound(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(true)
    }

    fn get_by_id(&self, id: ElementId, locale: Option<&LocaleId>) -> StorageResult<Option<Category>> {
        Ok(self.state.lock().category(id, locale))
    }

    fn find_by_ids(&self, ids: &[ElementId], locale: Option<&LocaleId>) -> StorageResult<Vec<Category>> {
        let state = self.state.lock();
        let mut seen = HashSet::new();
        let mut categories: Vec<Category> = ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| state.category(*id, locale))
            .collect();
        categories.sort_by_key(|c| (c.structure_id, c.position.map(|p| p.lft)));
        Ok(categories)
    }

    fn find_descendants(&self, category: &Category) -> StorageResult<Vec<Category>> {
        let Some(id) = category.id else {
            return Ok(Vec::new());
        };
        let state = self.state.lock();
        Ok(state
            .descendants(id)
            .into_iter()
            .rev()
            .filter_map(|d| {
                state
                    .category(d, Some(&category.locale))
                    .or_else(|| state.category(d, None))
            })
            .collect())
    }

    fn update_slug_and_uri(
        &self,
        category: &mut Category,
        update_others: bool,
        update_descendants: bool,
    ) -> StorageResult<()> {
        let id = category
            .id
            .ok_or_else(|| StorageError::InvalidOperation("category has no ID".to_string()))?;
        self.record(Call::UpdateSlugAndUri(id, category.locale.clone()))?;
        let mut state = self.state.lock();

        if update_others {
            state.refresh_all_locales(id);
        } else {
            state.refresh_uri(id, &category.locale);
        }
        if update_descendants {
            for descendant in state.descendants(id) {
                state.refresh_all_locales(descendant);
            }
        }

        category.uri = state.category(id, Some(&category.locale)).and_then(|c| c.uri);
        Ok(())
    }

    fn update_descendant_slugs_and_uris(&self, category: &Category) -> StorageResult<()> {
        let Some(id) = category.id else {
            return Ok(());
        };
        self.record(Call::UpdateDescendantSlugsAndUris(id))?;
        let mut state = self.state.lock();
        for descendant in state.descendants(id) {
            state.refresh_all_locales(descendant);
        }
        Ok(())
    }

    fn delete_locale_content(&self, ids: &[ElementId], locales: &[LocaleId]) -> StorageResult<()> {
        self.record(Call::DeleteLocaleContent(ids.to_vec(), locales.to_vec()))?;
        let mut state = self.state.lock();
        for id in ids {
            if let Some(row) = state.elements.get_mut(id) {
                for locale in locales {
                    row.content.remove(locale);
                }
            }
        }
        Ok(())
    }

    fn clear_uris(&self, ids: &[ElementId]) -> StorageResult<()> {
        self.record(Call::ClearUris(ids.to_vec()))?;
        let mut state = self.state.lock();
        for id in ids {
            if let Some(row) = state.elements.get_mut(id) {
                for content in row.content.values_mut() {
                    content.uri = None;
                }
            }
        }
        Ok(())
    }
}

impl TreeStore for MemoryBackend {
    fn get_structure(&self, id: StructureId) -> StorageResult<Option<Structure>> {
        Ok(self.state.lock().structures.get(&id).map(|tree| Structure {
            id: Some(id),
            max_levels: tree.max_levels(),
        }))
    }

    fn save_structure(&self, structure: &mut Structure) -> StorageResult<()> {
        self.record(Call::SaveStructure(structure.id))?;
        let mut state = self.state.lock();
        let id = match structure.id {
            Some(id) => id,
            None => {
                let id = StructureId(state.next_id());
                structure.id = Some(id);
                id
            }
        };
        let nodes = state
            .structures
            .get(&id)
            .map(|tree| tree.nodes().to_vec())
            .unwrap_or_default();
        state
            .structures
            .insert(id, Tree::from_nodes(structure.max_levels, nodes));
        Ok(())
    }

    fn delete_structure(&self, id: StructureId) -> StorageResult<bool> {
        self.record(Call::DeleteStructure(id))?;
        Ok(self.state.lock().structures.remove(&id).is_some())
    }

    fn load_tree(&self, id: StructureId) -> StorageResult<Tree> {
        self.state
            .lock()
            .structures
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(format!("structure {}", id)))
    }

    fn append_to_root(&self, structure_id: StructureId, category: &mut Category) -> StorageResult<()> {
        let id = category
            .id
            .ok_or_else(|| StorageError::InvalidOperation("category has no ID".to_string()))?;
        self.record(Call::AppendToRoot(id))?;
        let mut state = self.state.lock();
        let tree = state
            .structures
            .get_mut(&structure_id)
            .ok_or_else(|| StorageError::not_found(format!("structure {}", structure_id)))?;
        let position = tree.append_to_root(id)?;

        if let Some(row) = state.elements.get_mut(&id) {
            row.structure_id = Some(structure_id);
        }
        category.structure_id = Some(structure_id);
        category.position = Some(position);
        Ok(())
    }

    fn append_under(
        &self,
        structure_id: StructureId,
        category: &mut Category,
        parent: &Category,
    ) -> StorageResult<()> {
        let (Some(id), Some(parent_id)) = (category.id, parent.id) else {
            return Err(StorageError::InvalidOperation(
                "category and parent need IDs".to_string(),
            ));
        };
        self.record(Call::AppendUnder(id, parent_id))?;
        let mut state = self.state.lock();
        let tree = state
            .structures
            .get_mut(&structure_id)
            .ok_or_else(|| StorageError::not_found(format!("structure {}", structure_id)))?;
        let position = tree.append_under(id, parent_id)?;

        if let Some(row) = state.elements.get_mut(&id) {
            row.structure_id = Some(structure_id);
        }
        category.structure_id = Some(structure_id);
        category.position = Some(position);
        Ok(())
    }
}

impl FieldLayoutStore for MemoryBackend {
    fn get_layout(&self, id: FieldLayoutId) -> StorageResult<Option<FieldLayout>> {
        Ok(self.state.lock().layouts.get(&id).cloned())
    }

    fn save_layout(&self, layout: &mut FieldLayout) -> StorageResult<()> {
        self.record(Call::SaveLayout)?;
        let mut state = self.state.lock();
        let id = FieldLayoutId(state.next_id());
        layout.id = Some(id);
        state.layouts.insert(id, layout.clone());
        Ok(())
    }

    fn delete_layout_by_id(&self, id: FieldLayoutId) -> StorageResult<bool> {
        self.record(Call::DeleteLayout(id))?;
        Ok(self.state.lock().layouts.remove(&id).is_some())
    }
}

impl PermissionChecker for MemoryBackend {
    fn check(&self, permission: &str, user: UserId) -> bool {
        self.grants.lock().contains(&(permission.to_string(), user))
    }
}

impl TemplateResolver for MemoryBackend {
    fn site_template_exists(&self, path: &str) -> bool {
        self.templates.lock().contains(path)
    }
}
