//! Collaborator Traits
//!
//! The services in this crate depend only on these traits; backends (SQLite,
//! the in-memory test backend) implement them. Each trait covers one
//! collaborator so tests can observe or fail exactly the calls they care about.
//!
//! All operations are blocking. Implementations that share one connection are
//! expected to run every call issued between [`TransactionManager::begin`] and
//! `commit`/`rollback` inside that transaction.

use super::StorageResult;
use crate::category::Category;
use crate::fields::FieldLayout;
use crate::group::{CategoryGroup, GroupLocale};
use crate::tree::{Structure, Tree};
use crate::types::{ElementId, FieldLayoutId, GroupId, LocaleId, StructureId, UserId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Rows owned by the category subsystem: groups, their locales and the
/// category-to-group links.
///
/// Groups returned here carry only their own columns; locales and the
/// structure's `max_levels` are attached by the group store.
pub trait CategoryRepository: Send + Sync {
    fn all_group_ids(&self) -> StorageResult<Vec<GroupId>>;

    /// Every group, ordered by name
    fn all_groups(&self) -> StorageResult<Vec<CategoryGroup>>;

    fn group_by_id(&self, id: GroupId) -> StorageResult<Option<CategoryGroup>>;

    fn group_by_handle(&self, handle: &str) -> StorageResult<Option<CategoryGroup>>;

    fn group_by_name(&self, name: &str) -> StorageResult<Option<CategoryGroup>>;

    fn insert_group(&self, group: &CategoryGroup) -> StorageResult<GroupId>;

    fn update_group(&self, group: &CategoryGroup) -> StorageResult<()>;

    /// Returns whether a row was removed
    fn delete_group(&self, id: GroupId) -> StorageResult<bool>;

    fn group_locales(&self, group_id: GroupId) -> StorageResult<BTreeMap<LocaleId, GroupLocale>>;

    /// Insert several locale rows in one statement
    fn insert_group_locales(&self, group_id: GroupId, locales: &[GroupLocale]) -> StorageResult<()>;

    fn update_group_locale(&self, group_id: GroupId, locale: &GroupLocale) -> StorageResult<()>;

    /// Delete the given locales of one group in one statement
    fn delete_group_locales(&self, group_id: GroupId, locales: &[LocaleId]) -> StorageResult<()>;

    /// Group of a category, if the element is a category
    fn category_group_id(&self, id: ElementId) -> StorageResult<Option<GroupId>>;

    /// Insert or update the category row linking an element to its group
    fn save_category_row(&self, id: ElementId, group_id: GroupId) -> StorageResult<()>;

    fn category_ids_in_group(&self, group_id: GroupId) -> StorageResult<Vec<ElementId>>;
}

/// Generic element persistence with slug and URI management
pub trait ElementStore: Send + Sync {
    /// Persist the element in its locale, assigning an ID when new and
    /// computing its slug and URI.
    ///
    /// Returns `false` with errors recorded on the category when the element
    /// cannot be stored (for example when its URI is taken).
    fn save_element(&self, category: &mut Category) -> StorageResult<bool>;

    /// Delete elements with all their locale content and tree nodes, in one
    /// batch. Tree nodes are removed in the order given.
    fn delete_by_ids(&self, ids: &[ElementId]) -> StorageResult<bool>;

    /// Load an element in `locale`, or in its first locale when `None`.
    /// Disabled elements are included.
    fn get_by_id(&self, id: ElementId, locale: Option<&LocaleId>) -> StorageResult<Option<Category>>;

    /// Load elements ordered by structure and tree position. Missing IDs are
    /// skipped.
    fn find_by_ids(&self, ids: &[ElementId], locale: Option<&LocaleId>) -> StorageResult<Vec<Category>>;

    /// Descendants of `category` in its tree, in descending tree position
    fn find_descendants(&self, category: &Category) -> StorageResult<Vec<Category>>;

    /// Recompute and store the slug and URI of `category` in its locale.
    /// `update_others` repeats this for the element's other locales and
    /// `update_descendants` for everything below it.
    fn update_slug_and_uri(
        &self,
        category: &mut Category,
        update_others: bool,
        update_descendants: bool,
    ) -> StorageResult<()>;

    /// Recompute slugs and URIs of every descendant in every locale
    fn update_descendant_slugs_and_uris(&self, category: &Category) -> StorageResult<()>;

    /// Delete the locale-specific rows of `ids` for `locales`
    fn delete_locale_content(&self, ids: &[ElementId], locales: &[LocaleId]) -> StorageResult<()>;

    /// Null the URI of `ids` in every locale
    fn clear_uris(&self, ids: &[ElementId]) -> StorageResult<()>;
}

/// Structures and the placement of elements inside them
pub trait TreeStore: Send + Sync {
    fn get_structure(&self, id: StructureId) -> StorageResult<Option<Structure>>;

    /// Insert or update; assigns the ID of a new structure
    fn save_structure(&self, structure: &mut Structure) -> StorageResult<()>;

    fn delete_structure(&self, id: StructureId) -> StorageResult<bool>;

    /// Snapshot of every node in the structure
    fn load_tree(&self, id: StructureId) -> StorageResult<Tree>;

    /// Place (or move) `category` at the end of the top level and update its
    /// position
    fn append_to_root(&self, structure_id: StructureId, category: &mut Category) -> StorageResult<()>;

    /// Place (or move) `category` as the last child of `parent`
    fn append_under(
        &self,
        structure_id: StructureId,
        category: &mut Category,
        parent: &Category,
    ) -> StorageResult<()>;
}

pub trait FieldLayoutStore: Send + Sync {
    fn get_layout(&self, id: FieldLayoutId) -> StorageResult<Option<FieldLayout>>;

    /// Store the layout as a new row and assign its ID
    fn save_layout(&self, layout: &mut FieldLayout) -> StorageResult<()>;

    fn delete_layout_by_id(&self, id: FieldLayoutId) -> StorageResult<bool>;
}

pub trait PermissionChecker: Send + Sync {
    fn check(&self, permission: &str, user: UserId) -> bool;
}

/// Looks templates up against the site template root
pub trait TemplateResolver: Send + Sync {
    fn site_template_exists(&self, path: &str) -> bool;
}

/// Boundary control for the connection shared by the stores
pub trait TransactionManager: Send + Sync {
    fn begin(&self) -> StorageResult<()>;

    fn commit(&self) -> StorageResult<()>;

    fn rollback(&self) -> StorageResult<()>;
}

/// The collaborators a service is built from
#[derive(Clone)]
pub struct Backends {
    pub repository: Arc<dyn CategoryRepository>,
    pub elements: Arc<dyn ElementStore>,
    pub trees: Arc<dyn TreeStore>,
    pub field_layouts: Arc<dyn FieldLayoutStore>,
    pub permissions: Arc<dyn PermissionChecker>,
    pub templates: Arc<dyn TemplateResolver>,
    pub transactions: Arc<dyn TransactionManager>,
}

