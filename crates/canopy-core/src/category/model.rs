use crate::tree::TreePosition;
use crate::types::{ElementId, GroupId, LocaleId, StructureId};
use crate::validation::ValidationErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Re-parenting requested by a save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewParent {
    /// Nothing was submitted; keep the current place in the tree
    #[default]
    Unchanged,
    /// Move to (or create at) the top level
    Root,
    Parent(ElementId),
}

/// An element belonging to a category group, in one locale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<ElementId>,
    pub group_id: GroupId,
    pub locale: LocaleId,
    pub title: String,
    /// Derived from the title when left empty
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub structure_id: Option<StructureId>,
    /// Place in the group's tree; managed by the tree store
    #[serde(default)]
    pub position: Option<TreePosition>,
    #[serde(default)]
    pub new_parent: NewParent,
    /// Resolved target of `new_parent` during a save
    #[serde(skip)]
    pub pending_parent: Option<Box<Category>>,
    #[serde(skip)]
    errors: ValidationErrors,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_updated: Option<DateTime<Utc>>,
}

fn enabled_default() -> bool {
    true
}

impl Category {
    pub fn new(group_id: GroupId, locale: impl Into<LocaleId>, title: impl Into<String>) -> Self {
        Self {
            group_id,
            locale: locale.into(),
            title: title.into(),
            id: None,
            slug: String::new(),
            uri: None,
            enabled: true,
            structure_id: None,
            position: None,
            new_parent: NewParent::Unchanged,
            pending_parent: None,
            errors: ValidationErrors::new(),
            date_created: None,
            date_updated: None,
        }
    }

    pub fn with_parent(mut self, parent: ElementId) -> Self {
        self.new_parent = NewParent::Parent(parent);
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn level(&self) -> Option<u32> {
        self.position.map(|p| p.level)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ValidationErrors {
        &mut self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
