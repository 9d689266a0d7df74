use super::GroupLocale;
use crate::fields::FieldLayout;
use crate::types::{FieldLayoutId, GroupId, LocaleId, StructureId};
use crate::validation::ValidationErrors;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static HANDLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());

/// A typed group of categories backed by one tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    #[serde(default)]
    pub id: Option<GroupId>,
    pub name: String,
    /// Unique, URL-safe identifier
    pub handle: String,
    #[serde(default)]
    pub has_urls: bool,
    /// Site template rendering the group's categories; only kept when `has_urls`
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub structure_id: Option<StructureId>,
    #[serde(default)]
    pub field_layout_id: Option<FieldLayoutId>,
    /// Mirrored from the owned tree; 0 means unlimited
    #[serde(default)]
    pub max_levels: u32,
    /// Enabled locales. The set supplied on save replaces the stored set.
    #[serde(default)]
    pub locales: BTreeMap<LocaleId, GroupLocale>,
    #[serde(default)]
    pub field_layout: FieldLayout,
    #[serde(skip)]
    errors: ValidationErrors,
}

impl CategoryGroup {
    pub fn new(name: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: handle.into(),
            ..Self::default()
        }
    }

    pub fn with_urls(mut self, template: impl Into<String>) -> Self {
        self.has_urls = true;
        self.template = Some(template.into());
        self
    }

    pub fn with_max_levels(mut self, max_levels: u32) -> Self {
        self.max_levels = max_levels;
        self
    }

    pub fn with_locale(mut self, locale: GroupLocale) -> Self {
        self.set_locale(locale);
        self
    }

    pub fn set_locale(&mut self, locale: GroupLocale) {
        self.locales.insert(locale.locale.clone(), locale);
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
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

    /// Permission key guarding edits to this group's categories
    pub fn edit_permission(id: GroupId) -> String {
        format!("editCategories:{}", id)
    }

    /// Checks on the group row itself. Uniqueness needs storage and is checked
    /// by the store.
    pub(crate) fn validate_record(&self, errors: &mut ValidationErrors) {
        if self.name.trim().is_empty() {
            errors.add("name", "Name cannot be blank.");
        }

        if self.handle.trim().is_empty() {
            errors.add("handle", "Handle cannot be blank.");
        } else if !HANDLE_RE.is_match(&self.handle) {
            errors.add(
                "handle",
                format!("“{}” isn’t a valid handle.", self.handle),
            );
        }

        if self.has_urls && self.template.as_deref().map_or(true, |t| t.trim().is_empty()) {
            errors.add("template", "Template cannot be blank.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_keyed_by_id() {
        let group = CategoryGroup::new("Topics", "topics")
            .with_locale(GroupLocale::new("en"))
            .with_locale(GroupLocale::new("de"));

        let keys: Vec<&str> = group.locales.keys().map(LocaleId::as_str).collect();
        assert_eq!(keys, ["de", "en"]);
    }

    #[test]
    fn test_record_validation() {
        let mut errors = ValidationErrors::new();
        CategoryGroup::new("", "9lives").validate_record(&mut errors);
        assert!(errors.has("name"));
        assert!(errors.has("handle"));

        let mut errors = ValidationErrors::new();
        let mut group = CategoryGroup::new("Topics", "topics");
        group.has_urls = true;
        group.validate_record(&mut errors);
        assert!(errors.has("template"));

        let mut errors = ValidationErrors::new();
        CategoryGroup::new("Topics", "topics_2")
            .with_urls("topics/_category")
            .validate_record(&mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_deserializes_from_toml_shape() {
        let json = r#"{
            "name": "Topics",
            "handle": "topics",
            "has_urls": true,
            "template": "topics/_category",
            "max_levels": 2,
            "locales": { "en": { "url_format": "topics/{slug}" } }
        }"#;
        let group: CategoryGroup = serde_json::from_str(json).unwrap();
        assert_eq!(group.max_levels, 2);
        assert!(group.is_new());
        assert_eq!(
            group.locales[&LocaleId::from("en")].url_format.as_deref(),
            Some("topics/{slug}")
        );
    }

    #[test]
    fn test_edit_permission_key() {
        assert_eq!(CategoryGroup::edit_permission(GroupId(3)), "editCategories:3");
    }
}
