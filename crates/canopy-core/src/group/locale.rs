//! Per-locale URL settings of a category group

use crate::types::{GroupId, LocaleId};
use crate::validation::ValidationErrors;
use serde::{Deserialize, Serialize};

/// URL formats for one enabled locale of a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLocale {
    /// Filled from the map key when supplied through [`CategoryGroup::locales`](super::CategoryGroup::locales)
    #[serde(default)]
    pub locale: LocaleId,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    /// Format for top-level categories
    #[serde(default)]
    pub url_format: Option<String>,
    /// Format for nested categories
    #[serde(default)]
    pub nested_url_format: Option<String>,
}

impl GroupLocale {
    pub fn new(locale: impl Into<LocaleId>) -> Self {
        Self {
            locale: locale.into(),
            ..Self::default()
        }
    }

    pub fn with_url_format(mut self, format: impl Into<String>) -> Self {
        self.url_format = Some(format.into());
        self
    }

    pub fn with_nested_url_format(mut self, format: impl Into<String>) -> Self {
        self.nested_url_format = Some(format.into());
        self
    }

    /// Normalize the URL formats for the group's settings and record what is missing.
    ///
    /// With URLs, `url_format` is required and `nested_url_format` is required
    /// unless the tree is limited to one level, in which case it is dropped.
    /// Without URLs both formats are cleared.
    pub fn apply_url_rules(&mut self, has_urls: bool, max_levels: u32, errors: &mut ValidationErrors) {
        self.url_format = non_blank(self.url_format.take());
        self.nested_url_format = non_blank(self.nested_url_format.take());

        if !has_urls {
            self.url_format = None;
            self.nested_url_format = None;
            return;
        }

        check_format(
            "urlFormat",
            "URL Format",
            self.url_format.as_deref(),
            &self.locale,
            errors,
        );

        if max_levels == 1 {
            self.nested_url_format = None;
        } else {
            check_format(
                "nestedUrlFormat",
                "Nested URL Format",
                self.nested_url_format.as_deref(),
                &self.locale,
                errors,
            );
        }
    }

    /// Whether either URL format differs from `stored`
    pub fn formats_differ(&self, stored: &GroupLocale) -> bool {
        self.url_format != stored.url_format || self.nested_url_format != stored.nested_url_format
    }

    /// Format to render for a top-level or nested category
    pub fn format_for(&self, nested: bool) -> Option<&str> {
        if nested {
            self.nested_url_format
                .as_deref()
                .or(self.url_format.as_deref())
        } else {
            self.url_format.as_deref()
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_format(
    field: &str,
    label: &str,
    format: Option<&str>,
    locale: &LocaleId,
    errors: &mut ValidationErrors,
) {
    match format {
        None => errors.add_for_locale(field, locale, format!("{} cannot be blank.", label)),
        Some(format) if !format.contains("{slug}") => errors.add_for_locale(
            field,
            locale,
            format!("{} must contain “{{slug}}”.", label),
        ),
        Some(_) => {}
    }
}
