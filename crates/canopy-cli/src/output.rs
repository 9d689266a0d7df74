//! Table and JSON rendering of command results

use anyhow::Result;
use canopy_core::{Category, CategoryGroup, GroupLocale, ValidationErrors};
use clap::ValueEnum;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON output for programmatic consumption
    Json,
}

impl OutputFormat {
    pub fn is_machine_readable(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Generic table renderer for any Tabled struct
pub fn render_table<T: Tabled>(rows: &[T]) -> String {
    Table::new(rows).with(Style::modern()).to_string()
}

/// Generic JSON renderer for any serializable type
pub fn render_json<T: Serialize>(data: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Render `rows` in the chosen format
pub fn render_rows<T: Tabled + Serialize>(rows: &[T], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(rows)),
        OutputFormat::Json => render_json(&rows),
    }
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

#[derive(Debug, Tabled, Serialize)]
pub struct GroupRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Handle")]
    pub handle: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "URLs")]
    pub has_urls: bool,
    #[tabled(rename = "Template")]
    pub template: String,
    #[tabled(rename = "Max levels")]
    pub max_levels: u32,
    #[tabled(rename = "Locales")]
    pub locales: String,
}

impl From<&CategoryGroup> for GroupRow {
    fn from(group: &CategoryGroup) -> Self {
        Self {
            id: group.id.map(|id| id.to_string()).unwrap_or_default(),
            handle: group.handle.clone(),
            name: group.name.clone(),
            has_urls: group.has_urls,
            template: or_dash(group.template.as_deref()),
            max_levels: group.max_levels,
            locales: group
                .locales
                .keys()
                .map(|l| l.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[derive(Debug, Tabled, Serialize)]
pub struct LocaleRow {
    #[tabled(rename = "Locale")]
    pub locale: String,
    #[tabled(rename = "URL format")]
    pub url_format: String,
    #[tabled(rename = "Nested URL format")]
    pub nested_url_format: String,
}

impl From<&GroupLocale> for LocaleRow {
    fn from(locale: &GroupLocale) -> Self {
        Self {
            locale: locale.locale.to_string(),
            url_format: or_dash(locale.url_format.as_deref()),
            nested_url_format: or_dash(locale.nested_url_format.as_deref()),
        }
    }
}

#[derive(Debug, Tabled, Serialize)]
pub struct CategoryRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Slug")]
    pub slug: String,
    #[tabled(rename = "URI")]
    pub uri: String,
    #[tabled(rename = "Level")]
    pub level: u32,
    #[tabled(rename = "Locale")]
    pub locale: String,
}

impl From<&Category> for CategoryRow {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.map(|id| id.to_string()).unwrap_or_default(),
            title: category.title.clone(),
            slug: category.slug.clone(),
            uri: or_dash(category.uri.as_deref()),
            level: category.level().unwrap_or(0),
            locale: category.locale.to_string(),
        }
    }
}

/// Field errors of a refused save, one `field: message` per line
pub fn render_errors(errors: &ValidationErrors) -> String {
    errors.to_string()
}
