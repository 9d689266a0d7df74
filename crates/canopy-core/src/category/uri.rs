//! Slug and URI rendering shared by the element-store backends

use super::Category;
use crate::group::CategoryGroup;
use crate::types::ElementId;

/// Lowercase slug: letters and digits are kept, every other run becomes `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Fill the `{slug}`, `{id}` and `{parent.uri}` tokens of a URL format.
pub fn render(format: &str, slug: &str, id: Option<ElementId>, parent_uri: Option<&str>) -> String {
    let id = id.map(|id| id.to_string()).unwrap_or_default();
    let rendered = format
        .replace("{parent.uri}", parent_uri.unwrap_or(""))
        .replace("{slug}", slug)
        .replace("{id}", &id);

    rendered
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// URI of `category` in its locale, given the parent it sits under.
///
/// `None` when the group has no URLs or the category's locale is not enabled
/// for the group.
pub fn category_uri(
    group: &CategoryGroup,
    category: &Category,
    parent: Option<&Category>,
) -> Option<String> {
    if !group.has_urls {
        return None;
    }

    let locale = group.locales.get(&category.locale)?;
    let format = locale.format_for(parent.is_some())?;
    Some(render(
        format,
        &category.slug,
        category.id,
        parent.and_then(|p| p.uri.as_deref()),
    ))
}

/// Fill in a missing slug from the title
pub fn ensure_slug(category: &mut Category) {
    let trimmed = category.slug.trim();
    category.slug = if trimmed.is_empty() {
        slugify(&category.title)
    } else {
        slugify(trimmed)
    };
}
