//! ElementStore implementation for SQLite
//!
//! Elements keep one `element_locales` row per locale holding the title, slug
//! and rendered URI. URIs are rendered with [`canopy_core::category::uri`]
//! against the group's locale settings and the element's tree parent.

use super::groups::load_group;
use super::structures::{descendant_ids, parent_id, remove_nodes};
use super::{placeholders, timestamp};
use crate::connection::SqlitePool;
use crate::error::{SqliteError, SqliteResult};
use canopy_core::category::uri::{category_uri, ensure_slug};
use canopy_core::category::{Category, NewParent};
use canopy_core::storage::{ElementStore, StorageResult};
use canopy_core::tree::TreePosition;
use canopy_core::types::{ElementId, GroupId, LocaleId, StructureId};
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use tracing::debug;

/// SQLite implementation of ElementStore
#[derive(Clone)]
pub struct SqliteElementStore {
    pool: SqlitePool,
}

impl SqliteElementStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ElementStore for SqliteElementStore {
    fn save_element(&self, category: &mut Category) -> StorageResult<bool> {
        self.pool
            .with_connection(|conn| save_element(conn, category))
            .map_err(Into::into)
    }

    fn delete_by_ids(&self, ids: &[ElementId]) -> StorageResult<bool> {
        if ids.is_empty() {
            return Ok(false);
        }
        self.pool
            .with_connection(|conn| {
                remove_nodes(conn, ids)?;

                let marks = placeholders(ids.len());
                let values = || params_from_iter(ids.iter().map(|id| id.0));
                conn.execute(
                    &format!("DELETE FROM element_locales WHERE element_id IN ({})", marks),
                    values(),
                )?;
                conn.execute(&format!("DELETE FROM categories WHERE id IN ({})", marks), values())?;
                let deleted =
                    conn.execute(&format!("DELETE FROM elements WHERE id IN ({})", marks), values())?;

                debug!(requested = ids.len(), deleted, "Deleted elements");
                Ok(deleted > 0)
            })
            .map_err(Into::into)
    }

    fn get_by_id(&self, id: ElementId, locale: Option<&LocaleId>) -> StorageResult<Option<Category>> {
        self.pool
            .with_connection(|conn| load_category(conn, id, locale))
            .map_err(Into::into)
    }

    fn find_by_ids(&self, ids: &[ElementId], locale: Option<&LocaleId>) -> StorageResult<Vec<Category>> {
        self.pool
            .with_connection(|conn| {
                let mut seen = HashSet::new();
                let mut categories = Vec::with_capacity(ids.len());
                for id in ids.iter().filter(|id| seen.insert(**id)) {
                    if let Some(category) = load_category(conn, *id, locale)? {
                        categories.push(category);
                    }
                }
                categories.sort_by_key(|c| (c.structure_id, c.position.map(|p| p.lft)));
                Ok(categories)
            })
            .map_err(Into::into)
    }

    fn find_descendants(&self, category: &Category) -> StorageResult<Vec<Category>> {
        let Some(id) = category.id else {
            return Ok(Vec::new());
        };
        self.pool
            .with_connection(|conn| {
                let mut descendants = Vec::new();
                for descendant in descendant_ids(conn, id)?.into_iter().rev() {
                    let found = match load_category(conn, descendant, Some(&category.locale))? {
                        Some(found) => Some(found),
                        None => load_category(conn, descendant, None)?,
                    };
                    descendants.extend(found);
                }
                Ok(descendants)
            })
            .map_err(Into::into)
    }

    fn update_slug_and_uri(
        &self,
        category: &mut Category,
        update_others: bool,
        update_descendants: bool,
    ) -> StorageResult<()> {
        self.pool
            .with_connection(|conn| {
                let id = category
                    .id
                    .ok_or_else(|| SqliteError::InvalidOperation("category has no ID".to_string()))?;

                if update_others {
                    refresh_all_locales(conn, id)?;
                } else {
                    refresh_uri(conn, id, &category.locale)?;
                }
                if update_descendants {
                    for descendant in descendant_ids(conn, id)? {
                        refresh_all_locales(conn, descendant)?;
                    }
                }

                category.uri = load_category(conn, id, Some(&category.locale))?.and_then(|c| c.uri);
                Ok(())
            })
            .map_err(Into::into)
    }

    fn update_descendant_slugs_and_uris(&self, category: &Category) -> StorageResult<()> {
        let Some(id) = category.id else {
            return Ok(());
        };
        self.pool
            .with_connection(|conn| {
                let descendants = descendant_ids(conn, id)?;
                for descendant in &descendants {
                    refresh_all_locales(conn, *descendant)?;
                }
                debug!(element_id = %id, count = descendants.len(), "Refreshed descendant URIs");
                Ok(())
            })
            .map_err(Into::into)
    }

    fn delete_locale_content(&self, ids: &[ElementId], locales: &[LocaleId]) -> StorageResult<()> {
        if ids.is_empty() || locales.is_empty() {
            return Ok(());
        }
        self.pool
            .with_connection(|conn| {
                let values = ids
                    .iter()
                    .map(|id| Value::Integer(id.0))
                    .chain(locales.iter().map(|l| Value::Text(l.to_string())));
                conn.execute(
                    &format!(
                        "DELETE FROM element_locales WHERE element_id IN ({}) AND locale IN ({})",
                        placeholders(ids.len()),
                        placeholders(locales.len())
                    ),
                    params_from_iter(values),
                )?;
                Ok(())
            })
            .map_err(Into::into)
    }

    fn clear_uris(&self, ids: &[ElementId]) -> StorageResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.pool
            .with_connection(|conn| {
                conn.execute(
                    &format!(
                        "UPDATE element_locales SET uri = NULL WHERE element_id IN ({})",
                        placeholders(ids.len())
                    ),
                    params_from_iter(ids.iter().map(|id| id.0)),
                )?;
                Ok(())
            })
            .map_err(Into::into)
    }
}

fn save_element(conn: &Connection, category: &mut Category) -> SqliteResult<bool> {
    ensure_slug(category);
    let now = Utc::now();

    let (id, inserted) = match category.id {
        Some(id) => {
            let exists = conn
                .query_row("SELECT 1 FROM elements WHERE id = ?1", [id.0], |_| Ok(()))
                .optional()?
                .is_some();
            if !exists {
                return Err(SqliteError::NotFound(format!("element {}", id)));
            }
            (id, false)
        }
        None => {
            conn.execute(
                "INSERT INTO elements (type, date_created, date_updated) VALUES ('category', ?1, ?1)",
                [now.to_rfc3339()],
            )?;
            (ElementId(conn.last_insert_rowid()), true)
        }
    };

    let parent = match (&category.pending_parent, category.new_parent) {
        (Some(parent), _) => Some(parent.as_ref().clone()),
        (None, NewParent::Root) => None,
        (None, _) => tree_parent(conn, id, &category.locale)?,
    };

    let previous_id = category.id.replace(id);
    let uri = match load_group(conn, category.group_id)? {
        Some(group) => category_uri(&group, category, parent.as_ref()),
        None => None,
    };

    if let Some(uri) = &uri {
        if uri_taken(conn, uri, &category.locale, id)? {
            if inserted {
                conn.execute("DELETE FROM elements WHERE id = ?1", [id.0])?;
            }
            category.id = previous_id;
            category
                .errors_mut()
                .add("uri", format!("URI “{}” has already been taken.", uri));
            return Ok(false);
        }
    }

    conn.execute(
        r#"
        INSERT INTO element_locales (element_id, locale, title, slug, uri, enabled)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(element_id, locale) DO UPDATE SET
            title = excluded.title,
            slug = excluded.slug,
            uri = excluded.uri,
            enabled = excluded.enabled
        "#,
        params![
            id.0,
            category.locale.as_str(),
            category.title,
            category.slug,
            uri,
            category.enabled,
        ],
    )?;
    conn.execute(
        "UPDATE elements SET date_updated = ?2 WHERE id = ?1",
        params![id.0, now.to_rfc3339()],
    )?;
    let created = conn.query_row(
        "SELECT date_created FROM elements WHERE id = ?1",
        [id.0],
        |row| timestamp(row, 0),
    )?;

    debug!(element_id = %id, locale = %category.locale, uri = ?uri, "Saved element");
    category.uri = uri;
    category.date_created = Some(created);
    category.date_updated = Some(now);
    Ok(true)
}

fn uri_taken(conn: &Connection, uri: &str, locale: &LocaleId, except: ElementId) -> SqliteResult<bool> {
    let taken = conn
        .query_row(
            "SELECT 1 FROM element_locales WHERE locale = ?1 AND uri = ?2 AND element_id != ?3 LIMIT 1",
            params![locale.as_str(), uri, except.0],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    Ok(taken)
}

const CATEGORY_QUERY: &str = r#"
    SELECT e.id, c.group_id, l.locale, l.title, l.slug, l.uri, l.enabled,
           se.structure_id, se.lft, se.rgt, se.level, e.date_created, e.date_updated
    FROM elements e
    JOIN categories c ON c.id = e.id
    JOIN element_locales l ON l.element_id = e.id
    LEFT JOIN structure_elements se ON se.element_id = e.id
    WHERE e.id = ?1 AND (?2 IS NULL OR l.locale = ?2)
    ORDER BY l.locale
    LIMIT 1
"#;

/// Category in `locale`, or in its first locale when `None`
pub(crate) fn load_category(
    conn: &Connection,
    id: ElementId,
    locale: Option<&LocaleId>,
) -> SqliteResult<Option<Category>> {
    let category = conn
        .query_row(
            CATEGORY_QUERY,
            params![id.0, locale.map(|l| l.as_str())],
            row_to_category,
        )
        .optional()?;
    Ok(category)
}

fn row_to_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    let mut category = Category::new(
        GroupId(row.get(1)?),
        LocaleId::new(row.get::<_, String>(2)?),
        row.get::<_, String>(3)?,
    );
    category.id = Some(ElementId(row.get(0)?));
    category.slug = row.get(4)?;
    category.uri = row.get(5)?;
    category.enabled = row.get(6)?;
    category.structure_id = row.get::<_, Option<i64>>(7)?.map(StructureId);

    let lft: Option<i64> = row.get(8)?;
    let rgt: Option<i64> = row.get(9)?;
    let level: Option<u32> = row.get(10)?;
    category.position = match (lft, rgt, level) {
        (Some(lft), Some(rgt), Some(level)) => Some(TreePosition::new(lft, rgt, level)),
        _ => None,
    };

    category.date_created = Some(timestamp(row, 11)?);
    category.date_updated = Some(timestamp(row, 12)?);
    Ok(category)
}

fn tree_parent(conn: &Connection, id: ElementId, locale: &LocaleId) -> SqliteResult<Option<Category>> {
    match parent_id(conn, id)? {
        Some(parent) => load_category(conn, parent, Some(locale)),
        None => Ok(None),
    }
}

/// Re-render the stored URI of one element in one locale
fn refresh_uri(conn: &Connection, id: ElementId, locale: &LocaleId) -> SqliteResult<()> {
    let Some(category) = load_category(conn, id, Some(locale))? else {
        return Ok(());
    };
    let Some(group) = load_group(conn, category.group_id)? else {
        return Ok(());
    };
    let parent = tree_parent(conn, id, locale)?;
    let uri = category_uri(&group, &category, parent.as_ref());

    conn.execute(
        "UPDATE element_locales SET uri = ?3 WHERE element_id = ?1 AND locale = ?2",
        params![id.0, locale.as_str(), uri],
    )?;
    Ok(())
}

fn refresh_all_locales(conn: &Connection, id: ElementId) -> SqliteResult<()> {
    let mut stmt = conn.prepare("SELECT locale FROM element_locales WHERE element_id = ?1 ORDER BY locale")?;
    let locales = stmt
        .query_map([id.0], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    for locale in locales {
        refresh_uri(conn, id, &LocaleId::new(locale))?;
    }
    Ok(())
}
