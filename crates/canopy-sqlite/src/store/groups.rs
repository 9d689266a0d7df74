//! CategoryRepository implementation for SQLite

use super::placeholders;
use crate::connection::SqlitePool;
use crate::error::{SqliteError, SqliteResult};
use canopy_core::group::{CategoryGroup, GroupLocale};
use canopy_core::storage::{CategoryRepository, StorageResult};
use canopy_core::types::{ElementId, FieldLayoutId, GroupId, LocaleId, StructureId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use tracing::debug;

const GROUP_COLUMNS: &str = "id, name, handle, has_urls, template, structure_id, field_layout_id";

/// SQLite implementation of CategoryRepository
#[derive(Clone)]
pub struct SqliteCategoryRepository {
    pool: SqlitePool,
}

impl SqliteCategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn group_where(&self, column: &str, value: Value) -> StorageResult<Option<CategoryGroup>> {
        self.pool
            .with_connection(|conn| {
                let group = conn
                    .query_row(
                        &format!("SELECT {} FROM category_groups WHERE {} = ?1", GROUP_COLUMNS, column),
                        [value],
                        row_to_group,
                    )
                    .optional()?;
                Ok(group)
            })
            .map_err(Into::into)
    }
}

impl CategoryRepository for SqliteCategoryRepository {
    fn all_group_ids(&self) -> StorageResult<Vec<GroupId>> {
        self.pool
            .with_connection(|conn| {
                let mut stmt = conn.prepare("SELECT id FROM category_groups ORDER BY name")?;
                let ids = stmt
                    .query_map([], |row| row.get(0).map(GroupId))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ids)
            })
            .map_err(Into::into)
    }

    fn all_groups(&self) -> StorageResult<Vec<CategoryGroup>> {
        self.pool
            .with_connection(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM category_groups ORDER BY name",
                    GROUP_COLUMNS
                ))?;
                let groups = stmt
                    .query_map([], row_to_group)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(groups)
            })
            .map_err(Into::into)
    }

    fn group_by_id(&self, id: GroupId) -> StorageResult<Option<CategoryGroup>> {
        self.group_where("id", Value::Integer(id.0))
    }

    fn group_by_handle(&self, handle: &str) -> StorageResult<Option<CategoryGroup>> {
        self.group_where("handle", Value::Text(handle.to_string()))
    }

    fn group_by_name(&self, name: &str) -> StorageResult<Option<CategoryGroup>> {
        self.group_where("name", Value::Text(name.to_string()))
    }

    fn insert_group(&self, group: &CategoryGroup) -> StorageResult<GroupId> {
        self.pool
            .with_connection(|conn| {
                conn.execute(
                    r#"
                    INSERT INTO category_groups (name, handle, has_urls, template, structure_id, field_layout_id)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    params![
                        group.name,
                        group.handle,
                        group.has_urls,
                        group.template,
                        group.structure_id.map(|id| id.0),
                        group.field_layout_id.map(|id| id.0),
                    ],
                )?;
                let id = GroupId(conn.last_insert_rowid());
                debug!(group_id = %id, handle = %group.handle, "Inserted category group row");
                Ok(id)
            })
            .map_err(Into::into)
    }

    fn update_group(&self, group: &CategoryGroup) -> StorageResult<()> {
        self.pool
            .with_connection(|conn| {
                let id = group
                    .id
                    .ok_or_else(|| SqliteError::InvalidOperation("group has no ID".to_string()))?;
                let updated = conn.execute(
                    r#"
                    UPDATE category_groups SET
                        name = ?2,
                        handle = ?3,
                        has_urls = ?4,
                        template = ?5,
                        structure_id = ?6,
                        field_layout_id = ?7
                    WHERE id = ?1
                    "#,
                    params![
                        id.0,
                        group.name,
                        group.handle,
                        group.has_urls,
                        group.template,
                        group.structure_id.map(|id| id.0),
                        group.field_layout_id.map(|id| id.0),
                    ],
                )?;
                if updated == 0 {
                    return Err(SqliteError::NotFound(format!("category group {}", id)));
                }
                Ok(())
            })
            .map_err(Into::into)
    }

    fn delete_group(&self, id: GroupId) -> StorageResult<bool> {
        self.pool
            .with_connection(|conn| {
                conn.execute("DELETE FROM category_group_locales WHERE group_id = ?1", [id.0])?;
                let deleted = conn.execute("DELETE FROM category_groups WHERE id = ?1", [id.0])?;
                Ok(deleted > 0)
            })
            .map_err(Into::into)
    }

    fn group_locales(&self, group_id: GroupId) -> StorageResult<BTreeMap<LocaleId, GroupLocale>> {
        self.pool
            .with_connection(|conn| group_locales(conn, group_id))
            .map_err(Into::into)
    }

    fn insert_group_locales(&self, group_id: GroupId, locales: &[GroupLocale]) -> StorageResult<()> {
        if locales.is_empty() {
            return Ok(());
        }
        self.pool
            .with_connection(|conn| {
                let rows = vec!["(?, ?, ?, ?)"; locales.len()].join(", ");
                let values = locales.iter().flat_map(|locale| {
                    [
                        Value::Integer(group_id.0),
                        Value::Text(locale.locale.to_string()),
                        optional_text(&locale.url_format),
                        optional_text(&locale.nested_url_format),
                    ]
                });
                conn.execute(
                    &format!(
                        "INSERT INTO category_group_locales (group_id, locale, url_format, nested_url_format) VALUES {}",
                        rows
                    ),
                    params_from_iter(values),
                )?;
                Ok(())
            })
            .map_err(Into::into)
    }

    fn update_group_locale(&self, group_id: GroupId, locale: &GroupLocale) -> StorageResult<()> {
        self.pool
            .with_connection(|conn| {
                let updated = conn.execute(
                    r#"
                    UPDATE category_group_locales SET url_format = ?3, nested_url_format = ?4
                    WHERE group_id = ?1 AND locale = ?2
                    "#,
                    params![
                        group_id.0,
                        locale.locale.as_str(),
                        locale.url_format,
                        locale.nested_url_format,
                    ],
                )?;
                if updated == 0 {
                    return Err(SqliteError::NotFound(format!(
                        "locale {} of category group {}",
                        locale.locale, group_id
                    )));
                }
                Ok(())
            })
            .map_err(Into::into)
    }

    fn delete_group_locales(&self, group_id: GroupId, locales: &[LocaleId]) -> StorageResult<()> {
        if locales.is_empty() {
            return Ok(());
        }
        self.pool
            .with_connection(|conn| {
                let values = std::iter::once(Value::Integer(group_id.0))
                    .chain(locales.iter().map(|l| Value::Text(l.to_string())));
                conn.execute(
                    &format!(
                        "DELETE FROM category_group_locales WHERE group_id = ? AND locale IN ({})",
                        placeholders(locales.len())
                    ),
                    params_from_iter(values),
                )?;
                Ok(())
            })
            .map_err(Into::into)
    }

    fn category_group_id(&self, id: ElementId) -> StorageResult<Option<GroupId>> {
        self.pool
            .with_connection(|conn| {
                let group_id = conn
                    .query_row("SELECT group_id FROM categories WHERE id = ?1", [id.0], |row| {
                        row.get(0).map(GroupId)
                    })
                    .optional()?;
                Ok(group_id)
            })
            .map_err(Into::into)
    }

    fn save_category_row(&self, id: ElementId, group_id: GroupId) -> StorageResult<()> {
        self.pool
            .with_connection(|conn| {
                conn.execute(
                    r#"
                    INSERT INTO categories (id, group_id) VALUES (?1, ?2)
                    ON CONFLICT(id) DO UPDATE SET group_id = excluded.group_id
                    "#,
                    params![id.0, group_id.0],
                )?;
                Ok(())
            })
            .map_err(Into::into)
    }

    fn category_ids_in_group(&self, group_id: GroupId) -> StorageResult<Vec<ElementId>> {
        self.pool
            .with_connection(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id FROM categories WHERE group_id = ?1 ORDER BY id")?;
                let ids = stmt
                    .query_map([group_id.0], |row| row.get(0).map(ElementId))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ids)
            })
            .map_err(Into::into)
    }
}

fn optional_text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::Text)
}

fn row_to_group(row: &Row<'_>) -> rusqlite::Result<CategoryGroup> {
    let mut group = CategoryGroup::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?);
    group.id = Some(GroupId(row.get(0)?));
    group.has_urls = row.get(3)?;
    group.template = row.get(4)?;
    group.structure_id = row.get::<_, Option<i64>>(5)?.map(StructureId);
    group.field_layout_id = row.get::<_, Option<i64>>(6)?.map(FieldLayoutId);
    Ok(group)
}

pub(crate) fn group_locales(
    conn: &Connection,
    group_id: GroupId,
) -> SqliteResult<BTreeMap<LocaleId, GroupLocale>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT locale, url_format, nested_url_format
        FROM category_group_locales
        WHERE group_id = ?1
        ORDER BY locale
        "#,
    )?;
    let locales = stmt
        .query_map([group_id.0], |row| {
            let mut locale = GroupLocale::new(row.get::<_, String>(0)?);
            locale.group_id = Some(group_id);
            locale.url_format = row.get(1)?;
            locale.nested_url_format = row.get(2)?;
            Ok((locale.locale.clone(), locale))
        })?
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(locales)
}

/// Group row with its locales, as needed to render URIs
pub(crate) fn load_group(conn: &Connection, id: GroupId) -> SqliteResult<Option<CategoryGroup>> {
    let group = conn
        .query_row(
            &format!("SELECT {} FROM category_groups WHERE id = ?1", GROUP_COLUMNS),
            [id.0],
            row_to_group,
        )
        .optional()?;

    match group {
        Some(mut group) => {
            group.locales = group_locales(conn, id)?;
            Ok(Some(group))
        }
        None => Ok(None),
    }
}
