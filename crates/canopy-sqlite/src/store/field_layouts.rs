//! FieldLayoutStore implementation for SQLite

use crate::connection::SqlitePool;
use canopy_core::fields::{FieldLayout, LayoutField};
use canopy_core::storage::{FieldLayoutStore, StorageResult};
use canopy_core::types::FieldLayoutId;
use rusqlite::{params, OptionalExtension};

/// SQLite implementation of FieldLayoutStore
#[derive(Clone)]
pub struct SqliteFieldLayoutStore {
    pool: SqlitePool,
}

impl SqliteFieldLayoutStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl FieldLayoutStore for SqliteFieldLayoutStore {
    fn get_layout(&self, id: FieldLayoutId) -> StorageResult<Option<FieldLayout>> {
        self.pool
            .with_connection(|conn| {
                let exists = conn
                    .query_row("SELECT 1 FROM field_layouts WHERE id = ?1", [id.0], |_| Ok(()))
                    .optional()?
                    .is_some();
                if !exists {
                    return Ok(None);
                }

                let mut stmt = conn.prepare(
                    "SELECT handle, required, sort_order FROM field_layout_fields WHERE layout_id = ?1 ORDER BY sort_order",
                )?;
                let fields = stmt
                    .query_map([id.0], |row| {
                        Ok(LayoutField {
                            handle: row.get(0)?,
                            required: row.get(1)?,
                            sort_order: row.get(2)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Some(FieldLayout {
                    id: Some(id),
                    fields,
                }))
            })
            .map_err(Into::into)
    }

    fn save_layout(&self, layout: &mut FieldLayout) -> StorageResult<()> {
        self.pool
            .with_connection(|conn| {
                conn.execute("INSERT INTO field_layouts (type) VALUES ('category')", [])?;
                let id = FieldLayoutId(conn.last_insert_rowid());

                let mut stmt = conn.prepare(
                    "INSERT INTO field_layout_fields (layout_id, handle, required, sort_order) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for field in &layout.fields {
                    stmt.execute(params![id.0, field.handle, field.required, field.sort_order])?;
                }

                layout.id = Some(id);
                Ok(())
            })
            .map_err(Into::into)
    }

    fn delete_layout_by_id(&self, id: FieldLayoutId) -> StorageResult<bool> {
        self.pool
            .with_connection(|conn| {
                conn.execute("DELETE FROM field_layout_fields WHERE layout_id = ?1", [id.0])?;
                let deleted = conn.execute("DELETE FROM field_layouts WHERE id = ?1", [id.0])?;
                Ok(deleted > 0)
            })
            .map_err(Into::into)
    }
}
