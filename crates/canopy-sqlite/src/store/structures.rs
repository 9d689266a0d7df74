//! TreeStore implementation for SQLite
//!
//! Nodes are stored as nested-set rows in `structure_elements`. Mutations load
//! the structure into a [`Tree`], apply the pure operation and write the
//! structure back.

use super::placeholders;
use crate::connection::SqlitePool;
use crate::error::{SqliteError, SqliteResult};
use canopy_core::category::Category;
use canopy_core::storage::{StorageResult, TreeStore};
use canopy_core::tree::{Structure, Tree, TreeNode, TreePosition};
use canopy_core::types::{ElementId, StructureId};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;

/// SQLite implementation of TreeStore
#[derive(Clone)]
pub struct SqliteTreeStore {
    pool: SqlitePool,
}

impl SqliteTreeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TreeStore for SqliteTreeStore {
    fn get_structure(&self, id: StructureId) -> StorageResult<Option<Structure>> {
        self.pool
            .with_connection(|conn| get_structure(conn, id))
            .map_err(Into::into)
    }

    fn save_structure(&self, structure: &mut Structure) -> StorageResult<()> {
        self.pool
            .with_connection(|conn| {
                match structure.id {
                    Some(id) => {
                        conn.execute(
                            r#"
                            INSERT INTO structures (id, max_levels) VALUES (?1, ?2)
                            ON CONFLICT(id) DO UPDATE SET max_levels = excluded.max_levels
                            "#,
                            params![id.0, structure.max_levels],
                        )?;
                    }
                    None => {
                        conn.execute(
                            "INSERT INTO structures (max_levels) VALUES (?1)",
                            [structure.max_levels],
                        )?;
                        structure.id = Some(StructureId(conn.last_insert_rowid()));
                    }
                }
                Ok(())
            })
            .map_err(Into::into)
    }

    fn delete_structure(&self, id: StructureId) -> StorageResult<bool> {
        self.pool
            .with_connection(|conn| {
                conn.execute("DELETE FROM structure_elements WHERE structure_id = ?1", [id.0])?;
                let deleted = conn.execute("DELETE FROM structures WHERE id = ?1", [id.0])?;
                Ok(deleted > 0)
            })
            .map_err(Into::into)
    }

    fn load_tree(&self, id: StructureId) -> StorageResult<Tree> {
        self.pool
            .with_connection(|conn| load_tree(conn, id))
            .map_err(Into::into)
    }

    fn append_to_root(&self, structure_id: StructureId, category: &mut Category) -> StorageResult<()> {
        self.pool
            .with_connection(|conn| {
                let id = require_id(category)?;
                let mut tree = load_tree(conn, structure_id)?;
                let position = tree.append_to_root(id)?;
                write_tree(conn, structure_id, &tree)?;

                debug!(element_id = %id, structure_id = %structure_id, "Appended to root");
                category.structure_id = Some(structure_id);
                category.position = Some(position);
                Ok(())
            })
            .map_err(Into::into)
    }

    fn append_under(
        &self,
        structure_id: StructureId,
        category: &mut Category,
        parent: &Category,
    ) -> StorageResult<()> {
        self.pool
            .with_connection(|conn| {
                let id = require_id(category)?;
                let parent_id = require_id(parent)?;
                let mut tree = load_tree(conn, structure_id)?;
                let position = tree.append_under(id, parent_id)?;
                write_tree(conn, structure_id, &tree)?;

                debug!(element_id = %id, parent_id = %parent_id, "Appended under parent");
                category.structure_id = Some(structure_id);
                category.position = Some(position);
                Ok(())
            })
            .map_err(Into::into)
    }
}

fn require_id(category: &Category) -> SqliteResult<ElementId> {
    category
        .id
        .ok_or_else(|| SqliteError::InvalidOperation("category has no ID".to_string()))
}

pub(crate) fn get_structure(conn: &Connection, id: StructureId) -> SqliteResult<Option<Structure>> {
    let structure = conn
        .query_row(
            "SELECT id, max_levels FROM structures WHERE id = ?1",
            [id.0],
            |row| {
                Ok(Structure {
                    id: Some(StructureId(row.get(0)?)),
                    max_levels: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(structure)
}

pub(crate) fn load_tree(conn: &Connection, id: StructureId) -> SqliteResult<Tree> {
    let structure = get_structure(conn, id)?
        .ok_or_else(|| SqliteError::NotFound(format!("structure {}", id)))?;

    let mut stmt = conn.prepare(
        "SELECT element_id, lft, rgt, level FROM structure_elements WHERE structure_id = ?1 ORDER BY lft",
    )?;
    let nodes = stmt
        .query_map([id.0], |row| {
            Ok(TreeNode::new(
                ElementId(row.get(0)?),
                TreePosition::new(row.get(1)?, row.get(2)?, row.get(3)?),
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Tree::from_nodes(structure.max_levels, nodes))
}

/// Replace the stored nodes of a structure with `tree`
pub(crate) fn write_tree(conn: &Connection, id: StructureId, tree: &Tree) -> SqliteResult<()> {
    conn.execute("DELETE FROM structure_elements WHERE structure_id = ?1", [id.0])?;

    let mut stmt = conn.prepare(
        "INSERT INTO structure_elements (structure_id, element_id, lft, rgt, level) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for node in tree.nodes() {
        stmt.execute(params![
            id.0,
            node.element_id.0,
            node.position.lft,
            node.position.rgt,
            node.position.level,
        ])?;
    }
    Ok(())
}

/// Structure an element sits in
pub(crate) fn structure_of(conn: &Connection, id: ElementId) -> SqliteResult<Option<StructureId>> {
    let structure_id = conn
        .query_row(
            "SELECT structure_id FROM structure_elements WHERE element_id = ?1",
            [id.0],
            |row| row.get(0),
        )
        .optional()?;
    Ok(structure_id.map(StructureId))
}

pub(crate) fn parent_id(conn: &Connection, id: ElementId) -> SqliteResult<Option<ElementId>> {
    let parent = conn
        .query_row(
            r#"
            SELECT p.element_id
            FROM structure_elements c
            JOIN structure_elements p
              ON p.structure_id = c.structure_id AND p.lft < c.lft AND p.rgt > c.rgt
            WHERE c.element_id = ?1
            ORDER BY p.lft DESC
            LIMIT 1
            "#,
            [id.0],
            |row| row.get(0),
        )
        .optional()?;
    Ok(parent.map(ElementId))
}

/// Descendants in ascending tree position
pub(crate) fn descendant_ids(conn: &Connection, id: ElementId) -> SqliteResult<Vec<ElementId>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT d.element_id
        FROM structure_elements c
        JOIN structure_elements d
          ON d.structure_id = c.structure_id AND d.lft > c.lft AND d.rgt < c.rgt
        WHERE c.element_id = ?1
        ORDER BY d.lft
        "#,
    )?;
    let ids = stmt
        .query_map([id.0], |row| row.get(0).map(ElementId))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Remove nodes in the order given, closing gaps, and store the affected
/// structures once each. Nodes already removed with an ancestor are skipped.
pub(crate) fn remove_nodes(conn: &Connection, ids: &[ElementId]) -> SqliteResult<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT structure_id FROM structure_elements WHERE element_id IN ({})",
        placeholders(ids.len())
    ))?;
    let structures = stmt
        .query_map(params_from_iter(ids.iter().map(|id| id.0)), |row| {
            row.get(0).map(StructureId)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for structure_id in structures {
        let mut tree = load_tree(conn, structure_id)?;
        for id in ids {
            if tree.contains(*id) {
                tree.remove(*id)?;
            }
        }
        write_tree(conn, structure_id, &tree)?;
    }
    Ok(())
}
