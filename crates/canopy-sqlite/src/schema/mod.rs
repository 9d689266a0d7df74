//! Schema management and migrations

use crate::error::{SqliteError, SqliteResult};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

/// Schema version - increment when making schema changes
pub const SCHEMA_VERSION: i32 = 1;

/// Apply all pending migrations
pub fn apply_migrations(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version = current_version(conn)?;
    debug!(current_version, target_version = SCHEMA_VERSION, "Checking migrations");

    if current_version < 1 {
        info!(from = current_version, to = SCHEMA_VERSION, "Applying schema migrations");
        apply_migration_v1(conn)?;
    }

    Ok(())
}

/// Highest applied migration, 0 for a fresh database
pub fn current_version(conn: &Connection) -> SqliteResult<i32> {
    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten();

    Ok(version.unwrap_or(0))
}

fn record_migration(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: elements, structures, field layouts and category groups
fn apply_migration_v1(conn: &Connection) -> SqliteResult<()> {
    debug!("Applying migration v1: category schema");

    conn.execute_batch(SCHEMA_V1)
        .map_err(|e| SqliteError::Schema(format!("Failed to apply v1 schema: {}", e)))?;

    record_migration(conn, 1)?;
    info!("Migration v1 applied successfully");
    Ok(())
}

const SCHEMA_V1: &str = r#"
-- ============================================================================
-- Elements
-- ============================================================================
-- Shared element IDs; per-locale title, slug and URI live in element_locales

CREATE TABLE IF NOT EXISTS elements (
    id INTEGER PRIMARY KEY,
    type TEXT NOT NULL DEFAULT 'category',
    date_created TEXT NOT NULL,
    date_updated TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS element_locales (
    element_id INTEGER NOT NULL REFERENCES elements(id) ON DELETE CASCADE,
    locale TEXT NOT NULL,
    title TEXT NOT NULL,
    slug TEXT NOT NULL,
    uri TEXT,
    enabled INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (element_id, locale)
);

CREATE INDEX IF NOT EXISTS idx_element_locales_uri ON element_locales(locale, uri);

-- ============================================================================
-- Structures
-- ============================================================================
-- Nested sets; an element sits in at most one structure

CREATE TABLE IF NOT EXISTS structures (
    id INTEGER PRIMARY KEY,
    max_levels INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS structure_elements (
    structure_id INTEGER NOT NULL REFERENCES structures(id) ON DELETE CASCADE,
    element_id INTEGER NOT NULL UNIQUE REFERENCES elements(id) ON DELETE CASCADE,
    lft INTEGER NOT NULL,
    rgt INTEGER NOT NULL,
    level INTEGER NOT NULL,
    PRIMARY KEY (structure_id, element_id)
);

CREATE INDEX IF NOT EXISTS idx_structure_elements_lft ON structure_elements(structure_id, lft);

-- ============================================================================
-- Field layouts
-- ============================================================================

CREATE TABLE IF NOT EXISTS field_layouts (
    id INTEGER PRIMARY KEY,
    type TEXT NOT NULL DEFAULT 'category'
);

CREATE TABLE IF NOT EXISTS field_layout_fields (
    layout_id INTEGER NOT NULL REFERENCES field_layouts(id) ON DELETE CASCADE,
    handle TEXT NOT NULL,
    required INTEGER NOT NULL DEFAULT 0,
    sort_order INTEGER NOT NULL,
    PRIMARY KEY (layout_id, handle)
);

-- ============================================================================
-- Category groups
-- ============================================================================

CREATE TABLE IF NOT EXISTS category_groups (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    handle TEXT NOT NULL UNIQUE,
    has_urls INTEGER NOT NULL DEFAULT 1,
    template TEXT,
    structure_id INTEGER REFERENCES structures(id) ON DELETE SET NULL,
    field_layout_id INTEGER REFERENCES field_layouts(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS category_group_locales (
    id INTEGER PRIMARY KEY,
    group_id INTEGER NOT NULL REFERENCES category_groups(id) ON DELETE CASCADE,
    locale TEXT NOT NULL,
    url_format TEXT,
    nested_url_format TEXT,
    UNIQUE (group_id, locale)
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY REFERENCES elements(id) ON DELETE CASCADE,
    group_id INTEGER NOT NULL REFERENCES category_groups(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_categories_group ON categories(group_id);
"#;
