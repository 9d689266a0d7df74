//! SQLite storage backend for canopy
//!
//! This crate implements canopy-core's collaborator traits on top of SQLite.
//!
//! ## Features
//!
//! - **Category repository**: `category_groups`, `category_group_locales` and
//!   `categories` rows
//! - **Element store**: per-locale titles, slugs and URIs in `element_locales`
//! - **Tree store**: nested-set rows in `structure_elements`
//! - **One transaction boundary**: every store shares the pool's connection,
//!   so `BEGIN IMMEDIATE` / `COMMIT` / `ROLLBACK` cover them all
//!
//! ## Usage
//!
//! ```rust,ignore
//! use canopy_core::CategoryService;
//! use canopy_sqlite::{create_backends, SqliteConfig, SqlitePool};
//!
//! let pool = SqlitePool::new(SqliteConfig::new("./canopy.db"))?;
//! let service = CategoryService::new(create_backends(pool, permissions, templates));
//!
//! let topics = service.groups().group_by_handle("topics")?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod schema;
pub mod store;

pub use config::SqliteConfig;
pub use connection::{SqlitePool, SqliteTransactions};
pub use error::{SqliteError, SqliteResult};
pub use store::{
    SqliteCategoryRepository, SqliteElementStore, SqliteFieldLayoutStore, SqliteTreeStore,
};

use canopy_core::storage::{Backends, PermissionChecker, TemplateResolver};
use std::sync::Arc;

/// Every persistence collaborator over one pool, plus the caller's
/// permission checker and template resolver
pub fn create_backends(
    pool: SqlitePool,
    permissions: Arc<dyn PermissionChecker>,
    templates: Arc<dyn TemplateResolver>,
) -> Backends {
    Backends {
        repository: Arc::new(SqliteCategoryRepository::new(pool.clone())),
        elements: Arc::new(SqliteElementStore::new(pool.clone())),
        trees: Arc::new(SqliteTreeStore::new(pool.clone())),
        field_layouts: Arc::new(SqliteFieldLayoutStore::new(pool.clone())),
        permissions,
        templates,
        transactions: Arc::new(SqliteTransactions::new(pool)),
    }
}
