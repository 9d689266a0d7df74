//! Opens the database and wires the category service for one command run

use crate::config::CliConfig;
use crate::permissions::ConfigPermissions;
use crate::templates::FsTemplateResolver;
use anyhow::{Context, Result};
use canopy_core::{Backends, CategoryGroup, CategoryHooks, CategoryService};
use canopy_sqlite::{create_backends, SqlitePool};
use std::sync::Arc;
use tracing::debug;

pub struct App {
    pub pool: SqlitePool,
    pub backends: Backends,
    pub service: CategoryService,
}

impl App {
    pub fn open(config: &CliConfig) -> Result<Self> {
        debug!(path = %config.database.path.display(), "Opening database");
        let pool = SqlitePool::new(config.database.clone()).with_context(|| {
            format!("Failed to open database: {}", config.database.path.display())
        })?;

        let permissions = Arc::new(ConfigPermissions::from_config(&config.permissions));
        let templates = Arc::new(FsTemplateResolver::new(&config.site.templates_path));
        let backends = create_backends(pool.clone(), permissions, templates);
        let service =
            CategoryService::with_options(backends.clone(), CategoryHooks::new(), config.categories);

        Ok(Self {
            pool,
            backends,
            service,
        })
    }

    /// Group by handle, or an error naming the handle
    pub fn require_group(&self, handle: &str) -> Result<CategoryGroup> {
        self.service
            .groups()
            .group_by_handle(handle)?
            .with_context(|| format!("No category group with handle '{}'", handle))
    }
}
