//! Wiring of the group store and the category lifecycle over one set of
//! collaborators

use crate::category::{CategoryLifecycle, LifecycleOptions};
use crate::events::CategoryHooks;
use crate::group::GroupStore;
use crate::storage::Backends;
use std::sync::Arc;

pub struct CategoryService {
    groups: Arc<GroupStore>,
    categories: CategoryLifecycle,
}

impl CategoryService {
    pub fn new(backends: Backends) -> Self {
        Self::with_options(backends, CategoryHooks::new(), LifecycleOptions::default())
    }

    pub fn with_options(backends: Backends, hooks: CategoryHooks, options: LifecycleOptions) -> Self {
        let groups = Arc::new(GroupStore::new(backends.clone()));
        let categories = CategoryLifecycle::new(backends, groups.clone())
            .with_hooks(hooks)
            .with_options(options);
        Self { groups, categories }
    }

    pub fn groups(&self) -> &GroupStore {
        &self.groups
    }

    pub fn categories(&self) -> &CategoryLifecycle {
        &self.categories
    }
}
