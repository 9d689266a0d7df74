//! Category lifecycle hooks.
//!
//! Two kinds of listeners are supported:
//!
//! - [`BeforeSaveHook`]: runs inside the save transaction before anything is
//!   persisted and decides whether the save goes ahead
//! - [`CategoryObserver`]: receives informational [`CategoryEvent`]s and
//!   cannot influence the operation
//!
//! # Example
//!
//! ```ignore
//! use canopy_core::events::{BeforeSaveHook, CategoryHooks, HookResult};
//!
//! struct NoDrafts;
//!
//! impl BeforeSaveHook for NoDrafts {
//!     fn before_save(&self, category: &mut Category, _is_new: bool) -> HookResult {
//!         if category.title.starts_with("Draft") {
//!             HookResult::Cancel
//!         } else {
//!             HookResult::Proceed
//!         }
//!     }
//! }
//!
//! let hooks = CategoryHooks::new().with_before_save(Arc::new(NoDrafts));
//! ```

use crate::category::Category;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decision returned by a [`BeforeSaveHook`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookResult {
    /// Let the save continue with the (possibly modified) category
    Proceed,

    /// Stop the save. Later hooks are not run.
    Cancel,

    /// The hook failed but the save continues; the error is logged
    SoftError(String),
}

impl HookResult {
    pub fn soft_error(error: impl Into<String>) -> Self {
        Self::SoftError(error.into())
    }

    pub fn should_proceed(&self) -> bool {
        !matches!(self, Self::Cancel)
    }
}

/// Runs before a category is persisted
pub trait BeforeSaveHook: Send + Sync {
    fn before_save(&self, category: &mut Category, is_new: bool) -> HookResult;
}

/// Notification about a category lifecycle step
#[derive(Debug, Clone, Copy)]
pub enum CategoryEvent<'a> {
    /// The category was saved and the transaction committed
    AfterSave { category: &'a Category, is_new: bool },
    /// The category is about to be deleted as part of a cascade
    BeforeDelete { category: &'a Category },
    /// A caller-requested category was deleted; not sent for descendants
    AfterDelete { category: &'a Category },
}

impl<'a> CategoryEvent<'a> {
    pub fn category(&self) -> &'a Category {
        match self {
            Self::AfterSave { category, .. }
            | Self::BeforeDelete { category }
            | Self::AfterDelete { category } => category,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AfterSave { .. } => "after_save",
            Self::BeforeDelete { .. } => "before_delete",
            Self::AfterDelete { .. } => "after_delete",
        }
    }
}

pub trait CategoryObserver: Send + Sync {
    fn on_event(&self, event: &CategoryEvent<'_>);
}

/// Registered hooks and observers, run in registration order
#[derive(Clone, Default)]
pub struct CategoryHooks {
    before_save: Vec<Arc<dyn BeforeSaveHook>>,
    observers: Vec<Arc<dyn CategoryObserver>>,
}

impl CategoryHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_before_save(mut self, hook: Arc<dyn BeforeSaveHook>) -> Self {
        self.before_save.push(hook);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CategoryObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn add_before_save(&mut self, hook: Arc<dyn BeforeSaveHook>) {
        self.before_save.push(hook);
    }

    pub fn add_observer(&mut self, observer: Arc<dyn CategoryObserver>) {
        self.observers.push(observer);
    }

    /// Run the before-save hooks until one cancels
    pub fn run_before_save(&self, category: &mut Category, is_new: bool) -> bool {
        for hook in &self.before_save {
            match hook.before_save(category, is_new) {
                HookResult::Proceed => {}
                HookResult::Cancel => {
                    debug!(category_id = ?category.id, "Save cancelled by hook");
                    return false;
                }
                HookResult::SoftError(error) => {
                    warn!(category_id = ?category.id, %error, "Before-save hook failed");
                }
            }
        }
        true
    }

    pub fn emit(&self, event: CategoryEvent<'_>) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}

impl std::fmt::Debug for CategoryHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryHooks")
            .field("before_save", &self.before_save.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}
