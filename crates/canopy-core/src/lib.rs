//! Category groups and nested category trees
//!
//! - [`GroupStore`]: validated, transactional saves and cascading deletes of
//!   category groups, with an explicit [`GroupCache`]
//! - [`CategoryLifecycle`]: category saves (including re-parenting) and
//!   cascading deletes with before/after hooks
//! - [`tree`]: the nested-set [`Tree`] value type and gap filling
//! - [`storage`]: the collaborator traits backends implement
//!
//! Everything is synchronous. Backends live in other crates; the in-memory
//! [`test_support::MemoryBackend`] is available to tests and, with the
//! `test-utils` feature, to other crates.

pub mod category;
pub mod error;
pub mod events;
pub mod fields;
pub mod group;
pub mod service;
pub mod storage;
pub mod tree;
pub mod types;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use category::{CancelPolicy, Category, CategoryLifecycle, LifecycleOptions, NewParent};
pub use error::{CategoryError, CategoryResult};
pub use events::{BeforeSaveHook, CategoryEvent, CategoryHooks, CategoryObserver, HookResult};
pub use fields::{FieldLayout, LayoutField};
pub use group::{CategoryGroup, GroupCache, GroupLocale, GroupStore};
pub use service::CategoryService;
pub use storage::{Backends, Boundary, StorageError, StorageResult};
pub use tree::{Structure, Tree, TreeError, TreePosition};
pub use types::{ElementId, FieldLayoutId, GroupId, LocaleId, SaveOutcome, StructureId, UserId};
pub use validation::ValidationErrors;
