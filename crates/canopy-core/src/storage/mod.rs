//! Persistence collaborators
//!
//! - [`traits`]: the contracts every backend implements
//! - [`transaction`]: explicit transaction boundaries
//! - [`error`]: the shared storage error type

pub mod error;
pub mod traits;
pub mod transaction;

pub use error::{StorageError, StorageResult};
pub use traits::{
    Backends, CategoryRepository, ElementStore, FieldLayoutStore, PermissionChecker,
    TemplateResolver, TransactionManager, TreeStore,
};
pub use transaction::{Boundary, TxScope};
