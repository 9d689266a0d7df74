//! Service-level error types

use crate::storage::StorageError;
use crate::tree::TreeError;
use crate::types::{ElementId, GroupId};
use thiserror::Error;

/// Errors raised by the group and category services.
///
/// Validation problems are not errors; they are collected on the model and
/// reported through [`SaveOutcome::Invalid`](crate::SaveOutcome::Invalid).
#[derive(Error, Debug, Clone)]
pub enum CategoryError {
    #[error("No category group exists with the ID {id}")]
    GroupNotFound { id: GroupId },

    #[error("No category exists with the ID {id}")]
    CategoryNotFound { id: ElementId },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),
}

/// Result type for service operations
pub type CategoryResult<T> = Result<T, CategoryError>;

impl CategoryError {
    /// Whether the error reports a missing group or category
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GroupNotFound { .. } | Self::CategoryNotFound { .. }
        ) || matches!(self, Self::Storage(StorageError::NotFound(_)))
    }
}
