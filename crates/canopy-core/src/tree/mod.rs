//! Trees (structures) and nested-set arithmetic
//!
//! - [`TreePosition`]: the `(lft, rgt, level)` triple and its pure predicates
//! - [`Tree`]: owned snapshot of a structure with pure queries and mutations
//! - [`repair`]: completes a partial ID selection with missing ancestors

mod position;
pub mod repair;
mod snapshot;

pub use position::TreePosition;
pub use repair::{fill_gaps, Placement};
pub use snapshot::{Tree, TreeNode};

use crate::types::{ElementId, StructureId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tree owned by exactly one category group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Structure {
    pub id: Option<StructureId>,
    /// 0 means unlimited
    pub max_levels: u32,
}

impl Structure {
    pub fn new(max_levels: u32) -> Self {
        Self {
            id: None,
            max_levels,
        }
    }
}

/// Nested-set operation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Element {0} is not part of the tree")]
    NodeNotFound(ElementId),

    #[error("An element cannot be placed under itself or one of its descendants")]
    Cycle,

    #[error("Placing the element would reach level {level}, beyond the tree's maximum of {max_levels}")]
    MaxLevelsExceeded { max_levels: u32, level: u32 },
}
