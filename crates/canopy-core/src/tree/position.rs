//! Nested-set positions
//!
//! A position is the `(lft, rgt, level)` triple that places an element in its
//! tree. Every relationship between two elements of the same tree can be read
//! off their positions without touching storage.

use serde::{Deserialize, Serialize};

/// Where an element sits in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreePosition {
    pub lft: i64,
    pub rgt: i64,
    /// 1 for top-level elements
    pub level: u32,
}

impl TreePosition {
    pub fn new(lft: i64, rgt: i64, level: u32) -> Self {
        Self { lft, rgt, level }
    }

    /// Whether `other` lies strictly inside this position's interval
    pub fn contains(&self, other: &TreePosition) -> bool {
        self.lft < other.lft && other.rgt < self.rgt
    }

    pub fn is_ancestor_of(&self, other: &TreePosition) -> bool {
        self.contains(other)
    }

    pub fn is_descendant_of(&self, other: &TreePosition) -> bool {
        other.contains(self)
    }

    pub fn is_child_of(&self, other: &TreePosition) -> bool {
        self.is_descendant_of(other) && self.level == other.level + 1
    }

    pub fn is_parent_of(&self, other: &TreePosition) -> bool {
        other.is_child_of(self)
    }

    /// Number of index slots the element and its subtree occupy
    pub fn width(&self) -> i64 {
        self.rgt - self.lft + 1
    }

    pub fn descendant_count(&self) -> i64 {
        (self.rgt - self.lft - 1) / 2
    }

    pub fn has_descendants(&self) -> bool {
        self.rgt > self.lft + 1
    }

    pub fn is_top_level(&self) -> bool {
        self.level == 1
    }
}
