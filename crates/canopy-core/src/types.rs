//! Identifier types shared across the category subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Primary key of a `category_groups` row
    GroupId
);
numeric_id!(
    /// Shared element ID; categories are keyed by the element they extend
    ElementId
);
numeric_id!(
    /// Tree (structure) owned by a category group
    StructureId
);
numeric_id!(
    /// Field layout owned by a category group
    FieldLayoutId
);
numeric_id!(UserId);

/// Language/region identifier such as `en` or `de-CH`
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocaleId(String);

impl LocaleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocaleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for LocaleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Result of a save request that did not fail with an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Everything was persisted
    Saved,
    /// Validation failed; see the model's error collection. Nothing was persisted.
    Invalid,
    /// A before-save hook declined the save
    Cancelled,
}

impl SaveOutcome {
    pub fn is_saved(self) -> bool {
        matches!(self, Self::Saved)
    }
}
