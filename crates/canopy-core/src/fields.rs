//! Custom field layouts attached to category groups

use crate::types::FieldLayoutId;
use serde::{Deserialize, Serialize};

/// Schema of custom fields for the categories of one group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    #[serde(default)]
    pub id: Option<FieldLayoutId>,
    /// Fields in display order
    #[serde(default)]
    pub fields: Vec<LayoutField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutField {
    pub handle: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub sort_order: u32,
}

impl FieldLayout {
    pub fn with_field(mut self, handle: impl Into<String>, required: bool) -> Self {
        let sort_order = self.fields.len() as u32 + 1;
        self.fields.push(LayoutField {
            handle: handle.into(),
            required,
            sort_order,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
