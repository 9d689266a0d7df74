//! Tree repair: fill gaps in a selection of category IDs
//!
//! A selection made in a tree UI may contain a category without its parent.
//! [`fill_gaps`] walks the selection in tree order and inserts the missing
//! ancestors immediately before the category that needed them, so every
//! returned category has its full ancestor chain in the result.

use super::{Tree, TreePosition};
use crate::types::{ElementId, StructureId};
use std::collections::{HashMap, HashSet};

/// A selected element and where it sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub element_id: ElementId,
    pub structure_id: Option<StructureId>,
    pub position: Option<TreePosition>,
}

/// Complete `selected` with missing ancestors.
///
/// The selection is walked in tree order. A category that is not top-level and
/// is neither a sibling nor a child of the previously emitted category gets its
/// ancestors emitted first. Each ID appears once; running the result through
/// again returns it unchanged.
pub fn fill_gaps(selected: &[Placement], trees: &HashMap<StructureId, Tree>) -> Vec<ElementId> {
    let mut ordered: Vec<&Placement> = selected.iter().collect();
    ordered.sort_by_key(|p| (p.structure_id, p.position.map(|pos| pos.lft)));

    let mut seen = HashSet::new();
    let mut complete = Vec::with_capacity(selected.len());
    let mut prev: Option<&Placement> = None;

    for placement in ordered {
        if seen.contains(&placement.element_id) {
            continue;
        }

        if let (Some(structure_id), Some(position)) = (placement.structure_id, placement.position)
        {
            if let Some(tree) = trees.get(&structure_id) {
                if !position.is_top_level() && !follows(prev, placement, tree) {
                    for ancestor in tree.ancestors_of(placement.element_id) {
                        if seen.insert(ancestor) {
                            complete.push(ancestor);
                        }
                    }
                }
            }
        }

        seen.insert(placement.element_id);
        complete.push(placement.element_id);
        prev = Some(placement);
    }

    complete
}

// Whether `current` continues directly from `prev` (sibling or child), which
// means its ancestors are already in the output.
fn follows(prev: Option<&Placement>, current: &Placement, tree: &Tree) -> bool {
    match prev {
        Some(prev) if prev.structure_id == current.structure_id => {
            tree.is_sibling_of(current.element_id, prev.element_id)
                || tree.is_child_of(current.element_id, prev.element_id)
        }
        _ => false,
    }
}
