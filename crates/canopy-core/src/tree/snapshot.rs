//! Owned snapshot of one tree
//!
//! [`Tree`] holds every node of a structure sorted by `lft`. Queries and
//! mutations are pure index arithmetic; storage backends load a snapshot,
//! mutate it, and write the changed positions back.

use super::{TreeError, TreePosition};
use crate::types::ElementId;
use serde::{Deserialize, Serialize};

/// An element and its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub element_id: ElementId,
    pub position: TreePosition,
}

impl TreeNode {
    pub fn new(element_id: ElementId, position: TreePosition) -> Self {
        Self {
            element_id,
            position,
        }
    }
}

/// Nested-set tree of elements. `max_levels == 0` means unlimited depth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    max_levels: u32,
    nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn new(max_levels: u32) -> Self {
        Self {
            max_levels,
            nodes: Vec::new(),
        }
    }

    pub fn from_nodes(max_levels: u32, nodes: impl IntoIterator<Item = TreeNode>) -> Self {
        let mut nodes: Vec<TreeNode> = nodes.into_iter().collect();
        nodes.sort_by_key(|n| n.position.lft);
        Self { max_levels, nodes }
    }

    pub fn max_levels(&self) -> u32 {
        self.max_levels
    }

    /// Nodes in tree order
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn position(&self, id: ElementId) -> Option<TreePosition> {
        self.index_of(id).map(|i| self.nodes[i].position)
    }

    fn index_of(&self, id: ElementId) -> Option<usize> {
        self.nodes.iter().position(|n| n.element_id == id)
    }

    /// The nearest enclosing node, `None` for top-level elements
    pub fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        let idx = self.index_of(id)?;
        let pos = self.nodes[idx].position;
        self.nodes[..idx]
            .iter()
            .rev()
            .find(|n| n.position.contains(&pos))
            .map(|n| n.element_id)
    }

    /// Ancestors from the top level down to the direct parent
    pub fn ancestors_of(&self, id: ElementId) -> Vec<ElementId> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let pos = self.nodes[idx].position;
        self.nodes[..idx]
            .iter()
            .filter(|n| n.position.contains(&pos))
            .map(|n| n.element_id)
            .collect()
    }

    /// Descendants in ascending tree order
    pub fn descendants_of(&self, id: ElementId) -> Vec<ElementId> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let pos = self.nodes[idx].position;
        self.nodes[idx + 1..]
            .iter()
            .take_while(|n| n.position.lft < pos.rgt)
            .map(|n| n.element_id)
            .collect()
    }

    pub fn children_of(&self, id: ElementId) -> Vec<ElementId> {
        let Some(pos) = self.position(id) else {
            return Vec::new();
        };
        self.nodes
            .iter()
            .filter(|n| n.position.is_child_of(&pos))
            .map(|n| n.element_id)
            .collect()
    }

    pub fn top_level(&self) -> Vec<ElementId> {
        self.nodes
            .iter()
            .filter(|n| n.position.is_top_level())
            .map(|n| n.element_id)
            .collect()
    }

    /// Whether `id` sits directly under `other`
    pub fn is_child_of(&self, id: ElementId, other: ElementId) -> bool {
        match (self.position(id), self.position(other)) {
            (Some(a), Some(b)) => a.is_child_of(&b),
            _ => false,
        }
    }

    /// Whether `id` and `other` are distinct elements sharing a parent (or both top-level)
    pub fn is_sibling_of(&self, id: ElementId, other: ElementId) -> bool {
        if id == other {
            return false;
        }
        match (self.position(id), self.position(other)) {
            (Some(a), Some(b)) if a.level == b.level => self.parent_of(id) == self.parent_of(other),
            _ => false,
        }
    }

    /// Place `id` as the last top-level element, moving its subtree if it is
    /// already in the tree.
    pub fn append_to_root(&mut self, id: ElementId) -> Result<TreePosition, TreeError> {
        let subtree = if self.contains(id) {
            self.detach(id)?
        } else {
            vec![TreeNode::new(id, TreePosition::new(0, 1, 0))]
        };
        let at = self.nodes.iter().map(|n| n.position.rgt).max().unwrap_or(0) + 1;
        Ok(self.attach(subtree, at, 1))
    }

    /// Place `id` as the last child of `parent`, moving its subtree if it is
    /// already in the tree.
    pub fn append_under(
        &mut self,
        id: ElementId,
        parent: ElementId,
    ) -> Result<TreePosition, TreeError> {
        if id == parent {
            return Err(TreeError::Cycle);
        }
        let parent_pos = self
            .position(parent)
            .ok_or(TreeError::NodeNotFound(parent))?;

        let depth = match self.position(id) {
            Some(pos) => {
                if pos.contains(&parent_pos) {
                    return Err(TreeError::Cycle);
                }
                self.subtree_depth(&pos)
            }
            None => 0,
        };

        let deepest = parent_pos.level + 1 + depth;
        if self.max_levels > 0 && deepest > self.max_levels {
            return Err(TreeError::MaxLevelsExceeded {
                max_levels: self.max_levels,
                level: deepest,
            });
        }

        let subtree = if self.contains(id) {
            self.detach(id)?
        } else {
            vec![TreeNode::new(id, TreePosition::new(0, 1, 0))]
        };
        let parent_pos = self
            .position(parent)
            .ok_or(TreeError::NodeNotFound(parent))?;
        Ok(self.attach(subtree, parent_pos.rgt, parent_pos.level + 1))
    }

    /// Remove `id` together with its subtree, closing the gap.
    /// Returns the removed element IDs in tree order.
    pub fn remove(&mut self, id: ElementId) -> Result<Vec<ElementId>, TreeError> {
        Ok(self.detach(id)?.into_iter().map(|n| n.element_id).collect())
    }

    fn subtree_depth(&self, pos: &TreePosition) -> u32 {
        self.nodes
            .iter()
            .filter(|n| pos.contains(&n.position))
            .map(|n| n.position.level - pos.level)
            .max()
            .unwrap_or(0)
    }

    // Cuts the subtree out and returns it rebased to lft 0 / level 0.
    fn detach(&mut self, id: ElementId) -> Result<Vec<TreeNode>, TreeError> {
        let pos = self.position(id).ok_or(TreeError::NodeNotFound(id))?;
        let width = pos.width();

        let (subtree, rest): (Vec<TreeNode>, Vec<TreeNode>) = self
            .nodes
            .drain(..)
            .partition(|n| n.position.lft >= pos.lft && n.position.rgt <= pos.rgt);

        self.nodes = rest
            .into_iter()
            .map(|mut n| {
                if n.position.lft > pos.rgt {
                    n.position.lft -= width;
                }
                if n.position.rgt > pos.rgt {
                    n.position.rgt -= width;
                }
                n
            })
            .collect();

        Ok(subtree
            .into_iter()
            .map(|n| {
                TreeNode::new(
                    n.element_id,
                    TreePosition::new(
                        n.position.lft - pos.lft,
                        n.position.rgt - pos.lft,
                        n.position.level - pos.level,
                    ),
                )
            })
            .collect())
    }

    // Opens a gap at `at` and drops a rebased subtree into it.
    fn attach(&mut self, subtree: Vec<TreeNode>, at: i64, base_level: u32) -> TreePosition {
        let width = 2 * subtree.len() as i64;
        for node in &mut self.nodes {
            if node.position.lft >= at {
                node.position.lft += width;
            }
            if node.position.rgt >= at {
                node.position.rgt += width;
            }
        }

        let root = TreePosition::new(at, at + width - 1, base_level);
        self.nodes.extend(subtree.into_iter().map(|n| {
            TreeNode::new(
                n.element_id,
                TreePosition::new(
                    n.position.lft + at,
                    n.position.rgt + at,
                    n.position.level + base_level,
                ),
            )
        }));
        self.nodes.sort_by_key(|n| n.position.lft);
        root
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    pub(crate) fn id(n: i64) -> ElementId {
        ElementId(n)
    }

    /// Every index 1..=2n used exactly once, lft < rgt, levels match nesting depth.
    pub(crate) fn is_consistent(tree: &Tree) -> bool {
        let mut slots: Vec<i64> = tree
            .nodes()
            .iter()
            .flat_map(|n| [n.position.lft, n.position.rgt])
            .collect();
        slots.sort_unstable();
        let expected: Vec<i64> = (1..=slots.len() as i64).collect();
        if slots != expected {
            return false;
        }
        tree.nodes().iter().all(|n| {
            let depth = tree.ancestors_of(n.element_id).len() as u32;
            n.position.lft < n.position.rgt && n.position.level == depth + 1
        })
    }

    //  1 ─ 2 ─ 3
    //  │   └ 4
    //  └ 5
    //  6
    pub(crate) fn sample() -> Tree {
        let mut tree = Tree::new(0);
        tree.append_to_root(id(1)).unwrap();
        tree.append_under(id(2), id(1)).unwrap();
        tree.append_under(id(3), id(2)).unwrap();
        tree.append_under(id(4), id(2)).unwrap();
        tree.append_under(id(5), id(1)).unwrap();
        tree.append_to_root(id(6)).unwrap();
        tree
    }

    #[test]
    fn test_build_positions() {
        let tree = sample();
        assert_eq!(tree.position(id(1)), Some(TreePosition::new(1, 10, 1)));
        assert_eq!(tree.position(id(2)), Some(TreePosition::new(2, 7, 2)));
        assert_eq!(tree.position(id(3)), Some(TreePosition::new(3, 4, 3)));
        assert_eq!(tree.position(id(4)), Some(TreePosition::new(5, 6, 3)));
        assert_eq!(tree.position(id(5)), Some(TreePosition::new(8, 9, 2)));
        assert_eq!(tree.position(id(6)), Some(TreePosition::new(11, 12, 1)));
        assert!(is_consistent(&tree));
    }

    #[test]
    fn test_relationships() {
        let tree = sample();
        assert_eq!(tree.parent_of(id(3)), Some(id(2)));
        assert_eq!(tree.parent_of(id(6)), None);
        assert_eq!(tree.ancestors_of(id(4)), vec![id(1), id(2)]);
        assert_eq!(tree.descendants_of(id(1)), vec![id(2), id(3), id(4), id(5)]);
        assert_eq!(tree.children_of(id(1)), vec![id(2), id(5)]);
        assert_eq!(tree.top_level(), vec![id(1), id(6)]);

        assert!(tree.is_sibling_of(id(3), id(4)));
        assert!(tree.is_sibling_of(id(2), id(5)));
        assert!(tree.is_sibling_of(id(1), id(6)));
        assert!(!tree.is_sibling_of(id(4), id(5)));
        assert!(!tree.is_sibling_of(id(3), id(3)));
        assert!(tree.is_child_of(id(5), id(1)));
        assert!(!tree.is_child_of(id(3), id(1)));
    }

    #[test]
    fn test_move_subtree_to_root() {
        let mut tree = sample();
        tree.append_to_root(id(2)).unwrap();

        assert_eq!(tree.parent_of(id(2)), None);
        assert_eq!(tree.parent_of(id(3)), Some(id(2)));
        assert_eq!(tree.position(id(3)).unwrap().level, 2);
        assert_eq!(tree.top_level(), vec![id(1), id(6), id(2)]);
        assert!(is_consistent(&tree));
    }

    #[test]
    fn test_move_subtree_under_other_parent() {
        let mut tree = sample();
        tree.append_under(id(2), id(6)).unwrap();

        assert_eq!(tree.ancestors_of(id(4)), vec![id(6), id(2)]);
        assert_eq!(tree.descendants_of(id(1)), vec![id(5)]);
        assert!(is_consistent(&tree));
    }

    #[test]
    fn test_cycles_rejected() {
        let mut tree = sample();
        assert_eq!(tree.append_under(id(1), id(3)), Err(TreeError::Cycle));
        assert_eq!(tree.append_under(id(2), id(2)), Err(TreeError::Cycle));
        assert_eq!(tree, sample());
    }

    #[test]
    fn test_unknown_parent() {
        let mut tree = sample();
        assert_eq!(
            tree.append_under(id(9), id(42)),
            Err(TreeError::NodeNotFound(id(42)))
        );
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut tree = Tree::new(2);
        tree.append_to_root(id(1)).unwrap();
        tree.append_under(id(2), id(1)).unwrap();
        assert_eq!(
            tree.append_under(id(3), id(2)),
            Err(TreeError::MaxLevelsExceeded {
                max_levels: 2,
                level: 3
            })
        );

        // Moving a two-level subtree under a top-level node would need three levels
        tree.append_to_root(id(4)).unwrap();
        assert!(tree.append_under(id(1), id(4)).is_err());
        assert!(is_consistent(&tree));
    }

    #[test]
    fn test_remove_closes_gap() {
        let mut tree = sample();
        let removed = tree.remove(id(2)).unwrap();
        assert_eq!(removed, vec![id(2), id(3), id(4)]);
        assert_eq!(tree.position(id(1)), Some(TreePosition::new(1, 4, 1)));
        assert_eq!(tree.position(id(6)), Some(TreePosition::new(5, 6, 1)));
        assert!(is_consistent(&tree));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Root(i64),
        Under(i64, i64),
        Remove(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..12).prop_map(Op::Root),
            (1i64..12, 1i64..12).prop_map(|(a, b)| Op::Under(a, b)),
            (1i64..12).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_operations_keep_tree_consistent(ops in prop::collection::vec(op(), 0..40)) {
            let mut tree = Tree::new(0);
            for op in ops {
                let before = tree.clone();
                let result = match op {
                    Op::Root(a) => tree.append_to_root(id(a)).map(|_| ()),
                    Op::Under(a, b) => tree.append_under(id(a), id(b)).map(|_| ()),
                    Op::Remove(a) => tree.remove(id(a)).map(|_| ()),
                };
                if result.is_err() {
                    prop_assert_eq!(&tree, &before);
                }
                prop_assert!(is_consistent(&tree));
            }
        }
    }
}
