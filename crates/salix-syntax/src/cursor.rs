//! Stateful tree navigation.
//!
//! A cursor keeps the ancestor path from its root to the current node, so
//! sequential traversal never re-derives parents. Navigation is bounded to
//! the subtree rooted at the node the cursor was constructed on; no move
//! escapes above that root.
//!
//! Forward moves (`goto_first_child`, `goto_next_sibling`) are O(1).
//! Backward moves (`goto_last_child`, `goto_previous_sibling`) re-derive
//! the sibling position by scanning the parent's child list, so repeated
//! backward traversal costs more than the forward equivalent; the cursor
//! caches each level's child slot to amortize this within one traversal.

use salix_core::{FieldId, Point};

use crate::node::Node;
use crate::tree::Tree;

pub struct TreeCursor<'t> {
    tree: &'t Tree,
    offset_bytes: usize,
    offset_extent: Point,
    /// Path from the cursor root to the current node: (arena index, child
    /// slot within parent). The root's slot is unused.
    stack: Vec<(u32, u32)>,
}

impl<'t> TreeCursor<'t> {
    pub(crate) fn new(root: Node<'t>) -> Self {
        let (offset_bytes, offset_extent) = root.offsets();
        Self {
            tree: root.tree(),
            offset_bytes,
            offset_extent,
            stack: vec![(root.arena_index(), 0)],
        }
    }

    /// Re-target the cursor at a new root node.
    pub fn reset(&mut self, root: Node<'t>) {
        let (offset_bytes, offset_extent) = root.offsets();
        self.tree = root.tree();
        self.offset_bytes = offset_bytes;
        self.offset_extent = offset_extent;
        self.stack.clear();
        self.stack.push((root.arena_index(), 0));
    }

    #[inline]
    fn current(&self) -> u32 {
        self.stack.last().expect("cursor stack is never empty").0
    }

    #[inline]
    fn root(&self) -> u32 {
        self.stack[0].0
    }

    pub fn node(&self) -> Node<'t> {
        Node::with_offset(
            self.tree,
            self.current(),
            self.offset_bytes,
            self.offset_extent,
        )
    }

    /// Depth below the cursor root (root itself is 0).
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Preorder index of the current node relative to the cursor root.
    pub fn descendant_index(&self) -> usize {
        (self.current() - self.root()) as usize
    }

    /// Field of the current node within its parent, if any. The cursor
    /// root itself reports no field.
    pub fn field_id(&self) -> Option<FieldId> {
        if self.stack.len() == 1 {
            return None;
        }
        self.node().field_id()
    }

    pub fn field_name(&self) -> Option<&'t str> {
        self.tree.language().field_name_for_id(self.field_id()?)
    }

    pub fn goto_first_child(&mut self) -> bool {
        let data = self.tree.node_data(self.current());
        match data.children.first() {
            Some(&child) => {
                self.stack.push((child, 0));
                true
            }
            None => false,
        }
    }

    /// More expensive than [`Self::goto_first_child`]: the child slot is
    /// derived from the end of the parent's child list.
    pub fn goto_last_child(&mut self) -> bool {
        let data = self.tree.node_data(self.current());
        match data.children.last() {
            Some(&child) => {
                let slot = (data.children.len() - 1) as u32;
                self.stack.push((child, slot));
                true
            }
            None => false,
        }
    }

    /// Never moves above the cursor root.
    pub fn goto_parent(&mut self) -> bool {
        if self.stack.len() == 1 {
            return false;
        }
        self.stack.pop();
        true
    }

    pub fn goto_next_sibling(&mut self) -> bool {
        if self.stack.len() == 1 {
            return false;
        }
        let (_, slot) = *self.stack.last().expect("stack non-empty");
        let parent = self.stack[self.stack.len() - 2].0;
        let siblings = &self.tree.node_data(parent).children;
        let next_slot = slot as usize + 1;
        match siblings.get(next_slot) {
            Some(&next) => {
                *self.stack.last_mut().expect("stack non-empty") = (next, next_slot as u32);
                true
            }
            None => false,
        }
    }

    /// More expensive than [`Self::goto_next_sibling`]: backward motion
    /// re-reads the parent's child list.
    pub fn goto_previous_sibling(&mut self) -> bool {
        if self.stack.len() == 1 {
            return false;
        }
        let (_, slot) = *self.stack.last().expect("stack non-empty");
        if slot == 0 {
            return false;
        }
        let parent = self.stack[self.stack.len() - 2].0;
        let prev = self.tree.node_data(parent).children[slot as usize - 1];
        *self.stack.last_mut().expect("stack non-empty") = (prev, slot - 1);
        true
    }

    /// Jump straight to the `n`th descendant of the cursor root in
    /// preorder (0 is the root itself), using the arena's preorder layout
    /// rather than stepping.
    pub fn goto_descendant(&mut self, n: usize) -> bool {
        let root = self.root();
        let root_count = self.tree.node_data(root).descendant_count as usize;
        if n > root_count {
            return false;
        }
        let target = root + n as u32;

        self.stack.truncate(1);
        let mut current = root;
        while current != target {
            let children = &self.tree.node_data(current).children;
            // Children are ascending preorder indices; pick the last one
            // at or before the target.
            let slot = children.partition_point(|&c| c <= target) - 1;
            let child = children[slot];
            self.stack.push((child, slot as u32));
            current = child;
        }
        true
    }

    /// Move to the first child whose end lies past `byte`, returning its
    /// child index.
    pub fn goto_first_child_for_byte(&mut self, byte: usize) -> Option<usize> {
        let node = self.node();
        for (i, child) in node.children().enumerate() {
            if child.end_byte() > byte {
                self.stack.push((child.arena_index(), i as u32));
                return Some(i);
            }
        }
        None
    }

    /// Move to the first child whose end lies past `point`, returning its
    /// child index.
    pub fn goto_first_child_for_point(&mut self, point: Point) -> Option<usize> {
        let node = self.node();
        for (i, child) in node.children().enumerate() {
            if child.end_position() > point {
                self.stack.push((child.arena_index(), i as u32));
                return Some(i);
            }
        }
        None
    }
}
