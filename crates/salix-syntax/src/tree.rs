//! Immutable, structurally-shared syntax trees.
//!
//! Node storage is a preorder arena behind an `Arc`: cloning a tree is
//! O(1) and shares storage. Edits never rewrite the arena; each tree copy
//! carries its own edit overlay, and node accessors apply the overlay when
//! reporting coordinates. Incremental reparsing consults the overlay to
//! decide which subtrees survived.

use std::sync::Arc;

use salix_core::{InputEdit, Language, Range, SymbolId};

use crate::cursor::TreeCursor;
use crate::node::Node;

/// Node flag bits.
pub(crate) mod flags {
    pub const EXTRA: u8 = 1 << 0;
    pub const MISSING: u8 = 1 << 1;
    /// Subtree contains an ERROR or MISSING node (set on ancestors too).
    pub const HAS_ERROR: u8 = 1 << 2;
}

pub(crate) const NO_PARENT: u32 = u32::MAX;

/// One arena entry. Nodes are stored in preorder: the subtree of entry
/// `i` occupies `i ..= i + descendant_count`.
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub symbol: SymbolId,
    /// Stable identity: preserved when a subtree is reused across a
    /// reparse, fresh otherwise.
    pub id: u32,
    pub parent: u32,
    pub children: Vec<u32>,
    /// Raw field id of this node within its parent, 0 for none.
    pub field: u16,
    /// Coordinates as parsed; the tree's edit overlay adjusts them.
    pub range: Range,
    pub descendant_count: u32,
    pub flags: u8,
}

pub(crate) struct TreeData {
    pub language: Language,
    pub arena: Vec<NodeData>,
    pub included_ranges: Vec<Range>,
}

/// A parsed syntax tree.
///
/// Tied to one [`Language`] and one version of the source text. `clone`
/// is cheap and the clone's edit history is independent from this one's.
#[derive(Clone)]
pub struct Tree {
    pub(crate) data: Arc<TreeData>,
    /// Edits applied since the parse, oldest first.
    pub(crate) edits: Vec<InputEdit>,
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("language", &self.data.language.name())
            .field("nodes", &self.data.arena.len())
            .field("pending_edits", &self.edits.len())
            .finish()
    }
}

impl Tree {
    pub(crate) fn new(language: Language, arena: Vec<NodeData>, included_ranges: Vec<Range>) -> Self {
        Self {
            data: Arc::new(TreeData {
                language,
                arena,
                included_ranges,
            }),
            edits: Vec::new(),
        }
    }

    pub fn language(&self) -> &Language {
        &self.data.language
    }

    /// The ranges that were included when this tree was parsed.
    pub fn included_ranges(&self) -> &[Range] {
        &self.data.included_ranges
    }

    pub fn root_node(&self) -> Node<'_> {
        Node::new(self, 0)
    }

    /// A root view with all coordinates shifted by the given deltas, for
    /// composing trees of embedded languages into one coordinate space.
    /// The underlying tree is not mutated.
    pub fn root_node_with_offset(
        &self,
        offset_bytes: usize,
        offset_extent: salix_core::Point,
    ) -> Node<'_> {
        Node::with_offset(self, 0, offset_bytes, offset_extent)
    }

    /// Record a text edit, shifting the coordinates of every node at or
    /// after its start.
    ///
    /// Call once per edit, in the order the edits were applied to the
    /// text, before the next parse; otherwise incremental reuse is
    /// invalid.
    pub fn edit(&mut self, edit: &InputEdit) {
        self.edits.push(*edit);
    }

    pub fn walk(&self) -> TreeCursor<'_> {
        TreeCursor::new(self.root_node())
    }

    /// Structural diff against a tree parsed from the post-edit text.
    ///
    /// `self` is the old tree (with edits applied via [`Tree::edit`]),
    /// `other` the new one. Returns the minimal set of disjoint, sorted
    /// ranges whose syntax differs; every changed node lies inside some
    /// returned range.
    pub fn changed_ranges(&self, other: &Tree) -> Vec<Range> {
        let mut raw = Vec::new();
        diff_nodes(self.root_node(), other.root_node(), &mut raw);
        merge_ranges(raw)
    }

    pub(crate) fn node_data(&self, idx: u32) -> &NodeData {
        &self.data.arena[idx as usize]
    }

    /// A node's coordinates with the edit overlay applied.
    pub(crate) fn adjusted_range(&self, idx: u32) -> Range {
        self.data.arena[idx as usize]
            .range
            .transform_through(&self.edits)
    }

    /// Pointer identity: two views belong to the same tree version.
    pub(crate) fn same_storage(&self, other: &Tree) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

fn diff_nodes(old: Node<'_>, new: Node<'_>, out: &mut Vec<Range>) {
    // A reused subtree whose adjusted coordinates line up is unchanged.
    if old.id() == new.id() && old.range() == new.range() {
        return;
    }

    let structurally_same = old.kind_id() == new.kind_id()
        && old.child_count() == new.child_count()
        && old.is_missing() == new.is_missing();

    if !structurally_same {
        out.push(old.range().cover(&new.range()));
        return;
    }

    if old.child_count() == 0 {
        if old.range() != new.range() {
            out.push(old.range().cover(&new.range()));
        }
        return;
    }

    for i in 0..old.child_count() {
        let (Some(old_child), Some(new_child)) = (old.child(i), new.child(i)) else {
            continue;
        };
        diff_nodes(old_child, new_child, out);
    }
}

fn merge_ranges(mut ranges: Vec<Range>) -> Vec<Range> {
    ranges.sort_by_key(|r| (r.start_byte, r.end_byte));
    let mut merged: Vec<Range> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start_byte <= last.end_byte => {
                *last = last.cover(&range);
            }
            _ => merged.push(range),
        }
    }
    merged
}
