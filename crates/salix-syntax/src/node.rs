//! Lightweight node views.
//!
//! A [`Node`] is a handle into its tree's arena, not an owner: it is
//! `Copy`, borrows the tree, and cannot outlive it, so use-after-free is
//! impossible by construction.

use salix_core::{FieldId, Point, Range, SymbolId};

use crate::cursor::TreeCursor;
use crate::tree::{flags, Tree, NO_PARENT};

#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t Tree,
    idx: u32,
    offset_bytes: usize,
    offset_extent: Point,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.tree.same_storage(other.tree) && self.idx == other.idx
    }
}

impl Eq for Node<'_> {}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind())
            .field("range", &self.range())
            .field("id", &self.id())
            .finish()
    }
}

impl<'t> Node<'t> {
    pub(crate) fn new(tree: &'t Tree, idx: u32) -> Self {
        Self {
            tree,
            idx,
            offset_bytes: 0,
            offset_extent: Point::ZERO,
        }
    }

    pub(crate) fn with_offset(
        tree: &'t Tree,
        idx: u32,
        offset_bytes: usize,
        offset_extent: Point,
    ) -> Self {
        Self {
            tree,
            idx,
            offset_bytes,
            offset_extent,
        }
    }

    fn sibling_view(&self, idx: u32) -> Node<'t> {
        Node {
            tree: self.tree,
            idx,
            offset_bytes: self.offset_bytes,
            offset_extent: self.offset_extent,
        }
    }

    #[inline]
    pub(crate) fn tree(&self) -> &'t Tree {
        self.tree
    }

    #[inline]
    pub(crate) fn arena_index(&self) -> u32 {
        self.idx
    }

    #[inline]
    pub(crate) fn offsets(&self) -> (usize, Point) {
        (self.offset_bytes, self.offset_extent)
    }

    /// Stable identity: equal across incremental reparses iff the
    /// underlying subtree was unchanged and reused.
    pub fn id(&self) -> usize {
        self.tree.node_data(self.idx).id as usize
    }

    pub fn kind_id(&self) -> SymbolId {
        self.tree.node_data(self.idx).symbol
    }

    pub fn kind(&self) -> &'t str {
        self.tree
            .language()
            .node_kind_for_id(self.kind_id())
            .unwrap_or("")
    }

    pub fn language(&self) -> &'t salix_core::Language {
        self.tree.language()
    }

    pub fn is_named(&self) -> bool {
        self.tree.language().node_kind_is_named(self.kind_id())
    }

    pub fn is_extra(&self) -> bool {
        self.tree.node_data(self.idx).flags & flags::EXTRA != 0
    }

    pub fn is_missing(&self) -> bool {
        self.tree.node_data(self.idx).flags & flags::MISSING != 0
    }

    pub fn is_error(&self) -> bool {
        self.kind_id() == self.tree.language().error_symbol()
    }

    /// Whether this subtree contains any ERROR or MISSING node.
    pub fn has_error(&self) -> bool {
        self.is_error() || self.tree.node_data(self.idx).flags & flags::HAS_ERROR != 0
    }

    pub fn range(&self) -> Range {
        let r = self.tree.adjusted_range(self.idx);
        Range {
            start_byte: r.start_byte + self.offset_bytes,
            end_byte: r.end_byte + self.offset_bytes,
            start_point: self.offset_extent.offset_by(r.start_point),
            end_point: self.offset_extent.offset_by(r.end_point),
        }
    }

    pub fn start_byte(&self) -> usize {
        self.range().start_byte
    }

    pub fn end_byte(&self) -> usize {
        self.range().end_byte
    }

    pub fn byte_range(&self) -> std::ops::Range<usize> {
        let r = self.range();
        r.start_byte..r.end_byte
    }

    pub fn start_position(&self) -> Point {
        self.range().start_point
    }

    pub fn end_position(&self) -> Point {
        self.range().end_point
    }

    pub fn parent(&self) -> Option<Node<'t>> {
        let parent = self.tree.node_data(self.idx).parent;
        (parent != NO_PARENT).then(|| self.sibling_view(parent))
    }

    pub fn child_count(&self) -> usize {
        self.tree.node_data(self.idx).children.len()
    }

    pub fn child(&self, i: usize) -> Option<Node<'t>> {
        self.tree
            .node_data(self.idx)
            .children
            .get(i)
            .map(|&idx| self.sibling_view(idx))
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'t>> + 't {
        let this = *self;
        (0..this.child_count()).filter_map(move |i| this.child(i))
    }

    pub fn named_child_count(&self) -> usize {
        self.children().filter(|c| c.is_named()).count()
    }

    pub fn named_child(&self, i: usize) -> Option<Node<'t>> {
        self.children().filter(|c| c.is_named()).nth(i)
    }

    /// This node's position among its parent's children.
    pub(crate) fn child_index(&self) -> Option<usize> {
        let parent = self.parent()?;
        parent
            .tree
            .node_data(parent.idx)
            .children
            .iter()
            .position(|&c| c == self.idx)
    }

    pub fn next_sibling(&self) -> Option<Node<'t>> {
        let parent = self.parent()?;
        parent.child(self.child_index()? + 1)
    }

    pub fn prev_sibling(&self) -> Option<Node<'t>> {
        let parent = self.parent()?;
        let i = self.child_index()?;
        (i > 0).then(|| parent.child(i - 1)).flatten()
    }

    pub fn next_named_sibling(&self) -> Option<Node<'t>> {
        let mut sib = self.next_sibling();
        while let Some(s) = sib {
            if s.is_named() {
                return Some(s);
            }
            sib = s.next_sibling();
        }
        None
    }

    /// The field this node fills within its parent, if any.
    pub fn field_id(&self) -> Option<FieldId> {
        FieldId::new(self.tree.node_data(self.idx).field)
    }

    pub fn field_name(&self) -> Option<&'t str> {
        self.tree.language().field_name_for_id(self.field_id()?)
    }

    pub fn child_by_field_id(&self, field: FieldId) -> Option<Node<'t>> {
        self.children().find(|c| c.field_id() == Some(field))
    }

    pub fn child_by_field_name(&self, name: &str) -> Option<Node<'t>> {
        let field = self.tree.language().field_id_for_name(name)?;
        self.child_by_field_id(field)
    }

    /// Smallest descendant spanning `start..end` bytes.
    pub fn descendant_for_byte_range(&self, start: usize, end: usize) -> Option<Node<'t>> {
        let r = self.range();
        if start < r.start_byte || end > r.end_byte {
            return None;
        }
        let mut current = *self;
        'outer: loop {
            for child in current.children() {
                let cr = child.range();
                if cr.start_byte <= start && end <= cr.end_byte {
                    current = child;
                    continue 'outer;
                }
            }
            return Some(current);
        }
    }

    /// Smallest named descendant spanning `start..end` bytes.
    pub fn named_descendant_for_byte_range(&self, start: usize, end: usize) -> Option<Node<'t>> {
        let mut node = self.descendant_for_byte_range(start, end)?;
        while !node.is_named() {
            node = node.parent()?;
        }
        Some(node)
    }

    pub fn walk(&self) -> TreeCursor<'t> {
        TreeCursor::new(*self)
    }

    /// The node's source text. `source` must be the text this tree's
    /// coordinates refer to.
    pub fn utf8_text<'s>(&self, source: &'s str) -> &'s str {
        let r = self.range();
        &source[r.start_byte.min(source.len())..r.end_byte.min(source.len())]
    }

    /// S-expression rendering of the named structure, with field labels.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.write_sexp(&mut out);
        out
    }

    fn write_sexp(&self, out: &mut String) {
        if self.is_missing() {
            out.push_str("(MISSING ");
            if self.is_named() {
                out.push_str(self.kind());
            } else {
                out.push('"');
                out.push_str(self.kind());
                out.push('"');
            }
            out.push(')');
            return;
        }
        if !self.is_named() {
            out.push_str("(\"");
            out.push_str(self.kind());
            out.push_str("\")");
            return;
        }
        out.push('(');
        out.push_str(self.kind());
        for child in self.children() {
            if !child.is_named() && !child.is_missing() {
                continue;
            }
            out.push(' ');
            if let Some(field) = child.field_name() {
                out.push_str(field);
                out.push_str(": ");
            }
            child.write_sexp(out);
        }
        out.push(')');
    }
}
