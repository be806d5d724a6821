//! Ordered containment index of a story.
//!
//! The taxonomy is fixed: three synthetic roots hold arcs, characters and
//! books; arcs hold turning points. Two levels are all there is, so the
//! index is a vector per root plus one map from arc to its turning points.

use std::collections::HashMap;

use crate::models::{ElementId, ElementKind, NodeId, Root};

/// Insertion point among a parent's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    At(usize),
    End,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeIndex {
    arcs: Vec<ElementId>,
    characters: Vec<ElementId>,
    books: Vec<ElementId>,
    /// Arc ID -> ordered turning point IDs.
    turning_points: HashMap<ElementId, Vec<ElementId>>,
}

impl TreeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` as the last child of `parent`.
    ///
    /// # Panics
    /// If `parent` cannot hold an element of `id`'s kind, or `id` is already indexed.
    pub fn append(&mut self, parent: &NodeId, id: ElementId) {
        self.insert(parent, Position::End, id);
    }

    /// Add `id` among `parent`'s children at `position`; positions past the end append.
    ///
    /// # Panics
    /// If `parent` cannot hold an element of `id`'s kind, or `id` is already indexed.
    pub fn insert(&mut self, parent: &NodeId, position: Position, id: ElementId) {
        assert!(
            self.can_hold(parent, id.kind()),
            "{} cannot be placed under {}",
            id,
            parent
        );
        assert!(!self.contains(&id), "{} is already in the tree", id);
        if id.kind() == ElementKind::Arc {
            self.turning_points.insert(id.clone(), Vec::new());
        }
        let siblings = self
            .siblings_mut(parent)
            .expect("parent was checked above");
        let index = clamp(position, siblings.len());
        siblings.insert(index, id);
    }

    /// Ordered children of `parent`; empty for leaves and unknown IDs.
    pub fn children(&self, parent: &NodeId) -> &[ElementId] {
        match parent {
            NodeId::Root(Root::Arcs) => &self.arcs,
            NodeId::Root(Root::Characters) => &self.characters,
            NodeId::Root(Root::Books) => &self.books,
            NodeId::Element(id) => self
                .turning_points
                .get(id)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.parent(id).is_some()
    }

    /// The node holding `id`, or `None` if `id` is not indexed.
    pub fn parent(&self, id: &ElementId) -> Option<NodeId> {
        match id.kind().root() {
            Some(root) => self
                .children(&NodeId::Root(root))
                .contains(id)
                .then_some(NodeId::Root(root)),
            None => self
                .turning_points
                .iter()
                .find(|(_, points)| points.contains(id))
                .map(|(arc, _)| NodeId::Element(arc.clone())),
        }
    }

    /// Position of `id` among its siblings.
    pub fn index(&self, id: &ElementId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(&parent).iter().position(|child| child == id)
    }

    /// Remove `id` and, for an arc, all of its turning points.
    ///
    /// Returns the removed IDs with children ahead of their parent. Entity
    /// collections are left alone.
    pub fn delete_subtree(&mut self, id: &ElementId) -> Vec<ElementId> {
        let Some(parent) = self.parent(id) else {
            return Vec::new();
        };
        let mut removed = match id.kind() {
            ElementKind::Arc => self.turning_points.remove(id).unwrap_or_default(),
            _ => Vec::new(),
        };
        if let Some(siblings) = self.siblings_mut(&parent) {
            siblings.retain(|child| child != id);
        }
        removed.push(id.clone());
        removed
    }

    /// Relocate `id` under `new_parent` at `position`.
    ///
    /// Arcs, characters and books may only be reordered within their own
    /// root; turning points may move to any indexed arc. Anything else is
    /// rejected and leaves the index untouched.
    pub fn move_to(&mut self, id: &ElementId, new_parent: &NodeId, position: Position) -> bool {
        let Some(old_parent) = self.parent(id) else {
            return false;
        };
        if !self.can_hold(new_parent, id.kind()) {
            return false;
        }
        if let Some(siblings) = self.siblings_mut(&old_parent) {
            siblings.retain(|child| child != id);
        }
        let siblings = self
            .siblings_mut(new_parent)
            .expect("parent was checked above");
        let index = clamp(position, siblings.len());
        siblings.insert(index, id.clone());
        true
    }

    /// Clear all roots and the turning-point-by-arc index.
    pub fn reset(&mut self) {
        self.arcs.clear();
        self.characters.clear();
        self.books.clear();
        self.turning_points.clear();
    }

    /// Every turning point ID, arc by arc, in tree order.
    pub fn all_turning_points(&self) -> impl Iterator<Item = &ElementId> {
        self.arcs
            .iter()
            .filter_map(move |arc| self.turning_points.get(arc))
            .flatten()
    }

    /// Whether `parent` is an indexed node that may hold elements of `kind`.
    pub fn can_hold(&self, parent: &NodeId, kind: ElementKind) -> bool {
        match parent {
            NodeId::Root(root) => root.kind() == kind,
            NodeId::Element(arc) => {
                kind == ElementKind::TurningPoint && self.turning_points.contains_key(arc)
            }
        }
    }

    fn siblings_mut(&mut self, parent: &NodeId) -> Option<&mut Vec<ElementId>> {
        match parent {
            NodeId::Root(Root::Arcs) => Some(&mut self.arcs),
            NodeId::Root(Root::Characters) => Some(&mut self.characters),
            NodeId::Root(Root::Books) => Some(&mut self.books),
            NodeId::Element(arc) => self.turning_points.get_mut(arc),
        }
    }
}

fn clamp(position: Position, len: usize) -> usize {
    match position {
        Position::At(index) => index.min(len),
        Position::End => len,
    }
}
