//! The story aggregate: entity collections plus the tree index that orders them.
//!
//! All structural changes go through [`Story`] so that ID generation, tree
//! placement and the modification flag stay consistent.

mod tree;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub use tree::*;

use crate::models::*;

/// Something that wants to hear about changes to the modification flag.
///
/// `refresh` is called every time the flag is assigned, not only on
/// transitions, so implementations must tolerate repeated calls.
pub trait ChangeObserver {
    fn refresh(&self);
}

/// Input for the `add_*` operations. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct AddElementInput {
    /// Insertion anchor. A same-kind element places the new one right after
    /// it; anything else appends. Turning points use it to find their arc.
    pub target: Option<NodeId>,
    /// Defaults to `"New <Kind> (<id>)"`.
    pub title: Option<String>,
    /// Timeline position; only used by turning points.
    pub position: Option<i64>,
}

impl AddElementInput {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn after(target: impl Into<NodeId>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<NodeId>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }
}

/// An entity kind stored in one of the story's collections.
pub trait Element: Entity {
    fn collection(story: &Story) -> &HashMap<ElementId, Self>;
    fn collection_mut(story: &mut Story) -> &mut HashMap<ElementId, Self>;
}

impl Element for Arc {
    fn collection(story: &Story) -> &HashMap<ElementId, Self> {
        &story.arcs
    }

    fn collection_mut(story: &mut Story) -> &mut HashMap<ElementId, Self> {
        &mut story.arcs
    }
}

impl Element for TurningPoint {
    fn collection(story: &Story) -> &HashMap<ElementId, Self> {
        &story.turning_points
    }

    fn collection_mut(story: &mut Story) -> &mut HashMap<ElementId, Self> {
        &mut story.turning_points
    }
}

impl Element for Character {
    fn collection(story: &Story) -> &HashMap<ElementId, Self> {
        &story.characters
    }

    fn collection_mut(story: &mut Story) -> &mut HashMap<ElementId, Self> {
        &mut story.characters
    }
}

impl Element for Book {
    fn collection(story: &Story) -> &HashMap<ElementId, Self> {
        &story.books
    }

    fn collection_mut(story: &mut Story) -> &mut HashMap<ElementId, Self> {
        &mut story.books
    }
}

#[derive(Default)]
pub struct Story {
    project: ProjectInfo,
    arcs: HashMap<ElementId, Arc>,
    turning_points: HashMap<ElementId, TurningPoint>,
    characters: HashMap<ElementId, Character>,
    books: HashMap<ElementId, Book>,
    tree: TreeIndex,
    /// Highest number handed out (or loaded) per kind; IDs are never reused.
    last_issued: HashMap<ElementKind, u32>,
    modified: bool,
    clients: Vec<Rc<dyn ChangeObserver>>,
}

impl fmt::Debug for Story {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Story")
            .field("project", &self.project)
            .field("arcs", &self.arcs.len())
            .field("turning_points", &self.turning_points.len())
            .field("characters", &self.characters.len())
            .field("books", &self.books.len())
            .field("modified", &self.modified)
            .finish_non_exhaustive()
    }
}

impl Story {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }

    pub fn tree(&self) -> &TreeIndex {
        &self.tree
    }

    pub fn children(&self, parent: &NodeId) -> &[ElementId] {
        self.tree.children(parent)
    }

    pub fn get<E: Element>(&self, id: &ElementId) -> Option<&E> {
        E::collection(self).get(id)
    }

    pub fn arcs(&self) -> &HashMap<ElementId, Arc> {
        &self.arcs
    }

    pub fn turning_points(&self) -> &HashMap<ElementId, TurningPoint> {
        &self.turning_points
    }

    pub fn characters(&self) -> &HashMap<ElementId, Character> {
        &self.characters
    }

    pub fn books(&self) -> &HashMap<ElementId, Book> {
        &self.books
    }

    pub fn element_title(&self, id: &ElementId) -> Option<&str> {
        match id.kind() {
            ElementKind::Arc => self.arcs.get(id).map(Entity::title),
            ElementKind::TurningPoint => self.turning_points.get(id).map(Entity::title),
            ElementKind::Character => self.characters.get(id).map(Entity::title),
            ElementKind::Book => self.books.get(id).map(Entity::title),
        }
    }

    /// Turning points referencing `book`, in tree order.
    pub fn turning_points_with_book(&self, book: &ElementId) -> Vec<ElementId> {
        self.tree
            .all_turning_points()
            .filter(|id| {
                self.turning_points
                    .get(*id)
                    .is_some_and(|point| point.books().contains(book))
            })
            .cloned()
            .collect()
    }

    // ============================================================
    // Modification flag and observers
    // ============================================================

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Assign the modification flag and notify every registered client.
    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
        for client in &self.clients {
            client.refresh();
        }
    }

    pub fn register_client(&mut self, client: Rc<dyn ChangeObserver>) {
        if !self.clients.iter().any(|c| Rc::ptr_eq(c, &client)) {
            self.clients.push(client);
        }
    }

    pub fn unregister_client(&mut self, client: &Rc<dyn ChangeObserver>) {
        self.clients.retain(|c| !Rc::ptr_eq(c, client));
    }

    fn on_element_change(&mut self) {
        self.set_modified(true);
    }

    // ============================================================
    // Field edits
    // ============================================================

    /// Mutate one element in place.
    ///
    /// The story is marked modified if the record differs afterwards.
    /// Returns `None` if `id` is unknown.
    pub fn edit<E: Element, R>(&mut self, id: &ElementId, f: impl FnOnce(&mut E) -> R) -> Option<R> {
        let element = E::collection_mut(self).get_mut(id)?;
        let before = element.clone();
        let result = f(element);
        let changed = *element != before;
        if changed {
            self.on_element_change();
        }
        Some(result)
    }

    pub fn edit_project<R>(&mut self, f: impl FnOnce(&mut ProjectInfo) -> R) -> R {
        let before = self.project.clone();
        let result = f(&mut self.project);
        if self.project != before {
            self.on_element_change();
        }
        result
    }

    // ============================================================
    // Structure
    // ============================================================

    pub fn add_arc(&mut self, input: AddElementInput) -> ElementId {
        self.add_top_level(input, |id, title| Arc {
            title,
            short_name: id.to_string(),
            ..Arc::default()
        })
    }

    pub fn add_character(&mut self, input: AddElementInput) -> ElementId {
        self.add_top_level(input, |_, title| Character {
            title,
            ..Character::default()
        })
    }

    pub fn add_book(&mut self, input: AddElementInput) -> ElementId {
        self.add_top_level(input, |_, title| Book {
            title,
            ..Book::default()
        })
    }

    /// Add a turning point to the arc named by `input.target`, or right after
    /// the turning point named by it.
    ///
    /// Returns `None` without touching the story if the target resolves to
    /// neither.
    pub fn add_turning_point(&mut self, input: AddElementInput) -> Option<ElementId> {
        let target = input.target.as_ref()?.as_element()?;
        let (arc, position) = match target.kind() {
            ElementKind::TurningPoint => {
                let parent = self.tree.parent(target)?;
                let index = self.tree.index(target)?;
                (parent, Position::At(index + 1))
            }
            ElementKind::Arc if self.tree.contains(target) => {
                (NodeId::Element(target.clone()), Position::End)
            }
            _ => return None,
        };

        let id = self.next_id::<TurningPoint>();
        let mut point = TurningPoint::default();
        point.title = input
            .title
            .unwrap_or_else(|| default_title(ElementKind::TurningPoint, &id));
        point.position = input.position;
        self.turning_points.insert(id.clone(), point);
        self.tree.insert(&arc, position, id.clone());
        tracing::debug!("Added {} under {}", id, arc);
        self.on_element_change();
        Some(id)
    }

    /// Delete an element, cascading as the taxonomy requires.
    ///
    /// - Arc: its turning points go first, then the arc.
    /// - Book: references are stripped from every turning point.
    /// - Character, turning point: no cascade.
    ///
    /// Returns `false` if `id` is not in the story.
    pub fn delete_element(&mut self, id: &ElementId) -> bool {
        if !self.tree.contains(id) {
            return false;
        }
        if id.kind() == ElementKind::Book {
            for point in self.turning_points.values_mut() {
                point.remove_book(id);
            }
        }
        for removed in self.tree.delete_subtree(id) {
            let found = match removed.kind() {
                ElementKind::Arc => self.arcs.remove(&removed).is_some(),
                ElementKind::TurningPoint => self.turning_points.remove(&removed).is_some(),
                ElementKind::Character => self.characters.remove(&removed).is_some(),
                ElementKind::Book => self.books.remove(&removed).is_some(),
            };
            assert!(found, "tree index references missing element {}", removed);
        }
        tracing::debug!("Deleted {}", id);
        self.on_element_change();
        true
    }

    /// Like [`Story::delete_element`], for IDs coming from a UI as text.
    /// Unparsable IDs are ignored.
    pub fn delete_element_str(&mut self, id: &str) -> bool {
        match ElementId::parse(id) {
            Ok(id) => self.delete_element(&id),
            Err(_) => false,
        }
    }

    /// Move `id` to where `target` is.
    ///
    /// - Same kind: `id` takes `target`'s place among `target`'s siblings
    ///   (a turning point may thereby change arcs).
    /// - Turning point onto an arc: appended to that arc, also when the arc
    ///   already has turning points.
    /// - Onto its own root: appended to that root.
    ///
    /// Everything else is rejected. Returns whether the tree changed.
    pub fn move_node(&mut self, id: &ElementId, target: &NodeId) -> bool {
        let moved = match target {
            NodeId::Root(root) if root.kind() == id.kind() => {
                self.tree.move_to(id, target, Position::End)
            }
            NodeId::Root(_) => false,
            NodeId::Element(target) if target == id => false,
            NodeId::Element(target) if target.kind() == id.kind() => {
                match (self.tree.parent(target), self.tree.index(target)) {
                    (Some(parent), Some(index)) => {
                        self.tree.move_to(id, &parent, Position::At(index))
                    }
                    _ => false,
                }
            }
            // Appended to the arc it was dropped on, whatever that arc holds;
            // it does not go to the end of the preceding arc.
            NodeId::Element(target)
                if id.kind() == ElementKind::TurningPoint && target.kind() == ElementKind::Arc =>
            {
                self.tree.move_to(id, &NodeId::Element(target.clone()), Position::End)
            }
            NodeId::Element(_) => false,
        };
        if moved {
            tracing::debug!("Moved {} to {}", id, target);
            self.on_element_change();
        }
        moved
    }

    // ============================================================
    // Loading
    // ============================================================

    /// Place a record read from a project file. Does not touch the
    /// modification flag.
    pub(crate) fn insert_loaded<E: Element>(&mut self, parent: &NodeId, id: ElementId, record: E) {
        assert_eq!(id.kind(), E::KIND, "{} is not a {}", id, E::KIND.label());
        if let Some(number) = id.number() {
            let last = self.last_issued.entry(E::KIND).or_insert(0);
            *last = (*last).max(number);
        }
        E::collection_mut(self).insert(id.clone(), record);
        self.tree.append(parent, id);
    }

    pub(crate) fn project_mut(&mut self) -> &mut ProjectInfo {
        &mut self.project
    }

    fn add_top_level<E: Element>(
        &mut self,
        input: AddElementInput,
        build: impl FnOnce(&ElementId, String) -> E,
    ) -> ElementId {
        let root = E::KIND
            .root()
            .expect("top-level kinds always have a root");
        let position = match input.target.as_ref().and_then(NodeId::as_element) {
            Some(target) if target.kind() == E::KIND => self
                .tree
                .index(target)
                .map_or(Position::End, |index| Position::At(index + 1)),
            _ => Position::End,
        };

        let id = self.next_id::<E>();
        let title = input
            .title
            .unwrap_or_else(|| default_title(E::KIND, &id));
        E::collection_mut(self).insert(id.clone(), build(&id, title));
        self.tree.insert(&NodeId::Root(root), position, id.clone());
        tracing::debug!("Added {} under {}", id, root.as_str());
        self.on_element_change();
        id
    }

    fn next_id<E: Element>(&mut self) -> ElementId {
        let floor = self.last_issued.get(&E::KIND).copied().unwrap_or(0);
        let id = create_id(E::collection(self), E::KIND, floor)
            .expect("element ID space exhausted");
        if let Some(number) = id.number() {
            self.last_issued.insert(E::KIND, number);
        }
        id
    }
}

fn default_title(kind: ElementKind, id: &ElementId) -> String {
    format!("New {} ({})", kind.label(), id)
}
