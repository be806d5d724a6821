use serde::{Deserialize, Serialize};

use super::{ElementId, ElementKind, Entity};

/// A plot event belonging to exactly one arc.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurningPoint {
    pub title: String,
    pub description: String,
    pub notes: String,
    /// Position on the arc's timeline.
    pub position: Option<i64>,
    books: Vec<ElementId>,
}

impl TurningPoint {
    /// Referenced book IDs, in order.
    pub fn books(&self) -> &[ElementId] {
        &self.books
    }

    /// Replace the book references. Later duplicates and non-book IDs are dropped.
    pub fn set_books(&mut self, books: impl IntoIterator<Item = ElementId>) {
        self.books.clear();
        for id in books {
            self.add_book(id);
        }
    }

    /// Append a book reference. Returns `false` if it was already present
    /// or `id` is not a book.
    pub fn add_book(&mut self, id: ElementId) -> bool {
        if id.kind() != ElementKind::Book || self.books.contains(&id) {
            return false;
        }
        self.books.push(id);
        true
    }

    pub fn remove_book(&mut self, id: &ElementId) -> bool {
        let before = self.books.len();
        self.books.retain(|b| b != id);
        self.books.len() != before
    }
}

impl Entity for TurningPoint {
    const KIND: ElementKind = ElementKind::TurningPoint;

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }
}
