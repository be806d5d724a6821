use serde::{Deserialize, Serialize};

use super::{ElementKind, Entity};

/// A work or document associated with the story.
///
/// Turning points reference books by ID; deleting a book strips those references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub description: String,
    pub notes: String,
    /// Path to the external manuscript, if any.
    pub path: Option<String>,
}

impl Entity for Book {
    const KIND: ElementKind = ElementKind::Book;

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }
}
