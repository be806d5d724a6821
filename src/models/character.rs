use serde::{Deserialize, Serialize};

use super::{ElementKind, Entity};

/// A story participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub title: String,
    pub description: String,
    pub full_name: String,
    /// The character's function in the story, e.g. "Mentor".
    pub role: String,
    pub notes: String,
}

impl Entity for Character {
    const KIND: ElementKind = ElementKind::Character;

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }
}
