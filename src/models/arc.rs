use serde::{Deserialize, Serialize};

use super::{ElementKind, Entity};

/// A plot thread.
///
/// The ordered turning points of an arc are held by the story's tree index,
/// not by the record itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arc {
    pub title: String,
    pub description: String,
    /// Abbreviation shown in compact views.
    pub short_name: String,
    pub notes: String,
}

impl Entity for Arc {
    const KIND: ElementKind = ElementKind::Arc;

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }
}
