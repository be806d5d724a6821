use serde::{Deserialize, Serialize};

/// Project-level attributes of the story.
///
/// Exactly one per project. It is not part of the tree and has no ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub title: String,
    pub description: String,
    /// ISO 639 language code of the manuscript, e.g. `en`.
    pub language_code: Option<String>,
    /// ISO 3166 country code, e.g. `US`.
    pub country_code: Option<String>,
}

impl ProjectInfo {
    /// The `ll-CC` locale tag written to the project file, if both parts are known.
    pub fn locale(&self) -> Option<String> {
        match (&self.language_code, &self.country_code) {
            (Some(language), Some(country)) if !language.is_empty() && !country.is_empty() => {
                Some(format!("{}-{}", language, country))
            }
            _ => None,
        }
    }

    pub fn set_locale(&mut self, tag: &str) {
        if let Some((language, country)) = tag.split_once('-') {
            self.language_code = Some(language.to_string());
            self.country_code = Some(country.to_string());
        }
    }
}
