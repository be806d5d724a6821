use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseIdError;

pub const ARC_PREFIX: &str = "ac";
pub const TURNING_POINT_PREFIX: &str = "ap";
pub const CHARACTER_PREFIX: &str = "cr";
pub const BOOK_PREFIX: &str = "bk";

pub const ARC_ROOT: &str = "rtac";
pub const CHARACTER_ROOT: &str = "rtcr";
pub const BOOK_ROOT: &str = "rtbk";

/// The closed set of element kinds that live in a story.
///
/// The two-character prefix is only a serialization detail; everything
/// inside the crate branches on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Arc,
    TurningPoint,
    Character,
    Book,
}

impl ElementKind {
    pub const ALL: [ElementKind; 4] = [
        Self::Arc,
        Self::TurningPoint,
        Self::Character,
        Self::Book,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Arc => ARC_PREFIX,
            Self::TurningPoint => TURNING_POINT_PREFIX,
            Self::Character => CHARACTER_PREFIX,
            Self::Book => BOOK_PREFIX,
        }
    }

    /// Human readable name used in generated titles and prompts.
    pub fn label(self) -> &'static str {
        match self {
            Self::Arc => "Arc",
            Self::TurningPoint => "Turning point",
            Self::Character => "Character",
            Self::Book => "Book",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }

    /// The root category that holds top-level elements of this kind.
    /// Turning points have none; they always hang below an arc.
    pub fn root(self) -> Option<Root> {
        match self {
            Self::Arc => Some(Root::Arcs),
            Self::Character => Some(Root::Characters),
            Self::Book => Some(Root::Books),
            Self::TurningPoint => None,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "arc" => Some(Self::Arc),
            "turning_point" | "point" => Some(Self::TurningPoint),
            "character" => Some(Self::Character),
            "book" => Some(Self::Book),
            _ => None,
        }
    }
}

/// A prefix-typed element identifier such as `ac1` or `bk12`.
///
/// The kind is resolved once, when the identifier is created or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ElementId {
    text: String,
    kind: ElementKind,
}

impl ElementId {
    pub fn new(kind: ElementKind, number: u32) -> Self {
        Self {
            text: format!("{}{}", kind.prefix(), number),
            kind,
        }
    }

    pub fn parse(s: &str) -> Result<Self, ParseIdError> {
        let prefix = s
            .get(..2)
            .ok_or_else(|| ParseIdError::Malformed(s.to_string()))?;
        let kind = ElementKind::from_prefix(prefix)
            .ok_or_else(|| ParseIdError::UnknownPrefix(s.to_string()))?;
        if s.len() == 2 || s.chars().any(char::is_whitespace) {
            return Err(ParseIdError::Malformed(s.to_string()));
        }
        Ok(Self {
            text: s.to_string(),
            kind,
        })
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Numeric suffix, if the identifier follows the `<prefix><n>` scheme.
    pub fn number(&self) -> Option<u32> {
        self.text[2..].parse().ok()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for ElementId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ElementId {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ElementId> for String {
    fn from(id: ElementId) -> Self {
        id.text
    }
}

/// The three synthetic categories that anchor the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Root {
    Arcs,
    Characters,
    Books,
}

impl Root {
    pub const ALL: [Root; 3] = [Self::Arcs, Self::Characters, Self::Books];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arcs => ARC_ROOT,
            Self::Characters => CHARACTER_ROOT,
            Self::Books => BOOK_ROOT,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|root| root.as_str() == s)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Arcs => "Arcs",
            Self::Characters => "Characters",
            Self::Books => "Books",
        }
    }

    /// The element kind this root may hold.
    pub fn kind(self) -> ElementKind {
        match self {
            Self::Arcs => ElementKind::Arc,
            Self::Characters => ElementKind::Character,
            Self::Books => ElementKind::Book,
        }
    }
}

/// Any node of the project tree: a synthetic root or an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeId {
    Root(Root),
    Element(ElementId),
}

impl NodeId {
    pub fn parse(s: &str) -> Result<Self, ParseIdError> {
        match Root::from_str(s) {
            Some(root) => Ok(Self::Root(root)),
            None => ElementId::parse(s).map(Self::Element),
        }
    }

    pub fn as_element(&self) -> Option<&ElementId> {
        match self {
            Self::Element(id) => Some(id),
            Self::Root(_) => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root(root) => f.write_str(root.as_str()),
            Self::Element(id) => id.fmt(f),
        }
    }
}

impl FromStr for NodeId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Root> for NodeId {
    fn from(root: Root) -> Self {
        Self::Root(root)
    }
}

impl From<ElementId> for NodeId {
    fn from(id: ElementId) -> Self {
        Self::Element(id)
    }
}

impl From<&ElementId> for NodeId {
    fn from(id: &ElementId) -> Self {
        Self::Element(id.clone())
    }
}

/// Produce the first `<prefix><n>` with `n > floor` that is not yet a key
/// of `collection`.
///
/// Returns `None` only when the numeric space is exhausted.
pub fn create_id<V>(
    collection: &HashMap<ElementId, V>,
    kind: ElementKind,
    floor: u32,
) -> Option<ElementId> {
    let mut number = floor.checked_add(1)?;
    loop {
        let id = ElementId::new(kind, number);
        if !collection.contains_key(&id) {
            return Some(id);
        }
        number = number.checked_add(1)?;
    }
}
