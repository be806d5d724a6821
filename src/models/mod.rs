//! Entity records of a story project.
//!
//! # Core Concepts
//!
//! - [`ProjectInfo`]: Project-level attributes of the story itself (one per project).
//! - [`Arc`]: A plot thread owning an ordered sequence of turning points.
//! - [`TurningPoint`]: A plot event inside exactly one arc, optionally referencing books.
//! - [`Character`]: A story participant; flat collection, no children.
//! - [`Book`]: A work or document associated with the story; flat collection, no children.
//!
//! Records are plain data. They never reach back to the story that owns them;
//! mutations go through [`crate::story::Story::edit`], which detects the change
//! and raises the modification flag.

mod arc;
mod book;
mod character;
mod element;
mod project;
mod turning_point;

pub use arc::*;
pub use book::*;
pub use character::*;
pub use element::*;
pub use project::*;
pub use turning_point::*;

/// Common capability of every entity record.
pub trait Entity: Clone + PartialEq {
    const KIND: ElementKind;

    fn title(&self) -> &str;
    fn description(&self) -> &str;
}
