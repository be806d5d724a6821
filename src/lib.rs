//! Storyliner: outline the arcs, turning points, characters and books of a
//! story, kept in a `.stlx` project file.

pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod stlx;
pub mod story;
pub mod tree_render;

pub use controller::{Frontend, ProjectController, ProjectState};
pub use error::{ParseIdError, ProjectError, StlxError};
pub use story::{AddElementInput, ChangeObserver, Story};
