//! Layout contracts for Shutter.
//!
//! The evaluation engine does not lay widgets out itself; it projects the
//! primitive widget tree into an implementation of [`LayoutEngine`] and reads
//! back committed rectangles. This crate defines that contract plus the
//! box-model attribute types pushed across it, and ships
//! [`MemoryLayoutEngine`], a small reference engine used by tests and demos.

mod engine;
mod geometry;
mod style;

pub use engine::{LayoutEngine, LayoutNodeId, MemoryLayoutEngine};
pub use geometry::{Point, Rect, Size};
pub use style::{Dimension, Direction, EdgeInsets, LayoutStyle};

pub mod prelude {
    pub use crate::engine::{LayoutEngine, LayoutNodeId};
    pub use crate::geometry::{Rect, Size};
    pub use crate::style::{Dimension, Direction, LayoutStyle};
}
