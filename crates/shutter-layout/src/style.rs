//! Box-model attributes accepted by the layout contract.
//!
//! These are plain value types with structural equality; the layout bridge
//! compares them to decide whether an update needs to be resubmitted.

/// Requested extent along one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Dimension {
    /// Derive from content: children extent plus padding.
    #[default]
    Auto,
    /// Fixed size in logical pixels.
    Points(f32),
    /// Fraction of the space the parent makes available (0.0..=1.0).
    Fraction(f32),
}

/// Main axis along which a node stacks its children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    Row,
    #[default]
    Column,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EdgeInsets {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl EdgeInsets {
    pub fn all(value: f32) -> Self {
        Self {
            left: value,
            top: value,
            right: value,
            bottom: value,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// Layout attributes carried by one primitive widget.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutStyle {
    pub width: Dimension,
    pub height: Dimension,
    pub direction: Direction,
    pub padding: EdgeInsets,
    /// Spacing inserted between consecutive children on the main axis.
    pub gap: f32,
}

impl LayoutStyle {
    pub fn sized(width: f32, height: f32) -> Self {
        Self {
            width: Dimension::Points(width),
            height: Dimension::Points(height),
            ..Self::default()
        }
    }

    pub fn row() -> Self {
        Self {
            direction: Direction::Row,
            ..Self::default()
        }
    }

    pub fn column() -> Self {
        Self {
            direction: Direction::Column,
            ..Self::default()
        }
    }

    pub fn with_padding(mut self, padding: EdgeInsets) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_gap(mut self, gap: f32) -> Self {
        self.gap = gap;
        self
    }
}
