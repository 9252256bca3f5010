//! Assertion helpers over committed layout rectangles.

use shutter_layout::Rect;

/// Positional tolerance for float comparisons, in logical pixels.
const EPSILON: f32 = 0.25;

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() <= EPSILON
}

/// Chainable assertions on a measured rect.
///
/// Implemented for `Option<Rect>` so lookups can assert directly:
///
/// ```
/// use shutter_layout::Rect;
/// use shutter_testing::RectAssert;
///
/// Some(Rect::new(0.0, 20.0, 80.0, 20.0)).at(0.0, 20.0).sized(80.0, 20.0);
/// ```
pub trait RectAssert {
    fn at(self, x: f32, y: f32) -> Rect;
    fn sized(self, width: f32, height: f32) -> Rect;
}

impl RectAssert for Option<Rect> {
    fn at(self, x: f32, y: f32) -> Rect {
        match self {
            Some(rect) => rect.at(x, y),
            None => panic!("widget has no committed rect"),
        }
    }

    fn sized(self, width: f32, height: f32) -> Rect {
        match self {
            Some(rect) => rect.sized(width, height),
            None => panic!("widget has no committed rect"),
        }
    }
}

impl RectAssert for Rect {
    fn at(self, x: f32, y: f32) -> Rect {
        assert!(
            close(self.x, x) && close(self.y, y),
            "expected origin ({x}, {y}), got ({}, {})",
            self.x,
            self.y
        );
        self
    }

    fn sized(self, width: f32, height: f32) -> Rect {
        assert!(
            close(self.width, width) && close(self.height, height),
            "expected size ({width}, {height}), got ({}, {})",
            self.width,
            self.height
        );
        self
    }
}
