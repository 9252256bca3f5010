//! Testing utilities and harness for Shutter.

pub mod assertions;
pub mod rule;

pub use assertions::RectAssert;
pub use rule::UiTestRule;

pub mod prelude {
    pub use crate::assertions::RectAssert;
    pub use crate::rule::UiTestRule;
}
