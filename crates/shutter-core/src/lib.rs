//! Incremental evaluation engine for a declarative UI tree.
//!
//! Widget bodies are plain closures that read state through a [`Scope`] and
//! emit child [`Widget`] descriptions. The engine keeps per-widget state alive
//! across frames keyed by structural identity, detects which invocations
//! actually changed, and re-evaluates only those, settling the tree in
//! repeated delta passes before pushing incremental updates to a pluggable
//! layout engine.
//!
//! ```
//! use shutter_core::{widget, Scope, SchedulerConfig, UiRuntime};
//! use shutter_layout::{LayoutStyle, MemoryLayoutEngine};
//!
//! let engine = Box::new(MemoryLayoutEngine::new());
//! let mut runtime = UiRuntime::new(engine, SchedulerConfig::default());
//!
//! let root = widget!("counter").body(|scope: &mut Scope<'_>| {
//!     let (count, set_count) = scope.use_state(|| 0u32);
//!     if count == 0 {
//!         set_count.set(count + 1);
//!     }
//!     scope.child(widget!("label").arg(count).style(LayoutStyle::sized(80.0, 20.0)));
//! });
//! let report = runtime.render_root(root).unwrap();
//! assert!(report.passes >= 1);
//! ```

mod args;
mod collections;
pub mod hash;
mod key;
mod layout_bridge;
mod runtime;
mod scope;
mod store;
mod widget;
mod worker;

pub use args::{args_differ, Argument, ValueArg};
pub use key::{location_key, CallSite, WidgetKey};
pub use layout_bridge::LayoutUpdate;
pub use runtime::{DrawOp, FrameReport, SchedulerConfig, UiRuntime};
pub use scope::{Scope, StateSetter};
pub use store::{HookKind, StateStore};
pub use widget::Widget;
pub use worker::{StateHandle, WorkerLink};

use std::fmt;

/// Fatal evaluation errors. The frame that produced one did not commit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UiError {
    /// A widget body invoked its hooks in a different order or with different
    /// types than the previous evaluation of the same instance.
    HookOrderViolation {
        key: WidgetKey,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
    /// Delta passes exceeded the configured maximum without the dirty set
    /// draining, which means state writes form a cycle (or `max_passes` is
    /// smaller than the tree's dependency depth).
    NonConvergence {
        passes: usize,
        dirty: Vec<WidgetKey>,
    },
}

impl fmt::Display for UiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiError::HookOrderViolation {
                key,
                index,
                expected,
                found,
            } => write!(
                f,
                "hook order violation at {key} slot {index}: expected {expected}, found {found}"
            ),
            UiError::NonConvergence { passes, dirty } => write!(
                f,
                "evaluation did not converge after {passes} passes; {} entries still dirty",
                dirty.len()
            ),
        }
    }
}

impl std::error::Error for UiError {}
