//! Headless test rule driving a real [`UiRuntime`] frame by frame.
//!
//! # Example
//!
//! ```
//! use shutter_core::{widget, Scope};
//! use shutter_layout::LayoutStyle;
//! use shutter_testing::UiTestRule;
//!
//! let mut rule = UiTestRule::new(800.0, 600.0);
//! rule.show(widget!("app").body(|scope: &mut Scope<'_>| {
//!     scope.child(widget!("box").style(LayoutStyle::sized(100.0, 40.0)));
//! }));
//! rule.wait_for_idle();
//! ```

use shutter_core::{
    DrawOp, FrameReport, SchedulerConfig, UiError, UiRuntime, Widget, WidgetKey,
};
use shutter_layout::{MemoryLayoutEngine, Rect, Size};
use shutter_render::MemoryRenderCache;

/// Frames [`UiTestRule::wait_for_idle`] is willing to pump before declaring
/// the tree unstable.
const IDLE_FRAME_LIMIT: usize = 64;

/// Owns a runtime wired to the in-memory layout engine and render cache.
pub struct UiTestRule {
    runtime: UiRuntime,
    cache: MemoryRenderCache,
    last_report: FrameReport,
}

impl UiTestRule {
    pub fn new(width: f32, height: f32) -> Self {
        let config = SchedulerConfig {
            viewport: Size::new(width, height),
            ..SchedulerConfig::default()
        };
        Self {
            runtime: UiRuntime::new(Box::new(MemoryLayoutEngine::new()), config),
            cache: MemoryRenderCache::new(),
            last_report: FrameReport::default(),
        }
    }

    /// Renders `widget` as the tree root and settles the frame.
    ///
    /// Panics on fatal evaluation errors; use [`UiTestRule::try_show`] in
    /// tests that assert on them.
    pub fn show(&mut self, widget: Widget) -> FrameReport {
        match self.try_show(widget) {
            Ok(report) => report,
            Err(error) => panic!("frame failed: {error}"),
        }
    }

    pub fn try_show(&mut self, widget: Widget) -> Result<FrameReport, UiError> {
        let report = self.runtime.render_root(widget)?;
        self.last_report = report;
        Ok(report)
    }

    /// Runs one write-driven frame.
    pub fn advance(&mut self) -> Result<FrameReport, UiError> {
        let report = self.runtime.advance_frame()?;
        self.last_report = report;
        Ok(report)
    }

    /// Pumps frames until no queued work remains. Returns the number of
    /// frames run; panics if the tree keeps scheduling itself past the limit.
    pub fn wait_for_idle(&mut self) -> usize {
        let mut frames = 0;
        while self.runtime.needs_frame() {
            if frames == IDLE_FRAME_LIMIT {
                panic!("tree still scheduling work after {IDLE_FRAME_LIMIT} frames");
            }
            match self.advance() {
                Ok(report) => {
                    log::trace!("idle pump frame {frames}: {report:?}");
                    frames += 1;
                }
                Err(error) => panic!("frame failed: {error}"),
            }
        }
        frames
    }

    /// Committed layout rect of a widget, from the last settled frame.
    pub fn rect_of(&self, key: WidgetKey) -> Option<Rect> {
        self.runtime.measured(key)
    }

    /// Paint-ordered draw list, resolved through the in-memory render cache.
    pub fn draw(&mut self) -> Vec<DrawOp> {
        self.runtime.resolve_draw(&mut self.cache)
    }

    pub fn cache(&self) -> &MemoryRenderCache {
        &self.cache
    }

    pub fn last_report(&self) -> FrameReport {
        self.last_report
    }

    /// Number of mounted widget instances.
    pub fn mounted(&self) -> usize {
        self.runtime.store().len()
    }

    pub fn runtime(&self) -> &UiRuntime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut UiRuntime {
        &mut self.runtime
    }
}
