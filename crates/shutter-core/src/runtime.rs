//! The evaluation scheduler and per-frame driver.
//!
//! A frame drains worker writes, then runs delta passes until convergence:
//! each pass applies queued setter writes, evaluates the pass-start dirty set
//! parents-first, and carries entries dirtied during the pass into the next
//! one. Arguments written downward commit only when the parent's evaluation
//! commits, so a chain of N dependent levels settles in N passes — an
//! accepted latency/simplicity trade-off, guarded by a configurable maximum
//! pass count. After convergence the layout bridge pushes incremental
//! updates, layout runs, rects commit, and post-frame effects drain once.

use crate::collections::map::{HashMap, HashSet};
use crate::key::{child_identity, WidgetKey};
use crate::layout_bridge::{LayoutBridge, LayoutUpdate};
use crate::scope::Scope;
use crate::store::{HookWriteError, StateStore};
use crate::widget::Widget;
use crate::worker::WorkerWrite;
use crate::UiError;
use shutter_layout::{LayoutEngine, Rect, Size};
use shutter_render::{content_hash, ContentHash, DrawPrimitive, RenderCache};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;

const ROOT_PARENT_IDENTITY: u64 = 0;

pub struct SchedulerConfig {
    /// Upper bound on delta passes per frame; exceeding it is a fatal
    /// configuration error, not a silent truncation.
    pub max_passes: usize,
    pub viewport: Size,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_passes: 64,
            viewport: Size::new(1280.0, 720.0),
        }
    }
}

struct LocalWrite {
    key: WidgetKey,
    slot: usize,
    value: Box<dyn Any>,
}

pub(crate) struct SchedulerShared {
    local_writes: RefCell<Vec<LocalWrite>>,
    worker_tx: mpsc::Sender<WorkerWrite>,
}

/// Cheap handle setters hold onto the scheduler's write queues.
#[derive(Clone)]
pub(crate) struct SchedulerHandle {
    inner: Rc<SchedulerShared>,
}

impl SchedulerHandle {
    fn new(worker_tx: mpsc::Sender<WorkerWrite>) -> Self {
        Self {
            inner: Rc::new(SchedulerShared {
                local_writes: RefCell::new(Vec::new()),
                worker_tx,
            }),
        }
    }

    pub(crate) fn push_local_write(&self, key: WidgetKey, slot: usize, value: Box<dyn Any>) {
        self.inner
            .local_writes
            .borrow_mut()
            .push(LocalWrite { key, slot, value });
    }

    pub(crate) fn worker_sender(&self) -> mpsc::Sender<WorkerWrite> {
        self.inner.worker_tx.clone()
    }

    fn take_local_writes(&self) -> Vec<LocalWrite> {
        std::mem::take(&mut *self.inner.local_writes.borrow_mut())
    }

    fn has_local_writes(&self) -> bool {
        !self.inner.local_writes.borrow().is_empty()
    }
}

struct EffectEntry {
    key: WidgetKey,
    slot: usize,
    callback: Box<dyn FnOnce()>,
}

/// Deferred post-frame callbacks collected during evaluation and drained
/// synchronously once per frame, after layout commit.
#[derive(Default)]
pub(crate) struct EffectQueue {
    entries: Vec<EffectEntry>,
}

impl EffectQueue {
    /// Registers `callback`, replacing any earlier registration for the same
    /// key and hook slot within this frame.
    pub fn register(&mut self, key: WidgetKey, slot: usize, callback: Box<dyn FnOnce()>) {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.key == key && entry.slot == slot)
        {
            Some(entry) => entry.callback = callback,
            None => self.entries.push(EffectEntry { key, slot, callback }),
        }
    }

    /// Synchronously cancels pending registrations for an unmounted key.
    pub fn cancel(&mut self, key: WidgetKey) {
        self.entries.retain(|entry| entry.key != key);
    }

    fn drain(&mut self) -> Vec<Box<dyn FnOnce()>> {
        self.entries.drain(..).map(|entry| entry.callback).collect()
    }
}

/// Per-evaluation view of frame-wide scheduler state, passed into [`Scope`].
pub(crate) struct FrameCtx<'a> {
    pub effects: &'a mut EffectQueue,
    pub dirty: &'a mut HashSet<WidgetKey>,
    pub rects: &'a HashMap<WidgetKey, Rect>,
    pub handle: SchedulerHandle,
    pub identity_conflicts: &'a mut usize,
}

/// What one frame did; tests use this to assert minimality and convergence.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameReport {
    pub passes: usize,
    pub evaluated: usize,
    pub layout: LayoutUpdate,
    pub identity_conflicts: usize,
    pub effects_run: usize,
}

/// One positioned draw primitive, keyed by content hash for the render cache.
pub struct DrawOp {
    pub key: WidgetKey,
    pub rect: Rect,
    pub hash: ContentHash,
    pub primitive: DrawPrimitive,
}

/// Owns the state store and drives evaluation, layout and effects for a tree.
///
/// Everything here runs on one thread; the only cross-thread entry point is
/// the worker write queue drained at frame boundaries.
pub struct UiRuntime {
    config: SchedulerConfig,
    store: StateStore,
    root: Option<WidgetKey>,
    dirty: HashSet<WidgetKey>,
    effects: EffectQueue,
    bridge: LayoutBridge,
    engine: Box<dyn LayoutEngine>,
    handle: SchedulerHandle,
    worker_rx: mpsc::Receiver<WorkerWrite>,
}

impl UiRuntime {
    pub fn new(engine: Box<dyn LayoutEngine>, config: SchedulerConfig) -> Self {
        let (worker_tx, worker_rx) = mpsc::channel();
        Self {
            config,
            store: StateStore::new(),
            root: None,
            dirty: HashSet::default(),
            effects: EffectQueue::default(),
            bridge: LayoutBridge::new(),
            engine,
            handle: SchedulerHandle::new(worker_tx),
            worker_rx,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn root(&self) -> Option<WidgetKey> {
        self.root
    }

    /// Committed rect for a primitive key, as of the last settled frame.
    pub fn measured(&self, key: WidgetKey) -> Option<Rect> {
        self.bridge.rects().get(&key).copied()
    }

    /// True if queued setter writes or dirty entries warrant another frame.
    /// Worker writes arrive over a channel and need a host-level wakeup.
    pub fn needs_frame(&self) -> bool {
        self.handle.has_local_writes() || !self.dirty.is_empty()
    }

    /// Re-invokes the tree root with fresh external input and runs a frame.
    pub fn render_root(&mut self, widget: Widget) -> Result<FrameReport, UiError> {
        let identity = child_identity(
            ROOT_PARENT_IDENTITY,
            widget.call.0,
            widget.disambiguator,
            0,
        );

        if let Some(root) = self.root {
            let replaced = self
                .store
                .get(root)
                .map(|entry| entry.identity != identity)
                .unwrap_or(true);
            if replaced {
                let mut removed = Vec::new();
                self.store.remove(root, &mut removed);
                self.purge_unmounted(&removed);
                self.root = None;
            }
        }

        let result = self.store.upsert(0, identity, widget);
        if result.conflict {
            self.purge_unmounted(&result.removed);
        }
        if result.dirty || result.conflict {
            self.dirty.insert(result.key);
        }
        self.root = Some(result.key);

        let mut report = self.run_frame()?;
        report.identity_conflicts += usize::from(result.conflict);
        Ok(report)
    }

    /// Runs a frame driven purely by queued writes. Idle (nothing dirty,
    /// nothing queued) frames do no work.
    pub fn advance_frame(&mut self) -> Result<FrameReport, UiError> {
        self.run_frame()
    }

    fn run_frame(&mut self) -> Result<FrameReport, UiError> {
        let mut report = FrameReport::default();

        // Worker writes become visible only here, at the frame boundary.
        self.drain_worker_writes();

        loop {
            self.apply_local_writes();
            if self.dirty.is_empty() {
                break;
            }
            report.passes += 1;
            if report.passes > self.config.max_passes {
                let mut dirty: Vec<WidgetKey> = self
                    .dirty
                    .iter()
                    .copied()
                    .filter(|key| self.store.is_alive(*key))
                    .collect();
                dirty.sort_unstable();
                return Err(UiError::NonConvergence {
                    passes: self.config.max_passes,
                    dirty,
                });
            }

            let mut batch: Vec<WidgetKey> = self.dirty.drain().collect();
            batch.sort_unstable_by_key(|key| (self.store.depth_of(*key), *key));
            log::trace!("delta pass {}: {} dirty entries", report.passes, batch.len());

            for key in batch {
                if !self.store.is_alive(key) || !self.store.is_dirty(key) {
                    continue;
                }
                let conflicts = self.evaluate(key)?;
                report.evaluated += 1;
                report.identity_conflicts += conflicts;
            }
        }

        report.layout = self
            .bridge
            .flush(&self.store, self.root, self.engine.as_mut());
        self.engine.compute(self.config.viewport);
        self.bridge.commit(self.engine.as_ref());

        let callbacks = self.effects.drain();
        report.effects_run = callbacks.len();
        for callback in callbacks {
            callback();
        }

        Ok(report)
    }

    /// Evaluates one widget: runs its stored body against a fresh [`Scope`],
    /// reconciles the children it produced, and clears its dirty mark.
    fn evaluate(&mut self, key: WidgetKey) -> Result<usize, UiError> {
        let (body, identity, depth) = match self.store.get(key) {
            Some(entry) => (entry.body.clone(), entry.identity, entry.depth),
            None => return Ok(0),
        };

        let mut conflicts = 0usize;
        let (children, error) = {
            let frame = FrameCtx {
                effects: &mut self.effects,
                dirty: &mut self.dirty,
                rects: self.bridge.rects(),
                handle: self.handle.clone(),
                identity_conflicts: &mut conflicts,
            };
            let mut scope = Scope::new(key, identity, depth, &mut self.store, frame);
            if let Some(body) = &body {
                body(&mut scope);
            }
            scope.finish()
        };
        if let Some(error) = error {
            return Err(error);
        }

        let removed = self.store.reconcile_children(key, children);
        self.purge_unmounted(&removed);
        self.store.clear_dirty(key);
        Ok(conflicts)
    }

    fn apply_local_writes(&mut self) {
        for write in self.handle.take_local_writes() {
            match self.store.write_hook(write.key, write.slot, write.value) {
                Ok(()) => {
                    self.dirty.insert(write.key);
                }
                Err(HookWriteError::Unmounted) => {
                    log::warn!("setter write to unmounted widget {}; ignored", write.key);
                }
                Err(error) => {
                    log::warn!("setter write to {} rejected: {error:?}", write.key);
                }
            }
        }
    }

    fn drain_worker_writes(&mut self) {
        while let Ok(write) = self.worker_rx.try_recv() {
            match self.store.write_hook(write.key, write.slot, write.value) {
                Ok(()) => {
                    self.dirty.insert(write.key);
                }
                Err(HookWriteError::Unmounted) => {
                    // Benign race: the worker has not observed the unmount.
                    log::warn!("worker write to unmounted widget {}; ignored", write.key);
                }
                Err(error) => {
                    log::warn!("worker write to {} rejected: {error:?}", write.key);
                }
            }
        }
    }

    fn purge_unmounted(&mut self, removed: &[WidgetKey]) {
        for key in removed {
            self.effects.cancel(*key);
            self.dirty.remove(key);
        }
    }

    /// Paint-ordered draw list for the settled frame, each op keyed by the
    /// content hash of its primitive.
    pub fn draw_list(&self) -> Vec<DrawOp> {
        let mut ops = Vec::new();
        if let Some(root) = self.root {
            self.collect_draw(root, &mut ops);
        }
        ops
    }

    /// Resolves every draw op against a render cache and returns the list.
    pub fn resolve_draw(&self, cache: &mut dyn RenderCache) -> Vec<DrawOp> {
        let ops = self.draw_list();
        for op in &ops {
            cache.resolve(op.hash, &op.primitive);
        }
        ops
    }

    fn collect_draw(&self, key: WidgetKey, out: &mut Vec<DrawOp>) {
        let Some(entry) = self.store.get(key) else {
            return;
        };
        if entry.is_primitive() {
            let rect = self.measured(key).unwrap_or_default();
            for primitive in &entry.draw {
                out.push(DrawOp {
                    key,
                    rect,
                    hash: content_hash(primitive),
                    primitive: primitive.clone(),
                });
            }
        }
        for child in &entry.children {
            self.collect_draw(*child, out);
        }
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
