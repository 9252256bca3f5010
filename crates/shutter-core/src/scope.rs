//! The hook context handed to widget bodies during evaluation.
//!
//! This is an explicit parameter object rather than an ambient thread-local:
//! the scheduler constructs one `Scope` per evaluated widget, which keeps
//! evaluation reentrant and directly testable.
//!
//! Hooks associate by ordinal position within the body, so a body must invoke
//! its hooks in the same order every evaluation. A kind or type mismatch at a
//! slot is a hook-order violation and fails the frame.

use crate::collections::map::HashMap;
use crate::key::{child_identity, hash_disambiguator, WidgetKey};
use crate::runtime::{FrameCtx, SchedulerHandle};
use crate::store::{HookKind, HookSlot, StateStore};
use crate::widget::Widget;
use crate::worker::StateHandle;
use crate::UiError;
use shutter_layout::Rect;
use smallvec::SmallVec;
use std::any::type_name;
use std::marker::PhantomData;

/// Writes through to one state hook slot.
///
/// Writes are applied at the next scheduler pass boundary, never re-entrantly
/// within the pass that issued them.
pub struct StateSetter<T> {
    handle: SchedulerHandle,
    key: WidgetKey,
    slot: usize,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            key: self.key,
            slot: self.slot,
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> StateSetter<T> {
    pub(crate) fn new(handle: SchedulerHandle, key: WidgetKey, slot: usize) -> Self {
        Self {
            handle,
            key,
            slot,
            _marker: PhantomData,
        }
    }

    pub fn set(&self, value: T) {
        self.handle
            .push_local_write(self.key, self.slot, Box::new(value));
    }

    pub fn key(&self) -> WidgetKey {
        self.key
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot
    }
}

pub struct Scope<'a> {
    key: WidgetKey,
    identity: u64,
    depth: usize,
    store: &'a mut StateStore,
    frame: FrameCtx<'a>,
    cursor: usize,
    children: SmallVec<[WidgetKey; 4]>,
    occurrences: HashMap<u64, u32>,
    error: Option<UiError>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        key: WidgetKey,
        identity: u64,
        depth: usize,
        store: &'a mut StateStore,
        frame: FrameCtx<'a>,
    ) -> Self {
        Self {
            key,
            identity,
            depth,
            store,
            frame,
            cursor: 0,
            children: SmallVec::new(),
            occurrences: HashMap::default(),
            error: None,
        }
    }

    /// Key of the widget being evaluated.
    pub fn key(&self) -> WidgetKey {
        self.key
    }

    /// Persistent state cell bound to this widget and hook position.
    ///
    /// `init` runs only on first mount of the slot; afterwards the stored
    /// value is returned. The setter is cheap to clone into event handlers.
    pub fn use_state<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> (T, StateSetter<T>) {
        let index = self.next_hook();
        let setter = StateSetter::new(self.frame.handle.clone(), self.key, index);

        enum Outcome<T> {
            Read(T),
            Append,
            Mismatch(&'static str),
        }

        let outcome = {
            let entry = self
                .store
                .entry_mut(self.key)
                .expect("evaluated entry is mounted");
            match entry.hooks.get(index) {
                Some(HookSlot::State(value)) => match value.downcast_ref::<T>() {
                    Some(value) => Outcome::Read(value.clone()),
                    None => Outcome::Mismatch(HookKind::State.name()),
                },
                Some(other) => Outcome::Mismatch(other.kind().name()),
                None => Outcome::Append,
            }
        };

        let value = match outcome {
            Outcome::Read(value) => value,
            Outcome::Append => {
                let value = init();
                self.push_hook(HookSlot::State(Box::new(value.clone())));
                value
            }
            Outcome::Mismatch(found) => {
                self.record_violation(index, type_name::<T>(), found);
                let value = init();
                self.replace_hook(index, HookSlot::State(Box::new(value.clone())));
                value
            }
        };
        (value, setter)
    }

    /// Registers `effect` to run once after this frame's evaluation, layout
    /// and commit complete. A later registration in the same frame for the
    /// same widget and hook position replaces the earlier one. Unmounting the
    /// widget cancels the registration.
    pub fn use_effect_after_frame(&mut self, effect: impl FnOnce() + 'static) {
        let index = self.next_hook();
        match self.expect_hook(index, HookKind::Effect) {
            Ok(true) => {}
            Ok(false) => self.push_hook(HookSlot::Effect),
            Err(found) => {
                self.record_violation(index, HookKind::Effect.name(), found);
                self.replace_hook(index, HookSlot::Effect);
            }
        }
        self.frame.effects.register(self.key, index, Box::new(effect));
    }

    /// Registers `cleanup` to run exactly once when this widget unmounts.
    /// Re-evaluations replace the stored callback.
    pub fn on_unmount(&mut self, cleanup: impl FnOnce() + 'static) {
        let index = self.next_hook();
        let slot = HookSlot::Cleanup(Some(Box::new(cleanup)));
        match self.expect_hook(index, HookKind::Cleanup) {
            Ok(true) => self.replace_hook(index, slot),
            Ok(false) => self.push_hook(slot),
            Err(found) => {
                self.record_violation(index, HookKind::Cleanup.name(), found);
                self.replace_hook(index, slot);
            }
        }
    }

    /// Committed layout rect of this widget from the previous frame.
    ///
    /// Empty on the first frame a primitive appears (layout has not run yet);
    /// callers must tolerate the one-frame lag.
    pub fn measured(&self) -> Option<Rect> {
        self.measured_of(self.key)
    }

    pub fn measured_of(&self, key: WidgetKey) -> Option<Rect> {
        self.frame.rects.get(&key).copied()
    }

    /// Emits a child widget and returns its key.
    ///
    /// Identity derives from this widget's identity, the child's call site,
    /// its disambiguator, and a position-within-kind occurrence counter. The
    /// child is not evaluated inline; if its arguments changed it joins the
    /// next delta pass.
    pub fn child(&mut self, widget: Widget) -> WidgetKey {
        let location = widget.call.0;
        let occurrence_key = hash_disambiguator(&(location, widget.disambiguator));
        let counter = self.occurrences.entry(occurrence_key).or_insert(0);
        let occurrence = *counter;
        *counter += 1;

        let identity = child_identity(self.identity, location, widget.disambiguator, occurrence);
        let result = self.store.upsert(self.depth + 1, identity, widget);

        if result.conflict {
            *self.frame.identity_conflicts += 1;
            for removed in &result.removed {
                self.frame.effects.cancel(*removed);
                self.frame.dirty.remove(removed);
            }
        }
        if result.dirty {
            self.frame.dirty.insert(result.key);
        }
        if self.children.contains(&result.key) {
            log::error!(
                "widget {} emitted key {} twice in one evaluation; duplicate dropped",
                self.key,
                result.key
            );
            return result.key;
        }
        self.children.push(result.key);
        result.key
    }

    /// Thread-safe write handle for `setter`, for handing to worker threads.
    /// Obtain it during evaluation; writes land at the next frame boundary.
    pub fn worker_handle<T: Send + 'static>(&self, setter: &StateSetter<T>) -> StateHandle<T> {
        StateHandle::new(self.frame.handle.worker_sender(), setter.key(), setter.slot())
    }

    pub(crate) fn finish(self) -> (SmallVec<[WidgetKey; 4]>, Option<UiError>) {
        (self.children, self.error)
    }

    fn next_hook(&mut self) -> usize {
        let index = self.cursor;
        self.cursor += 1;
        index
    }

    /// Ok(true): slot exists with the expected kind. Ok(false): slot is new.
    /// Err: kind mismatch, with the found kind's name.
    fn expect_hook(&mut self, index: usize, kind: HookKind) -> Result<bool, &'static str> {
        match self.store.read_hook(self.key, index) {
            Some(slot) if slot.kind() == kind => Ok(true),
            Some(slot) => Err(slot.kind().name()),
            None => Ok(false),
        }
    }

    fn push_hook(&mut self, slot: HookSlot) {
        if let Some(entry) = self.store.entry_mut(self.key) {
            entry.hooks.push(slot);
        }
    }

    fn replace_hook(&mut self, index: usize, slot: HookSlot) {
        if let Some(entry) = self.store.entry_mut(self.key) {
            if let Some(existing) = entry.hooks.get_mut(index) {
                *existing = slot;
            } else {
                entry.hooks.push(slot);
            }
        }
    }

    fn record_violation(&mut self, index: usize, expected: &'static str, found: &'static str) {
        // First violation wins; the subtree is already in a known-bad state.
        if self.error.is_none() {
            self.error = Some(UiError::HookOrderViolation {
                key: self.key,
                index,
                expected,
                found,
            });
        }
    }
}
