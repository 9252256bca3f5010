//! The state store: an arena of per-widget entries keyed by identity.
//!
//! Entries are exclusively owned by the store. Keys held elsewhere (children
//! lists, setters, worker handles) are weak back-references: identity plus
//! lookup, never ownership, so unmounting a subtree cannot leave cycles or
//! dangling owners behind.

use crate::args::{args_differ, Argument};
use crate::collections::map::HashMap;
use crate::key::WidgetKey;
use crate::widget::{Widget, WidgetBody};
use shutter_layout::LayoutStyle;
use shutter_render::DrawPrimitive;
use smallvec::SmallVec;
use std::any::Any;

/// Ordinal hook slot kinds, used to detect hook-order violations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HookKind {
    State,
    Effect,
    Cleanup,
}

impl HookKind {
    pub fn name(self) -> &'static str {
        match self {
            HookKind::State => "state",
            HookKind::Effect => "effect",
            HookKind::Cleanup => "cleanup",
        }
    }
}

pub(crate) enum HookSlot {
    State(Box<dyn Any>),
    Effect,
    Cleanup(Option<Box<dyn FnOnce()>>),
}

impl HookSlot {
    pub(crate) fn kind(&self) -> HookKind {
        match self {
            HookSlot::State(_) => HookKind::State,
            HookSlot::Effect => HookKind::Effect,
            HookSlot::Cleanup(_) => HookKind::Cleanup,
        }
    }
}

pub(crate) struct StateEntry {
    pub name: &'static str,
    pub identity: u64,
    pub depth: usize,
    pub args: SmallVec<[Argument; 4]>,
    pub prev_args: SmallVec<[Argument; 4]>,
    pub hooks: Vec<HookSlot>,
    pub children: SmallVec<[WidgetKey; 4]>,
    pub dirty: bool,
    pub style: Option<LayoutStyle>,
    pub draw: Vec<DrawPrimitive>,
    pub body: Option<WidgetBody>,
}

impl StateEntry {
    fn new(widget: Widget, identity: u64, depth: usize) -> Self {
        Self {
            name: widget.name,
            identity,
            depth,
            args: widget.args,
            prev_args: SmallVec::new(),
            hooks: Vec::new(),
            children: SmallVec::new(),
            dirty: true,
            style: widget.style,
            draw: widget.draw,
            body: widget.body,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.style.is_some()
    }

    fn run_cleanups(hooks: Vec<HookSlot>) {
        for hook in hooks {
            if let HookSlot::Cleanup(Some(cleanup)) = hook {
                cleanup();
            }
        }
    }
}

pub(crate) struct UpsertResult {
    pub key: WidgetKey,
    pub created: bool,
    /// Arguments differ from the previous frame (or the entry is fresh).
    pub dirty: bool,
    pub conflict: bool,
    /// Keys unmounted while recovering from an identity conflict.
    pub removed: Vec<WidgetKey>,
}

#[derive(Debug, Eq, PartialEq)]
pub(crate) enum HookWriteError {
    Unmounted,
    NotAStateSlot,
    OutOfRange,
}

struct Slot {
    generation: u32,
    entry: Option<StateEntry>,
}

/// Tree of state entries mirroring the widget-call graph.
#[derive(Default)]
pub struct StateStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    identities: HashMap<u64, WidgetKey>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mounted entries.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_alive(&self, key: WidgetKey) -> bool {
        self.get(key).is_some()
    }

    pub(crate) fn get(&self, key: WidgetKey) -> Option<&StateEntry> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    pub(crate) fn entry_mut(&mut self, key: WidgetKey) -> Option<&mut StateEntry> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    pub(crate) fn depth_of(&self, key: WidgetKey) -> usize {
        self.get(key).map(|entry| entry.depth).unwrap_or(usize::MAX)
    }

    pub(crate) fn is_dirty(&self, key: WidgetKey) -> bool {
        self.get(key).map(|entry| entry.dirty).unwrap_or(false)
    }

    pub(crate) fn clear_dirty(&mut self, key: WidgetKey) {
        if let Some(entry) = self.entry_mut(key) {
            entry.dirty = false;
        }
    }

    /// Creates or updates the entry for `identity`, rotating arguments and
    /// running the change detector.
    ///
    /// An entry whose stored shape (widget kind or argument count) disagrees
    /// with the incoming call is an identity conflict: two logical instances
    /// resolved to one identity. The entry is remounted fresh — children
    /// unmounted, hook state dropped — and the conflict is reported upward
    /// rather than silently reusing stale state.
    pub(crate) fn upsert(
        &mut self,
        depth: usize,
        identity: u64,
        widget: Widget,
    ) -> UpsertResult {
        if let Some(&key) = self.identities.get(&identity) {
            if self.is_alive(key) {
                return self.update_existing(key, depth, widget);
            }
        }

        let key = self.allocate(StateEntry::new(widget, identity, depth));
        self.identities.insert(identity, key);
        UpsertResult {
            key,
            created: true,
            dirty: true,
            conflict: false,
            removed: Vec::new(),
        }
    }

    fn update_existing(&mut self, key: WidgetKey, depth: usize, widget: Widget) -> UpsertResult {
        let (conflict, orphans) = {
            let entry = self.entry_mut(key).expect("entry checked alive");
            let conflict = entry.name != widget.name || entry.args.len() != widget.args.len();
            if conflict {
                log::error!(
                    "identity conflict for key {key}: stored '{}' ({} args) vs incoming '{}' ({} args); remounting fresh",
                    entry.name,
                    entry.args.len(),
                    widget.name,
                    widget.args.len()
                );
                let hooks = std::mem::take(&mut entry.hooks);
                let orphans = std::mem::take(&mut entry.children);
                entry.name = widget.name;
                entry.depth = depth;
                entry.args = widget.args;
                entry.prev_args = SmallVec::new();
                entry.style = widget.style;
                entry.draw = widget.draw;
                entry.body = widget.body;
                entry.dirty = true;
                StateEntry::run_cleanups(hooks);
                (true, orphans)
            } else {
                let previous = std::mem::replace(&mut entry.args, widget.args);
                let changed = args_differ(&previous, &entry.args);
                entry.prev_args = previous;
                entry.depth = depth;
                entry.style = widget.style;
                entry.draw = widget.draw;
                entry.body = widget.body;
                if changed {
                    entry.dirty = true;
                }
                return UpsertResult {
                    key,
                    created: false,
                    dirty: changed,
                    conflict: false,
                    removed: Vec::new(),
                };
            }
        };

        let mut removed = Vec::new();
        for orphan in orphans {
            self.remove(orphan, &mut removed);
        }
        UpsertResult {
            key,
            created: false,
            dirty: true,
            conflict,
            removed,
        }
    }

    fn allocate(&mut self, entry: StateEntry) -> WidgetKey {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                WidgetKey {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                WidgetKey {
                    index,
                    generation: 0,
                }
            }
        }
    }

    pub(crate) fn read_hook(&self, key: WidgetKey, index: usize) -> Option<&HookSlot> {
        self.get(key)?.hooks.get(index)
    }

    /// Writes through to a state hook slot and leaves dirty-marking to the
    /// caller. Rejects writes to unmounted keys so late worker writes can be
    /// downgraded to diagnostics.
    pub(crate) fn write_hook(
        &mut self,
        key: WidgetKey,
        index: usize,
        value: Box<dyn Any>,
    ) -> Result<(), HookWriteError> {
        let entry = self.entry_mut(key).ok_or(HookWriteError::Unmounted)?;
        match entry.hooks.get_mut(index) {
            Some(HookSlot::State(slot)) => {
                *slot = value;
                entry.dirty = true;
                Ok(())
            }
            Some(_) => Err(HookWriteError::NotAStateSlot),
            None => Err(HookWriteError::OutOfRange),
        }
    }

    /// Replaces the stored child list, unmounting children the evaluation no
    /// longer produced. Returns every unmounted key, descendants included.
    pub(crate) fn reconcile_children(
        &mut self,
        key: WidgetKey,
        children: SmallVec<[WidgetKey; 4]>,
    ) -> Vec<WidgetKey> {
        let previous = match self.entry_mut(key) {
            Some(entry) => std::mem::replace(&mut entry.children, children.clone()),
            None => return Vec::new(),
        };
        let mut removed = Vec::new();
        for child in previous {
            if !children.contains(&child) {
                self.remove(child, &mut removed);
            }
        }
        removed
    }

    /// Recursively unmounts `key`, running each cleanup exactly once
    /// (children first) and appending every unmounted key to `out`.
    pub(crate) fn remove(&mut self, key: WidgetKey, out: &mut Vec<WidgetKey>) {
        let entry = {
            let slot = match self.slots.get_mut(key.index as usize) {
                Some(slot) if slot.generation == key.generation => slot,
                _ => return,
            };
            match slot.entry.take() {
                Some(entry) => {
                    slot.generation = slot.generation.wrapping_add(1);
                    entry
                }
                None => return,
            }
        };
        self.free.push(key.index);
        self.identities.remove(&entry.identity);
        for child in &entry.children {
            self.remove(*child, out);
        }
        StateEntry::run_cleanups(entry.hooks);
        out.push(key);
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
