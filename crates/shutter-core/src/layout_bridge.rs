//! Projects the primitive widget subtree into the external layout engine.
//!
//! Composition widgets are transparent here: the bridge re-derives
//! primitive-to-primitive edges by skipping them, then pushes only the
//! structural and attribute changes since the last settled frame. Committed
//! rectangles are cached per key and served to `Scope::measured`.

use crate::collections::map::{HashMap, HashSet};
use crate::key::WidgetKey;
use crate::store::StateStore;
use shutter_layout::{LayoutEngine, LayoutNodeId, LayoutStyle, Rect};

struct BridgeNode {
    node: LayoutNodeId,
    style: LayoutStyle,
    parent: Option<WidgetKey>,
    index: usize,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LayoutUpdate {
    pub inserted: usize,
    pub updated: usize,
    pub moved: usize,
    pub removed: usize,
}

impl LayoutUpdate {
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.moved + self.removed
    }
}

#[derive(Default)]
pub(crate) struct LayoutBridge {
    nodes: HashMap<WidgetKey, BridgeNode>,
    rects: HashMap<WidgetKey, Rect>,
}

/// One primitive node in this frame's projection, in depth-first order.
struct Projected {
    key: WidgetKey,
    parent: Option<WidgetKey>,
    index: usize,
    style: LayoutStyle,
}

impl LayoutBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rects(&self) -> &HashMap<WidgetKey, Rect> {
        &self.rects
    }

    /// Pushes incremental structure/attribute changes for the settled frame.
    /// Unchanged subtrees are not resubmitted.
    pub fn flush(
        &mut self,
        store: &StateStore,
        root: Option<WidgetKey>,
        engine: &mut dyn LayoutEngine,
    ) -> LayoutUpdate {
        let mut projection = Vec::new();
        if let Some(root) = root {
            let mut roots_seen = 0usize;
            collect_primitives(store, root, None, &mut roots_seen, &mut projection);
        }

        let mut update = LayoutUpdate::default();
        let live: HashSet<WidgetKey> = projection.iter().map(|p| p.key).collect();

        // Removals first so sibling indices below refer to surviving nodes.
        let stale: Vec<WidgetKey> = self
            .nodes
            .keys()
            .copied()
            .filter(|key| !live.contains(key))
            .collect();
        for key in stale {
            if let Some(node) = self.nodes.remove(&key) {
                engine.remove(node.node);
                update.removed += 1;
            }
            self.rects.remove(&key);
        }

        for projected in projection {
            let parent_node = projected
                .parent
                .and_then(|parent| self.nodes.get(&parent))
                .map(|bridge| bridge.node);
            match self.nodes.get_mut(&projected.key) {
                None => {
                    let node = engine.insert(parent_node, projected.index, &projected.style);
                    self.nodes.insert(
                        projected.key,
                        BridgeNode {
                            node,
                            style: projected.style,
                            parent: projected.parent,
                            index: projected.index,
                        },
                    );
                    update.inserted += 1;
                }
                Some(existing) => {
                    if existing.parent != projected.parent || existing.index != projected.index {
                        engine.reparent(existing.node, parent_node, projected.index);
                        existing.parent = projected.parent;
                        existing.index = projected.index;
                        update.moved += 1;
                    }
                    if existing.style != projected.style {
                        engine.update_style(existing.node, &projected.style);
                        existing.style = projected.style;
                        update.updated += 1;
                    }
                }
            }
        }
        update
    }

    /// Caches the rectangles the engine committed during `compute`.
    pub fn commit(&mut self, engine: &dyn LayoutEngine) {
        for (key, bridge) in &self.nodes {
            if let Some(rect) = engine.rect_of(bridge.node) {
                self.rects.insert(*key, rect);
            }
        }
    }
}

fn collect_primitives(
    store: &StateStore,
    key: WidgetKey,
    parent: Option<WidgetKey>,
    sibling_cursor: &mut usize,
    out: &mut Vec<Projected>,
) {
    let Some(entry) = store.get(key) else {
        return;
    };
    if let Some(style) = &entry.style {
        let index = *sibling_cursor;
        *sibling_cursor += 1;
        out.push(Projected {
            key,
            parent,
            index,
            style: style.clone(),
        });
        let mut child_cursor = 0usize;
        for child in &entry.children {
            collect_primitives(store, *child, Some(key), &mut child_cursor, out);
        }
    } else {
        // Composition widgets are transparent to the layout tree.
        for child in &entry.children {
            collect_primitives(store, *child, parent, sibling_cursor, out);
        }
    }
}
