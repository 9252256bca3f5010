//! The layout engine contract and an in-memory reference implementation.

use crate::geometry::{Point, Rect, Size};
use crate::style::{Dimension, Direction, LayoutStyle};
use smallvec::SmallVec;

pub type LayoutNodeId = usize;

/// Incremental layout engine consumed by the evaluation engine's layout bridge.
///
/// The bridge only pushes mutations for nodes that actually changed; an engine
/// is expected to keep enough dirty-tracking to avoid recomputing unaffected
/// regions in [`LayoutEngine::compute`].
pub trait LayoutEngine {
    /// Inserts a node under `parent` at `index` (clamped to the child count).
    /// `None` makes the node a root.
    fn insert(
        &mut self,
        parent: Option<LayoutNodeId>,
        index: usize,
        style: &LayoutStyle,
    ) -> LayoutNodeId;

    /// Replaces the box-model attributes of an existing node.
    fn update_style(&mut self, node: LayoutNodeId, style: &LayoutStyle);

    /// Moves a node (and its subtree) to a new parent/position.
    fn reparent(&mut self, node: LayoutNodeId, parent: Option<LayoutNodeId>, index: usize);

    /// Removes a node and its subtree. Removing an already-removed node is a
    /// no-op so callers may remove in any order.
    fn remove(&mut self, node: LayoutNodeId);

    /// Recomputes positions and sizes for regions affected by mutations since
    /// the previous call.
    fn compute(&mut self, viewport: Size);

    /// Committed rectangle from the most recent [`LayoutEngine::compute`].
    fn rect_of(&self, node: LayoutNodeId) -> Option<Rect>;
}

struct LayoutNode {
    style: LayoutStyle,
    parent: Option<LayoutNodeId>,
    children: SmallVec<[LayoutNodeId; 4]>,
    size: Size,
    rect: Rect,
    needs_layout: bool,
}

impl LayoutNode {
    fn new(style: LayoutStyle, parent: Option<LayoutNodeId>) -> Self {
        Self {
            style,
            parent,
            children: SmallVec::new(),
            size: Size::ZERO,
            rect: Rect::default(),
            needs_layout: true,
        }
    }
}

/// Reference box-model engine: stacks children along a row or column with
/// padding and gaps. Kept deliberately small; production backends implement
/// [`LayoutEngine`] over a real flex/grid solver.
#[derive(Default)]
pub struct MemoryLayoutEngine {
    nodes: Vec<Option<LayoutNode>>,
    roots: Vec<LayoutNodeId>,
    relayouts: usize,
}

impl MemoryLayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of root relayouts performed across all `compute` calls.
    /// Tests use this to assert that unchanged frames do no layout work.
    pub fn relayout_count(&self) -> usize {
        self.relayouts
    }

    fn node(&self, id: LayoutNodeId) -> Option<&LayoutNode> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    fn node_mut(&mut self, id: LayoutNodeId) -> Option<&mut LayoutNode> {
        self.nodes.get_mut(id).and_then(|n| n.as_mut())
    }

    /// Walks up the parent chain setting `needs_layout`, stopping early at an
    /// already-dirty ancestor.
    fn bubble_dirty(&mut self, id: LayoutNodeId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.node_mut(current) {
                Some(node) if !node.needs_layout => {
                    node.needs_layout = true;
                    cursor = node.parent;
                }
                Some(_) => break,
                None => break,
            }
        }
    }

    fn detach(&mut self, id: LayoutNodeId) {
        let parent = self.node(id).and_then(|n| n.parent);
        match parent {
            Some(pid) => {
                if let Some(node) = self.node_mut(pid) {
                    node.children.retain(|c| *c != id);
                }
                self.bubble_dirty(pid);
            }
            None => self.roots.retain(|r| *r != id),
        }
    }

    fn attach(&mut self, id: LayoutNodeId, parent: Option<LayoutNodeId>, index: usize) {
        match parent {
            Some(pid) => {
                if let Some(node) = self.node_mut(pid) {
                    let at = index.min(node.children.len());
                    node.children.insert(at, id);
                }
            }
            None => {
                let at = index.min(self.roots.len());
                self.roots.insert(at, id);
            }
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = parent;
        }
        self.bubble_dirty(id);
    }

    fn drop_subtree(&mut self, id: LayoutNodeId) {
        let children = match self.nodes.get_mut(id).and_then(|n| n.take()) {
            Some(node) => node.children,
            None => return,
        };
        for child in children {
            self.drop_subtree(child);
        }
    }

    fn resolve(dimension: Dimension, available: f32, content: f32) -> f32 {
        match dimension {
            Dimension::Auto => content,
            Dimension::Points(points) => points,
            Dimension::Fraction(fraction) => available * fraction,
        }
    }

    fn measure(&mut self, id: LayoutNodeId, available: Size) -> Size {
        let (style, children) = match self.node(id) {
            Some(node) => (node.style.clone(), node.children.clone()),
            None => return Size::ZERO,
        };

        let inner = Size::new(
            (Self::resolve(style.width, available.width, available.width) - style.padding.horizontal()).max(0.0),
            (Self::resolve(style.height, available.height, available.height) - style.padding.vertical()).max(0.0),
        );

        let mut main = 0.0f32;
        let mut cross = 0.0f32;
        for (i, child) in children.iter().enumerate() {
            let child_size = self.measure(*child, inner);
            let (child_main, child_cross) = match style.direction {
                Direction::Row => (child_size.width, child_size.height),
                Direction::Column => (child_size.height, child_size.width),
            };
            main += child_main;
            if i > 0 {
                main += style.gap;
            }
            cross = cross.max(child_cross);
        }

        let (content_width, content_height) = match style.direction {
            Direction::Row => (main, cross),
            Direction::Column => (cross, main),
        };

        let size = Size::new(
            Self::resolve(
                style.width,
                available.width,
                content_width + style.padding.horizontal(),
            ),
            Self::resolve(
                style.height,
                available.height,
                content_height + style.padding.vertical(),
            ),
        );
        if let Some(node) = self.node_mut(id) {
            node.size = size;
        }
        size
    }

    fn place(&mut self, id: LayoutNodeId, origin: Point) {
        let (style, children, size) = match self.node(id) {
            Some(node) => (node.style.clone(), node.children.clone(), node.size),
            None => return,
        };
        if let Some(node) = self.node_mut(id) {
            node.rect = Rect::new(origin.x, origin.y, size.width, size.height);
            node.needs_layout = false;
        }

        let mut cursor = Point::new(origin.x + style.padding.left, origin.y + style.padding.top);
        for child in children {
            let child_size = self.node(child).map(|n| n.size).unwrap_or(Size::ZERO);
            self.place(child, cursor);
            match style.direction {
                Direction::Row => cursor.x += child_size.width + style.gap,
                Direction::Column => cursor.y += child_size.height + style.gap,
            }
        }
    }
}

impl LayoutEngine for MemoryLayoutEngine {
    fn insert(
        &mut self,
        parent: Option<LayoutNodeId>,
        index: usize,
        style: &LayoutStyle,
    ) -> LayoutNodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(LayoutNode::new(style.clone(), None)));
        self.attach(id, parent, index);
        id
    }

    fn update_style(&mut self, node: LayoutNodeId, style: &LayoutStyle) {
        match self.node_mut(node) {
            Some(entry) => entry.style = style.clone(),
            None => return,
        }
        self.bubble_dirty(node);
    }

    fn reparent(&mut self, node: LayoutNodeId, parent: Option<LayoutNodeId>, index: usize) {
        if self.node(node).is_none() {
            return;
        }
        self.detach(node);
        self.attach(node, parent, index);
    }

    fn remove(&mut self, node: LayoutNodeId) {
        if self.node(node).is_none() {
            return;
        }
        self.detach(node);
        self.drop_subtree(node);
    }

    fn compute(&mut self, viewport: Size) {
        let roots = self.roots.clone();
        for root in roots {
            let dirty = self.node(root).map(|n| n.needs_layout).unwrap_or(false);
            if !dirty {
                continue;
            }
            self.relayouts += 1;
            log::trace!("relayout root {root}");
            self.measure(root, viewport);
            self.place(root, Point::ZERO);
        }
    }

    fn rect_of(&self, node: LayoutNodeId) -> Option<Rect> {
        self.node(node).map(|n| n.rect)
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
