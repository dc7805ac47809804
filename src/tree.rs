//! Arena-based scene-graph storage.
//!
//! The Tree owns every node of one scene using a sparse-set architecture with
//! generational indices. Structure (parent/children), local placement, the
//! lazily combined transform and the pointer-selection chain all live here;
//! per-kind behaviour lives behind the [`Node`] trait.
//!
//! ## Key Features
//!
//! - **Generational Indices**: NodeId contains index + generation, so a stale
//!   id never reaches a node allocated later in the same slot.
//!
//! - **Dense Storage**: Nodes stored contiguously; removal is a swap-remove.
//!
//! - **Lazy Transforms**: Each node caches the transform mapping its local
//!   space to root space. Re-parenting or moving a node only flags its subtree
//!   dirty; the product is recomputed on the next read.
//!
//! - **Selection Chain**: Each node remembers at most one hovered child, so a
//!   single path from the root to a leaf is selected at any time.
//!
//! ## Ownership
//!
//! A node is owned by the tree for its whole life. Attaching it to a parent
//! makes it part of that parent's subtree; deleting a node removes its whole
//! subtree. Detaching only clears the parent link and leaves the node (and
//! its own children) alive in the arena under the caller's [`NodeId`].

use bitflags::bitflags;

use crate::event::{ListenerHandle, Speaker, UPDATED};
use crate::frame_stats;
use crate::nodes::{EventResponse, Node, NodeCx, Point, Rect, Size};
use crate::platform::RenderTarget;
use crate::transform::Transform;
use crate::transformable::Transformable;

bitflags! {
    /// Per-node participation flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct NodeFlags: u8 {
        /// Node can be hovered and receives pointer-button callbacks
        const SELECTABLE = 0b01;
        /// Node and its subtree take part in the per-frame update pass
        const UPDATABLE  = 0b10;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::SELECTABLE | Self::UPDATABLE
    }
}

/// Unique identifier for a node in the tree.
///
/// Uses a generational index design:
/// - `index`: Position in the sparse array (reusable after removal)
/// - `generation`: Version counter that increments when a slot is reused
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Window facts the hit test needs: client size and input focus.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub focused: bool,
}

impl Viewport {
    pub fn new(width: f32, height: f32, focused: bool) -> Self {
        Self {
            width,
            height,
            focused,
        }
    }

    /// True if `point` lies strictly inside the client area.
    pub fn contains(&self, point: Point) -> bool {
        point.x > 0.0 && point.x < self.width && point.y > 0.0 && point.y < self.height
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, false)
    }
}

/// Entry in the sparse map, pointing to a dense array slot.
struct SparseEntry {
    dense_index: usize,
    generation: u32,
}

struct Entry {
    node: Box<dyn Node>,
    flags: NodeFlags,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    transformable: Transformable,
    combined_transform: Transform,
    needs_recompute: bool,
    /// Currently hovered child; always a member of `children`
    selected_child: Option<NodeId>,
    speaker: Speaker,
    /// Back-pointer to sparse array index (for swap-remove fixup)
    sparse_index: u32,
}

pub struct Tree {
    dense: Vec<Entry>,
    sparse: Vec<Option<SparseEntry>>,
    free_indices: Vec<u32>,
    viewport: Viewport,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
            free_indices: Vec::new(),
            viewport: Viewport::default(),
        }
    }

    /// Store a new, parentless node that is both selectable and updatable.
    pub fn insert(&mut self, node: impl Node + 'static) -> NodeId {
        self.insert_with_flags(node, NodeFlags::default())
    }

    pub fn insert_with_flags(&mut self, node: impl Node + 'static, flags: NodeFlags) -> NodeId {
        let (sparse_index, generation) = if let Some(idx) = self.free_indices.pop() {
            let old_gen = self.sparse[idx as usize]
                .as_ref()
                .map(|e| e.generation)
                .unwrap_or(0);
            (idx, old_gen.wrapping_add(1))
        } else {
            let idx = self.sparse.len() as u32;
            self.sparse.push(None);
            (idx, 0)
        };

        let dense_index = self.dense.len();
        self.dense.push(Entry {
            node: Box::new(node),
            flags,
            parent: None,
            children: Vec::new(),
            transformable: Transformable::new(),
            combined_transform: Transform::IDENTITY,
            needs_recompute: true,
            selected_child: None,
            speaker: Speaker::new(),
            sparse_index,
        });
        self.sparse[sparse_index as usize] = Some(SparseEntry {
            dense_index,
            generation,
        });

        NodeId::new(sparse_index, generation)
    }

    /// Delete a node and, recursively, every node it owns.
    ///
    /// The node is first unlinked from its parent, if any.
    pub fn destroy(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        if let Some(parent) = self.parent(id) {
            self.unlink_child(parent, id);
        }

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(idx) = self.dense_index(current) {
                pending.extend(self.dense[idx].children.iter().copied());
                self.unregister(current);
            }
        }
    }

    /// Drop a single slot. Links pointing at it are left to the caller.
    fn unregister(&mut self, id: NodeId) {
        let Some(dense_index) = self.dense_index(id) else {
            return;
        };

        let last_dense_index = self.dense.len() - 1;
        self.dense.swap_remove(dense_index);

        // Fix up the moved entry's sparse slot (if we didn't remove the last element)
        if dense_index != last_dense_index {
            let moved_sparse_idx = self.dense[dense_index].sparse_index;
            if let Some(ref mut entry) = self.sparse[moved_sparse_idx as usize] {
                entry.dense_index = dense_index;
            }
        }

        // Keep the generation around for the next allocation of this slot.
        if let Some(ref mut entry) = self.sparse[id.index as usize] {
            entry.dense_index = usize::MAX;
        }
        self.free_indices.push(id.index);
    }

    fn dense_index(&self, id: NodeId) -> Option<usize> {
        self.sparse
            .get(id.index as usize)
            .and_then(|e| e.as_ref())
            .filter(|e| e.generation == id.generation && e.dense_index != usize::MAX)
            .map(|e| e.dense_index)
    }

    fn entry(&self, id: NodeId) -> Option<&Entry> {
        self.dense_index(id).map(|idx| &self.dense[idx])
    }

    fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry> {
        self.dense_index(id).map(move |idx| &mut self.dense[idx])
    }

    /// Run a callback of the node's behaviour with a context for that node.
    fn with_cx<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn Node, &mut NodeCx<'_>) -> R,
    ) -> Option<R> {
        let Entry { node, speaker, .. } = self.entry_mut(id)?;
        let mut cx = NodeCx { id, speaker };
        Some(f(&mut **node, &mut cx))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.dense_index(id).is_some()
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        self.entry(id).map(|entry| &*entry.node)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_listener(&mut self, id: NodeId, listener: Option<&ListenerHandle>) {
        if let Some(entry) = self.entry_mut(id) {
            entry.speaker.set_listener(listener);
        }
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).and_then(|entry| entry.parent)
    }

    /// Children in draw order: the last child is drawn last, on top.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entry(id)
            .map(|entry| entry.children.as_slice())
            .unwrap_or(&[])
    }

    /// Reassign the parent link and flag the node's whole subtree dirty.
    fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.mark_transformed(id);
        if let Some(entry) = self.entry_mut(id) {
            entry.parent = parent;
        }
    }

    /// Remove `child` from `parent`'s list without touching the child.
    fn unlink_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(entry) = self.entry_mut(parent) else {
            return false;
        };
        let Some(position) = entry.children.iter().position(|&c| c == child) else {
            return false;
        };
        entry.children.remove(position);
        if entry.selected_child == Some(child) {
            entry.selected_child = None;
        }
        true
    }

    /// Attach `child` as the topmost child of `parent`.
    ///
    /// A child that already has a parent (including `parent` itself) is
    /// unlinked first, so it is never listed twice and never has two parents.
    /// Adding a node under itself or under one of its descendants does nothing.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.contains(parent) || !self.contains(child) {
            return;
        }
        if self.is_ancestor_or_self(child, parent) {
            log::warn!("Refusing to add {child:?} under {parent:?}: it would create a cycle");
            return;
        }
        if let Some(old_parent) = self.parent(child) {
            self.unlink_child(old_parent, child);
        }

        self.set_parent(child, Some(parent));
        if let Some(entry) = self.entry_mut(parent) {
            entry.children.push(child);
        }
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == candidate {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Remove `child` from `parent`. With `delete` the child's subtree is
    /// destroyed, otherwise it is detached and stays alive for the caller.
    ///
    /// Returns false if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId, delete: bool) -> bool {
        if !self.unlink_child(parent, child) {
            return false;
        }
        self.release(child, delete);
        true
    }

    pub fn remove_from_parent(&mut self, id: NodeId, delete: bool) -> bool {
        match self.parent(id) {
            Some(parent) => self.remove_child(parent, id, delete),
            None => false,
        }
    }

    /// Remove the children at positions `first..last` (`None` or a value past
    /// the end means "to the end"), deleting or detaching each one.
    ///
    /// # Panics
    ///
    /// Panics if `first` is greater than the number of children or than the
    /// effective `last`. Callers must keep `first` in range.
    pub fn remove_children(&mut self, parent: NodeId, delete: bool, first: usize, last: Option<usize>) {
        let Some(entry) = self.entry_mut(parent) else {
            return;
        };
        let len = entry.children.len();
        let end = match last {
            Some(last) if last <= len => last,
            _ => len,
        };
        let removed: Vec<NodeId> = entry.children.drain(first..end).collect();
        if entry
            .selected_child
            .is_some_and(|selected| removed.contains(&selected))
        {
            entry.selected_child = None;
        }

        for child in removed {
            self.release(child, delete);
        }
    }

    fn release(&mut self, child: NodeId, delete: bool) {
        if delete {
            // Already unlinked; clear the link so destroy doesn't look for it.
            if let Some(entry) = self.entry_mut(child) {
                entry.parent = None;
            }
            self.destroy(child);
        } else {
            self.set_parent(child, None);
        }
    }

    // ------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------

    /// Flag `id` and all its descendants for recomputation.
    ///
    /// Reading a combined transform cleans every ancestor on the way, so a
    /// dirty node can only have dirty descendants and the walk stops there.
    fn mark_transformed(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(entry) = self.entry_mut(current) {
                if entry.needs_recompute {
                    continue;
                }
                entry.needs_recompute = true;
                pending.extend(entry.children.iter().copied());
            }
        }
    }

    pub fn needs_recompute(&self, id: NodeId) -> bool {
        self.entry(id).is_some_and(|entry| entry.needs_recompute)
    }

    /// Transform mapping this node's local space to root space.
    ///
    /// Recomputed only when flagged dirty, then cached. Unknown ids yield the
    /// identity.
    pub fn combined_transform(&mut self, id: NodeId) -> Transform {
        let Some(idx) = self.dense_index(id) else {
            return Transform::IDENTITY;
        };
        if self.dense[idx].needs_recompute {
            let local = self.dense[idx].transformable.transform();
            let combined = match self.dense[idx].parent {
                Some(parent) => self.combined_transform(parent).then(&local),
                None => local,
            };
            let entry = &mut self.dense[idx];
            entry.combined_transform = combined;
            entry.needs_recompute = false;
            frame_stats::record_transform_recompute();
        }
        self.dense[idx].combined_transform
    }

    pub fn transformable(&self, id: NodeId) -> Option<&Transformable> {
        self.entry(id).map(|entry| &entry.transformable)
    }

    fn update_transformable(&mut self, id: NodeId, f: impl FnOnce(&mut Transformable)) {
        let Some(entry) = self.entry_mut(id) else {
            return;
        };
        f(&mut entry.transformable);
        self.mark_transformed(id);
    }

    pub fn set_position(&mut self, id: NodeId, position: Point) {
        self.update_transformable(id, |t| t.set_position(position));
    }

    pub fn set_x(&mut self, id: NodeId, x: f32) {
        self.update_transformable(id, |t| t.set_position(Point::new(x, t.position().y)));
    }

    pub fn set_y(&mut self, id: NodeId, y: f32) {
        self.update_transformable(id, |t| t.set_position(Point::new(t.position().x, y)));
    }

    pub fn move_by(&mut self, id: NodeId, dx: f32, dy: f32) {
        self.update_transformable(id, |t| {
            let p = t.position();
            t.set_position(Point::new(p.x + dx, p.y + dy));
        });
    }

    pub fn set_origin(&mut self, id: NodeId, origin: Point) {
        self.update_transformable(id, |t| t.set_origin(origin));
    }

    pub fn set_origin_x(&mut self, id: NodeId, x: f32) {
        self.update_transformable(id, |t| t.set_origin(Point::new(x, t.origin().y)));
    }

    pub fn set_origin_y(&mut self, id: NodeId, y: f32) {
        self.update_transformable(id, |t| t.set_origin(Point::new(t.origin().x, y)));
    }

    /// Uniform scale.
    pub fn set_scale(&mut self, id: NodeId, scale: f32) {
        self.update_transformable(id, |t| t.set_scale(scale, scale));
    }

    pub fn set_rotation(&mut self, id: NodeId, radians: f32) {
        self.update_transformable(id, |t| t.set_rotation(radians));
    }

    fn read_transformable(&self, id: NodeId, f: impl FnOnce(&Transformable) -> f32) -> f32 {
        self.transformable(id).map(f).unwrap_or(0.0)
    }

    pub fn x(&self, id: NodeId) -> f32 {
        self.read_transformable(id, |t| t.position().x)
    }

    pub fn y(&self, id: NodeId) -> f32 {
        self.read_transformable(id, |t| t.position().y)
    }

    pub fn origin_x(&self, id: NodeId) -> f32 {
        self.read_transformable(id, |t| t.origin().x)
    }

    pub fn origin_y(&self, id: NodeId) -> f32 {
        self.read_transformable(id, |t| t.origin().y)
    }

    /// Horizontal scale factor.
    pub fn scale(&self, id: NodeId) -> f32 {
        self.read_transformable(id, |t| t.scale().0)
    }

    /// Rotation in radians, normalized to `(-π, π]`.
    pub fn rotation(&self, id: NodeId) -> f32 {
        self.read_transformable(id, Transformable::rotation)
    }

    /// Natural (unscaled) size reported by the node's behaviour.
    pub fn size(&self, id: NodeId) -> Option<Size> {
        self.entry(id).map(|entry| entry.node.size(self, id))
    }

    /// Width after the node's own scale.
    pub fn width(&self, id: NodeId) -> f32 {
        self.size(id).map_or(0.0, |size| size.width * self.scale(id).abs())
    }

    /// Height after the node's own scale.
    pub fn height(&self, id: NodeId) -> f32 {
        let scale_y = self.transformable(id).map_or(1.0, |t| t.scale().1);
        self.size(id).map_or(0.0, |size| size.height * scale_y.abs())
    }

    pub fn center_x(&self, id: NodeId) -> f32 {
        self.width(id) / 2.0
    }

    pub fn center_y(&self, id: NodeId) -> f32 {
        self.height(id) / 2.0
    }

    /// Bounding box of the node in its parent's space.
    pub fn local_extent(&self, id: NodeId) -> Option<Rect> {
        let entry = self.entry(id)?;
        let bounds = Rect::from_size(entry.node.size(self, id));
        Some(entry.transformable.transform().transform_rect(bounds))
    }

    /// Axis-aligned bounding box of the node in root (window) space.
    pub fn global_bounds(&mut self, id: NodeId) -> Option<Rect> {
        let size = self.size(id)?;
        Some(self.combined_transform(id).transform_rect(Rect::from_size(size)))
    }

    /// Map a window-space point into this node's local space.
    pub fn local_pointer_position(&mut self, id: NodeId, point: Point) -> Point {
        self.combined_transform(id).inverse().transform_point(point)
    }

    // ------------------------------------------------------------------
    // Per-frame passes
    // ------------------------------------------------------------------

    pub fn is_updatable(&self, id: NodeId) -> bool {
        self.entry(id)
            .is_some_and(|entry| entry.flags.contains(NodeFlags::UPDATABLE))
    }

    pub fn set_updatable(&mut self, id: NodeId, updatable: bool) {
        if let Some(entry) = self.entry_mut(id) {
            entry.flags.set(NodeFlags::UPDATABLE, updatable);
        }
    }

    /// Update the children in order, then notify the node itself and declare
    /// [`UPDATED`]. A non-updatable node freezes its whole subtree.
    pub fn update(&mut self, id: NodeId) {
        let Some(idx) = self.dense_index(id) else {
            return;
        };
        if !self.dense[idx].flags.contains(NodeFlags::UPDATABLE) {
            return;
        }

        // Callbacks cannot reach the tree, so the structure (and `idx`) is
        // stable for the whole pass.
        for position in 0..self.dense[idx].children.len() {
            let child = self.dense[idx].children[position];
            self.update(child);
        }

        self.with_cx(id, |node, cx| node.on_updated(cx));
        self.dense[idx].speaker.declare_event(id, UPDATED);
    }

    /// Draw the node, then its children in order.
    pub fn draw_to_target(&mut self, id: NodeId, target: &mut dyn RenderTarget) {
        let transform = self.combined_transform(id);
        let Some(idx) = self.dense_index(id) else {
            return;
        };
        self.dense[idx].node.draw(&transform, target);

        for position in 0..self.dense[idx].children.len() {
            let child = self.dense[idx].children[position];
            self.draw_to_target(child, target);
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn is_selectable(&self, id: NodeId) -> bool {
        self.entry(id)
            .is_some_and(|entry| entry.flags.contains(NodeFlags::SELECTABLE))
    }

    /// Change selectability. A node that stops being selectable leaves the
    /// selection: if hovered, its parent drops it (mouse-left reaches it and
    /// its chain once); otherwise only its own chain is dropped. A node that
    /// becomes selectable waits for the next [`Tree::select`].
    pub fn set_selectable(&mut self, id: NodeId, selectable: bool) {
        let Some(entry) = self.entry_mut(id) else {
            return;
        };
        if entry.flags.contains(NodeFlags::SELECTABLE) == selectable {
            return;
        }
        entry.flags.set(NodeFlags::SELECTABLE, selectable);
        if selectable {
            return;
        }

        match self.parent(id) {
            Some(parent) if self.is_child_selected(parent, id) => self.deselect_child(parent),
            _ => self.deselect_child(id),
        }
    }

    pub fn selected_child(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).and_then(|entry| entry.selected_child)
    }

    pub fn is_child_selected(&self, parent: NodeId, child: NodeId) -> bool {
        self.selected_child(parent) == Some(child)
    }

    /// Hit test: the window has focus, the point lies inside the window and
    /// inside the node's axis-aligned bounds in window space.
    pub fn check_mouse_on_it(&mut self, id: NodeId, point: Point) -> bool {
        let viewport = self.viewport;
        if !viewport.focused || !viewport.contains(point) {
            return false;
        }
        self.global_bounds(id)
            .is_some_and(|bounds| bounds.contains(point))
    }

    /// Topmost selectable child under `point`.
    fn child_under(&mut self, id: NodeId, point: Point) -> Option<NodeId> {
        let idx = self.dense_index(id)?;
        for position in (0..self.dense[idx].children.len()).rev() {
            let child = self.dense[idx].children[position];
            if self.is_selectable(child) && self.check_mouse_on_it(child, point) {
                return Some(child);
            }
        }
        None
    }

    /// Recompute the selection chain below `id` for the pointer at `point`
    /// and return its deepest node.
    ///
    /// Only a child that stops being hovered receives mouse-left (and its own
    /// chain with it); only a newly hovered child receives mouse-entered. A
    /// repeated call with the same point is therefore silent.
    pub fn select(&mut self, id: NodeId, point: Point) -> Option<NodeId> {
        let hit = if self.is_selectable(id) {
            self.child_under(id, point)
        } else {
            None
        };

        if self.selected_child(id) != hit {
            self.deselect_child(id);
            if let Some(child) = hit {
                if let Some(entry) = self.entry_mut(id) {
                    entry.selected_child = Some(child);
                }
                log::trace!("{child:?} entered under {id:?}");
                self.with_cx(child, |node, cx| node.on_mouse_entered(cx));
            }
        }

        let child = hit?;
        self.select(child, point).or(Some(child))
    }

    /// Clear the selected child, notifying it (and its chain) of mouse-left.
    pub fn deselect_child(&mut self, id: NodeId) {
        let Some(child) = self.entry_mut(id).and_then(|entry| entry.selected_child.take()) else {
            return;
        };
        self.notify_mouse_left(child);
    }

    /// Deliver mouse-left to `id` and drop its own selection chain.
    pub fn notify_mouse_left(&mut self, id: NodeId) {
        self.with_cx(id, |node, cx| node.on_mouse_left(cx));
        self.deselect_child(id);
    }

    pub fn notify_mouse_moved(&mut self, id: NodeId, point: Point) {
        self.with_cx(id, |node, cx| node.on_mouse_moved(cx, point));
    }

    /// Offer the press to `id`; if ignored, forward it to the selected child
    /// while that child is selectable.
    pub fn left_mouse_button_pressed(&mut self, id: NodeId) -> EventResponse {
        self.dispatch_button(id, |node, cx| node.on_left_mouse_button_pressed(cx))
    }

    pub fn left_mouse_button_released(&mut self, id: NodeId) -> EventResponse {
        self.dispatch_button(id, |node, cx| node.on_left_mouse_button_released(cx))
    }

    pub fn right_mouse_button_released(&mut self, id: NodeId) -> EventResponse {
        self.dispatch_button(id, |node, cx| node.on_right_mouse_button_released(cx))
    }

    fn dispatch_button(
        &mut self,
        id: NodeId,
        callback: fn(&mut dyn Node, &mut NodeCx<'_>) -> EventResponse,
    ) -> EventResponse {
        match self.with_cx(id, callback) {
            Some(EventResponse::Ignored) => {}
            Some(EventResponse::Handled) => return EventResponse::Handled,
            None => return EventResponse::Ignored,
        }
        match self.selected_child(id) {
            Some(child) if self.is_selectable(child) => self.dispatch_button(child, callback),
            _ => EventResponse::Ignored,
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::event::Listener;
    use crate::nodes::Panel;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Fixed-size node that records every callback it receives.
    struct Probe {
        name: &'static str,
        size: Size,
        log: Log,
        handles_left_press: bool,
    }

    impl Probe {
        fn new(name: &'static str, width: f32, height: f32, log: &Log) -> Self {
            Self {
                name,
                size: Size::new(width, height),
                log: log.clone(),
                handles_left_press: false,
            }
        }

        fn record(&self, what: &str) {
            self.log.borrow_mut().push(format!("{}:{}", self.name, what));
        }
    }

    impl Node for Probe {
        fn size(&self, _tree: &Tree, _id: NodeId) -> Size {
            self.size
        }
        fn on_updated(&mut self, _cx: &mut NodeCx<'_>) {
            self.record("updated");
        }
        fn on_mouse_entered(&mut self, _cx: &mut NodeCx<'_>) {
            self.record("entered");
        }
        fn on_mouse_left(&mut self, _cx: &mut NodeCx<'_>) {
            self.record("left");
        }
        fn on_left_mouse_button_pressed(&mut self, _cx: &mut NodeCx<'_>) -> EventResponse {
            self.record("pressed");
            if self.handles_left_press {
                EventResponse::Handled
            } else {
                EventResponse::Ignored
            }
        }
        fn on_right_mouse_button_released(&mut self, _cx: &mut NodeCx<'_>) -> EventResponse {
            self.record("right_released");
            EventResponse::Ignored
        }
    }

    fn new_log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn take(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.borrow_mut())
    }

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn focused_tree(width: f32, height: f32) -> Tree {
        let mut tree = Tree::new();
        tree.set_viewport(Viewport::new(width, height, true));
        tree
    }

    #[test]
    fn test_tree_insert_destroy() {
        let mut tree = Tree::new();
        let id = tree.insert(Panel::new(1.0, 1.0));
        assert!(tree.contains(id));
        assert_eq!(tree.len(), 1);

        tree.destroy(id);
        assert!(!tree.contains(id));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_tree_generational_index() {
        let mut tree = Tree::new();
        let id1 = tree.insert(Panel::new(1.0, 1.0));
        tree.destroy(id1);
        let id2 = tree.insert(Panel::new(1.0, 1.0));

        assert!(!tree.contains(id1));
        assert!(tree.contains(id2));
        assert_eq!(id1.index, id2.index);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn test_tree_swap_remove_fixup() {
        let mut tree = Tree::new();
        let id1 = tree.insert(Panel::new(1.0, 1.0));
        let id2 = tree.insert(Panel::new(2.0, 2.0));
        let id3 = tree.insert(Panel::new(3.0, 3.0));

        tree.destroy(id1);

        assert!(tree.contains(id2));
        assert!(tree.contains(id3));
        assert_eq!(tree.size(id3), Some(Size::new(3.0, 3.0)));
    }

    #[test]
    fn test_destroy_is_recursive() {
        let mut tree = Tree::new();
        let root = tree.insert(Panel::new(1.0, 1.0));
        let child = tree.insert(Panel::new(1.0, 1.0));
        let grandchild = tree.insert(Panel::new(1.0, 1.0));
        tree.add_child(root, child);
        tree.add_child(child, grandchild);

        tree.destroy(child);

        assert!(tree.contains(root));
        assert!(!tree.contains(child));
        assert!(!tree.contains(grandchild));
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn test_add_child_links_both_ways() {
        let mut tree = Tree::new();
        let parent = tree.insert(Panel::new(1.0, 1.0));
        let child = tree.insert(Panel::new(1.0, 1.0));
        tree.add_child(parent, child);

        assert_eq!(tree.parent(child), Some(parent));
        assert_eq!(tree.children(parent), &[child]);
    }

    #[test]
    fn test_readding_child_keeps_single_entry() {
        let mut tree = Tree::new();
        let parent = tree.insert(Panel::new(1.0, 1.0));
        let a = tree.insert(Panel::new(1.0, 1.0));
        let b = tree.insert(Panel::new(1.0, 1.0));
        tree.add_child(parent, a);
        tree.add_child(parent, b);
        tree.combined_transform(a);

        tree.add_child(parent, a);

        assert_eq!(tree.children(parent), &[b, a]);
        assert!(tree.needs_recompute(a));
    }

    #[test]
    fn test_add_child_refuses_cycles() {
        let mut tree = Tree::new();
        let root = tree.insert(Panel::new(1.0, 1.0));
        let child = tree.insert(Panel::new(1.0, 1.0));
        tree.add_child(root, child);

        tree.add_child(child, root);
        tree.add_child(child, child);

        assert_eq!(tree.parent(root), None);
        assert_eq!(tree.parent(child), Some(root));
        assert!(tree.children(child).is_empty());
        tree.combined_transform(child);
        tree.update(root);
    }

    #[test]
    fn test_reparenting_moves_child() {
        let mut tree = Tree::new();
        let first = tree.insert(Panel::new(1.0, 1.0));
        let second = tree.insert(Panel::new(1.0, 1.0));
        let child = tree.insert(Panel::new(1.0, 1.0));
        tree.add_child(first, child);
        tree.add_child(second, child);

        assert!(tree.children(first).is_empty());
        assert_eq!(tree.children(second), &[child]);
        assert_eq!(tree.parent(child), Some(second));
    }

    #[test]
    fn test_combined_transform_composes_ancestors() {
        let mut tree = Tree::new();
        let root = tree.insert(Panel::new(1.0, 1.0));
        let child = tree.insert(Panel::new(1.0, 1.0));
        tree.add_child(root, child);
        tree.set_position(root, Point::new(100.0, 50.0));
        tree.set_scale(root, 2.0);
        tree.set_position(child, Point::new(10.0, 5.0));

        let p = tree
            .combined_transform(child)
            .transform_point(Point::new(1.0, 1.0));
        assert!(approx_eq(p.x, 122.0));
        assert!(approx_eq(p.y, 62.0));
    }

    #[test]
    fn test_root_combined_transform_is_local() {
        let mut tree = Tree::new();
        let root = tree.insert(Panel::new(1.0, 1.0));
        tree.set_position(root, Point::new(3.0, 4.0));

        let local = tree.transformable(root).map(|t| t.transform());
        assert_eq!(Some(tree.combined_transform(root)), local);
    }

    #[test]
    fn test_combined_transform_cache_idempotent() {
        let mut tree = Tree::new();
        let root = tree.insert(Panel::new(1.0, 1.0));
        let child = tree.insert(Panel::new(1.0, 1.0));
        tree.add_child(root, child);
        tree.set_rotation(root, 0.3);

        let first = tree.combined_transform(child);
        assert!(!tree.needs_recompute(child));
        assert!(!tree.needs_recompute(root));
        let second = tree.combined_transform(child);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reparent_dirties_whole_subtree() {
        let mut tree = Tree::new();
        let a = tree.insert(Panel::new(1.0, 1.0));
        let b = tree.insert(Panel::new(1.0, 1.0));
        let child = tree.insert(Panel::new(1.0, 1.0));
        let grandchild = tree.insert(Panel::new(1.0, 1.0));
        tree.add_child(a, child);
        tree.add_child(child, grandchild);
        tree.set_position(b, Point::new(40.0, 0.0));

        let before = tree.combined_transform(grandchild);
        assert!(!tree.needs_recompute(child));

        tree.add_child(b, child);
        assert!(tree.needs_recompute(child));
        assert!(tree.needs_recompute(grandchild));

        let after = tree.combined_transform(grandchild);
        assert_ne!(before, after);
        assert!(approx_eq(after.transform_point(Point::ZERO).x, 40.0));
    }

    #[test]
    fn test_accessing_child_does_not_clean_grandchild() {
        let mut tree = Tree::new();
        let root = tree.insert(Panel::new(1.0, 1.0));
        let child = tree.insert(Panel::new(1.0, 1.0));
        let grandchild = tree.insert(Panel::new(1.0, 1.0));
        tree.add_child(root, child);
        tree.add_child(child, grandchild);

        tree.combined_transform(child);
        assert!(!tree.needs_recompute(child));
        assert!(tree.needs_recompute(grandchild));
    }

    #[test]
    fn test_repeated_moves_recompute_once() {
        let mut tree = Tree::new();
        let node = tree.insert(Panel::new(1.0, 1.0));
        tree.combined_transform(node);

        tree.move_by(node, 1.0, 0.0);
        tree.move_by(node, 1.0, 0.0);
        tree.move_by(node, 1.0, 2.0);
        assert!(tree.needs_recompute(node));

        let p = tree.combined_transform(node).transform_point(Point::ZERO);
        assert!(approx_eq(p.x, 3.0));
        assert!(approx_eq(p.y, 2.0));
        assert_eq!(tree.x(node), 3.0);
        assert_eq!(tree.y(node), 2.0);
    }

    #[test]
    fn test_remove_child_detach_keeps_node() {
        let mut tree = Tree::new();
        let parent = tree.insert(Panel::new(1.0, 1.0));
        let child = tree.insert(Panel::new(1.0, 1.0));
        tree.add_child(parent, child);

        assert!(tree.remove_child(parent, child, false));
        assert!(tree.contains(child));
        assert_eq!(tree.parent(child), None);
        assert!(tree.children(parent).is_empty());
        assert!(!tree.remove_child(parent, child, false));
    }

    #[test]
    fn test_remove_child_delete() {
        let mut tree = Tree::new();
        let parent = tree.insert(Panel::new(1.0, 1.0));
        let child = tree.insert(Panel::new(1.0, 1.0));
        tree.add_child(parent, child);

        assert!(tree.remove_child(parent, child, true));
        assert!(!tree.contains(child));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_remove_from_parent() {
        let mut tree = Tree::new();
        let parent = tree.insert(Panel::new(1.0, 1.0));
        let child = tree.insert(Panel::new(1.0, 1.0));
        tree.add_child(parent, child);

        assert!(tree.remove_from_parent(child, false));
        assert!(!tree.remove_from_parent(child, false));
        assert!(tree.contains(child));
    }

    #[test]
    fn test_remove_children_detaches_tail() {
        let mut tree = Tree::new();
        let parent = tree.insert(Panel::new(1.0, 1.0));
        let kids: Vec<NodeId> = (0..3).map(|_| tree.insert(Panel::new(1.0, 1.0))).collect();
        for &kid in &kids {
            tree.add_child(parent, kid);
        }

        tree.remove_children(parent, false, 1, None);

        assert_eq!(tree.children(parent), &[kids[0]]);
        assert_eq!(tree.parent(kids[0]), Some(parent));
        for &kid in &kids[1..] {
            assert!(tree.contains(kid));
            assert_eq!(tree.parent(kid), None);
        }
    }

    #[test]
    fn test_remove_children_range_and_delete() {
        let mut tree = Tree::new();
        let parent = tree.insert(Panel::new(1.0, 1.0));
        let kids: Vec<NodeId> = (0..4).map(|_| tree.insert(Panel::new(1.0, 1.0))).collect();
        for &kid in &kids {
            tree.add_child(parent, kid);
        }

        tree.remove_children(parent, true, 1, Some(3));
        assert_eq!(tree.children(parent), &[kids[0], kids[3]]);
        assert!(!tree.contains(kids[1]));
        assert!(!tree.contains(kids[2]));

        // A `last` past the end means "to the end".
        tree.remove_children(parent, true, 0, Some(99));
        assert!(tree.children(parent).is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    #[should_panic]
    fn test_remove_children_first_out_of_range_panics() {
        let mut tree = Tree::new();
        let parent = tree.insert(Panel::new(1.0, 1.0));
        let child = tree.insert(Panel::new(1.0, 1.0));
        tree.add_child(parent, child);

        tree.remove_children(parent, false, 2, None);
    }

    #[test]
    fn test_update_visits_children_first() {
        let log = new_log();
        let mut tree = Tree::new();
        let root = tree.insert(Probe::new("root", 1.0, 1.0, &log));
        let a = tree.insert(Probe::new("a", 1.0, 1.0, &log));
        let b = tree.insert(Probe::new("b", 1.0, 1.0, &log));
        let a1 = tree.insert(Probe::new("a1", 1.0, 1.0, &log));
        tree.add_child(root, a);
        tree.add_child(root, b);
        tree.add_child(a, a1);

        tree.update(root);

        assert_eq!(
            take(&log),
            vec!["a1:updated", "a:updated", "b:updated", "root:updated"]
        );
    }

    #[test]
    fn test_non_updatable_subtree_is_frozen() {
        let log = new_log();
        let mut tree = Tree::new();
        let root = tree.insert(Probe::new("root", 1.0, 1.0, &log));
        let frozen = tree.insert(Probe::new("frozen", 1.0, 1.0, &log));
        let inner = tree.insert(Probe::new("inner", 1.0, 1.0, &log));
        tree.add_child(root, frozen);
        tree.add_child(frozen, inner);
        tree.set_updatable(frozen, false);

        let fired = Rc::new(RefCell::new(Vec::new()));
        let sink = fired.clone();
        let listener: Rc<RefCell<dyn Listener>> =
            Rc::new(RefCell::new(move |id: NodeId, name: &str| {
                sink.borrow_mut().push((id, name.to_string()));
            }));
        tree.set_listener(frozen, Some(&listener));
        tree.set_listener(root, Some(&listener));

        tree.update(root);

        assert_eq!(take(&log), vec!["root:updated"]);
        assert_eq!(*fired.borrow(), vec![(root, UPDATED.to_string())]);
    }

    /// root (0,0 400x400) holding two overlapping children; `top` also holds
    /// a nested leaf.
    fn selection_fixture(log: &Log) -> (Tree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = focused_tree(800.0, 600.0);
        let root = tree.insert(Probe::new("root", 400.0, 400.0, log));
        let bottom = tree.insert(Probe::new("bottom", 200.0, 200.0, log));
        let top = tree.insert(Probe::new("top", 100.0, 100.0, log));
        let leaf = tree.insert(Probe::new("leaf", 20.0, 20.0, log));
        tree.add_child(root, bottom);
        tree.add_child(root, top);
        tree.add_child(top, leaf);
        tree.set_position(top, Point::new(50.0, 50.0));
        tree.set_position(leaf, Point::new(10.0, 10.0));
        (tree, root, bottom, top, leaf)
    }

    #[test]
    fn test_select_picks_topmost_chain() {
        let log = new_log();
        let (mut tree, root, _bottom, top, leaf) = selection_fixture(&log);

        let selected = tree.select(root, Point::new(65.0, 65.0));

        assert_eq!(selected, Some(leaf));
        assert_eq!(tree.selected_child(root), Some(top));
        assert_eq!(tree.selected_child(top), Some(leaf));
        assert_eq!(take(&log), vec!["top:entered", "leaf:entered"]);
    }

    #[test]
    fn test_select_same_point_is_silent() {
        let log = new_log();
        let (mut tree, root, _bottom, _top, leaf) = selection_fixture(&log);

        tree.select(root, Point::new(65.0, 65.0));
        take(&log);
        let selected = tree.select(root, Point::new(65.0, 65.0));

        assert_eq!(selected, Some(leaf));
        assert!(take(&log).is_empty());
    }

    #[test]
    fn test_select_moves_between_siblings() {
        let log = new_log();
        let (mut tree, root, bottom, top, leaf) = selection_fixture(&log);

        tree.select(root, Point::new(65.0, 65.0));
        take(&log);
        let selected = tree.select(root, Point::new(180.0, 180.0));

        assert_eq!(selected, Some(bottom));
        assert_eq!(tree.selected_child(root), Some(bottom));
        assert_eq!(tree.selected_child(top), None);
        assert_eq!(tree.selected_child(leaf), None);
        assert_eq!(take(&log), vec!["top:left", "leaf:left", "bottom:entered"]);
    }

    #[test]
    fn test_select_skips_unselectable_children() {
        let log = new_log();
        let (mut tree, root, bottom, top, _leaf) = selection_fixture(&log);
        tree.set_selectable(top, false);
        take(&log);

        assert_eq!(tree.select(root, Point::new(65.0, 65.0)), Some(bottom));
    }

    #[test]
    fn test_select_requires_focus_and_window() {
        let log = new_log();
        let (mut tree, root, _bottom, _top, _leaf) = selection_fixture(&log);

        tree.set_viewport(Viewport::new(800.0, 600.0, false));
        assert_eq!(tree.select(root, Point::new(65.0, 65.0)), None);

        tree.set_viewport(Viewport::new(60.0, 60.0, true));
        assert_eq!(tree.select(root, Point::new(65.0, 65.0)), None);
        assert!(take(&log).is_empty());
    }

    #[test]
    fn test_select_on_unselectable_root_clears_chain() {
        let log = new_log();
        let (mut tree, root, _bottom, top, _leaf) = selection_fixture(&log);
        tree.select(root, Point::new(65.0, 65.0));
        take(&log);

        tree.set_selectable(root, false);
        take(&log);
        assert_eq!(tree.select(root, Point::new(65.0, 65.0)), None);
        assert_eq!(tree.selected_child(root), None);
        assert_eq!(tree.selected_child(top), None);
    }

    #[test]
    fn test_hit_test_follows_ancestor_transform() {
        let log = new_log();
        let (mut tree, root, _bottom, _top, leaf) = selection_fixture(&log);
        tree.set_scale(root, 2.0);

        // Leaf spans (60..80) locally, (120..160) after the root's scale.
        assert!(tree.check_mouse_on_it(leaf, Point::new(150.0, 150.0)));
        assert!(!tree.check_mouse_on_it(leaf, Point::new(70.0, 70.0)));
    }

    #[test]
    fn test_button_forwarding_follows_chain() {
        let log = new_log();
        let (mut tree, root, _bottom, top, _leaf) = selection_fixture(&log);
        tree.select(root, Point::new(65.0, 65.0));
        take(&log);

        assert_eq!(tree.left_mouse_button_pressed(root), EventResponse::Ignored);
        assert_eq!(
            take(&log),
            vec!["root:pressed", "top:pressed", "leaf:pressed"]
        );

        tree.set_selectable(top, false);
        take(&log);
        tree.right_mouse_button_released(root);
        assert_eq!(take(&log), vec!["root:right_released"]);
    }

    #[test]
    fn test_handled_press_stops_forwarding() {
        let log = new_log();
        let mut tree = focused_tree(800.0, 600.0);
        let root = tree.insert(Probe::new("root", 100.0, 100.0, &log));
        let mut handler = Probe::new("handler", 50.0, 50.0, &log);
        handler.handles_left_press = true;
        let handler = tree.insert(handler);
        let inner = tree.insert(Probe::new("inner", 10.0, 10.0, &log));
        tree.add_child(root, handler);
        tree.add_child(handler, inner);
        tree.select(root, Point::new(5.0, 5.0));
        take(&log);

        assert_eq!(tree.left_mouse_button_pressed(root), EventResponse::Handled);
        assert_eq!(take(&log), vec!["root:pressed", "handler:pressed"]);
    }

    #[test]
    fn test_set_selectable_notifies() {
        let log = new_log();
        let (mut tree, root, bottom, top, leaf) = selection_fixture(&log);
        tree.select(root, Point::new(65.0, 65.0));
        take(&log);

        tree.set_selectable(top, false);
        assert_eq!(take(&log), vec!["top:left", "leaf:left"]);
        assert_eq!(tree.selected_child(root), None);

        // The chain was dropped, so the next pass does not leave `top` again.
        assert_eq!(tree.select(root, Point::new(65.0, 65.0)), Some(bottom));
        assert_eq!(take(&log), vec!["bottom:entered"]);

        tree.set_selectable(top, true);
        assert!(take(&log).is_empty());
        assert_eq!(tree.select(root, Point::new(65.0, 65.0)), Some(leaf));
        assert_eq!(take(&log), vec!["bottom:left", "top:entered", "leaf:entered"]);
    }

    #[test]
    fn test_unselectable_unhovered_node_drops_own_chain() {
        let log = new_log();
        let (mut tree, root, _bottom, top, _leaf) = selection_fixture(&log);
        tree.select(root, Point::new(65.0, 65.0));
        take(&log);

        tree.set_selectable(root, false);
        assert_eq!(take(&log), vec!["top:left", "leaf:left"]);
        assert_eq!(tree.selected_child(root), None);
        assert_eq!(tree.selected_child(top), None);
    }

    #[test]
    fn test_removing_selected_child_clears_selection() {
        let log = new_log();
        let (mut tree, root, _bottom, top, _leaf) = selection_fixture(&log);
        tree.select(root, Point::new(65.0, 65.0));

        tree.remove_child(root, top, false);
        assert_eq!(tree.selected_child(root), None);
    }

    #[test]
    fn test_local_pointer_position() {
        let log = new_log();
        let (mut tree, root, _bottom, _top, leaf) = selection_fixture(&log);
        tree.set_scale(root, 2.0);

        let local = tree.local_pointer_position(leaf, Point::new(130.0, 140.0));
        assert!(approx_eq(local.x, 5.0));
        assert!(approx_eq(local.y, 10.0));
    }

    #[test]
    fn test_derived_accessors() {
        let mut tree = Tree::new();
        let node = tree.insert(Panel::new(40.0, 20.0));
        tree.set_scale(node, 2.0);
        tree.set_origin_x(node, 5.0);
        tree.set_origin_y(node, 6.0);
        tree.set_rotation(node, 1.5 * std::f32::consts::PI);

        assert_eq!(tree.width(node), 80.0);
        assert_eq!(tree.height(node), 40.0);
        assert_eq!(tree.center_x(node), 40.0);
        assert_eq!(tree.center_y(node), 20.0);
        assert_eq!(tree.origin_x(node), 5.0);
        assert_eq!(tree.origin_y(node), 6.0);
        assert_eq!(tree.scale(node), 2.0);
        assert!(approx_eq(
            tree.rotation(node),
            -0.5 * std::f32::consts::PI
        ));
    }
}
