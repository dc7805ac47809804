//! A scene: a content layer framed by up to four docked UI regions.
//!
//! The act owns the [`Tree`] all of its nodes live in. Its root spans the
//! window; the content layer is the root's first child, so docked UI added
//! later is drawn and hit-tested above the content.
//!
//! The act tracks its own `selected_node` (the deepest node under the
//! pointer, used for button dispatch) alongside the per-node selection chain
//! kept by the tree. The two are refreshed together on pointer motion but are
//! otherwise independent: a node detached from the tree can stay the act's
//! selected node until the next motion event.

use crate::frame_stats;
use crate::nodes::{Color, EventResponse, Layer, Node, Point, Size};
use crate::parameters;
use crate::platform::RenderTarget;
use crate::tree::{NodeId, Tree, Viewport};

/// Auto-scroll speed in pixels per frame at `k == 1.0`.
pub const SCROLL_SPEED: f32 = 8.0;

/// Manhattan distance from the point where the right button went down past
/// which a drag no longer counts as a click.
pub const DRAG_THRESHOLD: f32 = 10.0;

/// How the content layer is placed and moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Fit the free area, preserving aspect ratio, and center in it.
    #[default]
    Static,
    /// Pan with a right-button drag or by resting the pointer near an edge.
    MovableByMouse,
    /// Keep the center node's origin in the middle of the window.
    CenteredOnNode,
}

/// Window edge a UI region is docked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dock {
    Left,
    Right,
    Top,
    Bottom,
}

impl Dock {
    fn index(self) -> usize {
        match self {
            Dock::Left => 0,
            Dock::Right => 1,
            Dock::Top => 2,
            Dock::Bottom => 3,
        }
    }
}

/// Root node; always as large as the window.
struct Backdrop;

impl Node for Backdrop {
    fn size(&self, tree: &Tree, _id: NodeId) -> Size {
        let viewport = tree.viewport();
        Size::new(viewport.width, viewport.height)
    }
}

pub struct Act {
    tree: Tree,
    root: NodeId,
    content_layer: NodeId,
    content: Option<NodeId>,
    docked: [Option<NodeId>; 4],
    center: Option<NodeId>,
    mode: Mode,
    background: Color,

    // Pointer interaction
    selected_node: Option<NodeId>,
    saved_mouse_position: Option<Point>,
    right_button_pressed: bool,
    mouse_moved_with_right_button: bool,
    drag_origin: Option<Point>,

    missing_center_reported: bool,
    layout_count: u64,
}

impl Act {
    pub fn new(mode: Mode, background: Color) -> Self {
        let mut tree = Tree::new();
        let root = tree.insert(Backdrop);
        let content_layer = tree.insert(Layer::new());
        tree.add_child(root, content_layer);

        Self {
            tree,
            root,
            content_layer,
            content: None,
            docked: [None; 4],
            center: None,
            mode,
            background,
            selected_node: None,
            saved_mouse_position: None,
            right_button_pressed: false,
            mouse_moved_with_right_button: false,
            drag_origin: None,
            missing_center_reported: false,
            layout_count: 0,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable access for building and animating the scene.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn content_layer(&self) -> NodeId {
        self.content_layer
    }

    pub fn content(&self) -> Option<NodeId> {
        self.content
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn background_color(&self) -> Color {
        self.background
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.background = color;
    }

    pub fn center(&self) -> Option<NodeId> {
        self.center
    }

    /// Node followed in [`Mode::CenteredOnNode`].
    pub fn set_center(&mut self, center: Option<NodeId>) {
        self.center = center;
        self.missing_center_reported = false;
    }

    /// Deepest node under the pointer as of the last motion event.
    pub fn selected_node(&self) -> Option<NodeId> {
        self.selected_node
    }

    /// Number of layout passes run so far.
    pub fn layout_count(&self) -> u64 {
        self.layout_count
    }

    /// Place `content` under the content layer and lay out again.
    ///
    /// Returns the previous content, detached but still alive in the tree.
    pub fn set_content(&mut self, content: NodeId) -> Option<NodeId> {
        let previous = self.content.replace(content);
        if let Some(old) = previous.filter(|&old| old != content) {
            self.tree.remove_child(self.content_layer, old, false);
        }
        self.tree.add_child(self.content_layer, content);
        self.set_up_nodes();
        previous.filter(|&old| old != content)
    }

    pub fn docked_ui(&self, dock: Dock) -> Option<NodeId> {
        self.docked[dock.index()]
    }

    /// Replace the UI docked to `dock` and lay out again.
    ///
    /// Returns the previous occupant, detached but still alive in the tree.
    pub fn set_docked_ui(&mut self, dock: Dock, ui: Option<NodeId>) -> Option<NodeId> {
        let previous = std::mem::replace(&mut self.docked[dock.index()], ui);
        if let Some(old) = previous {
            self.tree.remove_child(self.root, old, false);
        }
        if let Some(new) = ui {
            self.tree.add_child(self.root, new);
        }
        log::debug!("Docked {:?} UI: {:?} -> {:?}", dock, previous, ui);
        self.set_up_nodes();
        previous.filter(|&old| Some(old) != ui)
    }

    pub fn set_left_ui(&mut self, ui: Option<NodeId>) -> Option<NodeId> {
        self.set_docked_ui(Dock::Left, ui)
    }

    pub fn set_right_ui(&mut self, ui: Option<NodeId>) -> Option<NodeId> {
        self.set_docked_ui(Dock::Right, ui)
    }

    pub fn set_top_ui(&mut self, ui: Option<NodeId>) -> Option<NodeId> {
        self.set_docked_ui(Dock::Top, ui)
    }

    pub fn set_bottom_ui(&mut self, ui: Option<NodeId>) -> Option<NodeId> {
        self.set_docked_ui(Dock::Bottom, ui)
    }

    /// Adopt a new window size and lay out again.
    pub fn resize(&mut self, size: Size) {
        let viewport = self.tree.viewport();
        self.tree
            .set_viewport(Viewport::new(size.width, size.height, viewport.focused));
        self.set_up_nodes();
    }

    /// Record whether the window has input focus; hit tests fail without it.
    pub fn set_focused(&mut self, focused: bool) {
        let viewport = self.tree.viewport();
        self.tree
            .set_viewport(Viewport::new(viewport.width, viewport.height, focused));
    }

    /// Dock the UI regions and place the content layer.
    ///
    /// Left and top UI anchor at the window origin, right and bottom UI at
    /// the far edges; the left/top extents shift the others. Running it again
    /// without a change in between yields the same placement.
    pub fn set_up_nodes(&mut self) {
        frame_stats::record_layout();
        self.layout_count += 1;

        let viewport = self.tree.viewport();
        let left_indent = self.docked_extent(Dock::Left, Tree::width);
        let top_indent = self.docked_extent(Dock::Top, Tree::height);

        if let Some(left) = self.docked_ui(Dock::Left) {
            self.tree.set_position(left, Point::new(0.0, top_indent));
        }
        let mut free_width = viewport.width - left_indent;
        if let Some(right) = self.docked_ui(Dock::Right) {
            let width = self.tree.width(right);
            self.tree
                .set_position(right, Point::new(viewport.width - width, top_indent));
            free_width -= width;
        }

        if let Some(top) = self.docked_ui(Dock::Top) {
            self.tree.set_position(top, Point::new(left_indent, 0.0));
        }
        let mut free_height = viewport.height - top_indent;
        if let Some(bottom) = self.docked_ui(Dock::Bottom) {
            let height = self.tree.height(bottom);
            self.tree
                .set_position(bottom, Point::new(left_indent, viewport.height - height));
            free_height -= height;
        }

        let layer = self.content_layer;
        match self.mode {
            Mode::Static => {
                let size = self.tree.size(layer).unwrap_or_default();
                if size.width > 0.0 && size.height > 0.0 {
                    let scale = (free_width / size.width).min(free_height / size.height);
                    self.tree.set_scale(layer, scale);
                }
                self.tree
                    .set_origin(layer, Point::new(size.width / 2.0, size.height / 2.0));
                self.tree.set_position(
                    layer,
                    Point::new(left_indent + free_width / 2.0, top_indent + free_height / 2.0),
                );
            }
            Mode::MovableByMouse | Mode::CenteredOnNode => {
                self.tree.set_scale(layer, parameters::k());
            }
        }

        log::info!(
            "Layout: free area {}x{} at ({}, {})",
            free_width,
            free_height,
            left_indent,
            top_indent
        );
    }

    fn docked_extent(&self, dock: Dock, extent: fn(&Tree, NodeId) -> f32) -> f32 {
        self.docked_ui(dock)
            .map_or(0.0, |id| extent(&self.tree, id))
    }

    /// Run one frame: update the tree, move the content layer as the mode
    /// dictates, then draw everything.
    pub fn update(&mut self, target: &mut dyn RenderTarget) {
        self.tree.update(self.root);

        match self.mode {
            Mode::Static => {}
            Mode::MovableByMouse => self.auto_scroll(),
            Mode::CenteredOnNode => self.follow_center(),
        }

        self.tree.draw_to_target(self.root, target);
    }

    fn auto_scroll(&mut self) {
        let Some(pointer) = self.saved_mouse_position else {
            return;
        };
        let viewport = self.tree.viewport();
        let params = parameters::get();
        let active_area = params.indent / 2.0;
        let step = SCROLL_SPEED * params.k;

        let mut offset = Point::ZERO;
        if pointer.x < active_area {
            offset.x += step;
        } else if pointer.x > viewport.width - active_area {
            offset.x -= step;
        }
        if pointer.y < active_area {
            offset.y += step;
        } else if pointer.y > viewport.height - active_area {
            offset.y -= step;
        }

        if offset != Point::ZERO {
            self.tree.move_by(self.content_layer, offset.x, offset.y);
        }
    }

    fn follow_center(&mut self) {
        let Some(center) = self.center.filter(|&center| self.tree.contains(center)) else {
            if !self.missing_center_reported {
                log::warn!("Act is centered on a node but has no center node");
                self.missing_center_reported = true;
            }
            return;
        };

        let viewport = self.tree.viewport();
        let origin = Point::new(self.tree.origin_x(center), self.tree.origin_y(center));
        let on_screen = self.tree.combined_transform(center).transform_point(origin);
        self.tree.move_by(
            self.content_layer,
            viewport.width / 2.0 - on_screen.x,
            viewport.height / 2.0 - on_screen.y,
        );
    }

    /// Pointer moved to `position` (window coordinates).
    ///
    /// Refreshes the selection chain, forwards the motion to the selected
    /// node and, while the right button is held in
    /// [`Mode::MovableByMouse`], drags the content layer along.
    pub fn on_mouse_moved(&mut self, position: Point) {
        let selected = self.tree.select(self.root, position);
        if selected != self.selected_node {
            log::debug!("Selected node: {:?} -> {:?}", self.selected_node, selected);
            self.selected_node = selected;
        }
        if let Some(node) = self.selected_node {
            self.tree.notify_mouse_moved(node, position);
        }

        if self.mode == Mode::MovableByMouse && self.right_button_pressed {
            if let Some(previous) = self.saved_mouse_position {
                let origin = *self.drag_origin.get_or_insert(previous);
                let distance = (position.x - origin.x).abs() + (position.y - origin.y).abs();
                if distance > DRAG_THRESHOLD {
                    self.mouse_moved_with_right_button = true;
                }
                self.tree
                    .move_by(self.content_layer, position.x - previous.x, position.y - previous.y);
            }
        }
        self.saved_mouse_position = Some(position);
    }

    /// Pointer left the window: the whole selection chain is left.
    pub fn on_mouse_left(&mut self) {
        self.selected_node = None;
        self.tree.deselect_child(self.root);
    }

    pub fn on_left_mouse_button_pressed(&mut self) {
        self.dispatch_to_selected(Tree::left_mouse_button_pressed);
    }

    pub fn on_left_mouse_button_released(&mut self) {
        self.dispatch_to_selected(Tree::left_mouse_button_released);
    }

    pub fn on_right_mouse_button_pressed(&mut self) {
        if self.mode == Mode::MovableByMouse {
            self.right_button_pressed = true;
            self.mouse_moved_with_right_button = false;
            self.drag_origin = self.saved_mouse_position;
        }
    }

    /// Forwarded as a click unless the press started a drag.
    pub fn on_right_mouse_button_released(&mut self) {
        if self.mode == Mode::MovableByMouse {
            self.right_button_pressed = false;
        }
        if !self.mouse_moved_with_right_button {
            self.dispatch_to_selected(Tree::right_mouse_button_released);
        }
    }

    fn dispatch_to_selected(&mut self, dispatch: fn(&mut Tree, NodeId) -> EventResponse) {
        let Some(node) = self.selected_node else {
            return;
        };
        if self.tree.is_selectable(node) {
            let response = dispatch(&mut self.tree, node);
            log::trace!("Button event on {:?}: {:?}", node, response);
        } else {
            self.selected_node = None;
        }
    }
}

impl Default for Act {
    fn default() -> Self {
        Self::new(Mode::default(), Color::BLACK)
    }
}
