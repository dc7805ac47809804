use crate::event::Speaker;
use crate::platform::RenderTarget;
use crate::transform::Transform;
use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as f32 / 255.0,
            g: ((hex >> 8) & 0xFF) as f32 / 255.0,
            b: (hex & 0xFF) as f32 / 255.0,
            a: 1.0,
        }
    }

    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
}

impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Strict containment: points on the edge are outside.
    pub fn contains(&self, point: Point) -> bool {
        point.x > self.x && point.x < self.right() && point.y > self.y && point.y < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    Ignored,
    Handled,
}

/// Per-callback access to the node being notified.
pub struct NodeCx<'a> {
    pub(crate) id: NodeId,
    pub(crate) speaker: &'a Speaker,
}

impl NodeCx<'_> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Forward a named event to this node's listener, if one is registered.
    pub fn declare_event(&self, name: &str) {
        self.speaker.declare_event(self.id, name);
    }
}

/// Behaviour of one kind of scene-graph node.
///
/// The [`Tree`] owns structure, transforms and selection; a `Node` only
/// supplies its size, its visuals and its reactions to pointer input. Every
/// callback defaults to doing nothing.
pub trait Node {
    /// Natural size of the node's local bounds `(0, 0, width, height)`,
    /// before the node's own scale is applied.
    fn size(&self, tree: &Tree, id: NodeId) -> Size;

    /// Submit this node's own visuals. Children are drawn by the tree
    /// afterwards, on top.
    fn draw(&self, transform: &Transform, target: &mut dyn RenderTarget) {
        let _ = (transform, target);
    }

    /// Called after all children have been updated for this frame.
    fn on_updated(&mut self, cx: &mut NodeCx<'_>) {
        let _ = cx;
    }

    fn on_mouse_entered(&mut self, cx: &mut NodeCx<'_>) {
        let _ = cx;
    }

    fn on_mouse_left(&mut self, cx: &mut NodeCx<'_>) {
        let _ = cx;
    }

    fn on_mouse_moved(&mut self, cx: &mut NodeCx<'_>, position: Point) {
        let _ = (cx, position);
    }

    /// Returning [`EventResponse::Ignored`] lets the tree forward the press to
    /// this node's selected child.
    fn on_left_mouse_button_pressed(&mut self, cx: &mut NodeCx<'_>) -> EventResponse {
        let _ = cx;
        EventResponse::Ignored
    }

    fn on_left_mouse_button_released(&mut self, cx: &mut NodeCx<'_>) -> EventResponse {
        let _ = cx;
        EventResponse::Ignored
    }

    fn on_right_mouse_button_released(&mut self, cx: &mut NodeCx<'_>) -> EventResponse {
        let _ = cx;
        EventResponse::Ignored
    }
}

impl Node for Box<dyn Node> {
    fn size(&self, tree: &Tree, id: NodeId) -> Size {
        (**self).size(tree, id)
    }
    fn draw(&self, transform: &Transform, target: &mut dyn RenderTarget) {
        (**self).draw(transform, target)
    }
    fn on_updated(&mut self, cx: &mut NodeCx<'_>) {
        (**self).on_updated(cx)
    }
    fn on_mouse_entered(&mut self, cx: &mut NodeCx<'_>) {
        (**self).on_mouse_entered(cx)
    }
    fn on_mouse_left(&mut self, cx: &mut NodeCx<'_>) {
        (**self).on_mouse_left(cx)
    }
    fn on_mouse_moved(&mut self, cx: &mut NodeCx<'_>, position: Point) {
        (**self).on_mouse_moved(cx, position)
    }
    fn on_left_mouse_button_pressed(&mut self, cx: &mut NodeCx<'_>) -> EventResponse {
        (**self).on_left_mouse_button_pressed(cx)
    }
    fn on_left_mouse_button_released(&mut self, cx: &mut NodeCx<'_>) -> EventResponse {
        (**self).on_left_mouse_button_released(cx)
    }
    fn on_right_mouse_button_released(&mut self, cx: &mut NodeCx<'_>) -> EventResponse {
        (**self).on_right_mouse_button_released(cx)
    }
}
