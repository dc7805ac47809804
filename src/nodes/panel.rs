use crate::event::CLICK;
use crate::nodes::{Color, EventResponse, Node, NodeCx, Rect, Size};
use crate::platform::RenderTarget;
use crate::transform::Transform;
use crate::tree::{NodeId, Tree};

/// A fixed-size filled rectangle.
///
/// Used for docked UI regions and simple content. A clickable panel declares
/// [`CLICK`] on left-button release and stops the release there.
#[derive(Debug, Clone)]
pub struct Panel {
    size: Size,
    color: Color,
    clickable: bool,
}

impl Panel {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Size::new(width, height),
            color: Color::TRANSPARENT,
            clickable: false,
        }
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn clickable(mut self, clickable: bool) -> Self {
        self.clickable = clickable;
        self
    }
}

impl Node for Panel {
    fn size(&self, _tree: &Tree, _id: NodeId) -> Size {
        self.size
    }

    fn draw(&self, transform: &Transform, target: &mut dyn RenderTarget) {
        if self.color.a > 0.0 {
            target.fill_rect(Rect::from_size(self.size), transform, self.color);
        }
    }

    fn on_left_mouse_button_released(&mut self, cx: &mut NodeCx<'_>) -> EventResponse {
        if !self.clickable {
            return EventResponse::Ignored;
        }
        cx.declare_event(CLICK);
        EventResponse::Handled
    }
}
