pub mod layer;
pub mod node;
pub mod panel;

pub use layer::Layer;
pub use node::{Color, EventResponse, Node, NodeCx, Point, Rect, Size};
pub use panel::Panel;
