//! A retained-mode scene graph.
//!
//! Nodes live in a [`tree::Tree`] owned by an [`act::Act`]. The act docks up
//! to four UI regions around a content layer and places that layer according
//! to its [`act::Mode`]. A [`stage::Stage`] owns the window and the act and
//! runs the frame loop: drain window events, update the tree, draw, present.

pub mod act;
pub mod event;
pub mod frame_stats;
pub mod nodes;
pub mod parameters;
pub mod platform;
pub mod renderer;
pub mod stage;
pub mod transform;
pub mod transformable;
pub mod tree;

pub mod prelude {
    pub use crate::act::{Act, Dock, Mode};
    pub use crate::event::{Listener, ListenerHandle, CLICK, UPDATED};
    pub use crate::nodes::{
        Color, EventResponse, Layer, Node, NodeCx, Panel, Point, Rect, Size,
    };
    pub use crate::platform::{
        HeadlessWindow, MouseButton, RenderTarget, Window, WindowEvent,
    };
    pub use crate::stage::{Stage, StageConfig};
    pub use crate::transform::Transform;
    pub use crate::tree::{NodeFlags, NodeId, Tree};
}
