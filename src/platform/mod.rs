//! Window backends the stage runs on.
//!
//! A backend is anything implementing [`Window`]: it reports its size and
//! focus, queues [`WindowEvent`]s for the stage to drain, and accepts the
//! frame's draw calls through [`RenderTarget`].

pub mod headless;
pub mod wayland;

pub use headless::HeadlessWindow;
pub use wayland::WaylandWindow;

use thiserror::Error;

use crate::nodes::{Color, Rect, Size};
use crate::transform::Transform;

/// Receiver of node draw calls.
pub trait RenderTarget {
    /// Fill the local rectangle `rect` mapped through `transform` into window
    /// space.
    fn fill_rect(&mut self, rect: Rect, transform: &Transform, color: Color);
}

/// A drawable window with an input queue.
pub trait Window: RenderTarget {
    /// Current client size in logical pixels.
    fn size(&self) -> Size;

    fn has_focus(&self) -> bool;

    fn is_open(&self) -> bool;

    /// Next pending event, without blocking once the queue is empty.
    fn poll_event(&mut self) -> Option<WindowEvent>;

    /// Window-space rectangle mapped onto the whole client area.
    fn set_view(&mut self, view: Rect);

    /// Start a frame filled with `color`.
    fn clear(&mut self, color: Color);

    /// Present the frame built since the last [`Window::clear`].
    fn display(&mut self);

    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowEvent {
    Resized { width: u32, height: u32 },
    MouseButtonPressed { button: MouseButton },
    MouseButtonReleased { button: MouseButton },
    MouseMoved { x: f32, y: f32 },
    /// Pointer left the client area
    MouseLeft,
    FocusGained,
    FocusLost,
    Closed,
}

/// Failures while bringing up a window backend.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("failed to connect to the Wayland display: {0}")]
    Connect(#[from] wayland_client::ConnectError),

    #[error("failed to initialize the Wayland registry: {0}")]
    Registry(#[from] wayland_client::globals::GlobalError),

    #[error("required Wayland global {0} is not available: {1}")]
    Bind(&'static str, wayland_client::globals::BindError),

    #[error("failed to dispatch Wayland events: {0}")]
    Dispatch(#[from] wayland_client::DispatchError),

    #[error("the window was closed before it was configured")]
    ClosedBeforeConfigure,

    #[error("failed to obtain raw window handles: {0}")]
    Handle(#[from] raw_window_handle::HandleError),

    #[error("failed to create a GPU surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create the GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("the GPU surface reports no supported formats")]
    NoSurfaceFormat,
}
