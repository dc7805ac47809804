//! Wayland backend: an xdg toplevel drawn with the wgpu quad renderer.

use std::collections::VecDeque;

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle,
    RawWindowHandle, WaylandDisplayHandle, WaylandWindowHandle, WindowHandle,
};
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    delegate_compositor, delegate_output, delegate_pointer, delegate_registry, delegate_seat,
    delegate_xdg_shell, delegate_xdg_window,
    output::{OutputHandler, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::{
        pointer::{PointerEvent, PointerEventKind, PointerHandler},
        Capability, SeatHandler, SeatState,
    },
    shell::{
        xdg::{
            window::{
                Window as XdgWindow, WindowConfigure, WindowDecorations, WindowHandler,
            },
            XdgShell,
        },
        WaylandSurface,
    },
};
use smithay_client_toolkit::reexports::csd_frame::WindowState;
use wayland_backend::sys::client::ObjectId;
use wayland_client::{
    globals::registry_queue_init,
    protocol::{wl_output, wl_pointer, wl_seat, wl_surface},
    Connection, EventQueue, Proxy, QueueHandle,
};

use super::{MouseButton, PlatformError, RenderTarget, Window, WindowEvent};
use crate::nodes::{Color, Rect, Size};
use crate::renderer::{GpuContext, Renderer, SurfaceState};
use crate::stage::StageConfig;
use crate::transform::Transform;

pub struct WaylandState {
    registry_state: RegistryState,
    _compositor_state: CompositorState,
    output_state: OutputState,
    seat_state: SeatState,
    _xdg_shell: XdgShell,
    window: XdgWindow,
    configured: bool,
    width: u32,
    height: u32,
    scale_factor: i32,
    activated: bool,
    exit: bool,

    // Pointer state
    pointer: Option<wl_pointer::WlPointer>,
    pointer_over_surface: bool,

    // Pending events to be drained by the stage
    pending_events: VecDeque<WindowEvent>,
}

impl WaylandState {
    fn push(&mut self, event: WindowEvent) {
        self.pending_events.push_back(event);
    }

    fn physical_size(&self) -> (u32, u32) {
        let scale = self.scale_factor.max(1) as u32;
        (self.width * scale, self.height * scale)
    }
}

/// Raw handles for wgpu surface creation.
struct WaylandWindowWrapper {
    display: *mut std::ffi::c_void,
    surface: *mut std::ffi::c_void,
}

impl WaylandWindowWrapper {
    fn new(connection: &Connection, surface: &wl_surface::WlSurface) -> Self {
        let display = connection.backend().display_ptr() as *mut std::ffi::c_void;
        let surface_id = surface.id();
        let surface = ObjectId::as_ptr(&surface_id) as *mut std::ffi::c_void;
        Self { display, surface }
    }
}

impl HasDisplayHandle for WaylandWindowWrapper {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        let ptr = std::ptr::NonNull::new(self.display).ok_or(HandleError::Unavailable)?;
        let handle = WaylandDisplayHandle::new(ptr);
        Ok(unsafe { DisplayHandle::borrow_raw(RawDisplayHandle::Wayland(handle)) })
    }
}

impl HasWindowHandle for WaylandWindowWrapper {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        let ptr = std::ptr::NonNull::new(self.surface).ok_or(HandleError::Unavailable)?;
        let handle = WaylandWindowHandle::new(ptr);
        Ok(unsafe { WindowHandle::borrow_raw(RawWindowHandle::Wayland(handle)) })
    }
}

/// A desktop window on a Wayland compositor.
pub struct WaylandWindow {
    // Declared first so GPU objects are dropped before the Wayland objects
    // their surface points into.
    renderer: Renderer,
    surface: SurfaceState,
    _gpu: GpuContext,
    state: WaylandState,
    event_queue: EventQueue<WaylandState>,
    connection: Connection,
    open: bool,
    dispatched: bool,
}

impl WaylandWindow {
    pub fn open(config: &StageConfig) -> Result<Self, PlatformError> {
        let connection = Connection::connect_to_env()?;
        let (globals, mut event_queue) = registry_queue_init::<WaylandState>(&connection)?;
        let qh = event_queue.handle();

        let compositor_state = CompositorState::bind(&globals, &qh)
            .map_err(|e| PlatformError::Bind("wl_compositor", e))?;
        let xdg_shell =
            XdgShell::bind(&globals, &qh).map_err(|e| PlatformError::Bind("xdg_wm_base", e))?;

        let surface = compositor_state.create_surface(&qh);
        let window = xdg_shell.create_window(surface, WindowDecorations::RequestServer, &qh);
        window.set_title(config.title.clone());
        window.set_app_id(config.app_id.clone());
        window.set_min_size(Some((1, 1)));
        window.commit();

        let mut state = WaylandState {
            registry_state: RegistryState::new(&globals),
            _compositor_state: compositor_state,
            output_state: OutputState::new(&globals, &qh),
            seat_state: SeatState::new(&globals, &qh),
            _xdg_shell: xdg_shell,
            window,
            configured: false,
            width: config.width,
            height: config.height,
            scale_factor: 1,
            activated: false,
            exit: false,
            pointer: None,
            pointer_over_surface: false,
            pending_events: VecDeque::new(),
        };

        // Wait for configure
        while !state.configured && !state.exit {
            event_queue.blocking_dispatch(&mut state)?;
        }
        if state.exit {
            return Err(PlatformError::ClosedBeforeConfigure);
        }

        let gpu = GpuContext::new()?;
        let handles = WaylandWindowWrapper::new(&connection, state.window.wl_surface());
        let (physical_width, physical_height) = state.physical_size();
        log::info!(
            "Creating surface: logical {}x{}, physical {}x{}",
            state.width,
            state.height,
            physical_width,
            physical_height
        );
        // SAFETY: the wl_display and wl_surface are owned by `connection` and
        // `state`, which are dropped after `surface`.
        let surface = unsafe { gpu.create_surface(&handles, physical_width, physical_height)? };

        let mut renderer = Renderer::new(gpu.device.clone(), gpu.queue.clone(), surface.format());
        renderer.set_view(Rect::new(
            0.0,
            0.0,
            state.width as f32,
            state.height as f32,
        ));

        Ok(Self {
            renderer,
            surface,
            _gpu: gpu,
            state,
            event_queue,
            connection,
            open: true,
            dispatched: false,
        })
    }

    /// Read whatever the compositor has sent, without blocking.
    fn dispatch(&mut self) {
        if let Err(e) = self.connection.flush() {
            log::warn!("Failed to flush Wayland connection: {}", e);
        }
        if let Some(guard) = self.event_queue.prepare_read() {
            if let Err(e) = guard.read() {
                log::trace!("No Wayland events read: {}", e);
            }
        }
        if let Err(e) = self.event_queue.dispatch_pending(&mut self.state) {
            log::error!("Failed to dispatch Wayland events: {}", e);
            self.state.push(WindowEvent::Closed);
        }
    }
}

impl RenderTarget for WaylandWindow {
    fn fill_rect(&mut self, rect: Rect, transform: &Transform, color: Color) {
        self.renderer.push_rect(rect, transform, color);
    }
}

impl Window for WaylandWindow {
    fn size(&self) -> Size {
        Size::new(self.state.width as f32, self.state.height as f32)
    }

    fn has_focus(&self) -> bool {
        self.state.activated
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn poll_event(&mut self) -> Option<WindowEvent> {
        if !self.dispatched {
            self.dispatched = true;
            self.dispatch();
        }
        self.state.pending_events.pop_front()
    }

    fn set_view(&mut self, view: Rect) {
        self.renderer.set_view(view);
    }

    fn clear(&mut self, color: Color) {
        self.renderer.begin(color);
    }

    fn display(&mut self) {
        let (width, height) = self.state.physical_size();
        if self.surface.width() != width || self.surface.height() != height {
            log::info!("Resizing surface to {}x{} (physical)", width, height);
            self.surface.resize(width, height);
        }

        self.renderer.render(&mut self.surface);
        self.dispatched = false;
    }

    fn close(&mut self) {
        self.open = false;
    }
}

impl CompositorHandler for WaylandState {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        surface: &wl_surface::WlSurface,
        new_factor: i32,
    ) {
        log::info!("Scale factor changed to: {}", new_factor);
        self.scale_factor = new_factor;
        surface.set_buffer_scale(new_factor);
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
    }

    fn frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
    }

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }
}

impl OutputHandler for WaylandState {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
    }

    fn update_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
    }

    fn output_destroyed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
    }
}

impl WindowHandler for WaylandState {
    fn request_close(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _window: &XdgWindow) {
        self.exit = true;
        self.push(WindowEvent::Closed);
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _window: &XdgWindow,
        configure: WindowConfigure,
        _serial: u32,
    ) {
        let width = configure.new_size.0.map_or(self.width, |w| w.get());
        let height = configure.new_size.1.map_or(self.height, |h| h.get());

        let activated = configure.state.contains(WindowState::ACTIVATED);
        if activated != self.activated {
            self.activated = activated;
            self.push(if activated {
                WindowEvent::FocusGained
            } else {
                WindowEvent::FocusLost
            });
        }

        if self.configured && (width != self.width || height != self.height) {
            self.push(WindowEvent::Resized { width, height });
        }
        log::info!("Window configure: using size {}x{}", width, height);
        self.width = width;
        self.height = height;
        self.configured = true;
    }
}

impl SeatHandler for WaylandState {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {}

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        if capability == Capability::Pointer && self.pointer.is_none() {
            log::info!("Pointer capability available, creating pointer");
            match self.seat_state.get_pointer(qh, &seat) {
                Ok(pointer) => self.pointer = Some(pointer),
                Err(e) => log::warn!("Failed to get pointer: {}", e),
            }
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        if capability == Capability::Pointer {
            log::info!("Pointer capability removed");
            if let Some(pointer) = self.pointer.take() {
                pointer.release();
            }
        }
    }

    fn remove_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {
    }
}

impl PointerHandler for WaylandState {
    fn pointer_frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _pointer: &wl_pointer::WlPointer,
        events: &[PointerEvent],
    ) {
        for event in events {
            if &event.surface != self.window.wl_surface() {
                continue;
            }

            let (x, y) = (event.position.0 as f32, event.position.1 as f32);
            match event.kind {
                PointerEventKind::Enter { .. } => {
                    self.pointer_over_surface = true;
                    self.push(WindowEvent::MouseMoved { x, y });
                }
                PointerEventKind::Leave { .. } => {
                    if self.pointer_over_surface {
                        self.pointer_over_surface = false;
                        self.push(WindowEvent::MouseLeft);
                    }
                }
                PointerEventKind::Motion { .. } => {
                    self.push(WindowEvent::MouseMoved { x, y });
                }
                PointerEventKind::Press { button, .. } => {
                    if let Some(button) = wayland_button_to_mouse_button(button) {
                        self.push(WindowEvent::MouseButtonPressed { button });
                    }
                }
                PointerEventKind::Release { button, .. } => {
                    if let Some(button) = wayland_button_to_mouse_button(button) {
                        self.push(WindowEvent::MouseButtonReleased { button });
                    }
                }
                PointerEventKind::Axis { .. } => {}
            }
        }
    }
}

/// Convert a Linux input event code to MouseButton
fn wayland_button_to_mouse_button(button: u32) -> Option<MouseButton> {
    // From linux/input-event-codes.h
    const BTN_LEFT: u32 = 0x110;
    const BTN_RIGHT: u32 = 0x111;
    const BTN_MIDDLE: u32 = 0x112;

    match button {
        BTN_LEFT => Some(MouseButton::Left),
        BTN_RIGHT => Some(MouseButton::Right),
        BTN_MIDDLE => Some(MouseButton::Middle),
        _ => None,
    }
}

impl ProvidesRegistryState for WaylandState {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![OutputState, SeatState];
}

delegate_compositor!(WaylandState);
delegate_output!(WaylandState);
delegate_seat!(WaylandState);
delegate_pointer!(WaylandState);
delegate_xdg_shell!(WaylandState);
delegate_xdg_window!(WaylandState);
delegate_registry!(WaylandState);
