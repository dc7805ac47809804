//! The window-owning run loop.

use crate::act::Act;
use crate::frame_stats;
use crate::nodes::{Color, Point, Rect, Size};
use crate::parameters;
use crate::platform::{MouseButton, PlatformError, WaylandWindow, Window, WindowEvent};

pub struct StageConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub app_id: String,
    /// Overrides the act's background color when set.
    pub background_color: Option<Color>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            width: parameters::REFERENCE_WIDTH as u32,
            height: parameters::REFERENCE_HEIGHT as u32,
            title: "proscenium".to_string(),
            app_id: "proscenium".to_string(),
            background_color: None,
        }
    }
}

impl StageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    pub fn background_color(mut self, color: Color) -> Self {
        self.background_color = Some(color);
        self
    }
}

/// Owns the window and the one active [`Act`], and drives frames.
pub struct Stage<W: Window> {
    window: W,
    act: Act,
    view: Rect,
}

impl Stage<WaylandWindow> {
    /// Open a Wayland window and attach `act` to it.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use proscenium::prelude::*;
    ///
    /// let mut act = Act::new(Mode::Static, Color::rgb(0.1, 0.1, 0.15));
    /// let board = act.tree_mut().insert(Panel::new(400.0, 300.0).color(Color::WHITE));
    /// act.set_content(board);
    ///
    /// Stage::open(StageConfig::new().title("board"), act)?.start();
    /// ```
    pub fn open(config: StageConfig, mut act: Act) -> Result<Self, PlatformError> {
        // An embedding application may already have installed a logger.
        let _ = env_logger::try_init();

        if let Some(color) = config.background_color {
            act.set_background_color(color);
        }
        let window = WaylandWindow::open(&config)?;
        log::info!("Opened window {:?} {}x{}", config.title, config.width, config.height);
        Ok(Self::new(window, act))
    }
}

impl<W: Window> Stage<W> {
    pub fn new(window: W, mut act: Act) -> Self {
        let size = window.size();
        parameters::update(size.width, size.height);
        act.set_focused(window.has_focus());

        let mut stage = Self {
            window,
            act,
            view: Rect::from_size(size),
        };
        stage.update_view();
        stage
    }

    /// Run frames until the window is closed.
    pub fn start(&mut self) {
        while self.window.is_open() {
            self.frame();
        }
        log::info!("Window closed, stage stopped");
    }

    /// Drain pending events, then update, draw and present one frame.
    pub fn frame(&mut self) {
        while let Some(event) = self.window.poll_event() {
            self.handle_event(event);
            if !self.window.is_open() {
                return;
            }
        }

        self.window.clear(self.act.background_color());
        self.act.update(&mut self.window);
        self.window.display();
        frame_stats::end_frame();
    }

    fn handle_event(&mut self, event: WindowEvent) {
        log::trace!("Window event: {:?}", event);
        match event {
            WindowEvent::Resized { width, height } => {
                let (width, height) = (width as f32, height as f32);
                log::info!("Resized to {}x{}", width, height);
                parameters::update(width, height);
                self.view = Rect::new(0.0, 0.0, width, height);
                self.update_view();
            }
            WindowEvent::MouseButtonPressed { button } => match button {
                MouseButton::Left => self.act.on_left_mouse_button_pressed(),
                MouseButton::Right => self.act.on_right_mouse_button_pressed(),
                MouseButton::Middle => {}
            },
            WindowEvent::MouseButtonReleased { button } => match button {
                MouseButton::Left => self.act.on_left_mouse_button_released(),
                MouseButton::Right => self.act.on_right_mouse_button_released(),
                MouseButton::Middle => {}
            },
            WindowEvent::MouseMoved { x, y } => self.act.on_mouse_moved(Point::new(x, y)),
            WindowEvent::MouseLeft => self.act.on_mouse_left(),
            WindowEvent::FocusGained => self.act.set_focused(true),
            WindowEvent::FocusLost => self.act.set_focused(false),
            WindowEvent::Closed => self.window.close(),
        }
    }

    /// Lay the act out for the current view and hand the view to the window.
    fn update_view(&mut self) {
        self.act
            .resize(Size::new(self.view.width, self.view.height));
        self.window.set_view(self.view);
    }

    /// Window-space rectangle currently shown; always the window's size.
    pub fn view(&self) -> Rect {
        self.view
    }

    pub fn act(&self) -> &Act {
        &self.act
    }

    pub fn act_mut(&mut self) -> &mut Act {
        &mut self.act
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }
}
