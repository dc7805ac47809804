//! A window without a display.
//!
//! Events are scripted up front and draw calls are recorded, so the whole
//! stage loop can run in tests and in tools that only need the scene logic.

use std::collections::VecDeque;

use super::{RenderTarget, Window, WindowEvent};
use crate::nodes::{Color, Rect, Size};
use crate::transform::Transform;

/// One recorded [`RenderTarget::fill_rect`] call, already in window space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawnRect {
    /// Axis-aligned bounds of the filled rectangle after its transform
    pub bounds: Rect,
    pub color: Color,
}

/// Everything drawn between one `clear` and the following `display`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub clear_color: Color,
    pub rects: Vec<DrawnRect>,
}

pub struct HeadlessWindow {
    size: Size,
    focused: bool,
    open: bool,
    /// Batches of events; each frame drains exactly one batch
    script: VecDeque<Vec<WindowEvent>>,
    pending: VecDeque<WindowEvent>,
    batch_loaded: bool,
    close_when_exhausted: bool,
    view: Rect,
    current: Frame,
    frames: Vec<Frame>,
}

impl HeadlessWindow {
    pub fn new(width: u32, height: u32) -> Self {
        let size = Size::new(width as f32, height as f32);
        Self {
            size,
            focused: true,
            open: true,
            script: VecDeque::new(),
            pending: VecDeque::new(),
            batch_loaded: false,
            close_when_exhausted: false,
            view: Rect::from_size(size),
            current: Frame::default(),
            frames: Vec::new(),
        }
    }

    pub fn with_focus(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Queue the events one frame will drain.
    pub fn push_frame_events(&mut self, events: impl IntoIterator<Item = WindowEvent>) {
        self.script.push_back(events.into_iter().collect());
    }

    /// Close the window once every scripted batch has been delivered.
    pub fn close_when_exhausted(mut self) -> Self {
        self.close_when_exhausted = true;
        self
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn view(&self) -> Rect {
        self.view
    }
}

impl RenderTarget for HeadlessWindow {
    fn fill_rect(&mut self, rect: Rect, transform: &Transform, color: Color) {
        self.current.rects.push(DrawnRect {
            bounds: transform.transform_rect(rect),
            color,
        });
    }
}

impl Window for HeadlessWindow {
    fn size(&self) -> Size {
        self.size
    }

    fn has_focus(&self) -> bool {
        self.focused
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn poll_event(&mut self) -> Option<WindowEvent> {
        if !self.batch_loaded {
            self.batch_loaded = true;
            match self.script.pop_front() {
                Some(batch) => self.pending.extend(batch),
                None if self.close_when_exhausted => self.pending.push_back(WindowEvent::Closed),
                None => {}
            }
        }

        let event = self.pending.pop_front()?;
        match event {
            WindowEvent::Resized { width, height } => {
                self.size = Size::new(width as f32, height as f32);
            }
            WindowEvent::FocusGained => self.focused = true,
            WindowEvent::FocusLost => self.focused = false,
            _ => {}
        }
        Some(event)
    }

    fn set_view(&mut self, view: Rect) {
        self.view = view;
    }

    fn clear(&mut self, color: Color) {
        self.current = Frame {
            clear_color: color,
            rects: Vec::new(),
        };
    }

    fn display(&mut self) {
        self.frames.push(std::mem::take(&mut self.current));
        self.batch_loaded = false;
    }

    fn close(&mut self) {
        self.open = false;
    }
}
