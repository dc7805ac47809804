//! Flat-colour quad renderer backing the Wayland window.
//!
//! Nodes submit rectangles with their combined transform; the batch maps the
//! four corners through that transform and the current view into NDC on the
//! CPU, so rotated and scaled nodes come out exact. One draw call per frame.

pub mod context;
pub mod pipeline;

pub use context::{GpuContext, SurfaceState};

use std::sync::Arc;

use wgpu::util::DeviceExt;
use wgpu::{Device, Queue, RenderPipeline};

use crate::nodes::{Color, Point, Rect};
use crate::transform::Transform;
use pipeline::Vertex;

/// CPU-side vertex list for one frame.
#[derive(Debug, Default)]
pub struct QuadBatch {
    view: Rect,
    vertices: Vec<Vertex>,
}

impl QuadBatch {
    pub fn new(view: Rect) -> Self {
        Self {
            view,
            vertices: Vec::new(),
        }
    }

    pub fn set_view(&mut self, view: Rect) {
        self.view = view;
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    fn to_ndc(&self, point: Point) -> [f32; 2] {
        if self.view.width <= 0.0 || self.view.height <= 0.0 {
            return [0.0, 0.0];
        }
        [
            (point.x - self.view.x) / self.view.width * 2.0 - 1.0,
            1.0 - (point.y - self.view.y) / self.view.height * 2.0,
        ]
    }

    /// Append two triangles covering `rect` mapped through `transform`.
    pub fn push_rect(&mut self, rect: Rect, transform: &Transform, color: Color) {
        let corners = [
            Point::new(rect.x, rect.y),
            Point::new(rect.right(), rect.y),
            Point::new(rect.right(), rect.bottom()),
            Point::new(rect.x, rect.bottom()),
        ]
        .map(|corner| Vertex {
            position: self.to_ndc(transform.transform_point(corner)),
            color: [color.r, color.g, color.b, color.a],
        });

        self.vertices.extend_from_slice(&[
            corners[0], corners[1], corners[2], corners[0], corners[2], corners[3],
        ]);
    }
}

pub struct Renderer {
    device: Arc<Device>,
    queue: Arc<Queue>,
    pipeline: RenderPipeline,
    batch: QuadBatch,
    clear_color: Color,
}

impl Renderer {
    pub fn new(device: Arc<Device>, queue: Arc<Queue>, format: wgpu::TextureFormat) -> Self {
        let pipeline = pipeline::create_render_pipeline(&device, format);
        Self {
            device,
            queue,
            pipeline,
            batch: QuadBatch::default(),
            clear_color: Color::BLACK,
        }
    }

    pub fn set_view(&mut self, view: Rect) {
        self.batch.set_view(view);
    }

    /// Start a new frame.
    pub fn begin(&mut self, clear_color: Color) {
        self.clear_color = clear_color;
        self.batch.clear();
    }

    pub fn push_rect(&mut self, rect: Rect, transform: &Transform, color: Color) {
        self.batch.push_rect(rect, transform, color);
    }

    /// Draw the batched quads and present.
    pub fn render(&mut self, surface: &mut SurfaceState) {
        let output = match surface.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost, reconfiguring");
                surface.reconfigure();
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory");
                return;
            }
            Err(e) => {
                log::error!("Surface error: {:?}", e);
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let vertex_buffer = if self.batch.vertices().is_empty() {
            None
        } else {
            Some(
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Quad Vertex Buffer"),
                        contents: bytemuck::cast_slice(self.batch.vertices()),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
            )
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Renderer Encoder"),
            });

        {
            let clear_color = self.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Renderer Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear_color.r as f64,
                            g: clear_color.g as f64,
                            b: clear_color.b as f64,
                            a: clear_color.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let Some(ref buffer) = vertex_buffer {
                render_pass.set_pipeline(&self.pipeline);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(0..self.batch.vertices().len() as u32, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}
