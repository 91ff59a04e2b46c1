//! CPU framebuffer backend
//!
//! Rasterizes draws as axis-aligned boxes into an RGBA framebuffer and keeps
//! a log of every command it received. Tests use the log to check frame
//! ordering, the framebuffer to check colors, and [`SoftwareBackend::fail_after`]
//! to make resource creation fail at a chosen point.

use std::any::Any;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::geom::Rect;
use crate::gpu::{BufferId, DrawCall, GpuBackend, Primitive, ShaderId, ShaderSource};
use crate::style::Color;

/// Pixel color for test verification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Color> for Pixel {
    fn from(c: Color) -> Self {
        let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Pixel {
            r: to_u8(c.r),
            g: to_u8(c.g),
            b: to_u8(c.b),
            a: to_u8(c.a),
        }
    }
}

/// One recorded backend call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Viewport { width: u32, height: u32 },
    Scissor(Rect),
    Clear(Color),
    Draw(DrawCall),
    Present,
}

#[derive(Debug)]
enum SoftBuffer {
    Index(Vec<u8>),
    Vertex(Vec<[f32; 2]>),
}

#[derive(Debug)]
pub struct SoftwareBackend {
    width: u32,
    height: u32,
    framebuffer: Vec<Pixel>,
    scissor: Option<Rect>,
    shaders: HashMap<ShaderId, &'static str>,
    buffers: HashMap<BufferId, SoftBuffer>,
    next_id: u32,
    commands: Vec<Command>,
    /// Creations still allowed before failures start; `None` never fails.
    fail_after: Option<usize>,
    live: Rc<Cell<usize>>,
    presented: usize,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            framebuffer: vec![Pixel::default(); (width * height) as usize],
            scissor: None,
            shaders: HashMap::new(),
            buffers: HashMap::new(),
            next_id: 1,
            commands: Vec::new(),
            fail_after: None,
            live: Rc::new(Cell::new(0)),
            presented: 0,
        }
    }

    /// Let `n` more shader/buffer creations succeed, then fail every one.
    pub fn fail_after(&mut self, n: usize) {
        self.fail_after = Some(n);
    }

    /// Count of live shaders and buffers, shared so it can be read after the
    /// backend itself is gone.
    pub fn live_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.live)
    }

    /// Share an external live-resource counter.
    pub fn with_live_counter(mut self, live: Rc<Cell<usize>>) -> Self {
        self.live = live;
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn presented_frames(&self) -> usize {
        self.presented
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn sample(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.framebuffer.get((y * self.width + x) as usize).copied()
    }

    fn allocate(&mut self, what: &str) -> std::result::Result<u32, String> {
        if let Some(remaining) = self.fail_after.as_mut() {
            if *remaining == 0 {
                return Err(format!("injected failure creating {}", what));
            }
            *remaining -= 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.live.set(self.live.get() + 1);
        Ok(id)
    }

    fn release(&mut self) {
        self.live.set(self.live.get().saturating_sub(1));
    }

    /// Visible region: the scissor clipped to the framebuffer.
    fn clip(&self) -> (i32, i32, i32, i32) {
        let full = (0, 0, self.width as i32, self.height as i32);
        match self.scissor {
            Some(s) => (
                (s.x as i32).max(0),
                (s.y as i32).max(0),
                ((s.x + s.w) as i32).min(full.2),
                ((s.y + s.h) as i32).min(full.3),
            ),
            None => full,
        }
    }

    fn fill(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Pixel) {
        let (cx0, cy0, cx1, cy1) = self.clip();
        let (x0, y0) = (x0.max(cx0), y0.max(cy0));
        let (x1, y1) = (x1.min(cx1), y1.min(cy1));
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        draw_rect_to_framebuffer(
            &mut self.framebuffer,
            self.width,
            self.height,
            x0,
            y0,
            x1 - x0,
            y1 - y0,
            color,
        );
    }

    /// Bounding box of the vertices the draw's indices touch.
    fn draw_bounds(&self, call: &DrawCall) -> Option<(i32, i32, i32, i32)> {
        let Some(SoftBuffer::Index(indices)) = self.buffers.get(&call.indices) else {
            return None;
        };
        let Some(SoftBuffer::Vertex(vertices)) = self.buffers.get(&call.vertices) else {
            return None;
        };

        let mut bounds: Option<(f32, f32, f32, f32)> = None;
        for &i in indices {
            let Some(&[x, y]) = vertices.get(i as usize) else {
                continue;
            };
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        bounds.map(|(x0, y0, x1, y1)| (x0 as i32, y0 as i32, x1 as i32, y1 as i32))
    }
}

/// Fill a rectangle with simple alpha blending.
#[allow(clippy::too_many_arguments)]
fn draw_rect_to_framebuffer(
    framebuffer: &mut [Pixel],
    fb_width: u32,
    fb_height: u32,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    color: Pixel,
) {
    let x_start = x.max(0) as u32;
    let y_start = y.max(0) as u32;
    let x_end = ((x + width).max(0) as u32).min(fb_width);
    let y_end = ((y + height).max(0) as u32).min(fb_height);

    for py in y_start..y_end {
        for px in x_start..x_end {
            let idx = (py * fb_width + px) as usize;
            let Some(dst) = framebuffer.get_mut(idx) else {
                continue;
            };
            if color.a == 255 {
                *dst = color;
            } else if color.a > 0 {
                let alpha = color.a as f32 / 255.0;
                let inv_alpha = 1.0 - alpha;
                *dst = Pixel {
                    r: (color.r as f32 * alpha + dst.r as f32 * inv_alpha) as u8,
                    g: (color.g as f32 * alpha + dst.g as f32 * inv_alpha) as u8,
                    b: (color.b as f32 * alpha + dst.b as f32 * inv_alpha) as u8,
                    a: 255,
                };
            }
        }
    }
}

impl GpuBackend for SoftwareBackend {
    fn create_shader(&mut self, source: &ShaderSource) -> Result<ShaderId> {
        let id = self.allocate(source.name).map_err(|reason| Error::Shader {
            name: source.name,
            reason,
        })?;
        self.shaders.insert(ShaderId(id), source.name);
        Ok(ShaderId(id))
    }

    fn free_shader(&mut self, shader: ShaderId) {
        if self.shaders.remove(&shader).is_some() {
            self.release();
        }
    }

    fn create_index_buffer(&mut self, label: &'static str, indices: &[u8]) -> Result<BufferId> {
        let id = self
            .allocate(label)
            .map_err(|reason| Error::Buffer { label, reason })?;
        self.buffers.insert(BufferId(id), SoftBuffer::Index(indices.to_vec()));
        Ok(BufferId(id))
    }

    fn create_vertex_buffer(&mut self, label: &'static str) -> Result<BufferId> {
        let id = self
            .allocate(label)
            .map_err(|reason| Error::Buffer { label, reason })?;
        self.buffers.insert(BufferId(id), SoftBuffer::Vertex(Vec::new()));
        Ok(BufferId(id))
    }

    fn upload_vertices(&mut self, buffer: BufferId, vertices: &[[f32; 2]]) {
        match self.buffers.get_mut(&buffer) {
            Some(SoftBuffer::Vertex(data)) => {
                data.clear();
                data.extend_from_slice(vertices);
            }
            _ => log::warn!("software: upload to unknown vertex buffer {:?}", buffer),
        }
    }

    fn free_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_some() {
            self.release();
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.commands.push(Command::Viewport { width, height });
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.framebuffer = vec![Pixel::default(); (width * height) as usize];
        }
    }

    fn set_scissor(&mut self, rect: Rect) {
        self.commands.push(Command::Scissor(rect));
        self.scissor = Some(rect);
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(Command::Clear(color));
        let (x0, y0, x1, y1) = self.clip();
        let pixel = Pixel::from(Color { a: 1.0, ..color });
        self.fill(x0, y0, x1, y1, pixel);
    }

    fn draw(&mut self, call: &DrawCall) {
        self.commands.push(Command::Draw(*call));
        let Some((x0, y0, x1, y1)) = self.draw_bounds(call) else {
            log::debug!("software: draw with missing buffers {:?}", call);
            return;
        };
        let color = Pixel::from(call.color);
        match call.primitive {
            Primitive::TriangleList | Primitive::TriangleStrip => self.fill(x0, y0, x1, y1, color),
            Primitive::LineLoop => {
                self.fill(x0, y0, x1, y0 + 1, color);
                self.fill(x0, y1 - 1, x1, y1, color);
                self.fill(x0, y0, x0 + 1, y1, color);
                self.fill(x1 - 1, y0, x1, y1, color);
            }
        }
    }

    fn present(&mut self) {
        self.commands.push(Command::Present);
        self.presented += 1;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
