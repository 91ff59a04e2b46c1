//! GPU abstraction
//!
//! The widget core never talks to a graphics API directly. It goes through
//! [`GpuBackend`], which hands out opaque shader and buffer ids and records
//! indexed draws. Two backends exist: [`wgpu_backend::WgpuBackend`] for real
//! windows and [`software::SoftwareBackend`], a CPU framebuffer used by tests
//! and the headless platform.
//!
//! [`WindowResources`] holds the shaders and index buffers every window
//! shares with its widgets.

use std::any::Any;

use crate::error::Result;
use crate::geom::Rect;
use crate::style::Color;

pub mod software;
pub mod wgpu_backend;

// =============================================================================
// Handles & Draw Commands
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub(crate) u32);

/// A named fragment stage. Backends wrap it with their own vertex stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderSource {
    pub name: &'static str,
    /// WGSL body defining `fs_main(in: VertexOutput) -> @location(0) vec4<f32>`.
    pub fragment: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    TriangleList,
    TriangleStrip,
    /// Closed outline through every index.
    LineLoop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub shader: ShaderId,
    pub vertices: BufferId,
    pub indices: BufferId,
    pub primitive: Primitive,
    pub color: Color,
}

/// Everything the widget core needs from a graphics API.
pub trait GpuBackend {
    fn create_shader(&mut self, source: &ShaderSource) -> Result<ShaderId>;
    fn free_shader(&mut self, shader: ShaderId);

    /// Static index data, 8-bit indices.
    fn create_index_buffer(&mut self, label: &'static str, indices: &[u8]) -> Result<BufferId>;
    /// A vertex buffer filled later with [`upload_vertices`](Self::upload_vertices).
    fn create_vertex_buffer(&mut self, label: &'static str) -> Result<BufferId>;
    /// Replace the contents of a vertex buffer with pixel-space positions.
    fn upload_vertices(&mut self, buffer: BufferId, vertices: &[[f32; 2]]);
    fn free_buffer(&mut self, buffer: BufferId);

    fn set_viewport(&mut self, width: u32, height: u32);
    fn set_scissor(&mut self, rect: Rect);
    fn clear(&mut self, color: Color);
    fn draw(&mut self, call: &DrawCall);
    /// Show everything drawn since the last present.
    fn present(&mut self);

    fn as_any(&self) -> &dyn Any;
}

// =============================================================================
// Built-in Shaders & Index Data
// =============================================================================

pub const DEFAULT_SHADER: ShaderSource = ShaderSource {
    name: "default",
    fragment: "
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
",
};

pub const SURFACE_SHADER: ShaderSource = ShaderSource {
    name: "surface",
    fragment: "
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color.rgb * in.color.a, in.color.a);
}
",
};

pub const STYLEQUAD_SHADER: ShaderSource = ShaderSource {
    name: "stylequad",
    fragment: "
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    if (in.color.a <= 0.0) {
        discard;
    }
    return in.color;
}
",
};

/// Quad as a triangle strip over corners TL, TR, BR, BL.
pub const QUAD_SOLID_INDICES: [u8; 4] = [0, 1, 3, 2];
/// Quad outline as a line loop.
pub const QUAD_OUTLINE_INDICES: [u8; 4] = [0, 1, 2, 3];

/// Nine-slice border over a 4x4 vertex grid, center cell left out.
#[rustfmt::skip]
pub const STYLEQUAD_BORDER_INDICES: [u8; 48] = [
     0,  2,  1,  3,  2,  0,
     1,  7,  4,  2,  7,  1,
     4,  6,  5,  7,  6,  4,

     3,  9,  2,  8,  9,  3,
     7, 13,  6, 12, 13,  7,

     8, 10,  9, 11, 10,  8,
     9, 15, 12, 10, 15,  9,
    12, 14, 13, 15, 14, 12,
];

/// Center cell of the nine-slice grid as a triangle strip.
pub const STYLEQUAD_SOLID_INDICES: [u8; 4] = [2, 7, 9, 12];
/// Center cell outline as a line loop.
pub const STYLEQUAD_OUTLINE_INDICES: [u8; 4] = [2, 7, 12, 9];

// =============================================================================
// Shared Window Resources
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shaders {
    pub default: ShaderId,
    pub surface: ShaderId,
    pub stylequad: ShaderId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBuffers {
    pub quad_solid: BufferId,
    pub quad_outline: BufferId,
    pub stylequad_border: BufferId,
    pub stylequad_solid: BufferId,
    pub stylequad_outline: BufferId,
}

/// Shaders and index buffers owned by a window and shared by its widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowResources {
    pub shaders: Shaders,
    pub ibos: IndexBuffers,
}

#[derive(Debug, Clone, Copy)]
enum Acquired {
    Shader(ShaderId),
    Buffer(BufferId),
}

fn release_acquired(backend: &mut dyn GpuBackend, acquired: Vec<Acquired>) {
    for resource in acquired.into_iter().rev() {
        match resource {
            Acquired::Shader(id) => backend.free_shader(id),
            Acquired::Buffer(id) => backend.free_buffer(id),
        }
    }
}

fn acquire_shader(
    backend: &mut dyn GpuBackend,
    acquired: &mut Vec<Acquired>,
    source: &ShaderSource,
) -> Result<ShaderId> {
    let id = backend.create_shader(source)?;
    acquired.push(Acquired::Shader(id));
    Ok(id)
}

fn acquire_ibo(
    backend: &mut dyn GpuBackend,
    acquired: &mut Vec<Acquired>,
    label: &'static str,
    indices: &[u8],
) -> Result<BufferId> {
    let id = backend.create_index_buffer(label, indices)?;
    acquired.push(Acquired::Buffer(id));
    Ok(id)
}

impl WindowResources {
    /// Create all shared resources. On failure, whatever was already created
    /// is freed in reverse order before the error is returned.
    pub fn create(backend: &mut dyn GpuBackend) -> Result<Self> {
        let mut acquired = Vec::with_capacity(8);
        match Self::acquire_all(backend, &mut acquired) {
            Ok(resources) => Ok(resources),
            Err(e) => {
                log::warn!("window resources: {}; releasing {} resources", e, acquired.len());
                release_acquired(backend, acquired);
                Err(e)
            }
        }
    }

    fn acquire_all(backend: &mut dyn GpuBackend, acquired: &mut Vec<Acquired>) -> Result<Self> {
        let shaders = Shaders {
            default: acquire_shader(backend, acquired, &DEFAULT_SHADER)?,
            surface: acquire_shader(backend, acquired, &SURFACE_SHADER)?,
            stylequad: acquire_shader(backend, acquired, &STYLEQUAD_SHADER)?,
        };
        log::debug!("window resources: shaders ready");

        let ibos = IndexBuffers {
            quad_solid: acquire_ibo(backend, acquired, "quad_solid", &QUAD_SOLID_INDICES)?,
            quad_outline: acquire_ibo(backend, acquired, "quad_outline", &QUAD_OUTLINE_INDICES)?,
            stylequad_border: acquire_ibo(backend, acquired, "stylequad_border", &STYLEQUAD_BORDER_INDICES)?,
            stylequad_solid: acquire_ibo(backend, acquired, "stylequad_solid", &STYLEQUAD_SOLID_INDICES)?,
            stylequad_outline: acquire_ibo(backend, acquired, "stylequad_outline", &STYLEQUAD_OUTLINE_INDICES)?,
        };
        log::debug!("window resources: index buffers ready");

        Ok(Self { shaders, ibos })
    }

    /// Free index buffers, then shaders, each in reverse creation order.
    pub fn release(self, backend: &mut dyn GpuBackend) {
        let ibos = self.ibos;
        let shaders = self.shaders;
        release_acquired(
            backend,
            vec![
                Acquired::Shader(shaders.default),
                Acquired::Shader(shaders.surface),
                Acquired::Shader(shaders.stylequad),
                Acquired::Buffer(ibos.quad_solid),
                Acquired::Buffer(ibos.quad_outline),
                Acquired::Buffer(ibos.stylequad_border),
                Acquired::Buffer(ibos.stylequad_solid),
                Acquired::Buffer(ibos.stylequad_outline),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::software::SoftwareBackend;
    use super::*;

    #[test]
    fn test_resources_create_and_release() {
        let mut backend = SoftwareBackend::new(64, 64);
        let live = backend.live_counter();
        let resources = WindowResources::create(&mut backend).expect("resources");
        assert_eq!(live.get(), 8);
        resources.release(&mut backend);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_failure_at_every_stage_unwinds() {
        for n in 0..8 {
            let mut backend = SoftwareBackend::new(64, 64);
            backend.fail_after(n);
            let live = backend.live_counter();
            assert!(WindowResources::create(&mut backend).is_err(), "stage {}", n);
            assert_eq!(live.get(), 0, "stage {}", n);
        }
    }

    #[test]
    fn test_border_indices_stay_in_grid() {
        assert!(STYLEQUAD_BORDER_INDICES.iter().all(|&i| i < 16));
        assert_eq!(STYLEQUAD_BORDER_INDICES.len() % 3, 0);
    }
}
