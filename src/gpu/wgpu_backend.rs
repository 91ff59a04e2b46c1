//! wgpu backend
//!
//! Every shader gets one render pipeline per primitive topology, sharing a
//! common vertex stage that maps pixel positions to clip space through a
//! viewport uniform. Draw colors travel as a per-instance attribute.
//!
//! Draws are recorded during the frame and encoded into a single render pass
//! on [`present`](GpuBackend::present), cleared to the last clear color.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::error::{Error, Result};
use crate::geom::Rect;
use crate::gpu::{BufferId, DrawCall, GpuBackend, Primitive, ShaderId, ShaderSource};
use crate::style::Color;

/// Vertices a widget vertex buffer can hold (a 4x4 stylequad grid).
const VERTEX_CAPACITY: usize = 16;
/// Draws per frame; further draws are dropped with a warning.
const MAX_DRAWS: usize = 4096;

const VERTEX_PRELUDE: &str = "
struct Uniforms {
    viewport_size: vec2<f32>,
    _padding: vec2<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexInput {
    @location(0) position: vec2<f32>,
};

struct InstanceInput {
    @location(1) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    var out: VertexOutput;
    let ndc = vertex.position / uniforms.viewport_size * 2.0 - vec2<f32>(1.0, 1.0);
    out.clip_position = vec4<f32>(ndc.x, -ndc.y, 0.0, 1.0);
    out.color = instance.color;
    return out;
}
";

/// Uniform data for the shader (viewport info)
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    viewport_size: [f32; 2],
    _padding: [f32; 2],
}

struct ShaderPipelines {
    triangle_list: wgpu::RenderPipeline,
    triangle_strip: wgpu::RenderPipeline,
    line_strip: wgpu::RenderPipeline,
}

enum GpuBuffer {
    Index {
        triangles: wgpu::Buffer,
        count: u32,
        /// Same indices with the first one repeated, for line loops.
        closed: wgpu::Buffer,
        closed_count: u32,
    },
    Vertex {
        buffer: wgpu::Buffer,
    },
}

struct RecordedDraw {
    call: DrawCall,
    scissor: Option<Rect>,
}

pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    shaders: HashMap<ShaderId, ShaderPipelines>,
    buffers: HashMap<BufferId, GpuBuffer>,
    next_id: u32,
    clear_color: Color,
    scissor: Option<Rect>,
    frame: Vec<RecordedDraw>,
}

impl WgpuBackend {
    /// Set up adapter, device and surface for `window`.
    pub fn new(window: Arc<winit::window::Window>, width: u32, height: u32) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::Context(format!("failed to create surface: {}", e)))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| Error::Context("failed to find suitable GPU adapter".to_string()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: Some("trellis device"),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| Error::Context(format!("failed to create device: {}", e)))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| Error::Context("surface reports no formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("viewport uniforms"),
            contents: bytemuck::cast_slice(&[Uniforms {
                viewport_size: [width as f32, height as f32],
                _padding: [0.0, 0.0],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("viewport bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("viewport bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("trellis pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw colors"),
            size: (MAX_DRAWS * std::mem::size_of::<[f32; 4]>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::info!(
            "wgpu backend ready: {}x{} {:?} on {}",
            width,
            height,
            surface_format,
            adapter.get_info().name
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline_layout,
            uniform_buffer,
            uniform_bind_group,
            instance_buffer,
            shaders: HashMap::new(),
            buffers: HashMap::new(),
            next_id: 1,
            clear_color: Color::BLACK,
            scissor: None,
            frame: Vec::new(),
        })
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn create_pipeline(
        &self,
        module: &wgpu::ShaderModule,
        label: &str,
        topology: wgpu::PrimitiveTopology,
    ) -> wgpu::RenderPipeline {
        let strip_index_format = match topology {
            wgpu::PrimitiveTopology::TriangleStrip | wgpu::PrimitiveTopology::LineStrip => {
                Some(wgpu::IndexFormat::Uint16)
            }
            _ => None,
        };

        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x2,
                        }],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &[wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32x4,
                        }],
                    },
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Scissor in surface pixels, or `None` if it covers nothing.
    fn scissor_rect(&self, scissor: Option<Rect>) -> Option<(u32, u32, u32, u32)> {
        let (fw, fh) = (self.config.width, self.config.height);
        let Some(s) = scissor else {
            return Some((0, 0, fw, fh));
        };
        let x0 = (s.x.max(0.0) as u32).min(fw);
        let y0 = (s.y.max(0.0) as u32).min(fh);
        let x1 = ((s.x + s.w).max(0.0) as u32).min(fw);
        let y1 = ((s.y + s.h).max(0.0) as u32).min(fh);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }
}

impl GpuBackend for WgpuBackend {
    fn create_shader(&mut self, source: &ShaderSource) -> Result<ShaderId> {
        let wgsl = format!("{}\n{}", VERTEX_PRELUDE, source.fragment);

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(source.name),
            source: wgpu::ShaderSource::Wgsl(wgsl.into()),
        });
        let pipelines = ShaderPipelines {
            triangle_list: self.create_pipeline(&module, source.name, wgpu::PrimitiveTopology::TriangleList),
            triangle_strip: self.create_pipeline(&module, source.name, wgpu::PrimitiveTopology::TriangleStrip),
            line_strip: self.create_pipeline(&module, source.name, wgpu::PrimitiveTopology::LineStrip),
        };
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::Shader {
                name: source.name,
                reason: err.to_string(),
            });
        }

        let id = ShaderId(self.next_id());
        self.shaders.insert(id, pipelines);
        log::debug!("wgpu: shader `{}` -> {:?}", source.name, id);
        Ok(id)
    }

    fn free_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn create_index_buffer(&mut self, label: &'static str, indices: &[u8]) -> Result<BufferId> {
        let wide: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
        let mut closed = wide.clone();
        if let Some(&first) = wide.first() {
            closed.push(first);
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let triangles = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&wide),
            usage: wgpu::BufferUsages::INDEX,
        });
        let closed_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&closed),
            usage: wgpu::BufferUsages::INDEX,
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::Buffer {
                label,
                reason: err.to_string(),
            });
        }

        let id = BufferId(self.next_id());
        self.buffers.insert(
            id,
            GpuBuffer::Index {
                triangles,
                count: wide.len() as u32,
                closed: closed_buffer,
                closed_count: closed.len() as u32,
            },
        );
        Ok(id)
    }

    fn create_vertex_buffer(&mut self, label: &'static str) -> Result<BufferId> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (VERTEX_CAPACITY * std::mem::size_of::<[f32; 2]>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::Buffer {
                label,
                reason: err.to_string(),
            });
        }

        let id = BufferId(self.next_id());
        self.buffers.insert(id, GpuBuffer::Vertex { buffer });
        Ok(id)
    }

    fn upload_vertices(&mut self, buffer: BufferId, vertices: &[[f32; 2]]) {
        let Some(GpuBuffer::Vertex { buffer: target }) = self.buffers.get(&buffer) else {
            log::warn!("wgpu: upload to unknown vertex buffer {:?}", buffer);
            return;
        };
        if vertices.len() > VERTEX_CAPACITY {
            log::warn!("wgpu: {} vertices exceed buffer capacity, truncating", vertices.len());
        }
        let n = vertices.len().min(VERTEX_CAPACITY);
        if n > 0 {
            self.queue.write_buffer(target, 0, bytemuck::cast_slice(&vertices[..n]));
        }
    }

    fn free_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if (width, height) != (self.config.width, self.config.height) {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[Uniforms {
                viewport_size: [width as f32, height as f32],
                _padding: [0.0, 0.0],
            }]),
        );
    }

    fn set_scissor(&mut self, rect: Rect) {
        self.scissor = Some(rect);
    }

    fn clear(&mut self, color: Color) {
        self.clear_color = color;
        self.frame.clear();
    }

    fn draw(&mut self, call: &DrawCall) {
        if self.frame.len() >= MAX_DRAWS {
            log::warn!("wgpu: more than {} draws in one frame, dropping", MAX_DRAWS);
            return;
        }
        self.frame.push(RecordedDraw {
            call: *call,
            scissor: self.scissor,
        });
    }

    fn present(&mut self) {
        let frame = std::mem::take(&mut self.frame);

        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                log::error!("Surface error: {:?}", e);
                return;
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let colors: Vec<[f32; 4]> = frame.iter().map(|d| d.call.color.to_array()).collect();
        if !colors.is_empty() {
            self.queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&colors));
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("trellis frame"),
        });

        {
            let c = self.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("trellis pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: c.r as f64,
                            g: c.g as f64,
                            b: c.b as f64,
                            a: c.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);

            let stride = std::mem::size_of::<[f32; 4]>() as u64;
            for (i, draw) in frame.iter().enumerate() {
                let Some(pipelines) = self.shaders.get(&draw.call.shader) else {
                    continue;
                };
                let Some(GpuBuffer::Vertex { buffer: vbo }) = self.buffers.get(&draw.call.vertices) else {
                    continue;
                };
                let Some(GpuBuffer::Index {
                    triangles,
                    count,
                    closed,
                    closed_count,
                }) = self.buffers.get(&draw.call.indices)
                else {
                    continue;
                };
                let Some((sx, sy, sw, sh)) = self.scissor_rect(draw.scissor) else {
                    continue;
                };

                let (pipeline, indices, n) = match draw.call.primitive {
                    Primitive::TriangleList => (&pipelines.triangle_list, triangles, *count),
                    Primitive::TriangleStrip => (&pipelines.triangle_strip, triangles, *count),
                    Primitive::LineLoop => (&pipelines.line_strip, closed, *closed_count),
                };

                let offset = i as u64 * stride;
                render_pass.set_pipeline(pipeline);
                render_pass.set_scissor_rect(sx, sy, sw, sh);
                render_pass.set_vertex_buffer(0, vbo.slice(..));
                render_pass.set_vertex_buffer(1, self.instance_buffer.slice(offset..offset + stride));
                render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..n, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
