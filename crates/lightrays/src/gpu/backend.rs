use std::borrow::Cow;
use std::collections::HashMap;

use anyhow::{Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;

use super::context::GpuContext;
use super::reflect::{self, UniformBlock};
use crate::backend::{
    BufferId, GraphicsBackend, ProgramId, ShaderId, ShaderStage, UniformLocation, UniformValue,
};
use crate::types::BackingSize;

struct CompiledShader {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
    uniforms: UniformBlock,
}

struct LinkedProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    uniforms: UniformBlock,
    /// CPU copy of the uniform block, uploaded before every draw.
    staging: Vec<u8>,
}

/// [`GraphicsBackend`] on top of `wgpu`, presenting to a window surface.
///
/// Shaders are GLSL 450 parsed by naga; the parse gives both the compile log
/// and the uniform block layout used to resolve locations. A "program" is a
/// render pipeline plus its uniform buffer and bind group.
pub struct WgpuBackend {
    context: GpuContext,
    shaders: HashMap<ShaderId, CompiledShader>,
    programs: HashMap<ProgramId, LinkedProgram>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    next_id: u32,
}

impl WgpuBackend {
    /// Acquires an adapter, device and surface for `target`.
    ///
    /// `target` must stay alive for as long as the backend does.
    pub fn new<T>(target: &T, initial_size: BackingSize) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size)
            .context("failed to initialise GPU context for light rays")?;
        Ok(Self {
            context,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            next_id: 1,
        })
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    fn uniform_layout(&self) -> wgpu::BindGroupLayout {
        self.context
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("light rays uniform layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            })
    }

    fn create_pipeline(
        &self,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        let device = &self.context.device;
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("light rays pipeline layout"),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("light rays pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: vertex,
                entry_point: Some("main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.context.surface_format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        })
    }
}

impl GraphicsBackend for WgpuBackend {
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        let module = reflect::parse_glsl(stage, source)?;
        let uniforms = reflect::uniform_block(&module);

        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(match stage {
                ShaderStage::Vertex => "light rays vertex",
                ShaderStage::Fragment => "light rays fragment",
            }),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Owned(source.to_owned()),
                stage: match stage {
                    ShaderStage::Vertex => wgpu::naga::ShaderStage::Vertex,
                    ShaderStage::Fragment => wgpu::naga::ShaderStage::Fragment,
                },
                defines: &[],
            },
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(err.to_string());
        }

        let id = ShaderId(self.next_id());
        tracing::trace!(shader = id.0, %stage, members = uniforms.members.len(), "compiled shader");
        self.shaders.insert(
            id,
            CompiledShader {
                stage,
                module,
                uniforms,
            },
        );
        Ok(id)
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        let (Some(vertex_shader), Some(fragment_shader)) =
            (self.shaders.get(&vertex), self.shaders.get(&fragment))
        else {
            return Err("link requested for a released shader".to_string());
        };
        if vertex_shader.stage != ShaderStage::Vertex || fragment_shader.stage != ShaderStage::Fragment {
            return Err(format!(
                "expected vertex and fragment shaders, got {} and {}",
                vertex_shader.stage, fragment_shader.stage
            ));
        }

        let mut uniforms = vertex_shader.uniforms.clone();
        uniforms.merge(&fragment_shader.uniforms);

        let layout = self.uniform_layout();
        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.create_pipeline(&vertex_shader.module, &fragment_shader.module, &layout);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(err.to_string());
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("light rays uniforms"),
            size: uniforms.buffer_size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("light rays uniform bind group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let staging = vec![0u8; uniforms.buffer_size() as usize];
        let id = ProgramId(self.next_id());
        self.programs.insert(
            id,
            LinkedProgram {
                pipeline,
                bind_group,
                uniform_buffer,
                uniforms,
                staging,
            },
        );
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(linked) = self.programs.remove(&program) {
            linked.uniform_buffer.destroy();
        }
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> UniformLocation {
        self.programs
            .get(&program)
            .and_then(|linked| linked.uniforms.members.get(name).copied())
            .into()
    }

    fn create_vertex_buffer(&mut self, positions: &[[f32; 2]]) -> Result<BufferId, String> {
        if positions.is_empty() {
            return Err("vertex buffer needs at least one position".to_string());
        }
        let buffer = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("light rays quad"),
                contents: bytemuck::cast_slice(positions),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let id = BufferId(self.next_id());
        self.buffers.insert(id, buffer);
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(buffer) = self.buffers.remove(&buffer) {
            buffer.destroy();
        }
    }

    fn resize_surface(&mut self, size: BackingSize) {
        self.context.resize(size);
    }

    fn set_uniform(&mut self, program: ProgramId, location: UniformLocation, value: UniformValue) {
        let Some(slot) = location.slot() else {
            return;
        };
        if slot.kind != value.kind() {
            tracing::trace!(offset = slot.offset, ?value, "uniform kind mismatch; write skipped");
            return;
        }
        let Some(linked) = self.programs.get_mut(&program) else {
            return;
        };
        let bytes: &[u8] = bytemuck::cast_slice(value.components());
        let start = slot.offset as usize;
        if let Some(target) = linked.staging.get_mut(start..start + bytes.len()) {
            target.copy_from_slice(bytes);
        }
    }

    fn draw(&mut self, program: ProgramId, buffer: BufferId, vertex_count: u32) -> Result<()> {
        let linked = self
            .programs
            .get(&program)
            .with_context(|| format!("program {} is not linked", program.0))?;
        let vertices = self
            .buffers
            .get(&buffer)
            .with_context(|| format!("vertex buffer {} does not exist", buffer.0))?;

        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated; reconfiguring");
                self.context.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::trace!("surface acquire timed out; skipping frame");
                return Ok(());
            }
            Err(err) => return Err(anyhow::anyhow!("failed to acquire surface texture: {err}")),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let queue = &self.context.queue;
        queue.write_buffer(&linked.uniform_buffer, 0, &linked.staging);

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("light rays encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("light rays pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let size = self.context.size();
            render_pass.set_viewport(0.0, 0.0, size.width as f32, size.height as f32, 0.0, 1.0);
            render_pass.set_pipeline(&linked.pipeline);
            render_pass.set_bind_group(0, &linked.bind_group, &[]);
            render_pass.set_vertex_buffer(0, vertices.slice(..));
            render_pass.draw(0..vertex_count, 0..1);
        }
        queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}
