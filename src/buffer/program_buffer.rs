use crate::buffer::geometry::Geometry;
use crate::chain::ChainOutputs;
use crate::context::RenderContext;
use crate::draw_state::DrawState;
use crate::error::{Error, Result};
use crate::io::{IoResource, OutputName};
use crate::program::{ProgramHost, Stage, UniformValue};
use crate::Core;
use std::rc::Rc;
use std::time::Instant;

/// Discovered fragment outputs, read from the linked program's reflected
/// output interface (§4.4 "program outputs discovery").
pub struct BufferOutput {
    pub name: OutputName,
    pub location: u32,
}

/// A fragment render pass: a [`ProgramHost`] plus the geometry it draws.
/// Owns its wgpu render pipeline, rebuilt only when the attached color
/// formats change (on allocation, not on every `render`).
pub struct ProgramBuffer {
    host: ProgramHost,
    geometry: Rc<dyn Geometry>,
    draw_state: DrawState,
    label: String,
    started_at: Instant,
    frame: u32,
    pipeline: Option<wgpu::RenderPipeline>,
    pipeline_formats: Vec<wgpu::TextureFormat>,
}

impl ProgramBuffer {
    pub fn new(host: ProgramHost, geometry: Rc<dyn Geometry>, draw_state: DrawState, label: impl Into<String>) -> Self {
        Self {
            host,
            geometry,
            draw_state,
            label: label.into(),
            started_at: Instant::now(),
            frame: 0,
            pipeline: None,
            pipeline_formats: Vec::new(),
        }
    }

    pub fn host(&self) -> &ProgramHost {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut ProgramHost {
        &mut self.host
    }

    pub fn init(&mut self, core: &Core) -> Result<()> {
        self.host.init_program(core, &self.label, Stage::Fragment)
    }

    /// Discovered `(name, location)` outputs, used by the owning member to
    /// populate its I/O resource's specs via the output allocator.
    pub fn buffer_outputs(&self) -> Vec<BufferOutput> {
        let Some(interface) = self.host.interface() else { return Vec::new() };
        interface
            .outputs()
            .iter()
            .map(|r| BufferOutput {
                name: if r.name.is_empty() { OutputName::Location(r.location) } else { OutputName::Name(r.name.clone()) },
                location: r.location,
            })
            .collect()
    }

    fn ensure_pipeline(&mut self, core: &Core, formats: &[wgpu::TextureFormat]) {
        if self.pipeline.is_some() && self.pipeline_formats == formats {
            return;
        }
        let vertex_module = self.host.vertex_module().expect("fragment program must be initialized");
        let fragment_module = self.host.fragment_module().expect("fragment program must be initialized");
        let bind_group_layout = self.host.bind_group_layout().expect("fragment program must be initialized");

        let layout = core.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{}/pipeline_layout", self.label)),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        let targets: Vec<Option<wgpu::ColorTargetState>> = formats
            .iter()
            .map(|format| {
                Some(wgpu::ColorTargetState {
                    format: *format,
                    blend: self.draw_state.blend_state(),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let pipeline = core.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{}/pipeline", self.label)),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: vertex_module,
                entry_point: Some("vs_main"),
                buffers: &[self.geometry.vertex_buffer_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment_module,
                entry_point: Some("fs_main"),
                targets: &targets,
                compilation_options: Default::default(),
            }),
            primitive: self.draw_state.primitive_state(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        self.pipeline = Some(pipeline);
        self.pipeline_formats = formats.to_vec();
    }

    /// Render into `io`'s targets (or `default_view` when the policy is
    /// `default_framebuffer`).
    pub fn render(
        &mut self,
        core: &Core,
        ctx: &RenderContext,
        chain: &ChainOutputs,
        io: &IoResource,
        default_view: Option<&wgpu::TextureView>,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<()> {
        let views: Vec<wgpu::TextureView> = if io.is_empty() {
            Vec::new()
        } else {
            (0..io.len())
                .map(|i| {
                    io.target_texture(i)
                        .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()))
                        .ok_or(Error::NullResource("IoResource output target"))
                })
                .collect::<Result<Vec<_>>>()?
        };

        let formats: Vec<wgpu::TextureFormat> = if let Some(view) = default_view {
            let _ = view;
            vec![ctx.surface_format()]
        } else {
            io.output_specs().iter().map(|s| s.internal_format).collect()
        };
        self.ensure_pipeline(core, &formats);

        let (width, height) = if let Some(spec) = io.output_specs().first() {
            let size = spec.render_size.resolve();
            (size.width, size.height)
        } else {
            ctx.surface_size()
        };

        let bind_group = self.host.prepare_render(core, ctx, chain, &self.label)?;
        self.host.set_uniform(core, "iResolution", UniformValue::Vec3([width as f32, height as f32, 1.0]))?;
        self.host.set_uniform(core, "iTime", UniformValue::Float(self.started_at.elapsed().as_secs_f32()))?;
        self.host.set_uniform(core, "iFrame", UniformValue::Int(self.frame as i32))?;

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = if let Some(view) = default_view {
            vec![Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations { load: self.draw_state.color_load_op(), store: wgpu::StoreOp::Store },
            })]
        } else {
            views
                .iter()
                .map(|view| {
                    Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations { load: self.draw_state.color_load_op(), store: wgpu::StoreOp::Store },
                    })
                })
                .collect()
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(&format!("{}/pass", self.label)),
                color_attachments: &color_attachments,
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
            pass.set_pipeline(self.pipeline.as_ref().expect("pipeline built above"));
            pass.set_bind_group(0, &bind_group, &[]);
            self.geometry.draw(&mut pass);
        }
        self.frame += 1;
        Ok(())
    }
}
