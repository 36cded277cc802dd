use crate::buffer::{ComputeBuffer, Geometry, ProgramBuffer};
use crate::chain::ChainOutputs;
use crate::context::RenderContext;
use crate::error::{Error, Result};
use crate::io::{IoResource, OutputBufferSpec, OutputName, SwapPolicy};
use crate::size::DynSizeRef;
use crate::Core;
use std::cell::RefCell;
use std::rc::Rc;

/// A weak, generation-checked reference to one member of a [`crate::chain::SwapChain`].
///
/// The C++ original uses `weak_ptr` for a buffer input's reference back to
/// the member whose output it reads, to avoid an ownership cycle (the
/// chain owns members, a member's input would otherwise own the chain).
/// The arena-and-index equivalent: the chain owns a `Vec<Member>`, and a
/// `MemberKey` is just an index plus a generation counter, so a key that
/// outlives its member (were the chain ever to support removal) resolves to
/// `None` instead of dangling. The chain is currently append-only, so the
/// generation is always 0 in practice, but the check is kept for when that
/// changes, and to make the "weak" nature explicit at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberKey {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl MemberKey {
    /// The key of the member immediately preceding this one in insertion
    /// order, or `None` if this is the first member.
    pub fn before(self) -> Option<MemberKey> {
        (self.index > 0).then(|| MemberKey { index: self.index - 1, generation: 0 })
    }
}

/// A node the [`SwapChain`] can initialize, size, and render, independent
/// of whether it owns a graphics pass, a compute pass, or nothing but a
/// screen blit.
pub trait Member {
    fn init(&mut self, core: &Core, ctx: &mut RenderContext) -> Result<()>;
    fn allocate(&mut self, core: &Core) -> Result<()>;
    fn render(
        &mut self,
        core: &Core,
        ctx: &RenderContext,
        chain: &ChainOutputs,
        encoder: &mut wgpu::CommandEncoder,
        default_view: Option<&wgpu::TextureView>,
    ) -> Result<()>;
    fn output(&self) -> Vec<(OutputName, wgpu::Texture)>;
    fn find_output(&self, name: &OutputName) -> Option<usize>;
}

/// A fragment member: a [`ProgramBuffer`] plus the I/O resource it writes
/// into. When its I/O resource has no pre-configured output specs, `init`
/// derives them from the program's discovered outputs using the default
/// allocator: the member's own render size and internal format (preserved
/// from the C++ original's `program_buffer.hpp`, see `SPEC_FULL.md`).
pub struct GraphicsMember {
    key: MemberKey,
    buffer: ProgramBuffer,
    io: IoResource,
    default_size: DynSizeRef,
    default_format: wgpu::TextureFormat,
}

impl GraphicsMember {
    pub fn new(
        key: MemberKey,
        buffer: ProgramBuffer,
        io: IoResource,
        default_size: DynSizeRef,
        default_format: wgpu::TextureFormat,
    ) -> Self {
        Self { key, buffer, io, default_size, default_format }
    }

    pub fn key(&self) -> MemberKey {
        self.key
    }

    pub fn io(&self) -> &IoResource {
        &self.io
    }

    pub fn buffer(&self) -> &ProgramBuffer {
        &self.buffer
    }
}

impl Member for GraphicsMember {
    fn init(&mut self, core: &Core, _ctx: &mut RenderContext) -> Result<()> {
        self.buffer.init(core)?;
        if self.io.is_empty() {
            let policy = self.io.default_policy();
            for output in self.buffer.buffer_outputs() {
                let spec = OutputBufferSpec {
                    render_size: self.default_size.clone(),
                    name: output.name,
                    location: output.location,
                    internal_format: self.default_format,
                };
                self.io.push_spec(spec, policy);
            }
        }
        Ok(())
    }

    fn allocate(&mut self, core: &Core) -> Result<()> {
        self.io.allocate(core, "graphics-member")
    }

    fn render(
        &mut self,
        core: &Core,
        ctx: &RenderContext,
        chain: &ChainOutputs,
        encoder: &mut wgpu::CommandEncoder,
        default_view: Option<&wgpu::TextureView>,
    ) -> Result<()> {
        let view = (self.io.default_policy() == SwapPolicy::DefaultFramebuffer)
            .then_some(default_view)
            .flatten();
        self.buffer.render(core, ctx, chain, &self.io, view, encoder)?;
        self.io.swap();
        Ok(())
    }

    fn output(&self) -> Vec<(OutputName, wgpu::Texture)> {
        self.io
            .output_specs()
            .iter()
            .enumerate()
            .filter_map(|(i, spec)| self.io.source_texture(i).map(|t| (spec.name.clone(), t.clone())))
            .collect()
    }

    fn find_output(&self, name: &OutputName) -> Option<usize> {
        self.io.find_output(name)
    }
}

/// A compute member: just the dispatch, no outputs (spec §4.5).
pub struct ComputeMember {
    key: MemberKey,
    buffer: ComputeBuffer,
}

impl ComputeMember {
    pub fn new(key: MemberKey, buffer: ComputeBuffer) -> Self {
        Self { key, buffer }
    }

    pub fn key(&self) -> MemberKey {
        self.key
    }
}

impl Member for ComputeMember {
    fn init(&mut self, core: &Core, _ctx: &mut RenderContext) -> Result<()> {
        self.buffer.init(core)
    }

    fn allocate(&mut self, _core: &Core) -> Result<()> {
        Ok(())
    }

    fn render(
        &mut self,
        core: &Core,
        ctx: &RenderContext,
        chain: &ChainOutputs,
        encoder: &mut wgpu::CommandEncoder,
        _default_view: Option<&wgpu::TextureView>,
    ) -> Result<()> {
        self.buffer.dispatch(core, ctx, chain, encoder)
    }

    fn output(&self) -> Vec<(OutputName, wgpu::Texture)> {
        Vec::new()
    }

    fn find_output(&self, _name: &OutputName) -> Option<usize> {
        None
    }
}

/// The final screen blit: samples a referenced member's output (or, absent
/// an explicit reference, the immediately preceding member's first output)
/// and draws it into the surface.
///
/// The reference caches the resolved output index and invalidates it only
/// when the stored name stops matching (`RenderContext.hpp`'s
/// `screen_member`, see `SPEC_FULL.md`). Here resolution goes through
/// [`ChainOutputs::resolve`] against a plain `Vec` each frame, which is
/// cheap enough that the cache isn't worth reproducing — a deliberate
/// simplification from the original's index cache, noted in `DESIGN.md`.
pub struct ScreenMember {
    key: MemberKey,
    source: Option<MemberKey>,
    source_name: Option<OutputName>,
    viewport_size: DynSizeRef,
    geometry: Rc<dyn Geometry>,
    pipeline: RefCell<Option<wgpu::RenderPipeline>>,
    pipeline_format: RefCell<Option<wgpu::TextureFormat>>,
}

impl ScreenMember {
    pub fn new(
        key: MemberKey,
        source: Option<MemberKey>,
        source_name: Option<OutputName>,
        viewport_size: DynSizeRef,
        geometry: Rc<dyn Geometry>,
    ) -> Self {
        Self {
            key,
            source,
            source_name,
            viewport_size,
            geometry,
            pipeline: RefCell::new(None),
            pipeline_format: RefCell::new(None),
        }
    }

    pub fn key(&self) -> MemberKey {
        self.key
    }

    fn resolve_source(&self, chain: &ChainOutputs) -> Option<wgpu::Texture> {
        let source_key = self.source.or_else(|| self.key.before())?;
        chain.resolve(source_key, self.source_name.as_ref())
    }

    fn ensure_pipeline(&self, core: &Core, ctx: &RenderContext, format: wgpu::TextureFormat) {
        if *self.pipeline_format.borrow() == Some(format) && self.pipeline.borrow().is_some() {
            return;
        }
        let layout = core.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("screen-member/pipeline_layout"),
            bind_group_layouts: &[ctx.screen_bind_group_layout()],
            push_constant_ranges: &[],
        });
        let pipeline = core.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("screen-member/pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: ctx.screen_vertex_module(),
                entry_point: Some("vs_main"),
                buffers: &[self.geometry.vertex_buffer_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: ctx.screen_fragment_module(),
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        *self.pipeline.borrow_mut() = Some(pipeline);
        *self.pipeline_format.borrow_mut() = Some(format);
    }
}

impl Member for ScreenMember {
    fn init(&mut self, _core: &Core, _ctx: &mut RenderContext) -> Result<()> {
        Ok(())
    }

    fn allocate(&mut self, _core: &Core) -> Result<()> {
        Ok(())
    }

    fn render(
        &mut self,
        core: &Core,
        ctx: &RenderContext,
        chain: &ChainOutputs,
        encoder: &mut wgpu::CommandEncoder,
        default_view: Option<&wgpu::TextureView>,
    ) -> Result<()> {
        let view = default_view.ok_or(Error::NullResource("ScreenMember::default_view"))?;
        let Some(texture) = self.resolve_source(chain) else {
            log::warn!("screen member has no source output to display");
            return Ok(());
        };
        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = core.device.create_sampler(&crate::input::SamplerState::nearest().to_descriptor("screen-member"));
        let bind_group = core.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("screen-member/bind_group"),
            layout: ctx.screen_bind_group_layout(),
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&texture_view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&sampler) },
            ],
        });

        self.ensure_pipeline(core, ctx, ctx.surface_format());
        let size = self.viewport_size.resolve();

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("screen-member/pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::BLACK), store: wgpu::StoreOp::Store },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_viewport(0.0, 0.0, size.width as f32, size.height as f32, 0.0, 1.0);
        pass.set_pipeline(self.pipeline.borrow().as_ref().expect("pipeline built above"));
        pass.set_bind_group(0, &bind_group, &[]);
        self.geometry.draw(&mut pass);
        Ok(())
    }

    fn output(&self) -> Vec<(OutputName, wgpu::Texture)> {
        Vec::new()
    }

    fn find_output(&self, _name: &OutputName) -> Option<usize> {
        None
    }
}
