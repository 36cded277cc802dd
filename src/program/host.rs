use crate::chain::ChainOutputs;
use crate::context::RenderContext;
use crate::error::{Error, Result};
use crate::program::input::{InputKind, ProgramInput};
use crate::program::interface::{ProgramInterface, UniformValue};
use crate::program::template::{ProgramTemplate, Stage};
use crate::template::TemplatePart;
use crate::Core;
use std::cell::RefCell;
use std::rc::Rc;

/// A compiled program plus its input list and lazily-built interface — the
/// unit the reference calls a "program host".
///
/// wgpu has no glUniform-style named setters, so the GL original's
/// `init_program` "assign sampler uniforms to texture units" step has no
/// direct analogue here: instead each input is given a fixed bind-group
/// slot at template-specification time (`group`/`first_binding` on the
/// `Input` template part), and `prepare_render` rebuilds the bind group
/// each frame since a buffer input's source texture can change between
/// frames (double-buffering).
pub struct ProgramHost {
    template: ProgramTemplate,
    inputs: Rc<RefCell<Vec<ProgramInput>>>,
    group: u32,
    vertex_module: Option<wgpu::ShaderModule>,
    fragment_module: Option<wgpu::ShaderModule>,
    compute_module: Option<wgpu::ShaderModule>,
    interface: Option<ProgramInterface>,
    uniform_buffer: Option<wgpu::Buffer>,
    uniform_scratch: Vec<u8>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
}

impl ProgramHost {
    pub fn new(template: ProgramTemplate, inputs: Rc<RefCell<Vec<ProgramInput>>>, group: u32) -> Self {
        Self {
            template,
            inputs,
            group,
            vertex_module: None,
            fragment_module: None,
            compute_module: None,
            interface: None,
            uniform_buffer: None,
            uniform_scratch: Vec::new(),
            bind_group_layout: None,
        }
    }

    pub fn inputs(&self) -> Rc<RefCell<Vec<ProgramInput>>> {
        self.inputs.clone()
    }

    pub fn interface(&self) -> Option<&ProgramInterface> {
        self.interface.as_ref()
    }

    pub fn vertex_module(&self) -> Option<&wgpu::ShaderModule> {
        self.vertex_module.as_ref()
    }

    pub fn fragment_module(&self) -> Option<&wgpu::ShaderModule> {
        self.fragment_module.as_ref()
    }

    pub fn compute_module(&self) -> Option<&wgpu::ShaderModule> {
        self.compute_module.as_ref()
    }

    pub fn bind_group_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.bind_group_layout.as_ref()
    }

    /// Compile the fragment stage (and, the first time any host does so,
    /// the shared vertex stage) from the template, reflect its interface,
    /// and allocate the uniform buffer and bind-group layout. `stage` must
    /// be [`Stage::Fragment`] or [`Stage::Compute`] (§4.3).
    pub fn init_program(&mut self, core: &Core, label: &str, stage: Stage) -> Result<()> {
        match stage {
            Stage::Vertex => {
                return Err(Error::InvalidConfiguration(
                    "init_program must be called with Fragment or Compute, not Vertex".into(),
                ))
            }
            Stage::Fragment => {
                let vertex_source = self.template.get_source(Stage::Vertex, vec![])?;
                let fragment_source = self.specified_fragment_source()?;
                let vertex_module = compile_stage(core, &format!("{label}/vertex"), &vertex_source)?;
                let fragment_module = compile_stage(core, &format!("{label}/fragment"), &fragment_source)?;
                let module = wgpu::naga::front::wgsl::parse_str(&fragment_source)
                    .map_err(|e| Error::ShaderCompilation { label: label.into(), log: e.to_string() })?;
                self.interface = Some(ProgramInterface::reflect(&module, label)?);
                self.vertex_module = Some(vertex_module);
                self.fragment_module = Some(fragment_module);
            }
            Stage::Compute => {
                let inputs_part = self.inputs_part("compute:inputs");
                let source = self.template.get_source(Stage::Compute, vec![inputs_part])?;
                let module = compile_stage(core, &format!("{label}/compute"), &source)?;
                let parsed = wgpu::naga::front::wgsl::parse_str(&source)
                    .map_err(|e| Error::ShaderCompilation { label: label.into(), log: e.to_string() })?;
                self.interface = Some(ProgramInterface::reflect(&parsed, label)?);
                self.compute_module = Some(module);
            }
        }

        let interface = self.interface.as_ref().expect("just set above");
        let uniform_size = interface.uniform_buffer_size().max(16);
        self.uniform_scratch = vec![0u8; uniform_size as usize];
        self.uniform_buffer = Some(core.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}/uniforms")),
            size: uniform_size as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.bind_group_layout = Some(self.build_bind_group_layout(core, label));
        Ok(())
    }

    fn inputs_part(&self, name: &str) -> TemplatePart {
        TemplatePart::input(name, self.inputs.clone(), self.group, 1)
    }

    fn specified_fragment_source(&self) -> Result<String> {
        self.template.get_source(Stage::Fragment, vec![self.inputs_part("buffer:inputs")])
    }

    fn build_bind_group_layout(&self, core: &Core, label: &str) -> wgpu::BindGroupLayout {
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT | wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];

        for (i, input) in self.inputs.borrow().iter().enumerate() {
            let texture_binding = 1 + i as u32 * 2;
            let sampler_binding = texture_binding + 1;
            let texture_ty = match input.kind {
                InputKind::Image => wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                InputKind::Texture | InputKind::Unknown => wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
            };
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: texture_binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT | wgpu::ShaderStages::COMPUTE,
                ty: texture_ty,
                count: None,
            });
            if matches!(input.kind, InputKind::Texture | InputKind::Unknown) {
                entries.push(wgpu::BindGroupLayoutEntry {
                    binding: sampler_binding,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT | wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                });
            }
        }

        core.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label}/bind_group_layout")),
            entries: &entries,
        })
    }

    /// Write `value` for `name` into the uniform buffer, a silent no-op if
    /// the reflected interface has no such active uniform.
    pub fn set_uniform(&mut self, core: &Core, name: &str, value: UniformValue) -> Result<()> {
        let Some(interface) = &self.interface else {
            return Err(Error::NullResource("ProgramHost::interface"));
        };
        interface.set_uniform(&mut self.uniform_scratch, name, value)?;
        let buffer = self.uniform_buffer.as_ref().ok_or(Error::NullResource("ProgramHost::uniform_buffer"))?;
        core.queue.write_buffer(buffer, 0, &self.uniform_scratch);
        Ok(())
    }

    /// Resolve every input's current texture view (loading on first use,
    /// or resolving through `chain` for buffer inputs), and build a fresh
    /// bind group against them.
    pub fn prepare_render(
        &mut self,
        core: &Core,
        ctx: &RenderContext,
        chain: &ChainOutputs,
        label: &str,
    ) -> Result<wgpu::BindGroup> {
        let layout = self.bind_group_layout.as_ref().ok_or(Error::NullResource("ProgramHost::bind_group_layout"))?;
        let uniform_buffer = self.uniform_buffer.as_ref().ok_or(Error::NullResource("ProgramHost::uniform_buffer"))?;

        let mut views = Vec::new();
        let mut samplers = Vec::new();
        for input in self.inputs.borrow_mut().iter_mut() {
            let view = input.input.use_input(core, ctx, chain)?;
            let sampler = core.device.create_sampler(&input.input.sampler().to_descriptor(label));
            views.push(view);
            samplers.push(sampler);
        }

        let mut entries = vec![wgpu::BindGroupEntry { binding: 0, resource: uniform_buffer.as_entire_binding() }];
        for (i, (view, sampler)) in views.iter().zip(samplers.iter()).enumerate() {
            let texture_binding = 1 + i as u32 * 2;
            entries.push(wgpu::BindGroupEntry { binding: texture_binding, resource: wgpu::BindingResource::TextureView(view) });
            let kind = self.inputs.borrow()[i].kind;
            if matches!(kind, InputKind::Texture | InputKind::Unknown) {
                entries.push(wgpu::BindGroupEntry { binding: texture_binding + 1, resource: wgpu::BindingResource::Sampler(sampler) });
            }
        }

        Ok(core.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}/bind_group")),
            layout,
            entries: &entries,
        }))
    }
}

pub(crate) fn compile_stage(core: &Core, label: &str, source: &str) -> Result<wgpu::ShaderModule> {
    wgpu::naga::front::wgsl::parse_str(source)
        .map_err(|e| Error::ShaderCompilation { label: label.into(), log: e.to_string() })?;
    Ok(core.device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    }))
}
