use crate::error::{Error, Result};
use crate::size::DynSizeRef;
use crate::Core;

/// The identity of a color attachment inside a pass: either a textual name
/// or an integer location. A `(name, location)` reflected from a linked
/// program matches a spec if the spec's held variant equals the
/// corresponding reflected field — this is a *partial* equality, not a
/// full-struct comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputName {
    Name(String),
    Location(u32),
}

impl OutputName {
    /// True if `self` (as held by a spec) matches the reflected `(name,
    /// location)` pair from a linked program's output interface.
    pub fn matches(&self, name: &str, location: u32) -> bool {
        match self {
            OutputName::Name(n) => n == name,
            OutputName::Location(l) => *l == location,
        }
    }
}

/// One discovered or declared output of a fragment program.
#[derive(Clone)]
pub struct OutputBufferSpec {
    pub render_size: DynSizeRef,
    pub name: OutputName,
    pub location: u32,
    pub internal_format: wgpu::TextureFormat,
}

/// How an output buffer's source/target pair behaves across a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapPolicy {
    /// Both textures exist; `swap()` exchanges them. Used whenever a pass
    /// may read its own previous output.
    DoubleBuffer,
    /// Only `source` exists; `target` aliases it. `swap()` is a no-op.
    SingleBuffer,
    /// Neither texture exists; the pass writes to the windowing-system
    /// framebuffer (realized here as the wgpu surface texture).
    DefaultFramebuffer,
}

/// Up to two textures for one output slot, managed under a [`SwapPolicy`].
pub struct OutputBuffer {
    policy: SwapPolicy,
    source: Option<wgpu::Texture>,
    target: Option<wgpu::Texture>,
}

impl OutputBuffer {
    fn new(policy: SwapPolicy) -> Self {
        Self {
            policy,
            source: None,
            target: None,
        }
    }

    pub fn policy(&self) -> SwapPolicy {
        self.policy
    }

    pub fn source(&self) -> Option<&wgpu::Texture> {
        self.source.as_ref()
    }

    pub fn target(&self) -> Option<&wgpu::Texture> {
        match self.policy {
            SwapPolicy::SingleBuffer => self.source.as_ref(),
            _ => self.target.as_ref(),
        }
    }

    /// Exchange `source` and `target`. A no-op under [`SwapPolicy::SingleBuffer`]
    /// and [`SwapPolicy::DefaultFramebuffer`].
    pub fn swap(&mut self) {
        if self.policy == SwapPolicy::DoubleBuffer {
            std::mem::swap(&mut self.source, &mut self.target);
        }
    }

    fn matches(&self, size: crate::size::Size, format: wgpu::TextureFormat) -> bool {
        match &self.source {
            Some(tex) => {
                tex.width() == size.width && tex.height() == size.height && tex.format() == format
            }
            None => false,
        }
    }

    fn allocate(&mut self, core: &Core, spec: &OutputBufferSpec, label: &str) {
        let size = spec.render_size.resolve();
        if self.policy == SwapPolicy::DefaultFramebuffer {
            return;
        }
        if self.matches(size, spec.internal_format) {
            return;
        }
        self.source = Some(create_render_target(
            core,
            size,
            spec.internal_format,
            &format!("{label}/source"),
        ));
        self.target = match self.policy {
            SwapPolicy::DoubleBuffer => Some(create_render_target(
                core,
                size,
                spec.internal_format,
                &format!("{label}/target"),
            )),
            SwapPolicy::SingleBuffer | SwapPolicy::DefaultFramebuffer => None,
        };
    }
}

fn create_render_target(
    core: &Core,
    size: crate::size::Size,
    format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::Texture {
    core.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

/// A vector of output-buffer specs and a parallel vector of output buffers,
/// owned by one swap-chain member.
pub struct IoResource {
    specs: Vec<OutputBufferSpec>,
    buffers: Vec<OutputBuffer>,
    default_policy: SwapPolicy,
}

impl IoResource {
    pub fn new(default_policy: SwapPolicy) -> Self {
        Self {
            specs: Vec::new(),
            buffers: Vec::new(),
            default_policy,
        }
    }

    pub fn push_spec(&mut self, spec: OutputBufferSpec, policy: SwapPolicy) {
        self.buffers.push(OutputBuffer::new(policy));
        self.specs.push(spec);
    }

    pub fn output_specs(&self) -> &[OutputBufferSpec] {
        &self.specs
    }

    pub fn output_specs_mut(&mut self) -> &mut Vec<OutputBufferSpec> {
        &mut self.specs
    }

    pub fn default_policy(&self) -> SwapPolicy {
        self.default_policy
    }

    /// Allocate (or reallocate, if size/format/policy changed) every
    /// non-default-framebuffer output. Fails if there are no output specs or
    /// the first spec resolves to a zero size.
    pub fn allocate(&mut self, core: &Core, label: &str) -> Result<()> {
        if self.specs.is_empty() {
            return Err(Error::InvalidConfiguration(
                "cannot allocate an I/O resource with no output specs".into(),
            ));
        }
        if self.specs[0].render_size.resolve().is_zero() {
            return Err(Error::InvalidConfiguration(
                "cannot allocate an I/O resource with a zero-sized first output".into(),
            ));
        }
        for (i, spec) in self.specs.iter().enumerate() {
            self.buffers[i].allocate(core, spec, &format!("{label}/output{i}"));
        }
        Ok(())
    }

    pub fn swap(&mut self) {
        for buffer in &mut self.buffers {
            buffer.swap();
        }
    }

    pub fn source_texture(&self, index: usize) -> Option<&wgpu::Texture> {
        self.buffers.get(index).and_then(|b| b.source())
    }

    pub fn target_texture(&self, index: usize) -> Option<&wgpu::Texture> {
        self.buffers.get(index).and_then(|b| b.target())
    }

    pub fn find_output(&self, name: &OutputName) -> Option<usize> {
        self.specs
            .iter()
            .position(|spec| name.matches(&spec_name(spec), spec.location))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn spec_name(spec: &OutputBufferSpec) -> String {
    match &spec.name {
        OutputName::Name(n) => n.clone(),
        OutputName::Location(_) => String::new(),
    }
}
