use crate::buffer::geometry::{Geometry, ScreenQuad};
use crate::error::Result;
use crate::program::host::compile_stage;
use crate::program::template::{ProgramTemplate, Stage};
use crate::size::Size;
use crate::template::{PreprocessorDefines, ShaderTemplate, TemplatePart};
use crate::Core;
use std::rc::Rc;

const SCREEN_VERTEX_SHADER: &str = include_str!("shaders/screen_vertex.wgsl");
const SCREEN_FRAGMENT_SHADER: &str = include_str!("shaders/screen_fragment.wgsl");
const DEFAULT_FRAGMENT_HEADER: &str = include_str!("shaders/default_fragment_header.wgsl");
const DEFAULT_FRAGMENT_FOOTER: &str = include_str!("shaders/default_fragment_footer.wgsl");
const DEFAULT_COMPUTE_HEADER: &str = include_str!("shaders/default_compute_header.wgsl");

/// Cross-member shared state (spec §4.7): the screen-blit program, the
/// shared screen-quad geometry, the error texture, and the factories for a
/// buffer's default program template. Built once per pipeline and handed to
/// every member by reference during init/allocate/render.
pub struct RenderContext {
    surface_format: wgpu::TextureFormat,
    surface_size: Size,
    screen_vertex_module: wgpu::ShaderModule,
    screen_fragment_module: wgpu::ShaderModule,
    screen_bind_group_layout: wgpu::BindGroupLayout,
    screen_quad: Rc<dyn Geometry>,
    error_texture: wgpu::Texture,
}

impl RenderContext {
    pub fn new(core: &Core, surface_format: wgpu::TextureFormat, surface_size: Size) -> Result<Self> {
        let screen_vertex_module = compile_stage(core, "screen/vertex", SCREEN_VERTEX_SHADER)?;
        let screen_fragment_module = compile_stage(core, "screen/fragment", SCREEN_FRAGMENT_SHADER)?;
        let screen_bind_group_layout = core.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("screen/bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        Ok(Self {
            surface_format,
            surface_size,
            screen_vertex_module,
            screen_fragment_module,
            screen_bind_group_layout,
            screen_quad: Rc::new(ScreenQuad::new(core)),
            error_texture: crate::input::error_texture(core),
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.surface_size.width, self.surface_size.height)
    }

    /// Update the tracked windowing-system size; members whose render size
    /// resolves through this value pick it up on their next `render`.
    pub fn set_surface_size(&mut self, size: Size) {
        self.surface_size = size;
    }

    pub fn screen_vertex_module(&self) -> &wgpu::ShaderModule {
        &self.screen_vertex_module
    }

    pub fn screen_fragment_module(&self) -> &wgpu::ShaderModule {
        &self.screen_fragment_module
    }

    pub fn screen_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.screen_bind_group_layout
    }

    pub fn screen_quad(&self) -> Rc<dyn Geometry> {
        self.screen_quad.clone()
    }

    pub fn error_texture(&self) -> &wgpu::Texture {
        &self.error_texture
    }

    /// The default fragment-stage `ProgramTemplate` (§4.7): a shared vertex
    /// stage, and a fragment stage built from the declaration header, the
    /// `buffer:inputs` placeholder (filled by [`crate::program::ProgramHost`]
    /// at link time), `user_source` committed into `buffer:sources`, and the
    /// entry-point footer that calls the user's `mainImage`.
    pub fn buffer_template(&self, user_source: &str) -> Result<ProgramTemplate> {
        let mut vertex = ShaderTemplate::new();
        vertex.add(TemplatePart::string("vertex:main", SCREEN_VERTEX_SHADER))?;

        let mut fragment = ShaderTemplate::new();
        fragment.add(TemplatePart::string("fragment:header", DEFAULT_FRAGMENT_HEADER))?;
        fragment.add(TemplatePart::unspecified("buffer:inputs"))?;
        fragment.add(TemplatePart::unspecified("buffer:sources"))?;
        fragment.add(TemplatePart::string("fragment:footer", DEFAULT_FRAGMENT_FOOTER))?;
        let fragment = fragment.specify(vec![TemplatePart::string("buffer:sources", user_source)]);

        let mut template = ProgramTemplate::new();
        template.emplace(Stage::Vertex, vertex)?;
        template.emplace(Stage::Fragment, fragment)?;
        let mut glsl_defines = PreprocessorDefines::new();
        glsl_defines.insert("LIBSHADERTOY", "1");
        template.define_block("glsl", glsl_defines);
        Ok(template)
    }

    /// The default compute-stage `ProgramTemplate`: declaration header, the
    /// `compute:inputs` placeholder, and `user_source` (a complete `cs_main`)
    /// committed into `buffer:sources`.
    pub fn compute_template(&self, user_source: &str) -> Result<ProgramTemplate> {
        let mut compute = ShaderTemplate::new();
        compute.add(TemplatePart::string("compute:header", DEFAULT_COMPUTE_HEADER))?;
        compute.add(TemplatePart::unspecified("compute:inputs"))?;
        compute.add(TemplatePart::unspecified("buffer:sources"))?;
        let compute = compute.specify(vec![TemplatePart::string("buffer:sources", user_source)]);

        let mut template = ProgramTemplate::new();
        template.emplace(Stage::Compute, compute)?;
        let mut glsl_defines = PreprocessorDefines::new();
        glsl_defines.insert("LIBSHADERTOY", "1");
        template.define_block("glsl", glsl_defines);
        Ok(template)
    }
}
