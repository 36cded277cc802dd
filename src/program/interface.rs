use crate::error::{Error, Result};
use std::collections::HashMap;
use wgpu::naga;

/// A tagged union over the uniform value types the core recognizes (§9
/// design notes' "variant for uniform values"), the non-templated
/// equivalent of the C++ original's `UniformState<T>` dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    UInt(u32),
    UVec2([u32; 2]),
    UVec3([u32; 3]),
    UVec4([u32; 4]),
    Bool(bool),
    Mat2([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

impl UniformValue {
    /// Raw bytes as they belong in a std140/std430 uniform buffer at this
    /// value's own offset. Matrix variants are written column-major, matching
    /// WGSL's layout.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Vec2(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Vec3(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Vec4(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Int(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::IVec2(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::IVec3(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::IVec4(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::UInt(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::UVec2(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::UVec3(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::UVec4(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Bool(v) => bytemuck::bytes_of(&(*v as u32)).to_vec(),
            UniformValue::Mat2(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Mat3(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Mat4(v) => bytemuck::bytes_of(v).to_vec(),
        }
    }
}

/// One reflected resource: a uniform struct member, a stage I/O location, or
/// a bound sampler/texture global.
#[derive(Debug, Clone)]
pub struct ResourceInfo {
    pub name: String,
    pub location: u32,
    pub offset: u32,
    pub array_size: u32,
}

/// Lookup by name or location over one resource category (uniform,
/// program_input, or program_output), per §4's three reflected interfaces.
#[derive(Debug, Clone, Default)]
pub struct ResourceList {
    resources: Vec<ResourceInfo>,
}

impl ResourceList {
    pub fn find_by_name(&self, name: &str) -> Option<&ResourceInfo> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn find_by_location(&self, location: u32) -> Option<&ResourceInfo> {
        self.resources.iter().find(|r| r.location == location)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceInfo> {
        self.resources.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }
}

/// Reflection of a linked program: which uniforms, channel inputs, and color
/// outputs are active, discovered from the naga IR wgpu already parses
/// WGSL into (no separate `naga` dependency needed).
#[derive(Debug, Clone, Default)]
pub struct ProgramInterface {
    uniforms: ResourceList,
    uniform_size: u32,
    inputs: ResourceList,
    outputs: ResourceList,
}

impl ProgramInterface {
    pub fn uniforms(&self) -> &ResourceList {
        &self.uniforms
    }

    pub fn inputs(&self) -> &ResourceList {
        &self.inputs
    }

    pub fn outputs(&self) -> &ResourceList {
        &self.outputs
    }

    /// Total byte size of the uniform block, for allocating the backing
    /// `wgpu::Buffer`. Zero if the module declares no uniform block.
    pub fn uniform_buffer_size(&self) -> u32 {
        self.uniform_size
    }

    pub fn is_uniform_active(&self, name: &str) -> bool {
        self.uniforms.find_by_name(name).is_some()
    }

    /// Reflect a parsed WGSL module: the uniform-address-space struct's
    /// members become `uniforms`; the fragment entry point's outputs become
    /// `outputs`; the vertex entry point's inputs become `inputs`.
    pub fn reflect(module: &naga::Module, label: &str) -> Result<Self> {
        let mut uniforms = Vec::new();
        let mut uniform_size = 0u32;

        for (_, global) in module.global_variables.iter() {
            if global.space != naga::AddressSpace::Uniform {
                continue;
            }
            if let naga::TypeInner::Struct { members, span } = &module.types[global.ty].inner {
                uniform_size = uniform_size.max(*span);
                for member in members {
                    let Some(name) = &member.name else { continue };
                    let array_size = array_len(&module.types[member.ty].inner);
                    uniforms.push(ResourceInfo {
                        name: name.clone(),
                        location: 0,
                        offset: member.offset,
                        array_size,
                    });
                }
            }
        }

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for entry_point in &module.entry_points {
            match entry_point.stage {
                naga::ShaderStage::Vertex => {
                    for arg in &entry_point.function.arguments {
                        if let Some(naga::Binding::Location { location, .. }) = &arg.binding {
                            let name = arg.name.clone().unwrap_or_default();
                            inputs.push(ResourceInfo { name, location: *location, offset: 0, array_size: 1 });
                        }
                    }
                }
                naga::ShaderStage::Fragment => {
                    if let Some(result) = &entry_point.function.result {
                        if let Some(naga::Binding::Location { location, .. }) = &result.binding {
                            outputs.push(ResourceInfo {
                                name: String::new(),
                                location: *location,
                                offset: 0,
                                array_size: 1,
                            });
                        } else if let naga::TypeInner::Struct { members, .. } = &module.types[result.ty].inner {
                            for member in members {
                                if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                                    outputs.push(ResourceInfo {
                                        name: member.name.clone().unwrap_or_default(),
                                        location: *location,
                                        offset: 0,
                                        array_size: 1,
                                    });
                                }
                            }
                        }
                    }
                }
                naga::ShaderStage::Compute | naga::ShaderStage::Task | naga::ShaderStage::Mesh => {}
            }
        }

        if uniforms.is_empty() && uniform_size == 0 {
            log::debug!("{label}: no uniform block reflected");
        }

        Ok(Self {
            uniforms: ResourceList { resources: uniforms },
            uniform_size,
            inputs: ResourceList { resources: inputs },
            outputs: ResourceList { resources: outputs },
        })
    }

    /// Encode `value` into `scratch` (a CPU mirror of the uniform buffer) at
    /// the reflected offset for `name`. A no-op if the uniform isn't active,
    /// per §6's "setting an inactive uniform is a silent no-op".
    pub fn set_uniform(&self, scratch: &mut [u8], name: &str, value: UniformValue) -> Result<()> {
        let Some(info) = self.uniforms.find_by_name(name) else {
            return Ok(());
        };
        let bytes = value.bytes();
        let start = info.offset as usize;
        let end = start + bytes.len();
        if end > scratch.len() {
            return Err(Error::InvalidConfiguration(format!(
                "uniform {name} at offset {start} overruns the {}-byte uniform buffer",
                scratch.len()
            )));
        }
        scratch[start..end].copy_from_slice(&bytes);
        Ok(())
    }
}

fn array_len(inner: &naga::TypeInner) -> u32 {
    match inner {
        naga::TypeInner::Array { size: naga::ArraySize::Constant(n), .. } => n.get(),
        _ => 1,
    }
}

/// Per-stage naga modules parsed from a composed shader's sources, keyed by
/// the template's stage name (`"vertex"`, `"fragment"`, `"compute"`).
pub type ParsedStages = HashMap<String, naga::Module>;

#[cfg(test)]
mod tests {
    use super::*;

    const SHADER: &str = r#"
struct Uniforms {
    iResolution: vec3<f32>,
    iTime: f32,
}
@group(0) @binding(0) var<uniform> uniforms: Uniforms;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(uniforms.iTime, 0.0, 0.0, 1.0);
}
"#;

    #[test]
    fn reflects_uniform_members_and_fragment_output() {
        let module = naga::front::wgsl::parse_str(SHADER).unwrap();
        let interface = ProgramInterface::reflect(&module, "test").unwrap();
        assert!(interface.is_uniform_active("iTime"));
        assert!(!interface.is_uniform_active("iFrame"));
        assert_eq!(interface.outputs().len(), 1);
        assert_eq!(interface.outputs().find_by_location(0).unwrap().location, 0);
    }

    #[test]
    fn set_uniform_writes_bytes_at_reflected_offset() {
        let module = naga::front::wgsl::parse_str(SHADER).unwrap();
        let interface = ProgramInterface::reflect(&module, "test").unwrap();
        let mut scratch = vec![0u8; interface.uniform_buffer_size() as usize];
        interface.set_uniform(&mut scratch, "iTime", UniformValue::Float(2.5)).unwrap();
        let offset = interface.uniforms().find_by_name("iTime").unwrap().offset as usize;
        assert_eq!(&scratch[offset..offset + 4], &2.5f32.to_le_bytes());
    }

    #[test]
    fn set_uniform_on_inactive_name_is_a_noop() {
        let module = naga::front::wgsl::parse_str(SHADER).unwrap();
        let interface = ProgramInterface::reflect(&module, "test").unwrap();
        let mut scratch = vec![0u8; interface.uniform_buffer_size() as usize];
        interface.set_uniform(&mut scratch, "iFrame", UniformValue::Int(1)).unwrap();
        assert!(scratch.iter().all(|&b| b == 0));
    }
}
