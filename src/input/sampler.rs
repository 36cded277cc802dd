/// Sampler state owned by a channel input, independent of which texture it
/// currently provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerState {
    pub min_filter: wgpu::FilterMode,
    pub mag_filter: wgpu::FilterMode,
    pub wrap_u: wgpu::AddressMode,
    pub wrap_v: wgpu::AddressMode,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            min_filter: wgpu::FilterMode::Linear,
            mag_filter: wgpu::FilterMode::Linear,
            wrap_u: wgpu::AddressMode::Repeat,
            wrap_v: wgpu::AddressMode::Repeat,
        }
    }
}

impl SamplerState {
    pub fn nearest() -> Self {
        Self {
            min_filter: wgpu::FilterMode::Nearest,
            mag_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        }
    }

    pub fn to_descriptor<'a>(self, label: &'a str) -> wgpu::SamplerDescriptor<'a> {
        wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: self.wrap_u,
            address_mode_v: self.wrap_v,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            min_filter: self.min_filter,
            mag_filter: self.mag_filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        }
    }
}

/// Descriptor used only when a [`crate::input::BasicInput`] is bound as an
/// image (storage texture) rather than a sampled texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBinding {
    pub level: u32,
    pub layered: bool,
    pub layer: u32,
    pub access: wgpu::StorageTextureAccess,
    pub format: wgpu::TextureFormat,
}
