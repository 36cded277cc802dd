mod sampler;

pub use sampler::{ImageBinding, SamplerState};

use crate::chain::ChainOutputs;
use crate::context::RenderContext;
use crate::error::Result;
use crate::io::OutputName;
use crate::member::MemberKey;
use crate::size::Size;
use crate::Core;
use rand::RngCore;
use std::path::PathBuf;

/// The declarative source of a channel input's texture. Cheap to construct;
/// the actual GPU texture is produced lazily by [`ChannelInput::load`].
#[derive(Debug, Clone)]
pub enum BasicInput {
    /// The small magenta-checker texture substituted whenever a real input
    /// is unavailable.
    Error,
    /// The output of another swap-chain member, read through a weak
    /// reference. Reading one's own member yields the previous frame.
    Buffer {
        member: MemberKey,
        output: Option<OutputName>,
    },
    /// A texture handed to the input by the caller; never reloaded.
    Texture(std::sync::Arc<wgpu::Texture>),
    /// A texture decoded from a file on first use.
    File { path: PathBuf, vflip: bool },
    /// A uniform-random 8-bit single-channel texture of a given size.
    Noise { size: Size },
    /// A black-and-white checkerboard texture.
    Checker { size: Size, tile_size: Size },
}

/// A channel input: a [`BasicInput`] source plus the sampler and (for image
/// bindings) image-binding state a program binds it with. Owns its texture
/// except for the [`BasicInput::Buffer`] variant, which only ever borrows
/// through the chain.
pub struct ChannelInput {
    source: BasicInput,
    sampler: SamplerState,
    image_binding: Option<ImageBinding>,
    loaded: Option<wgpu::Texture>,
}

impl ChannelInput {
    pub fn new(source: BasicInput) -> Self {
        Self {
            source,
            sampler: SamplerState::default(),
            image_binding: None,
            loaded: None,
        }
    }

    pub fn with_sampler(mut self, sampler: SamplerState) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_image_binding(mut self, binding: ImageBinding) -> Self {
        self.image_binding = Some(binding);
        self
    }

    pub fn sampler(&self) -> SamplerState {
        self.sampler
    }

    pub fn image_binding(&self) -> Option<ImageBinding> {
        self.image_binding
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Explicitly drop any cached texture so the next `use_input` reloads it.
    pub fn reset(&mut self) {
        self.loaded = None;
    }

    /// Load the backing texture if this is not a [`BasicInput::Buffer`] and
    /// it isn't already loaded. A no-op otherwise.
    pub fn load(&mut self, core: &Core) -> Result<()> {
        if self.loaded.is_some() || matches!(self.source, BasicInput::Buffer { .. }) {
            return Ok(());
        }
        let loaded = match &self.source {
            BasicInput::Error => error_texture(core),
            BasicInput::Texture(tex) => (**tex).clone(),
            BasicInput::File { path, vflip } => match decode_file(core, path, *vflip) {
                Ok(loaded) => loaded,
                Err(e) => {
                    log::warn!("channel input file load failed ({}): {e}", path.display());
                    return Ok(());
                }
            },
            BasicInput::Noise { size } => noise_texture(core, *size),
            BasicInput::Checker { size, tile_size } => checker_texture(core, *size, *tile_size),
            BasicInput::Buffer { .. } => unreachable!(),
        };
        self.loaded = Some(loaded);
        Ok(())
    }

    /// Resolve the texture view this input currently provides, loading on
    /// first use. For [`BasicInput::Buffer`], resolves through `chain`
    /// every call (it never caches a texture of its own); if the referenced
    /// member or output has disappeared, logs a warning and falls back to
    /// the context's error texture.
    pub fn use_input(
        &mut self,
        core: &Core,
        ctx: &RenderContext,
        chain: &ChainOutputs,
    ) -> Result<wgpu::TextureView> {
        if let BasicInput::Buffer { member, output } = &self.source {
            return Ok(resolve_buffer_input(chain, ctx, *member, output.as_ref()));
        }
        self.load(core)?;
        let texture = self.loaded.as_ref().expect("just loaded");
        Ok(texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }
}

fn resolve_buffer_input(
    chain: &ChainOutputs,
    ctx: &RenderContext,
    member: MemberKey,
    output: Option<&OutputName>,
) -> wgpu::TextureView {
    match chain.resolve(member, output) {
        Some(tex) => tex.create_view(&wgpu::TextureViewDescriptor::default()),
        None => {
            log::warn!("buffer input references a member or output that no longer exists");
            ctx.error_texture().create_view(&wgpu::TextureViewDescriptor::default())
        }
    }
}

pub(crate) fn error_texture(core: &Core) -> wgpu::Texture {
    const TILE: u32 = 4;
    let size = Size::new(TILE * 2, TILE * 2);
    let mut pixels = vec![0u8; (size.width * size.height * 4) as usize];
    for y in 0..size.height {
        for x in 0..size.width {
            let idx = ((y * size.width + x) * 4) as usize;
            let on = ((x / TILE) + (y / TILE)).is_multiple_of(2);
            let color = if on { [255, 0, 255, 255] } else { [0, 0, 0, 255] };
            pixels[idx..idx + 4].copy_from_slice(&color);
        }
    }
    upload_rgba8(core, size, &pixels, "error-input")
}

fn noise_texture(core: &Core, size: Size) -> wgpu::Texture {
    let mut rng = rand::thread_rng();
    let mut pixels = vec![0u8; (size.width * size.height) as usize];
    rng.fill_bytes(&mut pixels);
    upload_r8(core, size, &pixels, "noise-input")
}

fn checker_texture(core: &Core, size: Size, tile_size: Size) -> wgpu::Texture {
    let tw = tile_size.width.max(1);
    let th = tile_size.height.max(1);
    let mut pixels = vec![0u8; (size.width * size.height * 4) as usize];
    for y in 0..size.height {
        for x in 0..size.width {
            let idx = ((y * size.width + x) * 4) as usize;
            let on = ((x / tw) + (y / th)).is_multiple_of(2);
            let v = if on { 255 } else { 0 };
            pixels[idx..idx + 4].copy_from_slice(&[v, v, v, 255]);
        }
    }
    upload_rgba8(core, size, &pixels, "checker-input")
}

fn decode_file(core: &Core, path: &PathBuf, vflip: bool) -> crate::error::Result<wgpu::Texture> {
    use crate::error::Error;
    if !path.exists() {
        return Err(Error::FileNotFound(path.clone()));
    }
    let mut img = image::open(path)?.to_rgba8();
    if vflip {
        image::imageops::flip_vertical_in_place(&mut img);
    }
    let size = Size::new(img.width(), img.height());
    Ok(upload_rgba8(core, size, img.as_raw(), &path.to_string_lossy()))
}

fn upload_rgba8(core: &Core, size: Size, pixels: &[u8], label: &str) -> wgpu::Texture {
    upload(
        core,
        size,
        pixels,
        wgpu::TextureFormat::Rgba8Unorm,
        4,
        label,
    )
}

fn upload_r8(core: &Core, size: Size, pixels: &[u8], label: &str) -> wgpu::Texture {
    upload(core, size, pixels, wgpu::TextureFormat::R8Unorm, 1, label)
}

fn upload(
    core: &Core,
    size: Size,
    pixels: &[u8],
    format: wgpu::TextureFormat,
    bytes_per_pixel: u32,
    label: &str,
) -> wgpu::Texture {
    let texture = core.device.create_texture(&wgpu::TextureDescriptor {
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
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    core.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(size.width * bytes_per_pixel),
            rows_per_image: Some(size.height),
        },
        wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
    );
    texture
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_input_starts_unloaded() {
        let input = ChannelInput::new(BasicInput::Error);
        assert!(!input.is_loaded());
    }

    #[test]
    fn reset_clears_loaded_state_flag() {
        let mut input = ChannelInput::new(BasicInput::Error);
        input.reset();
        assert!(!input.is_loaded());
    }
}
