//! Internal-format metadata for I/O resource texture creation.
//!
//! The original GL-era table maps an internal storage format to the
//! (upload format, upload type) pair used for the initial texture upload.
//! Under wgpu the storage format already fully determines the matching
//! pixel layout, but the same lookup still matters for one thing this core
//! needs: deciding how many bytes of zeroed data to hand
//! `Queue::write_texture` when clearing a freshly allocated render target to
//! a known state before the first pass renders into it, and what component
//! count/bit depth a channel input's CPU-side pixel buffer must have to
//! upload cleanly into a given [`wgpu::TextureFormat`].

/// Bytes-per-pixel and component count for formats this core allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub bytes_per_pixel: u32,
    pub components: u32,
}

pub fn format_info(format: wgpu::TextureFormat) -> FormatInfo {
    use wgpu::TextureFormat::*;
    match format {
        R8Unorm | R8Uint | R8Snorm | R8Sint => FormatInfo {
            bytes_per_pixel: 1,
            components: 1,
        },
        R16Float | R16Uint | R16Sint | R16Unorm | R16Snorm => FormatInfo {
            bytes_per_pixel: 2,
            components: 1,
        },
        R32Float | R32Uint | R32Sint => FormatInfo {
            bytes_per_pixel: 4,
            components: 1,
        },
        Rg8Unorm | Rg8Uint | Rg8Snorm | Rg8Sint => FormatInfo {
            bytes_per_pixel: 2,
            components: 2,
        },
        Rg16Float | Rg16Uint | Rg16Sint | Rg16Unorm | Rg16Snorm => FormatInfo {
            bytes_per_pixel: 4,
            components: 2,
        },
        Rg32Float | Rg32Uint | Rg32Sint => FormatInfo {
            bytes_per_pixel: 8,
            components: 2,
        },
        Rgba8Unorm | Rgba8UnormSrgb | Rgba8Uint | Rgba8Snorm | Rgba8Sint | Bgra8Unorm
        | Bgra8UnormSrgb => FormatInfo {
            bytes_per_pixel: 4,
            components: 4,
        },
        Rgba16Float | Rgba16Uint | Rgba16Sint | Rgba16Unorm | Rgba16Snorm => FormatInfo {
            bytes_per_pixel: 8,
            components: 4,
        },
        Rgba32Float | Rgba32Uint | Rgba32Sint => FormatInfo {
            bytes_per_pixel: 16,
            components: 4,
        },
        Depth16Unorm => FormatInfo {
            bytes_per_pixel: 2,
            components: 1,
        },
        Depth24Plus => FormatInfo {
            bytes_per_pixel: 4,
            components: 1,
        },
        Depth32Float => FormatInfo {
            bytes_per_pixel: 4,
            components: 1,
        },
        Depth24PlusStencil8 => FormatInfo {
            bytes_per_pixel: 4,
            components: 2,
        },
        Depth32FloatStencil8 => FormatInfo {
            bytes_per_pixel: 5,
            components: 2,
        },
        // Default, matching the original's fallback row: treat as an
        // 8-bit-per-channel RGBA upload.
        _ => FormatInfo {
            bytes_per_pixel: 4,
            components: 4,
        },
    }
}

/// Default color render target format used when a discovered program
/// output has no caller-supplied override.
pub const DEFAULT_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Depth format used for the renderbuffer every graphics [`crate::buffer::ProgramBuffer`]
/// allocates alongside its color outputs.
pub const DEFAULT_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba32float_is_16_bytes_4_components() {
        let info = format_info(wgpu::TextureFormat::Rgba32Float);
        assert_eq!(info.bytes_per_pixel, 16);
        assert_eq!(info.components, 4);
    }

    #[test]
    fn r8unorm_is_1_byte_1_component() {
        let info = format_info(wgpu::TextureFormat::R8Unorm);
        assert_eq!(info.bytes_per_pixel, 1);
        assert_eq!(info.components, 1);
    }

    #[test]
    fn unlisted_format_falls_back_to_rgba8() {
        let info = format_info(wgpu::TextureFormat::Bc1RgbaUnorm);
        assert_eq!(info.bytes_per_pixel, 4);
        assert_eq!(info.components, 4);
    }
}
