//! Orchestration of Shadertoy-style multi-pass GPU render pipelines over wgpu.
//!
//! A [`SwapChain`] holds an ordered list of [`Member`]s, each wrapping a
//! [`buffer::ProgramBuffer`] or [`buffer::ComputeBuffer`] plus the I/O
//! resource it renders into. [`RenderContext`] holds the resources shared
//! across every member: the screen-blit program, the screen quad, the error
//! texture, and the default program template factories.

pub mod buffer;
pub mod chain;
pub mod context;
pub mod draw_state;
pub mod error;
pub mod formats;
pub mod input;
pub mod io;
pub mod member;
pub mod program;
pub mod size;
pub mod template;

pub use chain::{ChainOutputs, SwapChain};
pub use context::RenderContext;
pub use draw_state::{ClearMask, DrawState};
pub use error::{Error, Result};
pub use member::{ComputeMember, GraphicsMember, Member, MemberKey, ScreenMember};
pub use size::Size;

/// The GPU handles every other part of this crate operates against: a
/// device, its queue, and the adapter they came from. Plays the role the
/// specification assigns to the GX backend's factory and state tracker —
/// `wgpu` already supplies the move-only, RAII resource layer that role
/// calls for, so there is no separate hand-rolled backend trait here.
pub struct Core {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Core {
    /// Request a headless adapter and device with no compatible surface.
    /// Used by tests and by hosts that render entirely to textures.
    pub async fn new_headless() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .map_err(|e| Error::Backend(format!("no adapter available: {e}")))?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("passchain/device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| Error::Backend(format!("device request failed: {e}")))?;
        Ok(Self { instance, adapter, device, queue })
    }

    /// Whether this adapter can run compute passes, per §9's "capability
    /// differences ... drive compile-time flags" mapped to a runtime check.
    pub fn supports_compute(&self) -> bool {
        self.adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
    }
}
