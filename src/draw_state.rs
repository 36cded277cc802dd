/// Which of the render pass's clear operations run before a member's draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl ClearMask {
    pub const NONE: Self = Self { color: false, depth: false, stencil: false };
    pub const ALL: Self = Self { color: true, depth: true, stencil: true };
}

/// A member's fixed rendering state, the wgpu analogue of the reference's
/// per-member GL capability/clear snapshot.
///
/// wgpu bakes most of this into a `RenderPipeline` at creation time rather
/// than toggling it per draw call, so "apply the minimal set of state
/// changes" (testable property 7) becomes "bake the pipeline once per
/// distinct `DrawState`"; there is no redundant-call problem left to solve
/// because there are no per-draw calls to begin with. What's left dynamic —
/// the load/clear operations — is still chosen per `render()` from the
/// fields below.
#[derive(Debug, Clone, Copy)]
pub struct DrawState {
    pub blend: bool,
    pub cull_face: bool,
    pub depth_test: bool,
    pub depth_write: bool,
    pub cull_mode: wgpu::Face,
    pub depth_compare: wgpu::CompareFunction,
    pub blend_color_op: wgpu::BlendOperation,
    pub blend_alpha_op: wgpu::BlendOperation,
    pub blend_src: wgpu::BlendFactor,
    pub blend_dst: wgpu::BlendFactor,
    pub clear_color: wgpu::Color,
    pub clear_depth: f32,
    pub clear_stencil: u32,
    pub clear_mask: ClearMask,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            blend: false,
            cull_face: false,
            depth_test: false,
            depth_write: true,
            cull_mode: wgpu::Face::Back,
            depth_compare: wgpu::CompareFunction::Less,
            blend_color_op: wgpu::BlendOperation::Add,
            blend_alpha_op: wgpu::BlendOperation::Add,
            blend_src: wgpu::BlendFactor::SrcAlpha,
            blend_dst: wgpu::BlendFactor::OneMinusSrcAlpha,
            clear_color: wgpu::Color::BLACK,
            clear_depth: 1.0,
            clear_stencil: 0,
            clear_mask: ClearMask::ALL,
        }
    }
}

impl DrawState {
    pub fn blend_state(&self) -> Option<wgpu::BlendState> {
        self.blend.then_some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: self.blend_src,
                dst_factor: self.blend_dst,
                operation: self.blend_color_op,
            },
            alpha: wgpu::BlendComponent {
                src_factor: self.blend_src,
                dst_factor: self.blend_dst,
                operation: self.blend_alpha_op,
            },
        })
    }

    pub fn primitive_state(&self) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: self.cull_face.then_some(self.cull_mode),
            ..Default::default()
        }
    }

    pub fn depth_stencil_state(&self, format: wgpu::TextureFormat) -> Option<wgpu::DepthStencilState> {
        self.depth_test.then(|| wgpu::DepthStencilState {
            format,
            depth_write_enabled: self.depth_write,
            depth_compare: self.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        })
    }

    pub fn color_load_op(&self) -> wgpu::LoadOp<wgpu::Color> {
        if self.clear_mask.color {
            wgpu::LoadOp::Clear(self.clear_color)
        } else {
            wgpu::LoadOp::Load
        }
    }

    pub fn depth_load_op(&self) -> wgpu::LoadOp<f32> {
        if self.clear_mask.depth {
            wgpu::LoadOp::Clear(self.clear_depth)
        } else {
            wgpu::LoadOp::Load
        }
    }

    pub fn stencil_load_op(&self) -> wgpu::LoadOp<u32> {
        if self.clear_mask.stencil {
            wgpu::LoadOp::Clear(self.clear_stencil)
        } else {
            wgpu::LoadOp::Load
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_has_no_blend_and_clears_everything() {
        let state = DrawState::default();
        assert!(state.blend_state().is_none());
        assert_eq!(state.clear_mask, ClearMask::ALL);
    }

    #[test]
    fn enabling_blend_produces_a_blend_state() {
        let state = DrawState { blend: true, ..Default::default() };
        assert!(state.blend_state().is_some());
    }

    #[test]
    fn disabling_depth_test_drops_depth_stencil_state() {
        let state = DrawState::default();
        assert!(state.depth_stencil_state(wgpu::TextureFormat::Depth24Plus).is_none());
    }

    #[test]
    fn clear_mask_none_loads_instead_of_clearing() {
        let state = DrawState { clear_mask: ClearMask::NONE, ..Default::default() };
        assert!(matches!(state.color_load_op(), wgpu::LoadOp::Load));
        assert!(matches!(state.depth_load_op(), wgpu::LoadOp::Load));
    }
}
