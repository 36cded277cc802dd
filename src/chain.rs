use crate::context::RenderContext;
use crate::error::{Error, Result};
use crate::io::OutputName;
use crate::member::{Member, MemberKey};
use crate::Core;

/// A read-only view of every member's most recently produced outputs,
/// handed to each member's `render` so its channel inputs can resolve
/// buffer references without borrowing the chain's live, currently
/// mutably-borrowed member objects.
///
/// This is populated incrementally: right after member `i` renders and
/// swaps, the chain refreshes `outputs[i]`. A member reading *its own*
/// entry during its own render therefore sees last frame's texture (the
/// self-referential double-buffering case, §8 S3); a later member reading
/// an earlier one sees this frame's freshly rendered texture (§8 S2).
pub struct ChainOutputs<'a> {
    outputs: &'a [Vec<(OutputName, wgpu::Texture)>],
}

impl<'a> ChainOutputs<'a> {
    /// Resolve the texture a buffer input should read: `selector` picks an
    /// output by the partial-equality rule of [`OutputName::matches`] where
    /// possible; with no selector, or none matching, the first output
    /// (or, for a `Location` selector in range, that index) is used.
    pub fn resolve(&self, key: MemberKey, selector: Option<&OutputName>) -> Option<wgpu::Texture> {
        let outputs = self.outputs.get(key.index)?;
        if outputs.is_empty() {
            return None;
        }
        let index = match selector {
            None => 0,
            Some(sel) => outputs
                .iter()
                .position(|(name, _)| name == sel)
                .or_else(|| match sel {
                    OutputName::Location(loc) => {
                        let i = *loc as usize;
                        (i < outputs.len()).then_some(i)
                    }
                    OutputName::Name(_) => None,
                })?,
        };
        outputs.get(index).map(|(_, tex)| tex.clone())
    }
}

/// An ordered, append-only list of [`Member`]s. Tracks the member rendered
/// most recently (`current`).
///
/// The reference's `before(m)` / no-duplicates contract only has bite when
/// members can be removed or reinserted; this chain is append-only, so
/// "already in this chain" can only happen if a caller stores and reuses a
/// [`MemberKey`] across two `push_back` calls for the same boxed member,
/// which the ownership model here already prevents (pushing moves the
/// member in).
pub struct SwapChain {
    members: Vec<Box<dyn Member>>,
    outputs: Vec<Vec<(OutputName, wgpu::Texture)>>,
    current: Option<MemberKey>,
}

impl SwapChain {
    pub fn new() -> Self {
        Self { members: Vec::new(), outputs: Vec::new(), current: None }
    }

    /// Append a member, returning the key under which it can be referenced
    /// (e.g. as a buffer input's source, or a screen member's source).
    pub fn push_back(&mut self, factory: impl FnOnce(MemberKey) -> Box<dyn Member>) -> MemberKey {
        let key = MemberKey { index: self.members.len(), generation: 0 };
        self.members.push(factory(key));
        self.outputs.push(Vec::new());
        key
    }

    pub fn before_key(&self, key: MemberKey) -> Option<MemberKey> {
        key.before()
    }

    pub fn current(&self) -> Option<MemberKey> {
        self.current
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn outputs_view(&self) -> ChainOutputs<'_> {
        ChainOutputs { outputs: &self.outputs }
    }

    pub fn init(&mut self, core: &Core, ctx: &mut RenderContext) -> Result<()> {
        for member in &mut self.members {
            member.init(core, ctx)?;
        }
        Ok(())
    }

    pub fn allocate_textures(&mut self, core: &Core) -> Result<()> {
        for member in &mut self.members {
            member.allocate(core)?;
        }
        Ok(())
    }

    /// Render every member in order, updating `current` after each.
    /// `default_view` is handed to any member whose I/O policy is
    /// `default_framebuffer` (including a trailing screen member).
    pub fn render(
        &mut self,
        core: &Core,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        default_view: Option<&wgpu::TextureView>,
    ) -> Result<()> {
        let len = self.members.len();
        self.render_range(core, ctx, encoder, default_view, 0, len)
    }

    /// Render the half-open member index range `[begin, end)`. Fails if the
    /// range is out of bounds.
    pub fn render_range(
        &mut self,
        core: &Core,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        default_view: Option<&wgpu::TextureView>,
        begin: usize,
        end: usize,
    ) -> Result<()> {
        if end > self.members.len() || begin > end {
            return Err(Error::InvalidConfiguration(format!(
                "render range {begin}..{end} is out of bounds for a chain of {} members",
                self.members.len()
            )));
        }
        for i in begin..end {
            let view = ChainOutputs { outputs: &self.outputs };
            let member = &mut self.members[i];
            member.render(core, ctx, &view, encoder, default_view)?;
            self.outputs[i] = member.output();
            self.current = Some(MemberKey { index: i, generation: 0 });
        }
        Ok(())
    }
}

impl Default for SwapChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopMember;
    impl Member for NoopMember {
        fn init(&mut self, _core: &Core, _ctx: &mut RenderContext) -> Result<()> {
            Ok(())
        }
        fn allocate(&mut self, _core: &Core) -> Result<()> {
            Ok(())
        }
        fn render(
            &mut self,
            _core: &Core,
            _ctx: &RenderContext,
            _chain: &ChainOutputs,
            _encoder: &mut wgpu::CommandEncoder,
            _default_view: Option<&wgpu::TextureView>,
        ) -> Result<()> {
            Ok(())
        }
        fn output(&self) -> Vec<(OutputName, wgpu::Texture)> {
            Vec::new()
        }
        fn find_output(&self, _name: &OutputName) -> Option<usize> {
            None
        }
    }

    #[test]
    fn before_key_walks_backwards_and_first_member_has_none() {
        let mut chain = SwapChain::new();
        let m0 = chain.push_back(|_| Box::new(NoopMember));
        let m1 = chain.push_back(|_| Box::new(NoopMember));
        assert_eq!(chain.before_key(m0), None);
        assert_eq!(chain.before_key(m1), Some(m0));
    }

    #[test]
    fn empty_chain_has_no_current_member() {
        let chain = SwapChain::new();
        assert_eq!(chain.current(), None);
        assert!(chain.is_empty());
    }

    #[test]
    fn resolving_with_no_matching_output_returns_none() {
        let mut chain = SwapChain::new();
        let m0 = chain.push_back(|_| Box::new(NoopMember));
        let view = chain.outputs_view();
        assert!(view.resolve(m0, None).is_none());
    }
}
