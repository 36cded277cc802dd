use crate::input::ChannelInput;

/// What kind of binding a `ProgramInput`'s WGSL declaration produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// `var<storage, ...>` / storage-texture binding (`sampler_type` starts
    /// with `texture_storage`).
    Image,
    /// A sampled-texture binding (`sampler_type` starts with `texture`).
    Texture,
    /// Neither convention matched; the input is declared but its kind
    /// couldn't be derived from `sampler_type`.
    Unknown,
}

fn derive_kind(sampler_type: &str) -> InputKind {
    if sampler_type.starts_with("texture_storage") {
        InputKind::Image
    } else if sampler_type.starts_with("texture") {
        InputKind::Texture
    } else {
        InputKind::Unknown
    }
}

/// One channel binding a program declares. `sampler_name` is `None` for
/// legacy positional bindings (`iChannelN` by index, for compatibility with
/// shaders that never name their channels); `memory_qualifier` mirrors
/// GLSL's `readonly`/`writeonly` for image bindings, rendered verbatim into
/// the WGSL access-mode of a storage texture declaration.
pub struct ProgramInput {
    pub memory_qualifier: Option<String>,
    pub sampler_type: String,
    pub sampler_name: Option<String>,
    pub kind: InputKind,
    pub input: ChannelInput,
}

impl ProgramInput {
    pub fn new(sampler_type: impl Into<String>, input: ChannelInput) -> Self {
        let sampler_type = sampler_type.into();
        let kind = derive_kind(&sampler_type);
        Self {
            memory_qualifier: None,
            sampler_type,
            sampler_name: None,
            kind,
            input,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.sampler_name = Some(name.into());
        self
    }

    pub fn with_memory_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.memory_qualifier = Some(qualifier.into());
        self
    }

    /// The WGSL declaration line(s) this input contributes to the
    /// `*:inputs` template part, at the given texture and sampler binding
    /// slots (the sampler slot is unused, and no sampler line emitted,
    /// for [`InputKind::Image`]). Unnamed inputs render a comment
    /// placeholder, since a position-only binding still needs `iChannelN`
    /// compatibility naming resolved by
    /// [`crate::program::host::ProgramHost`] before it can be declared.
    pub fn definition_string(&self, fallback_name: &str, group: u32, texture_binding: u32, sampler_binding: u32) -> String {
        match &self.sampler_name {
            Some(name) => {
                let qualifier = self
                    .memory_qualifier
                    .as_deref()
                    .map(|q| format!("{q} "))
                    .unwrap_or_default();
                let texture_decl = format!(
                    "@group({group}) @binding({texture_binding}) {qualifier}var {name}: {};",
                    self.sampler_type
                );
                match self.kind {
                    InputKind::Texture | InputKind::Unknown => format!(
                        "{texture_decl}\n@group({group}) @binding({sampler_binding}) var {name}_sampler: sampler;"
                    ),
                    InputKind::Image => texture_decl,
                }
            }
            None => format!("/* unnamed {} input ({fallback_name}) */", self.sampler_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::BasicInput;

    #[test]
    fn derives_image_kind_from_storage_sampler_type() {
        let input = ProgramInput::new("texture_storage_2d<rgba8unorm, write>", ChannelInput::new(BasicInput::Error));
        assert_eq!(input.kind, InputKind::Image);
    }

    #[test]
    fn derives_texture_kind_from_sampled_sampler_type() {
        let input = ProgramInput::new("texture_2d<f32>", ChannelInput::new(BasicInput::Error));
        assert_eq!(input.kind, InputKind::Texture);
    }

    #[test]
    fn unnamed_input_renders_placeholder_comment() {
        let input = ProgramInput::new("texture_2d<f32>", ChannelInput::new(BasicInput::Error));
        assert!(input.definition_string("iChannel0", 2, 0, 1).contains("unnamed"));
    }

    #[test]
    fn named_texture_input_renders_texture_and_sampler_declarations() {
        let input = ProgramInput::new("texture_2d<f32>", ChannelInput::new(BasicInput::Error)).named("iChannel0");
        assert_eq!(
            input.definition_string("iChannel0", 2, 3, 4),
            "@group(2) @binding(3) var iChannel0: texture_2d<f32>;\n@group(2) @binding(4) var iChannel0_sampler: sampler;"
        );
    }

    #[test]
    fn named_image_input_renders_only_texture_declaration() {
        let input = ProgramInput::new("texture_storage_2d<rgba8unorm, write>", ChannelInput::new(BasicInput::Error)).named("iImage0");
        assert_eq!(
            input.definition_string("iImage0", 2, 3, 4),
            "@group(2) @binding(3) var iImage0: texture_storage_2d<rgba8unorm, write>;"
        );
    }
}
