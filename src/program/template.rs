use crate::error::{Error, Result};
use crate::template::{PreprocessorDefines, ShaderTemplate, TemplatePart};
use std::collections::HashMap;

/// Which shader stage a [`ShaderTemplate`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
    Compute,
}

impl Stage {
    pub fn naga_shader_stage(self) -> wgpu::naga::ShaderStage {
        match self {
            Stage::Vertex => wgpu::naga::ShaderStage::Vertex,
            Stage::Fragment => wgpu::naga::ShaderStage::Fragment,
            Stage::Compute => wgpu::naga::ShaderStage::Compute,
        }
    }
}

/// A map from shader stage to template, plus insertion-ordered named define
/// blocks shared across stages via the `<name>:defines` / `*:defines`
/// part-name convention.
#[derive(Default)]
pub struct ProgramTemplate {
    stages: HashMap<Stage, ShaderTemplate>,
    defines: Vec<(String, PreprocessorDefines)>,
    precompiled: HashMap<Stage, String>,
}

impl ProgramTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emplace(&mut self, stage: Stage, template: ShaderTemplate) -> Result<()> {
        if self.stages.contains_key(&stage) {
            return Err(Error::Template(format!("stage {stage:?} is already present")));
        }
        self.stages.insert(stage, template);
        Ok(())
    }

    pub fn define_block(&mut self, name: impl Into<String>, defines: PreprocessorDefines) {
        self.defines.push((name.into(), defines));
    }

    /// Auto-derived parts for the `*:defines` (all blocks, concatenated) and
    /// `<name>:defines` (one named block) conventions.
    fn auto_parts(&self) -> Vec<TemplatePart> {
        let mut parts = Vec::new();
        let mut all = PreprocessorDefines::new();
        for (_, defines) in &self.defines {
            for (k, v) in defines.entries() {
                all.insert(k, v);
            }
        }
        parts.push(TemplatePart::define("*:defines", all));
        for (name, defines) in &self.defines {
            parts.push(TemplatePart::define(format!("{name}:defines"), defines.clone()));
        }
        parts
    }

    /// Specify `stage`'s template with `parts` plus the auto-derived define
    /// parts, then emit its fully concatenated source.
    pub fn get_source(&self, stage: Stage, parts: Vec<TemplatePart>) -> Result<String> {
        let template = self
            .stages
            .get(&stage)
            .ok_or_else(|| Error::Template(format!("no template registered for stage {stage:?}")))?;
        let mut all_parts = self.auto_parts();
        all_parts.extend(parts);
        let specified = template.specify(all_parts);
        let sources = specified.sources()?;
        Ok(sources.into_iter().map(|(_, s)| s).collect::<Vec<_>>().join(""))
    }

    /// Per-part (name, source) pairs, used by diagnostics to rewrite a
    /// driver log's line numbers back to template-part-relative ones.
    pub fn get_named_sources(&self, stage: Stage, parts: Vec<TemplatePart>) -> Result<Vec<(String, String)>> {
        let template = self
            .stages
            .get(&stage)
            .ok_or_else(|| Error::Template(format!("no template registered for stage {stage:?}")))?;
        let mut all_parts = self.auto_parts();
        all_parts.extend(parts);
        template.specify(all_parts).sources()
    }

    /// Cache a compiled stage's composed source so future `compile` calls can
    /// reuse it without re-specifying the template. Any previous entry for
    /// `stage` is discarded.
    pub fn compile(&mut self, stage: Stage, source: String) {
        self.precompiled.insert(stage, source);
    }

    pub fn precompiled(&self, stage: Stage) -> Option<&str> {
        self.precompiled.get(&stage).map(String::as_str)
    }

    pub fn has_stage(&self, stage: Stage) -> bool {
        self.stages.contains_key(&stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emplace_rejects_duplicate_stage() {
        let mut program = ProgramTemplate::new();
        program.emplace(Stage::Fragment, ShaderTemplate::new()).unwrap();
        assert!(program.emplace(Stage::Fragment, ShaderTemplate::new()).is_err());
    }

    #[test]
    fn get_source_fills_named_and_wildcard_define_blocks() {
        let mut program = ProgramTemplate::new();
        let mut template = ShaderTemplate::new();
        template.add(TemplatePart::unspecified("glsl:defines")).unwrap();
        template.add(TemplatePart::unspecified("*:defines")).unwrap();
        program.emplace(Stage::Fragment, template).unwrap();

        let mut defines = PreprocessorDefines::new();
        defines.insert("LIBSHADERTOY", "1");
        program.define_block("glsl", defines);

        let source = program.get_source(Stage::Fragment, vec![]).unwrap();
        assert!(source.contains("LIBSHADERTOY 1"));
    }

    #[test]
    fn missing_stage_fails() {
        let program = ProgramTemplate::new();
        assert!(program.get_source(Stage::Compute, vec![]).is_err());
    }
}
