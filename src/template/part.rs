use crate::error::{Error, Result};
use crate::program::input::ProgramInput;
use crate::template::defines::PreprocessorDefines;
use std::path::PathBuf;
use std::rc::Rc;
use std::cell::RefCell;

/// One named, possibly-unspecified fragment of shader source.
#[derive(Clone)]
pub enum TemplatePart {
    /// A placeholder: declared by name but with no source yet. Filled in by
    /// [`crate::template::ShaderTemplate::specify`].
    Unspecified { name: String },
    /// An explicit, already-known source string.
    String { name: String, source: String },
    /// Source read from a path when `sources()` is called.
    File { name: String, path: PathBuf },
    /// A `#define` block, rendered from an insertion-ordered key/value map.
    Define { name: String, defines: PreprocessorDefines },
    /// Generated `var`/binding declarations, one per [`ProgramInput`] in a
    /// shared, externally-owned list — shared because the same input list
    /// backs both this part and the host's per-frame binding logic.
    Input {
        name: String,
        inputs: Rc<RefCell<Vec<ProgramInput>>>,
        group: u32,
        first_binding: u32,
    },
}

impl TemplatePart {
    pub fn name(&self) -> &str {
        match self {
            TemplatePart::Unspecified { name }
            | TemplatePart::String { name, .. }
            | TemplatePart::File { name, .. }
            | TemplatePart::Define { name, .. }
            | TemplatePart::Input { name, .. } => name,
        }
    }

    pub fn is_specified(&self) -> bool {
        !matches!(self, TemplatePart::Unspecified { .. })
    }

    pub fn string(name: impl Into<String>, source: impl Into<String>) -> Self {
        TemplatePart::String {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        TemplatePart::File {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn define(name: impl Into<String>, defines: PreprocessorDefines) -> Self {
        TemplatePart::Define {
            name: name.into(),
            defines,
        }
    }

    pub fn input(
        name: impl Into<String>,
        inputs: Rc<RefCell<Vec<ProgramInput>>>,
        group: u32,
        first_binding: u32,
    ) -> Self {
        TemplatePart::Input {
            name: name.into(),
            inputs,
            group,
            first_binding,
        }
    }

    pub fn unspecified(name: impl Into<String>) -> Self {
        TemplatePart::Unspecified { name: name.into() }
    }

    /// This part's contribution to the composed source, as (sub-name,
    /// source) pairs so that multiple logical fragments (e.g. one `#define`
    /// line per input) can still be addressed individually by line-rewriting
    /// diagnostics. Fails on an unspecified part or an unreadable file.
    pub fn sources(&self) -> Result<Vec<(String, String)>> {
        match self {
            TemplatePart::Unspecified { name } => Err(Error::Template(format!(
                "template part {name} is not specified"
            ))),
            TemplatePart::String { name, source } => Ok(vec![(name.clone(), ensure_trailing_newline(source))]),
            TemplatePart::File { name, path } => {
                let source = std::fs::read_to_string(path).map_err(|e| {
                    Error::Template(format!(
                        "template part {name}: failed to read {}: {e}",
                        path.display()
                    ))
                })?;
                Ok(vec![(name.clone(), ensure_trailing_newline(&source))])
            }
            TemplatePart::Define { name, defines } => {
                Ok(vec![(name.clone(), defines.render())])
            }
            TemplatePart::Input {
                name,
                inputs,
                group,
                first_binding,
            } => {
                let inputs = inputs.borrow();
                let mut source = String::new();
                for (i, input) in inputs.iter().enumerate() {
                    let fallback = format!("iChannel{i}");
                    let texture_binding = first_binding + i as u32 * 2;
                    let sampler_binding = texture_binding + 1;
                    source.push_str(&input.definition_string(&fallback, *group, texture_binding, sampler_binding));
                    source.push('\n');
                }
                Ok(vec![(name.clone(), source)])
            }
        }
    }
}

fn ensure_trailing_newline(s: &str) -> String {
    if s.ends_with('\n') {
        s.to_string()
    } else {
        format!("{s}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_part_fails_sources() {
        let part = TemplatePart::unspecified("buffer:sources");
        let err = part.sources().unwrap_err();
        assert!(matches!(err, Error::Template(msg) if msg.contains("buffer:sources")));
    }

    #[test]
    fn string_part_gets_trailing_newline() {
        let part = TemplatePart::string("header", "void main() {}");
        let sources = part.sources().unwrap();
        assert_eq!(sources[0].1, "void main() {}\n");
    }

    #[test]
    fn string_part_keeps_existing_trailing_newline() {
        let part = TemplatePart::string("header", "a\nb\n");
        let sources = part.sources().unwrap();
        assert_eq!(sources[0].1, "a\nb\n");
    }
}
