pub mod defines;
pub mod diagnostics;
pub mod part;

pub use defines::PreprocessorDefines;
pub use part::TemplatePart;

use crate::error::{Error, Result};
use std::collections::VecDeque;

/// An ordered list of uniquely-named [`TemplatePart`]s that compose into one
/// shader stage's source.
#[derive(Clone, Default)]
pub struct ShaderTemplate {
    parts: VecDeque<TemplatePart>,
}

impl ShaderTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.parts.iter().position(|p| p.name() == name)
    }

    fn ensure_unique(&self, name: &str) -> Result<()> {
        if self.find_by_name(name).is_some() {
            return Err(Error::Template(format!(
                "a template part named {name} already exists"
            )));
        }
        Ok(())
    }

    /// Append `part` at the end. Fails, leaving `self` unchanged, if its
    /// name already exists.
    pub fn add(&mut self, part: TemplatePart) -> Result<()> {
        self.ensure_unique(part.name())?;
        self.parts.push_back(part);
        Ok(())
    }

    pub fn insert_before(&mut self, target: &str, part: TemplatePart) -> Result<()> {
        self.ensure_unique(part.name())?;
        let idx = self.find_by_name(target).ok_or_else(|| {
            Error::Template(format!("no template part named {target} to insert before"))
        })?;
        self.parts.insert(idx, part);
        Ok(())
    }

    pub fn insert_after(&mut self, target: &str, part: TemplatePart) -> Result<()> {
        self.ensure_unique(part.name())?;
        let idx = self.find_by_name(target).ok_or_else(|| {
            Error::Template(format!("no template part named {target} to insert after"))
        })?;
        self.parts.insert(idx + 1, part);
        Ok(())
    }

    /// Replace the part named `name` in place. Fails if no part has that name.
    pub fn replace(&mut self, name: &str, part: TemplatePart) -> Result<()> {
        let idx = self
            .find_by_name(name)
            .ok_or_else(|| Error::Template(format!("no template part named {name} to replace")))?;
        self.parts[idx] = part;
        Ok(())
    }

    pub fn erase_by_name(&mut self, name: &str) -> Result<()> {
        let idx = self
            .find_by_name(name)
            .ok_or_else(|| Error::Template(format!("no template part named {name} to erase")))?;
        self.parts.remove(idx);
        Ok(())
    }

    /// Returns a *new* template where every unspecified part whose name
    /// appears in `parts` is replaced by the matching argument part.
    /// Specified parts are preserved untouched; unspecified parts without a
    /// match remain unspecified. The fixed-convention names `*:<class>` and
    /// `<name>:defines` (§3) are resolved by
    /// [`ShaderTemplate::specify_with_conventions`]; plain `specify` only
    /// does literal name matching.
    pub fn specify(&self, parts: Vec<TemplatePart>) -> Self {
        let mut replacement: std::collections::HashMap<String, TemplatePart> = parts
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();
        let new_parts = self
            .parts
            .iter()
            .map(|existing| {
                if existing.is_specified() {
                    existing.clone()
                } else if let Some(found) = replacement.remove(existing.name()) {
                    found
                } else {
                    existing.clone()
                }
            })
            .collect();
        Self { parts: new_parts }
    }

    /// Concatenates every part's `sources()`. Fails if any part is still
    /// unspecified.
    pub fn sources(&self) -> Result<Vec<(String, String)>> {
        let mut all = Vec::new();
        for part in &self.parts {
            all.extend(part.sources()?);
        }
        Ok(all)
    }

    pub fn is_fully_specified(&self) -> bool {
        self.parts.iter().all(|p| p.is_specified())
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
