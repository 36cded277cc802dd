use std::cell::RefCell;

/// An insertion-ordered set of preprocessor `#define` entries, rendered as
/// `#define KEY VALUE\n` lines (the space and value are omitted when the
/// value is empty). The rendered string is memoized and invalidated on any
/// mutation.
#[derive(Debug, Clone, Default)]
pub struct PreprocessorDefines {
    entries: Vec<(String, String)>,
    cached: RefCell<Option<String>>,
}

impl PreprocessorDefines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, overwriting any existing entry for `key` in
    /// place (preserving its original insertion position) or appending a new
    /// one. Invalidates the memoized render.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
        *self.cached.get_mut() = None;
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
        *self.cached.get_mut() = None;
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn render(&self) -> String {
        if let Some(cached) = self.cached.borrow().as_ref() {
            return cached.clone();
        }
        let mut out = String::new();
        for (key, value) in &self.entries {
            if value.is_empty() {
                out.push_str(&format!("#define {key}\n"));
            } else {
                out.push_str(&format!("#define {key} {value}\n"));
            }
        }
        *self.cached.borrow_mut() = Some(out.clone());
        out
    }
}
