use std::fmt;

/// Errors surfaced by the pipeline core.
///
/// One flat enum in the style of [`crate`]'s smaller data-loading errors:
/// a `Display` impl, `std::error::Error`, and `From` conversions for the
/// handful of wrapped error sources.
#[derive(Debug)]
pub enum Error {
    /// A [`crate::template::ShaderTemplate`] operation would break the
    /// no-duplicate-names invariant, referenced a part that doesn't exist,
    /// or `sources()` was called while a part was still unspecified.
    Template(String),
    /// Shader compilation failed. `log` has already been rewritten to
    /// reference template part names and local line numbers where possible.
    ShaderCompilation { label: String, log: String },
    /// Program link (or pipeline creation) failed.
    ProgramLink { label: String, log: String },
    /// Program validation failed (e.g. missing required bind group entries).
    ProgramValidate { label: String, log: String },
    /// A GPU resource was used before allocation, or after it was dropped.
    NullResource(&'static str),
    /// A configuration value is out of range: zero size, an unknown clear
    /// bit, a blend function wgpu rejects, and similar caller mistakes.
    InvalidConfiguration(String),
    /// A channel input's backing file could not be found or decoded.
    FileNotFound(std::path::PathBuf),
    ImageDecode(image::ImageError),
    /// Passed through from the GX backend (wgpu) where it has no more
    /// specific mapping above.
    Backend(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Template(msg) => write!(f, "template error: {msg}"),
            Error::ShaderCompilation { label, log } => {
                write!(f, "shader compilation failed ({label}):\n{log}")
            }
            Error::ProgramLink { label, log } => {
                write!(f, "program link failed ({label}):\n{log}")
            }
            Error::ProgramValidate { label, log } => {
                write!(f, "program validation failed ({label}):\n{log}")
            }
            Error::NullResource(what) => write!(f, "used {what} before it was allocated"),
            Error::InvalidConfiguration(msg) => write!(f, "invalid configuration: {msg}"),
            Error::FileNotFound(path) => write!(f, "channel input file not found: {}", path.display()),
            Error::ImageDecode(e) => write!(f, "failed to decode channel input image: {e}"),
            Error::Backend(msg) => write!(f, "backend error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::ImageDecode(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
