pub mod host;
pub mod input;
pub mod interface;
pub mod template;

pub use host::ProgramHost;
pub use input::{InputKind, ProgramInput};
pub use interface::{ProgramInterface, ResourceInfo, ResourceList, UniformValue};
pub use template::{ProgramTemplate, Stage};
