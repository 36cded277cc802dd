pub mod compute_buffer;
pub mod geometry;
pub mod program_buffer;

pub use compute_buffer::ComputeBuffer;
pub use geometry::{Geometry, ScreenQuad};
pub use program_buffer::{BufferOutput, ProgramBuffer};
