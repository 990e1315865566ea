//! WGPU utility wrappers
//!
//! Small helpers shared by the pipeline and the visualization passes.

pub mod binding_types;
pub mod uniform_buffer;

pub use binding_types::entry;
pub use uniform_buffer::UniformBuffer;
