//! GPU context and the two display pass shapes demos composite with.

pub mod context;
pub mod points_pass;
pub mod screen_pass;

pub use context::GpuContext;
pub use points_pass::PointsPass;
pub use screen_pass::{DisplayUniforms, ScreenPass, FULLSCREEN_VS};
