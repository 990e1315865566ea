//! The demo variants
//!
//! Each module pairs a CPU reference kernel (what the tests exercise) with
//! the WGSL step shader and the [`crate::demo::Demo`] wiring that runs it
//! through the ping-pong pipeline.

pub mod cloth;
pub mod fractal;
pub mod life;
pub mod particles;
pub mod traffic;

pub use cloth::ClothDemo;
pub use fractal::FractalDemo;
pub use life::LifeDemo;
pub use particles::ParticlesDemo;
pub use traffic::TrafficDemo;
