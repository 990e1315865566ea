//! Ripple
//!
//! A ping-pong buffered GPU simulation engine built on wgpu and winit.
//! Each demo owns a pair of state buffers that swap roles every sub-step,
//! a compute step program, and a validated chain of display passes; the
//! shell in [`app`] drives them all through the same frame sequence.

pub mod app;
pub mod demo;
pub mod demos;
pub mod error;
pub mod gfx;
pub mod performance;
pub mod pipeline;
pub mod ui;
pub mod wgpu_utils;

pub use app::RippleApp;
pub use demo::Demo;
pub use error::{Result, RippleError};

/// Builds the shell around a demo constructor.
pub fn launch<D, F>(title: &str, build: F) -> RippleApp
where
    D: Demo + 'static,
    F: FnOnce(&gfx::GpuContext) -> Result<D> + 'static,
{
    RippleApp::new(title, build)
}
