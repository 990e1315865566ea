//! Demo trait
//!
//! The contract between the windowing shell and an individual demo. A demo
//! owns its state pair, step program, compositor, parameter bus and frame
//! driver; the shell only orchestrates the per-frame sequence: tick the
//! driver, apply pending parameters, let the demo record its passes, then
//! overlay the UI.

use crate::error::Result;
use crate::gfx::GpuContext;
use crate::pipeline::{FrameDriver, ParameterBus, TickPlan};

pub trait Demo {
    fn name(&self) -> &str;

    /// Cadence control for this demo. Discrete demos run on a fixed
    /// interval, continuous ones step every frame.
    fn driver(&mut self) -> &mut FrameDriver;

    fn bus(&mut self) -> &mut ParameterBus;

    /// Called once per tick after the pending parameter snapshot was
    /// applied. React to `bus().changed(..)` / `fired(..)` here:
    /// reallocations, preset loads, driver cadence changes.
    fn apply_params(&mut self, gpu: &GpuContext) -> Result<()>;

    /// Upload this tick's uniforms and remember the plan; the step pass
    /// recorded in `composite` runs `plan.substeps` dispatches.
    fn prepare(&mut self, gpu: &GpuContext, plan: &TickPlan);

    /// Record the whole frame: step dispatches followed by display passes,
    /// in the demo's validated pass order.
    fn composite(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        surface: &wgpu::TextureView,
    ) -> Result<()>;

    fn build_ui(&mut self, ui: &imgui::Ui);

    /// Viewport changed. State buffers survive; only display uniforms and
    /// offscreen targets follow the new size.
    fn on_resize(&mut self, _gpu: &GpuContext, _width: u32, _height: u32) {}

    /// Cursor position in surface pixels.
    fn on_cursor(&mut self, _x: f32, _y: f32) {}

    /// Primary mouse button state change.
    fn on_mouse_button(&mut self, _pressed: bool) {}

    /// Vertical scroll, in lines.
    fn on_scroll(&mut self, _delta: f32) {}
}
