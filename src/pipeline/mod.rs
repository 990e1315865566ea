//! The ping-pong simulation pipeline
//!
//! Every demo is the same machine with different content: state lives in a
//! pair of equally-shaped GPU buffers that swap read/write roles each step,
//! a step program rewrites every cell of the write buffer from the frozen
//! read buffer, a compositor chains the step with visualization passes, a
//! frame driver paces the whole thing against the wall clock, and a
//! parameter bus feeds externally adjusted values in at step boundaries.

pub mod compositor;
pub mod frame_driver;
pub mod gpu_step;
pub mod parameter_bus;
pub mod state_buffer;
pub mod step_program;

pub use compositor::{ComposeCtx, Compositor, PassDesc};
pub use frame_driver::{DriverState, FrameDriver, TickPlan};
pub use gpu_step::{GpuStepProgram, StepUniforms};
pub use parameter_bus::{ParamKind, ParamValue, ParameterBus};
pub use state_buffer::{BufferShape, GpuStatePair, StatePair};
pub use step_program::{step_grid, BoundaryPolicy, CellKernel, Grid};
