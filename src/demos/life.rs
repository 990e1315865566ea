//! Conway's Game of Life
//!
//! One f32 per cell, survive on 2-3 neighbours, birth on 3. The GPU step
//! wraps at the grid edges; the CPU reference kernel reads out-of-range
//! neighbours as dead, which keeps the small preset tests on an open plane.

use std::time::Duration;

use rand::Rng;

use crate::demo::Demo;
use crate::error::Result;
use crate::gfx::{DisplayUniforms, GpuContext, ScreenPass, FULLSCREEN_VS};
use crate::pipeline::{
    BufferShape, CellKernel, ComposeCtx, Compositor, FrameDriver, GpuStatePair, GpuStepProgram,
    Grid, ParameterBus, PassDesc, StepUniforms, TickPlan,
};
use crate::ui;

pub const GLIDER: &[u8] = &[
    0, 0, 1, //
    1, 0, 1, //
    0, 1, 1, //
];

#[rustfmt::skip]
pub const SPACESHIP: &[u8] = &[
    0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,
    0,0,0,0,0,0,0,0,0,0,0,0,0,1,1,1,1,1,
    0,0,0,1,1,0,0,0,0,0,0,0,1,0,0,0,0,1,
    1,1,1,0,1,1,0,0,0,0,0,0,0,0,0,0,0,1,
    1,1,1,1,0,1,1,0,0,0,0,0,0,0,0,0,1,0,
    0,1,1,0,0,1,1,0,1,1,0,0,0,1,1,0,0,0,
    0,0,0,0,1,0,0,1,0,0,0,0,1,0,0,0,0,0,
    0,0,0,0,0,1,0,1,0,1,0,1,0,0,0,0,0,0,
    0,0,0,0,0,0,0,0,0,0,1,0,0,0,0,0,0,0,
    0,0,0,0,0,0,0,0,0,0,1,0,0,0,0,0,0,0,
    0,0,0,0,0,1,0,1,0,1,0,1,0,0,0,0,0,0,
    0,0,0,0,1,0,0,1,0,0,0,0,1,0,0,0,0,0,
    0,1,1,0,0,1,1,0,1,1,0,0,0,1,1,0,0,0,
    1,1,1,1,0,1,1,0,0,0,0,0,0,0,0,0,1,0,
    1,1,1,0,1,1,0,0,0,0,0,0,0,0,0,0,0,1,
    0,0,0,1,1,0,0,0,0,0,0,0,1,0,0,0,0,1,
    0,0,0,0,0,0,0,0,0,0,0,0,0,1,1,1,1,1,
    0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,
];

const RANDOM_FILL: f64 = 0.1;
// #50cdb1
const DEFAULT_COLOR: [f32; 3] = [0.3137, 0.8039, 0.6941];
const FAST_FORWARD_GENERATIONS: u32 = 50;
const UPDATE_SPEEDS_HZ: [f64; 5] = [1.0, 2.0, 5.0, 10.0, 20.0];

/// CPU reference rule. Out-of-range neighbours count as dead.
pub struct LifeRule;

impl CellKernel for LifeRule {
    type Cell = u8;

    fn next_cell(&self, x: u32, y: u32, current: &Grid<u8>, _dt: f32) -> u8 {
        let alive = current.get(x, y) > 0;
        let mut neighbours = 0u32;
        for j in -1i64..=1 {
            for i in -1i64..=1 {
                if i == 0 && j == 0 {
                    continue;
                }
                neighbours += current.sample_or(x as i64 + i, y as i64 + j, 0) as u32;
            }
        }
        u8::from(alive && (2..=3).contains(&neighbours) || !alive && neighbours == 3)
    }
}

/// Initial condition: either a preset table embedded near the lower-left
/// corner (at least 4 cells in, centered when it fits), or a 10% random
/// fill.
pub fn seed_grid(n: u32, preset: Option<&[u8]>, rng: &mut impl Rng) -> Grid<u8> {
    let mut grid = Grid::filled(n, n, 0u8);
    match preset {
        Some(table) => {
            let width = (table.len() as f64).sqrt() as u32;
            let offset = 4.max(n.saturating_sub(width) / 2);
            for (i, &cell) in table.iter().enumerate() {
                let x = i as u32 % width + offset;
                let y = i as u32 / width + offset;
                if x < n && y < n {
                    grid.set(x, y, cell);
                }
            }
        }
        None => {
            for cell in grid.cells_mut() {
                *cell = u8::from(rng.random_bool(RANDOM_FILL));
            }
        }
    }
    grid
}

const STEP_SHADER: &str = r#"
struct StepUniforms {
    delta: f32,
    time: f32,
    width: u32,
    height: u32,
    cursor: vec2<f32>,
    viewport: vec2<f32>,
    knobs: array<vec4<f32>, 2>,
};

@group(0) @binding(0) var<storage, read> current: array<f32>;
@group(0) @binding(1) var<storage, read_write> next: array<f32>;
@group(1) @binding(0) var<uniform> params: StepUniforms;

fn cell_at(x: i32, y: i32) -> u32 {
    let w = i32(params.width);
    let h = i32(params.height);
    let xi = (x + w) % w;
    let yi = (y + h) % h;
    return u32(current[u32(yi * w + xi)] > 0.5);
}

@compute @workgroup_size(8, 8)
fn step(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= params.width || id.y >= params.height) {
        return;
    }
    let x = i32(id.x);
    let y = i32(id.y);

    let alive = cell_at(x, y) == 1u;
    var neighbours = 0u;
    for (var j = -1; j <= 1; j++) {
        for (var i = -1; i <= 1; i++) {
            if (i == 0 && j == 0) {
                continue;
            }
            neighbours += cell_at(x + i, y + j);
        }
    }

    let next_alive = (alive && neighbours >= 2u && neighbours <= 3u) || (!alive && neighbours == 3u);
    next[id.y * params.width + id.x] = f32(next_alive);
}
"#;

const DISPLAY_FS: &str = r#"
struct DisplayUniforms {
    viewport: vec2<f32>,
    grid: vec2<f32>,
    color_a: vec4<f32>,
    color_b: vec4<f32>,
    color_c: vec4<f32>,
    knobs: array<vec4<f32>, 2>,
};

@group(0) @binding(0) var<uniform> display: DisplayUniforms;
@group(0) @binding(1) var<storage, read> grid_state: array<f32>;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let gw = u32(display.grid.x);
    let cx = min(u32(in.uv.x * display.grid.x), gw - 1u);
    let cy = min(u32((1.0 - in.uv.y) * display.grid.y), u32(display.grid.y) - 1u);
    let state = grid_state[cy * gw + cx];
    return vec4<f32>(state * display.color_a.rgb, 1.0);
}
"#;

struct LifeResources {
    pair: GpuStatePair,
    step: GpuStepProgram,
    display: ScreenPass,
    /// Generations the step pass runs this frame. Zero on frames where the
    /// fixed-interval driver did not fire.
    generations: u32,
}

pub struct LifeDemo {
    driver: FrameDriver,
    bus: ParameterBus,
    resources: LifeResources,
    compositor: Compositor<LifeResources>,
    color: [f32; 3],
}

impl LifeDemo {
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        let mut bus = ParameterBus::new();
        // 2^12 single-channel is the largest grid the storage-binding limit
        // allows; see `state_buffer::MAX_BINDING_BYTES`.
        bus.register_number("grid_size", "Grid size (2^n)", 8.0, 5.0, 12.0, 1.0);
        bus.register_choice("preset", "Preset", 0, &["Random", "Glider", "Spaceship"]);
        bus.register_choice(
            "speed",
            "Update speed",
            5,
            &["1 Hz", "2 Hz", "5 Hz", "10 Hz", "20 Hz", "Framerate"],
        );
        bus.register_color("color", "Color", DEFAULT_COLOR);
        bus.register_action("fast_forward", "Skip 50 generations");
        bus.register_action("restart", "Restart");
        bus.apply_pending();

        let driver = FrameDriver::new(Duration::from_millis(200));

        let resources = Self::build_resources(gpu, 256, None)?;

        let mut compositor = Compositor::new(&["grid_state"]);
        compositor.add_pass(
            PassDesc::new("step", &["grid_state"], &["grid_state_next"]),
            |res: &mut LifeResources, encoder, _ctx| {
                let shape = res.pair.shape();
                for _ in 0..res.generations {
                    res.pair.swap();
                    res.step.dispatch(encoder, res.pair.step_bind_group(), &[], shape);
                }
                res.generations = 0;
            },
        );
        compositor.add_pass(
            PassDesc::new("display", &["grid_state_next"], &["screen"]),
            |res: &mut LifeResources, encoder, ctx| {
                res.display.draw(
                    encoder,
                    ctx.surface,
                    wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    !res.pair.a_is_current(),
                );
            },
        );
        compositor.validate()?;

        Ok(Self {
            driver,
            bus,
            resources,
            compositor,
            color: DEFAULT_COLOR,
        })
    }

    fn build_resources(gpu: &GpuContext, n: u32, preset: Option<&[u8]>) -> Result<LifeResources> {
        let shape = BufferShape::new(n, n, 1)?;
        let pair = GpuStatePair::new(gpu.device(), shape, "life");
        let step = GpuStepProgram::new(gpu.device(), STEP_SHADER, "step", pair.layout(), &[], "life");
        let display = ScreenPass::new(
            gpu.device(),
            &format!("{FULLSCREEN_VS}\n{DISPLAY_FS}"),
            gpu.surface_format(),
            Some((pair.current(), pair.next())),
            "life display",
        );

        let seed = seed_grid(n, preset, &mut rand::rng());
        let data: Vec<f32> = seed.cells().iter().map(|&c| c as f32).collect();
        pair.seed(gpu.queue(), &data);

        Ok(LifeResources {
            pair,
            step,
            display,
            generations: 0,
        })
    }

    fn restart(&mut self, gpu: &GpuContext) -> Result<()> {
        let n = 1u32 << self.bus.number("grid_size")? as u32;
        let preset = match self.bus.choice("preset")? {
            1 => Some(GLIDER),
            2 => Some(SPACESHIP),
            _ => None,
        };
        self.resources = Self::build_resources(gpu, n, preset)?;
        Ok(())
    }
}

impl Demo for LifeDemo {
    fn name(&self) -> &str {
        "Game of Life"
    }

    fn driver(&mut self) -> &mut FrameDriver {
        &mut self.driver
    }

    fn bus(&mut self) -> &mut ParameterBus {
        &mut self.bus
    }

    fn apply_params(&mut self, gpu: &GpuContext) -> Result<()> {
        if self.bus.changed("speed") {
            let interval = match self.bus.choice("speed")? {
                i if i < UPDATE_SPEEDS_HZ.len() => {
                    Some(Duration::from_secs_f64(1.0 / UPDATE_SPEEDS_HZ[i]))
                }
                _ => None,
            };
            self.driver.set_interval(interval);
            // changing speed resumes a paused board, as the original did
            self.driver.start();
        }
        if self.bus.changed("color") {
            self.color = self.bus.color("color")?;
        }
        if self.bus.fired("fast_forward") {
            self.resources.generations += FAST_FORWARD_GENERATIONS;
        }
        if self.bus.changed("grid_size") || self.bus.changed("preset") || self.bus.fired("restart")
        {
            self.restart(gpu)?;
        }
        Ok(())
    }

    fn prepare(&mut self, gpu: &GpuContext, plan: &TickPlan) {
        self.resources.generations += plan.substeps;

        let shape = self.resources.pair.shape();
        let (w, h) = gpu.surface_size();
        self.resources.step.write_uniforms(
            gpu.queue(),
            StepUniforms {
                delta: plan.substep_delta,
                time: self.driver.sim_time(),
                width: shape.width,
                height: shape.height,
                viewport: [w as f32, h as f32],
                ..Default::default()
            },
        );
        self.resources.display.write_uniforms(
            gpu.queue(),
            DisplayUniforms {
                viewport: [w as f32, h as f32],
                grid: [shape.width as f32, shape.height as f32],
                color_a: [self.color[0], self.color[1], self.color[2], 1.0],
                ..Default::default()
            },
        );
    }

    fn composite(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        surface: &wgpu::TextureView,
    ) -> Result<()> {
        let ctx = ComposeCtx {
            surface,
            a_is_current: self.resources.pair.a_is_current(),
            viewport: gpu.surface_size(),
        };
        self.compositor.run(&mut self.resources, encoder, &ctx);
        Ok(())
    }

    fn build_ui(&mut self, ui: &imgui::Ui) {
        ui::settings_panel(ui, "Game of Life", &mut self.bus);
        ui::transport_panel(ui, "Playback", &mut self.driver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::step_grid;
    use rand::SeedableRng;

    fn advance(grid: Grid<u8>, steps: u32) -> Grid<u8> {
        let mut current = grid;
        let mut next = Grid::filled(current.width(), current.height(), 0u8);
        for _ in 0..steps {
            step_grid(&LifeRule, &current, &mut next, 0.0);
            std::mem::swap(&mut current, &mut next);
        }
        current
    }

    fn live_cells(grid: &Grid<u8>) -> u32 {
        grid.cells().iter().map(|&c| c as u32).sum()
    }

    fn centroid(grid: &Grid<u8>) -> (f64, f64) {
        let mut sum = (0.0, 0.0);
        let mut count = 0.0;
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                if grid.get(x, y) > 0 {
                    sum.0 += x as f64;
                    sum.1 += y as f64;
                    count += 1.0;
                }
            }
        }
        (sum.0 / count, sum.1 / count)
    }

    #[test]
    fn glider_keeps_five_cells_after_one_step() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let grid = seed_grid(32, Some(GLIDER), &mut rng);
        assert_eq!(live_cells(&grid), 5);

        let stepped = advance(grid, 1);
        assert_eq!(live_cells(&stepped), 5);
    }

    #[test]
    fn glider_centroid_shifts_diagonally_over_four_steps() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let grid = seed_grid(32, Some(GLIDER), &mut rng);
        let before = centroid(&grid);

        let after = centroid(&advance(grid, 4));
        let dx = after.0 - before.0;
        let dy = after.1 - before.1;
        assert!((dx.abs() - 1.0).abs() < 1e-9, "dx = {dx}");
        assert!((dy.abs() - 1.0).abs() < 1e-9, "dy = {dy}");
    }

    #[test]
    fn block_is_a_still_life() {
        let mut grid = Grid::filled(8, 8, 0u8);
        for (x, y) in [(3, 3), (4, 3), (3, 4), (4, 4)] {
            grid.set(x, y, 1);
        }
        let stepped = advance(grid.clone(), 3);
        assert_eq!(stepped.cells(), grid.cells());
    }

    #[test]
    fn random_seed_fills_about_ten_percent() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let grid = seed_grid(256, None, &mut rng);
        let live = live_cells(&grid) as f64 / (256.0 * 256.0);
        assert!(live > 0.07 && live < 0.13, "fill ratio {live}");
    }

    #[test]
    fn preset_lands_at_least_four_cells_from_the_edge() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let grid = seed_grid(32, Some(GLIDER), &mut rng);
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                if grid.get(x, y) > 0 {
                    assert!(x >= 4 && y >= 4);
                }
            }
        }
    }
}
