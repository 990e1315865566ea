//! Spring-grid cloth
//!
//! A W×H grid of nodes hung from its two top corners. Each node is
//! connected to its eight neighbours by springs (rest length ×√2 on the
//! diagonals), pulled by gravity and a fluctuating wind, and integrated
//! semi-implicitly with exponential damping so a zero-delta substep leaves
//! the sheet untouched. Positions and velocities live in two ping-pong
//! pairs swapped in lockstep, the velocity pair bound as an extra group of
//! the step program.

use std::time::Duration;

use rand::Rng;

use crate::demo::Demo;
use crate::error::Result;
use crate::gfx::{DisplayUniforms, GpuContext, PointsPass};
use crate::pipeline::{
    BufferShape, ComposeCtx, Compositor, FrameDriver, GpuStatePair, GpuStepProgram, Grid,
    ParameterBus, PassDesc, StepUniforms, TickPlan,
};
use crate::ui;

pub const CLOTH_WIDTH: u32 = 20;
pub const CLOTH_HEIGHT: u32 = 20;
pub const SPRING_STIFFNESS: f32 = 2000.0;
/// Original per-frame damping of 0.15 at 60 fps, as a continuous rate.
pub const DAMPING_RATE: f32 = 9.0;
const MAX_DELTA: Duration = Duration::from_millis(60);
const WIND_DIR: [f32; 3] = [0.3, 0.1, 1.0];

#[derive(Debug, Clone)]
pub struct ClothParams {
    pub gravity: [f32; 3],
    pub wind_strength: f32,
    pub wind_fluctuation: bool,
    pub damping_rate: f32,
}

impl Default for ClothParams {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.8, 0.0],
            wind_strength: 1.5,
            wind_fluctuation: true,
            damping_rate: DAMPING_RATE,
        }
    }
}

fn pinned(x: u32, y: u32, width: u32, height: u32) -> bool {
    y == height - 1 && (x == 0 || x == width - 1)
}

pub fn wind_factor(time: f32) -> f32 {
    (0.5 * (0.3 * time + 0.2).sin() + time.sin() + 0.3 * (3.0 * time + 2.0).sin()).clamp(0.0, 1.0)
}

/// Net force on one node: springs to the in-range neighbours, gravity, and
/// wind scaled by an area approximation from the neighbour distances.
pub fn node_force(
    pos: &Grid<[f32; 3]>,
    x: u32,
    y: u32,
    params: &ClothParams,
    time: f32,
) -> [f32; 3] {
    let (w, h) = (pos.width(), pos.height());
    let rest = 2.0 / h as f32;
    let p = pos.get(x, y);

    let mut force = params.gravity;
    let mut area_approx = 0.0f32;

    for j in -1i64..=1 {
        for i in -1i64..=1 {
            if i == 0 && j == 0 {
                continue;
            }
            let nx = x as i64 + i;
            let ny = y as i64 + j;
            if nx < 0 || nx >= w as i64 || ny < 0 || ny >= h as i64 {
                continue;
            }
            let q = pos.get(nx as u32, ny as u32);
            let d = [q[0] - p[0], q[1] - p[1], q[2] - p[2]];
            let r = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
            if r < 1e-9 {
                continue;
            }
            let rest_here = if i != 0 && j != 0 {
                rest * std::f32::consts::SQRT_2
            } else {
                rest
            };
            let s = SPRING_STIFFNESS * (r - rest_here) / r;
            force[0] += s * d[0];
            force[1] += s * d[1];
            force[2] += s * d[2];
            area_approx += r;
        }
    }

    area_approx /= 8.0;
    area_approx = area_approx * area_approx * std::f32::consts::PI;
    let wt = if params.wind_fluctuation {
        wind_factor(time)
    } else {
        1.0
    };
    let wind = area_approx / (rest * rest) * params.wind_strength * wt;
    let wlen = (WIND_DIR[0] * WIND_DIR[0] + WIND_DIR[1] * WIND_DIR[1] + WIND_DIR[2] * WIND_DIR[2])
        .sqrt();
    force[0] += wind * WIND_DIR[0] / wlen;
    force[1] += wind * WIND_DIR[1] / wlen;
    force[2] += wind * WIND_DIR[2] / wlen;
    force
}

/// CPU reference substep over the whole sheet.
pub fn step_cloth(
    pos: &Grid<[f32; 3]>,
    vel: &Grid<[f32; 3]>,
    next_pos: &mut Grid<[f32; 3]>,
    next_vel: &mut Grid<[f32; 3]>,
    params: &ClothParams,
    time: f32,
    dt: f32,
) {
    let (w, h) = (pos.width(), pos.height());
    let damp = (-params.damping_rate * dt).exp();
    for y in 0..h {
        for x in 0..w {
            let p = pos.get(x, y);
            let v = vel.get(x, y);
            if pinned(x, y, w, h) {
                next_pos.set(x, y, p);
                next_vel.set(x, y, v);
                continue;
            }
            let a = node_force(pos, x, y, params, time);
            let v1 = [
                (v[0] + dt * a[0]) * damp,
                (v[1] + dt * a[1]) * damp,
                (v[2] + dt * a[2]) * damp,
            ];
            next_pos.set(x, y, [p[0] + dt * v1[0], p[1] + dt * v1[1], p[2] + dt * v1[2]]);
            next_vel.set(x, y, v1);
        }
    }
}

/// Flat sheet spanning [-1,1]² with a little random z jitter.
pub fn seed_cloth(width: u32, height: u32, rng: &mut impl Rng) -> Grid<[f32; 3]> {
    Grid::from_fn(width, height, |x, y| {
        [
            2.0 * x as f32 / width as f32 - 1.0,
            2.0 * y as f32 / height as f32 - 1.0,
            0.1 * rng.random_range(0.0..1.0f32) - 0.05,
        ]
    })
}

// knobs[0]: x = wind strength, y = fluctuation flag, z = damping rate
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

@group(0) @binding(0) var<storage, read> pos_in: array<vec4<f32>>;
@group(0) @binding(1) var<storage, read_write> pos_out: array<vec4<f32>>;
@group(1) @binding(0) var<uniform> params: StepUniforms;
@group(2) @binding(0) var<storage, read> vel_in: array<vec4<f32>>;
@group(2) @binding(1) var<storage, read_write> vel_out: array<vec4<f32>>;

const SQRT_2: f32 = 1.4142135623730951;
const PI: f32 = 3.14159265359;

fn wind_factor(t: f32) -> f32 {
    return clamp(0.5 * sin(0.3 * t + 0.2) + sin(t) + 0.3 * sin(3.0 * t + 2.0), 0.0, 1.0);
}

@compute @workgroup_size(8, 8)
fn step(@builtin(global_invocation_id) id: vec3<u32>) {
    let w = params.width;
    let h = params.height;
    if (id.x >= w || id.y >= h) {
        return;
    }
    let index = id.y * w + id.x;
    let p = pos_in[index].xyz;
    let v = vel_in[index].xyz;

    // hang from the two top corners
    if (id.y == h - 1u && (id.x == 0u || id.x == w - 1u)) {
        pos_out[index] = vec4<f32>(p, 0.0);
        vel_out[index] = vec4<f32>(v, 0.0);
        return;
    }

    let rest = 2.0 / f32(h);
    let stiffness = 2000.0;
    var force = vec3<f32>(0.0, -9.8, 0.0);
    var area_approx = 0.0;

    for (var j = -1; j <= 1; j++) {
        for (var i = -1; i <= 1; i++) {
            if (i == 0 && j == 0) {
                continue;
            }
            let nx = i32(id.x) + i;
            let ny = i32(id.y) + j;
            if (nx < 0 || nx >= i32(w) || ny < 0 || ny >= i32(h)) {
                continue;
            }
            let q = pos_in[u32(ny) * w + u32(nx)].xyz;
            let d = q - p;
            let r = length(d);
            if (r < 1e-9) {
                continue;
            }
            var rest_here = rest;
            if (i != 0 && j != 0) {
                rest_here *= SQRT_2;
            }
            force += stiffness * (r - rest_here) / r * d;
            area_approx += r;
        }
    }

    area_approx /= 8.0;
    area_approx = area_approx * area_approx * PI;
    var wt = 1.0;
    if (params.knobs[0].y > 0.5) {
        wt = wind_factor(params.time);
    }
    force += area_approx / (rest * rest) * params.knobs[0].x * wt
        * normalize(vec3<f32>(0.3, 0.1, 1.0));

    let d = params.delta;
    let damp = exp(-params.knobs[0].z * d);
    let v1 = (v + d * force) * damp;
    pos_out[index] = vec4<f32>(p + d * v1, 0.0);
    vel_out[index] = vec4<f32>(v1, 0.0);
}
"#;

// grid = cloth dimensions; color_a = cloth color
const POINTS_SHADER: &str = r#"
struct DisplayUniforms {
    viewport: vec2<f32>,
    grid: vec2<f32>,
    color_a: vec4<f32>,
    color_b: vec4<f32>,
    color_c: vec4<f32>,
    knobs: array<vec4<f32>, 2>,
};

@group(0) @binding(0) var<uniform> display: DisplayUniforms;
@group(0) @binding(1) var<storage, read> positions: array<vec4<f32>>;

struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) depth: f32,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VsOut {
    var out: VsOut;
    let p = positions[index].xyz;

    var xy = 0.6 * p.xy / (1.0 + 0.15 * p.z);
    let aspect = display.viewport.x / display.viewport.y;
    if (aspect < 1.0) {
        xy.x /= aspect;
    } else {
        xy.y *= aspect;
    }

    out.position = vec4<f32>(xy, 0.0, 1.0);
    out.depth = p.z;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let shade = clamp(0.7 + in.depth, 0.3, 1.0);
    return vec4<f32>(shade * display.color_a.rgb, 1.0);
}
"#;

struct ClothResources {
    positions: GpuStatePair,
    velocities: GpuStatePair,
    step: GpuStepProgram,
    display: PointsPass,
    substeps: u32,
}

pub struct ClothDemo {
    driver: FrameDriver,
    bus: ParameterBus,
    resources: ClothResources,
    compositor: Compositor<ClothResources>,
}

impl ClothDemo {
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        let mut bus = ParameterBus::new();
        bus.register_number("wind", "Wind", 1.5, -5.0, 5.0, 0.1);
        bus.register_boolean("wind_fluctuation", "Wind fluctuation", true);
        bus.register_number("substeps", "Simulation steps", 20.0, 5.0, 100.0, 1.0);
        bus.register_color("color", "Color", [0.8196, 0.7098, 0.4078]);
        bus.register_action("restart", "Restart");
        bus.apply_pending();

        let driver = FrameDriver::new(MAX_DELTA).with_substeps(20);
        let resources = Self::build_resources(gpu)?;

        let mut compositor = Compositor::new(&["cloth_positions", "cloth_velocities"]);
        compositor.add_pass(
            PassDesc::new(
                "step",
                &["cloth_positions", "cloth_velocities"],
                &["cloth_positions_next", "cloth_velocities_next"],
            ),
            |res: &mut ClothResources, encoder, _ctx| {
                let shape = res.positions.shape();
                for _ in 0..res.substeps {
                    res.positions.swap();
                    res.velocities.swap();
                    res.step.dispatch(
                        encoder,
                        res.positions.step_bind_group(),
                        &[res.velocities.step_bind_group()],
                        shape,
                    );
                }
                res.substeps = 0;
            },
        );
        compositor.add_pass(
            PassDesc::new("display", &["cloth_positions_next"], &["screen"]),
            |res: &mut ClothResources, encoder, ctx| {
                let count = res.positions.shape().cell_count() as u32;
                res.display.draw(
                    encoder,
                    ctx.surface,
                    wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    !res.positions.a_is_current(),
                    count,
                );
            },
        );
        compositor.validate()?;

        Ok(Self {
            driver,
            bus,
            resources,
            compositor,
        })
    }

    fn build_resources(gpu: &GpuContext) -> Result<ClothResources> {
        let shape = BufferShape::new(CLOTH_WIDTH, CLOTH_HEIGHT, 4)?;
        let positions = GpuStatePair::new(gpu.device(), shape, "cloth positions");
        let velocities = GpuStatePair::new(gpu.device(), shape, "cloth velocities");
        let step = GpuStepProgram::new(
            gpu.device(),
            STEP_SHADER,
            "step",
            positions.layout(),
            &[velocities.layout()],
            "cloth",
        );
        let display = PointsPass::new(
            gpu.device(),
            POINTS_SHADER,
            gpu.surface_format(),
            (positions.current(), positions.next()),
            "cloth display",
        );

        let sheet = seed_cloth(CLOTH_WIDTH, CLOTH_HEIGHT, &mut rand::rng());
        let mut pos_data = vec![0.0f32; shape.float_len()];
        for (i, p) in sheet.cells().iter().enumerate() {
            pos_data[i * 4..i * 4 + 3].copy_from_slice(p);
        }
        positions.seed(gpu.queue(), &pos_data);
        velocities.seed(gpu.queue(), &vec![0.0f32; shape.float_len()]);

        Ok(ClothResources {
            positions,
            velocities,
            step,
            display,
            substeps: 0,
        })
    }
}

impl Demo for ClothDemo {
    fn name(&self) -> &str {
        "Cloth"
    }

    fn driver(&mut self) -> &mut FrameDriver {
        &mut self.driver
    }

    fn bus(&mut self) -> &mut ParameterBus {
        &mut self.bus
    }

    fn apply_params(&mut self, gpu: &GpuContext) -> Result<()> {
        if self.bus.changed("substeps") {
            self.driver.set_substeps(self.bus.number("substeps")? as u32);
        }
        if self.bus.fired("restart") {
            self.resources = Self::build_resources(gpu)?;
        }
        Ok(())
    }

    fn prepare(&mut self, gpu: &GpuContext, plan: &TickPlan) {
        self.resources.substeps += plan.substeps;

        let shape = self.resources.positions.shape();
        let (w, h) = gpu.surface_size();
        let wind = self.bus.number("wind").unwrap_or(1.5) as f32;
        let fluctuation = self.bus.boolean("wind_fluctuation").unwrap_or(true);

        self.resources.step.write_uniforms(
            gpu.queue(),
            StepUniforms {
                delta: plan.substep_delta,
                time: self.driver.sim_time(),
                width: shape.width,
                height: shape.height,
                viewport: [w as f32, h as f32],
                knobs: [
                    wind,
                    if fluctuation { 1.0 } else { 0.0 },
                    DAMPING_RATE,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                ],
                ..Default::default()
            },
        );

        let color = self.bus.color("color").unwrap_or([0.8196, 0.7098, 0.4078]);
        self.resources.display.write_uniforms(
            gpu.queue(),
            DisplayUniforms {
                viewport: [w as f32, h as f32],
                grid: [shape.width as f32, shape.height as f32],
                color_a: [color[0], color[1], color[2], 1.0],
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
            a_is_current: self.resources.positions.a_is_current(),
            viewport: gpu.surface_size(),
        };
        self.compositor.run(&mut self.resources, encoder, &ctx);
        Ok(())
    }

    fn build_ui(&mut self, ui: &imgui::Ui) {
        ui::settings_panel(ui, "Cloth", &mut self.bus);
        ui::transport_panel(ui, "Playback", &mut self.driver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn flat_sheet() -> (Grid<[f32; 3]>, Grid<[f32; 3]>) {
        let pos = Grid::from_fn(CLOTH_WIDTH, CLOTH_HEIGHT, |x, y| {
            [
                2.0 * x as f32 / CLOTH_WIDTH as f32 - 1.0,
                2.0 * y as f32 / CLOTH_HEIGHT as f32 - 1.0,
                0.0,
            ]
        });
        let vel = Grid::filled(CLOTH_WIDTH, CLOTH_HEIGHT, [0.0f32; 3]);
        (pos, vel)
    }

    #[test]
    fn zero_delta_substep_is_identity() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let pos = seed_cloth(CLOTH_WIDTH, CLOTH_HEIGHT, &mut rng);
        let vel = Grid::from_fn(CLOTH_WIDTH, CLOTH_HEIGHT, |x, y| {
            [x as f32 * 0.01, y as f32 * 0.01, 0.0]
        });
        let mut next_pos = Grid::filled(CLOTH_WIDTH, CLOTH_HEIGHT, [0.0f32; 3]);
        let mut next_vel = Grid::filled(CLOTH_WIDTH, CLOTH_HEIGHT, [0.0f32; 3]);

        step_cloth(
            &pos,
            &vel,
            &mut next_pos,
            &mut next_vel,
            &ClothParams::default(),
            1.0,
            0.0,
        );
        assert_eq!(next_pos.cells(), pos.cells());
        assert_eq!(next_vel.cells(), vel.cells());
    }

    #[test]
    fn pinned_corners_never_move() {
        let (mut pos, mut vel) = flat_sheet();
        let mut next_pos = pos.clone();
        let mut next_vel = vel.clone();
        let corner_a = pos.get(0, CLOTH_HEIGHT - 1);
        let corner_b = pos.get(CLOTH_WIDTH - 1, CLOTH_HEIGHT - 1);

        let params = ClothParams::default();
        for step in 0..50 {
            step_cloth(
                &pos,
                &vel,
                &mut next_pos,
                &mut next_vel,
                &params,
                step as f32 * 0.001,
                0.001,
            );
            std::mem::swap(&mut pos, &mut next_pos);
            std::mem::swap(&mut vel, &mut next_vel);
        }

        assert_eq!(pos.get(0, CLOTH_HEIGHT - 1), corner_a);
        assert_eq!(pos.get(CLOTH_WIDTH - 1, CLOTH_HEIGHT - 1), corner_b);
    }

    #[test]
    fn border_nodes_stay_finite() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let mut pos = seed_cloth(CLOTH_WIDTH, CLOTH_HEIGHT, &mut rng);
        let mut vel = Grid::filled(CLOTH_WIDTH, CLOTH_HEIGHT, [0.0f32; 3]);
        let mut next_pos = pos.clone();
        let mut next_vel = vel.clone();

        let params = ClothParams::default();
        for step in 0..100 {
            step_cloth(
                &pos,
                &vel,
                &mut next_pos,
                &mut next_vel,
                &params,
                step as f32 * 0.001,
                0.001,
            );
            std::mem::swap(&mut pos, &mut next_pos);
            std::mem::swap(&mut vel, &mut next_vel);
        }

        for p in pos.cells() {
            assert!(p.iter().all(|c| c.is_finite()));
        }
        for v in vel.cells() {
            assert!(v.iter().all(|c| c.is_finite()));
        }
    }

    #[test]
    fn coincident_nodes_produce_finite_force() {
        let mut pos = Grid::filled(4, 4, [0.0f32; 3]);
        pos.set(1, 1, [0.5, 0.5, 0.0]);
        pos.set(2, 2, [0.5, 0.5, 0.0]);
        let f = node_force(&pos, 1, 1, &ClothParams::default(), 0.0);
        assert!(f.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn wind_factor_stays_in_unit_range() {
        for i in 0..1000 {
            let w = wind_factor(i as f32 * 0.01);
            assert!((0.0..=1.0).contains(&w));
        }
    }
}
