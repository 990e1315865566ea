//! Pointer-attracted particles
//!
//! N particles with position and velocity in [-1,1]^2, pulled toward the
//! cursor by an inverse-square force. The squared distance is clamped from
//! below before dividing, so the force stays finite even at the attractor
//! itself; damping is exponential in the step delta, so a zero-delta step
//! is a no-op.

use std::time::Duration;

use rand::Rng;

use crate::demo::Demo;
use crate::error::Result;
use crate::gfx::{DisplayUniforms, GpuContext, PointsPass};
use crate::pipeline::{
    BufferShape, ComposeCtx, Compositor, FrameDriver, GpuStatePair, GpuStepProgram, ParameterBus,
    PassDesc, StepUniforms, TickPlan,
};
use crate::ui;

const ATTRACTION_FORCE: f32 = 0.1;
const MIN_DIST_SQ: f32 = 0.01;
const MAX_DIST_SQ: f32 = 4.0;
/// Reference frame rate the original per-frame damping factor maps to.
const DAMPING_FRAME_RATE: f32 = 60.0;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Particle {
    pub pos: [f32; 2],
    pub vel: [f32; 2],
}

/// Attraction toward `attractor`, with the squared distance clamped to
/// [0.01, 4.0]. At zero distance the direction degenerates to zero, never
/// to NaN.
pub fn attraction(pos: [f32; 2], attractor: [f32; 2]) -> [f32; 2] {
    let dx = attractor[0] - pos[0];
    let dy = attractor[1] - pos[1];
    let d2 = dx * dx + dy * dy;
    let len = d2.sqrt();
    if len < 1e-6 {
        return [0.0, 0.0];
    }
    let strength = ATTRACTION_FORCE / d2.clamp(MIN_DIST_SQ, MAX_DIST_SQ);
    [strength * dx / len, strength * dy / len]
}

/// CPU reference step: semi-implicit integration with exponential damping
/// and optional reflecting borders.
pub fn step_particles(
    particles: &mut [Particle],
    attractor: [f32; 2],
    dt: f32,
    damping_rate: f32,
    reflect: bool,
) {
    let damp = (-damping_rate * dt).exp();
    for p in particles.iter_mut() {
        let a = attraction(p.pos, attractor);
        p.vel[0] = (p.vel[0] + dt * a[0]) * damp;
        p.vel[1] = (p.vel[1] + dt * a[1]) * damp;

        if reflect {
            let nx = p.pos[0] + dt * p.vel[0];
            let ny = p.pos[1] + dt * p.vel[1];
            if !(-1.0..=1.0).contains(&nx) {
                p.vel[0] = -p.vel[0];
            }
            if !(-1.0..=1.0).contains(&ny) {
                p.vel[1] = -p.vel[1];
            }
        }

        p.pos[0] += dt * p.vel[0];
        p.pos[1] += dt * p.vel[1];
    }
}

pub fn seed_particles(n: usize, rng: &mut impl Rng) -> Vec<Particle> {
    (0..n)
        .map(|_| Particle {
            pos: [rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)],
            vel: [
                0.1 * rng.random_range(-1.0..1.0),
                0.1 * rng.random_range(-1.0..1.0),
            ],
        })
        .collect()
}

// knobs[0] = damping rate (1/s), knobs[1] = reflect flag, knobs[2] = particle count
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

@group(0) @binding(0) var<storage, read> current: array<vec4<f32>>;
@group(0) @binding(1) var<storage, read_write> next: array<vec4<f32>>;
@group(1) @binding(0) var<uniform> params: StepUniforms;

@compute @workgroup_size(8, 8)
fn step(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= params.width || id.y >= params.height) {
        return;
    }
    let index = id.y * params.width + id.x;
    if (f32(index) >= params.knobs[0].z) {
        return;
    }

    let state = current[index];
    var p = state.xy;
    var v = state.zw;
    let d = params.delta;

    let to_cursor = params.cursor - p;
    let d2 = dot(to_cursor, to_cursor);
    var a = vec2<f32>(0.0);
    if (d2 > 1e-12) {
        a = 0.1 / clamp(d2, 0.01, 4.0) * normalize(to_cursor);
    }

    let damp = exp(-params.knobs[0].x * d);
    v = (v + d * a) * damp;

    if (params.knobs[0].y > 0.5) {
        let p1 = p + d * v;
        if (p1.x < -1.0 || p1.x > 1.0) {
            v.x = -v.x;
        }
        if (p1.y < -1.0 || p1.y > 1.0) {
            v.y = -v.y;
        }
    }

    next[index] = vec4<f32>(p + d * v, v);
}
"#;

// grid.x = state row width, knobs[0].x = opacity, knobs[0].y = particle count
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
@group(0) @binding(1) var<storage, read> state: array<vec4<f32>>;

struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) speed: f32,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VsOut {
    var out: VsOut;
    let s = state[index];
    var p = s.xy;

    let aspect = display.viewport.x / display.viewport.y;
    if (aspect < 1.0) {
        p.x /= aspect;
    } else {
        p.y *= aspect;
    }

    if (f32(index) >= display.knobs[0].y) {
        // park excess slots off-screen
        p = vec2<f32>(10.0, 10.0);
    }

    out.position = vec4<f32>(p, 0.0, 1.0);
    out.speed = length(s.zw);
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let s = in.speed;
    let color = display.color_a.rgb + s * display.color_b.rgb + s * s * display.color_c.rgb;
    return vec4<f32>(color, display.knobs[0].x);
}
"#;

struct ParticleResources {
    pair: GpuStatePair,
    step: GpuStepProgram,
    display: PointsPass,
    count: u32,
    substeps: u32,
}

pub struct ParticlesDemo {
    driver: FrameDriver,
    bus: ParameterBus,
    resources: ParticleResources,
    compositor: Compositor<ParticleResources>,
    cursor_px: [f32; 2],
}

impl ParticlesDemo {
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        let mut bus = ParameterBus::new();
        bus.register_number("count", "Particle count (10^n)", 4.0, 0.0, 6.0, 1.0);
        bus.register_number("viscosity", "Viscosity", 1.0, 0.1, 30.0, 0.1);
        bus.register_number("opacity", "Opacity", 0.7, 0.01, 1.0, 0.01);
        bus.register_color("color_base", "Base color", [0.0, 0.3, 0.0]);
        bus.register_color("color_speed", "Speed color", [0.0, 0.7, 0.5]);
        bus.register_color("color_fast", "Fast color", [0.0, 0.0, 1.0]);
        bus.register_boolean("bounce", "Border bounce", false);
        bus.register_action("restart", "Restart");
        bus.apply_pending();

        let driver = FrameDriver::new(Duration::from_millis(200));
        let resources = Self::build_resources(gpu, 10_000)?;

        let mut compositor = Compositor::new(&["particle_state"]);
        compositor.add_pass(
            PassDesc::new("step", &["particle_state"], &["particle_state_next"]),
            |res: &mut ParticleResources, encoder, _ctx| {
                let shape = res.pair.shape();
                for _ in 0..res.substeps {
                    res.pair.swap();
                    res.step.dispatch(encoder, res.pair.step_bind_group(), &[], shape);
                }
                res.substeps = 0;
            },
        );
        compositor.add_pass(
            PassDesc::new("display", &["particle_state_next"], &["screen"]),
            |res: &mut ParticleResources, encoder, ctx| {
                let slots = res.pair.shape().cell_count() as u32;
                res.display.draw(
                    encoder,
                    ctx.surface,
                    wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    !res.pair.a_is_current(),
                    slots,
                );
            },
        );
        compositor.validate()?;

        Ok(Self {
            driver,
            bus,
            resources,
            compositor,
            cursor_px: [0.0, 0.0],
        })
    }

    fn build_resources(gpu: &GpuContext, count: u32) -> Result<ParticleResources> {
        let shape = BufferShape::for_count(count as u64, gpu.max_state_row(), 4)?;
        let pair = GpuStatePair::new(gpu.device(), shape, "particles");
        let step =
            GpuStepProgram::new(gpu.device(), STEP_SHADER, "step", pair.layout(), &[], "particles");
        let display = PointsPass::new(
            gpu.device(),
            POINTS_SHADER,
            gpu.surface_format(),
            (pair.current(), pair.next()),
            "particles display",
        );

        let particles = seed_particles(count as usize, &mut rand::rng());
        let mut data = vec![0.0f32; shape.float_len()];
        data[..particles.len() * 4].copy_from_slice(bytemuck::cast_slice(&particles));
        pair.seed(gpu.queue(), &data);

        Ok(ParticleResources {
            pair,
            step,
            display,
            count,
            substeps: 0,
        })
    }

    /// Cursor position mapped into the simulation's square [-1,1] space,
    /// aspect-corrected the same way the display pass stretches it back.
    fn attractor(&self, viewport: (u32, u32)) -> [f32; 2] {
        let (w, h) = (viewport.0 as f32, viewport.1 as f32);
        let longest = w.max(h).max(1.0);
        [
            (2.0 * self.cursor_px[0] - w) / longest,
            -(2.0 * self.cursor_px[1] - h) / longest,
        ]
    }
}

impl Demo for ParticlesDemo {
    fn name(&self) -> &str {
        "Particles"
    }

    fn driver(&mut self) -> &mut FrameDriver {
        &mut self.driver
    }

    fn bus(&mut self) -> &mut ParameterBus {
        &mut self.bus
    }

    fn apply_params(&mut self, gpu: &GpuContext) -> Result<()> {
        if self.bus.changed("count") || self.bus.fired("restart") {
            let count = 10f64.powi(self.bus.number("count")? as i32) as u32;
            self.resources = Self::build_resources(gpu, count)?;
        }
        Ok(())
    }

    fn prepare(&mut self, gpu: &GpuContext, plan: &TickPlan) {
        self.resources.substeps += plan.substeps;

        let shape = self.resources.pair.shape();
        let (w, h) = gpu.surface_size();
        let damping_rate =
            0.01 * self.bus.number("viscosity").unwrap_or(1.0) as f32 * DAMPING_FRAME_RATE;
        let bounce = self.bus.boolean("bounce").unwrap_or(false);

        self.resources.step.write_uniforms(
            gpu.queue(),
            StepUniforms {
                delta: plan.substep_delta,
                time: self.driver.sim_time(),
                width: shape.width,
                height: shape.height,
                cursor: self.attractor((w, h)),
                viewport: [w as f32, h as f32],
                knobs: [
                    damping_rate,
                    if bounce { 1.0 } else { 0.0 },
                    self.resources.count as f32,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                ],
            },
        );

        let c0 = self.bus.color("color_base").unwrap_or([0.0, 0.3, 0.0]);
        let c1 = self.bus.color("color_speed").unwrap_or([0.0, 0.7, 0.5]);
        let c2 = self.bus.color("color_fast").unwrap_or([0.0, 0.0, 1.0]);
        let opacity = self.bus.number("opacity").unwrap_or(0.7) as f32;
        self.resources.display.write_uniforms(
            gpu.queue(),
            DisplayUniforms {
                viewport: [w as f32, h as f32],
                grid: [shape.width as f32, shape.height as f32],
                color_a: [c0[0], c0[1], c0[2], 1.0],
                color_b: [c1[0], c1[1], c1[2], 1.0],
                color_c: [c2[0], c2[1], c2[2], 1.0],
                knobs: [opacity, self.resources.count as f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
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
        ui::settings_panel(ui, "Particles", &mut self.bus);
        ui::transport_panel(ui, "Playback", &mut self.driver);
    }

    fn on_cursor(&mut self, x: f32, y: f32) {
        self.cursor_px = [x, y];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn force_at_the_attractor_is_finite() {
        let f = attraction([0.3, -0.4], [0.3, -0.4]);
        assert!(f[0].is_finite() && f[1].is_finite());
        assert_eq!(f, [0.0, 0.0]);
    }

    #[test]
    fn close_range_force_is_clamped() {
        // just inside the clamp radius: same magnitude as at the radius
        let near = attraction([0.001, 0.0], [0.0, 0.0]);
        let at_clamp = attraction([0.1, 0.0], [0.0, 0.0]);
        assert!((near[0].abs() - at_clamp[0].abs()).abs() < 1e-6);
    }

    #[test]
    fn zero_delta_step_changes_nothing() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let mut particles = seed_particles(64, &mut rng);
        let before = particles.clone();
        step_particles(&mut particles, [0.0, 0.0], 0.0, 0.6, false);
        assert_eq!(particles, before);
    }

    #[test]
    fn damped_particles_converge_on_the_attractor() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(9);
        let mut particles: Vec<Particle> = (0..256)
            .map(|_| {
                let angle = rng.random_range(0.0..std::f32::consts::TAU);
                let radius = rng.random_range(0.5..1.0f32);
                Particle {
                    pos: [radius * angle.cos(), radius * angle.sin()],
                    vel: [0.0, 0.0],
                }
            })
            .collect();

        let mean_distance = |ps: &[Particle]| -> f32 {
            ps.iter()
                .map(|p| (p.pos[0] * p.pos[0] + p.pos[1] * p.pos[1]).sqrt())
                .sum::<f32>()
                / ps.len() as f32
        };

        let initial = mean_distance(&particles);
        let mut previous = initial;
        for _ in 0..200 {
            step_particles(&mut particles, [0.0, 0.0], 0.01, 20.0, false);
            let now = mean_distance(&particles);
            assert!(now <= previous + 1e-6, "distance rose: {previous} -> {now}");
            previous = now;
        }
        assert!(previous < initial);
    }

    #[test]
    fn reflecting_borders_keep_particles_inside() {
        let mut particles = vec![Particle {
            pos: [0.99, 0.0],
            vel: [5.0, 0.0],
        }];
        step_particles(&mut particles, [10.0, 0.0], 0.016, 0.0, true);
        assert!(particles[0].pos[0] <= 1.0);
        assert!(particles[0].vel[0] < 0.0);
    }
}
