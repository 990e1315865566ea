//! Grid-city traffic
//!
//! Cars drive along the street axes of a block grid. Every frame an
//! auxiliary pass splats the car positions into a coarse occupancy texture;
//! the step pass then reads that texture to brake for cars up to three
//! cells ahead, before the display passes draw the streets and the cars.
//! The occupancy pass reads the pair's current buffer while the step
//! writes the next one, so the pass order is what keeps the frame sound.

use std::time::Duration;

use rand::Rng;
use wgpu::util::DeviceExt;

use crate::demo::Demo;
use crate::error::Result;
use crate::gfx::{DisplayUniforms, GpuContext, PointsPass, ScreenPass, FULLSCREEN_VS};
use crate::pipeline::{
    BufferShape, ComposeCtx, Compositor, FrameDriver, GpuStatePair, GpuStepProgram, ParameterBus,
    PassDesc, StepUniforms, TickPlan,
};
use crate::ui;
use crate::wgpu_utils::{binding_types, entry};

pub const BLOCK_GRID_SIZE: u32 = 20;
pub const BLOCK_WORLD_SIZE: f32 = 50.0;
pub const MAX_ACCELERATION: f32 = 5.0;
pub const MAX_BRAKING: f32 = -20.0;
pub const MIN_SPEED: f32 = 1e-5;
const CAR_COUNTS: [u32; 10] = [10, 20, 50, 100, 200, 500, 1_000, 2_000, 5_000, 10_000];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Car {
    pub pos: [f32; 2],
    pub vel: [f32; 2],
}

/// Snaps a velocity to the street axis it mostly points along.
pub fn cardinal_direction(v: [f32; 2]) -> (i32, i32) {
    if v[0] > v[1].abs() {
        (1, 0)
    } else if v[0] < -v[1].abs() {
        (-1, 0)
    } else if v[1] > v[0].abs() {
        (0, 1)
    } else if v[1] < -v[0].abs() {
        (0, -1)
    } else {
        (0, 0)
    }
}

/// Speed the car should aim for given occupant speeds one, two and three
/// cells ahead. The nearest occupied cell dominates.
pub fn desired_speed(target: f32, speed: f32, ahead: &[Option<f32>; 3]) -> f32 {
    if let Some(s) = ahead[0] {
        return target.min(s.min(speed));
    }
    if let Some(s) = ahead[1] {
        return target.min(s + 0.3 * (target - s));
    }
    if let Some(s) = ahead[2] {
        return target.min(s + 0.7 * (target - s));
    }
    target
}

/// CPU reference of the acceleration rule: approach the desired speed with
/// bounded acceleration and braking, never dropping to a full stop.
pub fn advance_car(car: &mut Car, target: f32, ahead: &[Option<f32>; 3], unit_factor: f32, dt: f32) {
    let speed = (car.vel[0] * car.vel[0] + car.vel[1] * car.vel[1]).sqrt();
    if speed < MIN_SPEED {
        return;
    }
    let desired = desired_speed(target, speed, ahead);
    let a = (10.0 * (desired - speed)).clamp(MAX_BRAKING, MAX_ACCELERATION);
    let new_speed = (speed + dt * a).max(MIN_SPEED);
    let dir = [car.vel[0] / speed, car.vel[1] / speed];
    car.vel = [new_speed * dir[0], new_speed * dir[1]];
    car.pos[0] += dt * car.vel[0] * unit_factor;
    car.pos[1] += dt * car.vel[1] * unit_factor;
}

/// Cars start on the vertical streets between blocks, half heading each
/// way round.
pub fn seed_cars(n: usize, blocks: u32, grid_size: u32, rng: &mut impl Rng) -> Vec<Car> {
    (0..n)
        .map(|_| {
            let block = rng.random_range(0..blocks.max(2) - 1);
            let norm = (block + 1) as f32 / blocks as f32 + 0.5 / grid_size as f32;
            let mut pos = [2.0 * norm - 1.0, rng.random_range(-1.0..1.0)];
            let mut vel = [0.0, 0.001];
            if rng.random_bool(0.5) {
                pos = [pos[1], -pos[0]];
                vel = [vel[1], vel[0]];
            }
            Car { pos, vel }
        })
        .collect()
}

// knobs[0]: x = grid size, y = block count, z = traffic-control flag,
// knobs[0].w = car count; knobs[1].x = world unit factor
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
@group(2) @binding(0) var<storage, read> car_data: array<vec4<f32>>;
@group(3) @binding(0) var grid_state: texture_2d<f32>;

const EPSILON: f32 = 1e-5;

fn cardinal(v: vec2<f32>) -> vec2<i32> {
    if (v.x > abs(v.y)) {
        return vec2<i32>(1, 0);
    }
    if (v.x < -abs(v.y)) {
        return vec2<i32>(-1, 0);
    }
    if (v.y > abs(v.x)) {
        return vec2<i32>(0, 1);
    }
    if (v.y < -abs(v.x)) {
        return vec2<i32>(0, -1);
    }
    return vec2<i32>(0, 0);
}

fn cell(coord: vec2<i32>) -> vec4<f32> {
    let size = i32(params.knobs[0].x);
    let clamped = clamp(coord, vec2<i32>(0), vec2<i32>(size - 1));
    return textureLoad(grid_state, clamped, 0);
}

@compute @workgroup_size(8, 8)
fn step(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= params.width || id.y >= params.height) {
        return;
    }
    let index = id.y * params.width + id.x;
    if (f32(index) >= params.knobs[0].w) {
        next[index] = current[index];
        return;
    }

    let grid_size = params.knobs[0].x;
    let unit_factor = params.knobs[1].x;
    let d = params.delta;

    let state = current[index];
    var p = state.xy;
    var v = state.zw;
    let target_speed = car_data[index].x;

    // u-turn into the opposite lane at the map edge
    var p1 = p + d * v * unit_factor;
    if (p1.x < -1.0 || p1.x > 1.0 || p1.y < -1.0 || p1.y > 1.0) {
        let dir = vec2<f32>(cardinal(v));
        p += vec2<f32>(-dir.y, dir.x) * 2.0 / grid_size;
        v = -v;
    }

    var speed = length(v);
    if (speed < EPSILON) {
        speed = EPSILON;
    }
    let dir = v / speed;
    let grid_dir = cardinal(v);
    var desired = target_speed;

    if (params.knobs[0].z > 0.5) {
        let cell_coord = vec2<i32>(0.5 * (p + 1.0) * grid_size);
        let cell1 = cell(cell_coord + 1 * grid_dir);
        let cell2 = cell(cell_coord + 2 * grid_dir);
        let cell3 = cell(cell_coord + 3 * grid_dir);

        if (cell1.r > 0.5) {
            if (cell1.g < speed) {
                speed = cell1.g;
                desired = min(speed, desired);
            }
            // nudge back, to prevent blockage
            p -= dir * EPSILON * unit_factor;
        } else if (cell2.r > 0.5) {
            desired = min(mix(cell2.g, desired, 0.3), desired);
        } else if (cell3.r > 0.5) {
            desired = min(mix(cell3.g, desired, 0.7), desired);
        }
    }

    let a = clamp(10.0 * (desired - speed), -20.0, 5.0);
    speed = max(speed + d * a, EPSILON);
    v = speed * dir;
    p += d * v * unit_factor;
    next[index] = vec4<f32>(p, v);
}
"#;

// splats cars into the occupancy target: r = occupied, g = speed
const GRID_SHADER: &str = r#"
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
    if (f32(index) >= display.knobs[0].x) {
        p = vec2<f32>(10.0, 10.0);
    }
    out.position = vec4<f32>(p, 0.0, 1.0);
    out.speed = length(s.zw);
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, in.speed, 0.0, 1.0);
}
"#;

// procedural streets, repeated once per block; grid.x = block count
const BACKGROUND_FS: &str = r#"
struct DisplayUniforms {
    viewport: vec2<f32>,
    grid: vec2<f32>,
    color_a: vec4<f32>,
    color_b: vec4<f32>,
    color_c: vec4<f32>,
    knobs: array<vec4<f32>, 2>,
};

@group(0) @binding(0) var<uniform> display: DisplayUniforms;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let coord = fract(in.uv * display.grid.x);

    let scale = 0.5;
    let street_width = 0.35 * scale;
    let sidewalk_width = 0.07 * scale;
    let house_r = 0.5 - 0.5 * street_width;
    let crossing_line = 0.01;

    let r = abs(vec2<f32>(0.5) - coord);
    let r_street = r - vec2<f32>(house_r);

    var color = vec3<f32>(0.5);
    if (r_street.x > 0.0 || r_street.y > 0.0) {
        color = vec3<f32>(0.2);

        if ((-0.1 < r_street.x && r_street.x < 0.0 && i32(floor(r_street.y / crossing_line)) % 2 == 0) ||
            (-0.1 < r_street.y && r_street.y < 0.0 && i32(floor(r_street.x / crossing_line)) % 2 == 0)) {
            color = vec3<f32>(0.85);
        }

        if ((r_street.x < sidewalk_width && r_street.y < 0.0) ||
            (r_street.y < sidewalk_width && r_street.x < 0.0) ||
            (length(r_street) < sidewalk_width)) {
            color = vec3<f32>(0.1);
        }
    }

    return vec4<f32>(color, 1.0);
}
"#;

// cars drawn as colored points, hue hashed from the slot index
const CARS_SHADER: &str = r#"
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
    @location(0) color: vec3<f32>,
};

fn rand(co: vec2<f32>) -> f32 {
    let dt = dot(co, vec2<f32>(12.9898, 78.233));
    return fract(sin(dt % 3.14) * 43758.5453);
}

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

    if (f32(index) >= display.knobs[0].x) {
        p = vec2<f32>(10.0, 10.0);
    }

    let seed = f32(index % 1000u) / 1000.0;
    out.color = vec3<f32>(rand(vec2<f32>(seed, 0.0)), rand(vec2<f32>(0.0, seed)), rand(vec2<f32>(seed, seed)));
    out.position = vec4<f32>(p, 0.0, 1.0);
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color, 1.0);
}
"#;

struct TrafficResources {
    pair: GpuStatePair,
    step: GpuStepProgram,
    car_data_bind: wgpu::BindGroup,
    grid_view: wgpu::TextureView,
    grid_bind: wgpu::BindGroup,
    grid_pass: PointsPass,
    background: ScreenPass,
    cars: PointsPass,
    count: u32,
    blocks: u32,
    substeps: u32,
}

pub struct TrafficDemo {
    driver: FrameDriver,
    bus: ParameterBus,
    resources: TrafficResources,
    compositor: Compositor<TrafficResources>,
}

impl TrafficDemo {
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        let mut bus = ParameterBus::new();
        let count_labels: Vec<String> = CAR_COUNTS
            .iter()
            .map(|&n| {
                if n < 1000 {
                    n.to_string()
                } else {
                    format!("{}k", n / 1000)
                }
            })
            .collect();
        let count_refs: Vec<&str> = count_labels.iter().map(String::as_str).collect();
        bus.register_choice("count", "Car count", 3, &count_refs);
        bus.register_number("blocks", "Grid size", 5.0, 2.0, 100.0, 1.0);
        bus.register_boolean("traffic_control", "Traffic enabled", true);
        bus.register_action("restart", "Restart");
        bus.apply_pending();

        let driver = FrameDriver::new(Duration::from_millis(200));
        let resources = Self::build_resources(gpu, 100, 5)?;

        let mut compositor = Compositor::new(&["car_state", "car_data"]);
        compositor.add_pass(
            PassDesc::new("grid_state", &["car_state"], &["grid_state"]),
            |res: &mut TrafficResources, encoder, _ctx| {
                let slots = res.pair.shape().cell_count() as u32;
                res.grid_pass.draw(
                    encoder,
                    &res.grid_view,
                    wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    res.pair.a_is_current(),
                    slots,
                );
            },
        );
        compositor.add_pass(
            PassDesc::new(
                "step",
                &["car_state", "car_data", "grid_state"],
                &["car_state_next"],
            ),
            |res: &mut TrafficResources, encoder, _ctx| {
                let shape = res.pair.shape();
                for _ in 0..res.substeps {
                    res.pair.swap();
                    res.step.dispatch(
                        encoder,
                        res.pair.step_bind_group(),
                        &[&res.car_data_bind, &res.grid_bind],
                        shape,
                    );
                }
                res.substeps = 0;
            },
        );
        compositor.add_pass(
            PassDesc::new("background", &[], &["screen"]),
            |res: &mut TrafficResources, encoder, ctx| {
                res.background.draw(
                    encoder,
                    ctx.surface,
                    wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    true,
                );
            },
        );
        compositor.add_pass(
            PassDesc::new("cars", &["car_state_next"], &["screen"]),
            |res: &mut TrafficResources, encoder, ctx| {
                let slots = res.pair.shape().cell_count() as u32;
                res.cars.draw(
                    encoder,
                    ctx.surface,
                    wgpu::LoadOp::Load,
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
        })
    }

    fn build_resources(gpu: &GpuContext, count: u32, blocks: u32) -> Result<TrafficResources> {
        let device = gpu.device();
        let grid_size = blocks * BLOCK_GRID_SIZE;

        let shape = BufferShape::for_count(count as u64, gpu.max_state_row(), 4)?;
        let pair = GpuStatePair::new(device, shape, "traffic");

        let cars = seed_cars(count as usize, blocks, grid_size, &mut rand::rng());
        let mut state_data = vec![0.0f32; shape.float_len()];
        for (i, car) in cars.iter().enumerate() {
            state_data[i * 4..i * 4 + 2].copy_from_slice(&car.pos);
            state_data[i * 4 + 2..i * 4 + 4].copy_from_slice(&car.vel);
        }
        pair.seed(gpu.queue(), &state_data);

        // static per-car data: target speed 20-60 km/h in m/s
        let mut rng = rand::rng();
        let mut car_data = vec![0.0f32; shape.float_len()];
        for i in 0..count as usize {
            car_data[i * 4] = (20.0 + 40.0 * rng.random_range(0.0..1.0f32)) / 3.6;
        }
        let car_data_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("traffic car data"),
            contents: bytemuck::cast_slice(&car_data),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let car_data_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("traffic car data layout"),
            entries: &[entry(
                0,
                wgpu::ShaderStages::COMPUTE,
                binding_types::storage_buffer(true),
            )],
        });
        let car_data_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("traffic car data"),
            layout: &car_data_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: car_data_buffer.as_entire_binding(),
            }],
        });

        let grid_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("traffic grid state"),
            size: wgpu::Extent3d {
                width: grid_size,
                height: grid_size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let grid_view = grid_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let grid_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("traffic grid layout"),
            entries: &[entry(
                0,
                wgpu::ShaderStages::COMPUTE,
                binding_types::texture_2d(),
            )],
        });
        let grid_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("traffic grid"),
            layout: &grid_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&grid_view),
            }],
        });

        let step = GpuStepProgram::new(
            device,
            STEP_SHADER,
            "step",
            pair.layout(),
            &[&car_data_layout, &grid_layout],
            "traffic",
        );
        let grid_pass = PointsPass::new(
            device,
            GRID_SHADER,
            wgpu::TextureFormat::Rgba16Float,
            (pair.current(), pair.next()),
            "traffic grid splat",
        );
        let background = ScreenPass::new(
            device,
            &format!("{FULLSCREEN_VS}\n{BACKGROUND_FS}"),
            gpu.surface_format(),
            None,
            "traffic background",
        );
        let cars_pass = PointsPass::new(
            device,
            CARS_SHADER,
            gpu.surface_format(),
            (pair.current(), pair.next()),
            "traffic cars",
        );

        Ok(TrafficResources {
            pair,
            step,
            car_data_bind,
            grid_view,
            grid_bind,
            grid_pass,
            background,
            cars: cars_pass,
            count,
            blocks,
            substeps: 0,
        })
    }
}

impl Demo for TrafficDemo {
    fn name(&self) -> &str {
        "Traffic"
    }

    fn driver(&mut self) -> &mut FrameDriver {
        &mut self.driver
    }

    fn bus(&mut self) -> &mut ParameterBus {
        &mut self.bus
    }

    fn apply_params(&mut self, gpu: &GpuContext) -> Result<()> {
        if self.bus.changed("count") || self.bus.changed("blocks") || self.bus.fired("restart") {
            let count = CAR_COUNTS[self.bus.choice("count")?.min(CAR_COUNTS.len() - 1)];
            let blocks = self.bus.number("blocks")? as u32;
            self.resources = Self::build_resources(gpu, count, blocks)?;
        }
        Ok(())
    }

    fn prepare(&mut self, gpu: &GpuContext, plan: &TickPlan) {
        self.resources.substeps += plan.substeps;

        let shape = self.resources.pair.shape();
        let (w, h) = gpu.surface_size();
        let blocks = self.resources.blocks;
        let grid_size = (blocks * BLOCK_GRID_SIZE) as f32;
        let traffic_control = self.bus.boolean("traffic_control").unwrap_or(true);
        let unit_factor = 2.0 / (BLOCK_WORLD_SIZE * blocks as f32);

        self.resources.step.write_uniforms(
            gpu.queue(),
            StepUniforms {
                delta: plan.substep_delta,
                time: self.driver.sim_time(),
                width: shape.width,
                height: shape.height,
                viewport: [w as f32, h as f32],
                knobs: [
                    grid_size,
                    blocks as f32,
                    if traffic_control { 1.0 } else { 0.0 },
                    self.resources.count as f32,
                    unit_factor,
                    0.0,
                    0.0,
                    0.0,
                ],
                ..Default::default()
            },
        );

        let display = DisplayUniforms {
            viewport: [w as f32, h as f32],
            grid: [blocks as f32, grid_size],
            knobs: [self.resources.count as f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            ..Default::default()
        };
        self.resources.grid_pass.write_uniforms(gpu.queue(), display);
        self.resources.background.write_uniforms(gpu.queue(), display);
        self.resources.cars.write_uniforms(gpu.queue(), display);
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
        ui::settings_panel(ui, "Traffic", &mut self.bus);
        ui::transport_panel(ui, "Playback", &mut self.driver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn cardinal_snaps_to_the_dominant_axis() {
        assert_eq!(cardinal_direction([1.0, 0.2]), (1, 0));
        assert_eq!(cardinal_direction([-0.5, 0.1]), (-1, 0));
        assert_eq!(cardinal_direction([0.1, 3.0]), (0, 1));
        assert_eq!(cardinal_direction([0.0, -0.1]), (0, -1));
        assert_eq!(cardinal_direction([0.0, 0.0]), (0, 0));
    }

    #[test]
    fn empty_road_accelerates_toward_target_speed() {
        let mut car = Car {
            pos: [0.0, 0.0],
            vel: [0.0, 1.0],
        };
        let ahead = [None, None, None];
        for _ in 0..2000 {
            advance_car(&mut car, 10.0, &ahead, 0.01, 0.016);
        }
        let speed = (car.vel[0] * car.vel[0] + car.vel[1] * car.vel[1]).sqrt();
        assert!((speed - 10.0).abs() < 0.5, "speed {speed}");
    }

    #[test]
    fn occupied_cell_ahead_forces_braking() {
        let mut car = Car {
            pos: [0.0, 0.0],
            vel: [0.0, 10.0],
        };
        let ahead = [Some(2.0), None, None];
        advance_car(&mut car, 10.0, &ahead, 0.01, 0.1);
        let speed = (car.vel[0] * car.vel[0] + car.vel[1] * car.vel[1]).sqrt();
        assert!(speed < 10.0);
    }

    #[test]
    fn speed_never_reaches_zero() {
        let mut car = Car {
            pos: [0.0, 0.0],
            vel: [0.0, 5.0],
        };
        let ahead = [Some(0.0), None, None];
        for _ in 0..500 {
            advance_car(&mut car, 10.0, &ahead, 0.01, 0.1);
        }
        let speed = (car.vel[0] * car.vel[0] + car.vel[1] * car.vel[1]).sqrt();
        assert!(speed >= MIN_SPEED);
        assert!(car.pos.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn seeded_cars_start_on_street_axes() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(2);
        let cars = seed_cars(200, 5, 100, &mut rng);
        for car in &cars {
            assert!(car.pos[0].abs() <= 1.0 && car.pos[1].abs() <= 1.0);
            // moving along exactly one axis
            let dir = cardinal_direction(car.vel);
            assert_ne!(dir, (0, 0));
        }
    }
}
