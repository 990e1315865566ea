//! Mandelbrot / Julia explorer
//!
//! The odd one out: no state pair and no stepping. The fractal is rendered
//! on demand into a cached offscreen target whenever the view or a
//! parameter changes, and a cheap blit pass copies that target to the
//! surface every frame so the UI overlay stays live.

use std::time::Duration;

use crate::demo::Demo;
use crate::error::Result;
use crate::gfx::{DisplayUniforms, GpuContext, ScreenPass, FULLSCREEN_VS};
use crate::pipeline::{
    ComposeCtx, Compositor, FrameDriver, ParameterBus, PassDesc, TickPlan,
};
use crate::ui;
use crate::wgpu_utils::{binding_types, entry};

pub const ESCAPE_RADIUS: f32 = 2.0;
const JULIA_SETS: [[f32; 2]; 2] = [[-0.4, 0.6], [-0.8, 0.156]];

/// CPU reference of the escape iteration: z <- z² + c while |z| <= r.
pub fn escape_iterations(z0: [f32; 2], c: [f32; 2], radius: f32, max_iterations: u32) -> u32 {
    let r2 = radius * radius;
    let mut z = z0;
    for i in 0..max_iterations {
        if z[0] * z[0] + z[1] * z[1] > r2 {
            return i;
        }
        z = [z[0] * z[0] - z[1] * z[1] + c[0], 2.0 * z[0] * z[1] + c[1]];
    }
    max_iterations
}

pub fn mandelbrot_iterations(c: [f32; 2], max_iterations: u32) -> u32 {
    escape_iterations([0.0, 0.0], c, ESCAPE_RADIUS, max_iterations)
}

/// Bernstein-polynomial colour ramp over the iteration fraction.
pub fn fractal_color(iterations: u32, max_iterations: u32) -> [f32; 3] {
    let a = (iterations + 1) as f32 / (max_iterations + 1) as f32;
    let b = 1.0 - a;
    [
        3.0 * b * a * a * a,
        20.0 * b * b * a * a,
        8.5 * b * b * b * a,
    ]
}

// grid = zoom target; knobs[0] = (zoom radius, max iterations, AA, type),
// knobs[1].xy = julia constant
const FRACTAL_FS: &str = r#"
struct DisplayUniforms {
    viewport: vec2<f32>,
    grid: vec2<f32>,
    color_a: vec4<f32>,
    color_b: vec4<f32>,
    color_c: vec4<f32>,
    knobs: array<vec4<f32>, 2>,
};

@group(0) @binding(0) var<uniform> display: DisplayUniforms;

fn fractal_color(i: u32, max_iterations: u32) -> vec3<f32> {
    let a = f32(i + 1u) / f32(max_iterations + 1u);
    let b = 1.0 - a;
    return vec3<f32>(
        3.0 * b * a * a * a,
        20.0 * b * b * a * a,
        8.5 * b * b * b * a,
    );
}

fn square_complex(c: vec2<f32>) -> vec2<f32> {
    return vec2<f32>(c.x * c.x - c.y * c.y, 2.0 * c.x * c.y);
}

fn julia(z0: vec2<f32>, c: vec2<f32>, radius: f32, max_iterations: u32) -> vec3<f32> {
    let r2 = radius * radius;
    var z = z0;
    var i = 0u;
    for (; i < max_iterations; i++) {
        if (dot(z, z) > r2) {
            break;
        }
        z = square_complex(z) + c;
    }
    return fractal_color(i, max_iterations);
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let aspect = display.viewport.x / display.viewport.y;
    let zoom_target = display.grid;
    let zoom_radius = display.knobs[0].x;
    let max_iterations = u32(display.knobs[0].y);
    let aa = max(u32(display.knobs[0].z), 1u);
    let is_julia = display.knobs[0].w > 0.5;
    let julia_c = display.knobs[1].xy;

    let frag = vec2<f32>(in.uv.x, 1.0 - in.uv.y) * display.viewport;
    var color = vec3<f32>(0.0);
    for (var j = 0u; j < aa; j++) {
        for (var i = 0u; i < aa; i++) {
            var coord = (f32(aa) * frag + vec2<f32>(f32(i), f32(j))) / (f32(aa) * display.viewport);
            coord = (coord - 0.5) * 2.0;
            coord.y = -coord.y;
            let c = zoom_target + zoom_radius * coord * vec2<f32>(aspect, 1.0);

            if (is_julia) {
                color += julia(c, julia_c, 2.0, max_iterations);
            } else {
                color += julia(vec2<f32>(0.0), c, 2.0, max_iterations);
            }
        }
    }
    color /= f32(aa * aa);

    return vec4<f32>(color, 1.0);
}
"#;

const BLIT_SHADER: &str = r#"
struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VsOut {
    var out: VsOut;
    let x = f32(i32(index & 1u) * 4 - 1);
    let y = f32(i32(index & 2u) * 2 - 1);
    out.position = vec4<f32>(x, y, 0.0, 1.0);
    out.uv = vec2<f32>(x, -y) * 0.5 + 0.5;
    return out;
}

@group(0) @binding(0) var cached: texture_2d<f32>;
@group(0) @binding(1) var cached_sampler: sampler;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return textureSample(cached, cached_sampler, in.uv);
}
"#;

/// Copies the cached fractal target to the frame's surface.
struct BlitPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
}

impl BlitPass {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat, source: &wgpu::TextureView) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fractal blit"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fractal blit layout"),
            entries: &[
                entry(0, wgpu::ShaderStages::FRAGMENT, binding_types::texture_2d()),
                entry(
                    1,
                    wgpu::ShaderStages::FRAGMENT,
                    binding_types::sampler(wgpu::SamplerBindingType::Filtering),
                ),
            ],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("fractal blit sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("fractal blit"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("fractal blit"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        let bind_group = Self::bind(device, &layout, &sampler, source);
        Self {
            pipeline,
            layout,
            sampler,
            bind_group,
        }
    }

    fn bind(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        source: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fractal blit"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn retarget(&mut self, device: &wgpu::Device, source: &wgpu::TextureView) {
        self.bind_group = Self::bind(device, &self.layout, &self.sampler, source);
    }

    fn draw(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("fractal blit"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

struct FractalResources {
    fractal: ScreenPass,
    target_view: wgpu::TextureView,
    blit: BlitPass,
    needs_render: bool,
}

pub struct FractalDemo {
    driver: FrameDriver,
    bus: ParameterBus,
    resources: FractalResources,
    compositor: Compositor<FractalResources>,
    zoom_target: [f32; 2],
    zoom_radius: f32,
    cursor_px: [f32; 2],
    dragging: bool,
    size: (u32, u32),
}

impl FractalDemo {
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        let mut bus = ParameterBus::new();
        bus.register_number("iterations", "Iterations", 1000.0, 10.0, 10000.0, 10.0);
        bus.register_number("antialiasing", "Antialiasing", 2.0, 1.0, 5.0, 1.0);
        bus.register_choice(
            "fractal",
            "Fractal",
            0,
            &[
                "Mandelbrot",
                "Julia (c = -0.4 + 0.6i)",
                "Julia (c = -0.8 + 0.156i)",
            ],
        );
        bus.apply_pending();

        let driver = FrameDriver::new(Duration::from_millis(200));
        let size = gpu.surface_size();
        let target_view = Self::make_target(gpu, size);
        let fractal = ScreenPass::new(
            gpu.device(),
            &format!("{FULLSCREEN_VS}\n{FRACTAL_FS}"),
            gpu.surface_format(),
            None,
            "fractal",
        );
        let blit = BlitPass::new(gpu.device(), gpu.surface_format(), &target_view);

        let mut compositor = Compositor::new(&[]);
        compositor.add_pass(
            PassDesc::new("fractal", &[], &["fractal_target"]),
            |res: &mut FractalResources, encoder, _ctx| {
                if res.needs_render {
                    res.fractal.draw(
                        encoder,
                        &res.target_view,
                        wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        true,
                    );
                    res.needs_render = false;
                }
            },
        );
        compositor.add_pass(
            PassDesc::new("blit", &["fractal_target"], &["screen"]),
            |res: &mut FractalResources, encoder, ctx| {
                res.blit.draw(encoder, ctx.surface);
            },
        );
        compositor.validate()?;

        Ok(Self {
            driver,
            bus,
            resources: FractalResources {
                fractal,
                target_view,
                blit,
                needs_render: true,
            },
            compositor,
            zoom_target: [-0.5, 0.0],
            zoom_radius: 1.5,
            cursor_px: [0.0, 0.0],
            dragging: false,
            size,
        })
    }

    fn make_target(gpu: &GpuContext, size: (u32, u32)) -> wgpu::TextureView {
        let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("fractal target"),
            size: wgpu::Extent3d {
                width: size.0.max(1),
                height: size.1.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: gpu.surface_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn pan(&mut self, dx: f32, dy: f32) {
        let scale = 2.0 * self.zoom_radius / self.size.1.max(1) as f32;
        self.zoom_target[0] -= dx * scale;
        self.zoom_target[1] += dy * scale;
        self.resources.needs_render = true;
    }

    /// Zoom toward the given surface pixel; positive delta zooms in.
    fn zoom(&mut self, at_px: [f32; 2], delta: f32) {
        let (w, h) = (self.size.0.max(1) as f32, self.size.1.max(1) as f32);
        let mut t = [at_px[0] / w, 1.0 - at_px[1] / h];
        t = [
            (t[0] - 0.5) * 2.0 * self.zoom_radius * (w / h) + self.zoom_target[0],
            (t[1] - 0.5) * 2.0 * self.zoom_radius + self.zoom_target[1],
        ];

        self.zoom_radius *= 1.0 - delta;
        self.zoom_target = [
            self.zoom_target[0] + (t[0] - self.zoom_target[0]) * delta,
            self.zoom_target[1] + (t[1] - self.zoom_target[1]) * delta,
        ];
        self.resources.needs_render = true;
    }
}

impl Demo for FractalDemo {
    fn name(&self) -> &str {
        "Fractal"
    }

    fn driver(&mut self) -> &mut FrameDriver {
        &mut self.driver
    }

    fn bus(&mut self) -> &mut ParameterBus {
        &mut self.bus
    }

    fn apply_params(&mut self, _gpu: &GpuContext) -> Result<()> {
        if self.bus.changed("iterations")
            || self.bus.changed("antialiasing")
            || self.bus.changed("fractal")
        {
            self.resources.needs_render = true;
        }
        Ok(())
    }

    fn prepare(&mut self, gpu: &GpuContext, _plan: &TickPlan) {
        let (w, h) = self.size;
        let iterations = self.bus.number("iterations").unwrap_or(1000.0) as f32;
        let aa = self.bus.number("antialiasing").unwrap_or(2.0) as f32;
        let kind = self.bus.choice("fractal").unwrap_or(0);
        let julia = if kind >= 1 { JULIA_SETS[kind - 1] } else { [0.0, 0.0] };

        self.resources.fractal.write_uniforms(
            gpu.queue(),
            DisplayUniforms {
                viewport: [w as f32, h as f32],
                grid: self.zoom_target,
                knobs: [
                    self.zoom_radius,
                    iterations,
                    aa,
                    if kind >= 1 { 1.0 } else { 0.0 },
                    julia[0],
                    julia[1],
                    0.0,
                    0.0,
                ],
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
            a_is_current: true,
            viewport: gpu.surface_size(),
        };
        self.compositor.run(&mut self.resources, encoder, &ctx);
        Ok(())
    }

    fn build_ui(&mut self, ui: &imgui::Ui) {
        ui::settings_panel(ui, "Fractal", &mut self.bus);
    }

    fn on_resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        if self.size.1 > 0 {
            self.zoom_radius *= height as f32 / self.size.1 as f32;
        }
        self.size = (width, height);
        self.resources.target_view = Self::make_target(gpu, self.size);
        self.resources
            .blit
            .retarget(gpu.device(), &self.resources.target_view);
        self.resources.needs_render = true;
    }

    fn on_cursor(&mut self, x: f32, y: f32) {
        if self.dragging {
            let dx = x - self.cursor_px[0];
            let dy = y - self.cursor_px[1];
            self.pan(dx, dy);
        }
        self.cursor_px = [x, y];
    }

    fn on_mouse_button(&mut self, pressed: bool) {
        self.dragging = pressed;
    }

    fn on_scroll(&mut self, delta: f32) {
        let zoom_delta = (0.1 * delta).clamp(-0.5, 0.5);
        let at = self.cursor_px;
        self.zoom(at, zoom_delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardioid_interior_never_escapes() {
        assert_eq!(mandelbrot_iterations([0.0, 0.0], 500), 500);
        assert_eq!(mandelbrot_iterations([-0.1, 0.1], 500), 500);
    }

    #[test]
    fn far_points_escape_immediately() {
        assert!(mandelbrot_iterations([2.0, 2.0], 500) <= 2);
    }

    #[test]
    fn julia_matches_mandelbrot_at_zero_seed() {
        let c = [0.3, 0.2];
        assert_eq!(
            escape_iterations([0.0, 0.0], c, ESCAPE_RADIUS, 300),
            mandelbrot_iterations(c, 300)
        );
    }

    #[test]
    fn color_ramp_is_finite_and_non_negative() {
        for max in [10u32, 100, 1000] {
            for i in 0..=max {
                let c = fractal_color(i, max);
                assert!(c.iter().all(|v| v.is_finite() && *v >= 0.0));
            }
        }
    }
}
