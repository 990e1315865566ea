//! Windowing shell
//!
//! Owns the winit event loop and the per-frame sequence every demo shares:
//! tick the driver, apply pending parameters, let the demo record its step
//! and display passes, then overlay the settings UI and the frame stats.

use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes},
};

use crate::demo::Demo;
use crate::error::Result;
use crate::gfx::GpuContext;
use crate::performance::FrameMonitor;
use crate::ui::UiManager;

type DemoFactory = Box<dyn FnOnce(&GpuContext) -> Result<Box<dyn Demo>>>;

pub struct RippleApp {
    event_loop: Option<EventLoop<()>>,
    state: AppState,
}

struct AppState {
    title: String,
    factory: Option<DemoFactory>,
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    ui: Option<UiManager>,
    demo: Option<Box<dyn Demo>>,
    monitor: FrameMonitor,
}

impl RippleApp {
    /// Build the shell around a demo constructor; the demo itself is created
    /// once the window and GPU exist.
    pub fn new<D, F>(title: &str, build: F) -> Self
    where
        D: Demo + 'static,
        F: FnOnce(&GpuContext) -> Result<D> + 'static,
    {
        let event_loop = EventLoop::new().expect("failed to create event loop");
        Self {
            event_loop: Some(event_loop),
            state: AppState {
                title: title.to_string(),
                factory: Some(Box::new(move |gpu| {
                    build(gpu).map(|d| Box::new(d) as Box<dyn Demo>)
                })),
                window: None,
                gpu: None,
                ui: None,
                demo: None,
                monitor: FrameMonitor::new(),
            },
        }
    }

    /// Consumes self and runs until the window closes.
    pub fn run(mut self) {
        let event_loop = self.event_loop.take().expect("event loop already consumed");
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop
            .run_app(&mut self.state)
            .expect("failed to run event loop");
    }
}

impl AppState {
    fn redraw(&mut self) {
        let (Some(gpu), Some(ui), Some(demo), Some(window)) = (
            self.gpu.as_mut(),
            self.ui.as_mut(),
            self.demo.as_deref_mut(),
            self.window.as_ref(),
        ) else {
            return;
        };

        self.monitor.begin_frame();

        // Parameters flush every frame, before any pass runs. A paused or
        // not-yet-due driver must not hold restarts and color changes hostage.
        demo.bus().apply_pending();
        if let Err(err) = demo.apply_params(gpu) {
            log::error!("applying parameters failed: {err}");
        }

        let mut substeps = 0;
        if let Some(plan) = demo.driver().tick(Instant::now()) {
            demo.prepare(gpu, &plan);
            substeps = plan.substeps;
        }

        let Some(frame) = gpu.acquire_frame() else {
            return;
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame"),
            });

        if let Err(err) = demo.composite(gpu, &mut encoder, &view) {
            log::error!("compositing failed: {err}");
        }

        let monitor = &self.monitor;
        ui.draw(gpu.device(), gpu.queue(), &mut encoder, window, &view, |ui| {
            demo.build_ui(ui);
            monitor.render_overlay(ui);
        });

        gpu.queue().submit(std::iter::once(encoder.finish()));
        frame.present();

        self.monitor.end_frame(substeps);
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(self.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(1200, 800));
        let window = match event_loop.create_window(attributes) {
            Ok(w) => Arc::new(w),
            Err(err) => {
                log::error!("failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };
        let (width, height) = window.inner_size().into();

        let gpu = match pollster::block_on(GpuContext::new(window.clone(), width, height)) {
            Ok(gpu) => gpu,
            Err(err) => {
                log::error!("GPU bring-up failed: {err}");
                event_loop.exit();
                return;
            }
        };

        let ui = UiManager::new(gpu.device(), gpu.queue(), gpu.surface_format(), &window);

        let factory = self.factory.take().expect("demo factory already consumed");
        let mut demo = match factory(&gpu) {
            Ok(demo) => demo,
            Err(err) => {
                log::error!("demo setup failed: {err}");
                event_loop.exit();
                return;
            }
        };
        demo.driver().start();
        log::info!("{} initialized at {width}x{height}", demo.name());

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.ui = Some(ui);
        self.demo = Some(demo);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };

        // The UI gets first refusal on pointer input.
        if let Some(ui) = self.ui.as_mut() {
            let ui_event: winit::event::Event<()> = winit::event::Event::WindowEvent {
                window_id,
                event: event.clone(),
            };
            if ui.handle_input(&window, &ui_event) {
                window.request_redraw();
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if let winit::keyboard::PhysicalKey::Code(winit::keyboard::KeyCode::Escape) =
                    event.physical_key
                {
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(width, height);
                    if let Some(ui) = self.ui.as_mut() {
                        ui.update_display_size(width, height);
                    }
                    if let Some(demo) = self.demo.as_deref_mut() {
                        demo.on_resize(gpu, width, height);
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(demo) = self.demo.as_deref_mut() {
                    demo.on_cursor(position.x as f32, position.y as f32);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                if let Some(demo) = self.demo.as_deref_mut() {
                    demo.on_mouse_button(state == ElementState::Pressed);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
                };
                if let Some(demo) = self.demo.as_deref_mut() {
                    demo.on_scroll(lines);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::pipeline::{FrameDriver, ParamValue, ParameterBus};

    // Mirrors the redraw order: the bus flushes before the driver is asked
    // for a plan, so a paused demo still sees fresh values and fired actions.
    #[test]
    fn params_flush_even_when_driver_yields_no_plan() {
        let start = Instant::now();
        let mut driver = FrameDriver::new(Duration::from_millis(200));
        driver.start();
        driver.tick(start);
        driver.pause();

        let mut bus = ParameterBus::new();
        bus.register_color("color", "Color", [1.0, 0.0, 0.0]);
        bus.register_action("restart", "Restart");
        bus.apply_pending();

        bus.publish("color", ParamValue::Color([0.0, 1.0, 0.0]))
            .unwrap();
        bus.fire("restart").unwrap();

        bus.apply_pending();
        assert!(driver.tick(start + Duration::from_millis(16)).is_none());
        assert!(bus.changed("color"));
        assert!(bus.fired("restart"));
        assert_eq!(bus.color("color").unwrap(), [0.0, 1.0, 0.0]);
    }
}
