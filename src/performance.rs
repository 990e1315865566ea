//! Frame timing statistics and the ImGui overlay that shows them.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FrameStats {
    pub fps: f32,
    pub frame_time_ms: f32,
    pub min_frame_time_ms: f32,
    pub max_frame_time_ms: f32,
    /// Simulation substeps executed last frame.
    pub substeps: u32,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            fps: 0.0,
            frame_time_ms: 0.0,
            min_frame_time_ms: f32::MAX,
            max_frame_time_ms: 0.0,
            substeps: 0,
        }
    }
}

/// Rolling frame-time monitor. Keeps a ring of recent samples and
/// recomputes the derived stats at a fixed cadence so the overlay text
/// doesn't flicker every frame.
pub struct FrameMonitor {
    frame_times: VecDeque<Duration>,
    max_samples: usize,
    frame_start: Option<Instant>,
    stats: FrameStats,
    last_update: Instant,
    update_interval: Duration,
}

impl FrameMonitor {
    pub fn new() -> Self {
        Self {
            // ~2 seconds at 60fps
            frame_times: VecDeque::with_capacity(120),
            max_samples: 120,
            frame_start: None,
            stats: FrameStats::default(),
            last_update: Instant::now(),
            update_interval: Duration::from_millis(100),
        }
    }

    pub fn begin_frame(&mut self) {
        self.frame_start = Some(Instant::now());
    }

    pub fn end_frame(&mut self, substeps: u32) {
        if let Some(start) = self.frame_start.take() {
            let frame_time = start.elapsed();
            if self.frame_times.len() >= self.max_samples {
                self.frame_times.pop_front();
            }
            self.frame_times.push_back(frame_time);
            self.stats.substeps = substeps;

            if self.last_update.elapsed() >= self.update_interval {
                self.recompute();
                self.last_update = Instant::now();
            }
        }
    }

    fn recompute(&mut self) {
        if self.frame_times.is_empty() {
            return;
        }

        let total: Duration = self.frame_times.iter().sum();
        let avg_ms = (total / self.frame_times.len() as u32).as_secs_f32() * 1000.0;
        self.stats.frame_time_ms = avg_ms;
        self.stats.fps = if avg_ms > 0.0 { 1000.0 / avg_ms } else { 0.0 };

        if let (Some(min), Some(max)) = (self.frame_times.iter().min(), self.frame_times.iter().max())
        {
            self.stats.min_frame_time_ms = min.as_secs_f32() * 1000.0;
            self.stats.max_frame_time_ms = max.as_secs_f32() * 1000.0;
        }
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn reset(&mut self) {
        self.frame_times.clear();
        self.stats = FrameStats::default();
    }

    /// Small always-on-top corner overlay.
    pub fn render_overlay(&self, ui: &imgui::Ui) {
        ui.window("frame stats")
            .position([10.0, 460.0], imgui::Condition::FirstUseEver)
            .size([200.0, 110.0], imgui::Condition::FirstUseEver)
            .no_decoration()
            .bg_alpha(0.6)
            .build(|| {
                ui.text(format!("FPS:   {:.1}", self.stats.fps));
                ui.text(format!("frame: {:.2} ms", self.stats.frame_time_ms));
                ui.text(format!(
                    "range: {:.2} / {:.2} ms",
                    self.stats.min_frame_time_ms, self.stats.max_frame_time_ms
                ));
                ui.text(format!("substeps: {}", self.stats.substeps));
            });
    }
}

impl Default for FrameMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_reflect_recorded_frames() {
        let mut monitor = FrameMonitor::new();
        monitor.begin_frame();
        std::thread::sleep(Duration::from_millis(2));
        monitor.end_frame(20);
        monitor.recompute();

        let stats = monitor.stats();
        assert!(stats.frame_time_ms >= 2.0);
        assert!(stats.fps > 0.0);
        assert_eq!(stats.substeps, 20);
    }

    #[test]
    fn ring_is_bounded() {
        let mut monitor = FrameMonitor::new();
        for _ in 0..300 {
            monitor.begin_frame();
            monitor.end_frame(1);
        }
        assert!(monitor.frame_times.len() <= monitor.max_samples);
    }
}
