//! Per-demo animation loop state
//!
//! The driver owns the wall clock: it measures the elapsed time each tick,
//! clamps it so a backgrounded tab cannot produce one huge step, optionally
//! splits it into equal sub-steps, and decides whether a decoupled
//! fixed-interval simulation is due this frame. Scheduling itself stays with
//! the host (the window's redraw request); the driver only turns "a frame is
//! happening now" into a step plan.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
    Paused,
    /// Terminal; a stopped driver never yields another plan.
    Stopped,
}

/// What one tick should do: issue `substeps` swap+compute+composite cycles
/// of `substep_delta` simulated seconds each.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickPlan {
    pub substep_delta: f32,
    pub substeps: u32,
}

impl TickPlan {
    pub fn total_delta(&self) -> f32 {
        self.substep_delta * self.substeps as f32
    }
}

pub struct FrameDriver {
    state: DriverState,
    last_tick: Option<Instant>,
    max_delta: Duration,
    substeps: u32,
    /// Decoupled update rate: step only once this much time has accumulated.
    /// `None` steps every displayed frame.
    interval: Option<Duration>,
    accumulated: Duration,
    sim_time: f64,
}

impl FrameDriver {
    pub fn new(max_delta: Duration) -> Self {
        Self {
            state: DriverState::Idle,
            last_tick: None,
            max_delta,
            substeps: 1,
            interval: None,
            accumulated: Duration::ZERO,
            sim_time: 0.0,
        }
    }

    pub fn with_substeps(mut self, substeps: u32) -> Self {
        self.set_substeps(substeps);
        self
    }

    pub fn with_interval(mut self, interval: Option<Duration>) -> Self {
        self.interval = interval;
        self
    }

    pub fn set_substeps(&mut self, substeps: u32) {
        self.substeps = substeps.max(1);
    }

    pub fn set_interval(&mut self, interval: Option<Duration>) {
        self.interval = interval;
        self.accumulated = Duration::ZERO;
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == DriverState::Running
    }

    /// Total simulated seconds so far; the time uniform demos read.
    pub fn sim_time(&self) -> f32 {
        self.sim_time as f32
    }

    pub fn start(&mut self) {
        if self.state == DriverState::Stopped {
            return;
        }
        // Dropping the last timestamp keeps the first delta after a start or
        // resume at zero instead of spanning the pause.
        self.last_tick = None;
        self.state = DriverState::Running;
    }

    pub fn pause(&mut self) {
        if self.state == DriverState::Running {
            self.state = DriverState::Paused;
        }
    }

    pub fn set_running(&mut self, running: bool) {
        if running {
            self.start();
        } else {
            self.pause();
        }
    }

    /// Prevents any further plan from the next tick onward. Work already
    /// issued to the GPU queue is not preempted.
    pub fn stop(&mut self) {
        self.state = DriverState::Stopped;
        log::debug!("frame driver stopped at sim time {:.3}s", self.sim_time);
    }

    /// Measure elapsed wall time and return this tick's step plan, or `None`
    /// when not running or when a fixed-interval simulation is not yet due.
    pub fn tick(&mut self, now: Instant) -> Option<TickPlan> {
        if self.state != DriverState::Running {
            return None;
        }

        let elapsed = match self.last_tick {
            Some(t0) => now.saturating_duration_since(t0),
            None => Duration::ZERO,
        };
        self.last_tick = Some(now);

        if let Some(interval) = self.interval {
            self.accumulated += elapsed;
            if self.accumulated < interval {
                return None;
            }
            // Keep the remainder but never more than one interval of debt,
            // so a long stall fires a single step, not a burst.
            self.accumulated = (self.accumulated - interval).min(interval);
            let delta = interval.as_secs_f32();
            self.sim_time += delta as f64;
            return Some(TickPlan {
                substep_delta: delta,
                substeps: 1,
            });
        }

        let clamped = elapsed.min(self.max_delta).as_secs_f32();
        self.sim_time += clamped as f64;
        Some(TickPlan {
            substep_delta: clamped / self.substeps as f32,
            substeps: self.substeps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn first_tick_after_start_is_zero_delta() {
        let mut driver = FrameDriver::new(ms(200));
        driver.start();
        let plan = driver.tick(Instant::now()).unwrap();
        assert_eq!(plan.total_delta(), 0.0);
    }

    #[test]
    fn delta_is_exact_below_the_clamp_and_clamped_above() {
        let mut driver = FrameDriver::new(ms(200));
        driver.start();
        let t0 = Instant::now();
        driver.tick(t0);

        let plan = driver.tick(t0 + ms(16)).unwrap();
        assert!((plan.total_delta() - 0.016).abs() < 1e-6);

        // 5 s stall clamps to 200 ms.
        let plan = driver.tick(t0 + ms(16) + ms(5000)).unwrap();
        assert!((plan.total_delta() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn substep_deltas_sum_to_the_clamped_delta() {
        let mut driver = FrameDriver::new(ms(60)).with_substeps(20);
        driver.start();
        let t0 = Instant::now();
        driver.tick(t0);

        let plan = driver.tick(t0 + ms(40)).unwrap();
        assert_eq!(plan.substeps, 20);
        let sum = plan.substep_delta * plan.substeps as f32;
        assert!((sum - 0.040).abs() < 1e-5);
    }

    #[test]
    fn fixed_interval_fires_only_once_due() {
        let mut driver = FrameDriver::new(ms(200)).with_interval(Some(ms(100)));
        driver.start();
        let t0 = Instant::now();
        driver.tick(t0);

        assert!(driver.tick(t0 + ms(40)).is_none());
        assert!(driver.tick(t0 + ms(80)).is_none());
        let plan = driver.tick(t0 + ms(110)).unwrap();
        assert_eq!(plan.substeps, 1);
        assert!((plan.substep_delta - 0.1).abs() < 1e-6);
        // Remainder carries over but the next step still waits.
        assert!(driver.tick(t0 + ms(120)).is_none());
    }

    #[test]
    fn fixed_interval_never_bursts_after_a_stall() {
        let mut driver = FrameDriver::new(ms(200)).with_interval(Some(ms(50)));
        driver.start();
        let t0 = Instant::now();
        driver.tick(t0);

        assert!(driver.tick(t0 + ms(2000)).is_some());
        // Debt is capped at one interval: the very next frame fires once
        // more, then the driver waits again.
        assert!(driver.tick(t0 + ms(2001)).is_some());
        assert!(driver.tick(t0 + ms(2002)).is_none());
    }

    #[test]
    fn pause_resume_does_not_span_the_pause() {
        let mut driver = FrameDriver::new(ms(200));
        driver.start();
        let t0 = Instant::now();
        driver.tick(t0);
        driver.pause();
        assert!(driver.tick(t0 + ms(16)).is_none());

        driver.start();
        let plan = driver.tick(t0 + ms(10_000)).unwrap();
        assert_eq!(plan.total_delta(), 0.0);
    }

    #[test]
    fn stopped_is_terminal() {
        let mut driver = FrameDriver::new(ms(200));
        driver.start();
        driver.stop();
        assert_eq!(driver.state(), DriverState::Stopped);
        assert!(driver.tick(Instant::now()).is_none());
        driver.start();
        assert!(driver.tick(Instant::now()).is_none());
    }
}
