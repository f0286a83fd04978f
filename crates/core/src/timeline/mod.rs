use std::time::{Duration, Instant};

use crate::particles::REFERENCE_FRAME_MS;

/// Tracks the previous tick time and turns wall-clock timestamps into frame
/// deltas.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }

    /// Milliseconds since the previous call. The first call, and any call
    /// that does not move time forward, reports one reference frame.
    pub fn delta(&mut self, now_ms: f64) -> f32 {
        let delta = match self.last_ms {
            Some(last) if now_ms > last => (now_ms - last) as f32,
            _ => REFERENCE_FRAME_MS,
        };
        self.last_ms = Some(now_ms);
        delta
    }
}

/// Stand-in for the display refresh callback: hands out the timestamp of
/// the next tick.
pub trait FramePacer {
    fn next_frame(&mut self) -> f64;
}

/// Paces ticks against the real clock, sleeping off whatever is left of each
/// frame period.
#[derive(Debug)]
pub struct RealtimePacer {
    origin: Instant,
    period: Duration,
    deadline: Option<Instant>,
}

impl RealtimePacer {
    pub fn new(fps: f32) -> Self {
        Self {
            origin: Instant::now(),
            period: frame_period(fps),
            deadline: None,
        }
    }
}

impl FramePacer for RealtimePacer {
    fn next_frame(&mut self) -> f64 {
        let now = Instant::now();
        if let Some(deadline) = self.deadline {
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }
        let now = Instant::now();
        self.deadline = Some(now + self.period);
        now.duration_since(self.origin).as_secs_f64() * 1000.0
    }
}

/// Deterministic pacer for offline rendering: every call advances a virtual
/// clock by exactly one period.
#[derive(Debug, Clone)]
pub struct FixedStepPacer {
    now_ms: f64,
    step_ms: f64,
}

impl FixedStepPacer {
    pub fn new(fps: f32) -> Self {
        Self::starting_at(0.0, fps)
    }

    pub fn starting_at(start_ms: f64, fps: f32) -> Self {
        Self {
            now_ms: start_ms,
            step_ms: frame_period(fps).as_secs_f64() * 1000.0,
        }
    }

    pub fn step_ms(&self) -> f64 {
        self.step_ms
    }
}

impl FramePacer for FixedStepPacer {
    fn next_frame(&mut self) -> f64 {
        let now = self.now_ms;
        self.now_ms += self.step_ms;
        now
    }
}

fn frame_period(fps: f32) -> Duration {
    let fps = if fps.is_finite() && fps > 0.0 { fps } else { 60.0 };
    Duration::from_secs_f32(1.0 / fps)
}
