//! Frame-rate governor that flags low-performance mode.

use tracing::info;

use crate::config::PerformanceConfig;

/// Change reported by [`PerformanceGovernor::record_frame`] at the end of a
/// measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceShift {
    Unchanged,
    EnteredLow,
    Recovered,
}

/// Counts frames per wall-clock window and compares the rate against a
/// threshold.
#[derive(Debug, Clone)]
pub struct PerformanceGovernor {
    config: PerformanceConfig,
    window_start: Option<f64>,
    frames: u32,
    fps: u32,
    low: bool,
}

impl PerformanceGovernor {
    pub fn new(config: PerformanceConfig) -> Self {
        Self {
            config,
            window_start: None,
            frames: 0,
            fps: 0,
            low: false,
        }
    }

    /// Frames counted during the last complete window.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn is_low(&self) -> bool {
        self.low
    }

    /// Forgets the current window. The low flag survives, matching a canvas
    /// that stays degraded once thinned.
    pub fn reset_window(&mut self) {
        self.window_start = None;
        self.frames = 0;
    }

    /// Counts one frame rendered at `now_ms`. The frame that closes a window
    /// opens the next one.
    pub fn record_frame(&mut self, now_ms: f64) -> PerformanceShift {
        let Some(start) = self.window_start else {
            self.window_start = Some(now_ms);
            self.frames = 1;
            return PerformanceShift::Unchanged;
        };

        let elapsed = now_ms - start;
        if elapsed < self.config.window_ms {
            self.frames += 1;
            return PerformanceShift::Unchanged;
        }

        self.fps = (f64::from(self.frames) * 1000.0 / elapsed).round() as u32;
        self.frames = 1;
        self.window_start = Some(now_ms);

        let low = self.fps < self.config.low_fps_threshold;
        let shift = match (self.low, low) {
            (false, true) => PerformanceShift::EnteredLow,
            (true, false) => PerformanceShift::Recovered,
            _ => PerformanceShift::Unchanged,
        };
        if shift != PerformanceShift::Unchanged {
            info!(fps = self.fps, low, "performance mode changed");
        }
        self.low = low;
        shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(
        governor: &mut PerformanceGovernor,
        from_ms: f64,
        frames: usize,
        period_ms: f64,
    ) -> Vec<PerformanceShift> {
        (0..frames)
            .map(|index| governor.record_frame(from_ms + index as f64 * period_ms))
            .filter(|shift| *shift != PerformanceShift::Unchanged)
            .collect()
    }

    #[test]
    fn steady_sixty_stays_fast() {
        let mut governor = PerformanceGovernor::new(PerformanceConfig::default());
        let shifts = run(&mut governor, 0.0, 200, 1000.0 / 60.0);
        assert!(shifts.is_empty());
        assert!(!governor.is_low());
        assert!((59..=61).contains(&governor.fps()));
    }

    #[test]
    fn slow_frames_enter_then_leave_low_mode() {
        let mut governor = PerformanceGovernor::new(PerformanceConfig::default());
        let shifts = run(&mut governor, 0.0, 40, 50.0);
        assert_eq!(shifts, vec![PerformanceShift::EnteredLow]);
        assert!(governor.is_low());
        assert_eq!(governor.fps(), 20);

        let shifts = run(&mut governor, 2_000.0, 200, 1000.0 / 60.0);
        assert_eq!(shifts, vec![PerformanceShift::Recovered]);
        assert!(!governor.is_low());
    }

    #[test]
    fn nothing_is_decided_inside_the_first_window() {
        let mut governor = PerformanceGovernor::new(PerformanceConfig::default());
        let shifts = run(&mut governor, 0.0, 5, 100.0);
        assert!(shifts.is_empty());
        assert_eq!(governor.fps(), 0);
    }
}
