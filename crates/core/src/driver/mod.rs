//! Animation driver: owns every pool and turns one audio frame into one
//! display list per tick.

use std::ops::ControlFlow;

use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info, trace};

use crate::{
    audio::{AudioFrame, AudioSource},
    config::VisualConfig,
    mapping::ParameterMapper,
    particles::ParticlePool,
    perf::{PerformanceGovernor, PerformanceShift},
    render::{Layer, LayerPainter, RenderCommands},
    scene::{ModeState, OverlayContext, VisualizerMode},
    timeline::{FrameClock, FramePacer},
    EnergySummary, Result,
};

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No session running or no audio yet. Nothing was drawn.
    Skipped,
    Rendered(RenderCommands),
}

/// Mutable state carried from one tick to the next.
#[derive(Debug, Clone)]
pub struct AnimationState {
    pub particles: ParticlePool,
    pub mode: ModeState,
    pub governor: PerformanceGovernor,
    pub clock: FrameClock,
}

impl AnimationState {
    /// Creates empty pools for `mode`.
    pub fn new(config: &VisualConfig, mode: VisualizerMode) -> Self {
        Self {
            particles: ParticlePool::new(config.particles.capacity),
            mode: ModeState::new(mode, config),
            governor: PerformanceGovernor::new(config.performance.clone()),
            clock: FrameClock::new(),
        }
    }

    /// Back to a clean slate for a new session. Rain columns are kept.
    fn clear_session(&mut self) {
        self.particles.clear();
        self.mode.clear_session();
        self.clock.reset();
        self.governor.reset_window();
    }
}

/// Counters returned by [`Visualizer::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub ticks: u64,
    pub rendered: u64,
    pub skipped: u64,
    /// Frame shown once the session has ended.
    pub standby: RenderCommands,
}

/// Animation driver. Owns the pools, the random source and the listening flag,
/// and turns audio frames into display lists one tick at a time.
#[derive(Debug)]
pub struct Visualizer {
    config: VisualConfig,
    mapper: ParameterMapper,
    state: AnimationState,
    rng: StdRng,
    width: f32,
    height: f32,
    listening: bool,
}

impl Visualizer {
    /// A `seed` makes every stochastic policy reproducible.
    pub fn new(config: VisualConfig, mode: VisualizerMode, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            mapper: ParameterMapper::new(config.core.clone()),
            state: AnimationState::new(&config, mode),
            config,
            rng,
            width: 0.0,
            height: 0.0,
            listening: false,
        }
    }

    /// Returns the active visualizer variant.
    pub fn mode(&self) -> VisualizerMode {
        self.state.mode.mode()
    }

    /// Returns the state carried between ticks.
    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Logical canvas size. Rain columns are rebuilt only when it changes.
    pub fn resize(&mut self, width: f32, height: f32) {
        if width == self.width && height == self.height {
            return;
        }
        debug!(width, height, "resizing visualizer");
        self.width = width;
        self.height = height;
        self.state.mode.resize(&mut self.rng, width, height);
    }

    /// Starts a listening session with empty particle, ripple and glyph pools.
    pub fn start(&mut self) {
        self.state.clear_session();
        self.listening = true;
        info!(mode = ?self.mode(), "listening session started");
    }

    /// Ends the session, empties the pools and returns the standby frame.
    pub fn stop(&mut self) -> RenderCommands {
        if self.listening {
            info!(mode = ?self.mode(), "listening session stopped");
        }
        self.listening = false;
        self.state.clear_session();
        self.standby_frame()
    }

    /// Placeholder frame for the current mode. Reads no pool state.
    pub fn standby_frame(&self) -> RenderCommands {
        self.mode().standby_frame(self.width, self.height)
    }

    /// Advances the animation by one tick at wall-clock `now_ms`.
    pub fn tick(&mut self, frame: Option<AudioFrame<'_>>, now_ms: f64) -> TickOutcome {
        if !self.listening {
            return TickOutcome::Skipped;
        }
        let Some(frame) = frame else {
            trace!("no audio frame yet, skipping tick");
            return TickOutcome::Skipped;
        };

        let delta_ms = self.state.clock.delta(now_ms);
        let energy = EnergySummary::measure(frame.frequency, &self.config.bands);
        trace!(
            bass = energy.bass,
            mid = energy.mid,
            overall = energy.overall,
            delta_ms,
            "tick"
        );

        let params = self.mapper.evaluate(&energy, now_ms);
        let painter = LayerPainter::new(&params, self.width, self.height);
        let low = self.state.governor.is_low();
        let state = &mut self.state;
        let rng = &mut self.rng;
        let mut commands = RenderCommands::new();

        painter.background(&mut commands);

        commands.begin(Layer::Particles);
        state.particles.advance(delta_ms);
        state.particles.draw(&mut commands);

        painter.core(rng, &mut state.particles, &mut commands);

        let bar_count = if low {
            self.config.bars.degraded_count
        } else {
            self.config.bars.count
        };
        painter.bars(rng, frame.frequency, bar_count, &mut state.particles, &mut commands);
        painter.waveform(frame.time_domain, &mut commands);
        painter.flash(&mut commands);

        let overlay = OverlayContext {
            energy,
            now_ms,
            delta_ms,
            width: self.width,
            height: self.height,
        };
        state.mode.update(rng, &overlay, &mut commands);

        if low {
            state
                .particles
                .retain_recent(self.config.particles.low_performance_budget);
        }
        if state.governor.record_frame(now_ms) == PerformanceShift::EnteredLow {
            state.mode.degrade();
        }

        TickOutcome::Rendered(commands)
    }

    /// Runs a whole session: ticks once per pacer frame while `source` keeps
    /// listening and hands every rendered frame to `sink`. The sink can end
    /// the session early by returning [`ControlFlow::Break`].
    pub fn run<S, P, F>(&mut self, source: &mut S, pacer: &mut P, mut sink: F) -> Result<RunReport>
    where
        S: AudioSource + ?Sized,
        P: FramePacer + ?Sized,
        F: FnMut(&RenderCommands) -> Result<ControlFlow<()>>,
    {
        self.start();
        let mut ticks = 0;
        let mut rendered = 0;
        let mut skipped = 0;

        while self.listening && source.is_listening() {
            let now_ms = pacer.next_frame();
            ticks += 1;
            match self.tick(source.pull(), now_ms) {
                TickOutcome::Skipped => skipped += 1,
                TickOutcome::Rendered(commands) => {
                    rendered += 1;
                    if sink(&commands)?.is_break() {
                        break;
                    }
                }
            }
        }

        source.stop();
        let standby = self.stop();
        debug!(ticks, rendered, skipped, "session finished");
        Ok(RunReport {
            ticks,
            rendered,
            skipped,
            standby,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::DrawCommand;

    struct Scripted {
        frequency: Vec<u8>,
        time_domain: Vec<u8>,
        remaining: usize,
        warmup: usize,
        stopped: bool,
    }

    impl Scripted {
        fn loud(ticks: usize) -> Self {
            Self {
                frequency: vec![230; 1024],
                time_domain: (0..2048).map(|index| (index % 256) as u8).collect(),
                remaining: ticks,
                warmup: 0,
                stopped: false,
            }
        }
    }

    impl AudioSource for Scripted {
        fn is_listening(&self) -> bool {
            self.remaining > 0
        }

        fn pull(&mut self) -> Option<AudioFrame<'_>> {
            self.remaining = self.remaining.saturating_sub(1);
            if self.warmup > 0 {
                self.warmup -= 1;
                return None;
            }
            Some(AudioFrame {
                frequency: &self.frequency,
                time_domain: &self.time_domain,
            })
        }

        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    fn visualizer(mode: VisualizerMode) -> Visualizer {
        let mut visualizer = Visualizer::new(VisualConfig::default(), mode, Some(42));
        visualizer.resize(600.0, 400.0);
        visualizer
    }

    fn loud_frame(source: &Scripted) -> AudioFrame<'_> {
        AudioFrame {
            frequency: &source.frequency,
            time_domain: &source.time_domain,
        }
    }

    #[test]
    fn skips_without_session_or_audio() {
        let source = Scripted::loud(1);
        let mut visualizer = visualizer(VisualizerMode::DigitalRain);
        assert_eq!(visualizer.tick(Some(loud_frame(&source)), 0.0), TickOutcome::Skipped);

        visualizer.start();
        assert_eq!(visualizer.tick(None, 0.0), TickOutcome::Skipped);
        assert!(visualizer.state().particles.is_empty());
    }

    #[test]
    fn layers_arrive_in_compositing_order() {
        let source = Scripted::loud(1);
        for mode in [VisualizerMode::DigitalRain, VisualizerMode::RippleGlyph] {
            let mut visualizer = visualizer(mode);
            visualizer.start();
            let TickOutcome::Rendered(commands) =
                visualizer.tick(Some(loud_frame(&source)), 16.0)
            else {
                panic!("expected a rendered frame");
            };

            let layers: Vec<Layer> = commands.iter().map(|entry| entry.layer).collect();
            assert!(layers.windows(2).all(|pair| pair[0] <= pair[1]));
            assert_eq!(layers.first(), Some(&Layer::Background));
            assert_eq!(layers.last(), Some(&Layer::Overlay));
            assert_eq!(commands.in_layer(Layer::Flash).count(), 1);
            assert_eq!(commands.in_layer(Layer::Waveform).count(), 1);
        }
    }

    #[test]
    fn particle_pool_never_exceeds_its_cap() {
        let source = Scripted::loud(1);
        let mut visualizer = visualizer(VisualizerMode::DigitalRain);
        visualizer.start();
        for tick in 0..400 {
            // 60 fps keeps the governor out of low-performance mode.
            visualizer.tick(Some(loud_frame(&source)), tick as f64 * 16.0);
            assert!(visualizer.state().particles.len() <= 200);
        }
        assert!(!visualizer.state().governor.is_low());
        assert!(!visualizer.state().particles.is_empty());
    }

    #[test]
    fn slow_ticks_degrade_the_scene_once() {
        let source = Scripted::loud(1);
        let mut visualizer = visualizer(VisualizerMode::DigitalRain);
        visualizer.start();
        let columns = |visualizer: &Visualizer| match &visualizer.state().mode {
            ModeState::DigitalRain { rain } => rain.len(),
            other => panic!("unexpected mode {other:?}"),
        };
        assert_eq!(columns(&visualizer), 40);

        let mut last = None;
        for tick in 0..60 {
            last = Some(visualizer.tick(Some(loud_frame(&source)), tick as f64 * 50.0));
        }
        assert!(visualizer.state().governor.is_low());
        // One thinning per transition, not per window.
        assert_eq!(columns(&visualizer), 20);
        assert!(visualizer.state().particles.len() <= 50);

        let Some(TickOutcome::Rendered(commands)) = last else {
            panic!("expected a rendered frame");
        };
        let lines = commands
            .in_layer(Layer::Bars)
            .filter(|command| matches!(command, DrawCommand::StrokeLine { .. }))
            .count();
        assert_eq!(lines, 64);
    }

    #[test]
    fn reversed_band_config_still_renders() {
        let source = Scripted::loud(1);
        let mut config = VisualConfig::default();
        config.bands.mid_start = 300;
        config.bands.mid_end = 100;
        let mut visualizer = Visualizer::new(config, VisualizerMode::DigitalRain, Some(7));
        visualizer.resize(600.0, 400.0);
        visualizer.start();

        let outcome = visualizer.tick(Some(loud_frame(&source)), 16.0);
        assert!(matches!(outcome, TickOutcome::Rendered(_)));
    }

    #[test]
    fn stopping_clears_the_session() {
        let source = Scripted::loud(1);
        let mut visualizer = visualizer(VisualizerMode::RippleGlyph);
        visualizer.start();
        for tick in 0..30 {
            visualizer.tick(Some(loud_frame(&source)), tick as f64 * 16.0);
        }
        assert!(!visualizer.state().particles.is_empty());

        let standby = visualizer.stop();
        assert!(!visualizer.is_listening());
        assert!(visualizer.state().particles.is_empty());
        match &visualizer.state().mode {
            ModeState::RippleGlyph { ripples, glyphs } => {
                assert!(ripples.is_empty());
                assert!(glyphs.is_empty());
            }
            other => panic!("unexpected mode {other:?}"),
        }
        assert_eq!(standby, visualizer.standby_frame());
        assert_eq!(standby, visualizer.stop());
    }

    #[test]
    fn run_drives_until_the_source_ends() {
        let mut source = Scripted::loud(12);
        source.warmup = 2;
        let mut pacer = crate::timeline::FixedStepPacer::new(60.0);
        let mut visualizer = visualizer(VisualizerMode::DigitalRain);
        let mut seen = 0;

        let report = visualizer
            .run(&mut source, &mut pacer, |commands| {
                assert!(!commands.is_empty());
                seen += 1;
                Ok(ControlFlow::Continue(()))
            })
            .unwrap();

        assert_eq!(report.ticks, 12);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.rendered, 10);
        assert_eq!(seen, 10);
        assert!(source.stopped);
        assert!(!visualizer.is_listening());
        assert_eq!(report.standby, visualizer.standby_frame());
    }

    #[test]
    fn sink_can_end_the_session() {
        let mut source = Scripted::loud(100);
        let mut pacer = crate::timeline::FixedStepPacer::new(60.0);
        let mut visualizer = visualizer(VisualizerMode::RippleGlyph);
        let mut seen = 0;
        let report = visualizer
            .run(&mut source, &mut pacer, |_| {
                seen += 1;
                Ok(if seen == 5 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                })
            })
            .unwrap();
        assert_eq!(report.rendered, 5);
        assert!(source.stopped);
    }
}
