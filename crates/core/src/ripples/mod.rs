//! Expanding neon rings spawned by bass and mid hits.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use rand::Rng;

use crate::{
    config::RippleConfig,
    energy::Dominance,
    render::{Color, DrawCommand, Glow, Point, RenderCommands},
    EnergySummary,
};

const SPAWN_RADIUS: f32 = 5.0;
const GLOW_POINTS: usize = 12;
/// Stand-in for "long ago" when the pool holds no ripple yet.
const IDLE_GAP_MS: f64 = 1000.0;

/// Expanding ring. Spent once `radius` reaches `max_radius`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ripple {
    pub radius: f32,
    pub max_radius: f32,
    pub line_width: f32,
    pub hue: f32,
    pub speed: f32,
    pub start_ms: f64,
}

impl Ripple {
    pub fn new(max_radius: f32, speed: f32) -> Self {
        Self {
            radius: 0.0,
            max_radius,
            line_width: 3.0,
            hue: 200.0,
            speed,
            start_ms: 0.0,
        }
    }

    /// Fades linearly from 1 at the centre to 0 at `max_radius`.
    pub fn alpha(&self) -> f32 {
        if self.max_radius <= 0.0 {
            return 0.0;
        }
        (1.0 - self.radius / self.max_radius).max(0.0)
    }

    pub fn is_spent(&self) -> bool {
        self.radius >= self.max_radius
    }
}

/// Size tier a spawn lands in, chosen from the blended ripple energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseTier {
    Quiet,
    Medium,
    Loud,
}

impl PulseTier {
    pub fn classify(factor: f32) -> Self {
        if factor < 0.25 {
            Self::Quiet
        } else if factor < 0.6 {
            Self::Medium
        } else {
            Self::Loud
        }
    }

    /// `(radius ratio, speed factor)` interpolated inside the tier.
    fn scale(self, factor: f32) -> (f32, f32) {
        match self {
            Self::Quiet => {
                let t = factor / 0.25;
                (0.1 + t * 0.1, 0.6 + t * 0.4)
            }
            Self::Medium => {
                let t = (factor - 0.25) / 0.35;
                (0.2 + t * 0.15, 1.0 + t * 0.5)
            }
            Self::Loud => {
                let t = ((factor - 0.6) / 0.4).min(1.0);
                (0.35 + t * 0.15, 1.5 + t * 0.8)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RipplePool {
    config: RippleConfig,
    ripples: VecDeque<Ripple>,
}

impl RipplePool {
    pub fn new(config: RippleConfig) -> Self {
        Self {
            ripples: VecDeque::with_capacity(config.capacity),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.ripples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ripples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ripple> {
        self.ripples.iter()
    }

    pub fn clear(&mut self) {
        self.ripples.clear();
    }

    /// Appends a ripple, evicting the oldest once over capacity.
    pub fn push(&mut self, ripple: Ripple) {
        self.ripples.push_back(ripple);
        while self.ripples.len() > self.config.capacity {
            self.ripples.pop_front();
        }
    }

    /// Spacing the next spawn must respect. Louder input shortens it.
    pub fn min_interval_ms(&self, energy: &EnergySummary) -> f64 {
        let interval =
            self.config.base_interval_ms - f64::from(energy.overall) * self.config.interval_energy_gain;
        interval.max(0.0)
    }

    /// Spawns a ripple when bass or mid is over threshold and the newest
    /// ripple is old enough. `extent` is the shorter canvas side.
    pub fn maybe_spawn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        energy: &EnergySummary,
        now_ms: f64,
        extent: f32,
    ) -> bool {
        let triggered =
            energy.bass > self.config.bass_threshold || energy.mid > self.config.mid_threshold;
        let since_last = self
            .ripples
            .back()
            .map_or(IDLE_GAP_MS, |ripple| now_ms - ripple.start_ms);
        if !triggered || since_last <= self.min_interval_ms(energy) {
            return false;
        }

        let factor = energy.ripple_factor();
        let (ratio, speed_factor) = PulseTier::classify(factor).scale(factor);
        let jitter = rng.gen_range(-0.025..0.025);

        let hue = match energy.dominance() {
            Dominance::StrongBass => rng.gen_range(240.0..280.0),
            Dominance::StrongMid => rng.gen_range(120.0..180.0),
            Dominance::BassLeaning => rng.gen_range(180.0..240.0),
            Dominance::Neutral => rng.gen_range(20.0..60.0),
        };

        self.push(Ripple {
            radius: SPAWN_RADIUS,
            max_radius: extent * (ratio + jitter),
            line_width: 2.5 + energy.bass * 4.0 + energy.mid * 2.0,
            hue,
            speed: (1.0 + factor * 2.5) * speed_factor,
            start_ms: now_ms,
        });
        true
    }

    /// Keeps the scene moving when nothing has spawned yet.
    pub fn ensure_one(&mut self, now_ms: f64, extent: f32) {
        if self.ripples.is_empty() {
            self.ripples.push_back(Ripple {
                radius: 10.0,
                max_radius: extent * 0.3,
                line_width: 3.0,
                hue: 200.0,
                speed: 2.0,
                start_ms: now_ms,
            });
        }
    }

    /// Grows every ripple by its speed and drops the ones that reached
    /// their maximum radius.
    pub fn advance(&mut self) {
        self.ripples.retain_mut(|ripple| {
            ripple.radius += ripple.speed;
            !ripple.is_spent()
        });
    }

    /// Stroked rings with a layered glow, widest blur outside and the
    /// sharpest line inside.
    pub fn draw(&self, center: Point, commands: &mut RenderCommands) {
        for ripple in &self.ripples {
            let alpha = ripple.alpha();
            let life = 1.0 - alpha;
            let glow_gain = 1.2 + alpha * 0.4;
            let outer_width = ripple.line_width * (1.0 - life * 0.7) * 1.2;

            commands.push(DrawCommand::StrokeCircle {
                center,
                radius: ripple.radius,
                width: outer_width,
                color: Color::rgba(255, 255, 255, alpha),
                glow: Some(Glow::new(
                    Color::hsla(ripple.hue, 100.0, 70.0, alpha * 1.2),
                    35.0 * alpha * glow_gain,
                )),
            });

            let middle_width = outer_width * 0.7;
            commands.push(DrawCommand::StrokeCircle {
                center,
                radius: ripple.radius,
                width: middle_width,
                color: Color::hsla(ripple.hue, 30.0, 90.0, alpha * 0.9),
                glow: Some(Glow::new(
                    Color::hsla(ripple.hue, 100.0, 75.0, alpha * 1.3),
                    20.0 * alpha * glow_gain,
                )),
            });

            if alpha > 0.3 {
                commands.push(DrawCommand::StrokeCircle {
                    center,
                    radius: ripple.radius,
                    width: middle_width * 0.4,
                    color: Color::hsla(ripple.hue, 50.0, 95.0, alpha * 1.1),
                    glow: Some(Glow::new(
                        Color::hsla(ripple.hue, 100.0, 80.0, alpha * 1.4),
                        15.0,
                    )),
                });
            }

            if alpha > 0.5 {
                let point_radius = ripple.line_width * 0.8;
                for index in 0..GLOW_POINTS {
                    let angle = index as f32 / GLOW_POINTS as f32 * TAU;
                    commands.push(DrawCommand::FillCircle {
                        center: center.polar(angle, ripple.radius),
                        radius: point_radius,
                        color: Color::hsla(ripple.hue, 100.0, 85.0, alpha * 1.3),
                        glow: Some(Glow::new(Color::hsla(ripple.hue, 100.0, 80.0, alpha), 10.0)),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn pool() -> RipplePool {
        RipplePool::new(RippleConfig::default())
    }

    fn energy(bass: f32, mid: f32, overall: f32) -> EnergySummary {
        EnergySummary { bass, mid, overall }
    }

    #[test]
    fn ripple_is_removed_after_exactly_twenty_ticks() {
        let mut pool = pool();
        pool.push(Ripple::new(100.0, 5.0));

        for tick in 1..20 {
            pool.advance();
            assert_eq!(pool.len(), 1, "ripple vanished early at tick {tick}");
            assert_eq!(pool.iter().next().unwrap().radius, tick as f32 * 5.0);
        }
        pool.advance();
        assert!(pool.is_empty());
    }

    #[test]
    fn alpha_tracks_radius() {
        let mut pool = pool();
        pool.push(Ripple::new(100.0, 5.0));
        let mut last = f32::INFINITY;
        loop {
            let Some(ripple) = pool.iter().next().cloned() else {
                break;
            };
            let alpha = ripple.alpha();
            assert_eq!(alpha, (1.0 - ripple.radius / ripple.max_radius).max(0.0));
            assert!(alpha < last);
            last = alpha;
            pool.advance();
        }
    }

    #[test]
    fn overshooting_ripple_reports_zero_alpha() {
        let mut ripple = Ripple::new(10.0, 4.0);
        ripple.radius = 12.0;
        assert_eq!(ripple.alpha(), 0.0);
        assert!(ripple.is_spent());
    }

    #[test]
    fn spawn_requires_energy_and_spacing() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = pool();

        assert!(!pool.maybe_spawn(&mut rng, &energy(0.01, 0.01, 0.01), 0.0, 500.0));
        assert!(pool.maybe_spawn(&mut rng, &energy(0.5, 0.2, 0.2), 0.0, 500.0));
        // overall 0.2 -> interval 170 ms
        assert!(!pool.maybe_spawn(&mut rng, &energy(0.5, 0.2, 0.2), 150.0, 500.0));
        assert!(pool.maybe_spawn(&mut rng, &energy(0.5, 0.2, 0.2), 171.0, 500.0));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn louder_input_shortens_the_interval() {
        let pool = pool();
        assert_eq!(pool.min_interval_ms(&energy(0.0, 0.0, 0.0)), 200.0);
        assert_eq!(pool.min_interval_ms(&energy(0.0, 0.0, 1.0)), 50.0);
    }

    #[test]
    fn pool_evicts_oldest_beyond_capacity() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut pool = pool();
        for step in 0..15 {
            let now = step as f64 * 1_000.0;
            assert!(pool.maybe_spawn(&mut rng, &energy(0.3, 0.3, 0.3), now, 400.0));
        }
        assert_eq!(pool.len(), 10);
        assert_eq!(pool.iter().next().unwrap().start_ms, 5_000.0);
    }

    #[test]
    fn tiers_bucket_sizes() {
        assert_eq!(PulseTier::classify(0.1), PulseTier::Quiet);
        assert_eq!(PulseTier::classify(0.25), PulseTier::Medium);
        assert_eq!(PulseTier::classify(0.9), PulseTier::Loud);

        let mut rng = StdRng::seed_from_u64(3);
        let mut quiet = pool();
        quiet.maybe_spawn(&mut rng, &energy(0.1, 0.0, 0.0), 0.0, 1000.0);
        let ripple = quiet.iter().next().unwrap();
        assert!((85.0..=140.0).contains(&ripple.max_radius));

        let mut loud = pool();
        loud.maybe_spawn(&mut rng, &energy(1.0, 1.0, 1.0), 0.0, 1000.0);
        let ripple = loud.iter().next().unwrap();
        assert!((475.0..=525.0).contains(&ripple.max_radius));
        assert!((ripple.speed - 3.5 * 2.3).abs() < 1e-4);
    }

    #[test]
    fn hue_follows_dominant_band() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut pool = pool();
        pool.maybe_spawn(&mut rng, &energy(0.6, 0.1, 0.2), 0.0, 400.0);
        pool.maybe_spawn(&mut rng, &energy(0.2, 0.5, 0.2), 1_000.0, 400.0);
        pool.maybe_spawn(&mut rng, &energy(0.0, 0.2, 0.1), 2_000.0, 400.0);

        let hues: Vec<f32> = pool.iter().map(|ripple| ripple.hue).collect();
        assert!((240.0..280.0).contains(&hues[0]));
        assert!((120.0..180.0).contains(&hues[1]));
        assert!((20.0..60.0).contains(&hues[2]));
    }

    #[test]
    fn empty_pool_gets_a_default_ripple() {
        let mut pool = pool();
        pool.ensure_one(42.0, 600.0);
        assert_eq!(pool.len(), 1);
        assert!((pool.iter().next().unwrap().max_radius - 180.0).abs() < 1e-3);

        pool.ensure_one(43.0, 600.0);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn fresh_ripple_draws_rings_and_points() {
        let mut pool = pool();
        pool.push(Ripple::new(100.0, 5.0));
        pool.advance();
        let mut commands = RenderCommands::new();
        pool.draw(Point::ORIGIN, &mut commands);
        assert_eq!(commands.len(), 3 + GLOW_POINTS);
    }

    #[test]
    fn faded_ripple_draws_outer_rings_only() {
        let mut pool = pool();
        let mut ripple = Ripple::new(100.0, 5.0);
        ripple.radius = 80.0;
        pool.push(ripple);
        let mut commands = RenderCommands::new();
        pool.draw(Point::ORIGIN, &mut commands);
        assert_eq!(commands.len(), 2);
    }
}
