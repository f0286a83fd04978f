//! Short-lived sparks thrown off the core sphere and the bar tips.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use rand::Rng;

use crate::render::{Color, DrawCommand, Point, RenderCommands};

/// Frame period every per-tick rate is expressed against.
pub const REFERENCE_FRAME_MS: f32 = 16.67;

const LIFE_DECAY_PER_FRAME: f32 = 1.5;
const MAX_OPACITY: f32 = 0.8;

/// One spark thrown off the core. Dies when `life` reaches zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Point,
    pub velocity: Point,
    pub size: f32,
    /// Hue, saturation and lightness; alpha is derived from remaining life.
    pub color: Color,
    pub life: f32,
    pub max_life: f32,
}

impl Particle {
    /// Remaining life over total life, in `[0, 1]` while alive.
    pub fn life_ratio(&self) -> f32 {
        if self.max_life <= 0.0 {
            return 0.0;
        }
        (self.life / self.max_life).clamp(0.0, 1.0)
    }

    pub fn opacity(&self) -> f32 {
        self.life_ratio() * MAX_OPACITY
    }

    pub fn radius(&self) -> f32 {
        self.size * self.life_ratio()
    }
}

/// Bounded particle collection. Insertion order is age order, so the front
/// is always the oldest particle.
#[derive(Debug, Clone)]
pub struct ParticlePool {
    particles: VecDeque<Particle>,
    capacity: usize,
}

impl ParticlePool {
    /// Creates an empty pool holding at most `capacity` particles.
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Returns the number of live particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Iterates from the oldest particle to the newest.
    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    /// Removes every particle.
    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Emits one particle at `origin`. Louder `intensity` makes it larger,
    /// faster, longer lived and biased upward. Evicts the oldest particle
    /// once the pool is over capacity.
    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        origin: Point,
        intensity: f32,
        color: Color,
    ) {
        let size = rng.gen_range(1.0..4.0) + intensity * 0.05;

        let speed_factor = 1.0 + intensity * 0.02;
        let heading = rng.gen_range(0.0..TAU);
        let reach = rng.gen::<f32>().sqrt() * speed_factor;
        let velocity = Point::new(
            heading.cos() * reach,
            heading.sin() * reach - intensity * 0.01,
        );

        let max_life = rng.gen_range(100.0..150.0) + intensity;

        self.particles.push_back(Particle {
            position: origin,
            velocity,
            size,
            color: color.with_alpha(1.0),
            life: max_life,
            max_life,
        });

        while self.particles.len() > self.capacity {
            self.particles.pop_front();
        }
    }

    /// Moves every particle forward by `delta_ms` and drops the dead ones.
    pub fn advance(&mut self, delta_ms: f32) {
        let steps = delta_ms.max(0.0) / REFERENCE_FRAME_MS;
        self.particles.retain_mut(|particle| {
            particle.position.x += particle.velocity.x * steps;
            particle.position.y += particle.velocity.y * steps;
            particle.life -= LIFE_DECAY_PER_FRAME * steps;
            particle.life > 0.0
        });
    }

    /// Keeps only the `budget` most recent particles.
    pub fn retain_recent(&mut self, budget: usize) {
        if self.particles.len() > budget {
            let excess = self.particles.len() - budget;
            self.particles.drain(..excess);
        }
    }

    pub fn draw(&self, commands: &mut RenderCommands) {
        for particle in &self.particles {
            let radius = particle.radius();
            if radius <= 0.0 {
                continue;
            }
            commands.push(DrawCommand::FillCircle {
                center: particle.position,
                radius,
                color: particle.color.with_alpha(particle.opacity()),
                glow: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn spark() -> Color {
        Color::hsla(200.0, 100.0, 70.0, 1.0)
    }

    #[test]
    fn eviction_keeps_most_recent_spawns() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut pool = ParticlePool::new(200);

        for index in 0..250 {
            pool.spawn(&mut rng, Point::new(index as f32, 0.0), 10.0, spark());
        }

        assert_eq!(pool.len(), 200);
        let origins: Vec<f32> = pool.iter().map(|particle| particle.position.x).collect();
        let expected: Vec<f32> = (50..250).map(|index| index as f32).collect();
        assert_eq!(origins, expected);
    }

    #[test]
    fn spawn_ranges_scale_with_intensity() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut pool = ParticlePool::new(500);
        for _ in 0..300 {
            pool.spawn(&mut rng, Point::ORIGIN, 100.0, spark());
        }

        for particle in pool.iter() {
            assert!((6.0..9.0).contains(&particle.size));
            assert!((200.0..250.0).contains(&particle.max_life));
            assert_eq!(particle.life, particle.max_life);
            let dx = particle.velocity.x;
            let dy = particle.velocity.y + 1.0;
            assert!(dx.hypot(dy) <= 3.0 + 1e-4);
        }
    }

    #[test]
    fn life_only_decreases_until_removal() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut pool = ParticlePool::new(200);
        for _ in 0..20 {
            pool.spawn(&mut rng, Point::ORIGIN, 0.0, spark());
        }

        let mut previous: Vec<f32> = pool.iter().map(|particle| particle.life).collect();
        for _ in 0..200 {
            pool.advance(REFERENCE_FRAME_MS);
            let current: Vec<f32> = pool.iter().map(|particle| particle.life).collect();
            let expected: Vec<f32> = previous
                .iter()
                .map(|life| life - LIFE_DECAY_PER_FRAME)
                .filter(|&life| life > 0.0)
                .collect();
            assert_eq!(current, expected);
            previous = current;
        }
        assert!(pool.is_empty());
    }

    #[test]
    fn advance_scales_with_elapsed_time() {
        let mut pool = ParticlePool::new(4);
        pool.particles.push_back(Particle {
            position: Point::ORIGIN,
            velocity: Point::new(1.0, -2.0),
            size: 4.0,
            color: spark(),
            life: 100.0,
            max_life: 100.0,
        });

        pool.advance(REFERENCE_FRAME_MS * 2.0);
        let particle = pool.iter().next().unwrap();
        assert!((particle.position.x - 2.0).abs() < 1e-4);
        assert!((particle.position.y + 4.0).abs() < 1e-4);
        assert!((particle.life - 97.0).abs() < 1e-4);
        assert!((particle.opacity() - 0.97 * 0.8).abs() < 1e-4);
        assert!((particle.radius() - 0.97 * 4.0).abs() < 1e-4);
    }

    #[test]
    fn particle_at_zero_life_is_removed_in_same_call() {
        let mut pool = ParticlePool::new(4);
        pool.particles.push_back(Particle {
            position: Point::ORIGIN,
            velocity: Point::ORIGIN,
            size: 2.0,
            color: spark(),
            life: 1.5,
            max_life: 100.0,
        });
        pool.advance(REFERENCE_FRAME_MS);
        assert!(pool.is_empty());
    }

    #[test]
    fn retain_recent_drops_the_oldest() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut pool = ParticlePool::new(200);
        for index in 0..120 {
            pool.spawn(&mut rng, Point::new(index as f32, 0.0), 0.0, spark());
        }
        pool.retain_recent(50);

        assert_eq!(pool.len(), 50);
        assert_eq!(pool.iter().next().unwrap().position.x, 70.0);
    }

    #[test]
    fn draws_one_fading_circle_per_particle() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = ParticlePool::new(10);
        for _ in 0..3 {
            pool.spawn(&mut rng, Point::ORIGIN, 0.0, spark());
        }
        pool.advance(REFERENCE_FRAME_MS * 10.0);

        let mut commands = RenderCommands::new();
        pool.draw(&mut commands);
        assert_eq!(commands.len(), 3);
        for entry in &commands {
            match &entry.command {
                DrawCommand::FillCircle { color, .. } => {
                    assert!(color.alpha() < MAX_OPACITY);
                }
                other => panic!("unexpected command {other:?}"),
            }
        }
    }
}
