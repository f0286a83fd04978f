use crate::{config::CoreConfig, render::Point, EnergySummary};

/// Per-tick scene parameters derived from the energy summary and the wall
/// clock. Every layer reads from this instead of recomputing its own copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneParameters {
    pub energy: EnergySummary,
    /// Base hue in degrees, cycling once every 18 seconds.
    pub hue: f32,
    pub core_center: Point,
    pub core_radius: f32,
    pub bar_max_radius: f32,
    /// Constant spin of the bar ring, radians.
    pub bar_rotation: f32,
    pub waveform_radius: f32,
    /// Counter spin of the waveform ring, radians.
    pub waveform_rotation: f32,
    /// Horizontal drift of the background gradient focus.
    pub background_drift: f32,
    /// Alpha of the background gradient's inner stop.
    pub background_alpha: f32,
}

/// Routes energies into scene parameters.
#[derive(Debug, Clone, Default)]
pub struct ParameterMapper {
    core: CoreConfig,
}

impl ParameterMapper {
    pub fn new(core: CoreConfig) -> Self {
        Self { core }
    }

    pub fn evaluate(&self, energy: &EnergySummary, time_ms: f64) -> SceneParameters {
        let core_radius = self.core.base_radius
            + energy.bass * self.core.bass_gain
            + energy.overall * self.core.overall_gain;

        let core_center = if self.core.orbit {
            let phase = (time_ms / 5000.0) as f32;
            Point::new(
                phase.sin() * core_radius * 0.5,
                phase.cos() * core_radius * 0.5,
            )
        } else {
            Point::ORIGIN
        };

        let bar_max_radius = core_radius + 20.0 + 150.0 * (0.5 + energy.overall * 0.5);

        SceneParameters {
            energy: *energy,
            hue: base_hue(time_ms),
            core_center,
            core_radius,
            bar_max_radius,
            bar_rotation: (time_ms / 8000.0) as f32,
            waveform_radius: bar_max_radius + 30.0 + energy.mid * 50.0,
            waveform_rotation: (time_ms / 10_000.0) as f32,
            background_drift: (time_ms / 5000.0).sin() as f32 * 50.0,
            background_alpha: 0.5 + (time_ms / 2000.0).sin() as f32 * 0.2,
        }
    }
}

/// Hue in degrees that walks the colour wheel with wall-clock time.
pub fn base_hue(time_ms: f64) -> f32 {
    ((time_ms / 50.0) % 360.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud() -> EnergySummary {
        EnergySummary {
            bass: 1.0,
            mid: 0.5,
            overall: 1.0,
        }
    }

    #[test]
    fn radii_follow_energy() {
        let mapper = ParameterMapper::new(CoreConfig::centred());
        let quiet = mapper.evaluate(&EnergySummary::SILENT, 0.0);
        let loud = mapper.evaluate(&loud(), 0.0);

        assert_eq!(quiet.core_radius, 30.0);
        assert_eq!(loud.core_radius, 160.0);
        assert_eq!(quiet.bar_max_radius, 30.0 + 20.0 + 75.0);
        assert_eq!(loud.bar_max_radius, 160.0 + 20.0 + 150.0);
        assert_eq!(loud.waveform_radius, loud.bar_max_radius + 30.0 + 25.0);
    }

    #[test]
    fn centred_core_stays_at_origin() {
        let mapper = ParameterMapper::new(CoreConfig::centred());
        let params = mapper.evaluate(&loud(), 12_345.0);
        assert_eq!(params.core_center, Point::ORIGIN);
    }

    #[test]
    fn orbiting_core_stays_within_half_radius() {
        let mapper = ParameterMapper::new(CoreConfig::default());
        for step in 0..100 {
            let params = mapper.evaluate(&loud(), step as f64 * 777.0);
            let distance = params.core_center.x.hypot(params.core_center.y);
            assert!((distance - params.core_radius * 0.5).abs() < 1e-3);
        }
    }

    #[test]
    fn hue_wraps_every_eighteen_seconds() {
        assert_eq!(base_hue(0.0), 0.0);
        assert!((base_hue(18_000.0)).abs() < 1e-3);
        assert!((base_hue(9_000.0) - 180.0).abs() < 1e-3);
    }
}
