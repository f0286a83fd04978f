use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{energy::BandLayout, rain::Charset, Result, SpectronError};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub surface: SurfaceConfig,
    pub visual: VisualConfig,
}

impl AppConfig {
    /// Parses a JSON document. Missing sections fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.surface.validate()?;
        self.visual.validate()
    }
}

/// Settings of the byte spectrum analyser that feeds the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Window length. The frequency buffer holds `fft_size / 2` bins and the
    /// time-domain buffer `fft_size` samples.
    pub fft_size: usize,
    /// Exponential smoothing between successive magnitude spectra, 0..1.
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            fft_size: 2048,
            smoothing: 0.8,
            min_decibels: -90.0,
            max_decibels: -10.0,
        }
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if self.fft_size < 32 || !self.fft_size.is_power_of_two() {
            return Err(SpectronError::InvalidInput(
                "fft_size must be a power of two of at least 32",
            ));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(SpectronError::InvalidInput("smoothing must lie in [0, 1)"));
        }
        if self.max_decibels <= self.min_decibels {
            return Err(SpectronError::InvalidInput(
                "max_decibels must exceed min_decibels",
            ));
        }
        if self.sample_rate == 0 {
            return Err(SpectronError::InvalidInput("sample_rate must be positive"));
        }
        Ok(())
    }
}

/// Logical size of the drawing surface plus the device pixel ratio used to
/// back it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        // 16:9
        Self {
            width: 960,
            height: 540,
            device_pixel_ratio: 1.0,
        }
    }
}

impl SurfaceConfig {
    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SpectronError::InvalidInput("surface size must be non-zero"));
        }
        if !(self.device_pixel_ratio > 0.0) {
            return Err(SpectronError::InvalidInput(
                "device_pixel_ratio must be positive",
            ));
        }
        Ok(())
    }
}

/// Every tunable of the rendering pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    pub bands: BandLayout,
    pub particles: ParticleConfig,
    pub bars: BarConfig,
    pub core: CoreConfig,
    pub rain: RainConfig,
    pub ripples: RippleConfig,
    pub glyphs: GlyphConfig,
    pub performance: PerformanceConfig,
}

impl VisualConfig {
    fn validate(&self) -> Result<()> {
        if self.bands.bass_bins == 0 {
            return Err(SpectronError::InvalidInput("bass band needs at least one bin"));
        }
        if self.bands.mid_end <= self.bands.mid_start {
            return Err(SpectronError::InvalidInput("mid band window is empty"));
        }
        if self.particles.capacity == 0 {
            return Err(SpectronError::InvalidInput("particle capacity must be non-zero"));
        }
        if self.bars.count == 0 || self.bars.degraded_count == 0 {
            return Err(SpectronError::InvalidInput("bar counts must be non-zero"));
        }
        if !(self.rain.column_spacing > 0.0) || self.rain.glyph_rows == 0 {
            return Err(SpectronError::InvalidInput(
                "rain needs a positive column spacing and at least one row",
            ));
        }
        if self.ripples.capacity == 0 {
            return Err(SpectronError::InvalidInput("ripple capacity must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub capacity: usize,
    /// Entries kept while the governor reports low performance.
    pub low_performance_budget: usize,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            capacity: 200,
            low_performance_budget: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BarConfig {
    pub count: usize,
    pub degraded_count: usize,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            count: 128,
            degraded_count: 64,
        }
    }
}

/// Core sphere radius is `base_radius + bass * bass_gain + overall * overall_gain`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub base_radius: f32,
    pub bass_gain: f32,
    pub overall_gain: f32,
    /// Let the sphere circle the origin at half its radius.
    pub orbit: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            base_radius: 35.0,
            bass_gain: 60.0,
            overall_gain: 20.0,
            orbit: true,
        }
    }
}

impl CoreConfig {
    /// The steady, centred sphere with the stronger bass response.
    pub fn centred() -> Self {
        Self {
            base_radius: 30.0,
            bass_gain: 100.0,
            overall_gain: 30.0,
            orbit: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RainConfig {
    pub column_spacing: f32,
    pub glyph_rows: usize,
    pub row_height: f32,
    /// Gain `k` of the stochastic energy multiplier `1 + e * k * U(0.2, 1)`.
    pub energy_factor: f32,
    /// `overall` above which speed and opacity ratchet upward every tick.
    pub surge_threshold: f32,
    pub charset: Charset,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            column_spacing: 15.0,
            glyph_rows: 20,
            row_height: 18.0,
            energy_factor: 0.5,
            surge_threshold: 0.3,
            charset: Charset::Hangul,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RippleConfig {
    pub capacity: usize,
    pub bass_threshold: f32,
    pub mid_threshold: f32,
    /// Minimum spacing between spawns at silence.
    pub base_interval_ms: f64,
    /// Interval reduction at full `overall` energy.
    pub interval_energy_gain: f64,
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            bass_threshold: 0.08,
            mid_threshold: 0.1,
            base_interval_ms: 200.0,
            interval_energy_gain: 150.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphConfig {
    pub capacity: usize,
    /// New glyphs per tick at full `overall` energy.
    pub spawn_gain: f32,
    /// `overall` below which nothing spawns.
    pub spawn_floor: f32,
}

impl Default for GlyphConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            spawn_gain: 35.0,
            spawn_floor: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub low_fps_threshold: u32,
    pub window_ms: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            low_fps_threshold: 30,
            window_ms: 1000.0,
        }
    }
}
