//! Signal aggregation: collapses a byte frequency buffer into the three
//! normalised energies every other component reads.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Bin windows used by [`EnergySummary::measure`].
///
/// The mid window is a literal index range rather than a frequency range, so
/// it covers a different part of the spectrum when the buffer length
/// changes. With the default 1024-bin analyser it spans bins 100..300.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandLayout {
    pub bass_bins: usize,
    pub mid_start: usize,
    pub mid_end: usize,
}

impl Default for BandLayout {
    fn default() -> Self {
        Self {
            bass_bins: 5,
            mid_start: 100,
            mid_end: 300,
        }
    }
}

impl BandLayout {
    fn bass(&self, len: usize) -> Range<usize> {
        0..self.bass_bins.min(len)
    }

    fn mid(&self, len: usize) -> Range<usize> {
        let end = self.mid_end.min(len);
        self.mid_start.min(end)..end
    }
}

/// Normalised loudness of the current tick. Every field lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergySummary {
    pub bass: f32,
    pub mid: f32,
    pub overall: f32,
}

/// Which band a ripple should take its colour from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    StrongBass,
    StrongMid,
    BassLeaning,
    Neutral,
}

impl EnergySummary {
    pub const SILENT: Self = Self {
        bass: 0.0,
        mid: 0.0,
        overall: 0.0,
    };

    /// Reduces `frequency` to bass, mid and overall energy.
    ///
    /// Windows are clipped to the buffer; a window that ends up empty
    /// reports zero.
    pub fn measure(frequency: &[u8], layout: &BandLayout) -> Self {
        let len = frequency.len();
        Self {
            bass: mean_level(&frequency[layout.bass(len)]),
            mid: mean_level(&frequency[layout.mid(len)]),
            overall: mean_level(frequency),
        }
    }

    /// Blend used to bucket ripple sizes.
    pub fn ripple_factor(&self) -> f32 {
        self.overall * 0.7 + self.bass * 0.3
    }

    pub fn dominance(&self) -> Dominance {
        if self.bass > 0.4 {
            Dominance::StrongBass
        } else if self.mid > 0.3 {
            Dominance::StrongMid
        } else if self.bass > self.mid {
            Dominance::BassLeaning
        } else {
            Dominance::Neutral
        }
    }
}

fn mean_level(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|&value| u32::from(value)).sum();
    sum as f32 / (bins.len() as f32 * 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_measures_zero() {
        let summary = EnergySummary::measure(&[0; 512], &BandLayout::default());
        assert_eq!(summary, EnergySummary::SILENT);
    }

    #[test]
    fn saturation_measures_one() {
        let summary = EnergySummary::measure(&[255; 512], &BandLayout::default());
        assert_eq!(summary.bass, 1.0);
        assert_eq!(summary.mid, 1.0);
        assert_eq!(summary.overall, 1.0);
    }

    #[test]
    fn leading_bins_only_drive_bass() {
        let mut frequency = [0u8; 512];
        frequency[..5].fill(255);
        let summary = EnergySummary::measure(&frequency, &BandLayout::default());

        assert_eq!(summary.bass, 1.0);
        assert_eq!(summary.mid, 0.0);
        assert!((summary.overall - 5.0 / 512.0).abs() < 1e-6);
    }

    #[test]
    fn mid_window_is_clipped_to_short_buffers() {
        let layout = BandLayout::default();
        let summary = EnergySummary::measure(&[128; 200], &layout);
        assert!((summary.mid - 128.0 / 255.0).abs() < 1e-6);

        let tiny = EnergySummary::measure(&[200; 3], &layout);
        assert_eq!(tiny.mid, 0.0);
        assert!((tiny.bass - 200.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn reversed_mid_window_reads_as_empty() {
        let layout = BandLayout {
            mid_start: 300,
            mid_end: 100,
            ..BandLayout::default()
        };
        let summary = EnergySummary::measure(&[180; 1024], &layout);
        assert_eq!(summary.mid, 0.0);
        assert!((summary.overall - 180.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn empty_buffer_is_silent() {
        assert_eq!(
            EnergySummary::measure(&[], &BandLayout::default()),
            EnergySummary::SILENT
        );
    }

    #[test]
    fn dominance_prefers_strong_bass() {
        let energy = EnergySummary {
            bass: 0.5,
            mid: 0.6,
            overall: 0.2,
        };
        assert_eq!(energy.dominance(), Dominance::StrongBass);

        let quiet = EnergySummary {
            bass: 0.05,
            mid: 0.1,
            overall: 0.05,
        };
        assert_eq!(quiet.dominance(), Dominance::Neutral);
    }
}
