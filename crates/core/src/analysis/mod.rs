//! Byte spectrum analyser: turns a stream of f32 samples into the magnitude
//! and waveform byte buffers the renderer consumes.

use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{audio::AudioFrame, config::AudioConfig, Result, SpectronError};

/// Rolling-window analyser. Every [`analyse`](Self::analyse) call looks at the
/// most recent `fft_size` samples.
pub struct SpectrumAnalyser {
    config: AudioConfig,
    history: Vec<f32>,
    write_pos: usize,
    received: usize,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    frequency: Vec<u8>,
    time_domain: Vec<u8>,
    fft: FftResources,
}

impl SpectrumAnalyser {
    pub fn new(config: AudioConfig) -> Result<Self> {
        let size = config.fft_size;
        if size < 2 || !size.is_power_of_two() {
            return Err(SpectronError::InvalidInput(
                "analyser window must be a power of two",
            ));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);
        let fft = FftResources {
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        };

        Ok(Self {
            history: vec![0.0; size],
            write_pos: 0,
            received: 0,
            window: (0..size).map(|index| blackman_value(index, size)).collect(),
            smoothed: vec![0.0; size / 2],
            frequency: vec![0; size / 2],
            time_domain: vec![128; size],
            fft,
            config,
        })
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Total samples pushed since creation or the last reset.
    pub fn samples_received(&self) -> usize {
        self.received
    }

    /// Forgets every sample and the smoothing history.
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.write_pos = 0;
        self.received = 0;
        self.smoothed.fill(0.0);
        self.frequency.fill(0);
        self.time_domain.fill(128);
    }

    /// Appends samples to the rolling window; older ones fall out.
    pub fn push_samples(&mut self, samples: &[f32]) {
        let size = self.history.len();
        let tail = if samples.len() > size {
            &samples[samples.len() - size..]
        } else {
            samples
        };
        for &sample in tail {
            self.history[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % size;
        }
        self.received += samples.len();
    }

    /// Recomputes both byte buffers from the current window.
    pub fn analyse(&mut self) -> Result<AudioFrame<'_>> {
        let size = self.history.len();
        let (newest, oldest) = self.history.split_at(self.write_pos);
        for (index, &sample) in oldest.iter().chain(newest).enumerate() {
            self.time_domain[index] = ((sample + 1.0) * 128.0).floor().clamp(0.0, 255.0) as u8;
            self.fft.input[index] = sample * self.window[index];
        }

        let fft = &mut self.fft;
        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        let tau = self.config.smoothing.clamp(0.0, 1.0);
        let min_db = self.config.min_decibels;
        let range = self.config.max_decibels - min_db;
        for (bin, value) in self.smoothed.iter_mut().enumerate() {
            let magnitude = fft.spectrum[bin].norm() / size as f32;
            *value = tau * *value + (1.0 - tau) * magnitude;

            let decibels = if *value > 0.0 {
                20.0 * value.log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = 255.0 / range * (decibels - min_db);
            self.frequency[bin] = scaled.floor().clamp(0.0, 255.0) as u8;
        }

        Ok(self.frame())
    }

    /// Buffers produced by the last [`analyse`](Self::analyse) call.
    pub fn frame(&self) -> AudioFrame<'_> {
        AudioFrame {
            frequency: &self.frequency,
            time_domain: &self.time_domain,
        }
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("config", &self.config)
            .field("received", &self.received)
            .finish()
    }
}

fn blackman_value(index: usize, len: usize) -> f32 {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    let phase = 2.0 * PI * index as f32 / len as f32;
    a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
}
