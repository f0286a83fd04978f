//! Offline audio sources: a synthetic test signal and WAV playback, both
//! paced to one chunk of samples per tick.

use std::{f32::consts::TAU, path::Path};

use rand::{rngs::StdRng, Rng, SeedableRng};
use spectron_core::{AudioEngine, AudioFrame, AudioSource, Result, SampleFeeder, SpectronError};

/// Producer of mono f32 samples.
pub trait SampleStream {
    fn sample_rate(&self) -> u32;

    /// Appends up to `count` samples to `out` and returns how many were
    /// written. Zero means the stream is exhausted.
    fn read(&mut self, out: &mut Vec<f32>, count: usize) -> usize;
}

/// Kick drum style bass pulse at 120 bpm over a wobbling mid tone, with a
/// little seeded noise on top.
#[derive(Debug)]
pub struct SyntheticSignal {
    sample_rate: u32,
    position: u64,
    length: Option<u64>,
    rng: StdRng,
}

impl SyntheticSignal {
    pub fn new(sample_rate: u32, seed: u64) -> Self {
        Self {
            sample_rate,
            position: 0,
            length: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Ends the stream after `seconds`.
    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.length = Some((seconds.max(0.0) * self.sample_rate as f32) as u64);
        self
    }

    fn sample_at(&mut self, position: u64) -> f32 {
        let time = position as f32 / self.sample_rate as f32;
        let beat_phase = (time * 2.0).fract();
        let kick = (TAU * 55.0 * time).sin() * (-beat_phase * 8.0).exp();
        let wobble = 0.5 + 0.5 * (TAU * 0.25 * time).sin();
        let tone = (TAU * 880.0 * time).sin() * 0.3 * wobble;
        let noise = self.rng.gen_range(-0.02..0.02);
        (kick * 0.7 + tone + noise).clamp(-1.0, 1.0)
    }
}

impl SampleStream for SyntheticSignal {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, out: &mut Vec<f32>, count: usize) -> usize {
        let available = match self.length {
            Some(length) => length.saturating_sub(self.position).min(count as u64) as usize,
            None => count,
        };
        for _ in 0..available {
            let sample = self.sample_at(self.position);
            out.push(sample);
            self.position += 1;
        }
        available
    }
}

/// Fully decoded WAV file, downmixed to mono.
#[derive(Debug)]
pub struct WavStream {
    samples: Vec<f32>,
    sample_rate: u32,
    cursor: usize,
}

impl WavStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let reader = hound::WavReader::open(path.as_ref()).map_err(wav_error)?;
        let format = reader.spec();
        let interleaved: Vec<f32> = match format.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(wav_error)?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1_i64 << (format.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 * scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(wav_error)?
            }
        };

        tracing::info!(
            path = %path.as_ref().display(),
            sample_rate = format.sample_rate,
            channels = format.channels,
            "decoded wav input"
        );
        Ok(Self::from_interleaved(
            &interleaved,
            format.channels,
            format.sample_rate,
        ))
    }

    pub fn from_interleaved(samples: &[f32], channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: downmix(samples, channels),
            sample_rate,
            cursor: 0,
        }
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate.max(1) as f32
    }
}

impl SampleStream for WavStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, out: &mut Vec<f32>, count: usize) -> usize {
        let end = (self.cursor + count).min(self.samples.len());
        out.extend_from_slice(&self.samples[self.cursor..end]);
        let written = end - self.cursor;
        self.cursor = end;
        written
    }
}

/// Averages interleaved channels into one.
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

fn wav_error(error: hound::Error) -> SpectronError {
    SpectronError::msg(format!("wav: {error}"))
}

/// Feeds a [`SampleStream`] into an [`AudioEngine`] one tick's worth at a
/// time, the way a sound card would fill the analyser between frames.
pub struct PacedSource<S> {
    stream: S,
    engine: AudioEngine,
    feeder: SampleFeeder,
    chunk: usize,
    scratch: Vec<f32>,
}

impl<S: SampleStream> PacedSource<S> {
    pub fn new(stream: S, mut engine: AudioEngine, fps: f32) -> Result<Self> {
        let feeder = engine.start()?;
        let fps = if fps > 0.0 { fps } else { 60.0 };
        let chunk = ((stream.sample_rate() as f32 / fps).round() as usize).max(1);
        Ok(Self {
            stream,
            engine,
            feeder,
            chunk,
            scratch: Vec::with_capacity(chunk),
        })
    }
}

impl<S: SampleStream> AudioSource for PacedSource<S> {
    fn is_listening(&self) -> bool {
        self.engine.is_listening()
    }

    fn pull(&mut self) -> Option<AudioFrame<'_>> {
        self.scratch.clear();
        if self.stream.read(&mut self.scratch, self.chunk) == 0 {
            self.feeder.finish();
        } else if let Err(error) = self.feeder.push(&self.scratch) {
            tracing::debug!(%error, "dropping audio chunk");
        }
        self.engine.pull()
    }

    fn stop(&mut self) {
        self.engine.stop();
    }
}
