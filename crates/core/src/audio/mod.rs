use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};

use tracing::debug;

use crate::{analysis::SpectrumAnalyser, config::AudioConfig, Result, SpectronError};

/// Read view over the two byte buffers of one tick. Valid until the source
/// is pulled again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFrame<'a> {
    /// Magnitude per frequency bin, 0..=255.
    pub frequency: &'a [u8],
    /// Waveform samples centred on 128.
    pub time_domain: &'a [u8],
}

/// Anything that can hand the visualizer a fresh pair of buffers per tick.
pub trait AudioSource {
    /// False once capture has ended; the driver stops scheduling ticks.
    fn is_listening(&self) -> bool;

    /// Buffers for the current tick, or `None` when no audio has arrived yet.
    /// Sources that have nothing new reuse the previous buffers.
    fn pull(&mut self) -> Option<AudioFrame<'_>>;

    /// Releases whatever device or stream backs the source.
    fn stop(&mut self) {}
}

/// Shared state between an [`AudioEngine`] and the producers feeding it.
#[derive(Debug, Default)]
struct Shared {
    pending: Mutex<Vec<f32>>,
    listening: AtomicBool,
}

/// Sample sink handed to capture callbacks or decoder threads. Cheap to
/// clone and safe to move to another thread.
#[derive(Debug, Clone)]
pub struct SampleFeeder {
    shared: Arc<Shared>,
}

impl SampleFeeder {
    /// Queues mono samples for the next pull.
    pub fn push(&self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        let mut pending = lock_pending(&self.shared)?;
        pending.extend_from_slice(samples);
        Ok(())
    }

    /// Marks the stream as finished.
    pub fn finish(&self) {
        self.shared.listening.store(false, Ordering::Release);
    }

    pub fn is_listening(&self) -> bool {
        self.shared.listening.load(Ordering::Acquire)
    }
}

/// [`AudioSource`] backed by a [`SpectrumAnalyser`]. Producers push raw
/// samples through a [`SampleFeeder`]; every pull drains them into the
/// analyser and refreshes the byte buffers.
#[derive(Debug)]
pub struct AudioEngine {
    analyser: SpectrumAnalyser,
    shared: Arc<Shared>,
    drained: Vec<f32>,
}

impl AudioEngine {
    pub fn new(config: AudioConfig) -> Result<Self> {
        Ok(Self {
            analyser: SpectrumAnalyser::new(config)?,
            shared: Arc::new(Shared::default()),
            drained: Vec::new(),
        })
    }

    /// Opens a listening session with an empty analyser and returns the
    /// feeder producers should write into.
    pub fn start(&mut self) -> Result<SampleFeeder> {
        lock_pending(&self.shared)?.clear();
        self.analyser.reset();
        self.shared.listening.store(true, Ordering::Release);
        debug!(
            fft_size = self.analyser.config().fft_size,
            "audio engine listening"
        );
        Ok(self.feeder())
    }

    pub fn feeder(&self) -> SampleFeeder {
        SampleFeeder {
            shared: self.shared.clone(),
        }
    }

    fn drain(&mut self) -> Result<()> {
        let mut pending = lock_pending(&self.shared)?;
        self.drained.clear();
        self.drained.append(&mut pending);
        Ok(())
    }
}

impl AudioSource for AudioEngine {
    fn is_listening(&self) -> bool {
        self.shared.listening.load(Ordering::Acquire)
    }

    fn pull(&mut self) -> Option<AudioFrame<'_>> {
        if let Err(error) = self.drain() {
            debug!(%error, "skipping audio pull");
            return None;
        }
        if !self.drained.is_empty() {
            self.analyser.push_samples(&self.drained);
            if let Err(error) = self.analyser.analyse() {
                debug!(%error, "spectrum analysis failed");
                return None;
            }
        }
        if self.analyser.samples_received() == 0 {
            return None;
        }
        Some(self.analyser.frame())
    }

    fn stop(&mut self) {
        self.shared.listening.store(false, Ordering::Release);
        debug!("audio engine stopped");
    }
}

fn lock_pending(shared: &Shared) -> Result<MutexGuard<'_, Vec<f32>>> {
    shared
        .pending
        .lock()
        .map_err(|_| SpectronError::msg("pending sample queue has been poisoned"))
}
