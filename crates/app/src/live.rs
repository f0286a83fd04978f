//! Microphone capture through cpal.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use spectron_core::{
    AudioConfig, AudioEngine, AudioFrame, AudioSource, Result, SampleFeeder, SpectronError,
};

/// Default input device feeding an [`AudioEngine`]. Dropping the stream on
/// [`stop`](AudioSource::stop) releases the device.
pub struct LiveSource {
    engine: AudioEngine,
    stream: Option<Stream>,
}

impl LiveSource {
    pub fn open(mut audio: AudioConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| SpectronError::msg("no default input device found"))?;
        let supported = device.default_input_config().map_err(device_error)?;
        let channels = supported.channels();
        audio.sample_rate = supported.sample_rate().0;

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate = audio.sample_rate,
            channels,
            "opening input device"
        );

        let mut engine = AudioEngine::new(audio)?;
        let feeder = engine.start()?;
        let config = supported.config();
        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, feeder),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, feeder),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, feeder),
            other => Err(SpectronError::msg(format!(
                "unsupported sample format {other:?}"
            ))),
        }?;
        stream.play().map_err(device_error)?;

        Ok(Self {
            engine,
            stream: Some(stream),
        })
    }
}

impl AudioSource for LiveSource {
    fn is_listening(&self) -> bool {
        self.stream.is_some() && self.engine.is_listening()
    }

    fn pull(&mut self) -> Option<AudioFrame<'_>> {
        self.engine.pull()
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!("input device released");
        }
        self.engine.stop();
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: u16,
    feeder: SampleFeeder,
) -> Result<Stream>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let channels = usize::from(channels.max(1));
    let error_feeder = feeder.clone();
    let mut mono = Vec::new();
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                mono.clear();
                mono.extend(data.chunks(channels).map(|frame| {
                    frame
                        .iter()
                        .map(|&sample| -> f32 { cpal::Sample::from_sample(sample) })
                        .sum::<f32>()
                        / frame.len() as f32
                }));
                if let Err(error) = feeder.push(&mono) {
                    tracing::warn!(%error, "dropping captured audio");
                }
            },
            move |error| {
                tracing::error!(%error, "input stream failed");
                error_feeder.finish();
            },
            None,
        )
        .map_err(device_error)
}

fn device_error(error: impl std::fmt::Display) -> SpectronError {
    SpectronError::msg(format!("audio device: {error}"))
}
