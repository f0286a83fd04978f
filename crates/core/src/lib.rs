//! Core library of the Spectron audio visualizer.
//!
//! Audio arrives as two byte buffers per tick (magnitude spectrum and
//! waveform). The [`Visualizer`] reduces them to a few energy bands, animates
//! its entity pools and emits an ordered display list that a [`Surface`]
//! rasterises.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod driver;
pub mod energy;
pub mod error;
pub mod glyphs;
pub mod mapping;
pub mod particles;
pub mod perf;
pub mod rain;
pub mod raster;
pub mod render;
pub mod ripples;
pub mod scene;
pub mod timeline;

pub use analysis::SpectrumAnalyser;
pub use audio::{AudioEngine, AudioFrame, AudioSource, SampleFeeder};
pub use config::{AppConfig, AudioConfig, SurfaceConfig, VisualConfig};
pub use driver::{AnimationState, RunReport, TickOutcome, Visualizer};
pub use energy::EnergySummary;
pub use error::{Result, SpectronError};
pub use raster::Surface;
pub use render::{DrawCommand, Layer, RenderCommands};
pub use scene::VisualizerMode;
pub use timeline::{FixedStepPacer, FramePacer, RealtimePacer};
