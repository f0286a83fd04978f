mod sources;

#[cfg(feature = "live")]
mod live;

use std::{
    ops::ControlFlow,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand, ValueEnum};
use spectron_core::{
    config::CoreConfig, AppConfig, AudioEngine, FixedStepPacer, RenderCommands, Surface,
    Visualizer, VisualizerMode,
};
use tracing_subscriber::EnvFilter;

use crate::sources::{PacedSource, SampleStream, SyntheticSignal, WavStream};

fn main() -> spectron_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    let mode = VisualizerMode::from(cli.command.mode());
    if cli.config.is_none() && mode == VisualizerMode::RippleGlyph {
        config.visual.core = CoreConfig::centred();
    }

    match cli.command {
        Commands::Standby { ref out, .. } => run_standby(&config, mode, out),
        Commands::Render {
            ref input,
            frames,
            fps,
            snapshot_every,
            ref out_dir,
            ..
        } => run_render(
            &config,
            RenderJob {
                input: input.as_deref(),
                mode,
                frames,
                fps,
                snapshot_every,
                out_dir,
                seed: cli.seed,
            },
        ),
        #[cfg(feature = "live")]
        Commands::Live { seconds, ref out, .. } => run_live(&config, mode, seconds, out, cli.seed),
    }
}

fn load_config(cli: &Cli) -> spectron_core::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::debug!(?path, "loading configuration");
            AppConfig::from_path(path)?
        }
        None => AppConfig::default(),
    };
    if let Some(width) = cli.width {
        config.surface.width = width;
    }
    if let Some(height) = cli.height {
        config.surface.height = height;
    }
    if let Some(dpr) = cli.dpr {
        config.surface.device_pixel_ratio = dpr;
    }
    config.validate()?;
    Ok(config)
}

fn new_visualizer(
    config: &AppConfig,
    surface: &Surface,
    mode: VisualizerMode,
    seed: Option<u64>,
) -> Visualizer {
    let mut visualizer = Visualizer::new(config.visual.clone(), mode, seed);
    let (width, height) = surface.logical_size();
    visualizer.resize(width, height);
    visualizer
}

fn run_standby(
    config: &AppConfig,
    mode: VisualizerMode,
    out: &Path,
) -> spectron_core::Result<()> {
    let mut surface = Surface::new(config.surface)?;
    let visualizer = new_visualizer(config, &surface, mode, Some(0));
    write_frame(&mut surface, &visualizer.standby_frame(), out)
}

struct RenderJob<'a> {
    input: Option<&'a Path>,
    mode: VisualizerMode,
    frames: u64,
    fps: f32,
    snapshot_every: u64,
    out_dir: &'a Path,
    seed: Option<u64>,
}

fn run_render(config: &AppConfig, job: RenderJob<'_>) -> spectron_core::Result<()> {
    std::fs::create_dir_all(job.out_dir)?;
    tracing::info!(
        input = ?job.input,
        mode = ?job.mode,
        frames = job.frames,
        fps = job.fps,
        "rendering offline session"
    );

    match job.input {
        Some(path) => {
            let stream = WavStream::open(path)?;
            render_stream(config, &job, stream)
        }
        None => {
            let stream = SyntheticSignal::new(config.audio.sample_rate, job.seed.unwrap_or(0));
            render_stream(config, &job, stream)
        }
    }
}

fn render_stream<S: SampleStream>(
    config: &AppConfig,
    job: &RenderJob<'_>,
    stream: S,
) -> spectron_core::Result<()> {
    let mut audio = config.audio.clone();
    audio.sample_rate = stream.sample_rate();
    let engine = AudioEngine::new(audio)?;
    let mut source = PacedSource::new(stream, engine, job.fps)?;
    let mut pacer = FixedStepPacer::new(job.fps);

    let mut surface = Surface::new(config.surface)?;
    let mut visualizer = new_visualizer(config, &surface, job.mode, job.seed);
    let every = job.snapshot_every.max(1);
    let mut index = 0_u64;

    let report = visualizer.run(&mut source, &mut pacer, |commands| {
        if index % every == 0 {
            let path = job.out_dir.join(format!("frame_{index:05}.png"));
            write_frame(&mut surface, commands, &path)?;
        }
        index += 1;
        Ok(if index >= job.frames {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        })
    })?;

    write_frame(&mut surface, &report.standby, &job.out_dir.join("standby.png"))?;
    tracing::info!(
        ticks = report.ticks,
        rendered = report.rendered,
        skipped = report.skipped,
        "offline session finished"
    );
    Ok(())
}

#[cfg(feature = "live")]
fn run_live(
    config: &AppConfig,
    mode: VisualizerMode,
    seconds: f32,
    out: &Path,
    seed: Option<u64>,
) -> spectron_core::Result<()> {
    use std::time::{Duration, Instant};

    use spectron_core::RealtimePacer;

    let mut source = live::LiveSource::open(config.audio.clone())?;
    let mut pacer = RealtimePacer::new(60.0);
    let mut surface = Surface::new(config.surface)?;
    let mut visualizer = new_visualizer(config, &surface, mode, seed);

    let deadline = Instant::now() + Duration::from_secs_f32(seconds.max(0.0));
    let mut last = RenderCommands::new();
    let report = visualizer.run(&mut source, &mut pacer, |commands| {
        last = commands.clone();
        Ok(if Instant::now() >= deadline {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        })
    })?;

    write_frame(&mut surface, &last, out)?;
    write_frame(&mut surface, &report.standby, &standby_path(out))?;
    tracing::info!(rendered = report.rendered, "live session finished");
    Ok(())
}

#[cfg(feature = "live")]
fn standby_path(out: &Path) -> PathBuf {
    let stem = out
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    out.with_file_name(format!("{stem}-standby.png"))
}

fn write_frame(
    surface: &mut Surface,
    commands: &RenderCommands,
    path: &Path,
) -> spectron_core::Result<()> {
    surface.draw(commands);
    surface.save_png(path)?;
    tracing::debug!(path = %path.display(), commands = commands.len(), "wrote frame");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive procedural visualizer", long_about = None)]
struct Cli {
    /// JSON configuration file. Missing keys fall back to defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Logical surface width.
    #[arg(long, global = true)]
    width: Option<u32>,
    /// Logical surface height.
    #[arg(long, global = true)]
    height: Option<u32>,
    /// Device pixel ratio of the backing surface.
    #[arg(long, global = true)]
    dpr: Option<f32>,
    /// Seed for every random policy; omit for a fresh seed per run.
    #[arg(long, global = true)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the standby frame shown while nothing is listening.
    Standby {
        #[arg(long, value_enum, default_value_t = ModeArg::Rain)]
        mode: ModeArg,
        /// Output PNG path.
        #[arg(long)]
        out: PathBuf,
    },
    /// Drive the visualizer offline and write periodic PNG snapshots.
    Render {
        /// WAV file to play. A synthetic test signal is used when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ModeArg::Rain)]
        mode: ModeArg,
        /// Upper bound on rendered frames.
        #[arg(long, default_value_t = 300)]
        frames: u64,
        #[arg(long, default_value_t = 60.0)]
        fps: f32,
        /// Save every n-th rendered frame.
        #[arg(long, default_value_t = 30)]
        snapshot_every: u64,
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Visualize the default microphone for a fixed time.
    #[cfg(feature = "live")]
    Live {
        #[arg(long, default_value_t = 10.0)]
        seconds: f32,
        #[arg(long, value_enum, default_value_t = ModeArg::Rain)]
        mode: ModeArg,
        /// Final frame PNG; the standby frame lands next to it.
        #[arg(long)]
        out: PathBuf,
    },
}

impl Commands {
    fn mode(&self) -> ModeArg {
        match self {
            Commands::Standby { mode, .. } | Commands::Render { mode, .. } => *mode,
            #[cfg(feature = "live")]
            Commands::Live { mode, .. } => *mode,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    /// Digital rain overlay.
    Rain,
    /// Ripple rings with floating glyphs.
    Ripples,
}

impl From<ModeArg> for VisualizerMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Rain => VisualizerMode::DigitalRain,
            ModeArg::Ripples => VisualizerMode::RippleGlyph,
        }
    }
}
