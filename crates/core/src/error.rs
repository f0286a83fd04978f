/// Result alias that carries the custom [`SpectronError`] type.
pub type Result<T> = std::result::Result<T, SpectronError>;

/// Common error type for the core crate.
///
/// Nothing in here is raised from inside a tick; the per-frame pipeline
/// recovers locally. These variants cover setup paths: loading configuration,
/// allocating a drawing surface, writing previews and feeding the analyser.
#[derive(Debug, thiserror::Error)]
pub enum SpectronError {
    /// Free-form message, mostly produced by the application crate.
    #[error("{0}")]
    Message(String),
    /// Caller supplied something the pipeline cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration file could not be parsed.
    #[error("config: {0}")]
    Config(#[from] serde_json::Error),
    /// The rasteriser could not allocate a pixmap of the requested size.
    #[error("cannot create a {width}x{height} drawing surface")]
    Surface { width: u32, height: u32 },
    /// PNG encoding of a rendered frame failed.
    #[error("png: {0}")]
    Png(String),
    /// Forward FFT failed inside the spectrum analyser.
    #[error("fft: {0}")]
    Fft(#[from] realfft::FftError),
}

impl SpectronError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for SpectronError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SpectronError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
