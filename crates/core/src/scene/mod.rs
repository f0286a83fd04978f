use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    config::VisualConfig,
    glyphs::GlyphPool,
    rain::RainField,
    render::{blank_frame, standby_frame, Layer, Point, RenderCommands},
    ripples::RipplePool,
    EnergySummary,
};

/// Which overlay the visualizer draws on top of the shared layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualizerMode {
    #[default]
    DigitalRain,
    RippleGlyph,
}

impl VisualizerMode {
    pub fn standby_frame(self, width: f32, height: f32) -> RenderCommands {
        match self {
            Self::DigitalRain => standby_frame(width, height),
            Self::RippleGlyph => blank_frame(width, height),
        }
    }
}

/// Pools owned by the active mode.
#[derive(Debug, Clone)]
pub enum ModeState {
    DigitalRain { rain: RainField },
    RippleGlyph { ripples: RipplePool, glyphs: GlyphPool },
}

/// Everything the overlay layer needs from the current tick.
#[derive(Debug, Clone, Copy)]
pub struct OverlayContext {
    pub energy: EnergySummary,
    pub now_ms: f64,
    pub delta_ms: f32,
    pub width: f32,
    pub height: f32,
}

impl ModeState {
    pub fn new(mode: VisualizerMode, config: &VisualConfig) -> Self {
        match mode {
            VisualizerMode::DigitalRain => Self::DigitalRain {
                rain: RainField::new(config.rain.clone()),
            },
            VisualizerMode::RippleGlyph => Self::RippleGlyph {
                ripples: RipplePool::new(config.ripples.clone()),
                glyphs: GlyphPool::new(config.glyphs.clone(), config.rain.charset),
            },
        }
    }

    pub fn mode(&self) -> VisualizerMode {
        match self {
            Self::DigitalRain { .. } => VisualizerMode::DigitalRain,
            Self::RippleGlyph { .. } => VisualizerMode::RippleGlyph,
        }
    }

    /// Rebuilds size dependent state. Only the rain depends on the canvas.
    pub fn resize<R: Rng + ?Sized>(&mut self, rng: &mut R, width: f32, height: f32) {
        if let Self::DigitalRain { rain } = self {
            rain.resize(rng, width, height);
        }
    }

    /// Drops session-scoped entities. Rain columns belong to the canvas, not
    /// the session, and are kept.
    pub fn clear_session(&mut self) {
        if let Self::RippleGlyph { ripples, glyphs } = self {
            ripples.clear();
            glyphs.clear();
        }
    }

    /// Low-performance mode just kicked in.
    pub fn degrade(&mut self) {
        if let Self::DigitalRain { rain } = self {
            rain.thin();
        }
    }

    /// Updates the mode's pools and draws them into the overlay layer.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        context: &OverlayContext,
        commands: &mut RenderCommands,
    ) {
        commands.begin(Layer::Overlay);
        match self {
            Self::DigitalRain { rain } => rain.update(rng, &context.energy, commands),
            Self::RippleGlyph { ripples, glyphs } => {
                let extent = context.width.min(context.height);
                ripples.maybe_spawn(rng, &context.energy, context.now_ms, extent);
                ripples.ensure_one(context.now_ms, extent);
                ripples.advance();
                ripples.draw(Point::ORIGIN, commands);

                glyphs.spawn_for(rng, &context.energy, context.width / 2.0, context.height / 2.0);
                glyphs.advance(context.delta_ms);
                glyphs.draw(commands);
            }
        }
    }
}
