//! Floating neon characters of the ripple mode.

use std::f32::consts::PI;

use rand::Rng;

use crate::{
    config::GlyphConfig,
    particles::REFERENCE_FRAME_MS,
    rain::Charset,
    render::{Color, DrawCommand, Glow, Point, RenderCommands, TextAlign},
    EnergySummary,
};

const GLOW_LAYERS: [(Color, f32); 2] = [
    (Color::rgba(0x00, 0xff, 0x99, 1.0), 10.0),
    (Color::rgba(0x00, 0xe6, 0x76, 1.0), 25.0),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub symbol: char,
    pub position: Point,
    pub size: f32,
    pub age: f32,
    pub max_age: f32,
    pub speed: f32,
}

impl Glyph {
    /// `sin(pi * age / max_age)`: rises from 0, peaks mid-life, back to 0.
    pub fn envelope(&self) -> f32 {
        if self.max_age <= 0.0 {
            return 0.0;
        }
        let ratio = (self.age / self.max_age).clamp(0.0, 1.0);
        (ratio * PI).sin()
    }

    pub fn opacity(&self) -> f32 {
        self.envelope().powf(1.8)
    }

    /// Swells to one and a half times its base size at mid-life.
    pub fn display_size(&self) -> f32 {
        self.size * (1.0 + self.envelope() * 0.5)
    }
}

#[derive(Debug, Clone)]
pub struct GlyphPool {
    config: GlyphConfig,
    charset: Charset,
    glyphs: Vec<Glyph>,
}

impl GlyphPool {
    /// Creates an empty pool drawing symbols from `charset`.
    pub fn new(config: GlyphConfig, charset: Charset) -> Self {
        Self {
            glyphs: Vec::with_capacity(config.capacity),
            config,
            charset,
        }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Glyph> {
        self.glyphs.iter()
    }

    pub fn clear(&mut self) {
        self.glyphs.clear();
    }

    /// Adds one glyph at `position` unless the pool is full.
    pub fn spawn<R: Rng + ?Sized>(&mut self, rng: &mut R, position: Point) -> bool {
        if self.glyphs.len() >= self.config.capacity {
            return false;
        }
        self.glyphs.push(Glyph {
            symbol: self.charset.pick(rng),
            position,
            size: rng.gen_range(20.0..50.0),
            age: 0.0,
            max_age: rng.gen_range(40.0..80.0),
            speed: rng.gen_range(1.5..2.5),
        });
        true
    }

    /// Scatters `floor(overall * spawn_gain)` glyphs over the canvas whose
    /// half extents are `half_width` and `half_height`.
    pub fn spawn_for<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        energy: &EnergySummary,
        half_width: f32,
        half_height: f32,
    ) -> usize {
        if energy.overall <= self.config.spawn_floor {
            return 0;
        }
        let wanted = (energy.overall * self.config.spawn_gain).floor() as usize;
        let mut spawned = 0;
        for _ in 0..wanted {
            let position = Point::new(
                rng.gen_range(-1.0..1.0) * half_width,
                rng.gen_range(-1.0..1.0) * half_height,
            );
            if !self.spawn(rng, position) {
                break;
            }
            spawned += 1;
        }
        spawned
    }

    /// Ages every glyph and removes those past their lifetime.
    pub fn advance(&mut self, delta_ms: f32) {
        let steps = delta_ms.max(0.0) / REFERENCE_FRAME_MS;
        self.glyphs.retain_mut(|glyph| {
            glyph.age += glyph.speed * steps;
            glyph.age < glyph.max_age
        });
    }

    /// Two coloured glow passes, then a plain white pass on top.
    pub fn draw(&self, commands: &mut RenderCommands) {
        for glyph in &self.glyphs {
            let size = glyph.display_size();
            let opacity = glyph.opacity();
            let text = glyph.symbol.to_string();

            for (glow_color, blur) in GLOW_LAYERS {
                commands.push(DrawCommand::Text {
                    text: text.clone(),
                    position: glyph.position,
                    size,
                    bold: true,
                    align: TextAlign::Center,
                    color: Color::rgba(186, 255, 201, opacity),
                    glow: Some(Glow::new(glow_color, blur * size / 40.0)),
                });
            }
            commands.push(DrawCommand::Text {
                text,
                position: glyph.position,
                size,
                bold: true,
                align: TextAlign::Center,
                color: Color::rgba(255, 255, 255, opacity),
                glow: None,
            });
        }
    }
}
