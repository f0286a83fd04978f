//! Falling glyph columns drawn over the scene in digital-rain mode.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    config::RainConfig,
    render::{Color, DrawCommand, Glow, Point, RenderCommands, TextAlign},
    EnergySummary,
};

const ENERGY_THRESHOLD: f32 = 0.01;
const SPEED_STEP: f32 = 0.005;
const SPEED_BAND: (f32, f32) = (0.7, 1.3);
const SURGE_SPEED: f32 = 1.05;
const SURGE_OPACITY: f32 = 1.1;
/// Ceiling of the loudness surge multiplier, keeps scroll speed finite.
const MAX_SURGE: f32 = 8.0;
const FONT_SIZE: f32 = 16.0;

const DIGITS: [char; 10] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

const HANGUL_JAMO: [char; 24] = [
    'ㄱ', 'ㄴ', 'ㄷ', 'ㄹ', 'ㅁ', 'ㅂ', 'ㅅ', 'ㅇ', 'ㅈ', 'ㅊ', 'ㅋ', 'ㅌ', 'ㅍ', 'ㅎ', 'ㅏ', 'ㅑ',
    'ㅓ', 'ㅕ', 'ㅗ', 'ㅛ', 'ㅜ', 'ㅠ', 'ㅡ', 'ㅣ',
];

const GREEK_CAPITALS: [char; 24] = [
    'Α', 'Β', 'Γ', 'Δ', 'Ε', 'Ζ', 'Η', 'Θ', 'Ι', 'Κ', 'Λ', 'Μ', 'Ν', 'Ξ', 'Ο', 'Π', 'Ρ', 'Σ',
    'Τ', 'Υ', 'Φ', 'Χ', 'Ψ', 'Ω',
];

/// Symbol set the rain and the floating glyphs are drawn from. Both sets
/// also contain the ten digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Charset {
    #[default]
    Hangul,
    Greek,
}

impl Charset {
    fn letters(self) -> &'static [char] {
        match self {
            Self::Hangul => &HANGUL_JAMO,
            Self::Greek => &GREEK_CAPITALS,
        }
    }

    pub fn len(self) -> usize {
        DIGITS.len() + self.letters().len()
    }

    pub fn contains(self, symbol: char) -> bool {
        DIGITS.contains(&symbol) || self.letters().contains(&symbol)
    }

    pub fn pick<R: Rng + ?Sized>(self, rng: &mut R) -> char {
        let index = rng.gen_range(0..self.len());
        match DIGITS.get(index) {
            Some(&digit) => digit,
            None => self.letters()[index - DIGITS.len()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RainGlyph {
    pub symbol: char,
    pub brightness: f32,
}

impl RainGlyph {
    fn random<R: Rng + ?Sized>(rng: &mut R, charset: Charset) -> Self {
        Self {
            symbol: charset.pick(rng),
            brightness: rng.gen_range(0.5..1.0),
        }
    }
}

/// One fixed-x column of falling glyphs. Wraps to the top instead of dying.
#[derive(Debug, Clone, PartialEq)]
pub struct RainColumn {
    pub x: f32,
    pub y: f32,
    pub base_speed: f32,
    pub speed_variation: f32,
    /// Direction of the speed walk, `1.0` or `-1.0`.
    pub speed_pattern: f32,
    pub current_speed: f32,
    /// Loudness multiplier on scroll speed, ratcheted by sustained input.
    pub surge: f32,
    /// Visible rows, at most `glyphs.len()`.
    pub length: usize,
    pub glyphs: Vec<RainGlyph>,
    pub opacity: f32,
}

impl RainColumn {
    fn new<R: Rng + ?Sized>(rng: &mut R, x: f32, y: f32, config: &RainConfig) -> Self {
        let base_speed = rng.gen_range(0.1..0.9);
        let rows = config.glyph_rows.max(1);
        let shortest = rows.min(5);
        Self {
            x,
            y,
            base_speed,
            speed_variation: rng.gen_range(0.1..0.4),
            speed_pattern: if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
            current_speed: base_speed,
            surge: 1.0,
            length: if rows > shortest {
                rng.gen_range(shortest..rows)
            } else {
                rows
            },
            glyphs: (0..rows)
                .map(|_| RainGlyph::random(rng, config.charset))
                .collect(),
            opacity: rng.gen_range(0.3..1.0),
        }
    }

    /// Advances the bounded speed walk by one tick. `current_speed` never
    /// leaves `[0.7, 1.3] * base_speed`; the walk turns around at the edges.
    pub fn step_speed(&mut self) {
        let low = self.base_speed * SPEED_BAND.0;
        let high = self.base_speed * SPEED_BAND.1;
        let next = self.current_speed + self.speed_variation * self.speed_pattern * SPEED_STEP;
        if next < low || next > high {
            self.speed_pattern = -self.speed_pattern;
            self.current_speed = next.clamp(low, high);
        } else {
            self.current_speed = next;
        }
    }

    fn reseed<R: Rng + ?Sized>(&mut self, rng: &mut R, charset: Charset) {
        for glyph in &mut self.glyphs {
            *glyph = RainGlyph::random(rng, charset);
        }
    }
}

/// All rain columns for one canvas size. Columns are built on resize and
/// live until the size changes.
#[derive(Debug, Clone)]
pub struct RainField {
    config: RainConfig,
    columns: Vec<RainColumn>,
    width: f32,
    height: f32,
}

impl RainField {
    pub fn new(config: RainConfig) -> Self {
        Self {
            config,
            columns: Vec::new(),
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn columns(&self) -> &[RainColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Lays out `floor(width / spacing)` columns across the canvas. A repeat
    /// call with the same size keeps the existing columns.
    pub fn resize<R: Rng + ?Sized>(&mut self, rng: &mut R, width: f32, height: f32) {
        if !self.columns.is_empty() && self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;

        let spacing = self.config.column_spacing;
        let count = (width / spacing).floor().max(0.0) as usize;
        let top = -height / 2.0;
        self.columns = (0..count)
            .map(|index| RainColumn::new(rng, index as f32 * spacing - width / 2.0, top, &self.config))
            .collect();
    }

    /// Drops every other column. There is no way back short of a resize.
    pub fn thin(&mut self) {
        let mut index = 0;
        self.columns.retain(|_| {
            let keep = index % 2 == 0;
            index += 1;
            keep
        });
    }

    /// Scrolls every column one tick and draws its visible glyphs.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        energy: &EnergySummary,
        commands: &mut RenderCommands,
    ) {
        let level = energy.overall;
        let charged = level > ENERGY_THRESHOLD;
        let effective = ((level - ENERGY_THRESHOLD) / (1.0 - ENERGY_THRESHOLD)).max(0.0);
        let change_probability = (level * 2.0).min(1.0);
        let bottom = self.height / 2.0;
        let charset = self.config.charset;

        for column in &mut self.columns {
            column.step_speed();

            let multiplier = if charged {
                1.0 + effective * self.config.energy_factor * rng.gen_range(0.2..1.0)
            } else {
                1.0
            };
            let speed = column.current_speed * multiplier * column.surge;
            let base_opacity = column.opacity * (0.5 + effective * 0.6);
            let rows = column.glyphs.len().max(1);

            for row in 0..column.length {
                let y = column.y + row as f32 * self.config.row_height;
                if y > bottom {
                    continue;
                }

                let slot = row % rows;
                if rng.gen::<f32>() < change_probability {
                    let brightness = 0.4 + effective * 0.7 + rng.gen::<f32>() * 0.3;
                    column.glyphs[slot] = RainGlyph {
                        symbol: charset.pick(rng),
                        brightness: brightness.min(1.0),
                    };
                }

                let glyph = column.glyphs[slot];
                let depth = row as f32 / column.length as f32;
                let alpha = base_opacity * (1.0 - depth) * glyph.brightness;
                let (hue, lightness) = if charged {
                    (120.0 + effective * 60.0, 50.0 + effective * 25.0 + depth * 20.0)
                } else {
                    (120.0, 50.0 + depth * 20.0)
                };
                let saturation = 100.0 - depth * 30.0;
                let color = Color::hsla(hue, saturation, lightness, alpha);
                let position = Point::new(column.x, y);

                commands.push(glyph_text(
                    glyph.symbol,
                    position,
                    color,
                    Glow::new(color.with_alpha(alpha * 0.5), 4.0 + glyph.brightness * 4.0),
                ));

                if row == 0 {
                    commands.push(glyph_text(
                        glyph.symbol,
                        position,
                        Color::hsla(hue, saturation, lightness + 20.0, alpha),
                        Glow::new(color.with_alpha(alpha * 0.5), 8.0 + glyph.brightness * 8.0),
                    ));
                }
            }

            column.y += speed;
            if column.y > bottom {
                column.y = -bottom;
                column.reseed(rng, charset);
            }
        }

        if level > self.config.surge_threshold {
            for column in &mut self.columns {
                column.surge = (column.surge * SURGE_SPEED).min(MAX_SURGE);
                column.opacity = (column.opacity * SURGE_OPACITY).min(1.0);
            }
        }
    }
}

fn glyph_text(symbol: char, position: Point, color: Color, glow: Glow) -> DrawCommand {
    DrawCommand::Text {
        text: symbol.to_string(),
        position,
        size: FONT_SIZE,
        bold: false,
        align: TextAlign::Start,
        color,
        glow: Some(glow),
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn field(width: f32, height: f32, seed: u64) -> (RainField, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut field = RainField::new(RainConfig::default());
        field.resize(&mut rng, width, height);
        (field, rng)
    }

    fn energy(overall: f32) -> EnergySummary {
        EnergySummary {
            bass: overall,
            mid: overall,
            overall,
        }
    }

    #[test]
    fn charsets_mix_digits_with_their_letters() {
        assert_eq!(Charset::default(), Charset::Hangul);
        assert_eq!(Charset::Hangul.len(), 34);
        assert!(Charset::Hangul.contains('ㅎ'));
        assert!(Charset::Greek.contains('Ω'));
        assert!(!Charset::Hangul.contains('Ω'));

        let mut rng = StdRng::seed_from_u64(3);
        for charset in [Charset::Hangul, Charset::Greek] {
            for _ in 0..200 {
                assert!(charset.contains(charset.pick(&mut rng)));
            }
        }
    }

    #[test]
    fn lays_out_one_column_per_spacing() {
        let (field, _) = field(400.0, 300.0, 1);
        assert_eq!(field.len(), 26);
        assert_eq!(field.columns()[0].x, -200.0);
        assert_eq!(field.columns()[1].x, -185.0);
        for column in field.columns() {
            assert_eq!(column.y, -150.0);
            assert!((0.1..0.9).contains(&column.base_speed));
            assert!((0.1..0.4).contains(&column.speed_variation));
            assert!(column.speed_pattern.abs() == 1.0);
            assert_eq!(column.glyphs.len(), 20);
            assert!((5..20).contains(&column.length));
            assert!(column
                .glyphs
                .iter()
                .all(|glyph| Charset::Hangul.contains(glyph.symbol)));
        }
    }

    #[test]
    fn resize_to_same_size_keeps_columns() {
        let (mut field, mut rng) = field(300.0, 200.0, 2);
        let before = field.columns().to_vec();
        field.resize(&mut rng, 300.0, 200.0);
        assert_eq!(field.columns(), &before[..]);

        field.resize(&mut rng, 150.0, 200.0);
        assert_eq!(field.len(), 10);
    }

    #[test]
    fn speed_walk_stays_in_band() {
        let (mut field, mut rng) = field(600.0, 400.0, 3);
        let mut commands = RenderCommands::new();
        for tick in 0..5_000 {
            let level = (tick % 7) as f32 / 7.0;
            field.update(&mut rng, &energy(level), &mut commands);
            for column in field.columns() {
                assert!(column.current_speed >= column.base_speed * 0.7);
                assert!(column.current_speed <= column.base_speed * 1.3);
            }
        }
    }

    #[test]
    fn speed_walk_turns_around_at_the_edge() {
        let (mut field, _) = field(30.0, 100.0, 4);
        let column = &mut field.columns[0];
        column.base_speed = 1.0;
        column.speed_variation = 0.4;
        column.speed_pattern = 1.0;
        column.current_speed = 1.299;

        column.step_speed();
        assert_eq!(column.speed_pattern, -1.0);
        assert_eq!(column.current_speed, 1.3);

        column.step_speed();
        assert!(column.current_speed < 1.3);
    }

    #[test]
    fn column_wraps_past_the_bottom() {
        let (mut field, mut rng) = field(30.0, 100.0, 5);
        field.columns[0].y = 49.99;
        field.columns[0].current_speed = field.columns[0].base_speed;
        let mut commands = RenderCommands::new();

        field.update(&mut rng, &EnergySummary::SILENT, &mut commands);
        assert_eq!(field.columns()[0].y, -50.0);
    }

    #[test]
    fn loud_input_ratchets_opacity_up_to_one() {
        let (mut field, mut rng) = field(150.0, 300.0, 6);
        let mut commands = RenderCommands::new();
        let before: Vec<f32> = field.columns().iter().map(|column| column.opacity).collect();

        for _ in 0..50 {
            field.update(&mut rng, &energy(0.8), &mut commands);
        }

        for (column, start) in field.columns().iter().zip(before) {
            assert!(column.opacity >= start);
            assert_eq!(column.opacity, 1.0);
            assert!(column.surge > 1.0 && column.surge <= MAX_SURGE);
        }
    }

    #[test]
    fn quiet_input_leaves_surge_alone() {
        let (mut field, mut rng) = field(150.0, 300.0, 7);
        let mut commands = RenderCommands::new();
        for _ in 0..20 {
            field.update(&mut rng, &energy(0.2), &mut commands);
        }
        assert!(field.columns().iter().all(|column| column.surge == 1.0));
    }

    #[test]
    fn thinning_drops_every_other_column() {
        let (mut field, _) = field(300.0, 300.0, 8);
        let xs: Vec<f32> = field.columns().iter().map(|column| column.x).collect();
        field.thin();
        let kept: Vec<f32> = field.columns().iter().map(|column| column.x).collect();
        let expected: Vec<f32> = xs.iter().step_by(2).copied().collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn head_glyph_is_drawn_twice() {
        let (mut field, mut rng) = field(15.0, 2_000.0, 9);
        let length = field.columns()[0].length;
        let mut commands = RenderCommands::new();
        field.update(&mut rng, &EnergySummary::SILENT, &mut commands);
        assert_eq!(commands.len(), length + 1);
    }

    #[test]
    fn rows_below_the_canvas_are_skipped() {
        let (mut field, mut rng) = field(15.0, 100.0, 10);
        field.columns[0].length = 19;
        field.columns[0].y = 10.0;
        let mut commands = RenderCommands::new();
        field.update(&mut rng, &EnergySummary::SILENT, &mut commands);
        // Rows at y = 10 and 28 and 46 fit above the bottom edge at 50.
        assert_eq!(commands.len(), 3 + 1);
    }
}
