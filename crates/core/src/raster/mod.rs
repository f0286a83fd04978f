//! tiny-skia backed drawing surface that rasterises a [`RenderCommands`]
//! display list.

mod font;

use std::path::Path;

use tiny_skia::{
    FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Shader, SpreadMode, Stroke, Transform,
};
use tracing::debug;

use crate::{
    config::SurfaceConfig,
    render::{
        Color, DrawCommand, Glow, GradientArea, Point, RadialGradient, Rect, RenderCommands,
        TextAlign,
    },
    Result, SpectronError,
};

/// Number of translucent rings used to fake a shadow blur.
const GLOW_STEPS: usize = 4;
/// Height of a text cell relative to the requested font size.
const CELL_HEIGHT: f32 = 0.7;

/// Pixel buffer sized `logical * device_pixel_ratio`. Commands are given in
/// logical units around the centre; the transform maps them to device pixels.
///
/// Text goes through a 5x7 bitmap font. Only ASCII letters, digits and a few
/// marks have real shapes; Hangul, Greek and every other script render as a
/// framed cell derived from the code point, so rain and floating glyphs keep
/// their density and motion but are not legible.
pub struct Surface {
    pixmap: Pixmap,
    config: SurfaceConfig,
    transform: Transform,
}

impl Surface {
    pub fn new(config: SurfaceConfig) -> Result<Self> {
        let (pixmap, transform) = allocate(&config)?;
        debug!(
            width = pixmap.width(),
            height = pixmap.height(),
            dpr = config.device_pixel_ratio,
            "allocated drawing surface"
        );
        Ok(Self {
            pixmap,
            config,
            transform,
        })
    }

    /// Logical width and height.
    pub fn logical_size(&self) -> (f32, f32) {
        (self.config.width as f32, self.config.height as f32)
    }

    /// Backing size in device pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    /// Premultiplied RGBA bytes, row major.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Clears the surface and composites `commands` in list order.
    pub fn draw(&mut self, commands: &RenderCommands) {
        self.clear();
        for entry in commands {
            self.draw_command(&entry.command);
        }
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|error| SpectronError::Png(error.to_string()))
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.encode_png()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn draw_command(&mut self, command: &DrawCommand) {
        match command {
            DrawCommand::FillRect { rect, color } => self.fill_rect(*rect, *color),
            DrawCommand::FillGradient { area, gradient } => self.fill_gradient(area, gradient),
            DrawCommand::FillCircle {
                center,
                radius,
                color,
                glow,
            } => {
                if let Some(glow) = glow {
                    for (spread, alpha) in glow_rings(glow, color.alpha()) {
                        self.fill_circle(*center, radius + spread, glow.color.with_alpha(alpha));
                    }
                }
                self.fill_circle(*center, *radius, *color);
            }
            DrawCommand::StrokeCircle {
                center,
                radius,
                width,
                color,
                glow,
            } => {
                let Some(path) = PathBuilder::from_circle(center.x, center.y, radius.max(0.0))
                else {
                    return;
                };
                if let Some(glow) = glow {
                    for (spread, alpha) in glow_rings(glow, color.alpha()) {
                        self.stroke(&path, width + spread * 2.0, glow.color.with_alpha(alpha));
                    }
                }
                self.stroke(&path, *width, *color);
            }
            DrawCommand::StrokeLine {
                from,
                to,
                width,
                color,
            } => {
                let mut builder = PathBuilder::new();
                builder.move_to(from.x, from.y);
                builder.line_to(to.x, to.y);
                if let Some(path) = builder.finish() {
                    self.stroke(&path, *width, *color);
                }
            }
            DrawCommand::StrokePath {
                points,
                closed,
                width,
                color,
                glow,
            } => {
                let Some(path) = polyline(points, *closed) else {
                    return;
                };
                if let Some(glow) = glow {
                    for (spread, alpha) in glow_rings(glow, color.alpha()) {
                        self.stroke(&path, width + spread * 2.0, glow.color.with_alpha(alpha));
                    }
                }
                self.stroke(&path, *width, *color);
            }
            DrawCommand::Text {
                text,
                position,
                size,
                bold,
                align,
                color,
                glow,
            } => {
                if let Some(glow) = glow {
                    for (spread, alpha) in glow_rings(glow, color.alpha()) {
                        let halo = glow.color.with_alpha(alpha);
                        self.text(text, *position, *size, *bold, *align, spread, halo);
                    }
                }
                self.text(text, *position, *size, *bold, *align, 0.0, *color);
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(bounds) = tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)
        else {
            return;
        };
        let paint = solid(color);
        self.pixmap.fill_rect(bounds, &paint, self.transform, None);
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Color) {
        if radius <= 0.0 || color.alpha() <= 0.0 {
            return;
        }
        let Some(path) = PathBuilder::from_circle(center.x, center.y, radius) else {
            return;
        };
        let paint = solid(color);
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, self.transform, None);
    }

    fn fill_gradient(&mut self, area: &GradientArea, gradient: &RadialGradient) {
        let path = match *area {
            GradientArea::Rect(rect) => {
                tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)
                    .map(PathBuilder::from_rect)
            }
            GradientArea::Circle { center, radius } => {
                PathBuilder::from_circle(center.x, center.y, radius)
            }
        };
        let (Some(path), Some(shader)) = (path, radial_shader(gradient)) else {
            return;
        };
        let paint = Paint {
            shader,
            anti_alias: true,
            ..Paint::default()
        };
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, self.transform, None);
    }

    fn stroke(&mut self, path: &tiny_skia::Path, width: f32, color: Color) {
        if width <= 0.0 || color.alpha() <= 0.0 {
            return;
        }
        let stroke = Stroke {
            width,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        let paint = solid(color);
        self.pixmap
            .stroke_path(path, &paint, &stroke, self.transform, None);
    }

    /// Stamps bitmap font cells. `spread` grows every lit cell outward, which
    /// is how glow passes widen text.
    #[allow(clippy::too_many_arguments)]
    fn text(
        &mut self,
        text: &str,
        position: Point,
        size: f32,
        bold: bool,
        align: TextAlign,
        spread: f32,
        color: Color,
    ) {
        if color.alpha() <= 0.0 || size <= 0.0 {
            return;
        }
        let pixel = size * CELL_HEIGHT / font::ROWS as f32;
        let advance = pixel * (font::COLUMNS + 1) as f32;
        let glyph_count = text.chars().count() as f32;
        let left = match align {
            TextAlign::Start => position.x,
            TextAlign::Center => position.x - (glyph_count * advance - pixel) / 2.0,
        };
        let top = position.y - pixel * font::ROWS as f32 / 2.0;
        let weight = if bold { pixel * 0.25 } else { 0.0 };

        let mut builder = PathBuilder::new();
        for (index, symbol) in text.chars().enumerate() {
            let origin_x = left + index as f32 * advance;
            for (row, bits) in font::pattern(symbol).iter().enumerate() {
                for column in 0..font::COLUMNS {
                    if (bits >> (font::COLUMNS - 1 - column)) & 1 == 0 {
                        continue;
                    }
                    let x = origin_x + column as f32 * pixel - spread;
                    let y = top + row as f32 * pixel - spread;
                    let side = pixel + spread * 2.0;
                    if let Some(cell) = tiny_skia::Rect::from_xywh(x, y, side + weight, side) {
                        builder.push_rect(cell);
                    }
                }
            }
        }
        if let Some(path) = builder.finish() {
            let paint = solid(color);
            self.pixmap
                .fill_path(&path, &paint, FillRule::Winding, self.transform, None);
        }
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("config", &self.config)
            .field("pixels", &self.pixel_size())
            .finish()
    }
}

fn allocate(config: &SurfaceConfig) -> Result<(Pixmap, Transform)> {
    let dpr = config.device_pixel_ratio;
    let width = (config.width as f32 * dpr).round() as u32;
    let height = (config.height as f32 * dpr).round() as u32;
    let pixmap = Pixmap::new(width, height).ok_or(SpectronError::Surface { width, height })?;

    let half_width = config.width as f32 / 2.0;
    let half_height = config.height as f32 / 2.0;
    let transform = Transform::from_row(dpr, 0.0, 0.0, dpr, half_width * dpr, half_height * dpr);
    Ok((pixmap, transform))
}

fn to_skia(color: Color) -> tiny_skia::Color {
    let [r, g, b, a] = color.to_rgba8();
    tiny_skia::Color::from_rgba8(r, g, b, a)
}

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(to_skia(color));
    paint.anti_alias = true;
    paint
}

/// Canvas gradients interpolate between two circles; tiny-skia starts at a
/// point. The inner circle is folded into the stop offsets instead.
fn radial_shader(gradient: &RadialGradient) -> Option<Shader<'static>> {
    if gradient.outer_radius <= 0.0 {
        return None;
    }
    let inner = (gradient.inner_radius / gradient.outer_radius).clamp(0.0, 1.0);
    let stops = gradient
        .stops
        .iter()
        .map(|stop| {
            let offset = inner + stop.offset.clamp(0.0, 1.0) * (1.0 - inner);
            tiny_skia::GradientStop::new(offset, to_skia(stop.color))
        })
        .collect();

    tiny_skia::RadialGradient::new(
        tiny_skia::Point::from_xy(gradient.focal.x, gradient.focal.y),
        tiny_skia::Point::from_xy(gradient.center.x, gradient.center.y),
        gradient.outer_radius,
        stops,
        SpreadMode::Pad,
        Transform::identity(),
    )
}

fn polyline(points: &[Point], closed: bool) -> Option<tiny_skia::Path> {
    let (first, rest) = points.split_first()?;
    let mut builder = PathBuilder::new();
    builder.move_to(first.x, first.y);
    for point in rest {
        builder.line_to(point.x, point.y);
    }
    if closed {
        builder.close();
    }
    builder.finish()
}

/// Rings from widest to tightest. Alpha falls off with the spread so the
/// stacked rings approximate a blurred edge. Like a canvas shadow, the halo
/// is scaled by the `opacity` of the shape casting it.
fn glow_rings(glow: &Glow, opacity: f32) -> impl Iterator<Item = (f32, f32)> + '_ {
    let base = glow.color.alpha() * opacity;
    (1..=GLOW_STEPS).rev().filter_map(move |step| {
        if glow.blur <= 0.0 || base <= 0.0 {
            return None;
        }
        let fraction = step as f32 / GLOW_STEPS as f32;
        let spread = glow.blur * 0.5 * fraction;
        let alpha = base * (1.0 - fraction + 1.0 / GLOW_STEPS as f32) * 0.35;
        Some((spread, alpha))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{blank_frame, standby_frame, DrawCommand, Layer};

    fn config(width: u32, height: u32, dpr: f32) -> SurfaceConfig {
        SurfaceConfig {
            width,
            height,
            device_pixel_ratio: dpr,
        }
    }

    fn pixel(surface: &Surface, x: u32, y: u32) -> [u8; 4] {
        let (width, _) = surface.pixel_size();
        let offset = ((y * width + x) * 4) as usize;
        let data = surface.data();
        [data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]
    }

    #[test]
    fn backing_size_follows_device_pixel_ratio() {
        let surface = Surface::new(config(100, 50, 2.0)).unwrap();
        assert_eq!(surface.pixel_size(), (200, 100));
        assert_eq!(surface.logical_size(), (100.0, 50.0));
    }

    #[test]
    fn zero_sized_surface_is_an_error() {
        assert!(matches!(
            Surface::new(config(0, 10, 1.0)),
            Err(SpectronError::Surface { .. })
        ));
    }

    #[test]
    fn origin_maps_to_the_centre() {
        let mut surface = Surface::new(config(40, 40, 1.0)).unwrap();
        let mut commands = RenderCommands::new();
        commands.begin(Layer::Core);
        commands.push(DrawCommand::FillCircle {
            center: Point::ORIGIN,
            radius: 4.0,
            color: Color::rgba(255, 0, 0, 1.0),
            glow: None,
        });
        surface.draw(&commands);

        assert_eq!(pixel(&surface, 20, 20), [255, 0, 0, 255]);
        assert_eq!(pixel(&surface, 2, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn standby_frame_rasterises_identically() {
        let mut surface = Surface::new(config(320, 180, 1.0)).unwrap();
        surface.draw(&standby_frame(320.0, 180.0));
        let first = surface.data().to_vec();
        surface.draw(&standby_frame(320.0, 180.0));
        assert_eq!(first, surface.data());

        // Text pixels differ from the plain fill.
        let corner = pixel(&surface, 1, 1);
        assert!(first.chunks(4).any(|rgba| rgba != corner));
    }

    #[test]
    fn blank_frame_is_uniform() {
        let mut surface = Surface::new(config(64, 32, 1.0)).unwrap();
        surface.draw(&blank_frame(64.0, 32.0));
        let corner = pixel(&surface, 0, 0);
        assert!(surface.data().chunks(4).all(|rgba| rgba == corner));
        assert!(corner[3] > 200);
    }

    #[test]
    fn png_encoding_produces_a_signature() {
        let mut surface = Surface::new(config(16, 16, 1.0)).unwrap();
        surface.draw(&blank_frame(16.0, 16.0));
        let bytes = surface.encode_png().unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn glow_rings_shrink_towards_the_shape() {
        let glow = Glow::new(Color::rgba(0, 255, 0, 1.0), 20.0);
        let rings: Vec<(f32, f32)> = glow_rings(&glow, 1.0).collect();
        assert_eq!(rings.len(), GLOW_STEPS);
        assert!(rings.windows(2).all(|pair| pair[0].0 > pair[1].0));
        assert!(glow_rings(&Glow::new(Color::rgba(0, 0, 0, 1.0), 0.0), 1.0)
            .next()
            .is_none());
        assert!(glow_rings(&glow, 0.0).next().is_none());
    }
}
