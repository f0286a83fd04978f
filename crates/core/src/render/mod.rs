//! Display list produced by the layered renderer.
//!
//! Everything is expressed in logical pixels around a centre origin; the
//! rasteriser owns the device pixel ratio and the centre translation.

pub mod layers;

use std::f32::consts::TAU;

pub use layers::{blank_frame, standby_frame, LayerPainter};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Point at `radius` from `self` along `angle` (radians, y pointing down).
    pub fn polar(self, angle: f32, radius: f32) -> Self {
        Self::new(self.x + angle.cos() * radius, self.y + angle.sin() * radius)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Rectangle of the given size centred on the origin.
    pub fn centred(width: f32, height: f32) -> Self {
        Self {
            x: -width / 2.0,
            y: -height / 2.0,
            width,
            height,
        }
    }
}

/// CSS-style colour. Hue in degrees, saturation and lightness in percent,
/// alpha in `[0, 1]`. Out-of-range components are clamped when resolved,
/// the way a canvas clamps colour strings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    Rgba { r: u8, g: u8, b: u8, a: f32 },
    Hsla { h: f32, s: f32, l: f32, a: f32 },
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self::Rgba { r, g, b, a }
    }

    pub const fn hsla(h: f32, s: f32, l: f32, a: f32) -> Self {
        Self::Hsla { h, s, l, a }
    }

    pub fn alpha(&self) -> f32 {
        match *self {
            Self::Rgba { a, .. } | Self::Hsla { a, .. } => a.clamp(0.0, 1.0),
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        match self {
            Self::Rgba { r, g, b, .. } => Self::Rgba { r, g, b, a: alpha },
            Self::Hsla { h, s, l, .. } => Self::Hsla { h, s, l, a: alpha },
        }
    }

    /// Resolves to straight (non-premultiplied) 8-bit RGBA.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let alpha = (self.alpha() * 255.0).round() as u8;
        match *self {
            Self::Rgba { r, g, b, .. } => [r, g, b, alpha],
            Self::Hsla { h, s, l, .. } => {
                let [r, g, b] = hsl_to_rgb(h, s / 100.0, l / 100.0);
                [r, g, b, alpha]
            }
        }
    }
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> [u8; 3] {
    let h = hue.rem_euclid(360.0) / 360.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |t: f32| {
        let t = t.rem_euclid(1.0);
        let value = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (value * 255.0).round().clamp(0.0, 255.0) as u8
    };

    [channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0)]
}

/// Soft halo around a primitive, the equivalent of a canvas shadow with no
/// offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glow {
    pub color: Color,
    pub blur: f32,
}

impl Glow {
    pub fn new(color: Color, blur: f32) -> Self {
        Self { color, blur }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

impl GradientStop {
    pub fn new(offset: f32, color: Color) -> Self {
        Self { offset, color }
    }
}

/// Radial gradient running from `inner_radius` around `focal` to
/// `outer_radius` around `center`.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialGradient {
    pub focal: Point,
    pub center: Point,
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub stops: Vec<GradientStop>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientArea {
    Rect(Rect),
    Circle { center: Point, radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Start,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        color: Color,
    },
    FillGradient {
        area: GradientArea,
        gradient: RadialGradient,
    },
    FillCircle {
        center: Point,
        radius: f32,
        color: Color,
        glow: Option<Glow>,
    },
    StrokeCircle {
        center: Point,
        radius: f32,
        width: f32,
        color: Color,
        glow: Option<Glow>,
    },
    StrokeLine {
        from: Point,
        to: Point,
        width: f32,
        color: Color,
    },
    StrokePath {
        points: Vec<Point>,
        closed: bool,
        width: f32,
        color: Color,
        glow: Option<Glow>,
    },
    Text {
        text: String,
        position: Point,
        size: f32,
        bold: bool,
        align: TextAlign,
        color: Color,
        glow: Option<Glow>,
    },
}

/// Compositing slots in back-to-front order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Background,
    Particles,
    Core,
    Bars,
    Waveform,
    Flash,
    Overlay,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayeredCommand {
    pub layer: Layer,
    pub command: DrawCommand,
}

/// Ordered display list for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderCommands {
    commands: Vec<LayeredCommand>,
    current: Option<Layer>,
}

impl RenderCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following [`push`](Self::push) lands in `layer`. Layers must be
    /// opened in compositing order.
    pub fn begin(&mut self, layer: Layer) {
        debug_assert!(
            self.current.map_or(true, |current| current <= layer),
            "layer {layer:?} opened after {:?}",
            self.current
        );
        self.current = Some(layer);
    }

    pub fn push(&mut self, command: DrawCommand) {
        let layer = self.current.unwrap_or(Layer::Background);
        self.commands.push(LayeredCommand { layer, command });
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayeredCommand> {
        self.commands.iter()
    }

    pub fn in_layer(&self, layer: Layer) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(move |entry| entry.layer == layer)
            .map(|entry| &entry.command)
    }
}

impl<'a> IntoIterator for &'a RenderCommands {
    type Item = &'a LayeredCommand;
    type IntoIter = std::slice::Iter<'a, LayeredCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

/// Angle of slot `index` out of `count` evenly spaced slots, starting at
/// twelve o'clock.
pub(crate) fn ring_angle(index: usize, count: usize) -> f32 {
    (index as f32 / count as f32) * TAU - TAU / 4.0
}
