//! Fixed layers shared by both visualizer modes: background, core sphere,
//! frequency bars, waveform ring and impact flash.

use std::f32::consts::{PI, TAU};

use rand::Rng;

use super::{
    ring_angle, Color, DrawCommand, Glow, GradientArea, GradientStop, Layer, Point, RadialGradient,
    Rect, RenderCommands, TextAlign,
};
use crate::{mapping::SceneParameters, particles::ParticlePool};

const CORE_SPAWN_THRESHOLD: f32 = 0.6;
const CORE_SPAWN_BURST: usize = 3;
const TIP_SPAWN_THRESHOLD: f32 = 0.7;
const FLASH_THRESHOLD: f32 = 0.7;

/// Paints the shared layers of one frame. Borrowed for the duration of a
/// tick; owns no state of its own.
#[derive(Debug, Clone, Copy)]
pub struct LayerPainter<'a> {
    params: &'a SceneParameters,
    width: f32,
    height: f32,
}

impl<'a> LayerPainter<'a> {
    /// `width` and `height` are the logical canvas size.
    pub fn new(params: &'a SceneParameters, width: f32, height: f32) -> Self {
        Self {
            params,
            width,
            height,
        }
    }

    /// Slowly breathing radial gradient, independent of the audio.
    pub fn background(&self, commands: &mut RenderCommands) {
        commands.begin(Layer::Background);
        let focal = Point::new(self.params.background_drift, 0.0);
        commands.push(DrawCommand::FillGradient {
            area: GradientArea::Rect(Rect::centred(self.width, self.height)),
            gradient: RadialGradient {
                focal,
                center: Point::ORIGIN,
                inner_radius: 0.0,
                outer_radius: self.width.max(self.height) / 2.0,
                stops: vec![
                    GradientStop::new(0.0, Color::rgba(20, 30, 50, self.params.background_alpha)),
                    GradientStop::new(1.0, Color::rgba(9, 10, 15, 0.9)),
                ],
            },
        });
    }

    /// Core sphere. Heavy bass throws a burst of particles from its centre.
    pub fn core<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        particles: &mut ParticlePool,
        commands: &mut RenderCommands,
    ) {
        commands.begin(Layer::Core);
        let params = self.params;
        let energy = &params.energy;
        let hue = params.hue;
        let center = params.core_center;

        commands.push(DrawCommand::FillGradient {
            area: GradientArea::Circle {
                center,
                radius: params.core_radius,
            },
            gradient: RadialGradient {
                focal: center,
                center,
                inner_radius: params.core_radius * 0.2,
                outer_radius: params.core_radius,
                stops: vec![
                    GradientStop::new(0.0, Color::hsla(hue, 100.0, 70.0, 0.5 + energy.bass * 0.5)),
                    GradientStop::new(
                        0.6,
                        Color::hsla((hue + 60.0) % 360.0, 100.0, 60.0, 0.3 + energy.mid * 0.4),
                    ),
                    GradientStop::new(1.0, Color::hsla((hue + 120.0) % 360.0, 100.0, 50.0, 0.0)),
                ],
            },
        });

        if energy.bass > CORE_SPAWN_THRESHOLD && rng.gen_bool(0.5) {
            let spark = Color::hsla(hue, 100.0, 70.0, 1.0);
            for _ in 0..CORE_SPAWN_BURST {
                particles.spawn(rng, center, energy.bass * 200.0, spark);
            }
        }
    }

    /// Ring of `count` bars sampled evenly across `frequency`. Bars shorter
    /// than a pixel are skipped. Returns the number of bars drawn.
    pub fn bars<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        frequency: &[u8],
        count: usize,
        particles: &mut ParticlePool,
        commands: &mut RenderCommands,
    ) -> usize {
        commands.begin(Layer::Bars);
        if count == 0 || frequency.is_empty() {
            return 0;
        }

        let params = self.params;
        let step = (frequency.len() / count).max(1);
        let line_width = (self.width / count as f32) * 0.6;
        let mut drawn = 0;

        for index in 0..count {
            let bin = index * step;
            if bin >= frequency.len() {
                break;
            }
            let value = f32::from(frequency[bin]) / 255.0;
            let length = value * params.bar_max_radius;
            if length < 1.0 {
                continue;
            }

            let angle = ring_angle(index, count) + params.bar_rotation;
            let tip = Point::ORIGIN.polar(angle, length);
            let hue = params.hue + index as f32 * 2.0 + value * 50.0;

            commands.push(DrawCommand::StrokeLine {
                from: Point::ORIGIN,
                to: tip,
                width: line_width,
                color: Color::hsla(hue, 80.0 + value * 20.0, 50.0 + value * 20.0, 0.6 + value * 0.4),
            });
            commands.push(DrawCommand::FillCircle {
                center: tip,
                radius: line_width / 2.0 + value * 2.0,
                color: Color::hsla(hue, 90.0 + value * 20.0, 60.0 + value * 20.0, 0.2 + value * 0.3),
                glow: None,
            });
            drawn += 1;

            if value > TIP_SPAWN_THRESHOLD && rng.gen_bool(0.1) {
                particles.spawn(rng, tip, value * 100.0, Color::hsla(hue, 100.0, 75.0, 1.0));
            }
        }
        drawn
    }

    /// Closed ring through the first half of the time-domain buffer,
    /// centred on the core and counter-rotating.
    pub fn waveform(&self, time_domain: &[u8], commands: &mut RenderCommands) {
        commands.begin(Layer::Waveform);
        let samples = time_domain.len() / 2;
        if samples == 0 {
            return;
        }

        let params = self.params;
        let energy = &params.energy;
        let swing = 20.0 + energy.mid * 30.0;
        let points = time_domain[..samples]
            .iter()
            .enumerate()
            .map(|(index, &sample)| {
                let radius = params.waveform_radius + (f32::from(sample) / 128.0 - 1.0) * swing;
                let angle =
                    (index as f32 / samples as f32) * TAU - PI / 2.0 - params.waveform_rotation;
                params.core_center.polar(angle, radius)
            })
            .collect();

        let hue = (params.hue + 180.0) % 360.0;
        commands.push(DrawCommand::StrokePath {
            points,
            closed: true,
            width: 2.0,
            color: Color::hsla(hue, 100.0, 70.0, 0.3 + energy.overall * 0.5),
            glow: Some(Glow::new(
                Color::hsla(hue, 100.0, 70.0, 0.7),
                10.0 + energy.overall * 10.0,
            )),
        });
    }

    /// White wash over the whole canvas on loud input.
    pub fn flash(&self, commands: &mut RenderCommands) {
        commands.begin(Layer::Flash);
        let overall = self.params.energy.overall;
        if overall > FLASH_THRESHOLD {
            commands.push(DrawCommand::FillRect {
                rect: Rect::centred(self.width, self.height),
                color: Color::rgba(255, 255, 255, overall * 0.2 - 0.1),
            });
        }
    }
}

/// Static placeholder shown while no session is running.
pub fn standby_frame(width: f32, height: f32) -> RenderCommands {
    let mut commands = RenderCommands::new();
    commands.begin(Layer::Background);
    commands.push(DrawCommand::FillRect {
        rect: Rect::centred(width, height),
        color: Color::rgba(10, 10, 20, 0.95),
    });

    commands.begin(Layer::Overlay);
    commands.push(DrawCommand::Text {
        text: "SYSTEM STANDBY".to_string(),
        position: Point::new(0.0, -20.0),
        size: 24.0,
        bold: true,
        align: TextAlign::Center,
        color: Color::rgba(0, 200, 255, 0.6),
        glow: None,
    });
    commands.push(DrawCommand::Text {
        text: "PRESS START TO ENGAGE AUDIO ANALYSIS".to_string(),
        position: Point::new(0.0, 20.0),
        size: 16.0,
        bold: false,
        align: TextAlign::Center,
        color: Color::rgba(150, 150, 180, 0.5),
        glow: None,
    });
    commands
}

/// Standby frame of the ripple mode: an almost opaque black fill.
pub fn blank_frame(width: f32, height: f32) -> RenderCommands {
    let mut commands = RenderCommands::new();
    commands.begin(Layer::Background);
    commands.push(DrawCommand::FillRect {
        rect: Rect::centred(width, height),
        color: Color::rgba(0, 0, 0, 0.95),
    });
    commands
}
