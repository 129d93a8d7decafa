//! Sine-wave geometry.
//!
//! A wave is `y = A·sin(ω·x + φ)` with `A = wave_height` and
//! `ω = 2π / wave_width`, sampled once per pixel and joined with straight
//! segments. Screen Y grows downwards; the oscillation offset lifts the whole
//! curve by `current_offset` pixels.

use std::f64::consts::TAU;

use serde::Serialize;
use waveconfig::WaveAttributes;

use crate::types::FillRect;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PathCommand {
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    Close,
}

impl PathCommand {
    fn point(&self) -> Option<Point> {
        match *self {
            PathCommand::MoveTo { x, y } | PathCommand::LineTo { x, y } => Some(Point { x, y }),
            PathCommand::Close => None,
        }
    }
}

/// Closed polyline bounded above by the sampled sine curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WavePath {
    commands: Vec<PathCommand>,
    samples: usize,
}

impl WavePath {
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.commands.last(), Some(PathCommand::Close))
    }

    /// Number of sine samples on the curve (`width + 1` for a non-empty path).
    pub fn sample_count(&self) -> usize {
        self.samples
    }

    /// The sampled curve points, left to right.
    pub fn samples(&self) -> impl Iterator<Item = Point> + '_ {
        self.commands
            .iter()
            .skip(1)
            .take(self.samples)
            .filter_map(PathCommand::point)
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        for command in &mut self.commands {
            match command {
                PathCommand::MoveTo { x, y } | PathCommand::LineTo { x, y } => {
                    *x += dx;
                    *y += dy;
                }
                PathCommand::Close => {}
            }
        }
    }
}

/// Everything painted for one wave: the curve region plus its backing fill.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaveShape {
    pub path: WavePath,
    pub backing: Option<FillRect>,
}

impl WaveShape {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.backing.is_none()
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.path.translate(dx, dy);
        self.backing = self.backing.map(|rect| rect.translated(dx, dy));
    }
}

/// Raw sine value at `x`, before vertical placement.
pub fn sine_at(attributes: &WaveAttributes, x: i32, phase: f64) -> f64 {
    let amplitude = f64::from(attributes.wave_height());
    let omega = TAU / f64::from(attributes.wave_width());
    amplitude * (omega * f64::from(x) + phase).sin()
}

/// Top of the wave band: `wave_height - current_offset`.
pub fn wave_top(attributes: &WaveAttributes, current_offset: u32) -> f64 {
    f64::from(attributes.wave_height()) - f64::from(current_offset)
}

/// Screen Y of the curve at `x`.
pub fn sample_y(attributes: &WaveAttributes, x: i32, phase: f64, current_offset: u32) -> f64 {
    sine_at(attributes, x, phase)
        + f64::from(attributes.animation_total_height())
        + wave_top(attributes, current_offset)
}

/// Samples the wave across `0..=width` into a closed fillable path.
///
/// The path starts and ends on a baseline `2 * (total + top)` below the first
/// and last samples, far enough down to reach the backing rectangle at any
/// offset. Non-positive sizes give an empty path.
pub fn build_path(
    attributes: &WaveAttributes,
    width: i32,
    height: i32,
    phase: f64,
    current_offset: u32,
) -> WavePath {
    if width <= 0 || height <= 0 {
        return WavePath::default();
    }

    let drop = 2.0 * (f64::from(attributes.animation_total_height()) + wave_top(attributes, current_offset));
    let samples = width as usize + 1;
    let mut commands = Vec::with_capacity(samples + 3);

    let first_y = sample_y(attributes, 0, phase, current_offset);
    commands.push(PathCommand::MoveTo {
        x: 0.0,
        y: (first_y + drop) as f32,
    });

    let mut last_y = first_y;
    for x in 0..=width {
        let y = sample_y(attributes, x, phase, current_offset);
        commands.push(PathCommand::LineTo {
            x: x as f32,
            y: y as f32,
        });
        last_y = y;
    }

    commands.push(PathCommand::LineTo {
        x: width as f32,
        y: (last_y + drop) as f32,
    });
    commands.push(PathCommand::Close);

    WavePath { commands, samples }
}

/// Solid fill below the crest: `top = 2·height + total - offset`,
/// `bottom = wave_height + surface height`. `None` when degenerate.
pub fn backing_rect(
    attributes: &WaveAttributes,
    width: i32,
    height: i32,
    current_offset: u32,
) -> Option<FillRect> {
    if width <= 0 || height <= 0 {
        return None;
    }
    let wave_height = i64::from(attributes.wave_height());
    let top = 2 * wave_height + i64::from(attributes.animation_total_height())
        - i64::from(current_offset);
    let bottom = wave_height + i64::from(height);
    if bottom <= top {
        return None;
    }
    Some(FillRect {
        left: 0.0,
        top: top as f32,
        right: width as f32,
        bottom: bottom as f32,
    })
}

pub fn build_shape(
    attributes: &WaveAttributes,
    width: i32,
    height: i32,
    phase: f64,
    current_offset: u32,
) -> WaveShape {
    WaveShape {
        path: build_path(attributes, width, height, phase, current_offset),
        backing: backing_rect(attributes, width, height, current_offset),
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    fn close_to(a: f32, b: f64) -> bool {
        (f64::from(a) - b).abs() < 1e-3
    }

    #[test]
    fn sample_count_is_width_plus_one() {
        let attrs = WaveAttributes::default();
        for width in [1, 2, 37, 200, 641] {
            let path = build_path(&attrs, width, 100, 0.0, 0);
            assert_eq!(path.sample_count(), width as usize + 1);
            assert_eq!(path.samples().count(), width as usize + 1);
            assert_eq!(path.commands().len(), width as usize + 4);
            assert!(path.is_closed());
        }
    }

    #[test]
    fn baseline_endpoints_follow_offset_formula() {
        let attrs = WaveAttributes::default();
        let phase = -FRAC_PI_2;
        for offset in [0u32, 7, 15, 30] {
            let path = build_path(&attrs, 120, 80, phase, offset);
            let top = 10.0 - f64::from(offset);
            let drop = 2.0 * (30.0 + top);
            let first = sample_y(&attrs, 0, phase, offset);
            let last = sample_y(&attrs, 120, phase, offset);

            match path.commands().first() {
                Some(PathCommand::MoveTo { x, y }) => {
                    assert_eq!(*x, 0.0);
                    assert!(close_to(*y, first + drop));
                }
                other => panic!("expected move_to, got {other:?}"),
            }
            let commands = path.commands();
            match commands[commands.len() - 2] {
                PathCommand::LineTo { x, y } => {
                    assert_eq!(x, 120.0);
                    assert!(close_to(y, last + drop));
                }
                other => panic!("expected closing line_to, got {other:?}"),
            }

            let samples: Vec<Point> = path.samples().collect();
            let expected_first = 10.0 * phase.sin() + 30.0 + top;
            assert!(close_to(samples[0].y, expected_first));
            assert!(close_to(samples[120].y, last));
        }
    }

    #[test]
    fn quarter_period_sample_reaches_amplitude() {
        let attrs = WaveAttributes::default();
        let offset = 12;
        let path = build_path(&attrs, 200, 100, 0.0, offset);
        let sample = path.samples().nth(50).unwrap();
        assert_eq!(sample.x, 50.0);
        let expected = 10.0 + 30.0 + (10.0 - f64::from(offset));
        assert!(close_to(sample.y, expected), "got {}", sample.y);
        assert!((sine_at(&attrs, 50, 0.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_size_bounds_give_empty_shape() {
        let attrs = WaveAttributes::default();
        for (w, h) in [(0, 100), (100, 0), (0, 0), (-5, 40), (40, -5)] {
            let shape = build_shape(&attrs, w, h, 0.0, 0);
            assert!(shape.is_empty(), "{w}x{h} should be empty");
            assert_eq!(shape.path.sample_count(), 0);
        }
    }

    #[test]
    fn backing_rect_tracks_offset() {
        let attrs = WaveAttributes::default();
        let rect = backing_rect(&attrs, 300, 120, 0).unwrap();
        assert_eq!(rect.left, 0.0);
        assert_eq!(rect.right, 300.0);
        assert_eq!(rect.top, 50.0);
        assert_eq!(rect.bottom, 130.0);

        let raised = backing_rect(&attrs, 300, 120, 30).unwrap();
        assert_eq!(raised.top, 20.0);
        assert_eq!(raised.bottom, 130.0);

        assert!(backing_rect(&attrs, 300, 30, 0).is_none());
    }

    #[test]
    fn curve_stays_above_baseline() {
        let attrs = WaveAttributes::default();
        for offset in [0u32, 30] {
            let path = build_path(&attrs, 200, 100, -FRAC_PI_2, offset);
            let commands = path.commands();
            let baseline = match commands[0] {
                PathCommand::MoveTo { y, .. } => y,
                _ => unreachable!(),
            };
            let lowest = path.samples().map(|p| p.y).fold(f32::MIN, f32::max);
            assert!(lowest <= baseline + 1e-3);
        }
    }

    #[test]
    fn translate_moves_every_point() {
        let attrs = WaveAttributes::default();
        let mut shape = build_shape(&attrs, 10, 100, 0.0, 0);
        let before = shape.clone();
        shape.translate(5.0, -2.0);
        let moved: Vec<Point> = shape.path.samples().collect();
        let unmoved: Vec<Point> = before.path.samples().collect();
        for (a, b) in moved.iter().zip(&unmoved) {
            assert_eq!(a.x, b.x + 5.0);
            assert_eq!(a.y, b.y - 2.0);
        }
        let rect = shape.backing.unwrap();
        assert_eq!(rect.left, 5.0);
        assert_eq!(rect.top, before.backing.unwrap().top - 2.0);
    }
}
