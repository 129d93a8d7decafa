use std::time::Instant;

use tracing::trace;
use waveconfig::{Rgba, WaveAttributes};

use crate::geometry::{build_shape, WaveShape};
use crate::oscillation::{Direction, OscillationController, TickListener};
use crate::redraw::{RedrawRequest, RedrawSender};
use crate::surface::Surface;
use crate::types::{Bounds, LayerId};

/// Something that can paint itself onto a [`Surface`].
pub trait Renderable {
    fn draw(&self, surface: &mut dyn Surface);
}

/// Play/stop control driven by explicit timestamps.
pub trait Animatable {
    fn start(&mut self, now: Instant);
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// One sine wave with its own phase, paint and oscillation.
#[derive(Debug)]
pub struct WaveLayer {
    id: LayerId,
    attributes: WaveAttributes,
    phase: f64,
    paint_color: Option<Rgba>,
    alpha: u8,
    controller: OscillationController,
    bounds: Bounds,
    redraw: Option<RedrawSender>,
}

impl WaveLayer {
    pub fn new(attributes: WaveAttributes) -> Self {
        Self {
            id: LayerId::next(),
            attributes,
            phase: 0.0,
            paint_color: None,
            alpha: u8::MAX,
            controller: OscillationController::new(attributes),
            bounds: Bounds::default(),
            redraw: None,
        }
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_paint_color(mut self, color: Option<Rgba>) -> Self {
        self.paint_color = color;
        self
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn attributes(&self) -> &WaveAttributes {
        &self.attributes
    }

    /// Replaces the attributes wholesale. Offset and running state are kept;
    /// a running oscillation adopts the new range and period on its next tick.
    pub fn set_attributes(&mut self, attributes: WaveAttributes) {
        self.attributes = attributes;
        self.controller.set_attributes(attributes);
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase;
        self.invalidate();
    }

    /// Layer-specific paint, overriding the attribute colour when set.
    pub fn paint_color(&self) -> Option<Rgba> {
        self.paint_color
    }

    pub fn set_paint_color(&mut self, color: Option<Rgba>) {
        self.paint_color = color;
        self.invalidate();
    }

    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: u8) {
        self.alpha = alpha;
        self.invalidate();
    }

    /// Colour `draw` paints with, before alpha.
    pub fn base_color(&self) -> Rgba {
        self.paint_color
            .unwrap_or_else(|| self.attributes.wave_color())
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Used from the next draw onwards.
    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    pub fn intrinsic_size(&self) -> (i32, i32) {
        (self.bounds.width(), self.bounds.height())
    }

    pub fn current_offset(&self) -> u32 {
        self.controller.current_offset()
    }

    pub fn direction(&self) -> Direction {
        self.controller.direction()
    }

    pub fn controller(&self) -> &OscillationController {
        &self.controller
    }

    pub fn attach_redraw(&mut self, sender: RedrawSender) {
        self.controller
            .add_listener(TickListener::new(self.id, sender.clone()));
        self.redraw = Some(sender);
    }

    pub fn detach_redraw(&mut self) {
        self.controller.remove_listener(self.id);
        self.redraw = None;
    }

    pub fn has_redraw(&self) -> bool {
        self.redraw.is_some()
    }

    pub fn invalidate(&self) {
        if let Some(sender) = &self.redraw {
            let _ = sender.try_send(RedrawRequest::Invalidate);
        }
    }

    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        self.controller.tick(now)
    }

    /// Shape for the current bounds and offset, placed at the bounds origin.
    pub fn shape(&self) -> WaveShape {
        let mut shape = build_shape(
            &self.attributes,
            self.bounds.width(),
            self.bounds.height(),
            self.phase,
            self.controller.current_offset(),
        );
        if self.bounds.left != 0 || self.bounds.top != 0 {
            shape.translate(self.bounds.left as f32, self.bounds.top as f32);
        }
        shape
    }

    /// Paints the wave path, then the backing rectangle, in `color`.
    pub fn draw_with_color(&self, surface: &mut dyn Surface, color: Rgba) {
        let shape = self.shape();
        if shape.is_empty() {
            trace!(layer = self.id.get(), "skipping draw for empty bounds");
            return;
        }
        let color = color.with_alpha_scaled(self.alpha);
        if !shape.path.is_empty() {
            surface.fill_path(&shape.path, color);
        }
        if let Some(rect) = shape.backing {
            surface.fill_rect(rect, color);
        }
    }
}

impl Renderable for WaveLayer {
    fn draw(&self, surface: &mut dyn Surface) {
        self.draw_with_color(surface, self.base_color());
    }
}

impl Animatable for WaveLayer {
    fn start(&mut self, now: Instant) {
        self.controller.start(now);
    }

    fn stop(&mut self) {
        self.controller.stop();
    }

    fn is_running(&self) -> bool {
        self.controller.is_running()
    }
}
