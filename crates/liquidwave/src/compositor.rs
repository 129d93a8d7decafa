//! Stacks wave layers, staggers their start and maps host lifecycle events
//! onto start/stop.

use std::time::{Duration, Instant};

use scheduler::Scheduler;
use tracing::{debug, info, warn};
use waveconfig::{
    default_phase, ConfigError, Insets, Rgba, StartMode, WaveAttributes, WaveConfig,
    DEFAULT_COLOR_OVERRIDES, DEFAULT_LAYER_COUNT,
};

use crate::layer::{Animatable, Renderable, WaveLayer};
use crate::oscillation::OscillationState;
use crate::redraw::{RedrawRequest, RedrawSender};
use crate::surface::Surface;
use crate::types::{Bounds, LayerId, Visibility};

/// Signals a host forwards from its view or window system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    BecomeVisible,
    BecomeHidden,
    Attach,
    Detach,
    /// New surface size, before padding is removed.
    BoundsChanged { width: i32, height: i32 },
}

/// What one `tick` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStatus {
    /// Deferred starts that fired on this tick.
    pub started: usize,
    /// Layers whose oscillation advanced.
    pub ticked: usize,
}

impl FrameStatus {
    pub fn is_idle(&self) -> bool {
        self.started == 0 && self.ticked == 0
    }
}

#[derive(Debug)]
pub struct LayerCompositor {
    layers: Vec<WaveLayer>,
    visibility: Visibility,
    attached: bool,
    start_mode: StartMode,
    color_overrides: Vec<Rgba>,
    padding: Insets,
    pending: Scheduler<LayerId>,
    redraw: Option<RedrawSender>,
}

impl LayerCompositor {
    /// The default multi-wave stack: three layers sharing `attributes`,
    /// started back to front.
    pub fn new(attributes: WaveAttributes) -> Self {
        let layers = (0..DEFAULT_LAYER_COUNT)
            .map(|index| WaveLayer::new(attributes).with_phase(default_phase(index)))
            .collect();
        Self::with_layers(layers, StartMode::Staggered, DEFAULT_COLOR_OVERRIDES.to_vec())
    }

    /// One wave at phase 0 that starts as soon as the compositor does.
    pub fn single(attributes: WaveAttributes) -> Self {
        Self::with_layers(vec![WaveLayer::new(attributes)], StartMode::Immediate, Vec::new())
    }

    pub fn empty() -> Self {
        Self::with_layers(Vec::new(), StartMode::Staggered, Vec::new())
    }

    pub fn from_config(config: &WaveConfig) -> Result<Self, ConfigError> {
        let attributes = config.attributes()?;
        let layers: Vec<WaveLayer> = config
            .resolved_layers()
            .into_iter()
            .map(|layer| {
                WaveLayer::new(attributes)
                    .with_phase(layer.phase)
                    .with_paint_color(layer.color)
            })
            .collect();
        let mut compositor = Self::with_layers(
            layers,
            config.compositor.start,
            config.compositor.color_overrides.clone(),
        );
        compositor.padding = config.compositor.padding;
        debug!(
            layers = compositor.layers.len(),
            start = ?compositor.start_mode,
            overrides = compositor.color_overrides.len(),
            "compositor built from configuration"
        );
        Ok(compositor)
    }

    fn with_layers(layers: Vec<WaveLayer>, start_mode: StartMode, color_overrides: Vec<Rgba>) -> Self {
        Self {
            layers,
            visibility: Visibility::Visible,
            attached: false,
            start_mode,
            color_overrides,
            padding: Insets::default(),
            pending: Scheduler::new(),
            redraw: None,
        }
    }

    /// Routes tick and invalidate notifications of every layer to `sender`.
    pub fn set_redraw(&mut self, sender: RedrawSender) {
        for layer in &mut self.layers {
            layer.attach_redraw(sender.clone());
        }
        self.redraw = Some(sender);
        self.invalidate();
    }

    pub fn layers(&self) -> &[WaveLayer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [WaveLayer] {
        &mut self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Replaces the layer set. Old layers lose their redraw channel and any
    /// pending start; new layers are wired to the compositor's channel.
    ///
    /// Running old layers are returned to the caller as they were.
    pub fn set_layers(&mut self, layers: Vec<WaveLayer>) -> Vec<WaveLayer> {
        let mut previous = std::mem::replace(&mut self.layers, layers);
        for layer in &mut previous {
            self.pending.cancel(&layer.id());
            layer.detach_redraw();
        }
        if let Some(sender) = &self.redraw {
            for layer in &mut self.layers {
                layer.attach_redraw(sender.clone());
            }
        }
        debug!(old = previous.len(), new = self.layers.len(), "layer set replaced");
        self.invalidate();
        previous
    }

    pub fn start_mode(&self) -> StartMode {
        self.start_mode
    }

    pub fn set_start_mode(&mut self, start_mode: StartMode) {
        self.start_mode = start_mode;
    }

    /// Starts every layer, or schedules each one when the policy is staggered.
    /// Ignored while hidden.
    pub fn start(&mut self, now: Instant) {
        if self.visibility == Visibility::Hidden {
            debug!("compositor hidden, start ignored");
            return;
        }
        let cancelled = self.pending.cancel_all();
        if cancelled > 0 {
            debug!(cancelled, "replacing pending layer starts");
        }

        let size = self.layers.len();
        match self.start_mode {
            StartMode::Immediate => {
                for layer in &mut self.layers {
                    layer.start(now);
                }
            }
            StartMode::Staggered => {
                for (index, layer) in self.layers.iter_mut().enumerate() {
                    let scheduled = scheduler::stagger_delay(index, size, layer.attributes())
                        .and_then(|delay| self.pending.schedule(layer.id(), now, delay));
                    if let Err(err) = scheduled {
                        warn!(layer = index, %err, "cannot schedule layer start, starting now");
                        layer.start(now);
                    }
                }
            }
        }
        info!(layers = size, mode = ?self.start_mode, "waves starting");
    }

    /// Fires due starts, then advances every running layer.
    ///
    /// A deferred layer starts at its scheduled instant, so a late tick does
    /// not shift its place in the stagger.
    pub fn tick(&mut self, now: Instant) -> FrameStatus {
        let mut status = FrameStatus::default();
        for (id, due) in self.pending.tick(now) {
            if let Some(layer) = self.layers.iter_mut().find(|layer| layer.id() == id) {
                layer.start(due);
                status.started += 1;
            }
        }
        for layer in &mut self.layers {
            if layer.tick(now).is_some() {
                status.ticked += 1;
            }
        }
        status
    }

    /// Cancels pending starts and stops every layer.
    pub fn stop(&mut self) {
        let cancelled = self.pending.cancel_all();
        let mut stopped = 0;
        for layer in &mut self.layers {
            if layer.is_running() {
                stopped += 1;
            }
            layer.stop();
        }
        debug!(cancelled, stopped, "waves stopped");
    }

    pub fn is_running(&self) -> bool {
        self.layers
            .iter()
            .any(|layer| layer.controller().state() == OscillationState::Running)
    }

    pub fn pending_starts(&self) -> usize {
        self.pending.len()
    }

    pub fn next_pending_start(&self) -> Option<Instant> {
        self.pending.next_due()
    }

    pub fn pending_start_of(&self, id: LayerId) -> Option<Instant> {
        self.pending.due_at(&id)
    }

    /// Applies `attributes` to every layer without restarting them.
    pub fn set_attributes(&mut self, attributes: WaveAttributes) {
        for layer in &mut self.layers {
            layer.set_attributes(attributes);
        }
        self.invalidate();
    }

    /// Attributes of the first layer, if any.
    pub fn attributes(&self) -> Option<WaveAttributes> {
        self.layers.first().map(|layer| *layer.attributes())
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        for layer in &mut self.layers {
            layer.set_bounds(bounds);
        }
    }

    pub fn color_overrides(&self) -> &[Rgba] {
        &self.color_overrides
    }

    /// Paint used for layer `i` is `overrides[i]` when present.
    pub fn set_color_overrides(&mut self, overrides: Vec<Rgba>) {
        self.color_overrides = overrides;
        self.invalidate();
    }

    pub fn padding(&self) -> Insets {
        self.padding
    }

    pub fn set_padding(&mut self, padding: Insets) {
        self.padding = padding;
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Stagger delay layer `index` would get right now.
    pub fn stagger_delay(&self, index: usize) -> Option<Duration> {
        let layer = self.layers.get(index)?;
        scheduler::stagger_delay(index, self.layers.len(), layer.attributes()).ok()
    }

    pub fn handle(&mut self, event: Lifecycle, now: Instant) {
        debug!(?event, "lifecycle event");
        match event {
            Lifecycle::BecomeVisible => {
                self.visibility = Visibility::Visible;
                self.start(now);
            }
            Lifecycle::BecomeHidden => {
                self.visibility = Visibility::Hidden;
                self.stop();
            }
            Lifecycle::Attach => {
                self.attached = true;
                self.start(now);
            }
            Lifecycle::Detach => {
                self.attached = false;
                self.stop();
            }
            Lifecycle::BoundsChanged { width, height } => {
                let bounds = Bounds::from_size(
                    width - self.padding.horizontal(),
                    height - self.padding.vertical(),
                );
                self.set_bounds(bounds);
                self.invalidate();
            }
        }
    }

    fn invalidate(&self) {
        if let Some(sender) = &self.redraw {
            let _ = sender.try_send(RedrawRequest::Invalidate);
        }
    }
}

impl Renderable for LayerCompositor {
    /// Layers paint in stored order; index 0 is painted first.
    fn draw(&self, surface: &mut dyn Surface) {
        for (index, layer) in self.layers.iter().enumerate() {
            let color = self
                .color_overrides
                .get(index)
                .copied()
                .unwrap_or_else(|| layer.base_color());
            layer.draw_with_color(surface, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redraw::{drain_pending, redraw_channel};
    use crate::surface::{DrawCommand, RecordingSurface};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn period_1500() -> WaveAttributes {
        WaveAttributes::with_period(200, 10, 30, ms(1500), waveconfig::DEFAULT_WAVE_COLOR).unwrap()
    }

    #[test]
    fn staggered_delays_run_back_to_front() {
        let mut compositor = LayerCompositor::new(period_1500());
        let now = Instant::now();
        compositor.start(now);
        assert_eq!(compositor.pending_starts(), 3);

        let due: Vec<Duration> = compositor
            .layers()
            .iter()
            .map(|layer| compositor.pending_start_of(layer.id()).unwrap() - now)
            .collect();
        for (actual, expected) in due.iter().zip([1500u64, 1000, 500]) {
            assert!(actual.abs_diff(ms(expected)) < ms(1), "{actual:?} vs {expected}ms");
        }
        assert!(!compositor.is_running());

        let status = compositor.tick(now + ms(501));
        assert_eq!(status.started, 1);
        assert!(compositor.layers()[2].is_running());
        assert!(!compositor.layers()[0].is_running());

        compositor.tick(now + ms(1501));
        assert!(compositor.layers().iter().all(|layer| layer.is_running()));
        assert_eq!(compositor.pending_starts(), 0);
    }

    #[test]
    fn late_tick_starts_layer_at_its_deadline() {
        let mut compositor = LayerCompositor::new(period_1500());
        let now = Instant::now();
        compositor.start(now);
        let front = compositor.layers()[2].id();
        let due = compositor.pending_start_of(front).unwrap();

        let frame = now + ms(620);
        assert_eq!(compositor.tick(frame).started, 1);
        let layer = &compositor.layers()[2];
        assert!(layer.is_running());
        let period = layer.attributes().period().unwrap();
        let (expected, _) = crate::oscillation::triangle_offset(frame - due, period, 30);
        assert_eq!(expected, 2);
        assert_eq!(layer.current_offset(), expected);
    }

    #[test]
    fn pending_start_fires_once() {
        let mut compositor = LayerCompositor::new(period_1500());
        let now = Instant::now();
        compositor.start(now);
        let first = compositor.tick(now + ms(2000));
        assert_eq!(first.started, 3);
        let second = compositor.tick(now + ms(2100));
        assert_eq!(second.started, 0);
        assert_eq!(second.ticked, 3);
    }

    #[test]
    fn hidden_compositor_ignores_start() {
        let mut compositor = LayerCompositor::new(period_1500());
        let now = Instant::now();
        compositor.handle(Lifecycle::BecomeHidden, now);
        compositor.start(now);
        assert_eq!(compositor.pending_starts(), 0);
        compositor.handle(Lifecycle::Attach, now);
        assert_eq!(compositor.pending_starts(), 0);
        assert!(compositor.is_attached());

        compositor.handle(Lifecycle::BecomeVisible, now);
        assert_eq!(compositor.pending_starts(), 3);
    }

    #[test]
    fn stop_cancels_pending_starts() {
        let mut compositor = LayerCompositor::new(period_1500());
        let now = Instant::now();
        compositor.start(now);
        compositor.tick(now + ms(600));
        assert!(compositor.is_running());

        compositor.stop();
        assert_eq!(compositor.pending_starts(), 0);
        assert!(!compositor.is_running());
        let status = compositor.tick(now + ms(5000));
        assert!(status.is_idle());
    }

    #[test]
    fn restart_replaces_pending_starts() {
        let mut compositor = LayerCompositor::new(period_1500());
        let now = Instant::now();
        compositor.start(now);
        compositor.start(now + ms(400));
        assert_eq!(compositor.pending_starts(), 3);
        let back = compositor.layers()[0].id();
        let due = compositor.pending_start_of(back).unwrap();
        assert!(due.duration_since(now).abs_diff(ms(1900)) < ms(1));
        assert_eq!(compositor.tick(now + ms(1000)).started, 1);
    }

    #[test]
    fn immediate_mode_starts_everything() {
        let mut compositor = LayerCompositor::single(period_1500());
        let now = Instant::now();
        compositor.start(now);
        assert_eq!(compositor.pending_starts(), 0);
        assert!(compositor.layers()[0].is_running());
        assert_eq!(compositor.layers()[0].phase(), 0.0);
        assert!(compositor.color_overrides().is_empty());
    }

    #[test]
    fn overrides_apply_to_leading_layers() {
        let mut compositor = LayerCompositor::new(period_1500());
        compositor.set_bounds(Bounds::from_size(200, 100));
        let mut surface = RecordingSurface::default();
        compositor.draw(&mut surface);

        let paths: Vec<Rgba> = surface
            .commands()
            .iter()
            .filter(|command| matches!(command, DrawCommand::Path { .. }))
            .map(DrawCommand::color)
            .collect();
        assert_eq!(
            paths,
            vec![
                DEFAULT_COLOR_OVERRIDES[0],
                DEFAULT_COLOR_OVERRIDES[1],
                waveconfig::DEFAULT_WAVE_COLOR,
            ]
        );
        // overrides never mutate the layers themselves
        assert!(compositor.layers()[0].paint_color().is_none());
    }

    #[test]
    fn layers_paint_in_stored_order() {
        let mut compositor = LayerCompositor::new(period_1500());
        compositor.set_color_overrides(Vec::new());
        compositor.set_bounds(Bounds::from_size(200, 100));
        let mut surface = RecordingSurface::default();
        compositor.draw(&mut surface);
        let first_samples: Vec<f32> = surface
            .commands()
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Path { path, .. } => path.samples().next().map(|point| point.y),
                DrawCommand::Rect { .. } => None,
            })
            .collect();
        let expected: Vec<f32> = compositor
            .layers()
            .iter()
            .map(|layer| layer.shape().path.samples().next().unwrap().y)
            .collect();
        assert_eq!(first_samples, expected);
        assert_eq!(surface.commands().len(), 6);
    }

    #[test]
    fn set_layers_rewires_redraw_channel() {
        let (tx, rx) = redraw_channel();
        let mut compositor = LayerCompositor::new(period_1500());
        compositor.set_redraw(tx);
        let now = Instant::now();
        compositor.start(now);
        drain_pending(&rx);

        let replacement = vec![WaveLayer::new(period_1500())];
        let new_id = replacement[0].id();
        let mut old = compositor.set_layers(replacement);
        assert_eq!(old.len(), 3);
        assert_eq!(compositor.pending_starts(), 0);
        assert!(old.iter().all(|layer| !layer.has_redraw()));
        assert_eq!(drain_pending(&rx), 1, "full redraw requested");

        compositor.start(now);
        compositor.tick(now + ms(2000));
        old[0].start(now);
        old[0].tick(now + ms(100));
        let requests: Vec<RedrawRequest> = rx.try_iter().collect();
        assert!(requests.iter().all(|request| match request {
            RedrawRequest::Tick { layer, .. } => *layer == new_id,
            RedrawRequest::Invalidate => true,
        }));
        assert!(!requests.is_empty());
    }

    #[test]
    fn empty_layer_set_is_valid() {
        let mut compositor = LayerCompositor::new(period_1500());
        compositor.set_layers(Vec::new());
        let now = Instant::now();
        compositor.start(now);
        assert!(compositor.tick(now + ms(10)).is_idle());
        let mut surface = RecordingSurface::default();
        compositor.draw(&mut surface);
        assert!(surface.commands().is_empty());
        assert!(compositor.attributes().is_none());
        assert!(LayerCompositor::empty().is_empty());
    }

    #[test]
    fn bounds_changed_subtracts_padding() {
        let mut compositor = LayerCompositor::new(period_1500());
        compositor.set_padding(Insets {
            left: 4,
            top: 2,
            right: 6,
            bottom: 8,
        });
        compositor.handle(
            Lifecycle::BoundsChanged {
                width: 300,
                height: 120,
            },
            Instant::now(),
        );
        for layer in compositor.layers() {
            assert_eq!(layer.bounds(), Bounds::from_size(290, 110));
        }
    }

    #[test]
    fn detach_stops_waves() {
        let mut compositor = LayerCompositor::single(period_1500());
        let now = Instant::now();
        compositor.handle(Lifecycle::Attach, now);
        assert!(compositor.is_running());
        compositor.handle(Lifecycle::Detach, now + ms(10));
        assert!(!compositor.is_running());
        assert!(!compositor.is_attached());
    }

    #[test]
    fn set_attributes_keeps_offsets() {
        let mut compositor = LayerCompositor::single(period_1500());
        let now = Instant::now();
        compositor.start(now);
        compositor.tick(now + ms(500));
        let offset = compositor.layers()[0].current_offset();
        let wider = WaveAttributes::with_period(400, 10, 30, ms(1500), waveconfig::DEFAULT_WAVE_COLOR).unwrap();
        compositor.set_attributes(wider);
        assert_eq!(compositor.layers()[0].current_offset(), offset);
        assert_eq!(compositor.attributes().unwrap().wave_width(), 400);
        assert!(compositor.is_running());
    }

    #[test]
    fn builds_from_config() {
        let config = WaveConfig::from_toml_str(
            r##"
version = 1

[compositor]
start = "immediate"
color_overrides = []

[[layer]]
phase = 0.5
color = "#102030"

[[layer]]
"##,
        )
        .unwrap();
        let compositor = LayerCompositor::from_config(&config).unwrap();
        assert_eq!(compositor.len(), 2);
        assert_eq!(compositor.start_mode(), StartMode::Immediate);
        assert_eq!(compositor.layers()[0].phase(), 0.5);
        assert_eq!(compositor.layers()[0].base_color(), Rgba::rgb(0x10, 0x20, 0x30));
        assert_eq!(compositor.layers()[1].phase(), default_phase(1));
        assert_eq!(compositor.stagger_delay(5), None);
    }
}
