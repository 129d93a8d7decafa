//! Per-layer oscillation: a ping-pong sweep of the vertical offset between 0
//! and `animation_total_height`, repeated forever.
//!
//! The controller is `Idle` until `start`, which builds a driver anchored at
//! the start instant. Every `tick(now)` samples the driver and notifies the
//! tick listeners attached to it. `stop` detaches the listeners and drops the
//! driver; there is no pause, the next `start` sweeps from 0 again.

use std::time::{Duration, Instant};

use tracing::{debug, trace};
use waveconfig::WaveAttributes;

use crate::redraw::{RedrawRequest, RedrawSender};
use crate::types::LayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillationState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Offset climbing from 0 towards the total height.
    #[default]
    Forward,
    /// Offset falling back to 0.
    Reverse,
}

/// Triangle wave: 0 → `total` over `period`, then back, forever.
///
/// Values truncate towards zero like an integer animator would.
pub fn triangle_offset(elapsed: Duration, period: Duration, total: u32) -> (u32, Direction) {
    if total == 0 || period.is_zero() {
        return (0, Direction::Forward);
    }
    let cycles = elapsed.as_secs_f64() / period.as_secs_f64();
    let iteration = cycles.floor();
    let fraction = cycles - iteration;
    let (progress, direction) = if (iteration as u64) % 2 == 0 {
        (fraction, Direction::Forward)
    } else {
        (1.0 - fraction, Direction::Reverse)
    };
    let value = (progress * f64::from(total)) as u32;
    (value.min(total), direction)
}

/// A redraw subscription registered on a controller.
#[derive(Debug, Clone)]
pub struct TickListener {
    id: LayerId,
    sender: RedrawSender,
}

impl TickListener {
    pub fn new(id: LayerId, sender: RedrawSender) -> Self {
        Self { id, sender }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Returns false once the receiving side has gone away.
    fn notify(&self, offset: u32) -> bool {
        self.sender
            .try_send(RedrawRequest::Tick {
                layer: self.id,
                offset,
            })
            .is_ok()
    }
}

#[derive(Debug)]
struct Driver {
    origin: Instant,
    period: Duration,
    total: u32,
    subscriptions: Vec<TickListener>,
}

impl Driver {
    fn sample(&self, now: Instant) -> (u32, Direction) {
        triangle_offset(now.saturating_duration_since(self.origin), self.period, self.total)
    }

    /// Swaps in a new range and period while keeping `offset` and `direction`
    /// continuous at `now`.
    fn retune(&mut self, total: u32, period: Duration, offset: u32, direction: Direction, now: Instant) {
        self.total = total;
        self.period = period;
        if total == 0 || period.is_zero() {
            self.origin = now;
            return;
        }
        let offset = offset.min(total);
        // aim for the middle of the integer step so truncation lands on `offset`
        let progress = ((f64::from(offset) + 0.5) / f64::from(total)).min(1.0);
        let cycles = match direction {
            Direction::Forward => progress,
            Direction::Reverse => 2.0 - progress,
        };
        let elapsed = period.mul_f64(cycles);
        self.origin = now.checked_sub(elapsed).unwrap_or(now);
    }
}

type DriverFactory = fn(WaveAttributes, Instant) -> Option<Driver>;

/// Builds a driver for `attributes`, or `None` when the period cannot be
/// represented as a `Duration`.
fn create_driver(attributes: WaveAttributes, now: Instant) -> Option<Driver> {
    let period = attributes.period()?;
    let total = u32::try_from(attributes.animation_total_height()).ok()?;
    Some(Driver {
        origin: now,
        period,
        total,
        subscriptions: Vec::new(),
    })
}

#[derive(Debug)]
pub struct OscillationController {
    attributes: WaveAttributes,
    current_offset: u32,
    direction: Direction,
    listeners: Vec<TickListener>,
    driver: Option<Driver>,
    retune_pending: bool,
    driver_factory: DriverFactory,
}

impl OscillationController {
    pub fn new(attributes: WaveAttributes) -> Self {
        Self {
            attributes,
            current_offset: 0,
            direction: Direction::Forward,
            listeners: Vec::new(),
            driver: None,
            retune_pending: false,
            driver_factory: create_driver,
        }
    }

    pub fn state(&self) -> OscillationState {
        if self.driver.is_some() {
            OscillationState::Running
        } else {
            OscillationState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_some()
    }

    pub fn current_offset(&self) -> u32 {
        self.current_offset
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn attributes(&self) -> &WaveAttributes {
        &self.attributes
    }

    /// Replaces the attributes; a running driver picks them up on its next tick.
    /// The offset is clamped into the new travel range straight away.
    pub fn set_attributes(&mut self, attributes: WaveAttributes) {
        self.attributes = attributes;
        let total = u32::try_from(attributes.animation_total_height()).unwrap_or(0);
        self.current_offset = self.current_offset.min(total);
        if self.driver.is_some() {
            self.retune_pending = true;
        }
    }

    /// Registers a listener, replacing any existing one with the same id.
    ///
    /// A running driver receives it immediately; otherwise it is attached on
    /// the next `start`.
    pub fn add_listener(&mut self, listener: TickListener) {
        if let Some(driver) = self.driver.as_mut() {
            driver.subscriptions.retain(|existing| existing.id != listener.id);
            driver.subscriptions.push(listener.clone());
        }
        self.listeners.retain(|existing| existing.id != listener.id);
        self.listeners.push(listener);
    }

    pub fn remove_listener(&mut self, id: LayerId) -> bool {
        if let Some(driver) = self.driver.as_mut() {
            driver.subscriptions.retain(|existing| existing.id != id);
        }
        let before = self.listeners.len();
        self.listeners.retain(|existing| existing.id != id);
        before != self.listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Listeners attached to the running driver; zero while idle.
    pub fn active_subscriptions(&self) -> usize {
        self.driver
            .as_ref()
            .map_or(0, |driver| driver.subscriptions.len())
    }

    /// Starts a fresh sweep from 0. Does nothing if already running.
    ///
    /// # Panics
    ///
    /// Panics if the driver factory yields no driver. `WaveAttributes` bounds
    /// the period by `MAX_PERIOD`, so the default factory only fails when that
    /// construction contract has been broken.
    pub fn start(&mut self, now: Instant) {
        if self.driver.is_some() {
            trace!("oscillation already running");
            return;
        }
        let mut driver = (self.driver_factory)(self.attributes, now).unwrap_or_else(|| {
            panic!(
                "oscillation driver could not be created (period {}ms, total {}px)",
                self.attributes.period_ms(),
                self.attributes.animation_total_height()
            )
        });
        driver.subscriptions = self.listeners.clone();
        debug!(
            period_ms = driver.period.as_secs_f64() * 1000.0,
            total = driver.total,
            listeners = driver.subscriptions.len(),
            "oscillation started"
        );
        self.current_offset = 0;
        self.direction = Direction::Forward;
        self.retune_pending = false;
        self.driver = Some(driver);
        self.notify();
    }

    /// Ends the sweep immediately and detaches every tick listener.
    pub fn stop(&mut self) {
        let Some(mut driver) = self.driver.take() else {
            return;
        };
        driver.subscriptions.clear();
        self.retune_pending = false;
        debug!(offset = self.current_offset, "oscillation stopped");
    }

    /// Advances to `now`, returning the new offset while running.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        let pending = self.retune_pending;
        let next_total = u32::try_from(self.attributes.animation_total_height()).ok();
        let next_period = self.attributes.period();
        let driver = self.driver.as_mut()?;
        if pending {
            if let (Some(total), Some(period)) = (next_total, next_period) {
                driver.retune(total, period, self.current_offset, self.direction, now);
                debug!(total, period_ms = period.as_secs_f64() * 1000.0, "oscillation retuned");
            }
            self.retune_pending = false;
        }
        let (offset, direction) = driver.sample(now);
        self.current_offset = offset;
        self.direction = direction;
        self.notify();
        Some(offset)
    }

    fn notify(&mut self) {
        let offset = self.current_offset;
        if let Some(driver) = self.driver.as_mut() {
            driver.subscriptions.retain(|listener| {
                let delivered = listener.notify(offset);
                if !delivered {
                    trace!(layer = listener.id.get(), "dropping disconnected tick listener");
                }
                delivered
            });
        }
    }
}
