//! Animated liquid-wave layers for wallpapers and progress backdrops.
//!
//! Each layer is a sampled sine curve with a solid backing fill. Its vertical
//! offset sweeps back and forth forever, and the compositor stacks several
//! layers with staggered start times so the crests never line up. The flow is:
//!
//! ```text
//!   WaveConfig / host
//!          │ WaveAttributes
//!          ▼
//!   LayerCompositor ──▶ WaveLayer ──▶ OscillationController ──▶ RedrawRequest
//!          │  ▲               │
//!          │  └── tick(now) ──┘
//!          └─▶ draw() ─▶ build_shape() ─▶ Surface (RecordingSurface / PixmapSurface)
//! ```
//!
//! Time is always passed in explicitly, so hosts drive the animation from
//! their own frame clock and tests run on a simulated one.

pub mod compositor;
pub mod geometry;
pub mod layer;
pub mod oscillation;
pub mod raster;
pub mod redraw;
pub mod surface;
pub mod types;

pub use compositor::{FrameStatus, LayerCompositor, Lifecycle};
pub use geometry::{build_path, build_shape, PathCommand, Point, WavePath, WaveShape};
pub use layer::{Animatable, Renderable, WaveLayer};
pub use oscillation::{Direction, OscillationController, OscillationState, TickListener};
pub use raster::PixmapSurface;
pub use redraw::{drain_pending, redraw_channel, RedrawReceiver, RedrawRequest, RedrawSender};
pub use surface::{DrawCommand, RecordingSurface, Surface};
pub use types::{Bounds, FillRect, LayerId, Visibility};
pub use waveconfig::{ConfigError, Insets, Rgba, StartMode, WaveAttributes, WaveConfig};
