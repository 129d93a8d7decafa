use waveconfig::Rgba;

use crate::geometry::WavePath;
use crate::types::{Bounds, FillRect};

/// What a host must provide for waves to be painted.
pub trait Surface {
    /// Fills a closed path with a solid colour.
    fn fill_path(&mut self, path: &WavePath, color: Rgba);
    /// Fills a rectangle with a solid colour.
    fn fill_rect(&mut self, rect: FillRect, color: Rgba);
    /// Current drawable area in pixels.
    fn bounds(&self) -> Bounds;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Path { path: WavePath, color: Rgba },
    Rect { rect: FillRect, color: Rgba },
}

impl DrawCommand {
    pub fn color(&self) -> Rgba {
        match self {
            DrawCommand::Path { color, .. } | DrawCommand::Rect { color, .. } => *color,
        }
    }
}

/// Surface that keeps every fill as a command, for hosts that replay draws
/// onto their own canvas.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    bounds: Bounds,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }
}

impl Surface for RecordingSurface {
    fn fill_path(&mut self, path: &WavePath, color: Rgba) {
        self.commands.push(DrawCommand::Path {
            path: path.clone(),
            color,
        });
    }

    fn fill_rect(&mut self, rect: FillRect, color: Rgba) {
        self.commands.push(DrawCommand::Rect { rect, color });
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }
}
