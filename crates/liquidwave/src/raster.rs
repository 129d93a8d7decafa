//! CPU rasterisation of wave shapes onto a `tiny_skia::Pixmap`.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};
use waveconfig::Rgba;

use crate::geometry::{PathCommand, WavePath};
use crate::surface::Surface;
use crate::types::{Bounds, FillRect};

pub struct PixmapSurface {
    pixmap: Pixmap,
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("cannot allocate a {width}x{height} pixmap"))?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn clear(&mut self, color: Rgba) {
        self.pixmap
            .fill(Color::from_rgba8(color.r, color.g, color.b, color.a));
    }

    /// Straight-alpha colour at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let color = self.pixmap.pixel(x, y)?.demultiply();
        Some(Rgba::new(
            color.red(),
            color.green(),
            color.blue(),
            color.alpha(),
        ))
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn to_rgba_image(&self) -> Result<RgbaImage> {
        let mut buffer = Vec::with_capacity(self.pixmap.data().len());
        for pixel in self.pixmap.pixels() {
            let color = pixel.demultiply();
            buffer.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        RgbaImage::from_raw(self.width(), self.height(), buffer)
            .ok_or_else(|| anyhow!("pixmap buffer does not match its dimensions"))
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.to_rgba_image()?
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write frame to {}", path.display()))
    }
}

fn paint_for(color: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn to_skia_path(path: &WavePath) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    for command in path.commands() {
        match *command {
            PathCommand::MoveTo { x, y } => builder.move_to(x, y),
            PathCommand::LineTo { x, y } => builder.line_to(x, y),
            PathCommand::Close => builder.close(),
        }
    }
    builder.finish()
}

impl Surface for PixmapSurface {
    fn fill_path(&mut self, path: &WavePath, color: Rgba) {
        let Some(skia_path) = to_skia_path(path) else {
            return;
        };
        self.pixmap.fill_path(
            &skia_path,
            &paint_for(color),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    fn fill_rect(&mut self, rect: FillRect, color: Rgba) {
        let Some(rect) = Rect::from_ltrb(rect.left, rect.top, rect.right, rect.bottom) else {
            return;
        };
        self.pixmap
            .fill_rect(rect, &paint_for(color), Transform::identity(), None);
    }

    fn bounds(&self) -> Bounds {
        Bounds::from_size(self.width() as i32, self.height() as i32)
    }
}
