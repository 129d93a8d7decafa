//! Frame sinks for the `render` command: numbered PNGs in a directory or one
//! looping animated GIF.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};

pub enum FrameSink {
    Discard,
    PngDir { dir: PathBuf, written: usize },
    Gif { path: PathBuf, encoder: Box<GifEncoder<BufWriter<File>>>, delay: Delay },
}

impl FrameSink {
    /// Picks the sink from the output path: `.gif` files are encoded as an
    /// animation, anything else is treated as a frame directory.
    pub fn for_output(out: Option<&Path>, fps: u32) -> Result<Self> {
        let Some(out) = out else {
            return Ok(FrameSink::Discard);
        };
        if is_gif(out) {
            if let Some(parent) = out.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let file = File::create(out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let mut encoder = GifEncoder::new(BufWriter::new(file));
            encoder
                .set_repeat(Repeat::Infinite)
                .context("failed to configure GIF looping")?;
            Ok(FrameSink::Gif {
                path: out.to_path_buf(),
                encoder: Box::new(encoder),
                delay: Delay::from_numer_denom_ms(1000, fps.max(1)),
            })
        } else {
            fs::create_dir_all(out)
                .with_context(|| format!("failed to create frame directory {}", out.display()))?;
            Ok(FrameSink::PngDir {
                dir: out.to_path_buf(),
                written: 0,
            })
        }
    }

    pub fn write(&mut self, frame: RgbaImage) -> Result<()> {
        match self {
            FrameSink::Discard => Ok(()),
            FrameSink::PngDir { dir, written } => {
                let path = dir.join(format!("frame_{:05}.png", *written));
                frame
                    .save_with_format(&path, image::ImageFormat::Png)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                *written += 1;
                Ok(())
            }
            FrameSink::Gif {
                path,
                encoder,
                delay,
            } => encoder
                .encode_frame(Frame::from_parts(frame, 0, 0, *delay))
                .with_context(|| format!("failed to encode GIF frame into {}", path.display())),
        }
    }

    /// Flushes the output; the GIF trailer is written when the encoder drops.
    pub fn finish(self) -> Result<Option<PathBuf>> {
        match self {
            FrameSink::Discard => Ok(None),
            FrameSink::PngDir { dir, written } => {
                tracing::info!(frames = written, dir = %dir.display(), "wrote PNG frames");
                Ok(Some(dir))
            }
            FrameSink::Gif { path, encoder, .. } => {
                drop(encoder);
                tracing::info!(path = %path.display(), "wrote animated GIF");
                Ok(Some(path))
            }
        }
    }
}

fn is_gif(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gif"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn png_directory_numbers_frames() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("frames");
        let mut sink = FrameSink::for_output(Some(&dir), 30).unwrap();
        for _ in 0..3 {
            sink.write(RgbaImage::new(4, 4)).unwrap();
        }
        sink.finish().unwrap();
        assert!(dir.join("frame_00000.png").exists());
        assert!(dir.join("frame_00002.png").exists());
        assert!(!dir.join("frame_00003.png").exists());
    }

    #[test]
    fn gif_output_is_detected_by_extension() {
        assert!(is_gif(Path::new("out/waves.GIF")));
        assert!(!is_gif(Path::new("out/waves")));
        assert!(!is_gif(Path::new("out/waves.png")));
    }

    #[test]
    fn gif_sink_writes_header() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("waves.gif");
        let mut sink = FrameSink::for_output(Some(&path), 10).unwrap();
        sink.write(RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255])))
            .unwrap();
        sink.finish().unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..6], b"GIF89a");
    }
}
