//! Output surfaces for the command-line player.
//!
//! | Kind   | Behaviour                                          |
//! |--------|----------------------------------------------------|
//! | `null` | Counts frames and drops them                       |
//! | `ppm`  | Writes every Nth frame as a binary PPM (`P6`) file |

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use avip_core::{FrameSink, PixelBuffer, PlayerError};

use crate::config::OutputConfig;

/// Which surface to present frames to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    #[default]
    Null,
    Ppm,
}

impl FromStr for SurfaceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "null" | "none" => Ok(Self::Null),
            "ppm" => Ok(Self::Ppm),
            other => Err(format!("unknown surface: {other:?} (expected null or ppm)")),
        }
    }
}

/// Build the configured surface.
pub fn build_surface(config: &OutputConfig) -> Result<Box<dyn FrameSink>, PlayerError> {
    Ok(match config.surface {
        SurfaceKind::Null => Box::new(NullSurface::default()),
        SurfaceKind::Ppm => Box::new(PpmDumpSurface::new(&config.dump_dir, config.dump_every)?),
    })
}

// ── NullSurface ──────────────────────────────────────────────────

/// Accepts and discards frames.
#[derive(Debug, Default)]
pub struct NullSurface {
    frames: u64,
}

impl NullSurface {
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameSink for NullSurface {
    fn present(&mut self, frame: &PixelBuffer) -> Result<(), PlayerError> {
        self.frames += 1;
        trace!(frame = self.frames, width = frame.width(), height = frame.height(), "present");
        Ok(())
    }
}

// ── PpmDumpSurface ───────────────────────────────────────────────

/// Writes presented frames to `dir/frame-NNNNNN.ppm`.
#[derive(Debug)]
pub struct PpmDumpSurface {
    dir: PathBuf,
    every: u32,
    presented: u64,
    written: u64,
}

impl PpmDumpSurface {
    /// Create `dir` if needed. An `every` of 0 is treated as 1.
    pub fn new(dir: impl AsRef<Path>, every: u32) -> Result<Self, PlayerError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), every, "dumping frames");
        Ok(Self {
            dir,
            every: every.max(1),
            presented: 0,
            written: 0,
        })
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    fn path_for(&self, n: u64) -> PathBuf {
        self.dir.join(format!("frame-{n:06}.ppm"))
    }
}

/// Encode `frame` as binary PPM, dropping alpha.
pub fn write_ppm(out: impl Write, frame: &PixelBuffer) -> Result<(), PlayerError> {
    let (width, height) = (frame.width(), frame.height());
    let rgba = RgbaImage::from_raw(width, height, frame.as_bytes().to_vec())
        .ok_or_else(|| PlayerError::Surface(format!("{width}x{height} frame is incomplete")))?;
    let rgb = DynamicImage::ImageRgba8(rgba).into_rgb8();

    PnmEncoder::new(out)
        .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary))
        .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| PlayerError::Surface(format!("ppm encode failed: {e}")))
}

impl FrameSink for PpmDumpSurface {
    fn present(&mut self, frame: &PixelBuffer) -> Result<(), PlayerError> {
        self.presented += 1;
        if (self.presented - 1) % u64::from(self.every) != 0 {
            return Ok(());
        }
        let path = self.path_for(self.presented);
        let mut out = BufWriter::new(File::create(&path)?);
        write_ppm(&mut out, frame)?;
        out.flush()?;
        self.written += 1;
        trace!(path = %path.display(), "frame written");
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), PlayerError> {
        debug!(width, height, "surface resized; frames keep their native size");
        Ok(())
    }
}
