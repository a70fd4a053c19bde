//! Hardware playback target: a texture with a crop rectangle.
//!
//! Frames are uploaded row for row in the order the container stores
//! them. Orientation is fixed at draw time: bottom-up DIBs get the crop
//! rectangle `{0, h, w, -h}`, which reads the texture from its last row
//! upwards.

use tracing::{debug, trace, warn};

use crate::convert::{check_frame, convert_row};
use crate::decoder::{DecoderHandle, SharedDecoder, VideoDecoder};
use crate::error::PlayerError;
use crate::player::gl::FrameRenderer;
use crate::surface::{FrameSink, SharedSink};
use crate::types::{FrameLayout, PixelBuffer};

// ── CropRect ─────────────────────────────────────────────────────

/// Region of the texture to draw. A negative extent walks that axis
/// backwards from the edge at `x` / `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CropRect {
    /// The whole texture, as stored.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: width as i32,
            height: height as i32,
        }
    }

    /// The whole texture, vertically flipped.
    pub fn flipped(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: height as i32,
            width: width as i32,
            height: -(height as i32),
        }
    }

    /// The rectangle that shows `layout` upright.
    pub fn for_layout(layout: &FrameLayout) -> Self {
        if layout.bottom_up {
            Self::flipped(layout.width, layout.height)
        } else {
            Self::full(layout.width, layout.height)
        }
    }

    /// Size of the drawn image.
    pub fn extent(&self) -> (u32, u32) {
        (self.width.unsigned_abs(), self.height.unsigned_abs())
    }

    /// Texture coordinate sampled for output index `i` along one axis.
    fn source(origin: i32, extent: i32, i: u32) -> i64 {
        if extent < 0 {
            origin as i64 - 1 - i as i64
        } else {
            origin as i64 + i as i64
        }
    }
}

// ── Texture ──────────────────────────────────────────────────────

/// An RGBA8 texture in upload order.
#[derive(Debug, Clone)]
pub struct Texture {
    image: PixelBuffer,
    crop: CropRect,
}

impl Texture {
    /// An empty texture of the given size, drawn uncropped.
    pub fn new(width: u32, height: u32) -> Result<Self, PlayerError> {
        Ok(Self {
            image: PixelBuffer::try_new(width, height)?,
            crop: CropRect::full(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn crop(&self) -> CropRect {
        self.crop
    }

    pub fn set_crop(&mut self, crop: CropRect) {
        self.crop = crop;
    }

    /// Replace the texture contents with a raw frame, rows in stored order.
    pub fn upload(&mut self, layout: &FrameLayout, src: &[u8]) -> Result<(), PlayerError> {
        if layout.width != self.width() || layout.height != self.height() {
            return Err(PlayerError::Renderer(format!(
                "texture is {}x{}, frame is {}x{}",
                self.width(),
                self.height(),
                layout.width,
                layout.height
            )));
        }
        let stride = check_frame(layout, src)?;
        let width = layout.width as usize;
        for (y, row) in src.chunks_exact(stride).take(layout.height as usize).enumerate() {
            convert_row(layout.pixels, row, self.image.row_mut(y as u32), width);
        }
        Ok(())
    }

    /// Draw the crop rectangle into `dst`, which must have its extent.
    pub fn draw(&self, dst: &mut PixelBuffer) -> Result<(), PlayerError> {
        let (w, h) = self.crop.extent();
        if dst.width() != w || dst.height() != h {
            return Err(PlayerError::Renderer(format!(
                "draw target is {}x{}, crop is {}x{}",
                dst.width(),
                dst.height(),
                w,
                h
            )));
        }
        let in_bounds = |v: i64, max: u32| v >= 0 && v < max as i64;
        let bpp = PixelBuffer::BYTES_PER_PIXEL;

        for i in 0..h {
            let sy = CropRect::source(self.crop.y, self.crop.height, i);
            if !in_bounds(sy, self.height()) {
                return Err(PlayerError::Renderer(format!("crop row {sy} outside texture")));
            }
            let src = self.image.row(sy as u32);
            let out = dst.row_mut(i);
            if self.crop.width >= 0 {
                let x0 = self.crop.x as i64;
                if !in_bounds(x0, self.width() + 1) || x0 + w as i64 > self.width() as i64 {
                    return Err(PlayerError::Renderer("crop columns outside texture".into()));
                }
                let start = x0 as usize * bpp;
                out.copy_from_slice(&src[start..start + w as usize * bpp]);
            } else {
                for j in 0..w {
                    let sx = CropRect::source(self.crop.x, self.crop.width, j);
                    if !in_bounds(sx, self.width()) {
                        return Err(PlayerError::Renderer(format!(
                            "crop column {sx} outside texture"
                        )));
                    }
                    let s = sx as usize * bpp;
                    let d = j as usize * bpp;
                    out[d..d + bpp].copy_from_slice(&src[s..s + bpp]);
                }
            }
        }
        Ok(())
    }
}

// ── TextureRenderer ──────────────────────────────────────────────

/// Renderer instance of the hardware path.
///
/// Created from an open [`DecoderHandle`] and holding a shared reference
/// to its decoder; the player frees it before closing the handle.
pub struct TextureRenderer<D: VideoDecoder, S: FrameSink> {
    decoder: SharedDecoder<D>,
    sink: SharedSink<S>,
    layout: FrameLayout,
    buffer: Vec<u8>,
    texture: Option<Texture>,
    target: PixelBuffer,
}

impl<D: VideoDecoder, S: FrameSink> TextureRenderer<D, S> {
    /// Allocate the frame buffer for `handle`'s stream.
    pub fn init(handle: &DecoderHandle<D>, sink: SharedSink<S>) -> Result<Self, PlayerError> {
        let info = handle.info();
        if info.max_frame_size == 0 {
            return Err(PlayerError::Renderer("unable to get the frame size".into()));
        }
        debug!(
            width = info.width,
            height = info.height,
            frame_size = info.max_frame_size,
            "texture renderer created"
        );
        Ok(Self {
            decoder: handle.share(),
            sink,
            layout: info.layout,
            buffer: vec![0u8; info.max_frame_size],
            texture: None,
            target: PixelBuffer::try_new(info.width, info.height)?,
        })
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    /// Release the renderer instance.
    pub fn free(self) {
        debug!("texture renderer freed");
    }
}

impl<D: VideoDecoder, S: FrameSink> FrameRenderer for TextureRenderer<D, S> {
    fn init_surface(&mut self) -> Result<(), PlayerError> {
        let mut texture = Texture::new(self.layout.width, self.layout.height)?;
        texture.set_crop(CropRect::for_layout(&self.layout));
        let (w, h) = texture.crop().extent();
        if self.target.width() != w || self.target.height() != h {
            self.target = PixelBuffer::try_new(w, h)?;
        }
        debug!(crop = ?texture.crop(), "texture allocated");
        self.texture = Some(texture);
        Ok(())
    }

    fn render_frame(&mut self) -> bool {
        let n = match self.decoder.read_frame(&mut self.buffer) {
            Ok(0) => return false,
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "frame read failed");
                return false;
            }
        };
        let Some(texture) = self.texture.as_mut() else {
            warn!("render requested before the surface was initialised");
            return false;
        };
        if let Err(e) = texture.upload(&self.layout, &self.buffer[..n]) {
            trace!(error = %e, "frame not uploaded");
            return false;
        }
        if let Err(e) = texture.draw(&mut self.target) {
            warn!(error = %e, "texture draw failed");
            return false;
        }
        if let Err(e) = self.sink.present(&self.target) {
            warn!(error = %e, "present failed");
        }
        true
    }
}
