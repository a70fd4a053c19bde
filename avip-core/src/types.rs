//! Shared frame types used between the decoder and the surfaces.

use crate::avi::FourCc;
use crate::error::PlayerError;

// ── PixelLayout ──────────────────────────────────────────────────

/// Layout of a raw frame payload as stored in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// 2 bytes per pixel, `x1r5g5b5` little-endian.
    Rgb555,
    /// 2 bytes per pixel, `r5g6b5` little-endian.
    Rgb565,
    /// 3 bytes per pixel: Blue, Green, Red.
    Bgr24,
    /// 4 bytes per pixel: Blue, Green, Red, unused.
    Bgrx32,
    /// Uncompressed, but a depth this crate does not convert (e.g. palettes).
    Unsupported { bits: u16 },
    /// Compressed with the given codec; frames cannot be converted.
    Compressed(FourCc),
}

impl PixelLayout {
    /// Bytes consumed by a single pixel, for layouts that can be converted.
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelLayout::Rgb555 | PixelLayout::Rgb565 => Some(2),
            PixelLayout::Bgr24 => Some(3),
            PixelLayout::Bgrx32 => Some(4),
            PixelLayout::Unsupported { .. } | PixelLayout::Compressed(_) => None,
        }
    }

    pub const fn is_convertible(self) -> bool {
        self.bytes_per_pixel().is_some()
    }
}

// ── FrameLayout ──────────────────────────────────────────────────

/// Geometry of the raw frames produced by a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub width: u32,
    pub height: u32,
    pub pixels: PixelLayout,
    /// DIB rows are stored last row first.
    pub bottom_up: bool,
}

impl FrameLayout {
    /// Source row pitch in bytes; DIB rows are padded to 4 bytes.
    ///
    /// `None` for layouts that cannot be converted and for pitches that
    /// overflow `usize`.
    pub fn stride(&self) -> Option<usize> {
        let bpp = self.pixels.bytes_per_pixel()?;
        let row = (self.width as usize).checked_mul(bpp)?.checked_add(3)?;
        Some(row & !3)
    }

    /// Bytes a complete raw frame occupies.
    pub fn frame_bytes(&self) -> Option<usize> {
        self.stride()?.checked_mul(self.height as usize)
    }
}

// ── PixelBuffer ──────────────────────────────────────────────────

/// A reusable, tightly packed RGBA8 image, top row first.
///
/// This is the software path's bitmap: allocated once per playback
/// session and overwritten frame after frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub const BYTES_PER_PIXEL: usize = 4;

    /// A black, fully transparent buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer size overflows `usize`. Sizes taken from a
    /// file go through [`try_new`](Self::try_new).
    pub fn new(width: u32, height: u32) -> Self {
        match Self::try_new(width, height) {
            Ok(buf) => buf,
            Err(e) => panic!("{e}"),
        }
    }

    /// A black buffer, or an error when `width * height` pixels do not
    /// fit in memory.
    pub fn try_new(width: u32, height: u32) -> Result<Self, PlayerError> {
        let len = Self::byte_len(width, height).ok_or_else(|| {
            PlayerError::Other(format!("{width}x{height} pixel buffer is too large"))
        })?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; len],
        })
    }

    fn byte_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(Self::BYTES_PER_PIXEL)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row pitch in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * Self::BYTES_PER_PIXEL
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride();
        &self.data[start..start + self.stride()]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// RGBA value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = y as usize * self.stride() + x as usize * Self::BYTES_PER_PIXEL;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[offset..offset + 4]);
        px
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_dword_aligned() {
        let layout = FrameLayout {
            width: 3,
            height: 2,
            pixels: PixelLayout::Bgr24,
            bottom_up: true,
        };
        assert_eq!(layout.stride(), Some(12));
        assert_eq!(layout.frame_bytes(), Some(24));

        let compressed = FrameLayout {
            pixels: PixelLayout::Compressed(FourCc(*b"XVID")),
            ..layout
        };
        assert_eq!(compressed.stride(), None);
    }

    #[test]
    fn pixel_buffer_sized_from_dimensions() {
        let buf = PixelBuffer::new(640, 480);
        assert_eq!(buf.as_bytes().len(), 640 * 480 * 4);
        assert_eq!(buf.stride(), 2560);
        assert_eq!(buf.pixel(639, 479), [0, 0, 0, 0]);
    }

    #[test]
    fn oversized_buffers_are_errors() {
        assert!(PixelBuffer::try_new(u32::MAX, u32::MAX).is_err());
        assert!(PixelBuffer::try_new(0, 10).unwrap().as_bytes().is_empty());
    }

    #[test]
    fn frame_bytes_overflow_is_none() {
        let layout = FrameLayout {
            width: u32::MAX,
            height: u32::MAX,
            pixels: PixelLayout::Bgrx32,
            bottom_up: false,
        };
        assert_eq!(layout.frame_bytes(), None);
    }
}
