//! Raw DIB frame to RGBA conversion.

use crate::error::PlayerError;
use crate::types::{FrameLayout, PixelBuffer, PixelLayout};

/// Expand a 5-bit channel to 8 bits.
#[inline]
fn expand5(v: u16) -> u8 {
    let v = (v & 0x1f) as u8;
    (v << 3) | (v >> 2)
}

/// Expand a 6-bit channel to 8 bits.
#[inline]
fn expand6(v: u16) -> u8 {
    let v = (v & 0x3f) as u8;
    (v << 2) | (v >> 4)
}

/// Convert one source row of `width` pixels into RGBA8.
///
/// `dst` must hold at least `width * 4` bytes and `src` at least
/// `width * bpp` bytes.
pub fn convert_row(pixels: PixelLayout, src: &[u8], dst: &mut [u8], width: usize) {
    match pixels {
        PixelLayout::Rgb565 => {
            for (s, d) in src.chunks_exact(2).zip(dst.chunks_exact_mut(4)).take(width) {
                let v = u16::from_le_bytes([s[0], s[1]]);
                d.copy_from_slice(&[expand5(v >> 11), expand6(v >> 5), expand5(v), 0xff]);
            }
        }
        PixelLayout::Rgb555 => {
            for (s, d) in src.chunks_exact(2).zip(dst.chunks_exact_mut(4)).take(width) {
                let v = u16::from_le_bytes([s[0], s[1]]);
                d.copy_from_slice(&[expand5(v >> 10), expand5(v >> 5), expand5(v), 0xff]);
            }
        }
        PixelLayout::Bgr24 => {
            for (s, d) in src.chunks_exact(3).zip(dst.chunks_exact_mut(4)).take(width) {
                d.copy_from_slice(&[s[2], s[1], s[0], 0xff]);
            }
        }
        PixelLayout::Bgrx32 => {
            for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)).take(width) {
                d.copy_from_slice(&[s[2], s[1], s[0], 0xff]);
            }
        }
        PixelLayout::Unsupported { .. } | PixelLayout::Compressed(_) => {}
    }
}

/// Validate `src` against `layout` and return the source stride.
pub fn check_frame(layout: &FrameLayout, src: &[u8]) -> Result<usize, PlayerError> {
    let (Some(stride), Some(needed)) = (layout.stride(), layout.frame_bytes()) else {
        return Err(PlayerError::Other(format!(
            "cannot convert {:?} frames",
            layout.pixels
        )));
    };
    if stride == 0 || needed == 0 {
        return Err(PlayerError::Other(format!(
            "cannot convert {}x{} frames",
            layout.width, layout.height
        )));
    }
    if src.len() < needed {
        return Err(PlayerError::Other(format!(
            "frame too short: {} < {}",
            src.len(),
            needed
        )));
    }
    Ok(stride)
}

/// Convert a complete raw frame into `dst`, top row first.
///
/// Bottom-up frames are flipped while converting. `dst` must have the
/// layout's dimensions.
pub fn frame_to_rgba(
    layout: &FrameLayout,
    src: &[u8],
    dst: &mut PixelBuffer,
) -> Result<(), PlayerError> {
    if dst.width() != layout.width || dst.height() != layout.height {
        return Err(PlayerError::Other(format!(
            "pixel buffer is {}x{}, frame is {}x{}",
            dst.width(),
            dst.height(),
            layout.width,
            layout.height
        )));
    }
    let stride = check_frame(layout, src)?;
    let width = layout.width as usize;

    for (y, src_row) in src.chunks_exact(stride).take(layout.height as usize).enumerate() {
        let dst_y = if layout.bottom_up {
            layout.height - 1 - y as u32
        } else {
            y as u32
        };
        convert_row(layout.pixels, src_row, dst.row_mut(dst_y), width);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb565_extremes() {
        let mut dst = [0u8; 12];
        let src = [0x00, 0xf8, 0xe0, 0x07, 0x1f, 0x00]; // red, green, blue
        convert_row(PixelLayout::Rgb565, &src, &mut dst, 3);
        assert_eq!(&dst[0..4], &[0xff, 0x00, 0x00, 0xff]);
        assert_eq!(&dst[4..8], &[0x00, 0xff, 0x00, 0xff]);
        assert_eq!(&dst[8..12], &[0x00, 0x00, 0xff, 0xff]);
    }

    #[test]
    fn rgb555_white() {
        let mut dst = [0u8; 4];
        convert_row(PixelLayout::Rgb555, &[0xff, 0x7f], &mut dst, 1);
        assert_eq!(dst, [0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn bottom_up_frames_are_flipped() {
        let layout = FrameLayout {
            width: 1,
            height: 2,
            pixels: PixelLayout::Bgr24,
            bottom_up: true,
        };
        // Stride 4: one BGR pixel plus one pad byte per row.
        let src = [0x00, 0x00, 0xff, 0, 0xff, 0x00, 0x00, 0];
        let mut dst = PixelBuffer::new(1, 2);
        frame_to_rgba(&layout, &src, &mut dst).unwrap();
        assert_eq!(dst.pixel(0, 0), [0x00, 0x00, 0xff, 0xff]); // blue on top
        assert_eq!(dst.pixel(0, 1), [0xff, 0x00, 0x00, 0xff]);
    }

    #[test]
    fn short_frames_are_rejected() {
        let layout = FrameLayout {
            width: 2,
            height: 2,
            pixels: PixelLayout::Bgrx32,
            bottom_up: false,
        };
        let mut dst = PixelBuffer::new(2, 2);
        assert!(frame_to_rgba(&layout, &[0u8; 8], &mut dst).is_err());
        assert!(frame_to_rgba(&layout, &[0u8; 16], &mut dst).is_ok());
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let layout = FrameLayout {
            width: 2,
            height: 2,
            pixels: PixelLayout::Bgrx32,
            bottom_up: false,
        };
        let mut dst = PixelBuffer::new(3, 2);
        assert!(frame_to_rgba(&layout, &[0u8; 16], &mut dst).is_err());
    }

    #[test]
    fn empty_frames_are_rejected() {
        let layout = FrameLayout {
            width: 0,
            height: 1,
            pixels: PixelLayout::Bgrx32,
            bottom_up: true,
        };
        let mut dst = PixelBuffer::new(0, 1);
        assert!(frame_to_rgba(&layout, &[0u8; 4], &mut dst).is_err());
        assert!(check_frame(&FrameLayout { width: 1, height: 0, ..layout }, &[0u8; 4]).is_err());
    }
}
