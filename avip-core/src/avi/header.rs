//! `avih`, `strh` and `strf` header records.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::avi::riff::FourCc;
use crate::error::AviError;
use crate::flags::MainHeaderFlags;
use crate::types::PixelLayout;

// ── MainHeader ───────────────────────────────────────────────────

/// The `avih` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MainHeader {
    pub micro_sec_per_frame: u32,
    pub max_bytes_per_sec: u32,
    pub padding_granularity: u32,
    pub flags: MainHeaderFlags,
    pub total_frames: u32,
    pub initial_frames: u32,
    pub streams: u32,
    pub suggested_buffer_size: u32,
    pub width: u32,
    pub height: u32,
}

impl MainHeader {
    /// Minimum payload length (the four reserved words may be absent).
    pub const MIN_LEN: usize = 40;

    pub fn parse(payload: &[u8]) -> Result<Self, AviError> {
        if payload.len() < Self::MIN_LEN {
            return Err(AviError::InvalidChunk("avih shorter than 40 bytes"));
        }
        let mut r = Cursor::new(payload);
        Ok(Self {
            micro_sec_per_frame: r.read_u32::<LittleEndian>()?,
            max_bytes_per_sec: r.read_u32::<LittleEndian>()?,
            padding_granularity: r.read_u32::<LittleEndian>()?,
            flags: MainHeaderFlags::from_bits_truncate(r.read_u32::<LittleEndian>()?),
            total_frames: r.read_u32::<LittleEndian>()?,
            initial_frames: r.read_u32::<LittleEndian>()?,
            streams: r.read_u32::<LittleEndian>()?,
            suggested_buffer_size: r.read_u32::<LittleEndian>()?,
            width: r.read_u32::<LittleEndian>()?,
            height: r.read_u32::<LittleEndian>()?,
        })
    }
}

// ── StreamHeader ─────────────────────────────────────────────────

/// The `strh` chunk of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamHeader {
    /// `vids`, `auds`, `txts`, ...
    pub fcc_type: FourCc,
    /// Codec handler, e.g. `DIB ` or `MJPG`.
    pub fcc_handler: FourCc,
    pub flags: u32,
    pub priority: u16,
    pub language: u16,
    pub initial_frames: u32,
    pub scale: u32,
    pub rate: u32,
    pub start: u32,
    pub length: u32,
    pub suggested_buffer_size: u32,
    pub quality: i32,
    pub sample_size: u32,
}

impl StreamHeader {
    pub const MIN_LEN: usize = 48;

    pub fn parse(payload: &[u8]) -> Result<Self, AviError> {
        if payload.len() < Self::MIN_LEN {
            return Err(AviError::InvalidChunk("strh shorter than 48 bytes"));
        }
        let mut r = Cursor::new(payload);
        Ok(Self {
            fcc_type: FourCc::from_u32(r.read_u32::<LittleEndian>()?),
            fcc_handler: FourCc::from_u32(r.read_u32::<LittleEndian>()?),
            flags: r.read_u32::<LittleEndian>()?,
            priority: r.read_u16::<LittleEndian>()?,
            language: r.read_u16::<LittleEndian>()?,
            initial_frames: r.read_u32::<LittleEndian>()?,
            scale: r.read_u32::<LittleEndian>()?,
            rate: r.read_u32::<LittleEndian>()?,
            start: r.read_u32::<LittleEndian>()?,
            length: r.read_u32::<LittleEndian>()?,
            suggested_buffer_size: r.read_u32::<LittleEndian>()?,
            quality: r.read_i32::<LittleEndian>()?,
            sample_size: r.read_u32::<LittleEndian>()?,
        })
    }

    pub fn is_video(&self) -> bool {
        self.fcc_type == FourCc::VIDS
    }

    /// `rate / scale`, or `None` when either is zero.
    pub fn frame_rate(&self) -> Option<f64> {
        if self.scale == 0 || self.rate == 0 {
            None
        } else {
            Some(f64::from(self.rate) / f64::from(self.scale))
        }
    }
}

// ── BitmapInfoHeader ─────────────────────────────────────────────

/// `BI_RGB` compression tag.
pub const BI_RGB: u32 = 0;
/// `BI_BITFIELDS` compression tag; three colour masks follow the header.
pub const BI_BITFIELDS: u32 = 3;

/// The `strf` chunk of a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitmapInfoHeader {
    pub size: u32,
    pub width: i32,
    /// Positive for bottom-up bitmaps, negative for top-down.
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: u32,
    pub size_image: u32,
    pub x_pels_per_meter: i32,
    pub y_pels_per_meter: i32,
    pub clr_used: u32,
    pub clr_important: u32,
    /// Red/green/blue masks for `BI_BITFIELDS`, if present.
    pub masks: Option<[u32; 3]>,
}

impl BitmapInfoHeader {
    pub const MIN_LEN: usize = 40;

    pub fn parse(payload: &[u8]) -> Result<Self, AviError> {
        if payload.len() < Self::MIN_LEN {
            return Err(AviError::InvalidChunk("strf shorter than 40 bytes"));
        }
        let mut r = Cursor::new(payload);
        let mut header = Self {
            size: r.read_u32::<LittleEndian>()?,
            width: r.read_i32::<LittleEndian>()?,
            height: r.read_i32::<LittleEndian>()?,
            planes: r.read_u16::<LittleEndian>()?,
            bit_count: r.read_u16::<LittleEndian>()?,
            compression: r.read_u32::<LittleEndian>()?,
            size_image: r.read_u32::<LittleEndian>()?,
            x_pels_per_meter: r.read_i32::<LittleEndian>()?,
            y_pels_per_meter: r.read_i32::<LittleEndian>()?,
            clr_used: r.read_u32::<LittleEndian>()?,
            clr_important: r.read_u32::<LittleEndian>()?,
            masks: None,
        };
        if header.compression == BI_BITFIELDS && payload.len() >= Self::MIN_LEN + 12 {
            header.masks = Some([
                r.read_u32::<LittleEndian>()?,
                r.read_u32::<LittleEndian>()?,
                r.read_u32::<LittleEndian>()?,
            ]);
        }
        Ok(header)
    }

    pub fn is_bottom_up(&self) -> bool {
        self.height > 0
    }

    /// Map the compression tag and bit depth onto a pixel layout.
    pub fn pixel_layout(&self) -> PixelLayout {
        match (self.compression, self.bit_count) {
            (BI_RGB, 16) => PixelLayout::Rgb555,
            (BI_RGB, 24) => PixelLayout::Bgr24,
            (BI_RGB, 32) => PixelLayout::Bgrx32,
            (BI_BITFIELDS, 16) => match self.masks {
                Some([_, 0x07e0, _]) | None => PixelLayout::Rgb565,
                Some(_) => PixelLayout::Rgb555,
            },
            (BI_BITFIELDS, 32) => PixelLayout::Bgrx32,
            (BI_RGB | BI_BITFIELDS, bits) => PixelLayout::Unsupported { bits },
            (tag, _) => PixelLayout::Compressed(FourCc::from_u32(tag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap_info(bit_count: u16, compression: u32, masks: Option<[u32; 3]>) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&40u32.to_le_bytes());
        b.extend_from_slice(&64i32.to_le_bytes());
        b.extend_from_slice(&(-32i32).to_le_bytes());
        b.extend_from_slice(&1u16.to_le_bytes());
        b.extend_from_slice(&bit_count.to_le_bytes());
        b.extend_from_slice(&compression.to_le_bytes());
        b.extend_from_slice(&[0u8; 20]);
        if let Some(masks) = masks {
            for m in masks {
                b.extend_from_slice(&m.to_le_bytes());
            }
        }
        b
    }

    #[test]
    fn parses_top_down_bitmap() {
        let h = BitmapInfoHeader::parse(&bitmap_info(24, BI_RGB, None)).unwrap();
        assert_eq!(h.width, 64);
        assert_eq!(h.height, -32);
        assert!(!h.is_bottom_up());
        assert_eq!(h.pixel_layout(), PixelLayout::Bgr24);
    }

    #[test]
    fn sixteen_bit_layouts() {
        let h = BitmapInfoHeader::parse(&bitmap_info(16, BI_RGB, None)).unwrap();
        assert_eq!(h.pixel_layout(), PixelLayout::Rgb555);

        let masks = Some([0xf800, 0x07e0, 0x001f]);
        let h = BitmapInfoHeader::parse(&bitmap_info(16, BI_BITFIELDS, masks)).unwrap();
        assert_eq!(h.pixel_layout(), PixelLayout::Rgb565);

        let masks = Some([0x7c00, 0x03e0, 0x001f]);
        let h = BitmapInfoHeader::parse(&bitmap_info(16, BI_BITFIELDS, masks)).unwrap();
        assert_eq!(h.pixel_layout(), PixelLayout::Rgb555);
    }

    #[test]
    fn compressed_layout_keeps_fourcc() {
        let tag = FourCc(*b"MJPG").as_u32();
        let h = BitmapInfoHeader::parse(&bitmap_info(24, tag, None)).unwrap();
        assert_eq!(h.pixel_layout(), PixelLayout::Compressed(FourCc(*b"MJPG")));
    }

    #[test]
    fn short_headers_are_rejected() {
        assert!(MainHeader::parse(&[0u8; 12]).is_err());
        assert!(StreamHeader::parse(&[0u8; 40]).is_err());
        assert!(BitmapInfoHeader::parse(&[0u8; 39]).is_err());
    }

    #[test]
    fn stream_frame_rate() {
        let mut h = StreamHeader {
            scale: 1001,
            rate: 30000,
            ..Default::default()
        };
        let fps = h.frame_rate().unwrap();
        assert!((fps - 29.97).abs() < 0.01);
        h.scale = 0;
        assert_eq!(h.frame_rate(), None);
    }
}
