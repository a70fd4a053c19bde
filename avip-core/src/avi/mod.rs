//! # AVI container reader
//!
//! Reads the first video stream of a RIFF/AVI file:
//!
//! ```text
//! RIFF 'AVI '
//! ├── LIST 'hdrl'
//! │   ├── avih                 main header
//! │   └── LIST 'strl' (×n)
//! │       ├── strh             stream header
//! │       └── strf             BITMAPINFOHEADER for 'vids'
//! ├── LIST 'movi'
//! │   └── ##db / ##dc ...      frame payloads (optionally in LIST 'rec ')
//! └── idx1                     optional frame index
//! ```
//!
//! | Module   | Purpose                                   |
//! |----------|-------------------------------------------|
//! | `riff`   | `FourCc`, chunk headers, chunk walking    |
//! | `header` | `avih` / `strh` / `strf` records          |
//! | `index`  | Frame table from `idx1` or a `movi` scan  |

pub mod header;
pub mod index;
pub mod riff;

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

pub use header::{BitmapInfoHeader, MainHeader, StreamHeader};
pub use index::{FrameEntry, FrameIndex};
pub use riff::{ChunkHeader, ChunkWalker, FourCc};

use crate::error::AviError;
use crate::types::{FrameLayout, PixelLayout};

/// Largest frame width or height accepted on open.
pub const MAX_DIMENSION: u32 = 16_384;

/// An AVI file opened from disk.
pub type AviFile = AviReader<BufReader<File>>;

/// Selected video stream of the `hdrl` list.
struct VideoStream {
    number: u16,
    header: StreamHeader,
    format: BitmapInfoHeader,
}

/// Reader over the first video stream of an AVI container.
///
/// Frames are read sequentially from an internal cursor, like a
/// decoder pulling one frame per tick.
pub struct AviReader<R> {
    reader: R,
    main: MainHeader,
    stream: StreamHeader,
    format: BitmapInfoHeader,
    stream_number: u16,
    index: FrameIndex,
    position: usize,
}

impl AviFile {
    /// Open and index the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AviError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader = Self::new(BufReader::new(file))?;
        info!(
            path = %path.display(),
            width = reader.width(),
            height = reader.height(),
            fps = reader.frame_rate(),
            frames = reader.frame_count(),
            "AVI opened"
        );
        Ok(reader)
    }
}

impl<R: Read + Seek> AviReader<R> {
    /// Parse the headers and build the frame index.
    pub fn new(mut reader: R) -> Result<Self, AviError> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let riff = match ChunkHeader::read(&mut reader) {
            Ok(h) if h.id == FourCc::RIFF => h,
            Ok(_) => return Err(AviError::NotRiff),
            Err(AviError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(AviError::NotRiff);
            }
            Err(e) => return Err(e),
        };
        let form = FourCc::read(&mut reader).map_err(|_| AviError::NotRiff)?;
        if form != FourCc::AVI {
            return Err(AviError::NotAvi(form.to_string()));
        }

        // Broken writers leave a stale RIFF size behind; trust the file.
        let riff_end = riff.end().min(file_len);

        let mut main = None;
        let mut video = None;
        let mut movi = None;
        let mut idx1 = None;

        let mut top = ChunkWalker::new(riff.offset + 4, riff_end);
        while let Some(chunk) = top.next_chunk(&mut reader)? {
            if chunk.id == FourCc::LIST {
                let list_type = FourCc::read(&mut reader)?;
                let list_end = chunk.end().min(riff_end);
                if list_type == FourCc::HDRL {
                    let (m, v) = Self::parse_hdrl(&mut reader, chunk.offset + 4, list_end)?;
                    main = m;
                    video = v;
                } else if list_type == FourCc::MOVI && movi.is_none() {
                    movi = Some((chunk.offset, list_end));
                }
            } else if chunk.id == FourCc::IDX1 && idx1.is_none() {
                idx1 = Some(chunk.read_payload(&mut reader, file_len)?);
            } else {
                debug!(id = %chunk.id, size = chunk.size, "skipping top-level chunk");
            }
        }

        let main = main.ok_or(AviError::MissingHeader("avih"))?;
        let video = video.ok_or(AviError::NoVideoStream)?;
        let (movi_list, movi_end) = movi.ok_or(AviError::MissingHeader("movi"))?;

        let mut index = match idx1 {
            Some(payload) => FrameIndex::from_idx1(&payload, movi_list, video.number, file_len)?,
            None => FrameIndex::default(),
        };
        if index.is_empty() {
            index = FrameIndex::scan_movi(&mut reader, movi_list + 4, movi_end, video.number)?;
        }

        let avi = Self {
            reader,
            main,
            stream: video.header,
            format: video.format,
            stream_number: video.number,
            index,
            position: 0,
        };
        avi.check_dimensions()?;
        Ok(avi)
    }

    /// Reject frame sizes no surface can be allocated for.
    fn check_dimensions(&self) -> Result<(), AviError> {
        let (width, height) = (self.width(), self.height());
        if width == 0 || height == 0 {
            return Err(AviError::InvalidChunk("video frame has no width or height"));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            debug!(width, height, max = MAX_DIMENSION, "frame size rejected");
            return Err(AviError::InvalidChunk("video frame is too large"));
        }
        Ok(())
    }

    fn parse_hdrl(
        reader: &mut R,
        start: u64,
        end: u64,
    ) -> Result<(Option<MainHeader>, Option<VideoStream>), AviError> {
        let mut main = None;
        let mut video = None;
        let mut stream_count: u16 = 0;

        let mut walker = ChunkWalker::new(start, end);
        while let Some(chunk) = walker.next_chunk(reader)? {
            if chunk.id == FourCc::AVIH {
                main = Some(MainHeader::parse(&chunk.read_payload(reader, end)?)?);
                continue;
            }
            if chunk.id != FourCc::LIST || FourCc::read(reader)? != FourCc::STRL {
                continue;
            }

            let number = stream_count;
            stream_count += 1;
            if video.is_some() {
                continue;
            }

            let strl_end = chunk.end().min(end);
            let mut strh = None;
            let mut strf = None;
            let mut inner = ChunkWalker::new(chunk.offset + 4, strl_end);
            while let Some(sub) = inner.next_chunk(reader)? {
                if sub.id == FourCc::STRH {
                    strh = Some(StreamHeader::parse(&sub.read_payload(reader, strl_end)?)?);
                } else if sub.id == FourCc::STRF {
                    strf = Some(sub.read_payload(reader, strl_end)?);
                }
            }

            match (strh, strf) {
                (Some(header), Some(format)) if header.is_video() => {
                    video = Some(VideoStream {
                        number,
                        header,
                        format: BitmapInfoHeader::parse(&format)?,
                    });
                }
                (Some(header), None) if header.is_video() => {
                    return Err(AviError::MissingHeader("strf"));
                }
                _ => {}
            }
        }

        Ok((main, video))
    }

    // ── Stream properties ────────────────────────────────────────

    pub fn width(&self) -> u32 {
        match self.format.width.unsigned_abs() {
            0 => self.main.width,
            w => w,
        }
    }

    pub fn height(&self) -> u32 {
        match self.format.height.unsigned_abs() {
            0 => self.main.height,
            h => h,
        }
    }

    /// Average frames per second; `0.0` when the headers give no timing.
    pub fn frame_rate(&self) -> f64 {
        if let Some(fps) = self.stream.frame_rate() {
            return fps;
        }
        match self.main.micro_sec_per_frame {
            0 => 0.0,
            us => 1_000_000.0 / f64::from(us),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.index.len()
    }

    /// Total play time at the nominal frame rate.
    pub fn duration(&self) -> Duration {
        let fps = self.frame_rate();
        if fps <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / fps)
    }

    /// Codec handler of the video stream, e.g. `DIB ` or `MJPG`.
    pub fn compressor(&self) -> FourCc {
        self.stream.fcc_handler
    }

    pub fn main_header(&self) -> &MainHeader {
        &self.main
    }

    pub fn stream_header(&self) -> &StreamHeader {
        &self.stream
    }

    pub fn bitmap_info(&self) -> &BitmapInfoHeader {
        &self.format
    }

    pub fn stream_number(&self) -> u16 {
        self.stream_number
    }

    pub fn pixel_layout(&self) -> PixelLayout {
        self.format.pixel_layout()
    }

    pub fn frame_layout(&self) -> FrameLayout {
        FrameLayout {
            width: self.width(),
            height: self.height(),
            pixels: self.pixel_layout(),
            bottom_up: self.format.is_bottom_up(),
        }
    }

    // ── Frame access ─────────────────────────────────────────────

    /// Size of the largest frame; a buffer this big fits every frame.
    pub fn max_frame_size(&self) -> usize {
        self.index.max_frame_size()
    }

    /// Payload size of `frame`.
    pub fn frame_size(&self, frame: usize) -> Result<usize, AviError> {
        self.entry(frame).map(|e| e.size as usize)
    }

    pub fn is_keyframe(&self, frame: usize) -> Result<bool, AviError> {
        self.entry(frame).map(FrameEntry::is_keyframe)
    }

    /// Index of the frame the next [`read_frame`](Self::read_frame) returns.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, frame: usize) -> Result<(), AviError> {
        if frame > self.index.len() {
            return Err(AviError::FrameOutOfRange {
                frame,
                count: self.index.len(),
            });
        }
        self.position = frame;
        Ok(())
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Copy the next frame into `buf` and advance.
    ///
    /// Returns the number of bytes written; `0` once the stream is
    /// exhausted.
    pub fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize, AviError> {
        let Some(entry) = self.index.get(self.position).copied() else {
            return Ok(0);
        };
        let size = entry.size as usize;
        if buf.len() < size {
            return Err(AviError::Truncated {
                chunk: "frame buffer".into(),
                needed: entry.size.into(),
                available: buf.len() as u64,
            });
        }
        self.reader.seek(SeekFrom::Start(entry.offset))?;
        self.reader.read_exact(&mut buf[..size])?;
        self.position += 1;
        Ok(size)
    }

    fn entry(&self, frame: usize) -> Result<&FrameEntry, AviError> {
        self.index.get(frame).ok_or(AviError::FrameOutOfRange {
            frame,
            count: self.index.len(),
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// Minimal AVI writer for tests.
    pub(crate) struct AviBuilder {
        pub width: u32,
        pub height: i32,
        pub bit_count: u16,
        pub rate: u32,
        pub scale: u32,
        pub with_index: bool,
        /// `avih` size when it should disagree with `strf`.
        pub main_size: Option<(u32, u32)>,
        pub frames: Vec<Vec<u8>>,
    }

    impl AviBuilder {
        pub(crate) fn new(width: u32, height: i32, bit_count: u16) -> Self {
            Self {
                width,
                height,
                bit_count,
                rate: 25,
                scale: 1,
                with_index: true,
                main_size: None,
                frames: Vec::new(),
            }
        }

        fn chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend_from_slice(id);
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(payload);
            if payload.len() % 2 == 1 {
                out.push(0);
            }
            out
        }

        fn list(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
            let mut payload = kind.to_vec();
            payload.extend_from_slice(body);
            Self::chunk(b"LIST", &payload)
        }

        pub(crate) fn build(&self) -> Vec<u8> {
            let (main_width, main_height) = self
                .main_size
                .unwrap_or((self.width, self.height.unsigned_abs()));
            let mut avih = Vec::new();
            for v in [
                1_000_000 / self.rate.max(1),
                0,
                0,
                if self.with_index { 0x10 } else { 0 },
                self.frames.len() as u32,
                0,
                1,
                0,
                main_width,
                main_height,
                0,
                0,
                0,
                0,
            ] {
                avih.extend_from_slice(&v.to_le_bytes());
            }

            let mut strh = Vec::new();
            strh.extend_from_slice(b"vids");
            strh.extend_from_slice(b"DIB ");
            strh.extend_from_slice(&0u32.to_le_bytes());
            strh.extend_from_slice(&0u16.to_le_bytes());
            strh.extend_from_slice(&0u16.to_le_bytes());
            for v in [0, self.scale, self.rate, 0, self.frames.len() as u32, 0, 0, 0] {
                strh.extend_from_slice(&v.to_le_bytes());
            }

            let mut strf = Vec::new();
            strf.extend_from_slice(&40u32.to_le_bytes());
            strf.extend_from_slice(&(self.width as i32).to_le_bytes());
            strf.extend_from_slice(&self.height.to_le_bytes());
            strf.extend_from_slice(&1u16.to_le_bytes());
            strf.extend_from_slice(&self.bit_count.to_le_bytes());
            strf.extend_from_slice(&[0u8; 24]);

            let mut strl = Self::chunk(b"strh", &strh);
            strl.extend(Self::chunk(b"strf", &strf));
            let mut hdrl = Self::chunk(b"avih", &avih);
            hdrl.extend(Self::list(b"strl", &strl));

            let mut movi_body = Vec::new();
            let mut idx1 = Vec::new();
            for frame in &self.frames {
                let offset = 4 + movi_body.len() as u32;
                movi_body.extend(Self::chunk(b"00db", frame));
                idx1.extend_from_slice(b"00db");
                idx1.extend_from_slice(&0x10u32.to_le_bytes());
                idx1.extend_from_slice(&offset.to_le_bytes());
                idx1.extend_from_slice(&(frame.len() as u32).to_le_bytes());
            }

            let mut body = b"AVI ".to_vec();
            body.extend(Self::list(b"hdrl", &hdrl));
            body.extend(Self::list(b"movi", &movi_body));
            if self.with_index {
                body.extend(Self::chunk(b"idx1", &idx1));
            }
            Self::chunk(b"RIFF", &body)
        }
    }

    fn sample(with_index: bool) -> AviBuilder {
        let mut b = AviBuilder::new(4, 2, 24);
        b.with_index = with_index;
        b.frames = (0..3u8).map(|i| vec![i; 24]).collect();
        b
    }

    #[test]
    fn reads_headers_and_frames() {
        let mut avi = AviReader::new(Cursor::new(sample(true).build())).unwrap();
        assert_eq!(avi.width(), 4);
        assert_eq!(avi.height(), 2);
        assert_eq!(avi.frame_rate(), 25.0);
        assert_eq!(avi.frame_count(), 3);
        assert_eq!(avi.max_frame_size(), 24);
        assert_eq!(avi.pixel_layout(), PixelLayout::Bgr24);
        assert_eq!(avi.compressor(), FourCc(*b"DIB "));
        assert!(avi.is_keyframe(0).unwrap());

        let mut buf = vec![0u8; avi.max_frame_size()];
        for i in 0..3u8 {
            assert_eq!(avi.read_frame(&mut buf).unwrap(), 24);
            assert!(buf.iter().all(|&b| b == i));
        }
        assert_eq!(avi.read_frame(&mut buf).unwrap(), 0);
    }

    #[test]
    fn scans_movi_without_index() {
        let mut avi = AviReader::new(Cursor::new(sample(false).build())).unwrap();
        assert_eq!(avi.frame_count(), 3);
        avi.set_position(2).unwrap();
        let mut buf = vec![0u8; 24];
        assert_eq!(avi.read_frame(&mut buf).unwrap(), 24);
        assert_eq!(buf[0], 2);
        avi.rewind();
        assert_eq!(avi.position(), 0);
    }

    #[test]
    fn small_buffer_is_an_error() {
        let mut avi = AviReader::new(Cursor::new(sample(true).build())).unwrap();
        let mut buf = vec![0u8; 8];
        assert!(avi.read_frame(&mut buf).is_err());
        assert_eq!(avi.position(), 0);
    }

    #[test]
    fn rejects_non_riff() {
        let err = AviReader::new(Cursor::new(b"not an avi at all".to_vec())).err().unwrap();
        assert!(matches!(err, AviError::NotRiff));

        let err = AviReader::new(Cursor::new(Vec::new())).err().unwrap();
        assert!(matches!(err, AviError::NotRiff));
    }

    #[test]
    fn rejects_zero_dimensions() {
        let mut b = AviBuilder::new(0, 1, 32);
        b.frames = vec![vec![0; 4]];
        let err = AviReader::new(Cursor::new(b.build())).err().unwrap();
        assert!(matches!(err, AviError::InvalidChunk(_)));

        let mut b = AviBuilder::new(2, 0, 32);
        b.frames = vec![vec![0; 8]];
        assert!(AviReader::new(Cursor::new(b.build())).is_err());
    }

    #[test]
    fn rejects_oversized_dimensions() {
        let mut b = AviBuilder::new(0x8000_0000, i32::MIN, 32);
        b.frames = vec![vec![0; 4]];
        let err = AviReader::new(Cursor::new(b.build())).err().unwrap();
        assert!(matches!(err, AviError::InvalidChunk(_)));

        let mut b = AviBuilder::new(100_000, 100_000, 32);
        b.frames = vec![vec![0; 4]];
        assert!(AviReader::new(Cursor::new(b.build())).is_err());

        let mut b = AviBuilder::new(MAX_DIMENSION, 1, 32);
        b.frames = vec![vec![0; 4]];
        assert!(AviReader::new(Cursor::new(b.build())).is_ok());
    }

    #[test]
    fn stream_format_size_wins_over_main_header() {
        let mut b = sample(true);
        b.main_size = Some((320, 240));
        let avi = AviReader::new(Cursor::new(b.build())).unwrap();
        assert_eq!((avi.width(), avi.height()), (4, 2));

        // A zero strf size falls back to avih.
        let mut b = AviBuilder::new(0, 0, 24);
        b.main_size = Some((4, 2));
        b.frames = vec![vec![0; 24]];
        let avi = AviReader::new(Cursor::new(b.build())).unwrap();
        assert_eq!(avi.frame_layout().width, 4);
        assert_eq!(avi.frame_layout().height, 2);

        // Both zero is an open failure.
        b.main_size = Some((0, 0));
        assert!(AviReader::new(Cursor::new(b.build())).is_err());
    }

    #[test]
    fn rejects_other_riff_forms() {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(b"WAVE");
        let err = AviReader::new(Cursor::new(data)).err().unwrap();
        assert!(matches!(err, AviError::NotAvi(ref f) if f == "WAVE"));
    }

    #[test]
    fn duration_follows_frame_rate() {
        let avi = AviReader::new(Cursor::new(sample(true).build())).unwrap();
        let millis = avi.duration().as_secs_f64() * 1000.0;
        assert!((millis - 120.0).abs() < 0.001);
    }

    #[test]
    fn out_of_range_position() {
        let mut avi = AviReader::new(Cursor::new(sample(true).build())).unwrap();
        assert!(matches!(
            avi.set_position(9),
            Err(AviError::FrameOutOfRange { frame: 9, count: 3 })
        ));
        assert!(avi.frame_size(3).is_err());
    }
}
