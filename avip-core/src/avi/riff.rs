//! RIFF chunk primitives.
//!
//! Every RIFF chunk is an 8-byte header (`FourCC` id + little-endian
//! `u32` size) followed by `size` payload bytes, padded to an even
//! length. `RIFF` and `LIST` chunks carry a second `FourCC` (the form
//! or list type) at the start of their payload.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::AviError;

// ── FourCc ───────────────────────────────────────────────────────

/// A four-character code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const RIFF: FourCc = FourCc(*b"RIFF");
    pub const LIST: FourCc = FourCc(*b"LIST");
    pub const AVI: FourCc = FourCc(*b"AVI ");
    pub const HDRL: FourCc = FourCc(*b"hdrl");
    pub const AVIH: FourCc = FourCc(*b"avih");
    pub const STRL: FourCc = FourCc(*b"strl");
    pub const STRH: FourCc = FourCc(*b"strh");
    pub const STRF: FourCc = FourCc(*b"strf");
    pub const MOVI: FourCc = FourCc(*b"movi");
    pub const REC: FourCc = FourCc(*b"rec ");
    pub const IDX1: FourCc = FourCc(*b"idx1");
    pub const VIDS: FourCc = FourCc(*b"vids");

    /// Build a code from the little-endian `u32` stored in headers.
    pub const fn from_u32(value: u32) -> Self {
        FourCc(value.to_le_bytes())
    }

    pub const fn as_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// Stream number of a `movi` data chunk id such as `00dc`.
    pub fn stream_number(self) -> Option<u16> {
        let [a, b, _, _] = self.0;
        if a.is_ascii_digit() && b.is_ascii_digit() {
            Some(u16::from(a - b'0') * 10 + u16::from(b - b'0'))
        } else {
            None
        }
    }

    /// `##db` (uncompressed) or `##dc` (compressed) video data chunk.
    pub fn is_video_data(self) -> bool {
        self.stream_number().is_some() && matches!(&self.0[2..], b"db" | b"dc")
    }

    pub fn read<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut code = [0u8; 4];
        reader.read_exact(&mut code)?;
        Ok(FourCc(code))
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc(\"{self}\")")
    }
}

// ── ChunkHeader ──────────────────────────────────────────────────

/// Header of a single chunk, positioned in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: FourCc,
    /// Payload size as declared (excluding the pad byte).
    pub size: u32,
    /// Absolute offset of the first payload byte.
    pub offset: u64,
}

impl ChunkHeader {
    /// Bytes occupied by the header itself.
    pub const LEN: u64 = 8;

    /// Read a header at the reader's current position.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, AviError> {
        let start = reader.stream_position()?;
        let id = FourCc::read(reader)?;
        let size = reader.read_u32::<LittleEndian>()?;
        Ok(Self {
            id,
            size,
            offset: start + Self::LEN,
        })
    }

    /// Absolute offset of the header.
    pub fn start(&self) -> u64 {
        self.offset - Self::LEN
    }

    /// Offset just past this chunk, including the pad byte.
    pub fn end(&self) -> u64 {
        let size = u64::from(self.size);
        self.offset + size + (size & 1)
    }

    /// Whether this is a `LIST` or `RIFF` container chunk.
    pub fn is_list(&self) -> bool {
        self.id == FourCc::LIST || self.id == FourCc::RIFF
    }

    /// Read the whole payload, refusing chunks that run past `limit`.
    pub fn read_payload<R: Read + Seek>(
        &self,
        reader: &mut R,
        limit: u64,
    ) -> Result<Vec<u8>, AviError> {
        let needed = u64::from(self.size);
        let available = limit.saturating_sub(self.offset);
        if needed > available {
            return Err(AviError::Truncated {
                chunk: self.id.to_string(),
                needed,
                available,
            });
        }
        reader.seek(SeekFrom::Start(self.offset))?;
        let mut payload = vec![0u8; self.size as usize];
        reader.read_exact(&mut payload)?;
        Ok(payload)
    }
}

/// Iterate the chunks laid out back to back in `[start, end)`.
///
/// Chunks whose header would cross `end` terminate the walk; chunks
/// whose payload crosses it are still yielded so callers can clamp.
pub struct ChunkWalker {
    next: u64,
    end: u64,
}

impl ChunkWalker {
    pub fn new(start: u64, end: u64) -> Self {
        Self { next: start, end }
    }

    pub fn next_chunk<R: Read + Seek>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<ChunkHeader>, AviError> {
        if self.next + ChunkHeader::LEN > self.end {
            return Ok(None);
        }
        reader.seek(SeekFrom::Start(self.next))?;
        let header = ChunkHeader::read(reader)?;
        self.next = header.end();
        Ok(Some(header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn stream_numbers() {
        assert_eq!(FourCc(*b"00dc").stream_number(), Some(0));
        assert_eq!(FourCc(*b"12wb").stream_number(), Some(12));
        assert_eq!(FourCc::LIST.stream_number(), None);
        assert!(FourCc(*b"01db").is_video_data());
        assert!(!FourCc(*b"01wb").is_video_data());
    }

    #[test]
    fn display_masks_binary() {
        assert_eq!(FourCc(*b"AVI ").to_string(), "AVI ");
        assert_eq!(FourCc([0, b'a', 0xff, b'b']).to_string(), ".a.b");
        assert_eq!(FourCc::from_u32(FourCc::IDX1.as_u32()), FourCc::IDX1);
    }

    #[test]
    fn walker_honours_padding() {
        let mut data = Vec::new();
        data.extend_from_slice(b"JUNK");
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&[1, 2, 3, 0]); // odd size + pad byte
        data.extend_from_slice(b"abcd");
        data.extend_from_slice(&0u32.to_le_bytes());
        let len = data.len() as u64;

        let mut cursor = Cursor::new(data);
        let mut walker = ChunkWalker::new(0, len);
        let first = walker.next_chunk(&mut cursor).unwrap().unwrap();
        assert_eq!(first.id, FourCc(*b"JUNK"));
        assert_eq!(first.end(), 12);
        let second = walker.next_chunk(&mut cursor).unwrap().unwrap();
        assert_eq!(second.id, FourCc(*b"abcd"));
        assert!(walker.next_chunk(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn oversized_payload_is_truncated_error() {
        let mut data = Vec::new();
        data.extend_from_slice(b"strh");
        data.extend_from_slice(&100u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 10]);
        let len = data.len() as u64;

        let mut cursor = Cursor::new(data);
        let header = ChunkHeader::read(&mut cursor).unwrap();
        let err = header.read_payload(&mut cursor, len).unwrap_err();
        assert!(matches!(err, AviError::Truncated { needed: 100, available: 10, .. }));
    }
}
