//! Video frame index.
//!
//! Built from the legacy `idx1` chunk when present, otherwise by
//! walking the `movi` list.

use std::io::{Cursor, Read, Seek};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, warn};

use crate::avi::riff::{ChunkWalker, FourCc};
use crate::error::AviError;
use crate::flags::IndexFlags;

/// Location of one video frame's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEntry {
    /// Absolute offset of the first payload byte.
    pub offset: u64,
    pub size: u32,
    pub flags: IndexFlags,
}

impl FrameEntry {
    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(IndexFlags::KEYFRAME)
    }
}

/// Ordered frame table for the selected video stream.
#[derive(Debug, Clone, Default)]
pub struct FrameIndex {
    entries: Vec<FrameEntry>,
}

/// Size of one `idx1` record.
const IDX1_ENTRY_LEN: usize = 16;

impl FrameIndex {
    /// Build from an `idx1` payload.
    ///
    /// `movi_list` is the absolute offset of the `movi` list type code.
    /// Record offsets are relative to it in most files and absolute in
    /// some; the first video record decides which.
    pub fn from_idx1(
        payload: &[u8],
        movi_list: u64,
        stream: u16,
        file_len: u64,
    ) -> Result<Self, AviError> {
        let mut records = Vec::with_capacity(payload.len() / IDX1_ENTRY_LEN);
        let mut r = Cursor::new(payload);
        for _ in 0..payload.len() / IDX1_ENTRY_LEN {
            let id = FourCc::from_u32(r.read_u32::<LittleEndian>()?);
            let flags = IndexFlags::from_bits_truncate(r.read_u32::<LittleEndian>()?);
            let offset = u64::from(r.read_u32::<LittleEndian>()?);
            let size = r.read_u32::<LittleEndian>()?;
            if id.is_video_data() && id.stream_number() == Some(stream) {
                records.push((offset, size, flags));
            }
        }

        let base = match records.first() {
            Some(&(first, _, _)) if first < movi_list => movi_list,
            _ => 0,
        };
        debug!(
            records = records.len(),
            relative = base != 0,
            "idx1 index loaded"
        );

        let mut entries = Vec::with_capacity(records.len());
        for (offset, size, flags) in records {
            // Offsets point at the chunk header, not the payload.
            let payload_start = base + offset + 8;
            let end = payload_start + u64::from(size);
            if end > file_len {
                return Err(AviError::Truncated {
                    chunk: "idx1 entry".into(),
                    needed: end,
                    available: file_len,
                });
            }
            entries.push(FrameEntry {
                offset: payload_start,
                size,
                flags,
            });
        }
        Ok(Self { entries })
    }

    /// Build by walking `[start, end)` of the `movi` list, descending
    /// into `rec ` lists. Every frame is treated as a key frame.
    pub fn scan_movi<R: Read + Seek>(
        reader: &mut R,
        start: u64,
        end: u64,
        stream: u16,
    ) -> Result<Self, AviError> {
        let mut entries = Vec::new();
        let mut pending = vec![ChunkWalker::new(start, end)];

        while let Some(walker) = pending.last_mut() {
            let Some(chunk) = walker.next_chunk(reader)? else {
                pending.pop();
                continue;
            };
            if chunk.id == FourCc::LIST {
                let list_type = FourCc::read(reader)?;
                if list_type == FourCc::REC {
                    let list_end = chunk.end().min(end);
                    pending.push(ChunkWalker::new(chunk.offset + 4, list_end));
                }
                continue;
            }
            if chunk.id.is_video_data() && chunk.id.stream_number() == Some(stream) {
                if chunk.offset + u64::from(chunk.size) > end {
                    warn!(offset = chunk.offset, "movi ends inside a frame; dropping it");
                    break;
                }
                entries.push(FrameEntry {
                    offset: chunk.offset,
                    size: chunk.size,
                    flags: IndexFlags::KEYFRAME,
                });
            }
        }

        debug!(frames = entries.len(), "movi scanned for frames");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, frame: usize) -> Option<&FrameEntry> {
        self.entries.get(frame)
    }

    /// Largest frame payload in bytes.
    pub fn max_frame_size(&self) -> usize {
        self.entries.iter().map(|e| e.size as usize).max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &[u8; 4], flags: u32, offset: u32, size: u32) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(id);
        b.extend_from_slice(&flags.to_le_bytes());
        b.extend_from_slice(&offset.to_le_bytes());
        b.extend_from_slice(&size.to_le_bytes());
        b
    }

    #[test]
    fn relative_offsets_are_rebased_on_movi() {
        let mut payload = record(b"00dc", 0x10, 4, 100);
        payload.extend(record(b"01wb", 0x00, 112, 20));
        payload.extend(record(b"00dc", 0x00, 140, 100));

        let index = FrameIndex::from_idx1(&payload, 1000, 0, 10_000).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(0).unwrap().offset, 1000 + 4 + 8);
        assert!(index.get(0).unwrap().is_keyframe());
        assert!(!index.get(1).unwrap().is_keyframe());
        assert_eq!(index.max_frame_size(), 100);
    }

    #[test]
    fn absolute_offsets_are_kept() {
        let payload = record(b"00db", 0x10, 1004, 50);
        let index = FrameIndex::from_idx1(&payload, 1000, 0, 10_000).unwrap();
        assert_eq!(index.get(0).unwrap().offset, 1012);
    }

    #[test]
    fn entries_past_eof_are_rejected() {
        let payload = record(b"00db", 0x10, 4, 5000);
        let err = FrameIndex::from_idx1(&payload, 1000, 0, 2000).unwrap_err();
        assert!(matches!(err, AviError::Truncated { .. }));
    }

    #[test]
    fn other_streams_are_ignored() {
        let payload = record(b"01dc", 0x10, 4, 50);
        let index = FrameIndex::from_idx1(&payload, 1000, 0, 10_000).unwrap();
        assert!(index.is_empty());
    }
}
