//! Bit flags carried by AVI headers and index entries.

use bitflags::bitflags;

bitflags! {
    /// `dwFlags` of the `avih` main header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MainHeaderFlags: u32 {
        /// The file has an `idx1` index.
        const HAS_INDEX = 0x0000_0010;
        /// The index order must be used instead of the `movi` order.
        const MUST_USE_INDEX = 0x0000_0020;
        /// Audio and video chunks are interleaved.
        const IS_INTERLEAVED = 0x0000_0100;
        const TRUST_CK_TYPE = 0x0000_0800;
        const WAS_CAPTURE_FILE = 0x0001_0000;
        const COPYRIGHTED = 0x0002_0000;
    }
}

bitflags! {
    /// `dwFlags` of an `idx1` entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IndexFlags: u32 {
        /// The entry points at a `LIST` chunk (`rec `).
        const LIST = 0x0000_0001;
        /// The frame is a key frame.
        const KEYFRAME = 0x0000_0010;
        /// The frame does not advance the stream time.
        const NO_TIME = 0x0000_0100;
    }
}
