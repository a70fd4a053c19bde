//! # avip-core
//!
//! Core library for the avip AVI player.
//!
//! This crate contains:
//! - **Container**: `AviReader` / `AviFile`: RIFF/AVI parsing, frame index, raw frame reads
//! - **Decoder**: `DecoderHandle`, `VideoDecoder`, `DecoderFactory`: the owned decoder resource
//! - **Conversion**: DIB (RGB555/565, BGR24, BGRX32) to RGBA `PixelBuffer`
//! - **Pacing**: `FramePacer`: fixed inter-frame delay from the stream frame rate
//! - **State**: `PlaybackState` published over a watch channel
//! - **Players**: `BitmapPlayer` (software) and `GlPlayer` (texture) behind the `Player` trait
//! - **Error**: `AviError`, `PlayerError`: typed, `thiserror`-based error hierarchy

pub mod avi;
pub mod convert;
pub mod decoder;
pub mod error;
pub mod flags;
pub mod pacing;
pub mod player;
pub mod state;
pub mod surface;
pub mod task;
pub mod types;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use avi::{AviFile, AviReader, FourCc, MAX_DIMENSION};
pub use decoder::{
    AviFactory, DecoderFactory, DecoderHandle, SharedDecoder, StreamInfo, VideoDecoder,
};
pub use error::{AviError, PlayerError};
pub use flags::{IndexFlags, MainHeaderFlags};
pub use pacing::{DEFAULT_FRAME_RATE, FramePacer};
pub use player::{
    BitmapPlayer, Blitter, CropRect, FrameRenderer, GlPlayer, Player, PlayerOptions,
    PlayerSession, RenderMode, RendererFactory, Texture, TextureRenderer,
};
pub use state::{PlaybackState, StateCell};
pub use surface::{FrameSink, SharedSink, SurfaceEvent};
pub use task::{TaskEvent, WorkerTask};
pub use types::{FrameLayout, PixelBuffer, PixelLayout};
