//! # avip-player: command-line AVI player
//!
//! Picks a local AVI file and a render mode, starts the matching
//! player from `avip-core`, and presents frames to an output surface
//! until the stream ends or the user interrupts.

pub mod config;
pub mod launcher;
pub mod surfaces;

pub use config::PlayerConfig;
pub use launcher::{Launcher, build_player, resolve_media_path};
pub use surfaces::{NullSurface, PpmDumpSurface, SurfaceKind, build_surface};
