//! Players: the playback shell around a decoder handle.
//!
//! | Variant                | Worker(s)                        | Frame path                         |
//! |------------------------|----------------------------------|------------------------------------|
//! | [`BitmapPlayer`]       | pacing + blit loop               | decoder → RGBA buffer → sink       |
//! | [`GlPlayer`]           | pacing loop + render task        | decoder → texture → crop → sink    |
//!
//! Both variants compose a [`PlayerSession`], which owns the decoder
//! handle, the published [`PlaybackState`], and the current worker.
//! A player's life is always:
//!
//! ```text
//! start(path) ─► Created ─► [frames] ─► Destroyed ─► ... ─► stop()
//! ```
//!
//! The decoder is opened by `start` and closed by `stop`, after every
//! worker has been joined.

pub mod bitmap;
pub mod gl;
pub mod texture;

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::decoder::{DecoderFactory, DecoderHandle};
use crate::error::PlayerError;
use crate::pacing::{DEFAULT_FRAME_RATE, FramePacer};
use crate::state::{PlaybackState, StateCell};
use crate::surface::SurfaceEvent;
use crate::task::{TaskEvent, WorkerTask};

pub use bitmap::{BitmapPlayer, Blitter};
pub use gl::{FrameRenderer, GlPlayer, RendererFactory};
pub use texture::{CropRect, Texture, TextureRenderer};

// ── RenderMode ───────────────────────────────────────────────────

/// Which playback path to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Software path: convert into a bitmap and blit it.
    #[default]
    Bitmap,
    /// Hardware path: upload into a texture and draw it.
    Gl,
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bitmap => write!(f, "bitmap"),
            Self::Gl => write!(f, "gl"),
        }
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bitmap" | "software" => Ok(Self::Bitmap),
            "gl" | "opengl" | "texture" => Ok(Self::Gl),
            other => Err(format!("unknown render mode: {other:?} (expected bitmap or gl)")),
        }
    }
}

// ── PlayerOptions ────────────────────────────────────────────────

/// Knobs shared by both player variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerOptions {
    /// Frame rate used when the stream reports an unusable one.
    pub default_frame_rate: f64,
    /// Stop each session after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            default_frame_rate: DEFAULT_FRAME_RATE,
            max_frames: None,
        }
    }
}

impl PlayerOptions {
    /// Whether `frames` reached the configured limit.
    pub(crate) fn limit_reached(&self, frames: u64) -> bool {
        self.max_frames.is_some_and(|max| frames >= max)
    }
}

// ── Player ───────────────────────────────────────────────────────

/// The playback shell both variants implement.
#[async_trait]
pub trait Player: Send {
    fn mode(&self) -> RenderMode;

    /// Current state of the frame loop.
    fn state(&self) -> PlaybackState;

    /// Observe state transitions.
    fn subscribe(&self) -> watch::Receiver<PlaybackState>;

    fn is_playing(&self) -> bool {
        self.state().is_playing()
    }

    /// Open the decoder handle for `path`. On failure nothing is started.
    async fn start(&mut self, path: &Path) -> Result<(), PlayerError>;

    /// React to the surface lifecycle.
    async fn on_surface_event(&mut self, event: SurfaceEvent) -> Result<(), PlayerError>;

    /// Stop any running worker and close the decoder handle.
    async fn stop(&mut self) -> Result<(), PlayerError>;
}

// ── PlayerSession ────────────────────────────────────────────────

/// State both player variants share: the decoder handle, the published
/// playback state, and the paced worker of the current surface.
pub struct PlayerSession<F: DecoderFactory> {
    factory: F,
    options: PlayerOptions,
    decoder: Option<DecoderHandle<F::Decoder>>,
    state: StateCell,
    root: CancellationToken,
    surface: Option<CancellationToken>,
    worker: Option<WorkerTask>,
}

impl<F: DecoderFactory> PlayerSession<F> {
    pub fn new(factory: F, options: PlayerOptions) -> Self {
        Self {
            factory,
            options,
            decoder: None,
            state: StateCell::new(),
            root: CancellationToken::new(),
            surface: None,
            worker: None,
        }
    }

    pub fn options(&self) -> &PlayerOptions {
        &self.options
    }

    pub fn state(&self) -> &StateCell {
        &self.state
    }

    pub fn decoder(&self) -> Option<&DecoderHandle<F::Decoder>> {
        self.decoder.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.decoder.is_some()
    }

    /// Whether a surface session (and so a worker) is active.
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Open the decoder handle.
    pub fn open(&mut self, path: &Path) -> Result<&DecoderHandle<F::Decoder>, PlayerError> {
        if self.decoder.is_some() {
            return Err(PlayerError::InvalidState("player already started"));
        }
        let handle = DecoderHandle::open(&self.factory, path)?;
        info!(
            path = %path.display(),
            width = handle.width(),
            height = handle.height(),
            fps = handle.frame_rate(),
            "playback opened"
        );
        Ok(&*self.decoder.insert(handle))
    }

    /// Close the decoder handle, if open. Any worker must be stopped first.
    pub fn close(&mut self) -> bool {
        match self.decoder.take() {
            Some(handle) => {
                debug_assert!(self.worker.is_none(), "decoder closed under a live worker");
                handle.close();
                true
            }
            None => false,
        }
    }

    /// The pacer for the open stream; its delay is fixed for the session.
    pub fn pacer(&self) -> Result<FramePacer, PlayerError> {
        let handle = self
            .decoder
            .as_ref()
            .ok_or(PlayerError::InvalidState("no decoder open"))?;
        let pacer = FramePacer::with_fallback(handle.frame_rate(), self.options.default_frame_rate);
        debug!(fps = pacer.frame_rate(), delay = ?pacer.delay(), "frame pacing");
        Ok(pacer)
    }

    /// Enter `SurfaceReady` and hand out the token for this surface.
    pub fn begin_surface(&mut self) -> Result<CancellationToken, PlayerError> {
        if self.decoder.is_none() {
            return Err(PlayerError::InvalidState("surface created before start"));
        }
        self.state.transition(PlaybackState::surface_ready)?;
        let token = self.root.child_token();
        self.surface = Some(token.clone());
        Ok(token)
    }

    /// Enter `Rendering`, then spawn the worker with `spawn` under the
    /// current surface's token.
    pub fn begin_rendering(
        &mut self,
        spawn: impl FnOnce(&CancellationToken) -> WorkerTask,
    ) -> Result<(), PlayerError> {
        let token = self
            .surface
            .clone()
            .ok_or(PlayerError::InvalidState("no surface"))?;
        self.state.transition(PlaybackState::begin_rendering)?;
        self.worker = Some(spawn(&token));
        Ok(())
    }

    /// Leave the current surface: publish `SurfaceLost` (unless the stream
    /// already ended), cancel, and join the worker.
    pub async fn end_surface(&mut self) -> Result<Option<TaskEvent>, PlayerError> {
        let Some(token) = self.surface.take() else {
            return Ok(None);
        };
        self.state.try_transition(PlaybackState::surface_lost);
        token.cancel();
        match self.worker.take() {
            Some(worker) => worker.join().await.map(Some),
            None => Ok(None),
        }
    }

    /// Tear everything down: end the surface, close the decoder, and
    /// return to `Idle`.
    pub async fn shutdown(&mut self) -> Result<(), PlayerError> {
        let joined = self.end_surface().await;
        self.close();
        self.state.reset();
        joined.map(|_| ())
    }
}

impl<F: DecoderFactory> Drop for PlayerSession<F> {
    fn drop(&mut self) {
        if self.surface.is_some() {
            warn!("player dropped with an active surface; cancelling worker");
        }
        self.root.cancel();
    }
}
