//! Output surfaces.
//!
//! A surface announces its lifecycle through [`SurfaceEvent`]s and
//! receives finished RGBA frames through [`FrameSink`]. Players hold the
//! sink behind a [`SharedSink`] so each playback session's worker can
//! present to it.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::PlayerError;
use crate::types::PixelBuffer;

/// Lifecycle notifications from the display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The surface can be drawn to.
    Created,
    /// The surface was resized.
    Changed { width: u32, height: u32 },
    /// The surface is gone; nothing may be drawn to it any more.
    Destroyed,
}

impl std::fmt::Display for SurfaceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Changed { width, height } => write!(f, "Changed({width}x{height})"),
            Self::Destroyed => write!(f, "Destroyed"),
        }
    }
}

/// Anything that can display a finished frame.
pub trait FrameSink: Send + 'static {
    /// Display `frame`. Called once per paced tick.
    fn present(&mut self, frame: &PixelBuffer) -> Result<(), PlayerError>;

    /// The surface changed size.
    fn resize(&mut self, _width: u32, _height: u32) -> Result<(), PlayerError> {
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn present(&mut self, frame: &PixelBuffer) -> Result<(), PlayerError> {
        (**self).present(frame)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), PlayerError> {
        (**self).resize(width, height)
    }
}

// ── SharedSink ───────────────────────────────────────────────────

/// A [`FrameSink`] shared between a player and its workers.
pub struct SharedSink<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedSink<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: FrameSink> SharedSink<S> {
    pub fn new(sink: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn present(&self, frame: &PixelBuffer) -> Result<(), PlayerError> {
        self.lock().present(frame)
    }

    pub fn resize(&self, width: u32, height: u32) -> Result<(), PlayerError> {
        self.lock().resize(width, height)
    }

    /// Run `f` with exclusive access to the sink.
    pub fn with<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        f(&mut self.lock())
    }
}
