//! Playback state machine.
//!
//! ```text
//!  Idle ──► SurfaceReady ──► Rendering ──► StreamEnded
//!   ▲            │               │              │
//!   │            ▼               ▼              │
//!   └──────── SurfaceLost ◄──────┘              │
//!   └───────────────────────────────────────────┘
//! ```
//!
//! The state is published over a `tokio::sync::watch` channel so the
//! controlling side and the worker agree on whether frames are flowing.
//! Only real transitions notify subscribers.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::error::PlayerError;

// ── PlaybackState ────────────────────────────────────────────────

/// Lifecycle of one player's frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackState {
    /// No surface, no worker.
    #[default]
    Idle,
    /// A surface exists and the worker is being spawned.
    SurfaceReady,
    /// The worker is producing frames.
    Rendering,
    /// The surface went away; the worker has been told to stop.
    SurfaceLost,
    /// The decoder ran out of frames.
    StreamEnded,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::SurfaceReady => write!(f, "SurfaceReady"),
            Self::Rendering => write!(f, "Rendering"),
            Self::SurfaceLost => write!(f, "SurfaceLost"),
            Self::StreamEnded => write!(f, "StreamEnded"),
        }
    }
}

impl PlaybackState {
    /// The playing flag: true only while frames are being produced.
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Rendering)
    }

    /// Whether a session ended, by surface loss or end of stream.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::SurfaceLost | Self::StreamEnded)
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `SurfaceReady`.
    ///
    /// Valid from: `Idle`, `SurfaceLost`, `StreamEnded`.
    pub fn surface_ready(&mut self) -> Result<(), PlayerError> {
        match self {
            Self::Idle | Self::SurfaceLost | Self::StreamEnded => {
                *self = Self::SurfaceReady;
                Ok(())
            }
            _ => Err(PlayerError::InvalidState(
                "surface ready while a session is active",
            )),
        }
    }

    /// Transition to `Rendering`.
    ///
    /// Valid from: `SurfaceReady`.
    pub fn begin_rendering(&mut self) -> Result<(), PlayerError> {
        match self {
            Self::SurfaceReady => {
                *self = Self::Rendering;
                Ok(())
            }
            _ => Err(PlayerError::InvalidState(
                "cannot render: surface not ready",
            )),
        }
    }

    /// Transition to `SurfaceLost`.
    ///
    /// Valid from: `SurfaceReady`, `Rendering`.
    pub fn surface_lost(&mut self) -> Result<(), PlayerError> {
        match self {
            Self::SurfaceReady | Self::Rendering => {
                *self = Self::SurfaceLost;
                Ok(())
            }
            _ => Err(PlayerError::InvalidState(
                "surface lost without an active session",
            )),
        }
    }

    /// Transition to `StreamEnded`.
    ///
    /// Valid from: `Rendering`.
    pub fn stream_ended(&mut self) -> Result<(), PlayerError> {
        match self {
            Self::Rendering => {
                *self = Self::StreamEnded;
                Ok(())
            }
            _ => Err(PlayerError::InvalidState("stream ended while not rendering")),
        }
    }

    /// Return to `Idle` from any state.
    pub fn reset(&mut self) {
        *self = Self::Idle;
    }
}

// ── StateCell ────────────────────────────────────────────────────

/// Shared, observable [`PlaybackState`].
#[derive(Debug, Clone)]
pub struct StateCell {
    tx: Arc<watch::Sender<PlaybackState>>,
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PlaybackState::Idle);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> PlaybackState {
        *self.tx.borrow()
    }

    pub fn is_playing(&self) -> bool {
        self.get().is_playing()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.tx.subscribe()
    }

    /// Apply `f` atomically; subscribers are notified only if the state
    /// actually changed.
    pub fn transition(
        &self,
        f: impl FnOnce(&mut PlaybackState) -> Result<(), PlayerError>,
    ) -> Result<(), PlayerError> {
        let mut result = Ok(());
        self.tx.send_if_modified(|state| {
            let before = *state;
            let mut next = before;
            result = f(&mut next);
            if result.is_ok() && next != before {
                debug!(from = %before, to = %next, "playback state");
                *state = next;
                true
            } else {
                false
            }
        });
        result
    }

    /// Like [`transition`](Self::transition), but a transition that is
    /// not valid from the current state is silently skipped. Returns
    /// whether the state changed.
    pub fn try_transition(
        &self,
        f: impl FnOnce(&mut PlaybackState) -> Result<(), PlayerError>,
    ) -> bool {
        let before = self.get();
        self.transition(f).is_ok() && self.get() != before
    }

    pub fn reset(&self) {
        let _ = self.transition(|s| {
            s.reset();
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_session_walk() {
        let mut s = PlaybackState::default();
        assert!(!s.is_playing());
        s.surface_ready().unwrap();
        assert!(!s.is_playing());
        s.begin_rendering().unwrap();
        assert!(s.is_playing());
        s.stream_ended().unwrap();
        assert!(s.is_finished());
        assert!(!s.is_playing());
        s.surface_ready().unwrap();
        s.begin_rendering().unwrap();
        s.surface_lost().unwrap();
        assert_eq!(s, PlaybackState::SurfaceLost);
    }

    #[test]
    fn invalid_transitions_are_errors() {
        let mut s = PlaybackState::Idle;
        assert!(s.begin_rendering().is_err());
        assert!(s.stream_ended().is_err());
        assert!(s.surface_lost().is_err());
        assert_eq!(s, PlaybackState::Idle);

        let mut s = PlaybackState::Rendering;
        assert!(s.surface_ready().is_err());
    }

    #[test]
    fn cell_notifies_only_on_change() {
        let cell = StateCell::new();
        let mut rx = cell.subscribe();
        assert!(!rx.has_changed().unwrap());

        cell.transition(PlaybackState::surface_ready).unwrap();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        // A rejected transition leaves the state and subscribers alone.
        assert!(cell.transition(PlaybackState::stream_ended).is_err());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(cell.get(), PlaybackState::SurfaceReady);
    }

    #[test]
    fn try_transition_reports_change() {
        let cell = StateCell::new();
        assert!(cell.try_transition(PlaybackState::surface_ready));
        assert!(cell.try_transition(PlaybackState::begin_rendering));
        assert!(cell.is_playing());
        assert!(cell.try_transition(PlaybackState::stream_ended));
        assert!(!cell.try_transition(PlaybackState::stream_ended));
        assert!(!cell.is_playing());
    }
}
