//! Software playback: convert each frame into a reusable RGBA bitmap and
//! present it, once per paced tick.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::convert::frame_to_rgba;
use crate::decoder::{DecoderFactory, SharedDecoder, StreamInfo, VideoDecoder};
use crate::error::PlayerError;
use crate::pacing::FramePacer;
use crate::player::{Player, PlayerOptions, PlayerSession, RenderMode};
use crate::state::{PlaybackState, StateCell};
use crate::surface::{FrameSink, SharedSink, SurfaceEvent};
use crate::task::{TaskEvent, WorkerTask};
use crate::types::{FrameLayout, PixelBuffer};

// ── Blitter ──────────────────────────────────────────────────────

/// Reads raw frames and converts them into a [`PixelBuffer`].
pub struct Blitter {
    layout: FrameLayout,
    scratch: Vec<u8>,
}

impl Blitter {
    pub fn new(info: &StreamInfo) -> Self {
        let len = info
            .layout
            .frame_bytes()
            .unwrap_or(0)
            .max(info.max_frame_size);
        Self {
            layout: info.layout,
            scratch: vec![0u8; len],
        }
    }

    /// Read the next frame into `buffer`.
    ///
    /// Returns `false` at end of stream, on a read error, or when the
    /// frame cannot be converted. In every such case `buffer` keeps the
    /// previous image.
    pub fn render_frame<D: VideoDecoder>(
        &mut self,
        decoder: &SharedDecoder<D>,
        buffer: &mut PixelBuffer,
    ) -> bool {
        let n = match decoder.read_frame(&mut self.scratch) {
            Ok(0) => return false,
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "frame read failed");
                return false;
            }
        };
        match frame_to_rgba(&self.layout, &self.scratch[..n], buffer) {
            Ok(()) => true,
            Err(e) => {
                trace!(error = %e, "frame not converted");
                false
            }
        }
    }
}

// ── Blit loop ────────────────────────────────────────────────────

async fn blit_loop<D, S>(
    decoder: SharedDecoder<D>,
    sink: SharedSink<S>,
    state: StateCell,
    pacer: FramePacer,
    options: PlayerOptions,
    cancel: CancellationToken,
) -> TaskEvent
where
    D: VideoDecoder,
    S: FrameSink,
{
    let info = decoder.info();
    let mut buffer = match PixelBuffer::try_new(info.width, info.height) {
        Ok(buffer) => buffer,
        Err(e) => {
            warn!(error = %e, "cannot allocate the frame bitmap");
            state.try_transition(PlaybackState::stream_ended);
            return TaskEvent::Finished;
        }
    };
    let mut blitter = Blitter::new(&info);
    let mut frames = 0u64;
    debug!(
        width = info.width,
        height = info.height,
        delay = ?pacer.delay(),
        "blit loop started"
    );

    while !cancel.is_cancelled() {
        // A failed read presents the previous image again.
        if !blitter.render_frame(&decoder, &mut buffer) {
            trace!(frame = frames, "no new frame");
        }
        if let Err(e) = sink.present(&buffer) {
            warn!(error = %e, "present failed");
        }
        frames += 1;

        if options.limit_reached(frames) {
            info!(frames, "frame limit reached");
            state.try_transition(PlaybackState::stream_ended);
            return TaskEvent::Finished;
        }
        if !pacer.pause(&cancel).await {
            break;
        }
    }
    debug!(frames, "blit loop stopped");
    TaskEvent::Cancelled
}

// ── BitmapPlayer ─────────────────────────────────────────────────

/// The software playback path.
pub struct BitmapPlayer<F: DecoderFactory, S: FrameSink> {
    session: PlayerSession<F>,
    sink: SharedSink<S>,
}

impl<F: DecoderFactory, S: FrameSink> BitmapPlayer<F, S> {
    pub fn new(factory: F, sink: S, options: PlayerOptions) -> Self {
        Self {
            session: PlayerSession::new(factory, options),
            sink: SharedSink::new(sink),
        }
    }

    pub fn session(&self) -> &PlayerSession<F> {
        &self.session
    }

    pub fn sink(&self) -> &SharedSink<S> {
        &self.sink
    }

    fn surface_created(&mut self) -> Result<(), PlayerError> {
        let (decoder, pacer) = match self.session.decoder() {
            Some(handle) => (handle.share(), self.session.pacer()?),
            None => {
                warn!("surface created before start; ignoring");
                return Ok(());
            }
        };
        self.session.begin_surface()?;
        let sink = self.sink.clone();
        let state = self.session.state().clone();
        let options = *self.session.options();

        self.session.begin_rendering(move |surface| {
            WorkerTask::spawn("blit", surface, move |cancel| {
                blit_loop(decoder, sink, state, pacer, options, cancel)
            })
        })
    }
}

#[async_trait]
impl<F, S> Player for BitmapPlayer<F, S>
where
    F: DecoderFactory,
    S: FrameSink,
{
    fn mode(&self) -> RenderMode {
        RenderMode::Bitmap
    }

    fn state(&self) -> PlaybackState {
        self.session.state().get()
    }

    fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.session.state().subscribe()
    }

    async fn start(&mut self, path: &Path) -> Result<(), PlayerError> {
        self.session.open(path)?;
        Ok(())
    }

    async fn on_surface_event(&mut self, event: SurfaceEvent) -> Result<(), PlayerError> {
        debug!(%event, "surface event");
        match event {
            SurfaceEvent::Created => self.surface_created(),
            SurfaceEvent::Changed { width, height } => self.sink.resize(width, height),
            SurfaceEvent::Destroyed => self.session.end_surface().await.map(|_| ()),
        }
    }

    async fn stop(&mut self) -> Result<(), PlayerError> {
        self.session.shutdown().await
    }
}
