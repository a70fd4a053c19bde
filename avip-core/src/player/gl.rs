//! Hardware playback: a pacing loop issues render requests, a render
//! task answers them.
//!
//! ```text
//!  pacer ──RenderRequest──► render task ──► FrameRenderer::render_frame
//!    ▲        (queued)           │
//!    └──── surface token ◄───────┘ cancelled on end of stream
//! ```
//!
//! The render task stands in for the GL thread: it owns the renderer
//! instance for the lifetime of one surface and hands it back when the
//! surface goes away. Requests are queued in order; none are dropped or
//! merged.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::decoder::{DecoderFactory, DecoderHandle, VideoDecoder};
use crate::error::PlayerError;
use crate::pacing::FramePacer;
use crate::player::texture::TextureRenderer;
use crate::player::{Player, PlayerOptions, PlayerSession, RenderMode};
use crate::state::{PlaybackState, StateCell};
use crate::surface::{FrameSink, SharedSink, SurfaceEvent};
use crate::task::{TaskEvent, WorkerTask};

// ── Renderer traits ──────────────────────────────────────────────

/// The draw callback side of the hardware path.
pub trait FrameRenderer: Send + 'static {
    /// Prepare GPU-side resources for a freshly created surface.
    fn init_surface(&mut self) -> Result<(), PlayerError>;

    /// Read, upload and draw the next frame. `false` means no frame was
    /// read: the stream has ended.
    fn render_frame(&mut self) -> bool;
}

/// Creates renderer instances from an open decoder handle.
pub trait RendererFactory<D: VideoDecoder>: Send + 'static {
    type Renderer: FrameRenderer;

    fn create(&self, handle: &DecoderHandle<D>) -> Result<Self::Renderer, PlayerError>;

    fn free(&self, renderer: Self::Renderer) {
        drop(renderer);
    }
}

impl<D: VideoDecoder, S: FrameSink> RendererFactory<D> for SharedSink<S> {
    type Renderer = TextureRenderer<D, S>;

    fn create(&self, handle: &DecoderHandle<D>) -> Result<Self::Renderer, PlayerError> {
        TextureRenderer::init(handle, self.clone())
    }

    fn free(&self, renderer: Self::Renderer) {
        renderer.free();
    }
}

/// One draw, asked for by the pacer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    /// 1-based position within the surface session.
    pub seq: u64,
}

// ── Loops ────────────────────────────────────────────────────────

async fn render_loop<R: FrameRenderer>(
    mut renderer: R,
    mut requests: mpsc::UnboundedReceiver<RenderRequest>,
    state: StateCell,
    surface: CancellationToken,
    cancel: CancellationToken,
) -> R {
    loop {
        let request = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            request = requests.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };
        trace!(seq = request.seq, "render request");
        if !renderer.render_frame() {
            info!(requests = request.seq, "end of stream");
            state.try_transition(PlaybackState::stream_ended);
            surface.cancel();
            break;
        }
    }
    renderer
}

async fn pace_loop(
    requests: mpsc::UnboundedSender<RenderRequest>,
    pacer: FramePacer,
    options: PlayerOptions,
    issued: Arc<AtomicU64>,
    state: StateCell,
    cancel: CancellationToken,
) -> TaskEvent {
    debug!(delay = ?pacer.delay(), "pacing loop started");
    let mut seq = 0u64;
    while !cancel.is_cancelled() {
        seq += 1;
        if requests.send(RenderRequest { seq }).is_err() {
            debug!("render task gone");
            return TaskEvent::Finished;
        }
        issued.fetch_add(1, Ordering::Relaxed);

        if options.limit_reached(seq) {
            info!(frames = seq, "frame limit reached");
            state.try_transition(PlaybackState::stream_ended);
            return TaskEvent::Finished;
        }
        if !pacer.pause(&cancel).await {
            break;
        }
    }
    debug!(requests = seq, "pacing loop stopped");
    TaskEvent::Cancelled
}

// ── GlPlayer ─────────────────────────────────────────────────────

/// The hardware playback path.
pub struct GlPlayer<F, R>
where
    F: DecoderFactory,
    R: RendererFactory<F::Decoder>,
{
    session: PlayerSession<F>,
    renderers: R,
    renderer: Option<R::Renderer>,
    render_task: Option<WorkerTask<R::Renderer>>,
    issued: Arc<AtomicU64>,
}

impl<F, S> GlPlayer<F, SharedSink<S>>
where
    F: DecoderFactory,
    S: FrameSink,
{
    /// A player drawing [`TextureRenderer`] output into `sink`.
    pub fn with_sink(factory: F, sink: S, options: PlayerOptions) -> Self {
        Self::new(factory, SharedSink::new(sink), options)
    }
}

impl<F, R> GlPlayer<F, R>
where
    F: DecoderFactory,
    R: RendererFactory<F::Decoder>,
{
    pub fn new(factory: F, renderers: R, options: PlayerOptions) -> Self {
        Self {
            session: PlayerSession::new(factory, options),
            renderers,
            renderer: None,
            render_task: None,
            issued: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn session(&self) -> &PlayerSession<F> {
        &self.session
    }

    pub fn renderers(&self) -> &R {
        &self.renderers
    }

    /// Whether a renderer instance exists (idle or inside the render task).
    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some() || self.render_task.is_some()
    }

    /// Render requests issued since the player was built.
    pub fn render_requests(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }

    fn surface_created(&mut self) -> Result<(), PlayerError> {
        let Some(mut renderer) = self.renderer.take() else {
            warn!("surface created before start; ignoring");
            return Ok(());
        };
        let pacer = self.session.pacer()?;
        if let Err(e) = renderer.init_surface() {
            self.renderer = Some(renderer);
            return Err(e);
        }
        let surface = match self.session.begin_surface() {
            Ok(token) => token,
            Err(e) => {
                self.renderer = Some(renderer);
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let state = self.session.state().clone();
        let options = *self.session.options();
        let issued = Arc::clone(&self.issued);
        let render_task = &mut self.render_task;

        self.session.begin_rendering(move |token| {
            let render_state = state.clone();
            *render_task = Some(WorkerTask::spawn("render", token, move |cancel| {
                render_loop(renderer, rx, render_state, surface, cancel)
            }));
            WorkerTask::spawn("pacer", token, move |cancel| {
                pace_loop(tx, pacer, options, issued, state, cancel)
            })
        })
    }

    /// End the current surface and take the renderer back from the
    /// render task.
    async fn surface_destroyed(&mut self) -> Result<(), PlayerError> {
        let joined = self.session.end_surface().await;
        if let Some(task) = self.render_task.take() {
            match task.join().await {
                Ok(renderer) => self.renderer = Some(renderer),
                Err(e) => warn!(error = %e, "render task lost its renderer"),
            }
        }
        joined.map(|_| ())
    }
}

#[async_trait]
impl<F, R> Player for GlPlayer<F, R>
where
    F: DecoderFactory,
    R: RendererFactory<F::Decoder>,
{
    fn mode(&self) -> RenderMode {
        RenderMode::Gl
    }

    fn state(&self) -> PlaybackState {
        self.session.state().get()
    }

    fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.session.state().subscribe()
    }

    async fn start(&mut self, path: &Path) -> Result<(), PlayerError> {
        let handle = self.session.open(path)?;
        match self.renderers.create(handle) {
            Ok(renderer) => {
                self.renderer = Some(renderer);
                Ok(())
            }
            Err(e) => {
                self.session.close();
                Err(e)
            }
        }
    }

    async fn on_surface_event(&mut self, event: SurfaceEvent) -> Result<(), PlayerError> {
        debug!(%event, "surface event");
        match event {
            SurfaceEvent::Created => self.surface_created(),
            SurfaceEvent::Changed { .. } => Ok(()),
            SurfaceEvent::Destroyed => self.surface_destroyed().await,
        }
    }

    async fn stop(&mut self) -> Result<(), PlayerError> {
        let joined = self.surface_destroyed().await;
        if let Some(renderer) = self.renderer.take() {
            self.renderers.free(renderer);
        }
        let closed = self.session.shutdown().await;
        joined.and(closed)
    }
}
