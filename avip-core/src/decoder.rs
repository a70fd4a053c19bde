//! Decoder handle: the owned resource behind every player.
//!
//! A [`DecoderHandle`] is created by opening a path through a
//! [`DecoderFactory`] and released exactly once, either by
//! [`DecoderHandle::close`] or by dropping it. Workers reach the decoder
//! through a [`SharedDecoder`], which keeps the underlying stream alive
//! until the last worker is gone; players join their workers before
//! closing, so the handle's release is the decoder's release.

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::avi::{AviFile, AviReader};
use crate::error::PlayerError;
use crate::types::FrameLayout;

// ── VideoDecoder ─────────────────────────────────────────────────

/// A stream of raw video frames.
pub trait VideoDecoder: Send + 'static {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Average frames per second as reported by the stream.
    fn frame_rate(&self) -> f64;

    /// Geometry and pixel layout of the raw frames.
    fn frame_layout(&self) -> FrameLayout;

    /// Upper bound on the size of a single raw frame, in bytes.
    fn max_frame_size(&self) -> usize;

    /// Total frames, when known up front.
    fn frame_count(&self) -> Option<usize> {
        None
    }

    /// Copy the next frame into `buf`; `Ok(0)` at end of stream.
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize, PlayerError>;
}

impl<R> VideoDecoder for AviReader<R>
where
    R: Read + Seek + Send + 'static,
{
    fn width(&self) -> u32 {
        AviReader::width(self)
    }

    fn height(&self) -> u32 {
        AviReader::height(self)
    }

    fn frame_rate(&self) -> f64 {
        AviReader::frame_rate(self)
    }

    fn frame_layout(&self) -> FrameLayout {
        AviReader::frame_layout(self)
    }

    fn max_frame_size(&self) -> usize {
        AviReader::max_frame_size(self)
    }

    fn frame_count(&self) -> Option<usize> {
        Some(AviReader::frame_count(self))
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize, PlayerError> {
        Ok(AviReader::read_frame(self, buf)?)
    }
}

// ── DecoderFactory ───────────────────────────────────────────────

/// Opens decoders by path.
pub trait DecoderFactory: Send + Sync + 'static {
    type Decoder: VideoDecoder;

    /// Open `path`; every failure is reported as [`PlayerError::Open`].
    fn open(&self, path: &Path) -> Result<Self::Decoder, PlayerError>;
}

/// Opens AVI files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct AviFactory;

impl DecoderFactory for AviFactory {
    type Decoder = AviFile;

    fn open(&self, path: &Path) -> Result<AviFile, PlayerError> {
        AviFile::open(path).map_err(|e| PlayerError::open(path, e))
    }
}

// ── StreamInfo ───────────────────────────────────────────────────

/// Snapshot of the stream properties queried at session start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub layout: FrameLayout,
    pub max_frame_size: usize,
}

// ── SharedDecoder ────────────────────────────────────────────────

/// Worker-side access to an open decoder.
pub struct SharedDecoder<D> {
    inner: Arc<Mutex<D>>,
}

impl<D> Clone for SharedDecoder<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: VideoDecoder> SharedDecoder<D> {
    fn lock(&self) -> MutexGuard<'_, D> {
        // A panicked worker cannot leave a decoder half-updated in a way
        // the next read does not recover from, so poisoning is ignored.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` with exclusive access to the decoder.
    pub fn with<T>(&self, f: impl FnOnce(&mut D) -> T) -> T {
        f(&mut self.lock())
    }

    pub fn info(&self) -> StreamInfo {
        let d = self.lock();
        StreamInfo {
            width: d.width(),
            height: d.height(),
            frame_rate: d.frame_rate(),
            layout: d.frame_layout(),
            max_frame_size: d.max_frame_size(),
        }
    }

    pub fn read_frame(&self, buf: &mut [u8]) -> Result<usize, PlayerError> {
        self.lock().read_frame(buf)
    }
}

// ── DecoderHandle ────────────────────────────────────────────────

/// Owned, single-release decoder resource.
pub struct DecoderHandle<D: VideoDecoder> {
    shared: SharedDecoder<D>,
    path: PathBuf,
}

impl<D: VideoDecoder> DecoderHandle<D> {
    /// Open `path` with `factory`.
    pub fn open<F>(factory: &F, path: impl AsRef<Path>) -> Result<Self, PlayerError>
    where
        F: DecoderFactory<Decoder = D>,
    {
        let path = path.as_ref();
        let decoder = factory.open(path)?;
        debug!(path = %path.display(), "decoder handle opened");
        Ok(Self {
            shared: SharedDecoder {
                inner: Arc::new(Mutex::new(decoder)),
            },
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> u32 {
        self.shared.with(|d| d.width())
    }

    pub fn height(&self) -> u32 {
        self.shared.with(|d| d.height())
    }

    pub fn frame_rate(&self) -> f64 {
        self.shared.with(|d| d.frame_rate())
    }

    pub fn frame_layout(&self) -> FrameLayout {
        self.shared.with(|d| d.frame_layout())
    }

    pub fn max_frame_size(&self) -> usize {
        self.shared.with(|d| d.max_frame_size())
    }

    pub fn info(&self) -> StreamInfo {
        self.shared.info()
    }

    /// A worker-side reference to the decoder.
    pub fn share(&self) -> SharedDecoder<D> {
        self.shared.clone()
    }

    /// Release the handle.
    pub fn close(self) {
        let outstanding = Arc::strong_count(&self.shared.inner) - 1;
        if outstanding > 0 {
            warn!(
                path = %self.path.display(),
                outstanding,
                "decoder handle closed while workers still hold it"
            );
        }
    }
}

impl<D: VideoDecoder> Drop for DecoderHandle<D> {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "decoder handle released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelLayout;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counted {
        drops: Arc<AtomicUsize>,
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl VideoDecoder for Counted {
        fn width(&self) -> u32 {
            640
        }
        fn height(&self) -> u32 {
            480
        }
        fn frame_rate(&self) -> f64 {
            25.0
        }
        fn frame_layout(&self) -> FrameLayout {
            FrameLayout {
                width: 640,
                height: 480,
                pixels: PixelLayout::Bgrx32,
                bottom_up: false,
            }
        }
        fn max_frame_size(&self) -> usize {
            640 * 480 * 4
        }
        fn read_frame(&mut self, _buf: &mut [u8]) -> Result<usize, PlayerError> {
            Ok(0)
        }
    }

    struct CountedFactory {
        drops: Arc<AtomicUsize>,
    }

    impl DecoderFactory for CountedFactory {
        type Decoder = Counted;
        fn open(&self, _path: &Path) -> Result<Counted, PlayerError> {
            Ok(Counted {
                drops: Arc::clone(&self.drops),
            })
        }
    }

    #[test]
    fn close_releases_exactly_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        let factory = CountedFactory {
            drops: Arc::clone(&drops),
        };
        let handle = DecoderHandle::open(&factory, "clip.avi").unwrap();
        assert_eq!(handle.width(), 640);
        assert_eq!(handle.frame_rate(), 25.0);
        handle.close();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shared_reference_keeps_stream_alive() {
        let drops = Arc::new(AtomicUsize::new(0));
        let factory = CountedFactory {
            drops: Arc::clone(&drops),
        };
        let handle = DecoderHandle::open(&factory, "clip.avi").unwrap();
        let shared = handle.share();
        drop(handle);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert_eq!(shared.info().height, 480);
        drop(shared);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_file_is_open_failure() {
        let err = DecoderHandle::open(&AviFactory, "/definitely/not/here.avi")
            .err()
            .unwrap();
        assert!(err.is_open_failure());
        assert!(err.to_string().contains("here.avi"));
    }
}
