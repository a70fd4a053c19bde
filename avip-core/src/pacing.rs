//! Fixed-interval frame pacing.
//!
//! The delay is computed once per playback session from the stream's
//! average frame rate and never adjusted: no drift correction, no
//! frame dropping. A slow frame simply delays the next one.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Frame rate assumed when a stream reports none.
pub const DEFAULT_FRAME_RATE: f64 = 25.0;

/// Sleeps a fixed interval between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePacer {
    frame_rate: f64,
    delay: Duration,
}

impl FramePacer {
    /// Pace at `frame_rate`, falling back to [`DEFAULT_FRAME_RATE`].
    pub fn from_frame_rate(frame_rate: f64) -> Self {
        Self::with_fallback(frame_rate, DEFAULT_FRAME_RATE)
    }

    /// Pace at `frame_rate`; non-finite or non-positive rates use
    /// `fallback` instead.
    pub fn with_fallback(frame_rate: f64, fallback: f64) -> Self {
        let frame_rate = if frame_rate.is_finite() && frame_rate > 0.0 {
            frame_rate
        } else {
            let fallback = if fallback.is_finite() && fallback > 0.0 {
                fallback
            } else {
                DEFAULT_FRAME_RATE
            };
            warn!(reported = frame_rate, fallback, "unusable frame rate; using fallback");
            fallback
        };
        // Whole milliseconds, truncated.
        let delay = Duration::from_millis((1000.0 / frame_rate) as u64);
        Self { frame_rate, delay }
    }

    /// The effective frame rate.
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// The inter-frame delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep for one interval.
    ///
    /// Returns `false` if `cancel` fired first; cancellation always wins
    /// over an elapsed timer.
    pub async fn pause(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_five_fps_is_forty_ms() {
        let pacer = FramePacer::from_frame_rate(25.0);
        assert_eq!(pacer.delay(), Duration::from_millis(40));
    }

    #[test]
    fn delay_is_truncated_to_whole_millis() {
        assert_eq!(
            FramePacer::from_frame_rate(29.97).delay(),
            Duration::from_millis(33)
        );
        assert_eq!(
            FramePacer::from_frame_rate(60.0).delay(),
            Duration::from_millis(16)
        );
    }

    #[test]
    fn bad_rates_fall_back() {
        for rate in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let pacer = FramePacer::with_fallback(rate, 10.0);
            assert_eq!(pacer.delay(), Duration::from_millis(100));
            assert_eq!(pacer.frame_rate(), 10.0);
        }
        let pacer = FramePacer::with_fallback(0.0, 0.0);
        assert_eq!(pacer.frame_rate(), DEFAULT_FRAME_RATE);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_sleeps_one_interval() {
        let pacer = FramePacer::from_frame_rate(25.0);
        let cancel = CancellationToken::new();
        let start = tokio::time::Instant::now();
        assert!(pacer.pause(&cancel).await);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(40));
        assert!(elapsed < Duration::from_millis(42));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_cuts_pause_short() {
        let pacer = FramePacer::from_frame_rate(1.0);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let start = tokio::time::Instant::now();
        assert!(!pacer.pause(&cancel).await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
