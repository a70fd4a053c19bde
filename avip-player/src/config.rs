//! Player configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use avip_core::{DEFAULT_FRAME_RATE, PlayerOptions, RenderMode};

use crate::surfaces::SurfaceKind;

/// Top-level configuration for the player.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Where media files live and how to play them.
    pub media: MediaConfig,
    /// Frame pacing.
    pub playback: PlaybackConfig,
    /// Output surface.
    pub output: OutputConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Media lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Root for relative file names. Empty means the working directory.
    pub base_dir: String,
    /// Render mode when none is given on the command line.
    pub default_mode: RenderMode,
}

/// Frame pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Frame rate used when a stream reports none.
    pub default_frame_rate: f64,
    /// Stop after this many frames; 0 plays until interrupted.
    pub max_frames: u64,
}

/// Output surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// `null` discards frames, `ppm` writes them to `dump_dir`.
    pub surface: SurfaceKind,
    /// Directory for dumped frames.
    pub dump_dir: String,
    /// Dump every Nth presented frame.
    pub dump_every: u32,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
    /// Optional log file.
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            base_dir: String::new(),
            default_mode: RenderMode::Bitmap,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_frame_rate: DEFAULT_FRAME_RATE,
            max_frames: 0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceKind::Null,
            dump_dir: "frames".into(),
            dump_every: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl PlayerConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Options handed to every player.
    pub fn player_options(&self) -> PlayerOptions {
        PlayerOptions {
            default_frame_rate: self.playback.default_frame_rate,
            max_frames: (self.playback.max_frames > 0).then_some(self.playback.max_frames),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
