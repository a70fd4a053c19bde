//! Launcher: turns a file name and a render mode into a started player.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use avip_core::{
    AviFactory, BitmapPlayer, FrameSink, GlPlayer, Player, PlayerError, PlayerOptions, RenderMode,
};

use crate::config::PlayerConfig;
use crate::surfaces::build_surface;

/// Resolve `file` against the media directory. Absolute paths and an
/// empty `base_dir` leave `file` untouched.
pub fn resolve_media_path(base_dir: &str, file: &Path) -> PathBuf {
    if base_dir.is_empty() || file.is_absolute() {
        file.to_path_buf()
    } else {
        Path::new(base_dir).join(file)
    }
}

/// Build an unstarted player for `mode`.
pub fn build_player(
    mode: RenderMode,
    surface: Box<dyn FrameSink>,
    options: PlayerOptions,
) -> Box<dyn Player> {
    match mode {
        RenderMode::Bitmap => Box::new(BitmapPlayer::new(AviFactory, surface, options)),
        RenderMode::Gl => Box::new(GlPlayer::with_sink(AviFactory, surface, options)),
    }
}

pub struct Launcher {
    config: PlayerConfig,
}

impl Launcher {
    pub fn new(config: PlayerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Start playback of `file`. `mode` overrides the configured default.
    ///
    /// A decoder-open failure is logged and returned; no player is
    /// started in that case.
    pub async fn launch(
        &self,
        file: &Path,
        mode: Option<RenderMode>,
    ) -> Result<Box<dyn Player>, PlayerError> {
        let mode = mode.unwrap_or(self.config.media.default_mode);
        let path = resolve_media_path(&self.config.media.base_dir, file);
        let surface = build_surface(&self.config.output)?;
        let mut player = build_player(mode, surface, self.config.player_options());

        if let Err(e) = player.start(&path).await {
            error!("{e}");
            return Err(e);
        }
        info!(path = %path.display(), %mode, "playback started");
        Ok(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_names_join_base_dir() {
        assert_eq!(
            resolve_media_path("/sdcard", Path::new("clip.avi")),
            PathBuf::from("/sdcard/clip.avi")
        );
        assert_eq!(
            resolve_media_path("/sdcard", Path::new("/tmp/clip.avi")),
            PathBuf::from("/tmp/clip.avi")
        );
        assert_eq!(
            resolve_media_path("", Path::new("clip.avi")),
            PathBuf::from("clip.avi")
        );
    }

    #[test]
    fn player_matches_mode() {
        let options = PlayerOptions::default();
        let bitmap = build_player(
            RenderMode::Bitmap,
            Box::new(crate::NullSurface::default()),
            options,
        );
        assert_eq!(bitmap.mode(), RenderMode::Bitmap);
        let gl = build_player(RenderMode::Gl, Box::new(crate::NullSurface::default()), options);
        assert_eq!(gl.mode(), RenderMode::Gl);
        assert!(!gl.is_playing());
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let mut config = PlayerConfig::default();
        config.media.base_dir = "/definitely/not/a/media/dir".into();
        let launcher = Launcher::new(config);
        let err = launcher
            .launch(Path::new("clip.avi"), Some(RenderMode::Gl))
            .await
            .err()
            .unwrap();
        assert!(err.is_open_failure());
        assert!(err.to_string().contains("/definitely/not/a/media/dir/clip.avi"));
    }
}
