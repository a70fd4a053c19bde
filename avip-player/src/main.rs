//! avip player: entry point.
//!
//! ```text
//! avip-player clip.avi                 Play with the configured mode
//! avip-player clip.avi --mode gl       Use the texture path
//! avip-player --config <path> ...      Use custom config TOML
//! avip-player --gen-config             Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use avip_core::{RenderMode, SurfaceEvent};
use avip_player::config::PlayerConfig;
use avip_player::launcher::Launcher;
use avip_player::surfaces::SurfaceKind;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "avip-player", about = "Play uncompressed AVI files")]
struct Cli {
    /// AVI file to play; relative names resolve against `media.base_dir`.
    #[arg(required_unless_present = "gen_config")]
    file: Option<PathBuf>,

    /// Render mode: bitmap or gl (overrides config).
    #[arg(short, long)]
    mode: Option<RenderMode>,

    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "avip-player.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Output surface: null or ppm (overrides config).
    #[arg(long)]
    surface: Option<SurfaceKind>,

    /// Directory for dumped frames (overrides config).
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Stop after this many frames (overrides config).
    #[arg(long)]
    max_frames: Option<u64>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&PlayerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = PlayerConfig::load(&cli.config);
    if let Some(surface) = cli.surface {
        config.output.surface = surface;
    }
    if let Some(dir) = cli.dump_dir {
        config.output.dump_dir = dir.display().to_string();
    }
    if let Some(max) = cli.max_frames {
        config.playback.max_frames = max;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.file.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logging.file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    }

    info!("avip-player v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Open the file ────────────────────────────────────────

    let Some(file) = cli.file else {
        return Err("no file given".into());
    };
    let launcher = Launcher::new(config);
    let mut player = match launcher.launch(&file, cli.mode).await {
        Ok(player) => player,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    // ── 2. Play until the stream ends or Ctrl-C ─────────────────

    let mut state_rx = player.subscribe();
    player.on_surface_event(SurfaceEvent::Created).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            changed = state_rx.changed() => {
                if changed.is_err() || state_rx.borrow_and_update().is_finished() {
                    break;
                }
            }
        }
    }

    // ── 3. Shutdown ─────────────────────────────────────────────

    if let Err(e) = player.on_surface_event(SurfaceEvent::Destroyed).await {
        warn!("surface teardown: {e}");
    }
    player.stop().await?;
    info!("playback finished");

    Ok(())
}
