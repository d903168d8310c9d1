//! JIF CLI Tool
//!
//! Displays GIF animations in the terminal using half-block rendering for
//! 2x vertical resolution. Supports local files and remote URLs.

use anyhow::{Context, Result};
use clap::Parser;
use jif_core::FrameSource;
use jif_player::PlayerConfig;
use log::{debug, info, LevelFilter};
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "jif")]
#[command(about = "A modern GIF viewer for your terminal")]
#[command(
    after_help = "Examples:\n  jif animation.gif\n  jif https://example.com/animation.gif\n\nPress ? while viewing for keybindings."
)]
#[command(version)]
struct Cli {
    /// GIF file path or http(s) URL
    source: String,

    /// Start paused on the first frame
    #[arg(long)]
    paused: bool,

    /// Show the keybinding panel on startup
    #[arg(long)]
    show_keys: bool,

    /// Minimum time a frame stays on screen, in milliseconds
    #[arg(long, default_value = "10")]
    min_delay: u64,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;
    debug!("Command-line args: {:?}", cli);

    if jif_core::is_url(&cli.source) {
        println!("Downloading GIF from {}...", cli.source);
    }
    let source = FrameSource::load(&cli.source)
        .with_context(|| format!("loading GIF from {}", cli.source))?;
    info!(
        "Loaded {} frames ({}x{} logical screen)",
        source.len(),
        source.screen_width,
        source.screen_height
    );

    let config = PlayerConfig {
        start_paused: cli.paused,
        show_help: cli.show_keys,
        min_frame_delay: Duration::from_millis(cli.min_delay),
    };

    // stderr shares the screen with the viewer
    if logs_to_stderr(&cli) {
        log::set_max_level(LevelFilter::Off);
    }
    jif_player::run(source, config).context("running viewer")?;

    Ok(())
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn logs_to_stderr(cli: &Cli) -> bool {
    cli.log.is_none()
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = log_level(cli.verbose);

    match &cli.log {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            env_logger::Builder::new()
                .filter_level(level)
                .format_timestamp_millis()
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
        None => {
            let default_level = level.to_string().to_lowercase();
            let env = env_logger::Env::default().default_filter_or(default_level);
            env_logger::Builder::from_env(env)
                .format_timestamp_millis()
                .init();
        }
    }

    Ok(())
}
