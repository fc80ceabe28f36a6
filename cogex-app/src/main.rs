mod app;
mod session;
mod timeline;

use anyhow::{bail, Result};
use app::App;
use clap::Parser;
use cogex_render::load_font;
use cogex_timing::HighPrecisionTimer;
use session::Session;
use std::path::PathBuf;
use tracing::info;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Parser)]
#[command(name = "cogex-app", about = "Runs a timeline of control-question trials.")]
struct Cli {
    /// Timeline JSON: an array of trial entries or a single entry
    timeline: PathBuf,

    /// Where trial results are written when the session ends
    #[arg(short, long, default_value = "survey_results.json")]
    results: PathBuf,

    /// TrueType font used for all text
    #[arg(long)]
    font: Option<PathBuf>,

    /// Present timeline entries in random order
    #[arg(long)]
    shuffle: bool,

    /// Seed for --shuffle
    #[arg(long, requires = "shuffle")]
    seed: Option<u64>,

    /// Run in a resizable window instead of fullscreen
    #[arg(short, long)]
    windowed: bool,
}

fn resolve_font(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    match FONT_CANDIDATES.iter().map(PathBuf::from).find(|p| p.is_file()) {
        Some(path) => Ok(path),
        None => bail!("no system font found, pass one with --font"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cogex=info")),
        )
        .init();

    let cli = Cli::parse();

    let font_path = resolve_font(cli.font)?;
    let font = load_font(&font_path)?;
    info!(font = %font_path.display(), "font loaded");

    let mut entries = timeline::load(&cli.timeline)?;
    if cli.shuffle {
        timeline::shuffle(&mut entries, cli.seed);
    }
    info!(entries = entries.len(), path = %cli.timeline.display(), "timeline loaded");

    let session = Session::new(entries, HighPrecisionTimer::new())?;
    App::new(session, font, cli.results, cli.windowed).run()
}
