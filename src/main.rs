use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dialoguer::{FuzzySelect, Input};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use vascii::{AppConfig, AsciiPlayer, PlaybackEnd, PlayerError};
use walkdir::WalkDir;

/// Raised by the Ctrl+C handler; the playback loop polls it between frames.
static STOP: AtomicBool = AtomicBool::new(false);

fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| STOP.store(true, Ordering::SeqCst))
}

fn load_config() -> Result<AppConfig> {
    // Look for vascii.json in app support, then the current dir, then fall
    // back to built-in defaults.
    let mut tried: Vec<PathBuf> = Vec::new();
    if let Some(mut d) = dirs::data_dir() {
        d.push("vascii");
        d.push("vascii.json");
        tried.push(d);
    }
    tried.push(PathBuf::from("vascii.json"));

    for p in &tried {
        if p.exists() {
            let text =
                fs::read_to_string(p).with_context(|| format!("reading config {}", p.display()))?;
            let cfg: AppConfig = serde_json::from_str(&text).context("parsing config json")?;
            cfg.validate()
                .map_err(|e| anyhow!("config file {}: {}", p.display(), e))?;
            return Ok(cfg);
        }
    }

    Ok(AppConfig::default())
}

#[derive(Parser, Debug)]
#[command(version, about = "Play a video file as ASCII art in the terminal.")]
struct Args {
    /// Input video file
    input: Option<PathBuf>,

    /// Target width in terminal columns
    #[arg(long)]
    width: Option<u32>,

    /// Playback frame rate override (0 = use the video's own rate)
    #[arg(long)]
    fps: Option<u32>,
}

fn find_media_files() -> Result<Vec<String>> {
    Ok(WalkDir::new(".")
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file()
                && e.path().extension().is_some_and(|ext| {
                    matches!(ext.to_str(), Some("mp4" | "mkv" | "mov" | "avi" | "webm"))
                })
        })
        .map(|e| e.path().to_str().unwrap_or("").to_string())
        .collect())
}

fn prompt_for_input() -> Result<PathBuf> {
    let files = find_media_files()?;
    if files.is_empty() {
        let typed: String = Input::new()
            .with_prompt("Path to the video file")
            .interact_text()?;
        return Ok(PathBuf::from(typed.trim()));
    }
    let selection = FuzzySelect::with_theme(&dialoguer::theme::ColorfulTheme::default())
        .with_prompt("Choose a video file")
        .default(0)
        .items(&files)
        .interact()?;
    Ok(PathBuf::from(&files[selection]))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = load_config()?;

    setup_ctrlc_handler().context("installing Ctrl+C handler")?;

    let is_interactive = args.input.is_none();
    let mut input = match args.input {
        Some(p) => p,
        None => prompt_for_input()?,
    };

    let width = match args.width {
        Some(w) => w,
        None if is_interactive => Input::new()
            .with_prompt("Terminal width")
            .default(cfg.width)
            .interact()?,
        None => cfg.width,
    };
    // A zero width from flags or config falls back to the stock 80 columns.
    let width = if width == 0 { 80 } else { width };

    let fps = match args.fps {
        Some(f) => f,
        None if is_interactive => Input::new()
            .with_prompt("FPS (0 = video's own rate)")
            .default(cfg.fps)
            .interact()?,
        None => cfg.fps,
    };

    let player = AsciiPlayer::new(width, fps).with_ascii_chars(&cfg.ascii_chars);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let end = loop {
        match player.play_file(&input, &mut out, &STOP) {
            Ok(end) => break end,
            Err(PlayerError::SourceNotFound(p)) if is_interactive => {
                eprintln!("No such file: {}", p.display());
                input = prompt_for_input()?;
            }
            Err(e) => return Err(e.into()),
        }
    };

    if end == PlaybackEnd::Interrupted {
        writeln!(out)?;
        writeln!(out, "Video playback interrupted.")?;
    }

    Ok(())
}
