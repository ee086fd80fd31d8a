//! # vascii - terminal ASCII video player
//!
//! `vascii` decodes a video file frame-by-frame and plays it back in the
//! terminal as ASCII art, paced against wall-clock time so the playback
//! matches the source frame rate.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::atomic::AtomicBool;
//! use vascii::AsciiPlayer;
//!
//! # fn main() -> Result<(), vascii::PlayerError> {
//! let player = AsciiPlayer::new(80, 0);
//! let stop = AtomicBool::new(false);
//! let mut stdout = std::io::stdout();
//! player.play_file(Path::new("input.mp4"), &mut stdout, &stop)?;
//! # Ok(())
//! # }
//! ```
//!
//! Frame decoding sits behind the [`FrameSource`] trait, so playback can be
//! driven from synthetic sources as well as from the bundled ffmpeg-backed
//! [`FfmpegSource`].

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

pub mod decode;
pub mod playback;
pub mod render;

pub use decode::{probe, FfmpegSource, FrameSource, VideoFrame, VideoMeta};
pub use playback::{frame_delay, AsciiPlayer, PlaybackEnd};
pub use render::{ascii_height, frame_to_ascii};

/// Default character ramp, sparsest to densest.
pub const DEFAULT_ASCII_CHARS: &str = " .:-=+*#%@";

/// Errors produced while opening or playing a video.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The path does not resolve to an existing file. Reported before any
    /// decode resource is acquired, so the caller may retry with another path.
    #[error("video file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The file exists but could not be opened or probed as a video stream.
    #[error("could not open video stream: {0}")]
    DecodeInit(String),

    /// Target width of zero was requested.
    #[error("target width must be at least 1")]
    InvalidWidth,

    /// A frame with zero width or height, or with a pixel buffer that does
    /// not match its dimensions.
    #[error("empty or malformed video frame")]
    EmptyFrame,

    /// Terminal write or stream read failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_width() -> u32 {
    80
}

fn default_fps() -> u32 {
    0
}

fn default_ascii_chars() -> String {
    DEFAULT_ASCII_CHARS.to_string()
}

/// Application configuration, loaded from an optional `vascii.json`.
///
/// Every field has a built-in default, so a partial (or absent) config file
/// is fine.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Target terminal column count.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Frame rate override; 0 means "use the source rate".
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Character ramp from sparsest to densest. Must be ASCII-only.
    #[serde(default = "default_ascii_chars")]
    pub ascii_chars: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            fps: default_fps(),
            ascii_chars: default_ascii_chars(),
        }
    }
}

impl AppConfig {
    /// Validate the configured character ramp.
    ///
    /// Non-ASCII ramps would corrupt the fixed-width output grid.
    pub fn validate(&self) -> Result<(), String> {
        if self.ascii_chars.is_empty() {
            return Err("ascii_chars must not be empty".to_string());
        }
        if !self.ascii_chars.is_ascii() {
            return Err(
                "ascii_chars contains non-ASCII characters; use only ASCII characters".to_string(),
            );
        }
        Ok(())
    }
}
