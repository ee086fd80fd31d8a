//! Video decoding via ffmpeg.
//!
//! The file is probed once with `ffprobe` for dimensions and native frame
//! rate, then an `ffmpeg` process streams raw RGB24 frames over stdout and
//! [`FfmpegSource::next_frame`] reads them one frame-sized chunk at a time.
//! The child process is reaped when the source is dropped, on every exit
//! path.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::PlayerError;

/// One decoded frame: packed RGB24 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Probed properties of a video stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    /// Native frame rate; 0.0 when the container does not report one.
    pub fps: f64,
}

/// A sequential supplier of decoded frames.
///
/// The playback loop only consumes this trait, so tests drive it with
/// synthetic in-memory sources.
pub trait FrameSource {
    /// Native frame rate of the stream, or 0.0 if unknown.
    fn frame_rate(&self) -> f64;

    /// Decode the next frame. `Ok(None)` signals a cleanly exhausted stream.
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, PlayerError>;
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    r_frame_rate: Option<String>,
    #[serde(default)]
    avg_frame_rate: Option<String>,
}

/// Parse an ffprobe rate string, either rational ("30000/1001") or plain
/// ("29.97"). Returns `None` for missing, zero, or malformed rates.
fn parse_rate(raw: &str) -> Option<f64> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if let Some((numerator, denominator)) = value.split_once('/') {
        let numerator = numerator.trim().parse::<f64>().ok()?;
        let denominator = denominator.trim().parse::<f64>().ok()?;
        if denominator.abs() <= f64::EPSILON {
            return None;
        }
        let rate = numerator / denominator;
        return (rate.is_finite() && rate > 0.0).then_some(rate);
    }
    let rate = value.parse::<f64>().ok()?;
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Probe a video file for dimensions and frame rate.
///
/// Fails with [`PlayerError::SourceNotFound`] before any process is spawned
/// if the path does not exist, and with [`PlayerError::DecodeInit`] if the
/// file cannot be probed as a video.
pub fn probe(path: &Path) -> Result<VideoMeta, PlayerError> {
    if !path.is_file() {
        return Err(PlayerError::SourceNotFound(path.to_path_buf()));
    }

    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-select_streams")
        .arg("v:0")
        .arg("-show_streams")
        .arg("-print_format")
        .arg("json")
        .arg(path)
        .output()
        .map_err(|e| PlayerError::DecodeInit(format!("failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(PlayerError::DecodeInit(format!(
            "ffprobe failed for {} (exit status: {})",
            path.display(),
            output.status
        )));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| PlayerError::DecodeInit(format!("unreadable ffprobe output: {}", e)))?;

    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            PlayerError::DecodeInit(format!("no video stream in {}", path.display()))
        })?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(PlayerError::DecodeInit(format!(
                "missing video dimensions for {}",
                path.display()
            )))
        }
    };

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_rate))
        .unwrap_or(0.0);

    Ok(VideoMeta { width, height, fps })
}

/// Streams decoded frames from a spawned ffmpeg process.
pub struct FfmpegSource {
    child: Child,
    stdout: ChildStdout,
    meta: VideoMeta,
    frame_len: usize,
}

impl FfmpegSource {
    /// Probe `path` and start decoding it.
    pub fn open(path: &Path) -> Result<Self, PlayerError> {
        let meta = probe(path)?;

        let mut child = Command::new("ffmpeg")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(path)
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlayerError::DecodeInit(format!("failed to spawn ffmpeg: {}", e)))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            let _ = child.kill();
            let _ = child.wait();
            PlayerError::DecodeInit("failed to capture ffmpeg stdout".to_string())
        })?;

        let frame_len = meta.width as usize * meta.height as usize * 3;
        Ok(Self {
            child,
            stdout,
            meta,
            frame_len,
        })
    }

    /// Probed stream properties.
    pub fn meta(&self) -> VideoMeta {
        self.meta
    }
}

impl FrameSource for FfmpegSource {
    fn frame_rate(&self) -> f64 {
        self.meta.fps
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, PlayerError> {
        let mut data = vec![0u8; self.frame_len];
        match self.stdout.read_exact(&mut data) {
            Ok(()) => Ok(Some(VideoFrame {
                width: self.meta.width,
                height: self.meta.height,
                data,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(PlayerError::Io(e)),
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
