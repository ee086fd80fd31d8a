//! Real-time playback loop.
//!
//! Frames are pulled sequentially from a [`FrameSource`], rendered, and
//! written to the terminal, with the loop sleeping until each frame's
//! wall-clock deadline (`start + frame_index * frame_delay`). When rendering
//! falls behind there is no frame skipping; playback simply proceeds at the
//! next iteration.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::decode::{FfmpegSource, FrameSource};
use crate::render::frame_to_ascii;
use crate::{PlayerError, DEFAULT_ASCII_CHARS};

/// ANSI "home cursor + clear screen", written before each frame.
const CLEAR_SCREEN: &str = "\x1b[H\x1b[J";

/// Assumed frame rate when neither an override nor the source provides one.
const FALLBACK_FPS: f64 = 30.0;

/// How a playback session ended. Both variants are successful outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    /// The stream was exhausted.
    Completed,
    /// The stop flag was raised mid-stream.
    Interrupted,
}

/// Compute the inter-frame delay.
///
/// A positive override wins over the source rate; an unknown source rate
/// falls back to 30 fps.
pub fn frame_delay(override_fps: u32, source_fps: f64) -> Duration {
    let fps = if override_fps > 0 {
        override_fps as f64
    } else if source_fps > 0.0 {
        source_fps
    } else {
        FALLBACK_FPS
    };
    Duration::from_secs_f64(1.0 / fps)
}

/// Plays video frames to a terminal as ASCII art.
pub struct AsciiPlayer {
    width: u32,
    fps_override: u32,
    ascii_chars: Vec<u8>,
}

impl AsciiPlayer {
    /// Create a player with the default character ramp.
    ///
    /// `fps_override` of 0 means "use the source frame rate".
    pub fn new(width: u32, fps_override: u32) -> Self {
        Self {
            width,
            fps_override,
            ascii_chars: DEFAULT_ASCII_CHARS.as_bytes().to_vec(),
        }
    }

    /// Replace the character ramp. The ramp is ordered sparsest to densest.
    pub fn with_ascii_chars(mut self, ascii_chars: &str) -> Self {
        self.ascii_chars = ascii_chars.as_bytes().to_vec();
        self
    }

    /// Open `path` with the ffmpeg decoder and play it to `out`.
    pub fn play_file(
        &self,
        path: &Path,
        out: &mut impl Write,
        stop: &AtomicBool,
    ) -> Result<PlaybackEnd, PlayerError> {
        let source = FfmpegSource::open(path)?;
        self.play(source, out, stop)
    }

    /// Play every frame of `source` to `out`, paced to real time.
    ///
    /// The source is owned by the session and released on every exit path.
    /// Raising `stop` between frames ends the session with
    /// [`PlaybackEnd::Interrupted`]. A mid-stream decode fault is treated
    /// like end-of-stream and logged.
    pub fn play<S: FrameSource>(
        &self,
        mut source: S,
        out: &mut impl Write,
        stop: &AtomicBool,
    ) -> Result<PlaybackEnd, PlayerError> {
        let delay = frame_delay(self.fps_override, source.frame_rate());
        let start = Instant::now();
        let mut frame_index: u32 = 0;

        loop {
            if stop.load(Ordering::SeqCst) {
                return Ok(PlaybackEnd::Interrupted);
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("decode ended early: {}", e);
                    break;
                }
            };

            let ascii = frame_to_ascii(&frame, self.width, &self.ascii_chars)?;
            out.write_all(CLEAR_SCREEN.as_bytes())?;
            out.write_all(ascii.as_bytes())?;
            out.flush()?;

            frame_index += 1;
            let deadline = start + delay * frame_index;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }
        }

        Ok(PlaybackEnd::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::VideoFrame;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    /// In-memory frame source with a drop counter.
    struct StubSource {
        frames: VecDeque<VideoFrame>,
        fps: f64,
        fail_at_end: bool,
        drops: Arc<AtomicUsize>,
    }

    impl StubSource {
        fn new(count: usize, fps: f64) -> (Self, Arc<AtomicUsize>) {
            let drops = Arc::new(AtomicUsize::new(0));
            let frames = (0..count)
                .map(|i| VideoFrame {
                    width: 20,
                    height: 20,
                    data: vec![(i * 40) as u8; 20 * 20 * 3],
                })
                .collect();
            (
                Self {
                    frames,
                    fps,
                    fail_at_end: false,
                    drops: Arc::clone(&drops),
                },
                drops,
            )
        }
    }

    impl FrameSource for StubSource {
        fn frame_rate(&self) -> f64 {
            self.fps
        }

        fn next_frame(&mut self) -> Result<Option<VideoFrame>, PlayerError> {
            match self.frames.pop_front() {
                Some(frame) => Ok(Some(frame)),
                None if self.fail_at_end => Err(PlayerError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "decoder went away",
                ))),
                None => Ok(None),
            }
        }
    }

    impl Drop for StubSource {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn blocks(output: &[u8]) -> Vec<String> {
        String::from_utf8(output.to_vec())
            .unwrap()
            .split(CLEAR_SCREEN)
            .filter(|b| !b.is_empty())
            .map(|b| b.to_string())
            .collect()
    }

    #[test]
    fn delay_uses_source_rate_when_no_override() {
        assert_eq!(frame_delay(0, 24.0), Duration::from_secs_f64(1.0 / 24.0));
    }

    #[test]
    fn delay_override_beats_source_rate() {
        assert_eq!(frame_delay(15, 24.0), Duration::from_secs_f64(1.0 / 15.0));
        assert_eq!(frame_delay(15, 0.0), Duration::from_secs_f64(1.0 / 15.0));
    }

    #[test]
    fn delay_falls_back_to_thirty_fps() {
        assert_eq!(frame_delay(0, 0.0), Duration::from_secs_f64(1.0 / 30.0));
    }

    #[test]
    fn plays_every_frame_with_invariant_dimensions() {
        let (source, _) = StubSource::new(3, 50.0);
        let player = AsciiPlayer::new(10, 0);
        let stop = AtomicBool::new(false);
        let mut out = Vec::new();

        let end = player.play(source, &mut out, &stop).unwrap();
        assert_eq!(end, PlaybackEnd::Completed);

        let rendered = blocks(&out);
        assert_eq!(rendered.len(), 3);
        for block in &rendered {
            let lines: Vec<&str> = block.lines().collect();
            assert_eq!(lines.len() as u32, crate::ascii_height(20, 20, 10));
            for line in lines {
                assert_eq!(line.len(), 10);
            }
        }
    }

    #[test]
    fn pacing_approximates_the_configured_delay() {
        let (source, _) = StubSource::new(3, 0.0);
        // 50 fps override: 20ms per frame, 60ms for the session.
        let player = AsciiPlayer::new(10, 50);
        let stop = AtomicBool::new(false);
        let mut out = Vec::new();

        let started = Instant::now();
        player.play(source, &mut out, &stop).unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(55), "too fast: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(500), "too slow: {:?}", elapsed);
    }

    #[test]
    fn interruption_stops_before_the_next_frame_and_releases_the_source() {
        let (source, drops) = StubSource::new(100, 1000.0);
        let player = AsciiPlayer::new(10, 0);
        let stop = AtomicBool::new(true);
        let mut out = Vec::new();

        let end = player.play(source, &mut out, &stop).unwrap();
        assert_eq!(end, PlaybackEnd::Interrupted);
        assert!(out.is_empty());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn source_is_released_exactly_once_on_normal_completion() {
        let (source, drops) = StubSource::new(2, 1000.0);
        let player = AsciiPlayer::new(10, 0);
        let stop = AtomicBool::new(false);
        let mut out = Vec::new();

        player.play(source, &mut out, &stop).unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mid_stream_decode_fault_ends_playback_cleanly() {
        let (mut source, _) = StubSource::new(2, 1000.0);
        source.fail_at_end = true;
        let player = AsciiPlayer::new(10, 0);
        let stop = AtomicBool::new(false);
        let mut out = Vec::new();

        let end = player.play(source, &mut out, &stop).unwrap();
        assert_eq!(end, PlaybackEnd::Completed);
        assert_eq!(blocks(&out).len(), 2);
    }
}
