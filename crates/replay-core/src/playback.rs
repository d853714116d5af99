//! Frame-index playback engine
//!
//! Walks a frame index over time at a configurable frame rate. The engine has
//! no clock of its own; the render loop calls [`PlaybackEngine::tick`] with the
//! current instant and the engine decides whether the threshold has passed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Frame rates offered by the transport controls
pub const FRAME_RATE_OPTIONS: [u32; 3] = [12, 24, 30];

/// Frame rate used when nothing else is configured
pub const DEFAULT_FPS: u32 = 24;

/// Transport status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    /// Nothing played yet, or no frames
    #[default]
    Stopped,
    /// Holding the current frame
    Paused,
    /// Advancing on every tick past the threshold
    Playing,
}

/// Snapshot of the engine for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Zero-based frame index
    pub current_frame_index: usize,
    /// Whether playback is active
    pub is_playing: bool,
    /// Frames per second
    pub fps: u32,
    /// Whether the sequence wraps at the end
    pub loop_playback: bool,
}

type FrameObserver = Box<dyn FnMut(usize, usize) + Send>;

/// Clock-driven frame-index state machine
pub struct PlaybackEngine {
    current: usize,
    total: usize,
    status: PlaybackStatus,
    fps: u32,
    looping: bool,
    last_advance: Option<Instant>,
    observers: Vec<FrameObserver>,
}

impl PlaybackEngine {
    /// Create an engine with no frames
    pub fn new(fps: u32, looping: bool) -> Self {
        Self {
            current: 0,
            total: 0,
            status: PlaybackStatus::Stopped,
            fps: fps.max(1),
            looping,
            last_advance: None,
            observers: Vec::new(),
        }
    }

    /// Register a callback receiving `(index, total)` after every change
    pub fn on_frame_change<F>(&mut self, observer: F)
    where
        F: FnMut(usize, usize) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Current frame index
    pub fn current_frame(&self) -> usize {
        self.current
    }

    /// Number of frames in the sequence
    pub fn total_frames(&self) -> usize {
        self.total
    }

    /// Transport status
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Whether playback is active
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    /// Frames per second
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Whether the sequence wraps at the end
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Snapshot for display
    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            current_frame_index: self.current,
            is_playing: self.is_playing(),
            fps: self.fps,
            loop_playback: self.looping,
        }
    }

    /// Time between advances
    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.fps))
    }

    /// Start playback; no-op without frames
    pub fn play(&mut self) {
        self.play_at(Instant::now());
    }

    /// Start playback with an explicit clock origin
    pub fn play_at(&mut self, now: Instant) {
        if self.total == 0 {
            return;
        }
        self.status = PlaybackStatus::Playing;
        self.last_advance = Some(now);
    }

    /// Hold the current frame
    pub fn pause(&mut self) {
        if self.total == 0 {
            self.status = PlaybackStatus::Stopped;
            return;
        }
        self.status = PlaybackStatus::Paused;
        self.last_advance = None;
    }

    /// Play if paused, pause if playing
    pub fn toggle(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move one frame forward and pause
    pub fn step_forward(&mut self) {
        let target = self.current.saturating_add(1);
        self.seek(target);
    }

    /// Move one frame backward and pause
    pub fn step_backward(&mut self) {
        let target = self.current.saturating_sub(1);
        self.seek(target);
    }

    /// Jump to `index` (clamped) and pause
    pub fn seek(&mut self, index: usize) {
        self.pause();
        if self.total == 0 {
            return;
        }
        let target = index.min(self.total - 1);
        self.set_index(target);
    }

    /// Return to the first frame and pause
    pub fn reset(&mut self) {
        self.seek(0);
    }

    /// Change the frame rate; 0 is treated as 1
    pub fn set_fps(&mut self, fps: u32) {
        self.fps = fps.max(1);
    }

    /// Enable or disable wraparound
    pub fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Replace the sequence length, clamping the index
    pub fn set_total_frames(&mut self, total: usize) {
        let previous_total = self.total;
        self.total = total;

        if total == 0 {
            self.status = PlaybackStatus::Stopped;
            self.last_advance = None;
            self.current = 0;
        } else if self.current >= total {
            self.current = total - 1;
        }

        if previous_total != total {
            self.notify();
        }
    }

    /// Drop back to frame 0 with a new sequence length
    pub fn load_sequence(&mut self, total: usize) {
        self.status = PlaybackStatus::Stopped;
        self.last_advance = None;
        self.current = 0;
        self.total = total;
        self.notify();
    }

    /// Advance if playing and the frame interval has elapsed since the last advance
    ///
    /// Returns the new index when it changed.
    pub fn tick(&mut self, now: Instant) -> Option<usize> {
        if self.status != PlaybackStatus::Playing || self.total == 0 {
            return None;
        }

        let last = *self.last_advance.get_or_insert(now);
        if now.saturating_duration_since(last) < self.frame_interval() {
            return None;
        }
        self.last_advance = Some(now);

        let next = self.current + 1;
        if next >= self.total {
            if self.looping {
                self.set_index(0);
                return Some(0);
            }
            debug!("Reached end of sequence at frame {}", self.current);
            self.status = PlaybackStatus::Paused;
            self.last_advance = None;
            return None;
        }

        self.set_index(next);
        Some(next)
    }

    /// Sequence length in seconds at the current frame rate
    pub fn duration_secs(&self) -> f64 {
        self.total as f64 / f64::from(self.fps)
    }

    /// Position of the current frame in `[0, 1]`
    pub fn progress_fraction(&self) -> f32 {
        if self.total <= 1 {
            return 0.0;
        }
        self.current as f32 / (self.total - 1) as f32
    }

    /// Human-readable position, e.g. `Frame 3 / 90`
    pub fn frame_label(&self) -> String {
        format!("Frame {} / {}", self.current + 1, self.total)
    }

    fn set_index(&mut self, index: usize) {
        if index == self.current {
            return;
        }
        self.current = index;
        self.notify();
    }

    fn notify(&mut self) {
        let (index, total) = (self.current, self.total);
        for observer in &mut self.observers {
            observer(index, total);
        }
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new(DEFAULT_FPS, true)
    }
}

impl fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("current", &self.current)
            .field("total", &self.total)
            .field("status", &self.status)
            .field("fps", &self.fps)
            .field("looping", &self.looping)
            .field("observers", &self.observers.len())
            .finish()
    }
}
