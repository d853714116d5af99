//! Command line interface

use clap::Parser;
use replay_core::{RenderMode, UserConfig};
use replay_media::ReplayOptions;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "motion-replay")]
#[command(about = "Replay recorded SMPL body motion from a training session")]
pub struct Cli {
    /// Backend base URL
    #[arg(long, env = "REPLAY_API_URL")]
    pub api_base: Option<String>,

    /// Bearer token for the backend
    #[arg(long, env = "REPLAY_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Session JSON file; defaults to the most recent one
    #[arg(long)]
    pub session: Option<PathBuf>,

    /// Exercise index among exercises with recordings
    #[arg(long, default_value_t = 0)]
    pub exercise: usize,

    /// Recording index within the exercise
    #[arg(long, default_value_t = 0)]
    pub recording: usize,

    /// Playback frame rate
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: Option<u32>,

    /// Stop at the last frame instead of wrapping
    #[arg(long)]
    pub no_loop: bool,

    /// Start playing as soon as frames are loaded
    #[arg(long)]
    pub autoplay: bool,

    /// Drawing mode: solid, wireframe or points
    #[arg(long)]
    pub mode: Option<RenderMode>,

    /// Play through once without opening a window
    #[arg(long)]
    pub headless: bool,

    /// Print exercises and recordings, then exit
    #[arg(long)]
    pub list: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Also write the log to a file named after the session
    #[arg(long)]
    pub log_file: bool,
}

impl Cli {
    /// Apply flag overrides on top of the stored configuration
    pub fn apply_to(&self, config: &mut UserConfig) {
        if let Some(api_base) = &self.api_base {
            config.api_base = api_base.clone();
        }
        if let Some(fps) = self.fps {
            config.default_fps = fps;
        }
        if self.no_loop {
            config.loop_playback = false;
        }
        if self.autoplay {
            config.autoplay = true;
        }
        if let Some(mode) = self.mode {
            config.render_mode = mode;
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        if self.log_file {
            config.log.file_output = true;
        }
    }

    /// Session file to open
    pub fn session_path(&self, config: &UserConfig) -> Option<PathBuf> {
        self.session
            .clone()
            .or_else(|| config.recent_sessions.first().map(PathBuf::from))
    }
}

/// Orchestrator options from the effective configuration
pub fn replay_options(config: &UserConfig) -> ReplayOptions {
    ReplayOptions {
        fps: config.default_fps,
        looping: config.loop_playback,
        autoplay: config.autoplay,
        render_mode: config.render_mode,
    }
}
