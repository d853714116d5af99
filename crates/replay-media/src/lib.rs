//! Motion Replay Media - Frame Preloading and Replay Orchestration
//!
//! This crate turns recording selections into playable frame sequences:
//! - Batched, cancelable frame preloading with progress
//! - Selection state and the resolve, preload and play chain

#![warn(missing_docs)]

use replay_io::ReplayIoError;
use thiserror::Error;

pub mod orchestrator;
pub mod preloader;

pub use orchestrator::{ReplayOptions, ReplayOrchestrator, ReplayPhase, ReplayStatus};
pub use preloader::{preload_frames, FramePreloader, PreloadState, BATCH_SIZE};

/// Media errors
#[derive(Error, Debug)]
pub enum MediaError {
    /// Backend or decoding failure
    #[error(transparent)]
    Io(#[from] ReplayIoError),

    /// Every frame of a load failed
    #[error("Failed to load any frames")]
    AllFramesFailed,

    /// A selector index does not exist
    #[error("No {kind} at index {index} (have {len})")]
    SelectionOutOfRange {
        /// What was being selected
        kind: &'static str,
        /// Requested index
        index: usize,
        /// Number of entries available
        len: usize,
    },

    /// The session has no exercise with recordings
    #[error("No motion data available")]
    NoRecordings,
}

/// Result type for media operations
pub type Result<T> = std::result::Result<T, MediaError>;
