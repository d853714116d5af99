//! Motion Replay Core - Domain Model and Playback
//!
//! This crate contains the core domain model for Motion Replay, including:
//! - SMPL mesh frames and the shared face topology
//! - Recording folders, storage families and frame manifests
//! - Session and exercise metadata
//! - The frame-index playback engine
//! - Logging and user configuration

#![warn(missing_docs)]

pub use glam::Vec3;
use thiserror::Error;

pub mod config;
pub mod frame;
pub mod logging;
pub mod playback;
pub mod recording;
pub mod session;

// --- Re-exports grouped by category ---

// Mesh data
pub use frame::{
    MeshFrame, MeshTopology, EXPECTED_FLOATS, FLOATS_PER_VERTEX, SMPL_VERTEX_COUNT,
};

// Recordings
pub use recording::{FolderPath, FrameManifest, RecordingFolder, StorageFamily};
pub use session::{ExerciseEntry, Session};

// Playback
pub use playback::{
    PlaybackEngine, PlaybackState, PlaybackStatus, DEFAULT_FPS, FRAME_RATE_OPTIONS,
};

// Configuration
pub use config::{RenderMode, UserConfig};
pub use logging::LogConfig;

/// Core error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Recording path has fewer than the four required segments
    #[error("Invalid folder path format: {0}")]
    MalformedPath(String),

    /// Recording path starts with an unknown storage prefix
    #[error("Unsupported storage prefix: {0}. Expected 'smpl_data' or 'pose_data'")]
    UnsupportedStorageFamily(String),

    /// Face list contained an entry that is not a triangle
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// Configuration could not be read or written
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::UnsupportedStorageFamily("raw_data".to_string());
        assert!(err.to_string().contains("raw_data"));
        assert!(err.to_string().contains("pose_data"));
    }
}
