//! Motion Replay IO - Backend Access and Frame Decoding
//!
//! Talks to the trainer backend: lists the frame files of a recording,
//! fetches and decodes individual frames and caches the shared mesh topology.

#![warn(missing_docs)]

use replay_core::CoreError;
use thiserror::Error;

pub mod decoder;
pub mod loader;
pub mod manifest;
pub mod topology;
pub mod transport;
pub mod urls;

pub use decoder::{decode, decode_checked, VertexCountMismatch};
pub use loader::{fetch_frame, load_frame};
pub use manifest::ManifestResolver;
pub use topology::{TopologyCache, TopologyResult};
pub use transport::{BackendClient, BackendTransport, HttpTransport, TransportResponse};
pub use urls::{build_frame_urls, frame_url, listing_url, topology_url};

/// Backend and decoding errors
#[derive(Error, Debug)]
pub enum ReplayIoError {
    /// Recording path or topology data was invalid
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Frame listing request failed or returned an unusable body
    #[error("Failed to fetch filenames: {} - {}", status_text(.status), .body)]
    ManifestFetchFailed {
        /// HTTP status, absent when the request never completed
        status: Option<u16>,
        /// Response body or transport error text
        body: String,
    },

    /// A single frame could not be fetched
    #[error("Failed to load: {url} ({status})")]
    FrameFetchFailed {
        /// Frame URL
        url: String,
        /// HTTP status
        status: u16,
    },

    /// Topology request failed or returned an unusable body
    #[error("Failed to fetch faces: {0}")]
    TopologyFetchFailed(String),

    /// HTTP client error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-HTTP transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The operation was cancelled by its caller
    #[error("Operation cancelled")]
    Cancelled,
}

fn status_text(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no response".to_string(),
    }
}

impl ReplayIoError {
    /// Whether this error only reports a caller-side cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for IO operations
pub type Result<T> = std::result::Result<T, ReplayIoError>;
