//! Batched frame preloading
//!
//! Frames are fetched in fixed-size batches: every request of a batch runs
//! concurrently and the whole batch settles before the next one starts, so
//! progress only ever grows. Failed frames are logged and skipped.
//! Each load publishes its progress on its own `watch` channel; a superseded
//! load keeps writing to a channel nobody reads, so it can never overwrite the
//! state of the load that replaced it.

use crate::MediaError;
use futures::future::join_all;
use replay_core::MeshFrame;
use replay_io::{load_frame, BackendClient, ReplayIoError};
use std::collections::HashMap;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Requests issued concurrently per batch
pub const BATCH_SIZE: usize = 5;

/// Progress of one preload operation
#[derive(Debug, Clone, Default)]
pub struct PreloadState {
    /// Decoded frames keyed by source URL
    pub loaded_frames: HashMap<String, MeshFrame>,
    /// Attempted URLs as a percentage of the total
    pub percent_complete: f32,
    /// Whether batches are still outstanding
    pub is_loading: bool,
    /// Set when the load failed as a whole
    pub last_error: Option<String>,
    /// Set when the load was cancelled before finishing
    pub cancelled: bool,
    /// URLs requested
    pub total: usize,
    /// URLs whose request has settled
    pub attempted: usize,
}

impl PreloadState {
    fn started(total: usize) -> Self {
        Self {
            is_loading: total > 0,
            total,
            ..Default::default()
        }
    }

    /// Number of frames decoded so far
    pub fn loaded_count(&self) -> usize {
        self.loaded_frames.len()
    }

    /// Decoded frame for `url`
    pub fn frame(&self, url: &str) -> Option<&MeshFrame> {
        self.loaded_frames.get(url)
    }

    /// Whether the load ran to completion
    pub fn is_finished(&self) -> bool {
        !self.is_loading && !self.cancelled
    }
}

/// Fetch and decode `urls` batch by batch, publishing progress after every batch
///
/// Returns the final state. Cancellation stops before the next batch and aborts
/// the requests of the current one; aborted requests are not failures.
pub async fn preload_frames(
    client: &BackendClient,
    urls: &[String],
    cancel: &CancellationToken,
    progress: &watch::Sender<PreloadState>,
) -> PreloadState {
    let mut state = PreloadState::started(urls.len());

    if urls.is_empty() {
        progress.send_replace(state.clone());
        return state;
    }

    info!("Starting to load {} frames", urls.len());
    debug!("First URL: {}", urls[0]);
    progress.send_replace(state.clone());

    for batch in urls.chunks(BATCH_SIZE) {
        if cancel.is_cancelled() {
            state.cancelled = true;
            break;
        }

        let results = join_all(batch.iter().map(|url| async move {
            let result = load_frame(client, url, cancel).await;
            (url, result)
        }))
        .await;

        let mut aborted = false;
        for (url, result) in results {
            match result {
                Ok(frame) => {
                    state.loaded_frames.insert(url.clone(), frame);
                }
                Err(ReplayIoError::Cancelled) => aborted = true,
                Err(e) => warn!("Failed to load frame {}: {}", url, e),
            }
        }

        if aborted {
            state.cancelled = true;
            break;
        }

        state.attempted += batch.len();
        state.percent_complete = state.attempted as f32 / state.total as f32 * 100.0;
        progress.send_replace(state.clone());
    }

    state.is_loading = false;
    if state.cancelled {
        debug!(
            "Preload cancelled after {} of {} frames",
            state.attempted, state.total
        );
    } else if state.loaded_frames.is_empty() {
        state.last_error = Some(MediaError::AllFramesFailed.to_string());
    } else {
        info!("Loaded {} of {} frames", state.loaded_count(), state.total);
    }

    progress.send_replace(state.clone());
    state
}

struct ActiveLoad {
    urls: Vec<String>,
    cancel: CancellationToken,
    state: watch::Receiver<PreloadState>,
    task: Option<JoinHandle<PreloadState>>,
}

/// Owns the current preload and replaces it when a new URL set is requested
pub struct FramePreloader {
    client: BackendClient,
    runtime: Handle,
    active: Option<ActiveLoad>,
}

impl FramePreloader {
    /// Preloader spawning its loads on `runtime`
    pub fn new(client: BackendClient, runtime: Handle) -> Self {
        Self {
            client,
            runtime,
            active: None,
        }
    }

    /// Start loading `urls`, cancelling any previous load
    ///
    /// Requesting the URL set that is already loading or loaded keeps the
    /// current load.
    pub fn start(&mut self, urls: Vec<String>) -> watch::Receiver<PreloadState> {
        if let Some(active) = &self.active {
            if active.urls == urls && !active.cancel.is_cancelled() {
                return active.state.clone();
            }
        }
        self.spawn(urls)
    }

    /// Restart the last load from scratch
    pub fn reload(&mut self) -> Option<watch::Receiver<PreloadState>> {
        let urls = self.active.as_ref()?.urls.clone();
        Some(self.spawn(urls))
    }

    /// Cancel the current load, if any
    pub fn cancel(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }

    /// Latest published state of the current load
    pub fn state(&self) -> PreloadState {
        self.active
            .as_ref()
            .map(|active| active.state.borrow().clone())
            .unwrap_or_default()
    }

    /// URLs of the current load
    pub fn urls(&self) -> &[String] {
        self.active
            .as_ref()
            .map(|active| active.urls.as_slice())
            .unwrap_or(&[])
    }

    /// Wait for the current load to finish and return its final state
    pub async fn wait(&mut self) -> Option<PreloadState> {
        let active = self.active.as_mut()?;
        if let Some(task) = active.task.take() {
            if let Err(e) = task.await {
                warn!("Preload task ended abnormally: {}", e);
            }
        }
        Some(active.state.borrow().clone())
    }

    fn spawn(&mut self, urls: Vec<String>) -> watch::Receiver<PreloadState> {
        self.cancel();

        let (tx, rx) = watch::channel(PreloadState::started(urls.len()));
        let cancel = CancellationToken::new();
        let task = self.runtime.spawn({
            let client = self.client.clone();
            let urls = urls.clone();
            let cancel = cancel.clone();
            async move { preload_frames(&client, &urls, &cancel, &tx).await }
        });

        self.active = Some(ActiveLoad {
            urls,
            cancel,
            state: rx.clone(),
            task: Some(task),
        });
        rx
    }
}

impl Drop for FramePreloader {
    fn drop(&mut self) {
        self.cancel();
    }
}
