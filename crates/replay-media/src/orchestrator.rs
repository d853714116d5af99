//! Replay orchestration
//!
//! Ties the pipeline together for one session: the selected recording is
//! resolved into a frame list, the frames are preloaded, playback is reset to
//! the new length and the shared topology is fetched alongside.
//!
//! Background work runs on a tokio runtime and reports back through channels.
//! The owner drives the orchestrator either synchronously with [`ReplayOrchestrator::poll`]
//! from a render loop, or asynchronously with [`ReplayOrchestrator::next_update`].
//! Every chain carries a generation number; results of a superseded chain are
//! dropped on arrival.

use crate::preloader::{FramePreloader, PreloadState};
use crate::{MediaError, Result};
use replay_core::{
    ExerciseEntry, MeshFrame, MeshTopology, PlaybackEngine, RecordingFolder, RenderMode, Session,
};
use replay_io::{build_frame_urls, BackendClient, ManifestResolver, ReplayIoError, TopologyCache};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Stage of the current chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPhase {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Waiting for the frame listing
    ResolvingManifest,
    /// Frames are being fetched
    Loading,
    /// All batches settled with at least one frame, or the folder is empty
    Ready,
    /// Listing or every frame failed
    Failed,
}

/// Snapshot published for the UI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayStatus {
    /// Stage of the current chain
    pub phase: ReplayPhase,
    /// Preload progress in percent
    pub progress: f32,
    /// Frames decoded
    pub loaded_frames: usize,
    /// Frames listed
    pub total_frames: usize,
    /// Listing or preload failure
    pub error: Option<String>,
    /// Topology failure; rendering falls back to points
    pub topology_error: Option<String>,
    /// e.g. `Frame 3 / 90`
    pub frame_label: String,
    /// Whether playback is running
    pub is_playing: bool,
}

/// Playback and display defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Frames per second
    pub fps: u32,
    /// Wrap at the end
    pub looping: bool,
    /// Start playing once frames are loaded
    pub autoplay: bool,
    /// Requested drawing mode
    pub render_mode: RenderMode,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            fps: replay_core::DEFAULT_FPS,
            looping: true,
            autoplay: false,
            render_mode: RenderMode::Solid,
        }
    }
}

enum ChainEvent {
    Manifest {
        generation: u64,
        result: std::result::Result<Vec<String>, ReplayIoError>,
    },
    Topology(replay_io::TopologyResult),
}

/// Selection state and pipeline driver for one session
pub struct ReplayOrchestrator {
    client: BackendClient,
    resolver: ManifestResolver,
    topology_cache: Arc<TopologyCache>,
    runtime: Handle,

    exercises: Vec<ExerciseEntry>,
    selected_exercise: usize,
    selected_recording: usize,

    generation: u64,
    chain_cancel: Option<CancellationToken>,
    events_tx: mpsc::UnboundedSender<ChainEvent>,
    events_rx: mpsc::UnboundedReceiver<ChainEvent>,

    filenames: Vec<String>,
    frame_urls: Vec<String>,
    preloader: FramePreloader,
    preload_rx: Option<watch::Receiver<PreloadState>>,
    preload: PreloadState,

    topology: Option<Arc<MeshTopology>>,
    topology_pending: bool,
    topology_error: Option<String>,

    playback: PlaybackEngine,
    options: ReplayOptions,
    render_mode: RenderMode,
    phase: ReplayPhase,
    error: Option<String>,
    status_tx: watch::Sender<ReplayStatus>,
}

impl ReplayOrchestrator {
    /// Orchestrator over the exercises of `session` that carry recordings
    pub fn new(
        session: &Session,
        client: BackendClient,
        topology_cache: Arc<TopologyCache>,
        runtime: Handle,
        options: ReplayOptions,
    ) -> Result<Self> {
        let exercises = session.exercises_with_motion();
        if exercises.is_empty() {
            return Err(MediaError::NoRecordings);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(ReplayStatus::default());

        Ok(Self {
            resolver: ManifestResolver::new(client.clone()),
            preloader: FramePreloader::new(client.clone(), runtime.clone()),
            client,
            topology_cache,
            runtime,
            exercises,
            selected_exercise: 0,
            selected_recording: 0,
            generation: 0,
            chain_cancel: None,
            events_tx,
            events_rx,
            filenames: Vec::new(),
            frame_urls: Vec::new(),
            preload_rx: None,
            preload: PreloadState::default(),
            topology: None,
            topology_pending: false,
            topology_error: None,
            playback: PlaybackEngine::new(options.fps, options.looping),
            options,
            render_mode: options.render_mode,
            phase: ReplayPhase::Idle,
            error: None,
            status_tx,
        })
    }

    // === Selection ===

    /// Exercises that carry recordings
    pub fn exercises(&self) -> &[ExerciseEntry] {
        &self.exercises
    }

    /// Selector labels of the exercises
    pub fn exercise_labels(&self) -> Vec<String> {
        self.exercises.iter().map(ExerciseEntry::label).collect()
    }

    /// Selector labels of the recordings of the selected exercise
    pub fn recording_labels(&self) -> Vec<String> {
        self.selected_exercise()
            .gcs_folders
            .iter()
            .enumerate()
            .map(|(i, folder)| folder.label(i))
            .collect()
    }

    /// Selected exercise
    pub fn selected_exercise(&self) -> &ExerciseEntry {
        &self.exercises[self.selected_exercise]
    }

    /// Index of the selected exercise
    pub fn selected_exercise_index(&self) -> usize {
        self.selected_exercise
    }

    /// Index of the selected recording within the exercise
    pub fn selected_recording_index(&self) -> usize {
        self.selected_recording
    }

    /// Selected recording folder
    pub fn selected_folder(&self) -> Option<&RecordingFolder> {
        self.selected_exercise()
            .gcs_folders
            .get(self.selected_recording)
    }

    /// Select an exercise; the recording selection resets to the first take
    pub fn select_exercise(&mut self, index: usize) -> Result<()> {
        if index >= self.exercises.len() {
            return Err(MediaError::SelectionOutOfRange {
                kind: "exercise",
                index,
                len: self.exercises.len(),
            });
        }
        if index != self.selected_exercise {
            self.selected_exercise = index;
            self.selected_recording = 0;
        }
        self.refresh();
        Ok(())
    }

    /// Select a recording of the current exercise
    pub fn select_recording(&mut self, index: usize) -> Result<()> {
        let len = self.selected_exercise().gcs_folders.len();
        if index >= len {
            return Err(MediaError::SelectionOutOfRange {
                kind: "recording",
                index,
                len,
            });
        }
        self.selected_recording = index;
        self.refresh();
        Ok(())
    }

    /// Select an exercise and one of its recordings, starting a single chain
    pub fn select(&mut self, exercise: usize, recording: usize) -> Result<()> {
        let len = self
            .exercises
            .get(exercise)
            .map(|e| e.gcs_folders.len())
            .ok_or(MediaError::SelectionOutOfRange {
                kind: "exercise",
                index: exercise,
                len: self.exercises.len(),
            })?;
        if recording >= len {
            return Err(MediaError::SelectionOutOfRange {
                kind: "recording",
                index: recording,
                len,
            });
        }
        self.selected_exercise = exercise;
        self.selected_recording = recording;
        self.refresh();
        Ok(())
    }

    // === Chain ===

    /// Restart the chain for the current selection, discarding in-flight work
    pub fn refresh(&mut self) {
        if let Some(cancel) = self.chain_cancel.take() {
            cancel.cancel();
        }
        self.preloader.cancel();
        self.generation += 1;

        self.filenames.clear();
        self.frame_urls.clear();
        self.preload_rx = None;
        self.preload = PreloadState::default();
        self.error = None;
        self.playback.load_sequence(0);

        self.ensure_topology();

        let Some(folder) = self.selected_folder().cloned() else {
            self.phase = ReplayPhase::Idle;
            self.publish();
            return;
        };

        info!(
            "Loading {} / {}",
            self.selected_exercise().name,
            folder.label(self.selected_recording)
        );

        let cancel = CancellationToken::new();
        self.chain_cancel = Some(cancel.clone());
        self.phase = ReplayPhase::ResolvingManifest;
        self.publish();

        let generation = self.generation;
        let resolver = self.resolver.clone();
        let events = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = resolver
                .resolve(&folder.path, &cancel)
                .await
                .map(|manifest| manifest.filenames);
            if matches!(result, Err(ReplayIoError::Cancelled)) {
                return;
            }
            let _ = events.send(ChainEvent::Manifest { generation, result });
        });
    }

    /// Retry whatever failed last
    pub fn retry(&mut self) {
        if self.topology.is_none() && !self.topology_pending {
            self.ensure_topology();
        }
        match self.phase {
            ReplayPhase::Failed if !self.frame_urls.is_empty() => {
                info!("Retrying frame preload");
                if let Some(rx) = self.preloader.reload() {
                    self.preload_rx = Some(rx);
                    self.preload = PreloadState::default();
                    self.error = None;
                    self.phase = ReplayPhase::Loading;
                    self.publish();
                }
            }
            ReplayPhase::Failed | ReplayPhase::Idle => self.refresh(),
            _ => {}
        }
    }

    fn ensure_topology(&mut self) {
        if self.topology.is_some() || self.topology_pending {
            return;
        }
        if let Some(topology) = self.topology_cache.peek() {
            self.topology = Some(topology);
            return;
        }

        self.topology_pending = true;
        let cache = self.topology_cache.clone();
        let api_base = self.client.api_base().to_string();
        let token = self.client.token().map(str::to_string);
        let events = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = cache.get_topology(&api_base, token.as_deref()).await;
            let _ = events.send(ChainEvent::Topology(result));
        });
    }

    // === Updates ===

    /// Apply every pending background result without blocking
    ///
    /// Returns whether anything changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;

        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
            changed = true;
        }

        if let Some(rx) = &mut self.preload_rx {
            match rx.has_changed() {
                Ok(true) => {
                    let state = rx.borrow_and_update().clone();
                    self.apply_preload(state);
                    changed = true;
                }
                Ok(false) => {}
                Err(_) => {
                    // Sender gone: the final state is already in the channel
                    let state = rx.borrow_and_update().clone();
                    self.close_preload(state);
                    changed = true;
                }
            }
        }

        changed
    }

    /// Wait for the next background result and apply it
    ///
    /// Returns `false` when nothing is outstanding.
    pub async fn next_update(&mut self) -> bool {
        if !self.has_pending_work() {
            return false;
        }

        enum Update {
            Event(Option<ChainEvent>),
            Preload(bool),
        }

        let update = {
            let preload_rx = self.preload_rx.as_mut();
            tokio::select! {
                event = self.events_rx.recv() => Update::Event(event),
                changed = preload_changed(preload_rx) => Update::Preload(changed),
            }
        };

        match update {
            Update::Event(Some(event)) => self.apply_event(event),
            Update::Event(None) => return false,
            Update::Preload(open) => {
                if let Some(rx) = &mut self.preload_rx {
                    let state = rx.borrow_and_update().clone();
                    if open {
                        self.apply_preload(state);
                    } else {
                        self.close_preload(state);
                    }
                }
            }
        }
        true
    }

    /// Wait until the chain and the topology fetch have both settled
    pub async fn wait_until_settled(&mut self) {
        while !self.is_settled() {
            if !self.next_update().await {
                break;
            }
        }
    }

    /// Whether no background work is outstanding
    pub fn is_settled(&self) -> bool {
        !self.has_pending_work()
    }

    fn has_pending_work(&self) -> bool {
        self.topology_pending
            || matches!(
                self.phase,
                ReplayPhase::ResolvingManifest | ReplayPhase::Loading
            )
    }

    fn apply_event(&mut self, event: ChainEvent) {
        match event {
            ChainEvent::Manifest { generation, .. } if generation != self.generation => {
                debug!("Dropping listing of superseded chain {}", generation);
            }
            ChainEvent::Manifest {
                result: Ok(filenames),
                ..
            } => self.apply_manifest(filenames),
            ChainEvent::Manifest { result: Err(e), .. } => {
                warn!("Frame listing failed: {}", e);
                self.error = Some(e.to_string());
                self.phase = ReplayPhase::Failed;
                self.publish();
            }
            ChainEvent::Topology(result) => {
                self.topology_pending = false;
                match result {
                    Ok(topology) => {
                        self.topology = Some(topology);
                        self.topology_error = None;
                    }
                    Err(e) => {
                        warn!("No topology, rendering as point cloud: {}", e);
                        self.topology_error = Some(e.to_string());
                    }
                }
                self.publish();
            }
        }
    }

    fn apply_manifest(&mut self, filenames: Vec<String>) {
        let Some(folder) = self.selected_folder() else {
            return;
        };
        let urls = build_frame_urls(self.client.api_base(), &folder.path, &filenames);
        self.filenames = filenames;
        self.frame_urls = urls;
        self.playback.load_sequence(self.frame_urls.len());

        if self.frame_urls.is_empty() {
            info!("Recording has no frames");
            self.phase = ReplayPhase::Ready;
            self.publish();
            return;
        }

        self.preload_rx = Some(self.preloader.start(self.frame_urls.clone()));
        self.phase = ReplayPhase::Loading;
        self.publish();
    }

    fn apply_preload(&mut self, state: PreloadState) {
        if state.cancelled {
            return;
        }
        let finished = !state.is_loading && self.phase == ReplayPhase::Loading;
        self.preload = state;

        if finished {
            if let Some(message) = &self.preload.last_error {
                self.error = Some(message.clone());
                self.phase = ReplayPhase::Failed;
            } else {
                self.phase = ReplayPhase::Ready;
                if self.options.autoplay {
                    self.playback.play();
                }
            }
        }
        self.publish();
    }

    fn close_preload(&mut self, state: PreloadState) {
        self.preload_rx = None;
        if state.is_loading && !state.cancelled && self.phase == ReplayPhase::Loading {
            warn!("Preload task stopped before finishing");
            self.preload = state;
            self.error = Some("Preload stopped before finishing".to_string());
            self.phase = ReplayPhase::Failed;
            self.publish();
            return;
        }
        self.apply_preload(state);
    }

    // === Playback and display ===

    /// Advance playback; returns the new index when it changed
    pub fn tick(&mut self, now: Instant) -> Option<usize> {
        let advanced = self.playback.tick(now);
        if advanced.is_some() || self.status_tx.borrow().is_playing != self.playback.is_playing() {
            self.publish();
        }
        advanced
    }

    /// Playback engine
    pub fn playback(&self) -> &PlaybackEngine {
        &self.playback
    }

    /// Playback engine, for transport controls
    ///
    /// Call [`ReplayOrchestrator::publish`] afterwards to refresh the status.
    pub fn playback_mut(&mut self) -> &mut PlaybackEngine {
        &mut self.playback
    }

    /// Decoded frame at the current index, if it has arrived
    pub fn current_frame(&self) -> Option<&MeshFrame> {
        let url = self.frame_urls.get(self.playback.current_frame())?;
        self.preload.frame(url)
    }

    /// Shared topology, if loaded
    pub fn topology(&self) -> Option<&Arc<MeshTopology>> {
        self.topology.as_ref()
    }

    /// Frame filenames of the current chain
    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    /// Frame URLs of the current chain
    pub fn frame_urls(&self) -> &[String] {
        &self.frame_urls
    }

    /// Latest preload state
    pub fn preload_state(&self) -> &PreloadState {
        &self.preload
    }

    /// Stage of the current chain
    pub fn phase(&self) -> ReplayPhase {
        self.phase
    }

    /// Requested drawing mode
    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    /// Drawing mode actually usable: points when there is no topology
    pub fn effective_render_mode(&self) -> RenderMode {
        if self.topology.is_none() {
            RenderMode::Points
        } else {
            self.render_mode
        }
    }

    /// Change the requested drawing mode
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.render_mode = mode;
    }

    /// Step to the next drawing mode
    pub fn cycle_render_mode(&mut self) -> RenderMode {
        self.render_mode = self.render_mode.next();
        self.render_mode
    }

    /// Current status snapshot
    pub fn status(&self) -> ReplayStatus {
        self.status_tx.borrow().clone()
    }

    /// Receiver of status snapshots
    pub fn subscribe(&self) -> watch::Receiver<ReplayStatus> {
        self.status_tx.subscribe()
    }

    /// Publish a fresh status snapshot
    pub fn publish(&self) {
        let status = ReplayStatus {
            phase: self.phase,
            progress: self.preload.percent_complete,
            loaded_frames: self.preload.loaded_count(),
            total_frames: self.frame_urls.len(),
            error: self.error.clone(),
            topology_error: self.topology_error.clone(),
            frame_label: self.playback.frame_label(),
            is_playing: self.playback.is_playing(),
        };
        self.status_tx.send_replace(status);
    }
}

impl Drop for ReplayOrchestrator {
    fn drop(&mut self) {
        if let Some(cancel) = self.chain_cancel.take() {
            cancel.cancel();
        }
    }
}

async fn preload_changed(rx: Option<&mut watch::Receiver<PreloadState>>) -> bool {
    match rx {
        Some(rx) => rx.changed().await.is_ok(),
        None => std::future::pending().await,
    }
}
