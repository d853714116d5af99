//! Windowless playback
//!
//! Resolves and preloads the selected recording, then plays it once from the
//! first frame to the last, logging every frame as it is shown.

use anyhow::{bail, Result};
use replay_media::{ReplayOrchestrator, ReplayPhase};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Summary of one headless run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Frames listed for the recording
    pub total_frames: usize,
    /// Frames that decoded successfully
    pub loaded_frames: usize,
    /// Frames shown, counting the first
    pub frames_shown: usize,
    /// Shown frames whose data was missing
    pub missing_frames: usize,
    /// Index changes reported by the playback engine during the run
    pub frame_changes: usize,
}

/// Load the current selection and play it through once
pub async fn run(orchestrator: &mut ReplayOrchestrator) -> Result<PlaybackReport> {
    if orchestrator.phase() == ReplayPhase::Idle {
        orchestrator.refresh();
    }
    orchestrator.wait_until_settled().await;

    let status = orchestrator.status();
    if let Some(error) = &status.topology_error {
        warn!("Topology unavailable, mesh would render as points: {}", error);
    }
    if status.phase == ReplayPhase::Failed {
        bail!(status
            .error
            .unwrap_or_else(|| "Loading failed".to_string()));
    }

    let total_frames = orchestrator.playback().total_frames();
    let mut report = PlaybackReport {
        total_frames,
        loaded_frames: status.loaded_frames,
        frames_shown: 0,
        missing_frames: 0,
        frame_changes: 0,
    };
    if total_frames == 0 {
        info!("Recording has no frames");
        return Ok(report);
    }

    info!(
        "Playing {} frames at {} fps ({:.1}s)",
        total_frames,
        orchestrator.playback().fps(),
        orchestrator.playback().duration_secs()
    );

    orchestrator.playback_mut().reset();

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    orchestrator
        .playback_mut()
        .on_frame_change(move |index, total| {
            counter.fetch_add(1, Ordering::Relaxed);
            trace!("Frame {} / {}", index + 1, total);
        });

    show(orchestrator, &mut report);
    orchestrator.playback_mut().play_at(Instant::now());

    let mut interval = tokio::time::interval(orchestrator.playback().frame_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    while report.frames_shown < total_frames {
        interval.tick().await;
        if let Some(index) = orchestrator.tick(Instant::now()) {
            if index == 0 {
                // Wrapped around
                break;
            }
            show(orchestrator, &mut report);
        }
        if !orchestrator.playback().is_playing() {
            break;
        }
    }
    orchestrator.playback_mut().pause();
    report.frame_changes = changes.load(Ordering::Relaxed);

    info!(
        "Played {} of {} frames ({} missing)",
        report.frames_shown, report.total_frames, report.missing_frames
    );
    Ok(report)
}

fn show(orchestrator: &ReplayOrchestrator, report: &mut PlaybackReport) {
    report.frames_shown += 1;
    match orchestrator.current_frame() {
        Some(frame) => debug!(
            "{} ({} vertices)",
            orchestrator.playback().frame_label(),
            frame.vertex_count()
        ),
        None => {
            report.missing_frames += 1;
            debug!("{} (not loaded)", orchestrator.playback().frame_label());
        }
    }
}
