//! Motion Replay - SMPL body motion playback
//!
//! Loads a session document, lets the user pick an exercise and one of its
//! recorded takes, streams the frames from the trainer backend and plays them
//! back in a window or headless.

mod cli;
mod headless;
mod logging_setup;
mod viewer;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{replay_options, Cli};
use replay_core::{Session, UserConfig};
use replay_io::{BackendClient, HttpTransport, TopologyCache};
use replay_media::ReplayOrchestrator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

fn print_listing(session: &Session) {
    println!("{}", session.header());
    let exercises = session.exercises_with_motion();
    if exercises.is_empty() {
        println!("No motion data available");
        return;
    }
    for (i, exercise) in exercises.iter().enumerate() {
        println!("[{}] {}", i, exercise.label());
        for (j, folder) in exercise.gcs_folders.iter().enumerate() {
            println!("    [{}] {}  {}", j, folder.label(j), folder.path);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = UserConfig::load();
    cli.apply_to(&mut config);

    let session_path = cli
        .session_path(&config)
        .context("No session file given (use --session)")?;

    let _log_guard = logging_setup::init(&config.log, Some(&session_path))?;

    info!("==========================================");
    info!("===   Motion Replay Session Started    ===");
    info!("==========================================");

    let session = Session::load(&session_path)
        .with_context(|| format!("Failed to read session {:?}", session_path))?;
    info!("{}", session.header());

    config.add_recent_session(&session_path.to_string_lossy());
    if let Err(e) = config.save() {
        warn!("Failed to save user config: {}", e);
    }

    if cli.list {
        print_listing(&session);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("replay-io")
        .build()
        .context("Failed to start async runtime")?;

    let transport = match config.connect_timeout_secs {
        Some(secs) => HttpTransport::with_connect_timeout(Duration::from_secs(secs))?,
        None => HttpTransport::new(),
    };
    let client = BackendClient::new(Arc::new(transport), config.api_base.clone(), cli.token.clone());
    info!("Backend: {:?}", client);

    let mut orchestrator = ReplayOrchestrator::new(
        &session,
        client,
        TopologyCache::global(),
        runtime.handle().clone(),
        replay_options(&config),
    )?;
    orchestrator.select(cli.exercise, cli.recording)?;

    if cli.headless {
        let report = runtime.block_on(headless::run(&mut orchestrator))?;
        println!(
            "Played {} of {} frames ({} loaded, {} missing)",
            report.frames_shown, report.total_frames, report.loaded_frames, report.missing_frames
        );
        return Ok(());
    }

    viewer::run(orchestrator, config)
}
