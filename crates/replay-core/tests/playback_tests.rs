use replay_core::{PlaybackEngine, PlaybackStatus, FRAME_RATE_OPTIONS};
use std::time::{Duration, Instant};

fn engine_at_last_frame(looping: bool) -> (PlaybackEngine, Instant) {
    let mut engine = PlaybackEngine::new(10, looping);
    engine.set_total_frames(5);
    engine.seek(4);
    let start = Instant::now();
    engine.play_at(start);
    (engine, start)
}

#[test]
fn test_loop_wraps_to_first_frame() {
    let (mut engine, start) = engine_at_last_frame(true);
    assert_eq!(engine.current_frame(), 4);

    let advanced = engine.tick(start + Duration::from_millis(100));

    assert_eq!(advanced, Some(0));
    assert_eq!(engine.current_frame(), 0);
    assert!(engine.is_playing());
}

#[test]
fn test_no_loop_stops_at_last_frame() {
    let (mut engine, start) = engine_at_last_frame(false);

    let advanced = engine.tick(start + Duration::from_millis(100));

    assert_eq!(advanced, None);
    assert_eq!(engine.current_frame(), 4);
    assert!(!engine.is_playing());
    assert_eq!(engine.status(), PlaybackStatus::Paused);

    // Further ticks do nothing
    assert_eq!(engine.tick(start + Duration::from_secs(5)), None);
    assert_eq!(engine.current_frame(), 4);
}

#[test]
fn test_manual_seeks_pause_playback() {
    let mut engine = PlaybackEngine::new(24, true);
    engine.set_total_frames(20);

    engine.play();
    engine.seek(7);
    assert_eq!(engine.status(), PlaybackStatus::Paused);
    assert_eq!(engine.current_frame(), 7);

    engine.play();
    engine.step_forward();
    assert_eq!(engine.status(), PlaybackStatus::Paused);
    assert_eq!(engine.current_frame(), 8);

    engine.play();
    engine.step_backward();
    assert_eq!(engine.status(), PlaybackStatus::Paused);
    assert_eq!(engine.current_frame(), 7);

    engine.play();
    engine.reset();
    assert_eq!(engine.status(), PlaybackStatus::Paused);
    assert_eq!(engine.current_frame(), 0);
}

#[test]
fn test_seek_clamps_to_last_frame() {
    let mut engine = PlaybackEngine::new(24, false);
    engine.set_total_frames(10);
    engine.seek(500);
    assert_eq!(engine.current_frame(), 9);
}

#[test]
fn test_steps_are_noops_at_boundaries() {
    let mut engine = PlaybackEngine::new(24, false);
    engine.set_total_frames(3);

    engine.step_backward();
    assert_eq!(engine.current_frame(), 0);

    engine.seek(2);
    engine.step_forward();
    assert_eq!(engine.current_frame(), 2);
}

#[test]
fn test_index_stays_valid_through_a_long_run() {
    let mut engine = PlaybackEngine::new(30, true);
    engine.set_total_frames(7);
    let start = Instant::now();
    engine.play_at(start);

    let interval = engine.frame_interval();
    for i in 1..=100u32 {
        engine.tick(start + interval * i);
        assert!(engine.current_frame() < engine.total_frames());
    }
    assert_eq!(engine.current_frame(), 100 % 7);
}

#[test]
fn test_fps_change_takes_effect_without_moving() {
    let mut engine = PlaybackEngine::new(FRAME_RATE_OPTIONS[0], true);
    engine.set_total_frames(10);
    let start = Instant::now();
    engine.play_at(start);

    engine.set_fps(FRAME_RATE_OPTIONS[2]);
    assert_eq!(engine.current_frame(), 0);
    assert!(engine.is_playing());

    // 1000/30 ms is enough now, though it was not at 12 fps
    assert_eq!(engine.tick(start + Duration::from_millis(34)), Some(1));
}

#[test]
fn test_toggle_requires_frames() {
    let mut engine = PlaybackEngine::default();
    engine.toggle();
    assert_eq!(engine.status(), PlaybackStatus::Stopped);

    engine.set_total_frames(2);
    engine.toggle();
    assert!(engine.is_playing());
    engine.toggle();
    assert_eq!(engine.status(), PlaybackStatus::Paused);
}
