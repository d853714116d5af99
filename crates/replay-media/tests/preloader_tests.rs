use async_trait::async_trait;
use replay_io::{BackendClient, BackendTransport, ReplayIoError, TransportResponse};
use replay_media::{preload_frames, FramePreloader, MediaError, PreloadState, BATCH_SIZE};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

fn frame_bytes(seed: f32) -> Vec<u8> {
    [seed, seed + 1.0, seed + 2.0]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

fn urls(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("http://backend/frame_{:03}.bin", i))
        .collect()
}

/// In-process backend that tracks request concurrency
#[derive(Default)]
struct FakeBackend {
    delay: Duration,
    failing: HashSet<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
    log: Mutex<Vec<(String, &'static str)>>,
}

impl FakeBackend {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    fn failing(mut self, urls: &[String]) -> Self {
        self.failing = urls.iter().cloned().collect();
        self
    }

    fn position(&self, url: &str, event: &'static str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .position(|(u, e)| u == url && *e == event)
            .unwrap()
    }
}

#[async_trait]
impl BackendTransport for FakeBackend {
    async fn get(&self, url: &str, _token: Option<&str>) -> replay_io::Result<TransportResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.log.lock().unwrap().push((url.to_string(), "start"));

        tokio::time::sleep(self.delay).await;

        self.log.lock().unwrap().push((url.to_string(), "end"));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(url) {
            return Ok(TransportResponse {
                status: 500,
                body: Vec::new(),
            });
        }
        Ok(TransportResponse {
            status: 200,
            body: frame_bytes(url.len() as f32),
        })
    }
}

fn client(backend: Arc<FakeBackend>) -> BackendClient {
    BackendClient::new(backend, "http://backend", Some("token".into()))
}

#[tokio::test]
async fn test_batches_settle_in_order() {
    let backend = Arc::new(FakeBackend::new(Duration::from_millis(20)));
    let urls = urls(12);
    let (tx, mut rx) = watch::channel(PreloadState::default());

    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            seen.push(rx.borrow_and_update().percent_complete);
        }
        seen
    });

    let state = preload_frames(
        &client(backend.clone()),
        &urls,
        &CancellationToken::new(),
        &tx,
    )
    .await;
    drop(tx);
    let seen = observer.await.unwrap();

    assert_eq!(state.loaded_count(), 12);
    assert!(!state.is_loading);
    assert_eq!(state.percent_complete, 100.0);
    assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), BATCH_SIZE);

    // Progress never decreases and only takes batch-boundary values
    let boundaries = [0.0, 5.0 / 12.0 * 100.0, 10.0 / 12.0 * 100.0, 100.0];
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    for value in &seen {
        assert!(boundaries.iter().any(|b| (b - value).abs() < 1e-3));
    }

    // Batch 1 starts only after every request of batch 0 has ended
    let last_end_of_first = urls[..5]
        .iter()
        .map(|u| backend.position(u, "end"))
        .max()
        .unwrap();
    let first_start_of_second = urls[5..10]
        .iter()
        .map(|u| backend.position(u, "start"))
        .min()
        .unwrap();
    assert!(last_end_of_first < first_start_of_second);
}

#[tokio::test]
async fn test_partial_failures_are_skipped() {
    let urls = urls(10);
    let backend = Arc::new(FakeBackend::new(Duration::ZERO).failing(&urls[3..5]));
    let (tx, _rx) = watch::channel(PreloadState::default());

    let state = preload_frames(&client(backend), &urls, &CancellationToken::new(), &tx).await;

    assert_eq!(state.loaded_count(), 8);
    assert_eq!(state.last_error, None);
    assert!(state.frame(&urls[3]).is_none());
    assert!(state.frame(&urls[9]).is_some());
    assert_eq!(state.percent_complete, 100.0);
}

#[tokio::test]
async fn test_total_failure_sets_error() {
    let urls = urls(7);
    let backend = Arc::new(FakeBackend::new(Duration::ZERO).failing(&urls));
    let (tx, rx) = watch::channel(PreloadState::default());

    let state = preload_frames(&client(backend), &urls, &CancellationToken::new(), &tx).await;

    assert_eq!(state.loaded_count(), 0);
    assert_eq!(
        state.last_error.as_deref(),
        Some("Failed to load any frames")
    );
    assert_eq!(
        rx.borrow().last_error,
        Some(MediaError::AllFramesFailed.to_string())
    );
}

#[tokio::test]
async fn test_empty_url_list_completes_immediately() {
    let backend = Arc::new(FakeBackend::new(Duration::ZERO));
    let (tx, _rx) = watch::channel(PreloadState::default());

    let state = preload_frames(&client(backend.clone()), &[], &CancellationToken::new(), &tx).await;

    assert!(!state.is_loading);
    assert_eq!(state.percent_complete, 0.0);
    assert_eq!(state.last_error, None);
    assert!(state.is_finished());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancellation_is_not_a_failure() {
    let backend = Arc::new(FakeBackend::new(Duration::from_millis(500)));
    let cancel = CancellationToken::new();
    let (tx, _rx) = watch::channel(PreloadState::default());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let state = preload_frames(&client(backend.clone()), &urls(12), &cancel, &tx).await;

    assert!(state.cancelled);
    assert!(!state.is_loading);
    assert_eq!(state.last_error, None);
    assert_eq!(state.loaded_count(), 0);
    // Only the first batch was ever issued
    assert_eq!(backend.calls.load(Ordering::SeqCst), BATCH_SIZE);
}

#[tokio::test]
async fn test_cancelled_error_is_reported_by_loader() {
    let backend = Arc::new(FakeBackend::new(Duration::from_secs(5)));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = replay_io::load_frame(&client(backend), "http://backend/x.bin", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ReplayIoError::Cancelled));
}

#[tokio::test]
async fn test_new_url_set_replaces_previous_load() {
    let backend = Arc::new(FakeBackend::new(Duration::from_millis(100)));
    let mut preloader = FramePreloader::new(client(backend.clone()), Handle::current());

    let first = urls(10);
    let second: Vec<String> = (0..3)
        .map(|i| format!("http://backend/other_{}.bin", i))
        .collect();

    let first_rx = preloader.start(first);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second_rx = preloader.start(second.clone());

    let state = preloader.wait().await.unwrap();
    assert_eq!(state.loaded_count(), 3);
    assert!(second.iter().all(|u| state.frame(u).is_some()));
    assert_eq!(preloader.urls(), second.as_slice());
    assert_eq!(second_rx.borrow().loaded_count(), 3);

    // The superseded load wound down without touching the new state
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(first_rx.borrow().cancelled);
    assert_eq!(first_rx.borrow().last_error, None);
    assert_eq!(preloader.state().loaded_count(), 3);
}

#[tokio::test]
async fn test_same_url_set_keeps_current_load() {
    let backend = Arc::new(FakeBackend::new(Duration::ZERO));
    let mut preloader = FramePreloader::new(client(backend.clone()), Handle::current());

    preloader.start(urls(4));
    preloader.wait().await;
    preloader.start(urls(4));
    preloader.wait().await;
    assert_eq!(backend.calls.load(Ordering::SeqCst), 4);

    // Reload always refetches
    preloader.reload();
    let state = preloader.wait().await.unwrap();
    assert_eq!(state.loaded_count(), 4);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 8);
}
