//! Process-wide mesh topology cache
//!
//! The face indices are a property of the rig and identical for every frame
//! and every recording, so they are fetched at most once per process.
//! Callers arriving while the fetch is in flight await the same future.
//! A failed fetch is delivered to every waiting caller and the cache returns
//! to empty, so the next call retries.

use crate::transport::{BackendTransport, HttpTransport};
use crate::urls::topology_url;
use crate::{ReplayIoError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use replay_core::MeshTopology;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome shared by every caller of one fetch
pub type TopologyResult = std::result::Result<Arc<MeshTopology>, Arc<ReplayIoError>>;

type SharedFetch = Shared<BoxFuture<'static, TopologyResult>>;

enum CacheState {
    Empty,
    Loading {
        fetch: SharedFetch,
        generation: u64,
    },
    Ready(Arc<MeshTopology>),
}

struct Inner {
    state: CacheState,
    generation: u64,
}

static GLOBAL: Lazy<Arc<TopologyCache>> =
    Lazy::new(|| Arc::new(TopologyCache::new(Arc::new(HttpTransport::new()))));

#[derive(Debug, Deserialize)]
struct FacesResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<FacesData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FacesData {
    #[serde(default)]
    faces: Option<Vec<Vec<u32>>>,
    #[serde(default)]
    face_count: Option<usize>,
}

/// Single-flight cache of the mesh face topology
pub struct TopologyCache {
    transport: Arc<dyn BackendTransport>,
    inner: Mutex<Inner>,
}

impl TopologyCache {
    /// Independent cache fetching through `transport`
    pub fn new(transport: Arc<dyn BackendTransport>) -> Self {
        Self {
            transport,
            inner: Mutex::new(Inner {
                state: CacheState::Empty,
                generation: 0,
            }),
        }
    }

    /// The process-wide cache
    pub fn global() -> Arc<TopologyCache> {
        GLOBAL.clone()
    }

    /// Cached topology, without fetching
    pub fn peek(&self) -> Option<Arc<MeshTopology>> {
        match &self.inner.lock().state {
            CacheState::Ready(topology) => Some(topology.clone()),
            _ => None,
        }
    }

    /// Whether a fetch is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self.inner.lock().state, CacheState::Loading { .. })
    }

    /// Get the topology, fetching it if no fetch has succeeded yet
    pub async fn get_topology(&self, api_base: &str, token: Option<&str>) -> TopologyResult {
        let (fetch, generation) = {
            let mut inner = self.inner.lock();
            match &inner.state {
                CacheState::Ready(topology) => return Ok(topology.clone()),
                CacheState::Loading { fetch, generation } => {
                    debug!("Joining in-flight topology fetch");
                    (fetch.clone(), *generation)
                }
                CacheState::Empty => {
                    inner.generation += 1;
                    let generation = inner.generation;
                    let fetch = fetch_topology(
                        self.transport.clone(),
                        topology_url(api_base),
                        token.map(str::to_string),
                    )
                    .map(|result| result.map(Arc::new).map_err(Arc::new))
                    .boxed()
                    .shared();
                    inner.state = CacheState::Loading {
                        fetch: fetch.clone(),
                        generation,
                    };
                    (fetch, generation)
                }
            }
        };

        let result = fetch.await;

        let mut inner = self.inner.lock();
        let current = matches!(
            inner.state,
            CacheState::Loading { generation: g, .. } if g == generation
        );
        if current {
            inner.state = match &result {
                Ok(topology) => CacheState::Ready(topology.clone()),
                Err(e) => {
                    error!("Topology fetch failed, will retry on next request: {}", e);
                    CacheState::Empty
                }
            };
        }

        result
    }
}

async fn fetch_topology(
    transport: Arc<dyn BackendTransport>,
    url: String,
    token: Option<String>,
) -> Result<MeshTopology> {
    debug!("Fetching mesh topology from {}", url);
    let response = transport.get(&url, token.as_deref()).await?;
    if !response.is_success() {
        return Err(ReplayIoError::TopologyFetchFailed(format!(
            "{} {}",
            response.status,
            response.text()
        )));
    }

    let body: FacesResponse = response.json()?;
    let data = match body {
        FacesResponse {
            success: true,
            data: Some(data),
        } => data,
        _ => {
            return Err(ReplayIoError::TopologyFetchFailed(
                "backend reported failure".to_string(),
            ))
        }
    };

    let faces = data
        .faces
        .ok_or_else(|| ReplayIoError::TopologyFetchFailed("missing faces".to_string()))?;

    let topology = MeshTopology::from_nested(&faces)?;
    if let Some(count) = data.face_count {
        if count != topology.face_count() {
            warn!(
                "faceCount {} differs from {} faces received",
                count,
                topology.face_count()
            );
        }
    }

    info!("Loaded {} faces", topology.face_count());
    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Blocks every request until released, then answers from a script
    struct GatedTransport {
        calls: AtomicUsize,
        gate: Notify,
        responses: Mutex<Vec<TransportResponse>>,
    }

    impl GatedTransport {
        fn new(responses: Vec<TransportResponse>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Notify::new(),
                responses: Mutex::new(responses),
            })
        }
    }

    #[async_trait]
    impl BackendTransport for GatedTransport {
        async fn get(&self, _url: &str, _token: Option<&str>) -> Result<TransportResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(self.responses.lock().remove(0))
        }
    }

    fn faces_ok() -> TransportResponse {
        TransportResponse {
            status: 200,
            body: br#"{"success":true,"data":{"faces":[[0,1,2],[2,1,3]],"faceCount":2}}"#
                .to_vec(),
        }
    }

    fn server_error() -> TransportResponse {
        TransportResponse {
            status: 500,
            body: b"boom".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_concurrent_failure_is_shared_then_retried() {
        let transport = GatedTransport::new(vec![server_error(), faces_ok()]);
        let cache = Arc::new(TopologyCache::new(transport.clone()));

        let a = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_topology("http://api", None).await }
        });
        let b = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_topology("http://api", None).await }
        });

        while !cache.is_loading() || transport.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        // Let both callers attach before the response arrives
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        transport.gate.notify_one();

        let err_a = a.await.unwrap().unwrap_err();
        let err_b = b.await.unwrap().unwrap_err();
        assert!(Arc::ptr_eq(&err_a, &err_b));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(cache.peek().is_none());

        // The next request retries
        transport.gate.notify_one();
        let topology = cache.get_topology("http://api", None).await.unwrap();
        assert_eq!(topology.face_count(), 2);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert!(cache.peek().is_some());
    }

    #[tokio::test]
    async fn test_ready_cache_does_not_refetch() {
        let transport = GatedTransport::new(vec![faces_ok()]);
        let cache = TopologyCache::new(transport.clone());

        transport.gate.notify_one();
        let first = cache.get_topology("http://api", Some("t")).await.unwrap();
        let second = cache.get_topology("http://api", Some("t")).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }
}
