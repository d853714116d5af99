//! Single frame fetching

use crate::decoder::decode;
use crate::transport::BackendClient;
use crate::{ReplayIoError, Result};
use replay_core::MeshFrame;
use tokio_util::sync::CancellationToken;

/// Fetch and decode one frame
pub async fn fetch_frame(client: &BackendClient, url: &str) -> Result<MeshFrame> {
    let response = client.get(url).await?;
    if !response.is_success() {
        return Err(ReplayIoError::FrameFetchFailed {
            url: url.to_string(),
            status: response.status,
        });
    }
    Ok(decode(&response.body))
}

/// Fetch and decode one frame, giving up when `cancel` fires
pub async fn load_frame(
    client: &BackendClient,
    url: &str,
    cancel: &CancellationToken,
) -> Result<MeshFrame> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ReplayIoError::Cancelled),
        frame = fetch_frame(client, url) => frame,
    }
}
