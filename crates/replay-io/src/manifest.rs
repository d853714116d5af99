//! Frame filename listing
//!
//! The backend is the only authority on which frame files exist for a folder;
//! filenames are never guessed from the frame count.

use crate::transport::BackendClient;
use crate::urls::listing_url;
use crate::{ReplayIoError, Result};
use replay_core::{FolderPath, FrameManifest};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ListingData>,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    files: Option<Vec<String>>,
}

/// Resolves the ordered frame filenames of a recording folder
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    client: BackendClient,
}

impl ManifestResolver {
    /// Resolver using `client` for requests
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    /// Backend client in use
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// List the frames of `folder_path`
    ///
    /// The path is validated before any request is made.
    pub async fn resolve(
        &self,
        folder_path: &str,
        cancel: &CancellationToken,
    ) -> Result<FrameManifest> {
        let path = FolderPath::parse(folder_path)?;
        let url = listing_url(self.client.api_base(), &path);
        debug!("Listing {} frames: {}", path.family, url);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReplayIoError::Cancelled),
            response = self.client.get(&url) => response,
        };

        let response = response.map_err(|e| ReplayIoError::ManifestFetchFailed {
            status: None,
            body: e.to_string(),
        })?;

        if !response.is_success() {
            return Err(ReplayIoError::ManifestFetchFailed {
                status: Some(response.status),
                body: response.text(),
            });
        }

        let listing: ListingResponse =
            response
                .json()
                .map_err(|e| ReplayIoError::ManifestFetchFailed {
                    status: Some(response.status),
                    body: format!("invalid listing body: {}", e),
                })?;

        let files = match listing {
            ListingResponse {
                success: true,
                data: Some(ListingData { files: Some(files) }),
            } => files,
            _ => {
                warn!("No files in listing response for {}", path);
                return Err(ReplayIoError::ManifestFetchFailed {
                    status: Some(response.status),
                    body: response.text(),
                });
            }
        };

        info!("Received {} frame files for {}", files.len(), path);
        if let (Some(first), Some(last)) = (files.first(), files.last()) {
            debug!("First file: {}, last file: {}", first, last);
        }

        Ok(FrameManifest::new(path.family, files))
    }
}
