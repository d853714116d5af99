//! Backend URL construction

use replay_core::FolderPath;
use tracing::warn;

/// Route of the shared face topology
pub const TOPOLOGY_ROUTE: &str = "trainer-app/smpl/faces";

fn join(api_base: &str, route: &str) -> String {
    format!("{}/{}", api_base.trim_end_matches('/'), route)
}

/// URL listing the frame filenames of a folder
pub fn listing_url(api_base: &str, path: &FolderPath) -> String {
    join(api_base, &path.family.listing_route(path))
}

/// URL of one frame file
pub fn frame_url(api_base: &str, path: &FolderPath, filename: &str) -> String {
    join(api_base, &path.family.frame_route(path, filename))
}

/// URL of the face topology
pub fn topology_url(api_base: &str) -> String {
    join(api_base, TOPOLOGY_ROUTE)
}

/// Frame URLs for a folder, one per filename and in the same order
///
/// Returns an empty list when there are no filenames or the path does not parse.
pub fn build_frame_urls(api_base: &str, folder_path: &str, filenames: &[String]) -> Vec<String> {
    if filenames.is_empty() {
        return Vec::new();
    }

    let path = match FolderPath::parse(folder_path) {
        Ok(path) => path,
        Err(e) => {
            warn!("Invalid folder path {:?}: {}", folder_path, e);
            return Vec::new();
        }
    };

    filenames
        .iter()
        .map(|name| frame_url(api_base, &path, name))
        .collect()
}
