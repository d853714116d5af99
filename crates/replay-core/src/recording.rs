//! Recording folders and storage layouts
//!
//! A recording folder path looks like `{family}/{userId}/{sessionId}/{folder}`.
//! The family tag selects which backend endpoint family serves the frames.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend storage layout for a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageFamily {
    /// Legacy layout, one object per frame (`smpl_data/...`)
    LayoutA,
    /// Current zip-based layout (`pose_data/...`)
    LayoutB,
}

impl StorageFamily {
    /// Path prefix of the legacy layout
    pub const LAYOUT_A_TAG: &'static str = "smpl_data";
    /// Path prefix of the current layout
    pub const LAYOUT_B_TAG: &'static str = "pose_data";

    /// Look up a family by its literal path tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            Self::LAYOUT_A_TAG => Some(Self::LayoutA),
            Self::LAYOUT_B_TAG => Some(Self::LayoutB),
            _ => None,
        }
    }

    /// The literal path tag
    pub fn tag(&self) -> &'static str {
        match self {
            Self::LayoutA => Self::LAYOUT_A_TAG,
            Self::LayoutB => Self::LAYOUT_B_TAG,
        }
    }

    /// Detect the family from a full folder path without validating the rest
    pub fn detect(folder_path: &str) -> Option<Self> {
        let (prefix, _) = folder_path.split_once('/')?;
        Self::from_tag(prefix)
    }

    /// Endpoint segment between `smpl/` and `frames`/`frame` for this family
    fn route_prefix(&self) -> &'static str {
        match self {
            Self::LayoutA => "",
            Self::LayoutB => "pose/",
        }
    }

    /// Relative route of the filename listing for a folder
    pub fn listing_route(&self, path: &FolderPath) -> String {
        format!(
            "trainer-app/smpl/{}frames/{}/{}/{}",
            self.route_prefix(),
            path.user_id,
            path.session_id,
            path.folder_name
        )
    }

    /// Relative route of one frame file in a folder
    pub fn frame_route(&self, path: &FolderPath, filename: &str) -> String {
        format!(
            "trainer-app/smpl/{}frame/{}/{}/{}/{}",
            self.route_prefix(),
            path.user_id,
            path.session_id,
            path.folder_name,
            filename
        )
    }
}

impl fmt::Display for StorageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A parsed recording folder path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderPath {
    /// Storage layout
    pub family: StorageFamily,
    /// Athlete id
    pub user_id: String,
    /// Training session id
    pub session_id: String,
    /// Folder holding one take
    pub folder_name: String,
}

impl FolderPath {
    /// Minimum number of `/`-separated segments
    pub const MIN_SEGMENTS: usize = 4;

    /// Parse a folder path
    ///
    /// Only the first four segments are used; anything after them is ignored.
    pub fn parse(folder_path: &str) -> Result<Self> {
        let parts: Vec<&str> = folder_path.split('/').collect();
        if parts.len() < Self::MIN_SEGMENTS {
            return Err(CoreError::MalformedPath(folder_path.to_string()));
        }

        let family = StorageFamily::from_tag(parts[0])
            .ok_or_else(|| CoreError::UnsupportedStorageFamily(parts[0].to_string()))?;

        Ok(Self {
            family,
            user_id: parts[1].to_string(),
            session_id: parts[2].to_string(),
            folder_name: parts[3].to_string(),
        })
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.family, self.user_id, self.session_id, self.folder_name
        )
    }
}

/// Descriptor of one recorded take of an exercise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingFolder {
    /// Storage path (`{family}/{userId}/{sessionId}/{folder}`)
    pub path: String,
    /// Frame count recorded alongside the path (informational only)
    #[serde(default, alias = "frameCount")]
    pub frames: usize,
    /// Filename prefix, if the recorder stored one
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Zero padding of the frame counter, if the recorder stored one
    #[serde(default, alias = "framePaddingDigits")]
    pub frame_padding: Option<u32>,
}

impl RecordingFolder {
    /// Create a folder descriptor with only path and frame count
    pub fn new(path: impl Into<String>, frames: usize) -> Self {
        Self {
            path: path.into(),
            frames,
            file_prefix: None,
            frame_padding: None,
        }
    }

    /// Parse the storage path
    pub fn folder_path(&self) -> Result<FolderPath> {
        FolderPath::parse(&self.path)
    }

    /// Selector label, `index` is zero-based
    pub fn label(&self, index: usize) -> String {
        format!("Clip {} ({} frames)", index + 1, self.frames)
    }
}

/// Backend-authoritative ordered filename list for one folder
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameManifest {
    /// Storage layout the listing came from
    pub family: Option<StorageFamily>,
    /// Frame filenames in playback order
    pub filenames: Vec<String>,
}

impl FrameManifest {
    /// Create a manifest
    pub fn new(family: StorageFamily, filenames: Vec<String>) -> Self {
        Self {
            family: Some(family),
            filenames,
        }
    }

    /// Number of frames listed
    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    /// Whether nothing was listed
    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_family() {
        assert_eq!(
            StorageFamily::detect("pose_data/u/s/f"),
            Some(StorageFamily::LayoutB)
        );
        assert_eq!(
            StorageFamily::detect("smpl_data/u/s/f"),
            Some(StorageFamily::LayoutA)
        );
        assert_eq!(StorageFamily::detect("other/u/s/f"), None);
        assert_eq!(StorageFamily::detect("pose_data"), None);
    }

    #[test]
    fn test_routes() {
        let path = FolderPath::parse("pose_data/u1/s1/f1").unwrap();
        assert_eq!(
            path.family.listing_route(&path),
            "trainer-app/smpl/pose/frames/u1/s1/f1"
        );
        assert_eq!(
            path.family.frame_route(&path, "a.bin"),
            "trainer-app/smpl/pose/frame/u1/s1/f1/a.bin"
        );

        let legacy = FolderPath::parse("smpl_data/u1/s1/f1").unwrap();
        assert_eq!(
            legacy.family.listing_route(&legacy),
            "trainer-app/smpl/frames/u1/s1/f1"
        );
    }

    #[test]
    fn test_recording_folder_label() {
        let folder = RecordingFolder::new("smpl_data/u/s/f", 120);
        assert_eq!(folder.label(0), "Clip 1 (120 frames)");
    }
}
