use proptest::prelude::*;
use replay_core::{CoreError, FolderPath, RecordingFolder, StorageFamily};

#[test]
fn test_parse_current_layout() {
    let path = FolderPath::parse("pose_data/u1/s1/f1").unwrap();
    assert_eq!(path.family, StorageFamily::LayoutB);
    assert_eq!(path.user_id, "u1");
    assert_eq!(path.session_id, "s1");
    assert_eq!(path.folder_name, "f1");
    assert_eq!(path.to_string(), "pose_data/u1/s1/f1");
}

#[test]
fn test_parse_legacy_layout() {
    let path = FolderPath::parse("smpl_data/user/session/take_2").unwrap();
    assert_eq!(path.family, StorageFamily::LayoutA);
    assert_eq!(path.folder_name, "take_2");
}

#[test]
fn test_parse_rejects_short_paths() {
    for input in ["", "bad/path", "pose_data/u1/s1"] {
        assert_eq!(
            FolderPath::parse(input),
            Err(CoreError::MalformedPath(input.to_string())),
            "input {:?}",
            input
        );
    }
}

#[test]
fn test_parse_rejects_unknown_family() {
    assert_eq!(
        FolderPath::parse("raw_data/u1/s1/f1"),
        Err(CoreError::UnsupportedStorageFamily("raw_data".to_string()))
    );
}

#[test]
fn test_parse_ignores_extra_segments() {
    let path = FolderPath::parse("pose_data/u1/s1/f1/extra/more").unwrap();
    assert_eq!(path.folder_name, "f1");
}

#[test]
fn test_recording_folder_from_session_json() {
    let folder: RecordingFolder =
        serde_json::from_str(r#"{ "path": "smpl_data/a/b/c", "frames": 42 }"#).unwrap();
    assert_eq!(folder.frames, 42);
    assert_eq!(folder.file_prefix, None);
    assert_eq!(folder.folder_path().unwrap().session_id, "b");
}

proptest! {
    #[test]
    fn prop_family_tag_round_trips(use_pose in any::<bool>(),
                                   user in "[a-zA-Z0-9_-]{1,12}",
                                   session in "[a-zA-Z0-9_-]{1,12}",
                                   folder in "[a-zA-Z0-9_-]{1,12}") {
        let family = if use_pose { StorageFamily::LayoutB } else { StorageFamily::LayoutA };
        let raw = format!("{}/{}/{}/{}", family.tag(), user, session, folder);
        let parsed = FolderPath::parse(&raw).unwrap();
        prop_assert_eq!(parsed.family, family);
        prop_assert_eq!(StorageFamily::detect(&raw), Some(family));
        prop_assert_eq!(parsed.to_string(), raw);
    }
}
