// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::fs;

use yolo_obb_panel::sidecar::{self, DetectionRecord, Saved, SidecarEntry, SidecarMode};

fn record(class: &str, x: f32) -> DetectionRecord {
    DetectionRecord {
        x,
        y: 40.0,
        w: 30.0,
        h: 12.0,
        r: 0.25,
        confidence: 0.9,
        class: class.to_string(),
    }
}

#[test]
fn append_keeps_earlier_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hasil.json");
    let image = dir.path().join("a.png");

    let first = vec![record("plate", 1.0), record("bolt", 2.0)];
    assert_eq!(
        sidecar::save(&path, SidecarMode::Append, &image, &first).unwrap(),
        Saved::Created
    );
    assert_eq!(
        sidecar::save(&path, SidecarMode::Append, &image, &[record("plate", 3.0)]).unwrap(),
        Saved::Appended { total: 3 }
    );

    let xs: Vec<f32> = sidecar::load(&path)
        .unwrap()
        .into_iter()
        .filter_map(|e| match e {
            SidecarEntry::Detection(r) => Some(r.x),
            SidecarEntry::Source { .. } => None,
        })
        .collect();
    assert_eq!(xs, vec![1.0, 2.0, 3.0]);
}

#[test]
fn empty_append_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hasil.json");
    let image = dir.path().join("a.png");

    sidecar::save(&path, SidecarMode::Append, &image, &[record("plate", 1.0)]).unwrap();
    let before = fs::read_to_string(&path).unwrap();
    assert_eq!(
        sidecar::save(&path, SidecarMode::Append, &image, &[]).unwrap(),
        Saved::Skipped
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn overwrite_writes_header_even_without_detections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hasil.json");
    let image = dir.path().join("part.jpg");

    sidecar::save(&path, SidecarMode::Append, &image, &[record("plate", 1.0)]).unwrap();
    sidecar::save(&path, SidecarMode::Overwrite, &image, &[]).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("[\n    {\n        \"image_path\""));
    assert_eq!(sidecar::load(&path).unwrap().len(), 1);
}

#[test]
fn corrupt_sidecar_is_not_clobbered() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hasil.json");
    fs::write(&path, "{ not json").unwrap();

    let err = sidecar::save(&path, SidecarMode::Append, &path, &[record("plate", 1.0)]);
    assert!(err.is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
}
