// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// JSON sidecar export of OBB detections

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::class_name;
use crate::DetectionResult;

/// Shown in the preview when a run produced no OBB record.
pub const NOTHING_DETECTED: &str = "Nothing Detected or its not in OBB format!.";

/// One detected object, in pixels of the source image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub r: f32,
    pub confidence: f32,
    pub class: String,
}

impl DetectionRecord {
    /// JSON has no NaN or infinity; such fields would be written as `null`.
    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.w, self.h, self.r, self.confidence]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// An element of the sidecar array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SidecarEntry {
    Source { image_path: String },
    Detection(DetectionRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarMode {
    /// accumulate records across runs
    Append,
    /// replace the file with `[{"image_path": ..}, records..]` on every run
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Saved {
    Created,
    Appended { total: usize },
    Overwritten,
    Skipped,
}

pub fn records_from(result: &DetectionResult, names: &[String]) -> Vec<DetectionRecord> {
    result
        .obbs()
        .into_iter()
        .flatten()
        .map(|obb| DetectionRecord {
            x: obb.cx(),
            y: obb.cy(),
            w: obb.width(),
            h: obb.height(),
            r: obb.angle(),
            confidence: obb.confidence(),
            class: class_name(names, obb.class_id()),
        })
        .collect()
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8(buf)?)
}

/// Text of the JSON preview box.
pub fn preview(records: &[DetectionRecord]) -> String {
    if records.is_empty() {
        return NOTHING_DETECTED.to_string();
    }
    to_pretty_json(records).unwrap_or_else(|e| format!("failed to render JSON: {}", e))
}

/// Entries currently stored at `path`, empty when the file does not exist.
pub fn load(path: &Path) -> Result<Vec<SidecarEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a JSON array of detections", path.display()))
}

fn write(path: &Path, entries: &[SidecarEntry]) -> Result<()> {
    let text = to_pretty_json(entries)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

pub fn save(
    path: &Path,
    mode: SidecarMode,
    image_path: &Path,
    records: &[DetectionRecord],
) -> Result<Saved> {
    let finite: Vec<DetectionRecord> = records.iter().filter(|r| r.is_finite()).cloned().collect();
    if finite.len() < records.len() {
        log::warn!(
            "⚠️ {} record(s) with non-finite values not saved",
            records.len() - finite.len()
        );
    }
    let records = finite.as_slice();
    let detections = records.iter().cloned().map(SidecarEntry::Detection);
    match mode {
        SidecarMode::Overwrite => {
            let entries: Vec<SidecarEntry> = std::iter::once(SidecarEntry::Source {
                image_path: image_path.display().to_string(),
            })
            .chain(detections)
            .collect();
            write(path, &entries)?;
            log::info!("Inference results saved to {}", path.display());
            Ok(Saved::Overwritten)
        }
        SidecarMode::Append if records.is_empty() => {
            log::info!("No OBB data found. Skipping saving to JSON.");
            Ok(Saved::Skipped)
        }
        SidecarMode::Append if path.exists() => {
            let mut entries = load(path)?;
            entries.extend(detections);
            write(path, &entries)?;
            log::info!("Inference results appended to {}", path.display());
            Ok(Saved::Appended {
                total: entries.len(),
            })
        }
        SidecarMode::Append => {
            write(path, &detections.collect::<Vec<_>>())?;
            log::info!("Inference results saved to {}", path.display());
            Ok(Saved::Created)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObbBox;

    fn record(class: &str) -> DetectionRecord {
        DetectionRecord {
            x: 1.5,
            y: 2.0,
            w: 3.0,
            h: 4.0,
            r: 0.25,
            confidence: 0.5,
            class: class.to_string(),
        }
    }

    #[test]
    fn records_map_class_ids_to_names() {
        let result = DetectionResult::new(Some(vec![
            ObbBox::new(10., 20., 30., 40., 0.5, 1, 0.9),
            ObbBox::new(1., 2., 3., 4., 0.1, 7, 0.85),
        ]));
        let recs = records_from(&result, &["plate".into(), "bolt".into()]);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].class, "bolt");
        assert_eq!(recs[0].x, 10.);
        assert_eq!(recs[0].h, 40.);
        assert_eq!(recs[1].class, "class7");
    }

    #[test]
    fn record_serializes_with_expected_keys() {
        let v = serde_json::to_value(record("bolt")).unwrap();
        let obj = v.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["class", "confidence", "h", "r", "w", "x", "y"]);
        assert_eq!(obj["class"], "bolt");
    }

    #[test]
    fn preview_uses_four_space_indent() {
        let text = preview(&[record("bolt")]);
        assert!(text.starts_with("[\n    {\n        \"x\": 1.5"));
        assert_eq!(preview(&[]), NOTHING_DETECTED);
    }

    #[test]
    fn source_entry_round_trips_untagged() {
        let entries: Vec<SidecarEntry> =
            serde_json::from_str(r#"[{"image_path": "a.jpg"}, {"x":1,"y":2,"w":3,"h":4,"r":0,"confidence":0.9,"class":"p"}]"#)
                .unwrap();
        assert!(matches!(&entries[0], SidecarEntry::Source { image_path } if image_path == "a.jpg"));
        assert!(matches!(&entries[1], SidecarEntry::Detection(r) if r.class == "p"));
    }

    #[test]
    fn non_finite_records_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hasil.json");
        let image = dir.path().join("a.png");

        let mut broken = record("plate");
        broken.r = f32::NAN;
        let mut far = record("bolt");
        far.w = f32::INFINITY;
        assert!(!broken.is_finite() && !far.is_finite());

        let saved = save(&path, SidecarMode::Append, &image, &[broken.clone(), record("plate")]).unwrap();
        assert_eq!(saved, Saved::Created);
        assert_eq!(
            save(&path, SidecarMode::Append, &image, &[far, record("bolt")]).unwrap(),
            Saved::Appended { total: 2 }
        );
        assert!(!std::fs::read_to_string(&path).unwrap().contains("null"));
        assert_eq!(load(&path).unwrap().len(), 2);

        assert_eq!(
            save(&path, SidecarMode::Append, &image, &[broken]).unwrap(),
            Saved::Skipped
        );
    }
}
