// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Main detector panel: image import, camera snapshot, detection toggle

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::still::Still;
use super::ModelFactory;
use crate::annotate::CanvasFrame;
use crate::input::{camera_label, port_from_label, scan_fixed, CameraBackend, FrameSource};
use crate::sidecar::{Saved, SidecarMode};
use crate::Args;

pub struct DetectorPanel {
    still: Still,
    backend: Box<dyn CameraBackend>,
    cameras: Vec<String>,
    selected_camera: Option<String>,
    camera: Option<Box<dyn FrameSource>>,
}

impl DetectorPanel {
    pub fn new(args: Args, backend: Box<dyn CameraBackend>, factory: ModelFactory) -> Self {
        let cameras = Self::scan(backend.as_ref(), args.max_ports);
        Self {
            still: Still::new(args, factory, SidecarMode::Append),
            backend,
            cameras,
            selected_camera: None,
            camera: None,
        }
    }

    fn scan(backend: &dyn CameraBackend, max_ports: usize) -> Vec<String> {
        scan_fixed(backend, max_ports)
            .into_iter()
            .map(camera_label)
            .collect()
    }

    pub fn cameras(&self) -> &[String] {
        &self.cameras
    }

    /// Probes the ports again, the open camera (if any) is left alone.
    pub fn refresh_cameras(&mut self) {
        self.cameras = Self::scan(self.backend.as_ref(), self.still.args.max_ports);
        if let Some(port) = self.camera_port() {
            let label = camera_label(port);
            if !self.cameras.contains(&label) {
                self.cameras.push(label);
            }
        }
    }

    /// Shows `path`; an open camera is released and the selector cleared.
    pub fn select_image(&mut self, path: &Path) -> Result<()> {
        if self.camera.is_some() {
            self.release_camera();
            self.selected_camera = None;
        }
        self.still.image_path = Some(path.to_path_buf());
        self.display_image()
    }

    /// Opens the camera behind a selector label, releasing the previous one.
    pub fn select_camera(&mut self, label: &str) -> Result<()> {
        self.release_camera();
        self.selected_camera = Some(label.to_string());

        let Some(port) = port_from_label(label) else {
            return self.still.fail(anyhow!("invalid camera selection: {}", label));
        };
        log::info!("📷 Selected Camera: {}", port);

        match self.backend.open(port, Some(self.still.args.capture_size())) {
            Ok(camera) => {
                self.camera = Some(camera);
                self.still.status = format!("Camera {} opened", port);
                Ok(())
            }
            Err(e) => self
                .still
                .fail(anyhow::Error::new(e).context(format!("Unable to open camera {}", port))),
        }
    }

    /// Reads a frame, writes it to the snapshot file and displays it.
    pub fn capture_image(&mut self) -> Result<()> {
        let Some(camera) = self.camera.as_mut() else {
            return self.still.fail(anyhow!("No camera is currently open"));
        };
        let frame = match camera.read() {
            Ok(frame) => frame,
            Err(e) => return self.still.fail(anyhow::Error::new(e).context("Failed to capture image")),
        };

        let snapshot = self.still.args.snapshot.clone();
        if let Err(e) = frame
            .save(&snapshot)
            .with_context(|| format!("failed to write {}", snapshot.display()))
        {
            return self.still.fail(e);
        }
        log::info!(
            "Image saved with resolution: {} x {}",
            frame.width(),
            frame.height()
        );
        self.still.image_path = Some(snapshot);
        self.display_image()
    }

    /// Flips the detection flag and redraws the current image.
    pub fn toggle_inference(&mut self) -> Result<()> {
        self.still.toggle()
    }

    pub fn select_weight(&mut self, path: &Path) -> Result<()> {
        self.still.select_weight(path)
    }

    pub fn display_image(&mut self) -> Result<()> {
        self.still.display()
    }

    pub fn release_camera(&mut self) {
        if let Some(camera) = self.camera.take() {
            let port = camera.port();
            drop(camera);
            log::info!("camera {} released due to switching or manual input given!", port);
        }
    }

    pub fn on_close(&mut self) {
        self.release_camera();
    }

    pub fn camera_port(&self) -> Option<usize> {
        self.camera.as_ref().map(|c| c.port())
    }

    /// Text of the camera selector, empty when nothing is selected.
    pub fn selected_camera(&self) -> Option<&str> {
        self.selected_camera.as_deref()
    }

    pub fn image_path(&self) -> Option<&PathBuf> {
        self.still.image_path.as_ref()
    }

    pub fn is_inferencing(&self) -> bool {
        self.still.inferencing
    }

    pub fn has_model(&self) -> bool {
        self.still.has_model()
    }

    pub fn inference_label(&self) -> &'static str {
        if self.still.inferencing {
            "Stop Detection"
        } else {
            "Start Detection"
        }
    }

    pub fn weight_label(&self) -> String {
        format!("Current Weight: {}", self.still.weight_path().display())
    }

    pub fn canvas(&self) -> Option<&CanvasFrame> {
        self.still.canvas.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.still.generation
    }

    pub fn preview(&self) -> &str {
        &self.still.preview
    }

    pub fn status(&self) -> &str {
        &self.still.status
    }

    pub fn last_saved(&self) -> Option<Saved> {
        self.still.last_saved
    }

    pub fn args(&self) -> &Args {
        &self.still.args
    }
}

impl Drop for DetectorPanel {
    fn drop(&mut self) {
        self.release_camera();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Model;
    use crate::sidecar::{self, SidecarEntry};
    use crate::testing::{FakeCamera, FakeModel};
    use crate::ObbBox;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn factory(_: &Args, path: &Path) -> Result<Box<dyn Model>> {
        let name = path.to_string_lossy();
        if name.contains("broken") {
            return Err(anyhow!("not an OBB model"));
        }
        let obbs = if name.contains("empty") {
            vec![]
        } else {
            vec![
                ObbBox::new(40., 30., 20., 10., 0.2, 0, 0.91),
                ObbBox::new(80., 60., 16., 8., 1.0, 1, 0.85),
            ]
        };
        Ok(Box::new(FakeModel::new(obbs)))
    }

    fn setup(weights: &str, camera: &FakeCamera) -> (TempDir, DetectorPanel, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let args = Args {
            weights: weights.into(),
            output: dir.path().join("hasil.json"),
            snapshot: dir.path().join("captured_image.jpg"),
            canvas_width: 64,
            canvas_height: 36,
            capture_width: 160,
            capture_height: 90,
            ..Args::default()
        };
        let image = dir.path().join("bin.png");
        RgbImage::from_pixel(128, 72, Rgb([10, 20, 30])).save(&image).unwrap();
        let panel = DetectorPanel::new(args, Box::new(camera.clone()), factory);
        (dir, panel, image)
    }

    #[test]
    fn startup_scans_fixed_ports() {
        let camera = FakeCamera::with_ports(&[0, 3, 6]);
        let (_dir, panel, _) = setup("good.onnx", &camera);
        assert_eq!(panel.cameras(), ["Camera 0", "Camera 3"]);
        assert!(panel.has_model());
        assert_eq!(panel.weight_label(), "Current Weight: good.onnx");
        assert_eq!(camera.open_count(), 0);
    }

    #[test]
    fn startup_without_weight_is_allowed() {
        let (_dir, panel, _) = setup("broken.onnx", &FakeCamera::with_ports(&[]));
        assert!(!panel.has_model());
        assert!(panel.status().starts_with("No weight loaded"));
    }

    #[test]
    fn image_is_shown_on_canvas_without_json() {
        let (dir, mut panel, image) = setup("good.onnx", &FakeCamera::with_ports(&[]));
        panel.select_image(&image).unwrap();
        let canvas = panel.canvas().unwrap();
        assert_eq!((canvas.width, canvas.height), (64, 36));
        assert_eq!(panel.generation(), 1);
        assert!(!dir.path().join("hasil.json").exists());
    }

    #[test]
    fn toggling_redraws_and_appends_records() {
        let (dir, mut panel, image) = setup("good.onnx", &FakeCamera::with_ports(&[]));
        panel.select_image(&image).unwrap();
        panel.toggle_inference().unwrap();
        assert_eq!(panel.inference_label(), "Stop Detection");
        assert_eq!(panel.generation(), 2);
        assert_eq!(panel.last_saved(), Some(Saved::Created));

        panel.display_image().unwrap();
        assert_eq!(panel.last_saved(), Some(Saved::Appended { total: 4 }));
        let entries = sidecar::load(&dir.path().join("hasil.json")).unwrap();
        assert_eq!(entries.len(), 4);
        assert!(matches!(&entries[0], SidecarEntry::Detection(r) if r.class == "plate"));
        assert!(panel.preview().contains("\"class\": \"bolt\""));

        panel.toggle_inference().unwrap();
        assert_eq!(panel.inference_label(), "Start Detection");
        assert_eq!(panel.generation(), 4);
    }

    #[test]
    fn empty_detection_shows_placeholder_and_skips_file() {
        let (dir, mut panel, image) = setup("empty.onnx", &FakeCamera::with_ports(&[]));
        panel.select_image(&image).unwrap();
        panel.toggle_inference().unwrap();
        assert_eq!(panel.preview(), sidecar::NOTHING_DETECTED);
        assert_eq!(panel.last_saved(), Some(Saved::Skipped));
        assert!(!dir.path().join("hasil.json").exists());
    }

    #[test]
    fn camera_selection_and_snapshot() {
        let camera = FakeCamera::with_ports(&[0, 1]);
        let (dir, mut panel, _) = setup("good.onnx", &camera);
        panel.select_camera("Camera 1").unwrap();
        assert_eq!(panel.camera_port(), Some(1));
        assert_eq!(camera.open_count(), 1);

        panel.select_camera("Camera 0").unwrap();
        assert_eq!(panel.camera_port(), Some(0));
        assert_eq!(camera.open_count(), 1);

        panel.capture_image().unwrap();
        let snapshot = dir.path().join("captured_image.jpg");
        assert_eq!(panel.image_path(), Some(&snapshot));
        assert_eq!(image::image_dimensions(&snapshot).unwrap(), (160, 90));
        assert!(panel.canvas().is_some());
    }

    #[test]
    fn capture_without_camera_is_reported() {
        let (_dir, mut panel, _) = setup("good.onnx", &FakeCamera::with_ports(&[]));
        assert!(panel.capture_image().is_err());
        assert_eq!(panel.status(), "No camera is currently open");
    }

    #[test]
    fn failed_open_keeps_selection_but_no_camera() {
        let camera = FakeCamera::with_ports(&[0]);
        let (_dir, mut panel, _) = setup("good.onnx", &camera);
        assert!(panel.select_camera("Camera 4").is_err());
        assert_eq!(panel.selected_camera(), Some("Camera 4"));
        assert_eq!(panel.camera_port(), None);
        assert!(panel.status().starts_with("Unable to open camera 4"));
    }

    #[test]
    fn importing_an_image_releases_the_camera() {
        let camera = FakeCamera::with_ports(&[2]);
        let (_dir, mut panel, image) = setup("good.onnx", &camera);
        panel.select_camera("Camera 2").unwrap();
        panel.select_image(&image).unwrap();
        assert_eq!(camera.open_count(), 0);
        assert_eq!(panel.selected_camera(), None);
        assert_eq!(panel.image_path(), Some(&image));
    }

    #[test]
    fn weight_switch_keeps_old_model_on_failure() {
        let (_dir, mut panel, _) = setup("good.onnx", &FakeCamera::with_ports(&[]));
        assert!(panel.select_weight(Path::new("broken.onnx")).is_err());
        assert_eq!(panel.weight_label(), "Current Weight: good.onnx");
        panel.select_weight(Path::new("other.onnx")).unwrap();
        assert_eq!(panel.weight_label(), "Current Weight: other.onnx");
    }

    #[test]
    fn closing_releases_the_camera() {
        let camera = FakeCamera::with_ports(&[0]);
        let (_dir, mut panel, _) = setup("good.onnx", &camera);
        panel.select_camera("Camera 0").unwrap();
        panel.on_close();
        assert_eq!(camera.open_count(), 0);
    }
}
