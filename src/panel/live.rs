// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Live viewer: camera loop on a background thread, inference toggle,
// weight hot-swap

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};

use super::{load_initial, ModelFactory};
use crate::annotate::{Annotator, CanvasFrame};
use crate::input::{camera_label, scan_until_misses, CameraBackend, PortReport};
use crate::models::Model;
use crate::pipeline::LiveWorker;
use crate::Args;

/// Selector text when the scan found nothing
pub const NO_CAMERAS: &str = "No Cameras Found";

pub struct LivePanel {
    args: Args,
    backend: Box<dyn CameraBackend>,
    factory: ModelFactory,
    annotator: Arc<Annotator>,
    report: PortReport,
    selected: Option<usize>,
    worker: Option<LiveWorker>,
    // held here while no worker owns it
    model: Option<Box<dyn Model>>,
    weight_path: PathBuf,
    inferencing: Arc<AtomicBool>,
    canvas: Option<CanvasFrame>,
    generation: u64,
    detections: usize,
    fps: f64,
    status: String,
}

impl LivePanel {
    /// Scans the ports and starts the default camera.
    pub fn new(args: Args, backend: Box<dyn CameraBackend>, factory: ModelFactory) -> Self {
        let report = scan_until_misses(backend.as_ref(), args.miss_limit);
        let (model, status) = load_initial(&args, factory);
        let mut panel = Self {
            annotator: Arc::new(Annotator::from_args(&args)),
            weight_path: args.weights.clone(),
            args,
            backend,
            factory,
            report,
            selected: None,
            worker: None,
            model,
            inferencing: Arc::new(AtomicBool::new(false)),
            canvas: None,
            generation: 0,
            detections: 0,
            fps: 0.0,
            status,
        };

        match panel.default_index() {
            Some(index) => {
                let _ = panel.select_camera(index);
            }
            None => {
                log::warn!("⚠️ {}", NO_CAMERAS);
                panel.status = NO_CAMERAS.to_string();
            }
        }
        panel
    }

    /// `--camera` when that port works, the first working port otherwise.
    fn default_index(&self) -> Option<usize> {
        let ports = &self.report.working;
        ports
            .iter()
            .position(|&p| p == self.args.camera)
            .or((!ports.is_empty()).then_some(0))
    }

    fn fail<T>(&mut self, e: anyhow::Error) -> Result<T> {
        log::error!("❌ {:#}", e);
        self.status = format!("{:#}", e);
        Err(e)
    }

    pub fn cameras(&self) -> Vec<String> {
        self.report.working.iter().copied().map(camera_label).collect()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selector_text(&self) -> String {
        match self.selected {
            Some(index) => camera_label(self.report.working[index]),
            None if self.report.working.is_empty() => NO_CAMERAS.to_string(),
            None => String::new(),
        }
    }

    /// Switches the loop to the camera at `index` of the selector.
    pub fn select_camera(&mut self, index: usize) -> Result<()> {
        if self.selected == Some(index) && self.worker.is_some() {
            return Ok(());
        }
        let Some(&port) = self.report.working.get(index) else {
            return self.fail(anyhow!("no camera at selector index {}", index));
        };

        self.stop_worker();
        self.selected = Some(index);

        let source = match self.backend.open(port, Some(self.args.capture_size())) {
            Ok(source) => source,
            Err(e) => {
                return self.fail(anyhow::Error::new(e).context(format!("Cannot open camera {}", port)))
            }
        };
        match LiveWorker::spawn(
            source,
            self.model.take(),
            self.annotator.clone(),
            self.args.canvas(),
            self.inferencing.clone(),
        ) {
            Ok(worker) => {
                self.worker = Some(worker);
                self.status = format!("Camera {} running", port);
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    fn stop_worker(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            if let Some(model) = worker.stop() {
                self.model = Some(model);
            }
        }
    }

    /// Takes the newest frame from the loop. `true` when the canvas changed.
    pub fn poll(&mut self) -> bool {
        let Some(worker) = self.worker.as_ref() else {
            return false;
        };
        let fresh = worker.latest();
        let finished = worker.is_finished();

        let changed = match fresh {
            Some(frame) => {
                self.canvas = Some(frame.canvas);
                self.detections = frame.detections;
                self.fps = frame.fps;
                self.generation += 1;
                true
            }
            None => false,
        };
        if finished && !changed {
            let port = worker.port();
            self.stop_worker();
            self.status = format!("Failed to capture frame from camera {}", port);
        }
        changed
    }

    pub fn toggle_inference(&mut self) {
        let on = !self.inferencing.load(Ordering::Relaxed);
        self.inferencing.store(on, Ordering::Relaxed);
        if on && self.worker.is_none() && self.model.is_none() {
            self.status = "No weight loaded, select one first".to_string();
        }
    }

    pub fn is_inferencing(&self) -> bool {
        self.inferencing.load(Ordering::Relaxed)
    }

    pub fn inference_label(&self) -> &'static str {
        if self.is_inferencing() {
            "Stop Inference"
        } else {
            "Start Inference"
        }
    }

    /// Loads `path` and hands it to the running loop.
    pub fn select_weight(&mut self, path: &Path) -> Result<()> {
        let model = match (self.factory)(&self.args, path) {
            Ok(model) => model,
            Err(e) => return self.fail(e.context(format!("failed to load {}", path.display()))),
        };
        self.weight_path = path.to_path_buf();
        self.status = format!("Weight loaded: {}", path.display());

        match self.worker.as_ref() {
            Some(worker) => {
                if let Err(model) = worker.swap_model(model, path.to_path_buf()) {
                    self.model = Some(model);
                }
            }
            None => self.model = Some(model),
        }
        Ok(())
    }

    pub fn weight_label(&self) -> String {
        format!("Weight: {}", self.weight_path.display())
    }

    pub fn on_close(&mut self) {
        self.stop_worker();
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn canvas(&self) -> Option<&CanvasFrame> {
        self.canvas.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn detections(&self) -> usize {
        self.detections
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn args(&self) -> &Args {
        &self.args
    }
}

impl Drop for LivePanel {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCamera, FakeModel};
    use crate::ObbBox;
    use std::time::{Duration, Instant};

    fn factory(_: &Args, path: &Path) -> Result<Box<dyn Model>> {
        if path.to_string_lossy().contains("broken") {
            return Err(anyhow!("bad weight"));
        }
        Ok(Box::new(FakeModel::new(vec![ObbBox::new(
            30., 30., 12., 6., 0.5, 0, 0.95,
        )])))
    }

    fn args(camera: usize) -> Args {
        Args {
            weights: "live.onnx".into(),
            camera,
            canvas_width: 32,
            canvas_height: 18,
            ..Args::default()
        }
    }

    fn poll_until(panel: &mut LivePanel, what: impl Fn(&LivePanel) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            panel.poll();
            if what(panel) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn default_port_is_used_when_working() {
        let camera = FakeCamera::with_ports(&[0, 1, 4]);
        let mut panel = LivePanel::new(args(1), Box::new(camera.clone()), factory);
        assert_eq!(panel.cameras(), vec!["Camera 0", "Camera 1", "Camera 4"]);
        assert_eq!(panel.selected_index(), Some(1));
        assert_eq!(panel.selector_text(), "Camera 1");
        assert!(poll_until(&mut panel, |p| p.canvas().is_some()));
        assert_eq!(camera.open_count(), 1);
        panel.on_close();
        assert_eq!(camera.open_count(), 0);
    }

    #[test]
    fn selector_index_maps_to_real_port() {
        let camera = FakeCamera::with_ports(&[2, 5]);
        let mut panel = LivePanel::new(args(1), Box::new(camera), factory);
        // port 1 missing → first working port
        assert_eq!(panel.selector_text(), "Camera 2");
        panel.select_camera(1).unwrap();
        assert_eq!(panel.selector_text(), "Camera 5");
        assert!(panel.select_camera(9).is_err());
    }

    #[test]
    fn no_cameras_found() {
        let panel = LivePanel::new(args(1), Box::new(FakeCamera::with_ports(&[])), factory);
        assert_eq!(panel.selector_text(), NO_CAMERAS);
        assert!(!panel.is_running());
    }

    #[test]
    fn toggle_enables_detections_and_swap_keeps_running() {
        let camera = FakeCamera::with_ports(&[0]);
        let mut panel = LivePanel::new(args(0), Box::new(camera), factory);
        assert_eq!(panel.inference_label(), "Start Inference");
        panel.toggle_inference();
        assert_eq!(panel.inference_label(), "Stop Inference");
        assert!(poll_until(&mut panel, |p| p.detections() == 1));

        panel.select_weight(Path::new("next.onnx")).unwrap();
        assert_eq!(panel.weight_label(), "Weight: next.onnx");
        assert!(panel.select_weight(Path::new("broken.onnx")).is_err());
        assert_eq!(panel.weight_label(), "Weight: next.onnx");
        assert!(panel.is_running());
    }

    #[test]
    fn read_failure_stops_the_loop() {
        let camera = FakeCamera::with_ports(&[0]);
        let mut panel = LivePanel::new(args(0), Box::new(camera.clone()), factory);
        assert!(panel.is_running());
        // a camera that opens but never reads
        let silent = FakeCamera::with_ports(&[0]).silent(&[0]);
        panel.backend = Box::new(silent);
        panel.report.working = vec![0, 0];
        panel.select_camera(1).unwrap();
        assert!(poll_until(&mut panel, |p| !p.is_running()));
        assert!(panel.status().starts_with("Failed to capture frame"));
        assert_eq!(camera.open_count(), 0);
    }
}
