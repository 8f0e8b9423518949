// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Background capture loop of the live viewer
// camera → (inference) → plot → canvas → UI

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use image::DynamicImage;

use crate::annotate::{Annotator, CanvasFrame, Plotted};
use crate::input::FrameSource;
use crate::models::Model;

/// Messages from the UI thread to the capture thread
pub enum ControlMessage {
    SwapModel(Box<dyn Model>, PathBuf),
}

/// A canvas produced by the capture thread
pub struct LiveFrame {
    pub canvas: CanvasFrame,
    pub detections: usize,
    pub fps: f64,
}

pub struct LiveWorker {
    port: usize,
    running: Arc<AtomicBool>,
    control: Sender<ControlMessage>,
    frames: Receiver<LiveFrame>,
    handle: Option<JoinHandle<Option<Box<dyn Model>>>>,
}

struct Loop {
    source: Box<dyn FrameSource>,
    model: Option<Box<dyn Model>>,
    annotator: Arc<Annotator>,
    canvas: (u32, u32),
    inferencing: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    control: Receiver<ControlMessage>,
    frames: Sender<LiveFrame>,
}

impl LiveWorker {
    /// Starts reading `source` on a background thread.
    ///
    /// `inferencing` is shared with the UI; flipping it takes effect on the
    /// next frame.
    pub fn spawn(
        source: Box<dyn FrameSource>,
        model: Option<Box<dyn Model>>,
        annotator: Arc<Annotator>,
        canvas: (u32, u32),
        inferencing: Arc<AtomicBool>,
    ) -> Result<Self> {
        let port = source.port();
        let running = Arc::new(AtomicBool::new(true));
        let (control_tx, control_rx) = unbounded();
        // newest frame wins
        let (frame_tx, frame_rx) = bounded(2);

        let state = Loop {
            source,
            model,
            annotator,
            canvas,
            inferencing,
            running: running.clone(),
            control: control_rx,
            frames: frame_tx,
        };
        let handle = std::thread::Builder::new()
            .name(format!("live-{}", port))
            .spawn(move || state.run())
            .context("failed to spawn the capture thread")?;

        Ok(Self {
            port,
            running,
            control: control_tx,
            frames: frame_rx,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> usize {
        self.port
    }

    /// Most recent frame, older pending frames are discarded.
    pub fn latest(&self) -> Option<LiveFrame> {
        self.frames.try_iter().last()
    }

    pub fn frames(&self) -> &Receiver<LiveFrame> {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Hands `model` to the capture thread; returned back when it has exited.
    pub fn swap_model(
        &self,
        model: Box<dyn Model>,
        path: PathBuf,
    ) -> std::result::Result<(), Box<dyn Model>> {
        self.control
            .send(ControlMessage::SwapModel(model, path))
            .map_err(|e| match e.into_inner() {
                ControlMessage::SwapModel(model, _) => model,
            })
    }

    /// Stops the loop, releases the camera and gives the model back.
    pub fn stop(&mut self) -> Option<Box<dyn Model>> {
        self.running.store(false, Ordering::Relaxed);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(model) => model,
            Err(_) => {
                log::error!("❌ capture thread of camera {} panicked", self.port);
                None
            }
        }
    }
}

impl Drop for LiveWorker {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Loop {
    fn run(mut self) -> Option<Box<dyn Model>> {
        log::info!("📷 capture loop of camera {} started", self.source.port());
        let mut count = 0u32;
        let mut last = Instant::now();
        let mut fps = 0.0;

        while self.running.load(Ordering::Relaxed) {
            for msg in self.control.try_iter() {
                match msg {
                    ControlMessage::SwapModel(model, path) => {
                        log::info!("✅ Weight switched to {}", path.display());
                        self.model = Some(model);
                    }
                }
            }

            let frame = match self.source.read() {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("❌ Failed to capture frame: {}", e);
                    break;
                }
            };
            let image = DynamicImage::ImageRgb8(frame);

            let (plotted, detections) = self.plot(&image);
            match plotted.into_canvas(self.canvas) {
                Ok(canvas) => {
                    let _ = self.frames.try_send(LiveFrame {
                        canvas,
                        detections,
                        fps,
                    });
                }
                Err(e) => log::warn!("⚠️ {:#}", e),
            }

            count += 1;
            if last.elapsed().as_secs_f64() >= 1.0 {
                fps = count as f64 / last.elapsed().as_secs_f64();
                count = 0;
                last = Instant::now();
            }
        }

        // a model sent while stopping still replaces the old one
        for ControlMessage::SwapModel(model, _) in self.control.try_iter() {
            self.model = Some(model);
        }
        log::info!("camera {} released", self.source.port());
        self.model
    }

    fn plot(&mut self, image: &DynamicImage) -> (Plotted, usize) {
        if !self.inferencing.load(Ordering::Relaxed) {
            return (Plotted::plain(image), 0);
        }
        let Some(model) = self.model.as_mut() else {
            return (Plotted::plain(image), 0);
        };
        match model.forward(std::slice::from_ref(image)) {
            Ok(ys) => {
                let result = ys.into_iter().next().unwrap_or_default();
                (
                    self.annotator.plot(image, &result, model.names()),
                    result.len(),
                )
            }
            Err(e) => {
                log::warn!("⚠️ inference failed: {:#}", e);
                (Plotted::plain(image), 0)
            }
        }
    }
}
