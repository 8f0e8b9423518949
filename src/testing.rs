// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// In-memory camera and model shared by the unit and integration tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::{Array, IxDyn};

use crate::input::{CameraBackend, CameraError, FrameSource};
use crate::models::Model;
use crate::{DetectionResult, ObbBox};

/// Cameras on a fixed set of ports, every frame a flat gray image
#[derive(Clone, Default)]
pub struct FakeCamera {
    ports: HashSet<usize>,
    silent: HashSet<usize>,
    size: (u32, u32),
    /// sources currently alive
    pub open: Arc<AtomicUsize>,
    /// calls of `open`
    pub opens: Arc<AtomicUsize>,
    /// calls of `probe`
    pub probes: Arc<AtomicUsize>,
}

impl FakeCamera {
    pub fn with_ports(ports: &[usize]) -> Self {
        Self {
            ports: ports.iter().copied().collect(),
            size: (320, 180),
            ..Default::default()
        }
    }

    /// ports that open but never deliver a frame
    pub fn silent(mut self, ports: &[usize]) -> Self {
        self.silent = ports.iter().copied().collect();
        self
    }

    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    fn connect(
        &self,
        port: usize,
        size: Option<(u32, u32)>,
    ) -> Result<Box<dyn FrameSource>, CameraError> {
        if !self.ports.contains(&port) {
            return Err(CameraError::NotFound(port));
        }
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSource {
            port,
            size: size.unwrap_or(self.size),
            silent: self.silent.contains(&port),
            open: self.open.clone(),
        }))
    }
}

impl CameraBackend for FakeCamera {
    fn open(
        &self,
        port: usize,
        size: Option<(u32, u32)>,
    ) -> Result<Box<dyn FrameSource>, CameraError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.connect(port, size)
    }

    fn probe(&self, port: usize) -> Result<Box<dyn FrameSource>, CameraError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.connect(port, None)
    }
}

struct FakeSource {
    port: usize,
    size: (u32, u32),
    silent: bool,
    open: Arc<AtomicUsize>,
}

impl FrameSource for FakeSource {
    fn read(&mut self) -> Result<RgbImage, CameraError> {
        if self.silent {
            return Err(CameraError::ReadFailed {
                port: self.port,
                reason: "no signal".into(),
            });
        }
        std::thread::sleep(std::time::Duration::from_millis(2));
        Ok(RgbImage::from_pixel(self.size.0, self.size.1, Rgb([90, 90, 90])))
    }

    fn port(&self) -> usize {
        self.port
    }
}

impl Drop for FakeSource {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Model returning the same boxes for every image
pub struct FakeModel {
    pub obbs: Vec<ObbBox>,
    pub names: Vec<String>,
    pub conf: f32,
    pub calls: Arc<AtomicUsize>,
}

impl FakeModel {
    pub fn new(obbs: Vec<ObbBox>) -> Self {
        Self {
            obbs,
            names: vec!["plate".into(), "bolt".into()],
            conf: 0.8,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Model for FakeModel {
    fn preprocess(&mut self, images: &[DynamicImage]) -> Result<Vec<Array<f32, IxDyn>>> {
        Ok(vec![Array::zeros((images.len(), 3, 1, 1)).into_dyn()])
    }

    fn run(&mut self, xs: Vec<Array<f32, IxDyn>>, _profile: bool) -> Result<Vec<Array<f32, IxDyn>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(xs)
    }

    fn postprocess(
        &self,
        _xs: Vec<Array<f32, IxDyn>>,
        xs0: &[DynamicImage],
    ) -> Result<Vec<DetectionResult>> {
        let obbs = (!self.obbs.is_empty()).then(|| self.obbs.clone());
        Ok(xs0.iter().map(|_| DetectionResult::new(obbs.clone())).collect())
    }

    fn names(&self) -> &[String] {
        &self.names
    }

    fn conf(&self) -> f32 {
        self.conf
    }

    fn set_conf(&mut self, val: f32) {
        self.conf = val;
    }

    fn summary(&self) {}
}
