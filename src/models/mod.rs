/// Model interface and implementations
///
/// # Layout
///
/// ## Full model (`YOLOv11Obb`)
/// - weight loading through `OrtBackend`
/// - preprocess / run / postprocess
/// - file: `yolov11_obb.rs`
///
/// ## Postprocessor (`ObbPostprocessor`)
/// - decoding of the raw OBB head, usable without a session
/// - shared by `YOLOv11Obb` and by tests feeding synthetic tensors
///
/// ## Usage
/// ```ignore
/// use yolo_obb_panel::models::{Model, YOLOv11Obb};
/// use yolo_obb_panel::Args;
///
/// let mut model = YOLOv11Obb::new(&Args::default())?;
/// let results = model.forward(&[image])?;
/// ```
use anyhow::Result;
use image::DynamicImage;
use ndarray::{Array, IxDyn};

use crate::DetectionResult;

/// Unified interface of the detection models
///
/// ```text
/// image → preprocess → NCHW tensor
///          ↓
///       run (ONNX Runtime)
///          ↓
///     raw output → postprocess → DetectionResult
/// ```
pub trait Model: Send {
    /// images → NCHW tensors ready for the engine
    fn preprocess(&mut self, images: &[DynamicImage]) -> Result<Vec<Array<f32, IxDyn>>>;

    /// forward pass, raw (undecoded) outputs
    fn run(&mut self, xs: Vec<Array<f32, IxDyn>>, profile: bool) -> Result<Vec<Array<f32, IxDyn>>>;

    /// raw outputs → results in the pixel space of `xs0`
    fn postprocess(
        &self,
        xs: Vec<Array<f32, IxDyn>>,
        xs0: &[DynamicImage],
    ) -> Result<Vec<DetectionResult>>;

    /// preprocess → run → postprocess
    fn forward(&mut self, images: &[DynamicImage]) -> Result<Vec<DetectionResult>> {
        let xs = self.preprocess(images)?;
        let ys = self.run(xs, false)?;
        self.postprocess(ys, images)
    }

    /// class labels indexed by class id
    fn names(&self) -> &[String];

    fn conf(&self) -> f32;

    fn set_conf(&mut self, val: f32);

    /// log the model summary
    fn summary(&self);
}

/// Label of a class id, `class<N>` when the model carries no name for it.
pub fn class_name(names: &[String], id: usize) -> String {
    names
        .get(id)
        .cloned()
        .unwrap_or_else(|| format!("class{}", id))
}

pub mod yolov11_obb; // YOLOv11 OBB model + postprocessor

// Re-exports
pub use yolov11_obb::{ObbConfig, ObbPostprocessor, YOLOv11Obb};
