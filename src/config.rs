// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::Parser;

use crate::OrtEP;

/// Shared options of the three OBB panels
#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "YOLO OBB detector panel for robotic bin-picking", long_about = None)]
pub struct Args {
    /// ONNX weight file (exported OBB model)
    #[arg(short, long, default_value = "weights/bestV3-OBB.onnx")]
    pub weights: PathBuf,

    /// confidence threshold
    #[arg(long, default_value_t = 0.8)]
    pub conf: f32,

    /// iou threshold of the rotated NMS
    #[arg(long, default_value_t = 0.7)]
    pub iou: f32,

    /// input width, only used when the model has a dynamic width
    #[arg(long)]
    pub width: Option<u32>,

    /// input height, only used when the model has a dynamic height
    #[arg(long)]
    pub height: Option<u32>,

    /// JSON sidecar receiving the detections
    #[arg(short, long, default_value = "hasil.json")]
    pub output: PathBuf,

    /// file written by "Grab Camera"
    #[arg(long, default_value = "captured_image.jpg")]
    pub snapshot: PathBuf,

    /// using CUDA EP
    #[arg(long)]
    pub cuda: bool,

    /// using TensorRT EP
    #[arg(long)]
    pub trt: bool,

    /// device id
    #[arg(long, default_value_t = 0)]
    pub device_id: i32,

    /// ports probed by the detector panel (0..N)
    #[arg(long, default_value_t = 5)]
    pub max_ports: usize,

    /// failed ports after which the live viewer stops probing
    #[arg(long, default_value_t = 6)]
    pub miss_limit: usize,

    /// camera port opened at start-up by the live viewer
    #[arg(long, default_value_t = 1)]
    pub camera: usize,

    #[arg(long, default_value_t = 1280)]
    pub capture_width: u32,

    #[arg(long, default_value_t = 720)]
    pub capture_height: u32,

    #[arg(long, default_value_t = 640)]
    pub canvas_width: u32,

    #[arg(long, default_value_t = 360)]
    pub canvas_height: u32,

    /// TTF/OTF font used to burn labels into frames
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// print timings of each inference stage
    #[arg(long)]
    pub profile: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self::parse_from(["yolo-obb-panel"])
    }
}

impl Args {
    pub fn ep(&self) -> OrtEP {
        if self.trt {
            OrtEP::Trt(self.device_id)
        } else if self.cuda {
            OrtEP::CUDA(self.device_id)
        } else {
            OrtEP::CPU
        }
    }

    pub fn canvas(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn capture_size(&self) -> (u32, u32) {
        (self.capture_width, self.capture_height)
    }

    /// Same options pointing at another weight file.
    pub fn with_weights(&self, weights: impl Into<PathBuf>) -> Self {
        Self {
            weights: weights.into(),
            ..self.clone()
        }
    }
}
