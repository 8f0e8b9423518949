// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// ONNX Runtime backend: session construction, metadata parsing and raw inference

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use ndarray::{Array, IxDyn};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider, TensorRTExecutionProvider,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Value, ValueType};
use regex::Regex;

/// Input size used when neither the graph nor the metadata fixes it
pub const DEFAULT_IMGSZ: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YOLOTask {
    Classify,
    Detect,
    Pose,
    Segment,
    Obb,
}

impl YOLOTask {
    pub fn from_metadata(task: &str) -> Option<Self> {
        match task.trim() {
            "classify" => Some(Self::Classify),
            "detect" => Some(Self::Detect),
            "pose" => Some(Self::Pose),
            "segment" => Some(Self::Segment),
            "obb" => Some(Self::Obb),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrtEP {
    CPU,
    CUDA(i32),
    Trt(i32),
}

#[derive(Debug, Clone)]
pub struct OrtConfig {
    pub f: PathBuf,
    pub ep: OrtEP,
    /// (height, width) overrides for dynamic axes
    pub image_size: (Option<u32>, Option<u32>),
}

pub struct OrtBackend {
    session: Session,
    input_name: String,
    ep: OrtEP,
    height: u32,
    width: u32,
    is_dynamic: bool,
    names: Option<Vec<String>>,
    task: Option<YOLOTask>,
    author: Option<String>,
    version: Option<String>,
    output_shape: Option<Vec<i64>>,
}

impl OrtBackend {
    pub fn build(args: OrtConfig) -> Result<Self> {
        if !args.f.exists() {
            return Err(anyhow!("weight file not found: {}", args.f.display()));
        }

        let ep = Self::resolve_ep(args.ep);
        let providers = match ep {
            OrtEP::Trt(id) => vec![
                TensorRTExecutionProvider::default()
                    .with_device_id(id)
                    .build(),
                CUDAExecutionProvider::default().with_device_id(id).build(),
            ],
            OrtEP::CUDA(id) => vec![CUDAExecutionProvider::default().with_device_id(id).build()],
            OrtEP::CPU => vec![CPUExecutionProvider::default().build()],
        };

        let session = Session::builder()
            .map_err(|e| anyhow!("Failed to create session builder: {}", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| anyhow!("Failed to set optimization level: {}", e))?
            .with_execution_providers(providers)
            .map_err(|e| anyhow!("Failed to set execution providers: {}", e))?
            .commit_from_file(&args.f)
            .map_err(|e| anyhow!("Failed to load {}: {}", args.f.display(), e))?;

        // metadata written by the exporter
        let (names, task, author, version, imgsz) = match session.metadata() {
            Ok(md) => {
                let custom = |key: &str| md.custom(key).ok().flatten();
                (
                    custom("names").map(|s| Self::parse_names(&s)),
                    custom("task").and_then(|s| YOLOTask::from_metadata(&s)),
                    custom("author"),
                    custom("version"),
                    custom("imgsz").and_then(|s| Self::parse_imgsz(&s)),
                )
            }
            Err(e) => {
                log::warn!("⚠️ model metadata unavailable: {}", e);
                (None, None, None, None, None)
            }
        };

        let input = session
            .inputs
            .first()
            .ok_or_else(|| anyhow!("model has no input"))?;
        let input_name = input.name.clone();
        let dims = match &input.input_type {
            ValueType::Tensor { shape, .. } => shape.to_vec(),
            other => return Err(anyhow!("unexpected input type: {:?}", other)),
        };
        if dims.len() != 4 {
            return Err(anyhow!("expected a NCHW input, got {:?}", dims));
        }
        let fallback = imgsz.unwrap_or((DEFAULT_IMGSZ, DEFAULT_IMGSZ));
        let is_dynamic = dims[2] <= 0 || dims[3] <= 0;
        let height = Self::resolve_dim(dims[2], args.image_size.0, fallback.0);
        let width = Self::resolve_dim(dims[3], args.image_size.1, fallback.1);

        let output_shape = session.outputs.first().and_then(|o| match &o.output_type {
            ValueType::Tensor { shape, .. } => Some(shape.to_vec()),
            _ => None,
        });

        Ok(Self {
            session,
            input_name,
            ep,
            height,
            width,
            is_dynamic,
            names,
            task,
            author,
            version,
            output_shape,
        })
    }

    fn resolve_ep(ep: OrtEP) -> OrtEP {
        let available = match ep {
            OrtEP::CPU => return OrtEP::CPU,
            OrtEP::CUDA(_) => CUDAExecutionProvider::default().is_available(),
            OrtEP::Trt(_) => TensorRTExecutionProvider::default().is_available(),
        };
        match available {
            Ok(true) => ep,
            _ => {
                log::warn!("⚠️ {:?} is not available, falling back to CPU", ep);
                OrtEP::CPU
            }
        }
    }

    fn resolve_dim(dim: i64, user: Option<u32>, fallback: u32) -> u32 {
        if dim > 0 {
            dim as u32
        } else {
            user.unwrap_or(fallback)
        }
    }

    /// `{0: 'plate', 1: 'bolt'}` → `["plate", "bolt"]`
    pub fn parse_names(raw: &str) -> Vec<String> {
        let re = match Regex::new(r#"(\d+):\s*['"]([^'"]*)['"]"#) {
            Ok(re) => re,
            Err(_) => return Vec::new(),
        };
        let mut pairs: Vec<(usize, String)> = re
            .captures_iter(raw)
            .filter_map(|c| Some((c[1].parse().ok()?, c[2].to_string())))
            .collect();
        pairs.sort_by_key(|(id, _)| *id);
        pairs.into_iter().map(|(_, name)| name).collect()
    }

    /// `[640, 640]` → `(640, 640)`
    pub fn parse_imgsz(raw: &str) -> Option<(u32, u32)> {
        let re = Regex::new(r"(\d+)").ok()?;
        let dims: Vec<u32> = re
            .captures_iter(raw)
            .filter_map(|c| c[1].parse().ok())
            .collect();
        match dims.as_slice() {
            [s] => Some((*s, *s)),
            [h, w, ..] => Some((*h, *w)),
            _ => None,
        }
    }

    pub fn run(&mut self, xs: Array<f32, IxDyn>, profile: bool) -> Result<Vec<Array<f32, IxDyn>>> {
        let t = std::time::Instant::now();
        let input = Value::from_array(xs).map_err(|e| anyhow!("Failed to create input value: {}", e))?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => &input])
            .map_err(|e| anyhow!("Failed to run inference: {}", e))?;
        if profile {
            log::info!("[ORT run]: {:?}", t.elapsed());
        }

        // OBB heads have a single output0
        let view = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| anyhow!("Failed to extract output array: {}", e))?;
        Ok(vec![view.to_owned()])
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    pub fn names(&self) -> Option<Vec<String>> {
        self.names.clone()
    }

    pub fn task(&self) -> Option<YOLOTask> {
        self.task
    }

    /// Shape of `output0`, dynamic axes as `-1`
    pub fn output_shape(&self) -> Option<&[i64]> {
        self.output_shape.as_deref()
    }

    pub fn ep(&self) -> &OrtEP {
        &self.ep
    }

    pub fn author(&self) -> Option<&String> {
        self.author.as_ref()
    }

    pub fn version(&self) -> Option<&String> {
        self.version.as_ref()
    }
}
