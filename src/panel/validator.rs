// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Weight validator: one image, one weight, sidecar rewritten on every run

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::still::Still;
use super::ModelFactory;
use crate::annotate::CanvasFrame;
use crate::sidecar::{Saved, SidecarMode};
use crate::Args;

pub struct ValidatorPanel {
    still: Still,
}

impl ValidatorPanel {
    pub fn new(args: Args, factory: ModelFactory) -> Self {
        Self {
            still: Still::new(args, factory, SidecarMode::Overwrite),
        }
    }

    pub fn select_image(&mut self, path: &Path) -> Result<()> {
        self.still.image_path = Some(path.to_path_buf());
        self.still.display()
    }

    pub fn toggle_inference(&mut self) -> Result<()> {
        self.still.toggle()
    }

    pub fn select_weight(&mut self, path: &Path) -> Result<()> {
        self.still.select_weight(path)
    }

    pub fn image_path(&self) -> Option<&PathBuf> {
        self.still.image_path.as_ref()
    }

    pub fn is_inferencing(&self) -> bool {
        self.still.inferencing
    }

    pub fn inference_label(&self) -> &'static str {
        if self.still.inferencing {
            "Stop Inference"
        } else {
            "Start Inference"
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
