// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Still-image display shared by the detector and validator panels

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::{load_initial, ModelFactory};
use crate::annotate::{Annotator, CanvasFrame, Plotted};
use crate::models::Model;
use crate::sidecar::{self, Saved, SidecarMode};
use crate::Args;

pub(crate) struct Still {
    pub args: Args,
    factory: ModelFactory,
    annotator: Annotator,
    model: Option<Box<dyn Model>>,
    weight_path: PathBuf,
    mode: SidecarMode,
    pub image_path: Option<PathBuf>,
    pub inferencing: bool,
    pub canvas: Option<CanvasFrame>,
    pub generation: u64,
    pub preview: String,
    pub status: String,
    pub last_saved: Option<Saved>,
}

impl Still {
    pub fn new(args: Args, factory: ModelFactory, mode: SidecarMode) -> Self {
        let (model, status) = load_initial(&args, factory);
        Self {
            annotator: Annotator::from_args(&args),
            weight_path: args.weights.clone(),
            args,
            factory,
            model,
            mode,
            image_path: None,
            inferencing: false,
            canvas: None,
            generation: 0,
            preview: String::new(),
            status,
            last_saved: None,
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn weight_path(&self) -> &Path {
        &self.weight_path
    }

    /// Logs `e`, shows it in the status line and hands it back.
    pub fn fail<T>(&mut self, e: anyhow::Error) -> Result<T> {
        log::error!("❌ {:#}", e);
        self.status = format!("{:#}", e);
        Err(e)
    }

    pub fn select_weight(&mut self, path: &Path) -> Result<()> {
        match (self.factory)(&self.args, path) {
            Ok(model) => {
                self.model = Some(model);
                self.weight_path = path.to_path_buf();
                self.status = format!("Weight loaded: {}", path.display());
                log::info!("✅ Weight loaded: {}", path.display());
                Ok(())
            }
            Err(e) => self.fail(e.context(format!("failed to load {}", path.display()))),
        }
    }

    pub fn toggle(&mut self) -> Result<()> {
        self.inferencing = !self.inferencing;
        self.display()
    }

    /// Loads the current image, runs the model when inferencing and puts the
    /// result on the canvas.
    pub fn display(&mut self) -> Result<()> {
        let Some(path) = self.image_path.clone() else {
            return Ok(());
        };
        let image = match image::open(&path).with_context(|| format!("failed to open {}", path.display())) {
            Ok(image) => image,
            Err(e) => return self.fail(e),
        };

        let plotted = if self.inferencing {
            self.infer(&image, &path)
        } else {
            Plotted::plain(&image)
        };

        match plotted.into_canvas(self.args.canvas()) {
            Ok(canvas) => {
                self.canvas = Some(canvas);
                self.generation += 1;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    fn infer(&mut self, image: &image::DynamicImage, path: &Path) -> Plotted {
        let Some(model) = self.model.as_mut() else {
            self.status = "No weight loaded, select one first".to_string();
            log::warn!("⚠️ {}", self.status);
            return Plotted::plain(image);
        };

        let result = match model.forward(std::slice::from_ref(image)) {
            Ok(ys) => ys.into_iter().next().unwrap_or_default(),
            Err(e) => {
                log::error!("❌ inference failed: {:#}", e);
                self.status = format!("Inference failed: {:#}", e);
                return Plotted::plain(image);
            }
        };
        let plotted = self.annotator.plot(image, &result, model.names());

        let records = sidecar::records_from(&result, model.names());
        self.preview = sidecar::preview(&records);
        match sidecar::save(&self.args.output, self.mode, path, &records) {
            Ok(saved) => {
                self.status = match saved {
                    Saved::Created => format!("Saved to {}", self.args.output.display()),
                    Saved::Appended { total } => {
                        format!("Appended to {} ({} entries)", self.args.output.display(), total)
                    }
                    Saved::Overwritten => format!("Saved to {}", self.args.output.display()),
                    Saved::Skipped => sidecar::NOTHING_DETECTED.to_string(),
                };
                self.last_saved = Some(saved);
            }
            Err(e) => {
                log::error!("❌ {:#}", e);
                self.status = format!("{:#}", e);
                self.last_saved = None;
            }
        }
        plotted
    }
}
