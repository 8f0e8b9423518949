/// Panel state (no GUI)
///
/// The windows in `ui` only draw widgets and forward clicks; everything they
/// display comes from these structs:
/// - `DetectorPanel`: still image or camera snapshot, detection toggle,
///   JSON preview, appends to the sidecar
/// - `ValidatorPanel`: still image and weight under test, overwrites the
///   sidecar with the image path header
/// - `LivePanel`: background camera loop with inference toggle and weight
///   hot-swap
///
/// A panel bumps `generation()` whenever its canvas changes so the window
/// re-uploads the texture only then.
use std::path::Path;

use anyhow::Result;

use crate::models::Model;
use crate::{Args, YOLOv11Obb};

pub mod detector;
pub mod live;
mod still;
pub mod validator;

pub use detector::DetectorPanel;
pub use live::LivePanel;
pub use validator::ValidatorPanel;

/// Builds a model from a weight file.
pub type ModelFactory = fn(&Args, &Path) -> Result<Box<dyn Model>>;

/// `ModelFactory` of the ONNX OBB model
pub fn load_obb_model(args: &Args, weights: &Path) -> Result<Box<dyn Model>> {
    let model = YOLOv11Obb::new(&args.with_weights(weights))?;
    model.summary();
    Ok(Box::new(model))
}

/// Loads the start-up weight; a panel without a model still runs.
fn load_initial(args: &Args, factory: ModelFactory) -> (Option<Box<dyn Model>>, String) {
    match factory(args, &args.weights) {
        Ok(model) => {
            log::info!("✅ Weight loaded: {}", args.weights.display());
            (Some(model), String::new())
        }
        Err(e) => {
            log::error!("❌ {:#}", e);
            (None, format!("No weight loaded: {:#}", e))
        }
    }
}
