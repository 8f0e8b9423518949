// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Object detector panel for robotic bin-picking: image import, camera snapshot, OBB detection with JSON export

use clap::Parser;
use yolo_obb_panel::ui::{self, detector_app};
use yolo_obb_panel::Args;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn window_conf() -> macroquad::window::Conf {
    ui::window_conf(detector_app::TITLE)
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    log::info!("🚀 {} | weight {}", detector_app::TITLE, args.weights.display());
    detector_app::run(args).await;
}
