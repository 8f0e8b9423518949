// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Weight validator: run one weight on one image, rewrite the JSON sidecar on every run

use clap::Parser;
use yolo_obb_panel::ui::{self, validator_app};
use yolo_obb_panel::Args;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn window_conf() -> macroquad::window::Conf {
    ui::window_conf(validator_app::TITLE)
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    log::info!("🚀 {} | weight {}", validator_app::TITLE, args.weights.display());
    validator_app::run(args).await;
}
