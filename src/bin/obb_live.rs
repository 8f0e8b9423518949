// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Live OBB viewer: camera feed with toggleable inference and weight hot-swap

use clap::Parser;
use yolo_obb_panel::ui::{self, live_app};
use yolo_obb_panel::Args;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn window_conf() -> macroquad::window::Conf {
    ui::window_conf(live_app::TITLE)
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    log::info!("🚀 {} | weight {}", live_app::TITLE, args.weights.display());
    live_app::run(args).await;
}
