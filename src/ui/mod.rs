/// macroquad + egui front-ends
///
/// - `canvas`: texture of the panel canvas and its label overlay
/// - `detector_app`: "Object Detector for Robotic Bin-Picking"
/// - `validator_app`: "Validator-weight-test"
/// - `live_app`: "Yolov11-GUI"
///
/// Each window draws an egui toolbar, the canvas below it, and forwards
/// clicks to its panel. Closing the window releases the camera first.
use std::path::PathBuf;

use macroquad::prelude::*;

pub mod canvas;
pub mod detector_app;
pub mod live_app;
pub mod validator_app;

pub use canvas::CanvasView;

pub const WINDOW_WIDTH: i32 = 1050;
pub const WINDOW_HEIGHT: i32 = 450;
/// gap between the toolbar and the canvas
pub const MARGIN: f32 = 5.0;

pub fn window_conf(title: &str) -> Conf {
    Conf {
        window_title: title.to_string(),
        window_width: WINDOW_WIDTH,
        window_height: WINDOW_HEIGHT,
        ..Default::default()
    }
}

/// A window driven by `event_loop`
pub trait PanelWindow {
    /// update + draw one frame
    fn frame(&mut self);

    /// called once when the user closes the window
    fn on_close(&mut self);
}

/// Runs `app` until the window is closed.
pub async fn event_loop(app: &mut impl PanelWindow) {
    prevent_quit();
    loop {
        clear_background(Color::from_rgba(240, 240, 240, 255));
        app.frame();
        if is_quit_requested() {
            app.on_close();
            break;
        }
        next_frame().await;
    }
}

pub fn pick_image() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Image Files", &["png", "jpg", "jpeg"])
        .pick_file()
}

pub fn pick_weight() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("ONNX Model Files", &["onnx"])
        .pick_file()
}
