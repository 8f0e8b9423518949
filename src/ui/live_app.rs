// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// "Yolov11-GUI" live camera window

use egui_macroquad::egui;

use super::{event_loop, pick_weight, CanvasView, PanelWindow, MARGIN};
use crate::input::FfmpegCamera;
use crate::panel::{load_obb_model, LivePanel};
use crate::Args;

pub const TITLE: &str = "Yolov11-GUI";

enum Action {
    SelectCamera(usize),
    Toggle,
    SelectWeight,
}

pub struct LiveApp {
    panel: LivePanel,
    view: CanvasView,
    toolbar_height: f32,
}

impl LiveApp {
    pub fn new(panel: LivePanel) -> Self {
        let view = CanvasView::new(panel.args().canvas());
        Self {
            panel,
            view,
            toolbar_height: 0.0,
        }
    }

    fn draw_egui(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        let panel = &self.panel;
        let mut toolbar_height = self.toolbar_height;

        egui_macroquad::ui(|egui_ctx| {
            let toolbar = egui::TopBottomPanel::top("toolbar").show(egui_ctx, |ui| {
                ui.horizontal(|ui| {
                    egui::ComboBox::from_id_salt("camera_select")
                        .selected_text(panel.selector_text())
                        .show_ui(ui, |ui| {
                            for (index, label) in panel.cameras().iter().enumerate() {
                                let selected = panel.selected_index() == Some(index);
                                if ui.selectable_label(selected, label.as_str()).clicked() {
                                    actions.push(Action::SelectCamera(index));
                                }
                            }
                        });
                    if ui.button(panel.inference_label()).clicked() {
                        actions.push(Action::Toggle);
                    }
                    ui.label(panel.weight_label());
                    if ui.button("Select Weight").clicked() {
                        actions.push(Action::SelectWeight);
                    }
                });
            });
            toolbar_height = toolbar.response.rect.height();

            egui::TopBottomPanel::bottom("status").show(egui_ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(panel.status());
                    if panel.is_running() {
                        ui.separator();
                        ui.colored_label(egui::Color32::DARK_GREEN, format!("{:.1} FPS", panel.fps()));
                        if panel.is_inferencing() {
                            ui.label(format!("{} objects", panel.detections()));
                        }
                    }
                });
            });
        });
        egui_macroquad::draw();

        self.toolbar_height = toolbar_height;
        actions
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::SelectCamera(index) => {
                let _ = self.panel.select_camera(index);
            }
            Action::Toggle => self.panel.toggle_inference(),
            Action::SelectWeight => {
                if let Some(path) = pick_weight() {
                    let _ = self.panel.select_weight(&path);
                }
            }
        }
    }
}

impl PanelWindow for LiveApp {
    fn frame(&mut self) {
        self.panel.poll();
        self.view.sync(self.panel.canvas(), self.panel.generation());
        self.view.draw(MARGIN, self.toolbar_height + MARGIN);
        for action in self.draw_egui() {
            self.apply(action);
        }
    }

    fn on_close(&mut self) {
        self.panel.on_close();
    }
}

pub async fn run(args: Args) {
    let panel = LivePanel::new(args, Box::new(FfmpegCamera::new()), load_obb_model);
    let mut app = LiveApp::new(panel);
    event_loop(&mut app).await;
}
