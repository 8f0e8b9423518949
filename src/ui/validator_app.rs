// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// "Validator-weight-test" window

use egui_macroquad::egui;

use super::{event_loop, pick_image, pick_weight, CanvasView, PanelWindow, MARGIN};
use crate::panel::{load_obb_model, ValidatorPanel};
use crate::Args;

pub const TITLE: &str = "Validator-weight-test";

enum Action {
    SelectImage,
    Toggle,
    SelectWeight,
}

pub struct ValidatorApp {
    panel: ValidatorPanel,
    view: CanvasView,
    toolbar_height: f32,
}

impl ValidatorApp {
    pub fn new(panel: ValidatorPanel) -> Self {
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
                    if ui.button("Select Image").clicked() {
                        actions.push(Action::SelectImage);
                    }
                    if ui.button(panel.inference_label()).clicked() {
                        actions.push(Action::Toggle);
                    }
                    if ui.button("Select Weight").clicked() {
                        actions.push(Action::SelectWeight);
                    }
                    ui.label(panel.weight_label());
                });
            });
            toolbar_height = toolbar.response.rect.height();

            egui::TopBottomPanel::bottom("status").show(egui_ctx, |ui| {
                ui.label(panel.status());
            });
        });
        egui_macroquad::draw();

        self.toolbar_height = toolbar_height;
        actions
    }

    fn apply(&mut self, action: Action) {
        let _ = match action {
            Action::SelectImage => match pick_image() {
                Some(path) => self.panel.select_image(&path),
                None => Ok(()),
            },
            Action::Toggle => self.panel.toggle_inference(),
            Action::SelectWeight => match pick_weight() {
                Some(path) => self.panel.select_weight(&path),
                None => Ok(()),
            },
        };
    }
}

impl PanelWindow for ValidatorApp {
    fn frame(&mut self) {
        self.view.sync(self.panel.canvas(), self.panel.generation());
        self.view.draw(MARGIN, self.toolbar_height + MARGIN);
        for action in self.draw_egui() {
            self.apply(action);
        }
    }

    fn on_close(&mut self) {}
}

pub async fn run(args: Args) {
    let panel = ValidatorPanel::new(args, load_obb_model);
    let mut app = ValidatorApp::new(panel);
    event_loop(&mut app).await;
}
