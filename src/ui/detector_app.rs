// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// "Object Detector for Robotic Bin-Picking" window

use egui_macroquad::egui;

use super::{event_loop, pick_image, pick_weight, CanvasView, PanelWindow, MARGIN};
use crate::input::FfmpegCamera;
use crate::panel::{load_obb_model, DetectorPanel};
use crate::Args;

pub const TITLE: &str = "Object Detector for Robotic Bin-Picking";

enum Action {
    ImportImage,
    SelectCamera(String),
    RefreshCameras,
    Grab,
    Toggle,
    BrowseWeight,
}

pub struct DetectorApp {
    panel: DetectorPanel,
    view: CanvasView,
    toolbar_height: f32,
}

impl DetectorApp {
    pub fn new(panel: DetectorPanel) -> Self {
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
                    if ui.button("Import image").clicked() {
                        actions.push(Action::ImportImage);
                    }

                    egui::ComboBox::from_id_salt("camera_select")
                        .selected_text(panel.selected_camera().unwrap_or(""))
                        .show_ui(ui, |ui| {
                            for label in panel.cameras() {
                                let selected = panel.selected_camera() == Some(label.as_str());
                                if ui.selectable_label(selected, label.as_str()).clicked() {
                                    actions.push(Action::SelectCamera(label.clone()));
                                }
                            }
                        });
                    if ui.small_button("⟳").on_hover_text("Scan cameras again").clicked() {
                        actions.push(Action::RefreshCameras);
                    }

                    if ui.button("Grab Camera").clicked() {
                        actions.push(Action::Grab);
                    }
                    if ui.button(panel.inference_label()).clicked() {
                        actions.push(Action::Toggle);
                    }
                    if ui.button("Browse Weight").clicked() {
                        actions.push(Action::BrowseWeight);
                    }
                    ui.label(panel.weight_label());
                });
            });
            toolbar_height = toolbar.response.rect.height();

            egui::TopBottomPanel::bottom("status").show(egui_ctx, |ui| {
                ui.label(panel.status());
            });

            egui::SidePanel::right("json_preview")
                .resizable(true)
                .default_width(360.0)
                .show(egui_ctx, |ui| {
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        ui.monospace(panel.preview());
                    });
                });
        });
        egui_macroquad::draw();

        self.toolbar_height = toolbar_height;
        actions
    }

    fn apply(&mut self, action: Action) {
        // failures are already logged and shown in the status bar
        let _ = match action {
            Action::ImportImage => match pick_image() {
                Some(path) => self.panel.select_image(&path),
                None => Ok(()),
            },
            Action::SelectCamera(label) => self.panel.select_camera(&label),
            Action::RefreshCameras => {
                self.panel.refresh_cameras();
                Ok(())
            }
            Action::Grab => self.panel.capture_image(),
            Action::Toggle => self.panel.toggle_inference(),
            Action::BrowseWeight => match pick_weight() {
                Some(path) => self.panel.select_weight(&path),
                None => Ok(()),
            },
        };
    }
}

impl PanelWindow for DetectorApp {
    fn frame(&mut self) {
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
    let panel = DetectorPanel::new(args, Box::new(FfmpegCamera::new()), load_obb_model);
    let mut app = DetectorApp::new(panel);
    event_loop(&mut app).await;
}
