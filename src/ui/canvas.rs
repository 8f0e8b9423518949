// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use macroquad::prelude::*;

use crate::annotate::{CanvasFrame, CanvasLabel};

const LABEL_SIZE: f32 = 16.0;

/// GPU copy of a panel canvas
pub struct CanvasView {
    texture: Option<Texture2D>,
    labels: Vec<CanvasLabel>,
    generation: u64,
    size: (f32, f32),
}

impl CanvasView {
    pub fn new((width, height): (u32, u32)) -> Self {
        Self {
            texture: None,
            labels: Vec::new(),
            generation: 0,
            size: (width as f32, height as f32),
        }
    }

    /// Uploads `frame` when the panel generation moved on.
    pub fn sync(&mut self, frame: Option<&CanvasFrame>, generation: u64) {
        if generation == self.generation {
            return;
        }
        self.generation = generation;
        let Some(frame) = frame else {
            return;
        };

        // rebuild only on size change, otherwise update the pixels
        let needs_rebuild = match &self.texture {
            Some(tex) => tex.width() != frame.width as f32 || tex.height() != frame.height as f32,
            None => true,
        };
        if needs_rebuild {
            let texture = Texture2D::from_rgba8(frame.width as u16, frame.height as u16, &frame.rgba);
            texture.set_filter(FilterMode::Linear);
            self.texture = Some(texture);
        } else if let Some(tex) = &self.texture {
            let img = Image {
                bytes: frame.rgba.clone(),
                width: frame.width as u16,
                height: frame.height as u16,
            };
            tex.update(&img);
        }
        self.labels = frame.labels.clone();
    }

    /// Draws the canvas with its top-left corner at `(x, y)`.
    pub fn draw(&self, x: f32, y: f32) {
        let (w, h) = self.size;
        draw_rectangle(x, y, w, h, Color::from_rgba(255, 255, 255, 255));
        draw_rectangle_lines(x, y, w, h, 1.0, GRAY);

        let Some(texture) = &self.texture else {
            return;
        };
        draw_texture_ex(
            texture,
            x,
            y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(w, h)),
                ..Default::default()
            },
        );

        for label in &self.labels {
            let [r, g, b, a] = label.color;
            let dims = measure_text(&label.text, None, LABEL_SIZE as u16, 1.0);
            let lx = x + label.x;
            let ly = (y + label.y - 2.0).max(y + dims.height);
            draw_rectangle(
                lx,
                ly - dims.height - 2.0,
                dims.width + 4.0,
                dims.height + 4.0,
                Color::from_rgba(r, g, b, a),
            );
            draw_text(&label.text, lx + 2.0, ly, LABEL_SIZE, BLACK);
        }
    }
}
