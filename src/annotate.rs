// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Plotting of rotated boxes and the fixed-size preview canvas

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use anyhow::{anyhow, Context, Result};
use fast_image_resize as fr;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::models::class_name;
use crate::{DetectionResult, ObbBox};

// color palette
const BRIGHT_COLORS: [[u8; 3]; 12] = [
    [255, 0, 0],     // red
    [0, 255, 0],     // green
    [0, 0, 255],     // blue
    [255, 255, 0],   // yellow
    [255, 0, 255],   // magenta
    [0, 255, 255],   // cyan
    [255, 128, 0],   // orange
    [255, 0, 128],   // pink
    [128, 255, 0],   // lime
    [0, 128, 255],   // sky blue
    [255, 255, 255], // white
    [128, 0, 255],   // purple
];

const LINE_WIDTH: i32 = 2;
const FONT_PX: f32 = 18.0;

/// A label the UI draws on top of the canvas, in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub color: [u8; 4],
}

/// Image after plotting, labels not yet burned in
#[derive(Debug, Clone)]
pub struct Plotted {
    pub image: RgbaImage,
    pub labels: Vec<CanvasLabel>,
}

impl Plotted {
    /// Frame shown without any detection drawn on it.
    pub fn plain(image: &DynamicImage) -> Self {
        Self {
            image: image.to_rgba8(),
            labels: Vec::new(),
        }
    }

    pub fn into_canvas(self, size: (u32, u32)) -> Result<CanvasFrame> {
        resize_to_canvas(&self.image, self.labels, size)
    }
}

/// Pixels displayed by the GUI, always of the configured canvas size.
#[derive(Debug, Clone)]
pub struct CanvasFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub labels: Vec<CanvasLabel>,
}

impl CanvasFrame {
    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
    }
}

pub struct Annotator {
    palette: Vec<Rgba<u8>>,
    font: Option<FontArc>,
}

impl Default for Annotator {
    fn default() -> Self {
        Self {
            palette: BRIGHT_COLORS
                .iter()
                .map(|[r, g, b]| Rgba([*r, *g, *b, 255]))
                .collect(),
            font: None,
        }
    }
}

impl Annotator {
    pub fn new(font: Option<FontArc>) -> Self {
        Self {
            font,
            ..Default::default()
        }
    }

    /// Annotator burning labels with the TTF/OTF font at `path`.
    pub fn from_font_file(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| anyhow!("invalid font {}: {}", path.display(), e))?;
        Ok(Self::new(Some(font)))
    }

    /// Font from `--font` when given, overlay labels otherwise.
    pub fn from_args(args: &crate::Args) -> Self {
        match args.font.as_deref() {
            Some(path) => Self::from_font_file(path).unwrap_or_else(|e| {
                log::warn!("⚠️ {:#}, labels are drawn by the window instead", e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn color(&self, class_id: usize) -> Rgba<u8> {
        self.palette[class_id % self.palette.len()]
    }

    pub fn plot(&self, image: &DynamicImage, result: &DetectionResult, names: &[String]) -> Plotted {
        let mut canvas = image.to_rgba8();
        let mut labels = Vec::new();

        for obb in result.obbs().into_iter().flatten() {
            let color = self.color(obb.class_id());
            draw_polygon(&mut canvas, obb, color);

            let text = format!("{} {:.2}", class_name(names, obb.class_id()), obb.confidence());
            let anchor = label_anchor(obb);
            match &self.font {
                Some(font) => draw_tag(&mut canvas, font, &text, anchor, color),
                None => labels.push(CanvasLabel {
                    text,
                    x: anchor.0,
                    y: anchor.1,
                    color: color.0,
                }),
            }
        }

        Plotted {
            image: canvas,
            labels,
        }
    }
}

fn draw_polygon(canvas: &mut RgbaImage, obb: &ObbBox, color: Rgba<u8>) {
    let pts = obb.corners();
    for i in 0..pts.len() {
        let (a, b) = (pts[i], pts[(i + 1) % pts.len()]);
        for dx in 0..LINE_WIDTH {
            for dy in 0..LINE_WIDTH {
                let (ox, oy) = (dx as f32, dy as f32);
                draw_line_segment_mut(
                    canvas,
                    (a.x() + ox, a.y() + oy),
                    (b.x() + ox, b.y() + oy),
                    color,
                );
            }
        }
    }
}

/// top-most corner, where the tag sits
fn label_anchor(obb: &ObbBox) -> (f32, f32) {
    obb.corners()
        .iter()
        .map(|p| (p.x(), p.y()))
        .reduce(|top, p| if p.1 < top.1 { p } else { top })
        .unwrap_or((obb.cx(), obb.cy()))
}

fn draw_tag(canvas: &mut RgbaImage, font: &FontArc, text: &str, at: (f32, f32), bg: Rgba<u8>) {
    let scale = PxScale::from(FONT_PX);
    let (tw, th) = text_size(scale, font, text);
    let x = at.0.max(0.) as i32;
    let y = (at.1 - th as f32 - 4.).max(0.) as i32;
    draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(tw + 4, th + 4), bg);

    let [r, g, b, _] = bg.0;
    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    let fg = if luma > 140. {
        Rgba([0, 0, 0, 255])
    } else {
        Rgba([255, 255, 255, 255])
    };
    draw_text_mut(canvas, fg, x + 2, y + 2, scale, font, text);
}

/// Exact resize to `(width, height)`; aspect ratio is not preserved.
pub fn resize_to_canvas(
    image: &RgbaImage,
    labels: Vec<CanvasLabel>,
    (width, height): (u32, u32),
) -> Result<CanvasFrame> {
    if width == 0 || height == 0 || image.width() == 0 || image.height() == 0 {
        return Err(anyhow!(
            "cannot resize {}x{} to {}x{}",
            image.width(),
            image.height(),
            width,
            height
        ));
    }
    let (sx, sy) = (
        width as f32 / image.width() as f32,
        height as f32 / image.height() as f32,
    );

    let src = fr::images::ImageRef::new(
        image.width(),
        image.height(),
        image.as_raw(),
        fr::PixelType::U8x4,
    )
    .context("failed to create resize source")?;
    let mut dst = fr::images::Image::new(width, height, fr::PixelType::U8x4);
    let mut resizer = fr::Resizer::new();
    resizer
        .resize(
            &src,
            &mut dst,
            &fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
        )
        .context("canvas resize failed")?;

    Ok(CanvasFrame {
        width,
        height,
        rgba: dst.into_vec(),
        labels: labels
            .into_iter()
            .map(|l| CanvasLabel {
                x: l.x * sx,
                y: l.y * sy,
                ..l
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([40, 40, 40, 255])))
    }

    #[test]
    fn palette_wraps_around() {
        let a = Annotator::default();
        assert_eq!(a.color(0), a.color(12));
        assert_ne!(a.color(0), a.color(1));
    }

    #[test]
    fn plot_draws_outline_in_class_color() {
        let a = Annotator::default();
        let result = DetectionResult::new(Some(vec![ObbBox::new(50., 50., 40., 20., 0., 2, 0.9)]));
        let plotted = a.plot(&gray(100, 100), &result, &["a".into(), "b".into(), "c".into()]);
        // left edge of the box at x = 30
        assert_eq!(*plotted.image.get_pixel(30, 50), a.color(2));
        // interior untouched
        assert_eq!(*plotted.image.get_pixel(50, 50), Rgba([40, 40, 40, 255]));
        assert_eq!(plotted.labels.len(), 1);
        assert_eq!(plotted.labels[0].text, "c 0.90");
    }

    #[test]
    fn plain_frames_carry_no_labels() {
        let p = Plotted::plain(&gray(8, 8));
        assert!(p.labels.is_empty());
        assert_eq!(p.image.dimensions(), (8, 8));
    }

    #[test]
    fn canvas_is_exact_size_and_labels_follow() {
        let labels = vec![CanvasLabel {
            text: "x".into(),
            x: 100.,
            y: 60.,
            color: [0, 0, 0, 255],
        }];
        let frame = resize_to_canvas(&gray(200, 120).to_rgba8(), labels, (640, 360)).unwrap();
        assert_eq!((frame.width, frame.height), (640, 360));
        assert_eq!(frame.rgba.len(), 640 * 360 * 4);
        assert_eq!(frame.labels[0].x, 320.);
        assert_eq!(frame.labels[0].y, 180.);
        assert!(frame.to_image().is_some());
    }

    #[test]
    fn empty_canvas_is_rejected() {
        assert!(resize_to_canvas(&gray(4, 4).to_rgba8(), vec![], (0, 360)).is_err());
    }

    #[test]
    fn missing_font_file_is_an_error() {
        assert!(Annotator::from_font_file(Path::new("no/such/font.ttf")).is_err());
    }
}
