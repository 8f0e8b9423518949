#![allow(clippy::type_complexity)]
// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod annotate; // rotated box plotting + canvas resize
pub mod config; // command line configuration
pub mod input; // camera capture and port probing
pub mod models; // model interface and the OBB implementation
pub mod ort_backend; // ONNX Runtime session wrapper
pub mod panel; // GUI-free state of the three panels
pub mod pipeline; // background capture loop
pub mod sidecar; // JSON export
#[doc(hidden)]
pub mod testing; // fake camera + model
pub mod ui; // macroquad + egui front-ends

pub use crate::config::Args;
pub use crate::models::{Model, ObbConfig, ObbPostprocessor, YOLOv11Obb};
pub use crate::ort_backend::{OrtBackend, OrtConfig, OrtEP, YOLOTask};

use std::f32::consts::{FRAC_PI_2, PI};

const EPS: f32 = 1e-7;

/// Greedy per-class NMS over rotated boxes, highest confidence first.
pub fn non_max_suppression(xs: &mut Vec<ObbBox>, iou_threshold: f32) {
    xs.sort_by(|b1, b2| b2.confidence().total_cmp(&b1.confidence()));

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            if xs[prev_index].class_id() != xs[index].class_id() {
                continue;
            }
            let iou = xs[prev_index].probiou(&xs[index]);
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

#[derive(Clone, PartialEq, Default)]
pub struct DetectionResult {
    // OBB results of one image
    pub obbs: Option<Vec<ObbBox>>,
}

impl std::fmt::Debug for DetectionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionResult")
            .field("count", &self.len())
            .field("Obbs", &self.obbs)
            .finish()
    }
}

impl DetectionResult {
    pub fn new(obbs: Option<Vec<ObbBox>>) -> Self {
        Self { obbs }
    }

    pub fn obbs(&self) -> Option<&Vec<ObbBox>> {
        self.obbs.as_ref()
    }

    pub fn len(&self) -> usize {
        self.obbs.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct Point2 {
    x: f32,
    y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObbBox {
    // an oriented box around an object, center based, angle in radians
    cx: f32,
    cy: f32,
    width: f32,
    height: f32,
    angle: f32,
    id: usize,
    confidence: f32,
}

impl ObbBox {
    pub fn new(
        cx: f32,
        cy: f32,
        width: f32,
        height: f32,
        angle: f32,
        id: usize,
        confidence: f32,
    ) -> Self {
        Self {
            cx,
            cy,
            width,
            height,
            angle,
            id,
            confidence,
        }
    }

    pub fn cx(&self) -> f32 {
        self.cx
    }

    pub fn cy(&self) -> f32 {
        self.cy
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn class_id(&self) -> usize {
        self.id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Same box expressed with an angle in `[0, π/2)`.
    ///
    /// Angles in `[π/2, π)` (mod π) describe the same rectangle with width
    /// and height exchanged.
    pub fn regularize(&self) -> Self {
        let swap = self.angle.rem_euclid(PI) >= FRAC_PI_2;
        let (width, height) = if swap {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        };
        Self {
            width,
            height,
            angle: self.angle.rem_euclid(FRAC_PI_2),
            ..self.clone()
        }
    }

    pub fn corners(&self) -> [Point2; 4] {
        let (sin, cos) = self.angle.sin_cos();
        let v1 = (self.width / 2. * cos, self.width / 2. * sin);
        let v2 = (-self.height / 2. * sin, self.height / 2. * cos);
        [
            Point2::new(self.cx + v1.0 + v2.0, self.cy + v1.1 + v2.1),
            Point2::new(self.cx + v1.0 - v2.0, self.cy + v1.1 - v2.1),
            Point2::new(self.cx - v1.0 - v2.0, self.cy - v1.1 - v2.1),
            Point2::new(self.cx - v1.0 + v2.0, self.cy - v1.1 + v2.1),
        ]
    }

    fn covariance(&self) -> (f32, f32, f32) {
        let a = self.width.powi(2) / 12.;
        let b = self.height.powi(2) / 12.;
        let (sin, cos) = self.angle.sin_cos();
        (
            a * cos * cos + b * sin * sin,
            a * sin * sin + b * cos * cos,
            (a - b) * cos * sin,
        )
    }

    /// Probabilistic IoU: boxes as 2D Gaussians, `1 - Hellinger distance`.
    pub fn probiou(&self, another: &ObbBox) -> f32 {
        let (a1, b1, c1) = self.covariance();
        let (a2, b2, c2) = another.covariance();
        let (dx, dy) = (self.cx - another.cx, self.cy - another.cy);

        let denom = (a1 + a2) * (b1 + b2) - (c1 + c2).powi(2) + EPS;
        let t1 = ((a1 + a2) * dy.powi(2) + (b1 + b2) * dx.powi(2)) / denom * 0.25;
        let t2 = ((c1 + c2) * (-dx) * dy) / denom * 0.5;
        let det1 = (a1 * b1 - c1.powi(2)).max(0.);
        let det2 = (a2 * b2 - c2.powi(2)).max(0.);
        let t3 = (((a1 + a2) * (b1 + b2) - (c1 + c2).powi(2)) / (4. * (det1 * det2).sqrt() + EPS)
            + EPS)
            .ln()
            * 0.5;

        let bd = (t1 + t2 + t3).clamp(EPS, 100.);
        let hd = (1. - (-bd).exp() + EPS).sqrt();
        1. - hd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obb(cx: f32, cy: f32, w: f32, h: f32, r: f32, id: usize, conf: f32) -> ObbBox {
        ObbBox::new(cx, cy, w, h, r, id, conf)
    }

    #[test]
    fn identical_boxes_have_probiou_near_one() {
        let a = obb(100., 100., 40., 20., 0.3, 0, 0.9);
        assert!(a.probiou(&a) > 0.99);
    }

    #[test]
    fn distant_boxes_have_probiou_near_zero() {
        let a = obb(100., 100., 40., 20., 0.3, 0, 0.9);
        let b = obb(900., 700., 40., 20., 0.3, 0, 0.9);
        assert!(a.probiou(&b) < 0.01);
    }

    #[test]
    fn probiou_ignores_quarter_turn_with_swapped_sides() {
        let a = obb(50., 50., 40., 20., 0., 0, 0.9);
        let b = obb(50., 50., 20., 40., FRAC_PI_2, 0, 0.9);
        assert!(a.probiou(&b) > 0.99);
    }

    #[test]
    fn regularize_swaps_sides_for_obtuse_angles() {
        let b = obb(10., 10., 30., 10., FRAC_PI_2 + 0.2, 1, 0.5).regularize();
        assert_eq!(b.width(), 10.);
        assert_eq!(b.height(), 30.);
        assert!((b.angle() - 0.2).abs() < 1e-5);

        let kept = obb(10., 10., 30., 10., 0.4, 1, 0.5).regularize();
        assert_eq!(kept.width(), 30.);
        assert!((kept.angle() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn corners_of_axis_aligned_box() {
        let c = obb(10., 20., 4., 2., 0., 0, 1.).corners();
        assert_eq!(c[0], Point2::new(12., 21.));
        assert_eq!(c[1], Point2::new(12., 19.));
        assert_eq!(c[2], Point2::new(8., 19.));
        assert_eq!(c[3], Point2::new(8., 21.));
    }

    #[test]
    fn nms_keeps_best_of_overlapping_same_class() {
        let mut xs = vec![
            obb(100., 100., 40., 20., 0.1, 0, 0.7),
            obb(101., 100., 40., 20., 0.1, 0, 0.95),
            obb(400., 300., 40., 20., 0.1, 0, 0.8),
        ];
        non_max_suppression(&mut xs, 0.7);
        assert_eq!(xs.len(), 2);
        assert_eq!(xs[0].confidence(), 0.95);
        assert_eq!(xs[1].confidence(), 0.8);
    }

    #[test]
    fn nms_is_per_class() {
        let mut xs = vec![
            obb(100., 100., 40., 20., 0.1, 0, 0.9),
            obb(100., 100., 40., 20., 0.1, 1, 0.85),
        ];
        non_max_suppression(&mut xs, 0.7);
        assert_eq!(xs.len(), 2);
    }

    #[test]
    fn detection_result_debug_names_the_type() {
        let text = format!("{:?}", DetectionResult::default());
        assert!(text.starts_with("DetectionResult {"), "{}", text);
        assert!(text.contains("count: 0"));
    }

    #[test]
    fn detection_result_counts() {
        assert!(DetectionResult::default().is_empty());
        let r = DetectionResult::new(Some(vec![obb(1., 1., 1., 1., 0., 0, 0.9)]));
        assert_eq!(r.len(), 1);
    }
}
