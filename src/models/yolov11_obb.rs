// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv11 OBB model
// loading, preprocess, inference and rotated-box postprocess

use anyhow::{anyhow, Result};
use image::{DynamicImage, GenericImageView};
use ndarray::{s, Array, Axis, IxDyn};

use crate::{non_max_suppression, DetectionResult, ObbBox, OrtBackend, OrtConfig, OrtEP, YOLOTask};

/// Letterbox fill value of the padded area
const PAD_VALUE: f32 = 144.0 / 255.0;

/// YOLOv11 OBB model
pub struct YOLOv11Obb {
    engine: OrtBackend,
    post: ObbPostprocessor,
    names: Vec<String>,
    profile: bool,
}

impl YOLOv11Obb {
    /// Load the weight file named by `config.weights`
    pub fn new(config: &crate::Args) -> Result<Self> {
        let engine = OrtBackend::build(OrtConfig {
            f: config.weights.clone(),
            ep: config.ep(),
            image_size: (config.height, config.width),
        })?;

        match engine.task() {
            Some(YOLOTask::Obb) | None => {}
            Some(other) => {
                return Err(anyhow!(
                    "{} is a {:?} model, an OBB model is required",
                    config.weights.display(),
                    other
                ))
            }
        }

        let names = engine.names().unwrap_or_default();
        let nc = resolve_nc(&names, engine.output_shape())
            .ok_or_else(|| anyhow!("Failed to get num_classes from the model output"))?;

        let post = ObbPostprocessor::new(ObbConfig {
            nc,
            width: engine.width() as usize,
            height: engine.height() as usize,
            conf: config.conf,
            iou: config.iou,
        });

        Ok(Self {
            engine,
            post,
            names,
            profile: config.profile,
        })
    }

    pub fn preprocess(&self, xs: &[DynamicImage]) -> Result<Array<f32, IxDyn>> {
        let (width, height) = (self.engine.width(), self.engine.height());
        let mut ys = Array::ones((xs.len(), 3, height as usize, width as usize)).into_dyn();
        ys.fill(PAD_VALUE);
        for (idx, x) in xs.iter().enumerate() {
            let (w0, h0) = x.dimensions();
            let (_, w_new, h_new) =
                scale_wh(w0 as f32, h0 as f32, width as f32, height as f32);
            let img = x.resize_exact(
                w_new as u32,
                h_new as u32,
                image::imageops::FilterType::Triangle,
            );

            for (x, y, rgb) in img.pixels() {
                let x = x as usize;
                let y = y as usize;
                let [r, g, b, _] = rgb.0;
                ys[[idx, 0, y, x]] = (r as f32) / 255.0;
                ys[[idx, 1, y, x]] = (g as f32) / 255.0;
                ys[[idx, 2, y, x]] = (b as f32) / 255.0;
            }
        }

        Ok(ys)
    }

}

/// Class count of an OBB head.
///
/// Metadata names win; otherwise the channel axis of `output0` is the
/// smaller static one of `[batch, channels, anchors]` or its transpose.
pub fn resolve_nc(names: &[String], output_shape: Option<&[i64]>) -> Option<usize> {
    if !names.is_empty() {
        return Some(names.len());
    }
    let channels = match output_shape? {
        [_, a, b] if *a > 0 && *b > 0 => (*a).min(*b),
        [_, a, _] if *a > 0 => *a,
        [_, _, b] if *b > 0 => *b,
        _ => return None,
    };
    (channels > 5).then(|| channels as usize - 5)
}

impl super::Model for YOLOv11Obb {
    fn preprocess(&mut self, images: &[DynamicImage]) -> Result<Vec<Array<f32, IxDyn>>> {
        let t = std::time::Instant::now();
        let batch = YOLOv11Obb::preprocess(self, images)?;
        if self.profile {
            log::info!("[Model Preprocess]: {:?}", t.elapsed());
        }
        Ok(vec![batch])
    }

    fn run(&mut self, xs: Vec<Array<f32, IxDyn>>, profile: bool) -> Result<Vec<Array<f32, IxDyn>>> {
        let x = xs
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("empty input batch"))?;
        self.engine.run(x, profile || self.profile)
    }

    fn postprocess(
        &self,
        xs: Vec<Array<f32, IxDyn>>,
        xs0: &[DynamicImage],
    ) -> Result<Vec<DetectionResult>> {
        let t = std::time::Instant::now();
        let sizes: Vec<(u32, u32)> = xs0.iter().map(|x| x.dimensions()).collect();
        let ys = self.post.postprocess(&xs, &sizes)?;
        if self.profile {
            log::info!("[Model Postprocess]: {:?}", t.elapsed());
        }
        Ok(ys)
    }

    fn names(&self) -> &[String] {
        &self.names
    }

    fn conf(&self) -> f32 {
        self.post.config.conf
    }

    fn set_conf(&mut self, val: f32) {
        self.post.config.conf = val;
    }

    fn summary(&self) {
        log::info!(
            "\nSummary:\n\
            > Task: OBB{}\n\
            > EP: {:?} {}\n\
            > Height: {}, Width: {} ({})\n\
            > nc: {}, conf: {}, iou: {}\n\
            > names: {:?}",
            match self.engine.author().zip(self.engine.version()) {
                Some((author, ver)) => format!(" ({} {})", author, ver),
                None => String::from(""),
            },
            self.engine.ep(),
            if let OrtEP::CPU = self.engine.ep() {
                ""
            } else {
                "(May still fall back to CPU)"
            },
            self.engine.height(),
            self.engine.width(),
            if self.engine.is_dynamic() {
                "Dynamic"
            } else {
                "Const"
            },
            self.post.config.nc,
            self.post.config.conf,
            self.post.config.iou,
            self.names,
        );
    }
}

fn scale_wh(w0: f32, h0: f32, w1: f32, h1: f32) -> (f32, f32, f32) {
    let r = (w1 / w0).min(h1 / h0);
    (r, (w0 * r).round(), (h0 * r).round())
}

/// Decoding parameters of the OBB head
#[derive(Debug, Clone)]
pub struct ObbConfig {
    pub nc: usize,
    pub width: usize,
    pub height: usize,
    pub conf: f32,
    pub iou: f32,
}

/// OBB head decoder
///
/// The head emits `[batch, 4 + nc + 1, anchors]`: `cx, cy, w, h` in input
/// pixels, one score per class, then the angle in radians. Some exports
/// are transposed to `[batch, anchors, 4 + nc + 1]`; both are accepted.
pub struct ObbPostprocessor {
    config: ObbConfig,
}

impl ObbPostprocessor {
    pub fn new(config: ObbConfig) -> Self {
        Self { config }
    }

    /// `sizes0` are the `(width, height)` of the original images.
    pub fn postprocess(
        &self,
        xs: &[Array<f32, IxDyn>],
        sizes0: &[(u32, u32)],
    ) -> Result<Vec<DetectionResult>> {
        const CXYWH_OFFSET: usize = 4;
        let nc = self.config.nc;
        let channels = CXYWH_OFFSET + nc + 1;

        let preds = xs.first().ok_or_else(|| anyhow!("model produced no output"))?;
        if preds.ndim() != 3 {
            return Err(anyhow!("unexpected OBB output shape {:?}", preds.shape()));
        }
        let anchor_axis = if preds.shape()[1] == channels {
            Axis(1)
        } else if preds.shape()[2] == channels {
            Axis(0)
        } else {
            return Err(anyhow!(
                "output shape {:?} does not match {} classes",
                preds.shape(),
                nc
            ));
        };

        let mut ys = Vec::new();
        for (idx, anchor) in preds.axis_iter(Axis(0)).enumerate() {
            let (width_original, height_original) = sizes0
                .get(idx)
                .map(|&(w, h)| (w as f32, h as f32))
                .ok_or_else(|| anyhow!("missing original size of image {}", idx))?;
            let ratio = (self.config.width as f32 / width_original)
                .min(self.config.height as f32 / height_original);

            let mut data: Vec<ObbBox> = Vec::new();
            for pred in anchor.axis_iter(anchor_axis) {
                let clss = pred.slice(s![CXYWH_OFFSET..CXYWH_OFFSET + nc]);
                let Some((id, &confidence)) = clss
                    .iter()
                    .enumerate()
                    .reduce(|max, x| if x.1 > max.1 { x } else { max })
                else {
                    continue;
                };

                if confidence < self.config.conf {
                    continue;
                }

                let obb = ObbBox::new(
                    pred[0] / ratio,
                    pred[1] / ratio,
                    pred[2] / ratio,
                    pred[3] / ratio,
                    pred[CXYWH_OFFSET + nc],
                    id,
                    confidence,
                );
                data.push(obb);
            }

            non_max_suppression(&mut data, self.config.iou);

            let obbs: Vec<ObbBox> = data.iter().map(ObbBox::regularize).collect();
            ys.push(DetectionResult::new(if obbs.is_empty() {
                None
            } else {
                Some(obbs)
            }));
        }

        Ok(ys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(nc: usize) -> ObbPostprocessor {
        ObbPostprocessor::new(ObbConfig {
            nc,
            width: 640,
            height: 640,
            conf: 0.5,
            iou: 0.7,
        })
    }

    /// columns are anchors: (cx, cy, w, h, scores.., angle)
    fn head(anchors: &[[f32; 7]]) -> Array<f32, IxDyn> {
        let mut out = Array::zeros((1, 7, anchors.len())).into_dyn();
        for (i, a) in anchors.iter().enumerate() {
            for (c, v) in a.iter().enumerate() {
                out[[0, c, i]] = *v;
            }
        }
        out
    }

    #[test]
    fn decodes_and_rescales_to_original_pixels() {
        // 1280x720 original -> ratio 0.5 into 640x640
        let out = head(&[[100., 50., 40., 20., 0.1, 0.9, 0.3]]);
        let ys = post(2).postprocess(&[out], &[(1280, 720)]).unwrap();
        let obbs = ys[0].obbs().unwrap();
        assert_eq!(obbs.len(), 1);
        let b = &obbs[0];
        assert_eq!(b.class_id(), 1);
        assert!((b.cx() - 200.).abs() < 1e-4);
        assert!((b.cy() - 100.).abs() < 1e-4);
        assert!((b.width() - 80.).abs() < 1e-4);
        assert!((b.height() - 40.).abs() < 1e-4);
        assert!((b.angle() - 0.3).abs() < 1e-6);
        assert!((b.confidence() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn low_confidence_anchors_give_no_obbs() {
        let out = head(&[[100., 50., 40., 20., 0.2, 0.3, 0.0]]);
        let ys = post(2).postprocess(&[out], &[(640, 640)]).unwrap();
        assert!(ys[0].obbs().is_none());
        assert!(ys[0].is_empty());
    }

    #[test]
    fn overlapping_anchors_are_suppressed() {
        let out = head(&[
            [100., 100., 40., 20., 0.8, 0.0, 0.2],
            [101., 100., 40., 20., 0.95, 0.0, 0.2],
            [400., 400., 40., 20., 0.9, 0.0, 0.2],
        ]);
        let ys = post(2).postprocess(&[out], &[(640, 640)]).unwrap();
        let confs: Vec<f32> = ys[0].obbs().unwrap().iter().map(|b| b.confidence()).collect();
        assert_eq!(confs, vec![0.95, 0.9]);
    }

    #[test]
    fn obtuse_angles_are_regularized() {
        let out = head(&[[100., 100., 60., 20., 0.9, 0.0, 2.0]]);
        let ys = post(2).postprocess(&[out], &[(640, 640)]).unwrap();
        let b = &ys[0].obbs().unwrap()[0];
        assert_eq!(b.width(), 20.);
        assert_eq!(b.height(), 60.);
        assert!(b.angle() < std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn transposed_exports_are_accepted() {
        let mut out = Array::zeros((1, 1, 7)).into_dyn();
        for (c, v) in [10., 20., 8., 4., 0.99, 0.1, 0.0].iter().enumerate() {
            out[[0, 0, c]] = *v;
        }
        let ys = post(2).postprocess(&[out], &[(640, 640)]).unwrap();
        assert_eq!(ys[0].len(), 1);
    }

    #[test]
    fn class_count_prefers_metadata_names() {
        let names = vec!["plate".to_string(), "bolt".to_string(), "nut".to_string()];
        assert_eq!(resolve_nc(&names, Some(&[1i64, 8, 8400][..])), Some(3));
        assert_eq!(resolve_nc(&[], Some(&[1i64, 7, -1][..])), Some(2));
        assert_eq!(resolve_nc(&[], Some(&[1i64, -1, -1][..])), None);
        assert_eq!(resolve_nc(&[], None), None);
    }

    #[test]
    fn transposed_head_without_names_decodes() {
        // [1, anchors, 4 + nc + 1] with 300 anchors
        let mut out = Array::zeros((1, 300, 7)).into_dyn();
        for (c, v) in [320., 160., 40., 20., 0.1, 0.95, 0.4].iter().enumerate() {
            out[[0, 42, c]] = *v;
        }
        let nc = resolve_nc(&[], Some(&[1i64, 300, 7][..])).unwrap();
        assert_eq!(nc, 2);

        let ys = post(nc).postprocess(&[out], &[(640, 640)]).unwrap();
        let obbs = ys[0].obbs().unwrap();
        assert_eq!(obbs.len(), 1);
        assert_eq!(obbs[0].class_id(), 1);
        assert!((obbs[0].cx() - 320.).abs() < 1e-4);
        assert!((obbs[0].angle() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn channel_mismatch_is_an_error() {
        let out = Array::zeros((1, 9, 3)).into_dyn();
        assert!(post(2).postprocess(&[out], &[(640, 640)]).is_err());
    }
}
