//! Face detection and landmark extraction seams.
//!
//! The monitor only needs "where are the faces" and "where are the 68
//! landmarks of this face"; both are traits so the frame logic can be driven
//! by canned data in tests.

use std::path::Path;

use rustface::{Detector, ImageData};
use tracing::debug;

use crate::config::DetectorConfig;
use crate::error::{Error, Result};
use crate::features::GrayImage;
use crate::model::ShapePredictor;
use crate::types::{BoundingBox, Shape};

/// Finds face regions in a grayscale frame.
pub trait FaceDetector {
    fn detect(&mut self, image: &GrayImage) -> Vec<BoundingBox>;
}

/// Places landmarks on one detected face.
pub trait LandmarkProvider {
    fn landmarks(&self, image: &GrayImage, face: &BoundingBox) -> Shape;

    /// Landmarks per face this provider produces.
    fn num_landmarks(&self) -> usize;
}

impl LandmarkProvider for ShapePredictor {
    fn landmarks(&self, image: &GrayImage, face: &BoundingBox) -> Shape {
        self.predict(image, face)
    }

    fn num_landmarks(&self) -> usize {
        ShapePredictor::num_landmarks(self)
    }
}

/// SeetaFace frontal detector via `rustface`.
pub struct RustfaceDetector {
    inner: Box<dyn Detector>,
}

impl RustfaceDetector {
    pub fn load<P: AsRef<Path>>(model: P, config: &DetectorConfig) -> Result<Self> {
        let model = model.as_ref();
        let path = model
            .to_str()
            .ok_or_else(|| Error::Detector(format!("non UTF-8 model path {}", model.display())))?;
        let mut inner = rustface::create_detector(path).map_err(|e| {
            Error::Detector(format!("failed to load {}: {e}", model.display()))
        })?;

        inner.set_min_face_size(config.min_face_size);
        inner.set_score_thresh(config.score_thresh);
        inner.set_pyramid_scale_factor(config.pyramid_scale_factor);
        inner.set_slide_window_step(config.slide_window_step, config.slide_window_step);

        Ok(Self { inner })
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&mut self, image: &GrayImage) -> Vec<BoundingBox> {
        use crate::features::ImageAccess;

        let data = ImageData::new(image.as_raw(), image.width(), image.height());
        let faces: Vec<BoundingBox> = self
            .inner
            .detect(&data)
            .iter()
            .map(|face| {
                let b = face.bbox();
                BoundingBox::new(b.x() as f32, b.y() as f32, b.width() as f32, b.height() as f32)
            })
            .collect();

        debug!(faces = faces.len(), "face detection");
        faces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    #[test]
    fn missing_detector_model_is_reported() {
        let err = RustfaceDetector::load("/nonexistent/seeta.bin", &DetectorConfig::default())
            .err()
            .expect("load should fail");
        assert!(matches!(err, Error::Detector(_)));
    }

    #[test]
    fn predictor_is_a_landmark_provider() {
        let mean = Shape::new(vec![Point::new(0.5, 0.5); 68]);
        let model = ShapePredictor::new(mean, vec![]).unwrap();
        let image = GrayImage::from_fn(40, 40, |_, _| 0);

        let provider: &dyn LandmarkProvider = &model;
        assert_eq!(provider.num_landmarks(), 68);
        let shape = provider.landmarks(&image, &BoundingBox::new(0.0, 0.0, 40.0, 40.0));
        assert_eq!(shape[0], Point::new(20.0, 20.0));
    }
}
