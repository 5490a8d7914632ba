use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::features::{sample_normalized, ImageAccess, SimilarityTransform};
use crate::tree::CascadeStage;
use crate::types::{BoundingBox, Shape};

/// Ensemble-of-regression-trees landmark predictor (Kazemi & Sullivan, 2014).
///
/// Shapes are refined in the unit square of the face box: the mean shape is
/// the starting estimate, and every cascade stage samples its feature pixels
/// relative to the current estimate (rotated and scaled by the similarity
/// between mean and current shape) before adding its trees' deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapePredictor {
    initial_shape: Shape,
    stages: Vec<CascadeStage>,
}

impl ShapePredictor {
    pub fn new(initial_shape: Shape, stages: Vec<CascadeStage>) -> Result<Self> {
        let model = Self {
            initial_shape,
            stages,
        };
        model.validate()?;
        Ok(model)
    }

    /// Load a predictor by file extension.
    ///
    /// `.bin` files are this crate's bincode cache; anything else is parsed as a
    /// dlib `shape_predictor` (`.dat`, or `.dat.bz2` compressed).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let model = if path.extension().is_some_and(|ext| ext == "bin") {
            let mut bytes = Vec::new();
            BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
            let model: Self = bincode::deserialize(&bytes)?;
            model.validate()?;
            model
        } else {
            crate::dlib::load_dlib_model(path)?
        };

        info!(
            path = %path.display(),
            landmarks = model.num_landmarks(),
            stages = model.num_cascade_stages(),
            "loaded shape predictor"
        );
        Ok(model)
    }

    /// Write the bincode cache format read back by [`ShapePredictor::load`].
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&bincode::serialize(self)?)?;
        writer.flush()?;
        Ok(())
    }

    pub fn num_landmarks(&self) -> usize {
        self.initial_shape.num_landmarks()
    }

    pub fn num_cascade_stages(&self) -> usize {
        self.stages.len()
    }

    /// Landmarks of the face inside `face_rect`, in image coordinates.
    pub fn predict<I: ImageAccess>(&self, image: &I, face_rect: &BoundingBox) -> Shape {
        let n = self.num_landmarks();
        let mut current = self.initial_shape.clone();

        for stage in &self.stages {
            let tform = SimilarityTransform::between(&self.initial_shape, &current);
            let intensities: Vec<f32> = stage
                .pixels
                .iter()
                .map(|fp| {
                    let loc = tform.apply(fp.offset) + current[fp.anchor as usize];
                    sample_normalized(image, face_rect, loc)
                })
                .collect();

            current.add_delta(&stage.delta(&intensities, n));
        }

        debug!(landmarks = n, "predicted shape");
        Shape::new(
            current
                .points
                .iter()
                .map(|p| face_rect.denormalize_point(*p))
                .collect(),
        )
    }

    fn validate(&self) -> Result<()> {
        let n = self.num_landmarks();
        if n == 0 {
            return Err(Error::InvalidModel("initial shape has no landmarks".into()));
        }

        for (s, stage) in self.stages.iter().enumerate() {
            if let Some(fp) = stage.pixels.iter().find(|fp| fp.anchor as usize >= n) {
                return Err(Error::InvalidModel(format!(
                    "stage {s}: anchor {} out of range for {n} landmarks",
                    fp.anchor
                )));
            }
            for tree in &stage.trees {
                if tree.leaves.len() != tree.splits.len() + 1 {
                    return Err(Error::InvalidModel(format!(
                        "stage {s}: {} splits need {} leaves, got {}",
                        tree.splits.len(),
                        tree.splits.len() + 1,
                        tree.leaves.len()
                    )));
                }
                if tree.leaves.iter().any(|leaf| leaf.len() != n) {
                    return Err(Error::InvalidModel(format!(
                        "stage {s}: leaf delta length differs from {n} landmarks"
                    )));
                }
                let pixels = stage.pixels.len() as u32;
                if tree
                    .splits
                    .iter()
                    .any(|sp| sp.idx1 >= pixels || sp.idx2 >= pixels)
                {
                    return Err(Error::InvalidModel(format!(
                        "stage {s}: split references a feature pixel past {pixels}"
                    )));
                }
            }
        }
        Ok(())
    }
}
