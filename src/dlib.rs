//! Reader for dlib's serialized `shape_predictor` (`.dat`, optionally `.bz2`).
//!
//! Pre-trained 68-point models come from the dlib-models repository:
//!
//! ```bash
//! git clone --depth 1 https://github.com/davisking/dlib-models.git
//! ```
//!
//! The 5-point model loads too, but the monitor rejects it at startup since
//! it has no eye contours or lips.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use bzip2::read::BzDecoder;

use crate::error::{Error, Result};
use crate::model::ShapePredictor;
use crate::tree::{CascadeStage, FeaturePixel, RegressionTree, Split};
use crate::types::{Point, Shape};

/// dlib's portable integer/float encoding.
///
/// Integers: a control byte (bit 7 = negative, low nibble = byte count)
/// followed by that many little-endian magnitude bytes. Floats: an integer
/// mantissa and an integer exponent.
struct Decoder<R> {
    inner: R,
}

impl<R: Read> Decoder<R> {
    fn new(inner: R) -> Self {
        Self { inner }
    }

    fn int(&mut self) -> Result<i64> {
        let mut control = [0u8; 1];
        self.inner.read_exact(&mut control)?;
        let len = (control[0] & 0x0F) as usize;
        if len > 8 {
            return Err(Error::InvalidModel(format!(
                "integer of {len} bytes in model stream"
            )));
        }

        let mut bytes = [0u8; 8];
        self.inner.read_exact(&mut bytes[..len])?;
        let raw = u64::from_le_bytes(bytes);
        let magnitude = i64::try_from(raw).ok();

        let value = if control[0] & 0x80 != 0 {
            magnitude.and_then(i64::checked_neg)
        } else {
            magnitude
        };
        value.ok_or_else(|| {
            Error::InvalidModel(format!("integer magnitude {raw} out of range in model stream"))
        })
    }

    fn count(&mut self) -> Result<usize> {
        let v = self.int()?;
        usize::try_from(v).map_err(|_| Error::InvalidModel(format!("negative length {v}")))
    }

    fn float(&mut self) -> Result<f32> {
        let mantissa = self.int()?;
        let exponent = self.int()?;
        if mantissa == 0 {
            return Ok(0.0);
        }
        Ok((mantissa as f64 * 2f64.powi(exponent as i32)) as f32)
    }

    /// A column vector of interleaved (x, y) pairs, stored as `-rows, -cols, data`.
    fn points(&mut self) -> Result<Vec<Point>> {
        let rows = -self.int()?;
        let cols = -self.int()?;
        if cols != 1 || rows < 0 || rows % 2 != 0 {
            return Err(Error::InvalidModel(format!(
                "expected a 2n x 1 point column, got {rows}x{cols}"
            )));
        }

        (0..rows / 2)
            .map(|_| Ok(Point::new(self.float()?, self.float()?)))
            .collect()
    }
}

/// Load a dlib shape predictor from disk.
pub fn load_dlib_model<P: AsRef<Path>>(path: P) -> Result<ShapePredictor> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    if path.extension().is_some_and(|ext| ext == "bz2") {
        load_dlib_model_from_reader(BzDecoder::new(reader))
    } else {
        load_dlib_model_from_reader(reader)
    }
}

/// Parse a dlib shape predictor from an uncompressed stream.
pub fn load_dlib_model_from_reader<R: Read>(reader: R) -> Result<ShapePredictor> {
    let mut d = Decoder::new(reader);

    let version = d.int()?;
    if version != 1 {
        return Err(Error::InvalidModel(format!(
            "unsupported shape_predictor version {version}"
        )));
    }

    let initial_shape = Shape::new(d.points()?);
    let num_landmarks = initial_shape.num_landmarks();

    let forests = (0..d.count()?)
        .map(|_| {
            (0..d.count()?)
                .map(|_| read_tree(&mut d, num_landmarks))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let anchors = (0..d.count()?)
        .map(|_| {
            (0..d.count()?)
                .map(|_| Ok(d.int()? as u32))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<Vec<u32>>>>()?;

    let offsets = (0..d.count()?)
        .map(|_| {
            (0..d.count()?)
                .map(|_| Ok(Point::new(d.float()?, d.float()?)))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<Vec<Point>>>>()?;

    if anchors.len() != forests.len() || offsets.len() != forests.len() {
        return Err(Error::InvalidModel(format!(
            "{} forests but {} anchor and {} offset tables",
            forests.len(),
            anchors.len(),
            offsets.len()
        )));
    }

    let stages = forests
        .into_iter()
        .zip(anchors.into_iter().zip(offsets))
        .enumerate()
        .map(|(i, (trees, (anchors, offsets)))| {
            if anchors.len() != offsets.len() {
                return Err(Error::InvalidModel(format!(
                    "stage {i}: {} anchors for {} offsets",
                    anchors.len(),
                    offsets.len()
                )));
            }
            let pixels = anchors
                .into_iter()
                .zip(offsets)
                .map(|(anchor, offset)| FeaturePixel { anchor, offset })
                .collect();
            Ok(CascadeStage { pixels, trees })
        })
        .collect::<Result<Vec<_>>>()?;

    ShapePredictor::new(initial_shape, stages)
}

fn read_tree<R: Read>(d: &mut Decoder<R>, num_landmarks: usize) -> Result<RegressionTree> {
    let splits = (0..d.count()?)
        .map(|_| {
            Ok(Split {
                idx1: d.int()? as u32,
                idx2: d.int()? as u32,
                threshold: d.float()?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let leaves = (0..d.count()?)
        .map(|_| {
            let leaf = d.points()?;
            if leaf.len() != num_landmarks {
                return Err(Error::InvalidModel(format!(
                    "leaf holds {} points, model has {num_landmarks}",
                    leaf.len()
                )));
            }
            Ok(leaf)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RegressionTree::new(splits, leaves))
}
