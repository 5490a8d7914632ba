use serde::{Deserialize, Serialize};

use crate::types::Point;

/// A split comparing two of the stage's feature pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub idx1: u32,
    pub idx2: u32,
    pub threshold: f32,
}

/// A complete binary regression tree in implicit heap order.
///
/// Split `i` has children `2i + 1` and `2i + 2`; indices past the last split
/// address `leaves[index - splits.len()]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub splits: Vec<Split>,
    pub leaves: Vec<Vec<Point>>,
}

impl RegressionTree {
    pub fn new(splits: Vec<Split>, leaves: Vec<Vec<Point>>) -> Self {
        Self { splits, leaves }
    }

    /// Walk to a leaf using precomputed feature pixel intensities.
    ///
    /// Goes left when `pixels[idx1] - pixels[idx2] > threshold`.
    pub fn leaf(&self, pixels: &[f32]) -> &[Point] {
        let mut i = 0usize;
        while let Some(split) = self.splits.get(i) {
            let diff = pixels[split.idx1 as usize] - pixels[split.idx2 as usize];
            i = if diff > split.threshold { 2 * i + 1 } else { 2 * i + 2 };
        }
        &self.leaves[i - self.splits.len()]
    }
}

/// A feature pixel: an offset relative to one landmark of the current shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeaturePixel {
    pub anchor: u32,
    pub offset: Point,
}

/// One cascade level: its feature pixels and the trees voting on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeStage {
    pub pixels: Vec<FeaturePixel>,
    pub trees: Vec<RegressionTree>,
}

impl CascadeStage {
    /// Sum of all trees' leaf deltas for the given pixel intensities.
    pub fn delta(&self, intensities: &[f32], num_landmarks: usize) -> Vec<Point> {
        let mut total = vec![Point::default(); num_landmarks];
        for tree in &self.trees {
            for (t, d) in total.iter_mut().zip(tree.leaf(intensities)) {
                *t += *d;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(threshold: f32) -> RegressionTree {
        RegressionTree::new(
            vec![Split {
                idx1: 0,
                idx2: 1,
                threshold,
            }],
            vec![vec![Point::new(-0.1, 0.0)], vec![Point::new(0.1, 0.0)]],
        )
    }

    #[test]
    fn stump_goes_left_above_threshold() {
        let tree = stump(50.0);
        assert_eq!(tree.leaf(&[200.0, 100.0])[0].x, -0.1);
        // Equal difference goes right
        assert_eq!(tree.leaf(&[150.0, 100.0])[0].x, 0.1);
    }

    #[test]
    fn depth_two_reaches_every_leaf() {
        let split = |idx1, idx2| Split {
            idx1,
            idx2,
            threshold: 0.0,
        };
        let leaves = (0..4).map(|i| vec![Point::new(i as f32, 0.0)]).collect();
        let tree = RegressionTree::new(vec![split(0, 1), split(1, 2), split(2, 0)], leaves);

        // root left (p0 > p1), then node 1: p1 > p2 -> leaf 0
        assert_eq!(tree.leaf(&[3.0, 2.0, 1.0])[0].x, 0.0);
        // root left, node 1 right -> leaf 1
        assert_eq!(tree.leaf(&[3.0, 1.0, 2.0])[0].x, 1.0);
        // root right, node 2: p2 > p0 -> leaf 2
        assert_eq!(tree.leaf(&[1.0, 2.0, 3.0])[0].x, 2.0);
        // root right, node 2 right -> leaf 3
        assert_eq!(tree.leaf(&[2.0, 3.0, 1.0])[0].x, 3.0);
    }

    #[test]
    fn stage_sums_tree_votes() {
        let leaf_only = |dx| RegressionTree::new(vec![], vec![vec![Point::new(dx, 0.5)]]);
        let stage = CascadeStage {
            pixels: vec![],
            trees: vec![leaf_only(0.1), leaf_only(0.3)],
        };
        let delta = stage.delta(&[], 1);
        assert!((delta[0].x - 0.4).abs() < 1e-6);
        assert!((delta[0].y - 1.0).abs() < 1e-6);
    }
}
