//! Eye and mouth aspect ratios from facial landmarks.
//!
//! Both ratios are height-over-width measurements of a landmark region and
//! are therefore invariant to where the face sits in the frame and how large
//! it appears. The point subsets are taken from the 68-point iBUG layout.

use std::ops::Range;

use crate::error::{Error, Result};
use crate::types::{Point, Shape};

/// Landmark range of the subject's right eye (image left).
pub const RIGHT_EYE: Range<usize> = 36..42;

/// Landmark range of the subject's left eye (image right).
pub const LEFT_EYE: Range<usize> = 42..48;

/// Landmark range of the outer and inner lips.
pub const MOUTH: Range<usize> = 48..68;

/// Number of landmarks a shape needs for all three regions.
pub const REQUIRED_LANDMARKS: usize = MOUTH.end;

/// Eye aspect ratio of a 6-point eye contour.
///
/// Points run clockwise from the outer corner: `0` and `3` are the corners,
/// `1`/`2` the upper lid and `5`/`4` the lower lid beneath them. A zero-width
/// eye yields a non-finite result.
pub fn eye_aspect_ratio(eye: &[Point; 6]) -> f32 {
    let a = eye[1].distance(&eye[5]);
    let b = eye[2].distance(&eye[4]);
    let width = eye[0].distance(&eye[3]);

    ((a + b) / 2.0) / width
}

/// Mouth aspect ratio of the 20-point lip contour.
///
/// Height is the mean of three vertical inner-lip distances, width the
/// `11`-`15` span. A zero-width mouth yields a non-finite result.
pub fn mouth_aspect_ratio(mouth: &[Point; 20]) -> f32 {
    let a = mouth[12].distance(&mouth[18]);
    let b = mouth[13].distance(&mouth[17]);
    let c = mouth[14].distance(&mouth[16]);
    let width = mouth[11].distance(&mouth[15]);

    ((a + b + c) / 3.0) / width
}

/// The three monitored regions of one face, borrowed from its shape.
#[derive(Debug, Clone, Copy)]
pub struct FaceRegions<'a> {
    pub left_eye: &'a [Point; 6],
    pub right_eye: &'a [Point; 6],
    pub mouth: &'a [Point; 20],
}

impl<'a> FaceRegions<'a> {
    /// Split a 68 (or 81) point shape into its eye and mouth subsets.
    pub fn from_shape(shape: &'a Shape) -> Result<Self> {
        let too_few = || Error::TooFewLandmarks {
            expected: REQUIRED_LANDMARKS,
            found: shape.num_landmarks(),
        };

        let left_eye = shape
            .region(LEFT_EYE)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(too_few)?;
        let right_eye = shape
            .region(RIGHT_EYE)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(too_few)?;
        let mouth = shape
            .region(MOUTH)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(too_few)?;

        Ok(Self {
            left_eye,
            right_eye,
            mouth,
        })
    }

    /// Left, right and mean eye aspect ratio.
    pub fn eye_ratio(&self) -> (f32, f32, f32) {
        let left = eye_aspect_ratio(self.left_eye);
        let right = eye_aspect_ratio(self.right_eye);
        (left, right, (left + right) / 2.0)
    }

    pub fn mouth_ratio(&self) -> f32 {
        mouth_aspect_ratio(self.mouth)
    }
}

/// Convex hull of a point set (Andrew's monotone chain), counter-clockwise
/// in a y-up frame, without repeating the first point.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted: Vec<Point> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower = Vec::with_capacity(sorted.len());
    for p in &sorted {
        push_convex(&mut lower, *p);
    }
    let mut upper = Vec::with_capacity(sorted.len());
    for p in sorted.iter().rev() {
        push_convex(&mut upper, *p);
    }

    // Each chain ends where the other begins
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

fn push_convex(chain: &mut Vec<Point>, p: Point) {
    while let [.., a, b] = chain.as_slice() {
        if a.cross(b, &p) > 0.0 {
            break;
        }
        chain.pop();
    }
    chain.push(p);
}
