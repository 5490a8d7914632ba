use crate::types::{BoundingBox, Point, Shape};

/// Read access to an 8-bit grayscale image.
pub trait ImageAccess {
    /// Intensity at (x, y); 0 outside the image.
    fn get_pixel(&self, x: i32, y: i32) -> u8;

    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Row-major grayscale buffer.
#[derive(Debug, Clone)]
pub struct GrayImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), (width * height) as usize);
        Self {
            data,
            width,
            height,
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: Fn(u32, u32) -> u8,
    {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self::new(data, width, height)
    }

    /// Raw bytes, as the face detector wants them.
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }
}

impl From<image::GrayImage> for GrayImage {
    fn from(img: image::GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height)
    }
}

impl ImageAccess for GrayImage {
    fn get_pixel(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[(y as u32 * self.width + x as u32) as usize]
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Rotation and uniform scale (no translation) between two point sets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTransform {
    a: f32,
    b: f32,
}

impl SimilarityTransform {
    pub const IDENTITY: Self = Self { a: 1.0, b: 0.0 };

    /// Least-squares similarity mapping `from` onto `to` after centering both.
    ///
    /// Falls back to identity when `from` has no spread.
    pub fn between(from: &Shape, to: &Shape) -> Self {
        let n = from.num_landmarks().min(to.num_landmarks());
        if n == 0 {
            return Self::IDENTITY;
        }

        let centroid = |s: &Shape| {
            let sum = s.points[..n]
                .iter()
                .fold(Point::default(), |acc, p| acc + *p);
            sum * (1.0 / n as f32)
        };
        let cf = centroid(from);
        let ct = centroid(to);

        let (mut dot, mut cross, mut norm) = (0.0f32, 0.0f32, 0.0f32);
        for (p, q) in from.points[..n].iter().zip(&to.points[..n]) {
            let p = *p - cf;
            let q = *q - ct;
            dot += p.x * q.x + p.y * q.y;
            cross += p.x * q.y - p.y * q.x;
            norm += p.x * p.x + p.y * p.y;
        }

        if norm <= f32::EPSILON {
            return Self::IDENTITY;
        }
        Self {
            a: dot / norm,
            b: cross / norm,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(self.a * p.x - self.b * p.y, self.b * p.x + self.a * p.y)
    }

    pub fn scale(&self) -> f32 {
        self.a.hypot(self.b)
    }
}

/// Intensity at a normalized location inside `bbox`, nearest pixel.
pub fn sample_normalized<I: ImageAccess>(image: &I, bbox: &BoundingBox, p: Point) -> f32 {
    let img = bbox.denormalize_point(p);
    image.get_pixel(img.x.round() as i32, img.y.round() as i32) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_image_access() {
        let data = vec![
            0, 255, 0, //
            255, 0, 255, //
            0, 255, 0, //
        ];
        let img = GrayImage::new(data, 3, 3);

        assert_eq!(img.get_pixel(0, 0), 0);
        assert_eq!(img.get_pixel(1, 0), 255);
        assert_eq!(img.get_pixel(1, 1), 0);
        assert_eq!(img.get_pixel(-1, 0), 0);
        assert_eq!(img.get_pixel(3, 0), 0);
    }

    #[test]
    fn from_fn_is_row_major() {
        let img = GrayImage::from_fn(4, 2, |x, y| (y * 10 + x) as u8);
        assert_eq!(img.as_raw(), &[0, 1, 2, 3, 10, 11, 12, 13]);
        assert_eq!(img.get_pixel(3, 1), 13);
    }

    #[test]
    fn converts_from_image_crate() {
        let luma = image::GrayImage::from_fn(5, 3, |x, _| image::Luma([x as u8 * 40]));
        let img = GrayImage::from(luma);
        assert_eq!((img.width(), img.height()), (5, 3));
        assert_eq!(img.get_pixel(4, 2), 160);
    }

    #[test]
    fn similarity_of_identical_shapes_is_identity() {
        let s = Shape::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 2.0),
        ]);
        let t = SimilarityTransform::between(&s, &s);
        assert!((t.a - 1.0).abs() < 1e-6);
        assert!(t.b.abs() < 1e-6);
    }

    #[test]
    fn similarity_recovers_rotation_and_scale() {
        let from = Shape::new(vec![
            Point::new(-1.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        ]);
        // Rotate 90 degrees and double, then shift
        let to = Shape::new(
            from.points
                .iter()
                .map(|p| Point::new(-2.0 * p.y + 5.0, 2.0 * p.x - 3.0))
                .collect(),
        );
        let t = SimilarityTransform::between(&from, &to);
        assert!((t.scale() - 2.0).abs() < 1e-5);

        let mapped = t.apply(Point::new(1.0, 0.0));
        assert!(mapped.x.abs() < 1e-5);
        assert!((mapped.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn degenerate_similarity_falls_back() {
        let point = Shape::new(vec![Point::new(1.0, 1.0); 3]);
        assert_eq!(
            SimilarityTransform::between(&point, &point),
            SimilarityTransform::IDENTITY
        );
    }

    #[test]
    fn normalized_sampling_rounds_to_nearest() {
        let img = GrayImage::from_fn(10, 10, |x, _| (x * 25) as u8);
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(sample_normalized(&img, &bbox, Point::new(0.2, 0.5)), 50.0);
        assert_eq!(sample_normalized(&img, &bbox, Point::new(0.26, 0.5)), 75.0);
        assert_eq!(sample_normalized(&img, &bbox, Point::new(2.0, 0.5)), 0.0);
    }
}
