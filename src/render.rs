//! Overlay instructions and raster painting.
//!
//! The frame processor only describes what to draw. Closed contours are
//! rasterised here onto the RGBA frame; text needs a font, so it is left to
//! the display (the GUI paints it, the headless binary logs it).

use image::{Rgba, RgbaImage};
use serde::Serialize;

use crate::types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const GREEN: Self = Self::new(0, 255, 0);
    pub const RED: Self = Self::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

/// One drawing instruction against the current frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Overlay {
    /// Closed polygon outline.
    Contour { points: Vec<Point>, color: Color },
    /// Text whose baseline starts at `origin`.
    Text {
        text: String,
        origin: Point,
        scale: f32,
        color: Color,
    },
}

/// Draw every contour in `overlays` onto `canvas`, in order.
pub fn paint_contours(canvas: &mut RgbaImage, overlays: &[Overlay]) {
    for overlay in overlays {
        if let Overlay::Contour { points, color } = overlay {
            draw_polygon(canvas, points, *color);
        }
    }
}

fn draw_polygon(img: &mut RgbaImage, points: &[Point], color: Color) {
    match points {
        [] => {}
        [p] => put(img, p.x.round() as i32, p.y.round() as i32, color.rgba()),
        _ => {
            for (a, b) in points.iter().zip(points.iter().cycle().skip(1)) {
                draw_line(img, *a, *b, color.rgba());
            }
        }
    }
}

fn put(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham line, clipped to the image.
fn draw_line(img: &mut RgbaImage, from: Point, to: Point, color: Rgba<u8>) {
    let (mut x, mut y) = (from.x.round() as i32, from.y.round() as i32);
    let (x1, y1) = (to.x.round() as i32, to.y.round() as i32);

    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put(img, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn lit(img: &RgbaImage) -> usize {
        img.pixels().filter(|p| **p != BLACK).count()
    }

    #[test]
    fn horizontal_line_covers_every_pixel() {
        let mut img = RgbaImage::from_pixel(10, 10, BLACK);
        draw_line(&mut img, Point::new(1.0, 5.0), Point::new(8.0, 5.0), Color::RED.rgba());
        assert_eq!(lit(&img), 8);
        assert_eq!(*img.get_pixel(8, 5), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn lines_are_clipped() {
        let mut img = RgbaImage::from_pixel(4, 4, BLACK);
        draw_line(&mut img, Point::new(-5.0, -5.0), Point::new(10.0, 10.0), Color::RED.rgba());
        // Only the diagonal inside the image is drawn
        assert_eq!(lit(&img), 4);
    }

    #[test]
    fn contour_is_closed() {
        let mut img = RgbaImage::from_pixel(10, 10, BLACK);
        let square = vec![
            Point::new(2.0, 2.0),
            Point::new(6.0, 2.0),
            Point::new(6.0, 6.0),
            Point::new(2.0, 6.0),
        ];
        paint_contours(
            &mut img,
            &[Overlay::Contour {
                points: square,
                color: Color::GREEN,
            }],
        );
        // Perimeter of a 5x5 pixel square
        assert_eq!(lit(&img), 16);
        assert_eq!(*img.get_pixel(2, 4), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn text_is_not_rasterised() {
        let mut img = RgbaImage::from_pixel(10, 10, BLACK);
        paint_contours(
            &mut img,
            &[Overlay::Text {
                text: "eyeAR: 0.30".into(),
                origin: Point::new(1.0, 5.0),
                scale: 0.7,
                color: Color::RED,
            }],
        );
        assert_eq!(lit(&img), 0);
    }

    #[test]
    fn overlay_serializes_with_kind_tag() {
        let json = serde_json::to_value(Overlay::Contour {
            points: vec![],
            color: Color::GREEN,
        })
        .unwrap();
        assert_eq!(json["kind"], "contour");
        assert_eq!(json["color"]["g"], 255);
    }
}
