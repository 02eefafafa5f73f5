use crate::charts::ChartError;
use image::{ImageBuffer, Rgb, RgbImage};
use std::io::Cursor;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const GRID: Rgb<u8> = Rgb([220, 220, 220]);
pub const MARKER_GREY: Rgb<u8> = Rgb([150, 150, 170]);

const MAX_MARGIN: u32 = 40;
const MARKER_RADIUS: i64 = 2;

/// Linear mapping from a data interval onto the plot area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub min: f64,
    pub max: f64,
}

impl Scale {
    pub const UNIT: Scale = Scale { min: 0.0, max: 1.0 };

    /// Bounds of the finite values, widened when they collapse to one point.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut bounds: Option<(f64, f64)> = None;
        for value in values.into_iter().filter(|v| v.is_finite()) {
            bounds = Some(match bounds {
                Some((min, max)) => (min.min(value), max.max(value)),
                None => (value, value),
            });
        }
        let (min, max) = bounds?;
        if min == max {
            return Some(Self {
                min: min - 0.5,
                max: max + 0.5,
            });
        }
        Some(Self { min, max })
    }

    /// Same scale stretched to include `value`.
    pub fn including(self, value: f64) -> Self {
        Self {
            min: self.min.min(value),
            max: self.max.max(value),
        }
    }

    /// Adds `fraction` of the span as headroom above `max`.
    pub fn with_headroom(self, fraction: f64) -> Self {
        Self {
            min: self.min,
            max: self.max + (self.max - self.min) * fraction,
        }
    }

    /// Position of `value` across the scale, bounded so pixel math cannot overflow.
    fn fraction(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 || !value.is_finite() {
            return 0.0;
        }
        ((value - self.min) / span).clamp(-1.0, 2.0)
    }
}

/// White raster with a framed plot area and simple drawing primitives.
pub struct Canvas {
    image: RgbImage,
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let margin_x = MAX_MARGIN.min(width / 4);
        let margin_y = MAX_MARGIN.min(height / 4);
        let mut canvas = Self {
            image: ImageBuffer::from_pixel(width, height, WHITE),
            left: i64::from(margin_x),
            top: i64::from(margin_y / 2),
            right: i64::from(width - margin_x) - 1,
            bottom: i64::from(height - margin_y) - 1,
        };
        canvas.draw_frame();
        canvas
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb<u8>> {
        (x < self.width() && y < self.height()).then(|| *self.image.get_pixel(x, y))
    }

    pub fn x_px(&self, scale: &Scale, value: f64) -> i64 {
        let span = (self.right - self.left) as f64;
        self.left + (scale.fraction(value) * span).round() as i64
    }

    pub fn y_px(&self, scale: &Scale, value: f64) -> i64 {
        let span = (self.bottom - self.top) as f64;
        self.bottom - (scale.fraction(value) * span).round() as i64
    }

    /// Pixel for a data point; `None` when either coordinate is not finite.
    fn project(&self, x: &Scale, y: &Scale, (px, py): (f64, f64)) -> Option<(i64, i64)> {
        (px.is_finite() && py.is_finite()).then(|| (self.x_px(x, px), self.y_px(y, py)))
    }

    fn draw_frame(&mut self) {
        let (left, top, right, bottom) = (self.left, self.top, self.right, self.bottom);
        for step in 1..4 {
            let y = top + (bottom - top) * step / 4;
            self.line((left, y), (right, y), GRID);
        }
        self.line((left, top), (left, bottom), BLACK);
        self.line((left, bottom), (right, bottom), BLACK);
        self.line((right, top), (right, bottom), BLACK);
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x < self.left || x > self.right || y < self.top || y > self.bottom {
            return;
        }
        // Plot bounds lie inside the image, so the casts cannot truncate.
        self.image.put_pixel(x as u32, y as u32, color);
    }

    /// Bresenham segment, clipped to the plot area.
    pub fn line(&mut self, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
        let (mut x0, mut y0) = from;
        let (x1, y1) = to;
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.put(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let doubled = 2 * err;
            if doubled >= dy {
                err += dy;
                x0 += sx;
            }
            if doubled <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], x: &Scale, y: &Scale, color: Rgb<u8>) {
        let pixels: Vec<(i64, i64)> = points
            .iter()
            .filter_map(|point| self.project(x, y, *point))
            .collect();
        for pair in pixels.windows(2) {
            self.line(pair[0], pair[1], color);
        }
    }

    /// Step plot holding each value until the next sample.
    pub fn step_line(&mut self, points: &[(f64, f64)], x: &Scale, y: &Scale, color: Rgb<u8>) {
        let pixels: Vec<(i64, i64)> = points
            .iter()
            .filter_map(|point| self.project(x, y, *point))
            .collect();
        for pair in pixels.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            self.line((x0, y0), (x1, y0), color);
            self.line((x1, y0), (x1, y1), color);
        }
    }

    pub fn markers(&mut self, points: &[(f64, f64)], x: &Scale, y: &Scale, color: Rgb<u8>) {
        for point in points {
            let Some((cx, cy)) = self.project(x, y, *point) else {
                continue;
            };
            for dy in -MARKER_RADIUS..=MARKER_RADIUS {
                for dx in -MARKER_RADIUS..=MARKER_RADIUS {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }

    pub fn vline(&mut self, x: &Scale, value: f64, color: Rgb<u8>) {
        let px = self.x_px(x, value);
        self.line((px, self.top), (px, self.bottom), color);
    }

    /// Filled bar in slot `index` of `slots` equal-width slots.
    pub fn bar(&mut self, index: usize, slots: usize, value: f64, y: &Scale, color: Rgb<u8>) {
        if slots == 0 || index >= slots {
            return;
        }
        let slot_width = (self.right - self.left) as f64 / slots as f64;
        let x0 = self.left + (slot_width * (index as f64 + 0.2)).round() as i64;
        let x1 = self.left + (slot_width * (index as f64 + 0.8)).round() as i64;
        let top = self.y_px(y, value);
        let base = self.y_px(y, y.min.max(0.0));
        for px in x0..=x1 {
            self.line((px, top.min(base)), (px, top.max(base)), color);
        }
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, ChartError> {
        let mut buf = Cursor::new(Vec::new());
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        self.image.write_with_encoder(encoder)?;
        Ok(buf.into_inner())
    }
}
