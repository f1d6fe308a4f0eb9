use std::fmt;

use crate::FaceError;

/// A decoded RGB8 image, row-major, 3 bytes per pixel.
///
/// Decoding and encoding happen outside this crate; this type only carries
/// pixels between the preprocessor, the detector and the embedder.
#[derive(Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Image {
    /// Wraps raw RGB8 pixels. `pixels.len()` must equal `width * height * 3`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, FaceError> {
        let want = width as usize * height as usize * 3;
        if pixels.len() != want {
            return Err(FaceError::InvalidImage(format!(
                "{width}x{height} RGB8 needs {want} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// An image of a single solid color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: rgb.repeat(n),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Mean Rec.601 luma on a 0-255 scale. 0 for an empty image.
    pub fn mean_brightness(&self) -> f64 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .pixels
            .chunks_exact(3)
            .map(|p| 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64)
            .sum();
        sum / (self.pixels.len() / 3) as f64
    }

    /// Copies the region under `bbox`, clamped to the image bounds.
    /// Returns None if nothing of the box lies inside the image.
    pub fn crop(&self, bbox: &BoundingBox) -> Option<Image> {
        let clamp = |v: i32, max: u32| (v as i64).clamp(0, max as i64) as u32;
        let (x1, x2) = (clamp(bbox.x1, self.width), clamp(bbox.x2, self.width));
        let (y1, y2) = (clamp(bbox.y1, self.height), clamp(bbox.y2, self.height));
        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let (w, h) = (x2 - x1, y2 - y1);
        let stride = self.width as usize * 3;
        let mut pixels = Vec::with_capacity(w as usize * h as usize * 3);
        for y in y1..y2 {
            let start = y as usize * stride + x1 as usize * 3;
            pixels.extend_from_slice(&self.pixels[start..start + w as usize * 3]);
        }
        Some(Image {
            width: w,
            height: h,
            pixels,
        })
    }
}

/// A detected face region in pixel coordinates, `[x1, x2) x [y1, y2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, confidence: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
        }
    }

    pub fn width(&self) -> u32 {
        (self.x2 as i64 - self.x1 as i64).clamp(0, u32::MAX as i64) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 as i64 - self.y1 as i64).clamp(0, u32::MAX as i64) as u32
    }
}
