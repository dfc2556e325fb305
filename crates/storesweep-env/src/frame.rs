use serde::{Deserialize, Serialize};

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("frame of {width}x{height} expects {expected} pixels, got {actual}")]
pub struct FrameSizeError {
    width: u16,
    height: u16,
    expected: usize,
    actual: usize,
}

/// Grayscale raster image, row-major, one byte per pixel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame")]
pub struct Frame {
    width: u16,
    height: u16,
    pixels: Vec<u8>,
}

#[derive(Deserialize)]
struct RawFrame {
    width: u16,
    height: u16,
    pixels: Vec<u8>,
}

impl TryFrom<RawFrame> for Frame {
    type Error = FrameSizeError;

    fn try_from(raw: RawFrame) -> Result<Self, Self::Error> {
        Self::from_pixels(raw.width, raw.height, raw.pixels)
    }
}

impl Frame {
    #[must_use]
    pub fn blank(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; usize::from(width) * usize::from(height)],
        }
    }

    pub fn from_pixels(width: u16, height: u16, pixels: Vec<u8>) -> Result<Self, FrameSizeError> {
        let expected = usize::from(width) * usize::from(height);
        if pixels.len() != expected {
            return Err(FrameSizeError {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<u8> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Sets a pixel; out-of-bounds coordinates are ignored.
    pub fn set(&mut self, x: u16, y: u16, value: u8) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = value;
        }
    }

    fn index(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| usize::from(y) * usize::from(self.width) + usize::from(x))
    }
}
