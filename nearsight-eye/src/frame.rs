//! Frame data: depth maps, color frames and synchronized pairs

use crate::error::VisionError;

/// Depth value reserved for "no reading"
pub const NO_READING: u16 = 0;

/// Row-major grid of millimeter depth samples, co-registered with the color frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthMap {
    width: u32,
    height: u32,
    data: Vec<u16>,
}

impl DepthMap {
    /// Create a depth map, checking that `data` covers exactly `width × height` pixels
    pub fn new(width: u32, height: u32, data: Vec<u16>) -> Result<Self, VisionError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| VisionError::Processing("Depth map dimensions overflow".to_string()))?;

        if data.len() != expected {
            return Err(VisionError::Processing(format!(
                "Depth map buffer has {} samples, expected {} ({}x{})",
                data.len(),
                expected,
                width,
                height
            )));
        }

        Ok(Self { width, height, data })
    }

    /// Depth map filled with a single value
    pub fn filled(width: u32, height: u32, value: u16) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> &[u16] {
        &self.data
    }

    /// Sample at pixel `(x, y)`, `None` when out of bounds
    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Overwrite the sample at `(x, y)`; out-of-bounds writes are ignored
    pub fn set(&mut self, x: u32, y: u32, value: u16) {
        if x < self.width && y < self.height {
            let idx = y as usize * self.width as usize + x as usize;
            self.data[idx] = value;
        }
    }

    /// Fraction of pixels carrying the no-reading sentinel
    pub fn zero_fraction(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let zeros = self.data.iter().filter(|&&d| d == NO_READING).count();
        zeros as f64 / self.data.len() as f64
    }
}

/// Packed BGR color frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorFrame {
    /// Position of the frame in its stream
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// BGR bytes, 3 per pixel, row-major
    pub data: Vec<u8>,
}

impl ColorFrame {
    pub fn new(sequence: u64, width: u32, height: u32, data: Vec<u8>) -> Result<Self, VisionError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|p| p.checked_mul(3))
            .ok_or_else(|| VisionError::Processing("Color frame dimensions overflow".to_string()))?;

        if data.len() != expected {
            return Err(VisionError::Processing(format!(
                "Color frame buffer has {} bytes, expected {}",
                data.len(),
                expected
            )));
        }

        Ok(Self { sequence, width, height, data })
    }

    /// Black frame of the given size
    pub fn blank(sequence: u64, width: u32, height: u32) -> Self {
        Self {
            sequence,
            width,
            height,
            data: vec![0; width as usize * height as usize * 3],
        }
    }
}

/// One synchronized depth map and color frame
#[derive(Debug, Clone)]
pub struct FramePair {
    pub sequence: u64,
    pub depth: DepthMap,
    pub color: ColorFrame,
}

impl FramePair {
    /// Pair a depth map with a color frame of the same resolution
    pub fn new(depth: DepthMap, color: ColorFrame) -> Result<Self, VisionError> {
        if depth.width() != color.width || depth.height() != color.height {
            return Err(VisionError::Processing(format!(
                "Depth {}x{} and color {}x{} are not co-registered",
                depth.width(),
                depth.height(),
                color.width,
                color.height
            )));
        }

        Ok(Self {
            sequence: color.sequence,
            depth,
            color,
        })
    }
}
