//! Neighborhood depth sampling

use crate::frame::{DepthMap, NO_READING};

/// Mean of the valid samples in the `(2·radius+1)²` square around `(x, y)`.
///
/// The center is rounded to the nearest pixel and the square is clipped to the
/// map. Returns `None` when no in-bounds sample carries a reading. The mean is
/// in whole millimeters, rounded half-up.
pub fn sample(depth: &DepthMap, x: f32, y: f32, radius: u32) -> Option<u32> {
    if !x.is_finite() || !y.is_finite() || depth.width() == 0 || depth.height() == 0 {
        return None;
    }

    let cx = x.round() as i64;
    let cy = y.round() as i64;
    let r = radius as i64;

    // Casts saturate for huge coordinates, so the window edges must too
    let x_lo = cx.saturating_sub(r).max(0);
    let x_hi = cx.saturating_add(r).min(depth.width() as i64 - 1);
    let y_lo = cy.saturating_sub(r).max(0);
    let y_hi = cy.saturating_add(r).min(depth.height() as i64 - 1);

    if x_lo > x_hi || y_lo > y_hi {
        return None;
    }

    let mut sum: u64 = 0;
    let mut count: u64 = 0;
    for py in y_lo..=y_hi {
        for px in x_lo..=x_hi {
            match depth.get(px as u32, py as u32) {
                Some(d) if d != NO_READING => {
                    sum += d as u64;
                    count += 1;
                }
                _ => {}
            }
        }
    }

    if count == 0 {
        return None;
    }

    Some(((sum + count / 2) / count) as u32)
}

/// Depth sampler with a fixed neighborhood radius
#[derive(Debug, Clone, Copy)]
pub struct DepthSampler {
    radius: u32,
}

impl DepthSampler {
    pub fn new(radius: u32) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Sample around `(x, y)` with this sampler's radius
    pub fn sample(&self, depth: &DepthMap, x: f32, y: f32) -> Option<u32> {
        sample(depth, x, y, self.radius)
    }
}
