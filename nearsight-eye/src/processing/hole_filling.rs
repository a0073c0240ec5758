//! Depth hole filling

use crate::config::HoleFillingMode;
use crate::frame::{DepthMap, NO_READING};

/// Fill no-reading pixels according to `mode`.
///
/// Neighbor lookups read the unfilled map, so a filled pixel never feeds
/// another one, except for `FillFromLeft` which carries values along the row.
pub fn fill_holes(depth: &DepthMap, mode: HoleFillingMode) -> DepthMap {
    match mode {
        HoleFillingMode::Disabled => depth.clone(),
        HoleFillingMode::FillFromLeft => fill_from_left(depth),
        HoleFillingMode::FarthestFromAround => fill_from_around(depth, |a, b| a.max(b)),
        HoleFillingMode::NearestFromAround => fill_from_around(depth, |a, b| a.min(b)),
    }
}

fn fill_from_left(depth: &DepthMap) -> DepthMap {
    let mut out = depth.clone();
    for y in 0..depth.height() {
        let mut last = NO_READING;
        for x in 0..depth.width() {
            match depth.get(x, y) {
                Some(NO_READING) | None => {
                    if last != NO_READING {
                        out.set(x, y, last);
                    }
                }
                Some(d) => last = d,
            }
        }
    }
    out
}

fn fill_from_around(depth: &DepthMap, pick: impl Fn(u16, u16) -> u16) -> DepthMap {
    let mut out = depth.clone();
    for y in 0..depth.height() {
        for x in 0..depth.width() {
            if depth.get(x, y) != Some(NO_READING) {
                continue;
            }

            let neighbors = [
                x.checked_sub(1).and_then(|nx| depth.get(nx, y)),
                depth.get(x + 1, y),
                y.checked_sub(1).and_then(|ny| depth.get(x, ny)),
                depth.get(x, y + 1),
            ];

            let chosen = neighbors
                .iter()
                .flatten()
                .copied()
                .filter(|&d| d != NO_READING)
                .reduce(&pick);

            if let Some(value) = chosen {
                out.set(x, y, value);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[u16]) -> DepthMap {
        DepthMap::new(values.len() as u32, 1, values.to_vec()).unwrap()
    }

    #[test]
    fn test_disabled_is_identity() {
        let map = row(&[0, 5, 0]);
        assert_eq!(fill_holes(&map, HoleFillingMode::Disabled), map);
    }

    #[test]
    fn test_fill_from_left_carries_along_row() {
        let map = row(&[0, 500, 0, 0, 700, 0]);
        let filled = fill_holes(&map, HoleFillingMode::FillFromLeft);
        assert_eq!(filled.samples(), &[0, 500, 500, 500, 700, 700]);
    }

    #[test]
    fn test_farthest_and_nearest_from_around() {
        let map = row(&[400, 0, 900]);
        assert_eq!(
            fill_holes(&map, HoleFillingMode::FarthestFromAround).samples(),
            &[400, 900, 900]
        );
        assert_eq!(
            fill_holes(&map, HoleFillingMode::NearestFromAround).samples(),
            &[400, 400, 900]
        );
    }

    #[test]
    fn test_around_uses_vertical_neighbors() {
        let map = DepthMap::new(1, 3, vec![300, 0, 600]).unwrap();
        assert_eq!(
            fill_holes(&map, HoleFillingMode::NearestFromAround).samples(),
            &[300, 300, 600]
        );
    }

    #[test]
    fn test_isolated_hole_region_stays_empty() {
        let map = row(&[0, 0, 0]);
        assert_eq!(
            fill_holes(&map, HoleFillingMode::FarthestFromAround).samples(),
            &[0, 0, 0]
        );
    }
}
