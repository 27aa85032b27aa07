use std::collections::HashMap;

/// Hash grid over marker positions, used to pick the marker under a click.
/// Stores row indices of the current map view, bucketed by degree cells.
pub struct MarkerGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    points: Vec<(f64, f64)>,
    cell_size: f64,
}

impl MarkerGrid {
    /// Empty grid with the given cell size in degrees
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            points: Vec::new(),
            cell_size,
        }
    }

    /// Index (lon, lat) points; the n-th point gets marker index n.
    pub fn build(points: impl IntoIterator<Item = (f64, f64)>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (lon, lat) in points {
            grid.insert(lon, lat);
        }
        grid
    }

    #[inline(always)]
    fn cell_of(&self, lon: f64, lat: f64) -> (i32, i32) {
        ((lon / self.cell_size).floor() as i32, (lat / self.cell_size).floor() as i32)
    }

    pub fn insert(&mut self, lon: f64, lat: f64) -> usize {
        let idx = self.points.len();
        self.points.push((lon, lat));
        let cell = self.cell_of(lon, lat);
        self.cells.entry(cell).or_default().push(idx);
        idx
    }

    /// Closest marker within `radius` degrees of (lon, lat)
    pub fn nearest(&self, lon: f64, lat: f64, radius: f64) -> Option<usize> {
        let (cx, cy) = self.cell_of(lon, lat);
        let reach = (radius / self.cell_size).ceil() as i32;

        let mut best: Option<(usize, f64)> = None;
        for y in cy - reach..=cy + reach {
            for x in cx - reach..=cx + reach {
                let Some(indices) = self.cells.get(&(x, y)) else {
                    continue;
                };
                for &idx in indices {
                    let (plon, plat) = self.points[idx];
                    let d2 = (plon - lon).powi(2) + (plat - lat).powi(2);
                    if d2 > radius * radius {
                        continue;
                    }
                    // ties go to the earlier marker so the pick is stable
                    if best.map_or(true, |(b, bd)| d2 < bd || (d2 == bd && idx < b)) {
                        best = Some((idx, d2));
                    }
                }
            }
        }
        best.map(|(idx, _)| idx)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_picks_closest() {
        let grid = MarkerGrid::build([(-68.15, -16.5), (-68.10, -16.5), (-63.18, -17.78)], 0.5);
        assert_eq!(grid.nearest(-68.11, -16.5, 0.2), Some(1));
        assert_eq!(grid.nearest(-63.2, -17.8, 0.2), Some(2));
    }

    #[test]
    fn test_nearest_respects_radius() {
        let grid = MarkerGrid::build([(-68.15, -16.5)], 0.5);
        assert_eq!(grid.nearest(-66.0, -17.0, 0.1), None);
    }

    #[test]
    fn test_nearest_crosses_cell_boundaries() {
        let grid = MarkerGrid::build([(0.49, 0.49)], 0.5);
        assert_eq!(grid.nearest(0.51, 0.51, 0.05), Some(0));
    }

    #[test]
    fn test_identical_points_prefer_first() {
        let grid = MarkerGrid::build([(1.0, 1.0), (1.0, 1.0)], 1.0);
        assert_eq!(grid.nearest(1.0, 1.0, 0.1), Some(0));
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_empty_grid() {
        let grid = MarkerGrid::new(1.0);
        assert!(grid.is_empty());
        assert_eq!(grid.nearest(0.0, 0.0, 10.0), None);
    }
}
