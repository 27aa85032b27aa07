use crate::query::CityAnchor;
use std::f64::consts::PI;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 18.0;
pub const ZOOM_STEP: f64 = 0.5;

/// Web Mercator y in [0, 1] for a latitude in degrees
#[inline(always)]
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-85.05, 85.05).to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

/// Inverse of [`mercator_y`]
#[inline(always)]
fn mercator_lat(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees()
}

/// Visible map area. `zoom` uses web-map zoom levels, so a city anchor at
/// zoom 12 and the country view at zoom 5 mean what they mean on a slippy map.
#[derive(Clone, Debug)]
pub struct Viewport {
    pub center_lon: f64,
    pub center_lat: f64,
    pub zoom: f64,
    /// Canvas width in braille dots
    pub width: usize,
    /// Canvas height in braille dots
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat: center_lat.clamp(-85.0, 85.0),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    /// Center on a city anchor at its configured zoom
    pub fn from_anchor(anchor: &CityAnchor, width: usize, height: usize) -> Self {
        Self::new(anchor.lon, anchor.lat, anchor.zoom, width, height)
    }

    /// Width of the whole world in dots at the current zoom
    #[inline(always)]
    fn world_width(&self) -> f64 {
        self.width.max(1) as f64 * 2f64.powf(self.zoom - 2.0)
    }

    fn center_xy(&self) -> (f64, f64) {
        ((self.center_lon + 180.0) / 360.0, mercator_y(self.center_lat))
    }

    /// Geographic (lon, lat) to canvas dots
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let (cx, cy) = self.center_xy();
        let scale = self.world_width();
        let x = ((lon + 180.0) / 360.0 - cx) * scale + self.width as f64 / 2.0;
        let y = (mercator_y(lat) - cy) * scale + self.height as f64 / 2.0;
        (x.round() as i32, y.round() as i32)
    }

    /// Canvas dots back to geographic (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let (cx, cy) = self.center_xy();
        let scale = self.world_width();
        let x = (px as f64 - self.width as f64 / 2.0) / scale + cx;
        let y = (py as f64 - self.height as f64 / 2.0) / scale + cy;
        (x * 360.0 - 180.0, mercator_lat(y))
    }

    /// Degrees of longitude covered by one dot
    pub fn degrees_per_dot(&self) -> f64 {
        360.0 / self.world_width()
    }

    /// Shift the center by a dot offset
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let (lon, lat) = self.unproject(self.width as i32 / 2 + dx, self.height as i32 / 2 + dy);
        self.center_lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
        self.center_lat = lat.clamp(-85.0, 85.0);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom - ZOOM_STEP).max(MIN_ZOOM);
    }

    /// Zoom while keeping the point under (px, py) fixed
    pub fn zoom_at(&mut self, px: i32, py: i32, delta: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
        let (nx, ny) = self.project(lon, lat);
        self.pan(nx - px, ny - py);
    }

    /// Is the dot inside the canvas, with a small margin for glyph overhang
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -4 && px < self.width as i32 + 4 && py >= -4 && py < self.height as i32 + 4
    }

    /// Cheap bounding-box test for a segment
    pub fn segment_might_be_visible(&self, a: (i32, i32), b: (i32, i32)) -> bool {
        a.0.max(b.0) >= 0
            && a.0.min(b.0) < self.width as i32
            && a.1.max(b.1) >= 0
            && a.1.min(b.1) < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_projects_to_middle() {
        let vp = Viewport::new(-65.0, -17.0, 5.0, 200, 100);
        assert_eq!(vp.project(-65.0, -17.0), (100, 50));
    }

    #[test]
    fn test_unproject_inverts_project() {
        let vp = Viewport::new(-65.0, -17.0, 5.0, 200, 100);
        let (lon, lat) = vp.unproject(100, 50);
        assert!((lon + 65.0).abs() < 1e-9);
        assert!((lat + 17.0).abs() < 1e-9);
    }

    #[test]
    fn test_higher_zoom_spreads_points() {
        let low = Viewport::new(-65.0, -17.0, 5.0, 200, 100);
        let high = Viewport::new(-65.0, -17.0, 12.0, 200, 100);
        let spread = |vp: &Viewport| (vp.project(-64.9, -17.0).0 - vp.project(-65.0, -17.0).0).abs();
        assert!(spread(&high) > spread(&low));
    }

    #[test]
    fn test_pan_moves_center_east() {
        let mut vp = Viewport::new(-65.0, -17.0, 5.0, 200, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > -65.0);
        assert!((vp.center_lat + 17.0).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut vp = Viewport::new(0.0, 0.0, MAX_ZOOM, 100, 100);
        vp.zoom_in();
        assert_eq!(vp.zoom, MAX_ZOOM);
        let mut vp = Viewport::new(0.0, 0.0, MIN_ZOOM, 100, 100);
        vp.zoom_out();
        assert_eq!(vp.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_zoom_at_keeps_point_fixed() {
        let mut vp = Viewport::new(-65.0, -17.0, 6.0, 200, 100);
        let before = vp.unproject(150, 30);
        vp.zoom_at(150, 30, ZOOM_STEP);
        let after = vp.project(before.0, before.1);
        assert!((after.0 - 150).abs() <= 1);
        assert!((after.1 - 30).abs() <= 1);
    }
}
