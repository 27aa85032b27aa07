mod geometry;
mod projection;
mod renderer;
mod spatial;

pub use projection::{Viewport, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
pub use renderer::{place_markers, LineString, MapLayers, MapRenderer, OutlineKind, PlacedMarker};
pub use spatial::MarkerGrid;
