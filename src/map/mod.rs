pub mod animation;
pub mod geometry;
pub mod markers;
pub mod projection;
pub mod renderer;
pub mod spatial;

pub use animation::HoverState;
pub use markers::{Emphasis, Marker, MarkerColor};
pub use projection::{Viewport, ZoomTransform};
pub use renderer::{MapLayers, MapRenderer, MarkerLayer};
