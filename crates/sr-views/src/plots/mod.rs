//! Plot view-models: map pins, categorical chart and heat map

mod chart;
mod heatmap;
mod map;

pub use chart::ChartView;
pub use heatmap::HeatmapView;
pub use map::{pins_from_payload, MapPin, MapView};
