pub mod geojson;
pub mod stats;

pub use geojson::*;
pub use stats::*;
