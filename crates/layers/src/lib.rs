pub mod choropleth;
pub mod expression;
pub mod extrusion;
pub mod overlay;

pub use choropleth::*;
pub use expression::*;
pub use overlay::*;
