pub mod error;
pub mod event_bus;
pub mod frame;
pub mod layer;
pub mod map;
pub mod marker;
pub mod options;
pub mod transform;

pub use error::*;
pub use event_bus::*;
pub use frame::*;
pub use layer::*;
pub use map::*;
pub use marker::*;
pub use options::*;
pub use transform::*;
