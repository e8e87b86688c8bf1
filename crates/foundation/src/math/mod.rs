pub mod matrix;
pub mod mercator;
pub mod vec;

pub use matrix::*;
pub use mercator::*;
pub use vec::*;
