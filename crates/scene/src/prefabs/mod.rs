mod glow_sphere;

pub use glow_sphere::*;
