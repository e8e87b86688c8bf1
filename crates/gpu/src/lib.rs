pub mod backend;
pub mod camera;
pub mod headless;
pub mod mesh;
pub mod renderer;
pub mod scope;

pub use backend::*;
pub use camera::*;
pub use headless::*;
pub use mesh::*;
pub use renderer::*;
pub use scope::*;
