use foundation::math::Mat4;

/// Camera driven entirely by an externally supplied projection.
///
/// The map host's matrix already contains the view transform, so `view`
/// stays identity unless a caller wants to offset the scene.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Camera {
    pub projection: Mat4,
    pub view: Mat4,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view
    }
}
