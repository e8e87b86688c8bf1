use foundation::math::{Mat4, Vec3};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    pub fn translate(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn with_uniform_scale(self, scale: f64) -> Self {
        Self {
            scale: Vec3::splat(scale),
            ..self
        }
    }

    /// Model matrix: scale first, then translate.
    pub fn matrix(&self) -> Mat4 {
        Mat4::translation(self.position).scale(self.scale)
    }
}
