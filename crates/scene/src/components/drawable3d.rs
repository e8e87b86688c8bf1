use foundation::Rgba;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Shape3D {
    /// UV sphere centered on the entity origin.
    Sphere {
        radius: f64,
        width_segments: u32,
        height_segments: u32,
    },
}

/// Unlit material: flat color, optional alpha blending.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub color: Rgba,
    pub opacity: f32,
    pub transparent: bool,
}

impl Material {
    pub fn basic(color: Rgba) -> Self {
        Self {
            color,
            opacity: 1.0,
            transparent: false,
        }
    }

    pub fn translucent(color: Rgba, opacity: f32) -> Self {
        Self {
            color,
            opacity,
            transparent: true,
        }
    }

    /// Color as it reaches the blender; opacity only applies when transparent.
    pub fn effective_color(&self) -> Rgba {
        if self.transparent {
            self.color.with_alpha(self.color.a * self.opacity)
        } else {
            self.color.with_alpha(1.0)
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Drawable3D {
    pub shape: Shape3D,
    pub material: Material,
    pub visible: bool,
}

impl Drawable3D {
    pub fn sphere(radius: f64, segments: u32, material: Material) -> Self {
        Self {
            shape: Shape3D::Sphere {
                radius,
                width_segments: segments,
                height_segments: segments,
            },
            material,
            visible: true,
        }
    }
}
