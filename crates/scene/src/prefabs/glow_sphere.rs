use foundation::Rgba;
use foundation::math::Vec3;

use crate::World;
use crate::components::{Drawable3D, Material, Transform};
use crate::entity::EntityId;

/// Look of a core sphere wrapped in a translucent halo.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlowSphereLook {
    pub core_radius: f64,
    pub glow_radius: f64,
    pub segments: u32,
    pub color: Rgba,
    pub glow_opacity: f32,
}

impl Default for GlowSphereLook {
    fn default() -> Self {
        Self {
            core_radius: 105.0,
            glow_radius: 125.0,
            segments: 32,
            color: Rgba::from_rgb_u32(0xFF_FF_ED),
            glow_opacity: 0.5,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GlowSpherePair {
    pub core: EntityId,
    pub glow: EntityId,
}

/// Spawns the opaque core and its halo at the same position and scale.
pub fn spawn_glow_sphere(
    world: &mut World,
    look: &GlowSphereLook,
    position: Vec3,
    scale: f64,
) -> GlowSpherePair {
    let transform = Transform::translate(position).with_uniform_scale(scale);

    let core = world.spawn();
    world.set_transform(core, transform);
    world.set_drawable_3d(
        core,
        Drawable3D::sphere(look.core_radius, look.segments, Material::basic(look.color)),
    );

    let glow = world.spawn();
    world.set_transform(glow, transform);
    world.set_drawable_3d(
        glow,
        Drawable3D::sphere(
            look.glow_radius,
            look.segments,
            Material::translucent(look.color, look.glow_opacity),
        ),
    );

    GlowSpherePair { core, glow }
}

#[cfg(test)]
mod tests {
    use super::{GlowSphereLook, spawn_glow_sphere};
    use crate::World;
    use crate::components::Shape3D;
    use foundation::math::Vec3;

    #[test]
    fn spawns_core_and_glow_at_same_transform() {
        let mut world = World::new();
        let look = GlowSphereLook::default();
        let pair = spawn_glow_sphere(&mut world, &look, Vec3::new(0.3, 0.37, 1e-4), 2e-8);

        let drawables = world.drawables_3d();
        assert_eq!(drawables.len(), 2);
        assert_eq!(drawables[0].0, pair.core);
        assert_eq!(drawables[1].0, pair.glow);
        assert_eq!(drawables[0].1, drawables[1].1);

        let Shape3D::Sphere { radius: core_r, .. } = drawables[0].2.shape;
        let Shape3D::Sphere { radius: glow_r, .. } = drawables[1].2.shape;
        assert_eq!(core_r, 105.0);
        assert_eq!(glow_r, 125.0);
        assert!(!drawables[0].2.material.transparent);
        assert!(drawables[1].2.material.transparent);
    }
}
