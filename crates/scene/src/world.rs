use crate::components::{Drawable3D, Transform};
use crate::entity::EntityId;

/// Scene graph storage: one slot per entity, one column per component.
#[derive(Debug, Default)]
pub struct World {
    transforms: Vec<Option<Transform>>,
    drawables_3d: Vec<Option<Drawable3D>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> EntityId {
        let id = EntityId(self.transforms.len() as u32);
        self.transforms.push(None);
        self.drawables_3d.push(None);
        id
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn set_transform(&mut self, entity: EntityId, transform: Transform) {
        if let Some(slot) = self.transforms.get_mut(entity.index() as usize) {
            *slot = Some(transform);
        }
    }

    pub fn set_drawable_3d(&mut self, entity: EntityId, drawable: Drawable3D) {
        if let Some(slot) = self.drawables_3d.get_mut(entity.index() as usize) {
            *slot = Some(drawable);
        }
    }

    /// Visible 3D drawables that have a transform, in spawn order.
    pub fn drawables_3d(&self) -> Vec<(EntityId, Transform, Drawable3D)> {
        let mut out = Vec::new();
        for (idx, drawable) in self.drawables_3d.iter().enumerate() {
            let Some(drawable) = drawable else { continue };
            if !drawable.visible {
                continue;
            }
            let Some(transform) = self.transforms[idx] else {
                continue;
            };
            out.push((EntityId(idx as u32), transform, *drawable));
        }
        out
    }
}
