use scene::components::{Drawable3D, Shape3D, Transform};
use scene::entity::EntityId;
use scene::world::World;

use crate::backend::{DrawCall, GlState, MeshHandle, RenderBackend, Shading};
use crate::camera::Camera;
use crate::mesh::MeshData;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderCommand {
    pub entity: EntityId,
    pub transform: Transform,
    pub drawable: Drawable3D,
}

#[derive(Debug, Default)]
pub struct RenderFrame {
    pub commands: Vec<RenderCommand>,
}

impl RenderFrame {
    /// Opaque drawables first, then transparent ones; spawn order within each.
    pub fn collect(world: &World) -> Self {
        let (mut commands, transparent): (Vec<_>, Vec<_>) = world
            .drawables_3d()
            .into_iter()
            .map(|(entity, transform, drawable)| RenderCommand {
                entity,
                transform,
                drawable,
            })
            .partition(|c| !c.drawable.material.transparent);
        commands.extend(transparent);
        Self { commands }
    }
}

/// Draws a [`World`] into a shared backend.
///
/// Never clears: whatever the host already drew stays underneath. Meshes are
/// uploaded once per distinct shape and kept until [`SceneRenderer::release`].
#[derive(Debug, Default)]
pub struct SceneRenderer {
    meshes: Vec<(Shape3D, MeshHandle)>,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues one draw per visible drawable and returns how many were drawn.
    pub fn render(&mut self, world: &World, camera: &Camera, gl: &mut dyn RenderBackend) -> usize {
        let frame = RenderFrame::collect(world);
        let view_proj = camera.view_proj();

        for command in &frame.commands {
            let mesh = self.mesh_for(command.drawable.shape, gl);
            let material = command.drawable.material;
            gl.set_state(if material.transparent {
                GlState::TRANSLUCENT_3D
            } else {
                GlState::OPAQUE_3D
            });
            gl.draw(&DrawCall {
                mesh,
                view_proj,
                model: command.transform.matrix(),
                color: material.effective_color(),
                shading: Shading::Unlit,
            });
        }

        frame.commands.len()
    }

    pub fn uploaded_meshes(&self) -> usize {
        self.meshes.len()
    }

    /// Frees every uploaded mesh. The renderer can be reused afterwards.
    pub fn release(&mut self, gl: &mut dyn RenderBackend) {
        for (_, handle) in self.meshes.drain(..) {
            gl.release_mesh(handle);
        }
    }

    fn mesh_for(&mut self, shape: Shape3D, gl: &mut dyn RenderBackend) -> MeshHandle {
        if let Some((_, handle)) = self.meshes.iter().find(|(s, _)| *s == shape) {
            return *handle;
        }
        let data = match shape {
            Shape3D::Sphere {
                radius,
                width_segments,
                height_segments,
            } => MeshData::sphere(radius as f32, width_segments, height_segments),
        };
        let handle = gl.upload_mesh(&data);
        tracing::debug!(?shape, vertices = data.vertex_count(), "uploaded mesh");
        self.meshes.push((shape, handle));
        handle
    }
}
