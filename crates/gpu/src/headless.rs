use std::collections::BTreeMap;

use foundation::Rgba;

use crate::backend::{CanvasSize, DrawCall, GlState, MeshHandle, RenderBackend};
use crate::mesh::MeshData;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub frame: u64,
    pub call: DrawCall,
    pub state: GlState,
}

/// Backend that keeps everything in memory. Used by tests and by hosts
/// without a GPU surface.
#[derive(Debug)]
pub struct HeadlessBackend {
    canvas: CanvasSize,
    state: GlState,
    next_mesh: u32,
    meshes: BTreeMap<MeshHandle, usize>,
    frames: u64,
    clears: Vec<Rgba>,
    draws: Vec<RecordedDraw>,
    uploads: u64,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: CanvasSize::new(width, height),
            state: GlState::default(),
            next_mesh: 0,
            meshes: BTreeMap::new(),
            frames: 0,
            clears: Vec::new(),
            draws: Vec::new(),
            uploads: 0,
        }
    }

    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    /// Draws issued after the given `begin_frame` (1-based).
    pub fn draws_in_frame(&self, frame: u64) -> Vec<&RecordedDraw> {
        self.draws.iter().filter(|d| d.frame == frame).collect()
    }

    pub fn clears(&self) -> &[Rgba] {
        &self.clears
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn mesh_vertex_count(&self, mesh: MeshHandle) -> Option<usize> {
        self.meshes.get(&mesh).copied()
    }
}

impl RenderBackend for HeadlessBackend {
    fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    fn resize(&mut self, size: CanvasSize) {
        self.canvas = size;
    }

    fn begin_frame(&mut self, clear: Rgba) {
        self.frames += 1;
        self.clears.push(clear);
    }

    fn end_frame(&mut self) {}

    fn state(&self) -> GlState {
        self.state
    }

    fn set_state(&mut self, state: GlState) {
        self.state = state;
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle {
        let handle = MeshHandle(self.next_mesh);
        self.next_mesh += 1;
        self.uploads += 1;
        self.meshes.insert(handle, mesh.vertex_count());
        handle
    }

    fn release_mesh(&mut self, mesh: MeshHandle) {
        if self.meshes.remove(&mesh).is_none() {
            tracing::warn!(?mesh, "release of unknown mesh");
        }
    }

    fn draw(&mut self, call: &DrawCall) {
        if !self.meshes.contains_key(&call.mesh) {
            tracing::warn!(mesh = ?call.mesh, "draw with released mesh");
            return;
        }
        self.draws.push(RecordedDraw {
            frame: self.frames,
            call: *call,
            state: self.state,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::HeadlessBackend;
    use crate::backend::{DrawCall, MeshHandle, RenderBackend, Shading};
    use crate::mesh::MeshData;
    use foundation::Rgba;
    use foundation::math::Mat4;

    fn call(mesh: MeshHandle) -> DrawCall {
        DrawCall {
            mesh,
            view_proj: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
            color: Rgba::WHITE,
            shading: Shading::Unlit,
        }
    }

    #[test]
    fn records_draws_per_frame() {
        let mut gl = HeadlessBackend::new(4, 4);
        let mesh = gl.upload_mesh(&MeshData::sphere(1.0, 4, 4));

        gl.begin_frame(Rgba::BLACK);
        gl.draw(&call(mesh));
        gl.end_frame();
        gl.begin_frame(Rgba::WHITE);
        gl.draw(&call(mesh));
        gl.draw(&call(mesh));
        gl.end_frame();

        assert_eq!(gl.frames(), 2);
        assert_eq!(gl.draws_in_frame(1).len(), 1);
        assert_eq!(gl.draws_in_frame(2).len(), 2);
        assert_eq!(gl.clears(), &[Rgba::BLACK, Rgba::WHITE]);
    }

    #[test]
    fn released_meshes_are_not_drawn() {
        let mut gl = HeadlessBackend::new(4, 4);
        let mesh = gl.upload_mesh(&MeshData::sphere(1.0, 4, 4));
        assert_eq!(gl.mesh_vertex_count(mesh), Some(25));
        gl.release_mesh(mesh);

        gl.begin_frame(Rgba::BLACK);
        gl.draw(&call(mesh));
        assert!(gl.draws().is_empty());
        assert_eq!(gl.live_meshes(), 0);
        assert_eq!(gl.uploads(), 1);
    }
}
