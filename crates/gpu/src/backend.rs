use foundation::Rgba;
use foundation::math::Mat4;

use crate::mesh::MeshData;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Replace,
    Alpha,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum DepthMode {
    #[default]
    Disabled,
    ReadOnly,
    ReadWrite,
}

/// Pipeline state shared between everything drawing into one context.
///
/// The default value is the "reset" state: no blending, no depth, no culling.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct GlState {
    pub blend: BlendMode,
    pub depth: DepthMode,
    pub cull_back_faces: bool,
}

impl GlState {
    pub const OPAQUE_3D: Self = Self {
        blend: BlendMode::Replace,
        depth: DepthMode::ReadWrite,
        cull_back_faces: false,
    };

    pub const TRANSLUCENT_3D: Self = Self {
        blend: BlendMode::Alpha,
        depth: DepthMode::ReadWrite,
        cull_back_faces: false,
    };
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Shading {
    /// Flat material color.
    Unlit,
    /// Material color darkened by a fixed directional light.
    Lambert,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawCall {
    pub mesh: MeshHandle,
    pub view_proj: Mat4,
    pub model: Mat4,
    pub color: Rgba,
    pub shading: Shading,
}

impl DrawCall {
    pub fn mvp(&self) -> Mat4 {
        self.view_proj * self.model
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A GPU context owned by the map host and shared with layers.
///
/// Everything drawn during a frame goes through one backend; draws execute
/// with whatever [`GlState`] is current when `draw` is called.
pub trait RenderBackend {
    fn canvas(&self) -> CanvasSize;

    fn resize(&mut self, size: CanvasSize);

    /// Starts a frame and clears color and depth.
    fn begin_frame(&mut self, clear: Rgba);

    /// Submits and presents the frame.
    fn end_frame(&mut self);

    fn state(&self) -> GlState;

    fn set_state(&mut self, state: GlState);

    fn reset_state(&mut self) {
        self.set_state(GlState::default());
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle;

    fn release_mesh(&mut self, mesh: MeshHandle);

    fn draw(&mut self, call: &DrawCall);
}
