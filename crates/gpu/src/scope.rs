use crate::backend::{GlState, RenderBackend};

/// Brackets drawing by code that does not own the context.
///
/// Entering snapshots the host's pipeline state and resets it to the default;
/// dropping the scope restores the snapshot, so the host sees exactly the
/// state it had before.
pub struct ExternalRenderScope<'a> {
    backend: &'a mut dyn RenderBackend,
    saved: GlState,
}

impl<'a> ExternalRenderScope<'a> {
    pub fn enter(backend: &'a mut dyn RenderBackend) -> Self {
        let saved = backend.state();
        backend.reset_state();
        Self { backend, saved }
    }

    pub fn backend(&mut self) -> &mut dyn RenderBackend {
        &mut *self.backend
    }

    pub fn saved_state(&self) -> GlState {
        self.saved
    }
}

impl Drop for ExternalRenderScope<'_> {
    fn drop(&mut self) {
        self.backend.set_state(self.saved);
    }
}
