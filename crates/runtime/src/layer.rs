use std::collections::BTreeMap;
use std::rc::Rc;

use formats::FeatureCollection;
use foundation::math::Mat4;
use gpu::RenderBackend;

use crate::marker::MarkerSet;
use crate::transform::Transform;

pub type Sources = BTreeMap<String, Rc<FeatureCollection>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LayerKind {
    /// Drawn by the map with the map's own pipeline state.
    Native,
    /// Third-party drawing; wrapped in an external render scope.
    Custom,
}

/// How many features a layer turned into something drawable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct LayerReport {
    pub rendered: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerError {
    UnknownSource(String),
    InvalidPaint(String),
}

impl std::fmt::Display for LayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerError::UnknownSource(id) => write!(f, "source {id:?} does not exist"),
            LayerError::InvalidPaint(reason) => write!(f, "invalid paint property: {reason}"),
        }
    }
}

impl std::error::Error for LayerError {}

/// Everything a layer may touch while it is being added or removed.
pub struct LayerContext<'a> {
    pub transform: &'a Transform,
    pub sources: &'a Sources,
    pub markers: &'a mut MarkerSet,
    pub gl: &'a mut dyn RenderBackend,
}

impl LayerContext<'_> {
    pub fn source(&self, id: &str) -> Result<Rc<FeatureCollection>, LayerError> {
        self.sources
            .get(id)
            .cloned()
            .ok_or_else(|| LayerError::UnknownSource(id.to_string()))
    }
}

pub trait MapLayer {
    fn id(&self) -> &str;

    fn kind(&self) -> LayerKind;

    /// Runs once when the layer joins the map. Must not leave GPU resources
    /// or markers behind when it fails.
    fn on_add(&mut self, ctx: &mut LayerContext<'_>) -> Result<LayerReport, LayerError>;

    /// Draws one frame. `matrix` maps mercator coordinates to clip space and
    /// is only valid for this call.
    fn render(&mut self, gl: &mut dyn RenderBackend, matrix: &Mat4);

    /// Releases everything `on_add` created.
    fn on_remove(&mut self, ctx: &mut LayerContext<'_>);
}
