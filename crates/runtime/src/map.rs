use std::rc::Rc;

use formats::FeatureCollection;
use foundation::math::{LngLat, Vec2};
use foundation::Rgba;
use gpu::{BlendMode, CanvasSize, DepthMode, ExternalRenderScope, GlState, RenderBackend};

use crate::error::MapError;
use crate::event_bus::{EventBus, MapEvent, MapEventKind};
use crate::frame::Frame;
use crate::layer::{LayerContext, LayerKind, LayerReport, MapLayer, Sources};
use crate::marker::{MarkerId, MarkerSet, PopupView};
use crate::options::MapOptions;
use crate::transform::Transform;

/// Clear color standing in for the basemap (`#f8f4f0`).
pub const BASEMAP_BACKGROUND: Rgba = Rgba::new(0.973, 0.957, 0.941, 1.0);

/// Pipeline state the basemap passes leave behind before layers draw.
pub const HOST_STATE: GlState = GlState {
    blend: BlendMode::Alpha,
    depth: DepthMode::ReadOnly,
    cull_back_faces: true,
};

type LoadCallback<B> = Box<dyn FnOnce(&mut Map<B>)>;

/// Interactive map host.
///
/// Owns the camera, the render backend, sources, layers and markers. Layers
/// draw in insertion order on every [`Map::repaint`].
pub struct Map<B: RenderBackend> {
    options: MapOptions,
    transform: Transform,
    backend: B,
    loaded: bool,
    load_callbacks: Vec<LoadCallback<B>>,
    sources: Sources,
    layers: Vec<Box<dyn MapLayer>>,
    markers: MarkerSet,
    events: EventBus,
    frame: Frame,
    dirty: bool,
}

impl<B: RenderBackend> Map<B> {
    pub fn new(options: MapOptions, backend: B) -> Result<Self, MapError> {
        options.validate()?;
        let transform = Transform::from_options(&options, backend.canvas());
        tracing::debug!(
            container = %options.container,
            style = %options.style,
            zoom = options.zoom,
            "map created"
        );
        Ok(Self {
            options,
            transform,
            backend,
            loaded: false,
            load_callbacks: Vec::new(),
            sources: Sources::new(),
            layers: Vec::new(),
            markers: MarkerSet::new(),
            events: EventBus::new(),
            frame: Frame::default(),
            dirty: true,
        })
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn style_url(&self) -> String {
        self.options.style_url()
    }

    /// Queues `callback` for the load event. Runs it right away when the map
    /// has already loaded.
    pub fn on_load(&mut self, callback: impl FnOnce(&mut Map<B>) + 'static) {
        if self.loaded {
            callback(self);
        } else {
            self.load_callbacks.push(Box::new(callback));
        }
    }

    /// Marks the style as ready and fires the load event. Only the first
    /// call does anything; it returns `true` exactly once.
    pub fn load(&mut self) -> bool {
        if self.loaded {
            return false;
        }
        self.loaded = true;
        tracing::info!(style = %self.options.style, "map loaded");
        self.events.emit(self.frame, MapEventKind::Load);
        for callback in std::mem::take(&mut self.load_callbacks) {
            callback(self);
        }
        self.dirty = true;
        true
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn add_source(
        &mut self,
        id: impl Into<String>,
        data: FeatureCollection,
    ) -> Result<(), MapError> {
        if !self.loaded {
            return Err(MapError::StyleNotLoaded);
        }
        let id = id.into();
        if self.sources.contains_key(&id) {
            return Err(MapError::DuplicateSource(id));
        }
        tracing::debug!(source = %id, features = data.len(), "source added");
        self.sources.insert(id.clone(), Rc::new(data));
        self.events.emit(self.frame, MapEventKind::SourceAdded { id });
        Ok(())
    }

    pub fn source(&self, id: &str) -> Option<&FeatureCollection> {
        self.sources.get(id).map(|s| s.as_ref())
    }

    pub fn add_layer(&mut self, mut layer: Box<dyn MapLayer>) -> Result<LayerReport, MapError> {
        if !self.loaded {
            return Err(MapError::StyleNotLoaded);
        }
        let id = layer.id().to_string();
        if self.layers.iter().any(|l| l.id() == id) {
            return Err(MapError::DuplicateLayer(id));
        }

        let report = layer
            .on_add(&mut self.layer_context())
            .map_err(|source| MapError::Layer {
                id: id.clone(),
                source,
            })?;
        tracing::info!(
            layer = %id,
            rendered = report.rendered,
            skipped = report.skipped,
            "layer added"
        );
        self.events
            .emit(self.frame, MapEventKind::LayerAdded { id, report });
        self.layers.push(layer);
        self.dirty = true;
        Ok(report)
    }

    pub fn remove_layer(&mut self, id: &str) -> Result<(), MapError> {
        let index = self
            .layers
            .iter()
            .position(|l| l.id() == id)
            .ok_or_else(|| MapError::UnknownLayer(id.to_string()))?;
        let mut layer = self.layers.remove(index);
        layer.on_remove(&mut self.layer_context());
        tracing::debug!(layer = %id, "layer removed");
        self.events.emit(
            self.frame,
            MapEventKind::LayerRemoved { id: id.to_string() },
        );
        self.dirty = true;
        Ok(())
    }

    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id()).collect()
    }

    /// Draws one frame and returns its index.
    pub fn repaint(&mut self) -> u64 {
        self.frame = self.frame.next();
        let matrix = self.transform.mercator_matrix();

        self.backend.begin_frame(BASEMAP_BACKGROUND);
        self.backend.set_state(HOST_STATE);
        for layer in &mut self.layers {
            match layer.kind() {
                LayerKind::Native => layer.render(&mut self.backend, &matrix),
                LayerKind::Custom => {
                    let mut scope = ExternalRenderScope::enter(&mut self.backend);
                    layer.render(scope.backend(), &matrix);
                }
            }
        }
        self.backend.end_frame();

        self.dirty = false;
        self.frame.index
    }

    pub fn needs_repaint(&self) -> bool {
        self.dirty
    }

    pub fn trigger_repaint(&mut self) {
        self.dirty = true;
    }

    pub fn frame_index(&self) -> u64 {
        self.frame.index
    }

    pub fn zoom(&self) -> f64 {
        self.transform.zoom()
    }

    pub fn canvas(&self) -> CanvasSize {
        self.backend.canvas()
    }

    pub fn gl(&self) -> &B {
        &self.backend
    }

    pub fn gl_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn events(&self) -> &[MapEvent] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<MapEvent> {
        self.events.drain()
    }

    pub fn jump_to(&mut self, center: LngLat, zoom: Option<f64>) {
        self.transform.jump_to(center, zoom);
        self.dirty = true;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.transform.pan_by(dx, dy);
        self.dirty = true;
    }

    pub fn zoom_by(&mut self, delta: f64) {
        self.transform.zoom_by(delta);
        self.dirty = true;
    }

    pub fn rotate_by(&mut self, d_bearing: f64, d_pitch: f64) {
        self.transform.rotate_by(d_bearing, d_pitch);
        self.dirty = true;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let size = CanvasSize::new(width, height);
        self.backend.resize(size);
        self.transform.resize(size);
        self.dirty = true;
    }

    /// Clicks at a canvas position. A marker hit toggles its popup; a miss
    /// closes every open popup.
    pub fn click(&mut self, point: Vec2) -> Option<MarkerId> {
        let Some(id) = self.markers.hit_test(&self.transform, point) else {
            for marker in self.markers.close_popups() {
                self.events
                    .emit(self.frame, MapEventKind::PopupClosed { marker });
                self.dirty = true;
            }
            return None;
        };
        match self.markers.toggle_popup(id) {
            Some(true) => self
                .events
                .emit(self.frame, MapEventKind::PopupOpened { marker: id }),
            Some(false) => self
                .events
                .emit(self.frame, MapEventKind::PopupClosed { marker: id }),
            None => {}
        }
        self.dirty = true;
        Some(id)
    }

    pub fn hover(&self, point: Vec2) -> Option<MarkerId> {
        self.markers.hit_test(&self.transform, point)
    }

    pub fn open_popups(&self) -> Vec<PopupView> {
        self.markers.open_popups(&self.transform)
    }

    /// Tears the map down: every layer releases its resources, then sources
    /// and markers are dropped. Hands the backend back to the caller.
    pub fn remove(mut self) -> B {
        let mut layers = std::mem::take(&mut self.layers);
        {
            let mut ctx = self.layer_context();
            for layer in &mut layers {
                layer.on_remove(&mut ctx);
            }
        }
        self.markers.clear();
        self.sources.clear();
        self.load_callbacks.clear();
        tracing::debug!(layers = layers.len(), "map removed");
        self.backend
    }

    fn layer_context(&mut self) -> LayerContext<'_> {
        LayerContext {
            transform: &self.transform,
            sources: &self.sources,
            markers: &mut self.markers,
            gl: &mut self.backend,
        }
    }
}
