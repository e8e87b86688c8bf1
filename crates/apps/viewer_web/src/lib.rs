use console_error_panic_hook::set_once;
use gloo_net::http::Request;
use std::cell::{Cell, RefCell};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use formats::FeatureCollection;
use foundation::math::Vec2;
use gpu::RenderBackend;
use layers::{FillExtrusionLayer, FillExtrusionPaint, GlowSphereOverlay};
use runtime::Map;

mod config;
mod error;
mod logging;
mod popups;
mod wgpu;

pub use config::{
    CHOROPLETH_LAYER_ID, DEFAULT_DATA_FILE, DEFAULT_SOURCE_ID, OVERLAY_LAYER_ID, ViewerConfig,
};
pub use error::ViewerError;
use popups::PopupLayer;
use wgpu::WgpuBackend;

/// Wheel pixels per zoom level.
const WHEEL_PX_PER_ZOOM: f64 = 450.0;
/// Drag pixels to degrees of bearing and pitch.
const ROTATE_DEG_PER_PX: f64 = 0.5;

struct ViewerState<B: RenderBackend = WgpuBackend> {
    map: Map<B>,
    popups: Option<PopupLayer>,
    /// Which `mount` call built this state.
    generation: u64,
}

impl<B: RenderBackend> ViewerState<B> {
    /// Runs `f` only while this state still belongs to the given mount.
    fn for_mount<R>(&mut self, generation: u64, f: impl FnOnce(&mut Self) -> R) -> Option<R> {
        (self.generation == generation).then(|| f(self))
    }
}

thread_local! {
    static STATE: RefCell<Option<ViewerState>> = const { RefCell::new(None) };
    static MOUNTS: Cell<u64> = const { Cell::new(0) };
}

fn next_mount_generation() -> u64 {
    MOUNTS.with(|mounts| {
        let generation = mounts.get() + 1;
        mounts.set(generation);
        generation
    })
}

fn with_viewer<R>(f: impl FnOnce(&mut ViewerState) -> R) -> Result<R, ViewerError> {
    STATE.with(|state| {
        let mut state = state.borrow_mut();
        let viewer = state.as_mut().ok_or(ViewerError::NotMounted)?;
        Ok(f(viewer))
    })
}

fn render<B: RenderBackend>(viewer: &mut ViewerState<B>) {
    viewer.map.repaint();
    if let Some(popups) = &viewer.popups {
        popups.sync(&viewer.map.open_popups());
    }
}

fn render_if_dirty<B: RenderBackend>(viewer: &mut ViewerState<B>) -> bool {
    if !viewer.map.needs_repaint() {
        return false;
    }
    render(viewer);
    true
}

fn wheel_zoom_delta(wheel_delta_y: f64) -> f64 {
    if !wheel_delta_y.is_finite() {
        return 0.0;
    }
    -wheel_delta_y / WHEEL_PX_PER_ZOOM
}

async fn fetch_geojson(url: &str) -> Result<FeatureCollection, ViewerError> {
    let resp = Request::get(url).send().await?;
    if !resp.ok() {
        return Err(ViewerError::Http {
            url: url.to_string(),
            status: resp.status(),
        });
    }
    let text = resp.text().await?;
    Ok(FeatureCollection::from_geojson_str(&text)?)
}

fn attach_layers<B: RenderBackend>(
    viewer: &mut ViewerState<B>,
    source_id: &str,
    data: FeatureCollection,
) -> Result<(), ViewerError> {
    let map = &mut viewer.map;
    map.add_source(source_id, data)?;
    let depth = map.add_layer(Box::new(FillExtrusionLayer::new(
        CHOROPLETH_LAYER_ID,
        source_id,
        FillExtrusionPaint::depth_ramp()?,
    )))?;
    let spheres = map.add_layer(Box::new(GlowSphereOverlay::new(OVERLAY_LAYER_ID, source_id)))?;
    tracing::info!(
        extruded = depth.rendered,
        placed = spheres.rendered,
        skipped = spheres.skipped,
        "layers attached"
    );
    render(viewer);
    Ok(())
}

async fn load_features(url: &str, source_id: &str, generation: u64) -> Result<(), ViewerError> {
    let data = fetch_geojson(url).await?;
    tracing::info!(url, features = data.len(), "feature data loaded");

    match with_viewer(|viewer| {
        viewer.for_mount(generation, |viewer| attach_layers(viewer, source_id, data))
    }) {
        Ok(Some(attached)) => attached,
        Ok(None) | Err(ViewerError::NotMounted) => {
            tracing::debug!(url, generation, "map remounted before data arrived, dropping it");
            Ok(())
        }
        Err(error) => Err(error),
    }
}

async fn mount_inner(config: ViewerConfig) -> Result<(), ViewerError> {
    let backend = WgpuBackend::from_canvas_id(&config.map.container, config.map.antialias).await?;
    let mut map = Map::new(config.map.clone(), backend)?;
    let popups = match PopupLayer::attach(&config.map.container) {
        Ok(popups) => Some(popups),
        Err(error) => {
            tracing::warn!(%error, "popups disabled");
            None
        }
    };

    let generation = next_mount_generation();
    let data_url = config.data_url();
    let source_id = config.source_id.clone();
    map.on_load(move |_| {
        spawn_local(async move {
            if let Err(error) = load_features(&data_url, &source_id, generation).await {
                tracing::error!(url = %data_url, %error, "failed to load feature data");
            }
        });
    });

    unmount();
    map.load();
    let mut viewer = ViewerState {
        map,
        popups,
        generation,
    };
    render(&mut viewer);
    STATE.with(|state| *state.borrow_mut() = Some(viewer));
    Ok(())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Creates the map in the configured canvas. `config_json` may be empty.
///
/// The access token is checked before any GPU or network work starts.
#[wasm_bindgen]
pub fn mount(config_json: &str) -> Result<(), JsValue> {
    logging::setup_logging();
    let config = ViewerConfig::from_json(config_json)?;
    config.map.validate().map_err(ViewerError::from)?;
    // The style URL carries the token; log the style id only.
    tracing::info!(style = %config.map.style, container = %config.map.container, "mounting map");

    spawn_local(async move {
        if let Err(error) = mount_inner(config).await {
            tracing::error!(%error, "failed to mount map");
        }
    });
    Ok(())
}

/// Removes the map and every layer resource. A no-op when nothing is mounted.
#[wasm_bindgen]
pub fn unmount() {
    let Some(viewer) = STATE.with(|state| state.borrow_mut().take()) else {
        return;
    };
    if let Some(popups) = &viewer.popups {
        popups.clear();
    }
    drop(viewer.map.remove());
    tracing::info!("map unmounted");
}

#[wasm_bindgen]
pub fn set_canvas_size(width: f64, height: f64) -> Result<(), JsValue> {
    with_viewer(|viewer| {
        viewer
            .map
            .resize(width.max(1.0).round() as u32, height.max(1.0).round() as u32);
        render(viewer);
    })?;
    Ok(())
}

#[wasm_bindgen]
pub fn camera_pan(delta_x_px: f64, delta_y_px: f64) -> Result<(), JsValue> {
    with_viewer(|viewer| {
        viewer.map.pan_by(delta_x_px, delta_y_px);
        render(viewer);
    })?;
    Ok(())
}

#[wasm_bindgen]
pub fn camera_zoom(wheel_delta_y: f64) -> Result<(), JsValue> {
    with_viewer(|viewer| {
        viewer.map.zoom_by(wheel_zoom_delta(wheel_delta_y));
        render(viewer);
    })?;
    Ok(())
}

#[wasm_bindgen]
pub fn camera_rotate(delta_x_px: f64, delta_y_px: f64) -> Result<(), JsValue> {
    with_viewer(|viewer| {
        viewer.map.rotate_by(
            delta_x_px * ROTATE_DEG_PER_PX,
            -delta_y_px * ROTATE_DEG_PER_PX,
        );
        render(viewer);
    })?;
    Ok(())
}

/// Returns whether a marker was hit.
#[wasm_bindgen]
pub fn pointer_click(x_px: f64, y_px: f64) -> Result<bool, JsValue> {
    Ok(with_viewer(|viewer| {
        let hit = viewer.map.click(Vec2::new(x_px, y_px)).is_some();
        render_if_dirty(viewer);
        hit
    })?)
}

/// Whether the pointer is over a marker, for the cursor style.
#[wasm_bindgen]
pub fn pointer_move(x_px: f64, y_px: f64) -> Result<bool, JsValue> {
    Ok(with_viewer(|viewer| viewer.map.hover(Vec2::new(x_px, y_px)).is_some())?)
}

/// Renders if anything changed since the last frame.
#[wasm_bindgen]
pub fn repaint() -> Result<bool, JsValue> {
    Ok(with_viewer(render_if_dirty)?)
}

#[cfg(test)]
mod tests {
    use super::{
        ViewerError, ViewerState, attach_layers, next_mount_generation, wheel_zoom_delta,
        with_viewer,
    };
    use formats::FeatureCollection;
    use gpu::HeadlessBackend;
    use runtime::{AccessToken, Map, MapOptions};

    fn headless_viewer(generation: u64) -> ViewerState<HeadlessBackend> {
        let token = AccessToken::new("pk.test").expect("token");
        let options = MapOptions::default().with_access_token(token);
        let mut map = Map::new(options, HeadlessBackend::new(640, 480)).expect("map");
        map.load();
        ViewerState {
            map,
            popups: None,
            generation,
        }
    }

    #[test]
    fn wheel_down_zooms_out() {
        assert_eq!(wheel_zoom_delta(450.0), -1.0);
        assert_eq!(wheel_zoom_delta(-225.0), 0.5);
        assert_eq!(wheel_zoom_delta(f64::NAN), 0.0);
    }

    #[test]
    fn exports_require_a_mounted_map() {
        let result = with_viewer(|_| ());
        assert!(matches!(result, Err(ViewerError::NotMounted)));
    }

    #[test]
    fn each_mount_gets_a_new_generation() {
        let first = next_mount_generation();
        let second = next_mount_generation();
        assert!(second > first);
    }

    #[test]
    fn data_from_an_earlier_mount_is_dropped() {
        let mut viewer = headless_viewer(2);
        let data = FeatureCollection::from_geojson_str(r#"{"type":"FeatureCollection","features":[]}"#)
            .expect("empty collection");

        let stale = viewer.for_mount(1, |viewer| attach_layers(viewer, "zipcodes", data));
        assert!(stale.is_none());
        assert!(viewer.map.source("zipcodes").is_none());
        assert!(viewer.map.layer_ids().is_empty());

        assert_eq!(viewer.for_mount(2, |viewer| viewer.generation), Some(2));
    }
}
