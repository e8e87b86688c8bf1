//! Glowing spheres floating above each feature's centroid, with an invisible
//! clickable marker that opens the feature's popup.

use formats::{DisplayValue, FeatureError, StatFeature, stat_features};
use foundation::math::{Mat4, MercatorCoordinate, Vec2};
use gpu::{Camera, RenderBackend, SceneRenderer};
use runtime::{
    LayerContext, LayerError, LayerKind, LayerReport, MapLayer, Marker, MarkerElement, MarkerId,
    MarkerSet, Popup,
};
use scene::prefabs::{GlowSphereLook, GlowSpherePair, spawn_glow_sphere};
use scene::world::World;

pub const ALTITUDE_BASE_M: f64 = 500.0;
pub const ALTITUDE_RANGE_M: f64 = 10_000.0;

/// Altitude in meters a statistic lifts its sphere to. Never below
/// [`ALTITUDE_BASE_M`].
pub fn pseudo_altitude(value: f64) -> f64 {
    if !value.is_finite() {
        return ALTITUDE_BASE_M;
    }
    value.clamp(0.0, 100.0) / 100.0 * ALTITUDE_RANGE_M + ALTITUDE_BASE_M
}

/// Model scale for a sphere whose radius is given in meters at
/// `reference_zoom`, so it grows by 2x per zoom level above it.
pub fn sphere_scale(position: MercatorCoordinate, zoom: f64, reference_zoom: f64) -> f64 {
    position.meter_in_mercator_coordinate_units() * (zoom - reference_zoom).exp2()
}

pub fn popup_html(display: &DisplayValue) -> String {
    format!("<h3>RCOI NAT: {}</h3>", escape_html(&display.to_string()))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlowSphereStyle {
    pub look: GlowSphereLook,
    pub scale_reference_zoom: f64,
    pub marker_diameter_px: f64,
    pub marker_offset: Vec2,
    pub popup_offset_px: f64,
}

impl Default for GlowSphereStyle {
    fn default() -> Self {
        Self {
            look: GlowSphereLook::default(),
            scale_reference_zoom: 10.0,
            marker_diameter_px: 50.0,
            marker_offset: Vec2::new(-10.0, -10.0),
            popup_offset_px: 25.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedFeature {
    pub feature_index: usize,
    pub position: MercatorCoordinate,
    pub altitude_m: f64,
    pub scale: f64,
    pub spheres: GlowSpherePair,
    pub marker: MarkerId,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct AttachSummary {
    pub placed: usize,
    pub skipped: usize,
}

impl From<AttachSummary> for LayerReport {
    fn from(summary: AttachSummary) -> Self {
        LayerReport {
            rendered: summary.placed,
            skipped: summary.skipped,
        }
    }
}

/// State shared by attach and render.
#[derive(Debug, Default)]
pub struct AttachedScene {
    camera: Camera,
    world: World,
    renderer: SceneRenderer,
    placed: Vec<PlacedFeature>,
}

impl AttachedScene {
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn placed(&self) -> &[PlacedFeature] {
        &self.placed
    }

    fn place(
        &mut self,
        markers: &mut MarkerSet,
        style: &GlowSphereStyle,
        feature: &StatFeature,
        zoom: f64,
    ) -> PlacedFeature {
        let altitude_m = pseudo_altitude(feature.fraction_nonwhite);
        let position = MercatorCoordinate::from_lng_lat(feature.centroid, altitude_m);
        let scale = sphere_scale(position, zoom, style.scale_reference_zoom);

        let spheres = spawn_glow_sphere(
            &mut self.world,
            &style.look,
            position.as_vec3(),
            scale,
        );

        let marker = markers.add(
            Marker::new(
                feature.centroid,
                MarkerElement::invisible_circle(style.marker_diameter_px),
            )
            .with_offset(style.marker_offset)
            .with_popup(Popup {
                html: popup_html(&feature.display),
                offset_px: style.popup_offset_px,
            }),
        );

        PlacedFeature {
            feature_index: feature.index,
            position,
            altitude_m,
            scale,
            spheres,
            marker,
        }
    }
}

/// Custom layer drawing one glow sphere pair per feature.
pub struct GlowSphereOverlay {
    id: String,
    source: String,
    style: GlowSphereStyle,
    scene: Option<AttachedScene>,
}

impl GlowSphereOverlay {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            style: GlowSphereStyle::default(),
            scene: None,
        }
    }

    pub fn with_style(mut self, style: GlowSphereStyle) -> Self {
        self.style = style;
        self
    }

    pub fn style(&self) -> &GlowSphereStyle {
        &self.style
    }

    /// `None` until the layer is added, and again after it is removed.
    pub fn scene(&self) -> Option<&AttachedScene> {
        self.scene.as_ref()
    }

    fn attach(
        &self,
        records: Vec<Result<StatFeature, FeatureError>>,
        markers: &mut MarkerSet,
        zoom: f64,
    ) -> (AttachedScene, AttachSummary) {
        let mut scene = AttachedScene::default();
        let mut summary = AttachSummary::default();

        for (index, record) in records.into_iter().enumerate() {
            match record {
                Ok(feature) => {
                    let placed = scene.place(markers, &self.style, &feature, zoom);
                    scene.placed.push(placed);
                    summary.placed += 1;
                }
                Err(error) => {
                    tracing::warn!(layer = %self.id, feature = index, %error, "skipping feature");
                    summary.skipped += 1;
                }
            }
        }
        (scene, summary)
    }
}

impl MapLayer for GlowSphereOverlay {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Custom
    }

    fn on_add(&mut self, ctx: &mut LayerContext<'_>) -> Result<LayerReport, LayerError> {
        let data = ctx.source(&self.source)?;
        let zoom = ctx.transform.zoom();
        let (scene, summary) = self.attach(stat_features(&data), ctx.markers, zoom);

        tracing::info!(
            layer = %self.id,
            placed = summary.placed,
            skipped = summary.skipped,
            zoom,
            "glow spheres attached"
        );
        self.scene = Some(scene);
        Ok(summary.into())
    }

    fn render(&mut self, gl: &mut dyn RenderBackend, matrix: &Mat4) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        scene.camera.set_projection(*matrix);
        scene.renderer.render(&scene.world, &scene.camera, gl);
    }

    fn on_remove(&mut self, ctx: &mut LayerContext<'_>) {
        let Some(mut scene) = self.scene.take() else {
            return;
        };
        scene.renderer.release(ctx.gl);
        for placed in &scene.placed {
            ctx.markers.remove(placed.marker);
        }
        tracing::debug!(layer = %self.id, features = scene.placed.len(), "overlay removed");
    }
}

#[cfg(test)]
mod tests {
    use super::{
        GlowSphereOverlay, GlowSphereStyle, escape_html, popup_html, pseudo_altitude, sphere_scale,
    };
    use formats::{DisplayValue, FeatureCollection};
    use foundation::Rgba;
    use foundation::math::{LngLat, MercatorCoordinate, Vec2};
    use gpu::{BlendMode, GlState, HeadlessBackend, RenderBackend};
    use pretty_assertions::assert_eq;
    use runtime::{AccessToken, LayerReport, Map, MapLayer, MapOptions};
    use serde_json::json;

    fn feature(centroid: serde_json::Value, value: serde_json::Value) -> serde_json::Value {
        json!({
            "type": "Feature",
            "properties": {"centroid": centroid, "r_coi_nat": 12, "fraction_nonwhite": value},
            "geometry": null,
        })
    }

    fn map_with(features: Vec<serde_json::Value>) -> Map<HeadlessBackend> {
        let options =
            MapOptions::default().with_access_token(AccessToken::new("pk.test").expect("token"));
        let mut map = Map::new(options, HeadlessBackend::new(800, 600)).expect("map");
        map.load();
        let data = FeatureCollection::from_geojson_value(json!({
            "type": "FeatureCollection",
            "features": features,
        }))
        .expect("geojson");
        map.add_source("zipcodes", data).expect("source");
        map
    }

    #[test]
    fn altitude_is_clamped_and_lifted() {
        assert_eq!(pseudo_altitude(0.0), 500.0);
        assert_eq!(pseudo_altitude(100.0), 10_500.0);
        assert_eq!(pseudo_altitude(50.0), 5_500.0);
        assert_eq!(pseudo_altitude(-20.0), 500.0);
        assert_eq!(pseudo_altitude(400.0), 10_500.0);
        assert_eq!(pseudo_altitude(f64::NAN), 500.0);
    }

    #[test]
    fn scale_grows_with_zoom() {
        let p = MercatorCoordinate::from_lng_lat(LngLat::new(-71.06, 42.36), 500.0);
        let mut previous = 0.0;
        for zoom in 0..=22 {
            let s = sphere_scale(p, f64::from(zoom), 10.0);
            assert!(s > previous, "zoom {zoom}");
            previous = s;
        }
        let at_reference = sphere_scale(p, 10.0, 10.0);
        assert_eq!(at_reference, p.meter_in_mercator_coordinate_units());
        assert_eq!(sphere_scale(p, 11.0, 10.0), 2.0 * at_reference);
    }

    #[test]
    fn popup_html_escapes_values() {
        assert_eq!(popup_html(&DisplayValue::Number(37.0)), "<h3>RCOI NAT: 37</h3>");
        assert_eq!(
            popup_html(&DisplayValue::Text("<b>High</b>".into())),
            "<h3>RCOI NAT: &lt;b&gt;High&lt;/b&gt;</h3>"
        );
        assert_eq!(escape_html("a & 'b'"), "a &amp; &#39;b&#39;");
    }

    #[test]
    fn two_features_sit_at_ramp_endpoints() {
        let mut map = map_with(vec![
            feature(json!([-71.06, 42.36]), json!(0)),
            feature(json!([-71.08, 42.33]), json!(100)),
        ]);
        let report = map
            .add_layer(Box::new(GlowSphereOverlay::new("3d-model", "zipcodes")))
            .expect("overlay");
        assert_eq!(
            report,
            LayerReport {
                rendered: 2,
                skipped: 0
            }
        );

        let mut overlay = GlowSphereOverlay::new("spheres", "zipcodes");
        let records = formats::stat_features(map.source("zipcodes").expect("source"));
        let mut markers = runtime::MarkerSet::new();
        let (scene, _) = overlay.attach(records, &mut markers, 11.0);
        let altitudes: Vec<f64> = scene.placed().iter().map(|p| p.altitude_m).collect();
        assert_eq!(altitudes, vec![500.0, 10_500.0]);
        for placed in scene.placed() {
            assert!((placed.position.to_altitude() - placed.altitude_m).abs() < 1e-6);
        }
        overlay.scene = Some(scene);
        assert_eq!(overlay.scene().map(|s| s.world().len()), Some(4));
    }

    #[test]
    fn one_mesh_pair_and_marker_per_feature() {
        for n in [0usize, 1, 7] {
            let features = (0..n)
                .map(|i| feature(json!([-71.0 - i as f64 * 0.01, 42.3]), json!(i * 10)))
                .collect();
            let mut map = map_with(features);
            map.add_layer(Box::new(GlowSphereOverlay::new("3d-model", "zipcodes")))
                .expect("overlay");
            assert_eq!(map.markers().len(), n);

            map.repaint();
            let draws = map.gl().draws_in_frame(1);
            assert_eq!(draws.len(), 2 * n);
            // Sphere and glow meshes are uploaded once and shared.
            assert_eq!(map.gl().live_meshes(), if n == 0 { 0 } else { 2 });
        }
    }

    #[test]
    fn bad_records_are_skipped_individually() {
        let mut map = map_with(vec![
            feature(json!([-71.06, 42.36]), json!(10)),
            json!({"type": "Feature", "properties": {"r_coi_nat": 1, "fraction_nonwhite": 5}, "geometry": null}),
            feature(json!([-71.08, 42.33]), json!(90)),
        ]);
        let report = map
            .add_layer(Box::new(GlowSphereOverlay::new("3d-model", "zipcodes")))
            .expect("overlay");
        assert_eq!(
            report,
            LayerReport {
                rendered: 2,
                skipped: 1
            }
        );
        assert_eq!(map.markers().len(), 2);
    }

    #[test]
    fn renders_opaque_core_then_glow_with_current_matrix() {
        let mut map = map_with(vec![feature(json!([-71.0589, 42.3601]), json!(50))]);
        map.add_layer(Box::new(GlowSphereOverlay::new("3d-model", "zipcodes")))
            .expect("overlay");

        map.repaint();
        map.zoom_by(1.0);
        map.repaint();

        let expected = map.transform().mercator_matrix();
        let draws = map.gl().draws_in_frame(2);
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].state, GlState::OPAQUE_3D);
        assert_eq!(draws[0].call.color.a, 1.0);
        assert_eq!(draws[1].state.blend, BlendMode::Alpha);
        assert_eq!(draws[1].call.color.a, 0.5);
        assert!(draws.iter().all(|d| d.call.view_proj == expected));
        assert_eq!(map.gl().state(), runtime::HOST_STATE);
    }

    #[test]
    fn direct_render_does_not_inherit_the_callers_state() {
        let map = map_with(vec![feature(json!([-71.0589, 42.3601]), json!(50))]);
        let mut overlay = GlowSphereOverlay::new("spheres", "zipcodes");
        let records = formats::stat_features(map.source("zipcodes").expect("source"));
        let mut markers = runtime::MarkerSet::new();
        let (scene, _) = overlay.attach(records, &mut markers, 11.0);
        overlay.scene = Some(scene);

        let mut gl = HeadlessBackend::new(800, 600);
        gl.begin_frame(Rgba::WHITE);
        gl.set_state(GlState::TRANSLUCENT_3D);
        overlay.render(&mut gl, &map.transform().mercator_matrix());

        let draws = gl.draws_in_frame(1);
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].state, GlState::OPAQUE_3D);
        assert_eq!(draws[1].state.blend, BlendMode::Alpha);
    }

    #[test]
    fn marker_click_opens_the_feature_popup() {
        let mut map = map_with(vec![feature(json!([-71.0589, 42.3601]), json!(50))]);
        map.add_layer(Box::new(GlowSphereOverlay::new("3d-model", "zipcodes")))
            .expect("overlay");

        // The centroid is the map center; the marker element is offset by (-10, -10).
        let marker_center = Vec2::new(390.0, 290.0);
        let id = map.click(marker_center).expect("marker");
        let popups = map.open_popups();
        assert_eq!(popups.len(), 1);
        assert_eq!(popups[0].marker, id);
        assert_eq!(popups[0].html, "<h3>RCOI NAT: 12</h3>");
        assert!(map.markers().get(id).is_some_and(|m| m.element.opacity == 0.0));
    }

    #[test]
    fn removing_the_map_releases_everything() {
        let mut map = map_with(vec![
            feature(json!([-71.06, 42.36]), json!(0)),
            feature(json!([-71.08, 42.33]), json!(100)),
        ]);
        map.add_layer(Box::new(GlowSphereOverlay::new("3d-model", "zipcodes")))
            .expect("overlay");
        map.repaint();
        assert_eq!(map.gl().live_meshes(), 2);

        let backend = map.remove();
        assert_eq!(backend.live_meshes(), 0);
    }

    #[test]
    fn remove_layer_drops_markers() {
        let mut map = map_with(vec![feature(json!([-71.06, 42.36]), json!(0))]);
        map.add_layer(Box::new(GlowSphereOverlay::new("3d-model", "zipcodes")))
            .expect("overlay");
        map.remove_layer("3d-model").expect("remove");
        assert!(map.markers().is_empty());
        assert_eq!(map.gl().live_meshes(), 0);
    }

    #[test]
    fn default_style_matches_marker_layout() {
        let style = GlowSphereStyle::default();
        assert_eq!(style.scale_reference_zoom, 10.0);
        assert_eq!(style.marker_offset, Vec2::new(-10.0, -10.0));
        assert_eq!(style.popup_offset_px, 25.0);
        assert_eq!(style.look.core_radius, 105.0);
    }
}
