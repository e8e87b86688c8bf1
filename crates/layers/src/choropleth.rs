use formats::{Feature, FeatureCollection, STAT_PROPERTY};
use foundation::Rgba;
use foundation::math::{Mat4, MercatorCoordinate};
use gpu::{DrawCall, GlState, MeshData, MeshHandle, RenderBackend, Shading};
use runtime::{LayerContext, LayerError, LayerKind, LayerReport, MapLayer};

use crate::expression::{ExpressionError, Interpolate};
use crate::extrusion::extrude_polygon;

/// Paint properties of a fill-extrusion layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FillExtrusionPaint {
    /// Feature property both ramps are keyed on.
    pub property: String,
    pub color: Interpolate<Rgba>,
    /// Meters.
    pub height: Interpolate<f64>,
    pub base_m: f64,
    pub opacity: f32,
    /// Used when the property is missing or not a number.
    pub fallback_color: Rgba,
    pub fallback_height_m: f64,
}

impl FillExtrusionPaint {
    /// Light blue to black over `fraction_nonwhite` 0-100, up to 10 km tall.
    pub fn depth_ramp() -> Result<Self, ExpressionError> {
        Ok(Self {
            property: STAT_PROPERTY.to_string(),
            color: Interpolate::from_hex_stops(&[
                (0.0, "#caf0f8"),
                (20.0, "#90e0ef"),
                (40.0, "#00b4d8"),
                (60.0, "#0077b6"),
                (80.0, "#03045e"),
                (100.0, "#000"),
            ])?,
            height: Interpolate::linear(vec![(0.0, 0.0), (100.0, 10_000.0)])?,
            base_m: 0.0,
            opacity: 0.75,
            fallback_color: Rgba::BLACK,
            fallback_height_m: 0.0,
        })
    }

    pub fn color_for(&self, value: Option<f64>) -> Rgba {
        match value {
            Some(v) => self.color.evaluate(v),
            None => self.fallback_color,
        }
    }

    pub fn height_for(&self, value: Option<f64>) -> f64 {
        match value {
            Some(v) => self.height.evaluate(v),
            None => self.fallback_height_m,
        }
    }

    /// Rejects paint the backend cannot draw sensibly.
    pub fn validate(&self) -> Result<(), LayerError> {
        if self.property.is_empty() {
            return Err(LayerError::InvalidPaint("empty property name".to_string()));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(LayerError::InvalidPaint(format!(
                "opacity {} is outside [0, 1]",
                self.opacity
            )));
        }
        if !self.base_m.is_finite() || !self.fallback_height_m.is_finite() {
            return Err(LayerError::InvalidPaint("heights must be finite".to_string()));
        }
        Ok(())
    }

    fn value_of(&self, feature: &Feature) -> Option<f64> {
        feature.number(&self.property)
    }
}

/// One uploaded prism per source feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrudedFeature {
    pub feature_index: usize,
    pub mesh: MeshHandle,
    pub color: Rgba,
    pub height_m: f64,
}

/// Polygons extruded to a height and colored by a feature property.
pub struct FillExtrusionLayer {
    id: String,
    source: String,
    paint: FillExtrusionPaint,
    origin: MercatorCoordinate,
    features: Vec<ExtrudedFeature>,
}

impl FillExtrusionLayer {
    pub fn new(id: impl Into<String>, source: impl Into<String>, paint: FillExtrusionPaint) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            paint,
            origin: MercatorCoordinate::new(0.0, 0.0, 0.0),
            features: Vec::new(),
        }
    }

    pub fn paint(&self) -> &FillExtrusionPaint {
        &self.paint
    }

    pub fn features(&self) -> &[ExtrudedFeature] {
        &self.features
    }

    pub fn origin(&self) -> MercatorCoordinate {
        self.origin
    }
}

/// Center of the bounding box of every polygon vertex, in mercator units.
fn mesh_origin(collection: &FeatureCollection) -> MercatorCoordinate {
    let mut min = (f64::INFINITY, f64::INFINITY);
    let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    let rings = collection
        .features
        .iter()
        .filter_map(|f| f.geometry.geometry())
        .flat_map(|g| g.polygons())
        .flat_map(|rings| rings.iter());
    for ring in rings {
        for p in ring {
            let m = MercatorCoordinate::from_lng_lat(p.0, 0.0);
            min = (min.0.min(m.x), min.1.min(m.y));
            max = (max.0.max(m.x), max.1.max(m.y));
        }
    }
    if min.0.is_finite() && max.0.is_finite() {
        MercatorCoordinate::new((min.0 + max.0) / 2.0, (min.1 + max.1) / 2.0, 0.0)
    } else {
        MercatorCoordinate::new(0.5, 0.5, 0.0)
    }
}

impl MapLayer for FillExtrusionLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Native
    }

    fn on_add(&mut self, ctx: &mut LayerContext<'_>) -> Result<LayerReport, LayerError> {
        self.paint.validate()?;
        let data = ctx.source(&self.source)?;
        self.origin = mesh_origin(&data);

        let mut report = LayerReport::default();
        for (feature_index, feature) in data.features.iter().enumerate() {
            let polygons = feature
                .geometry
                .geometry()
                .map(|g| g.polygons())
                .unwrap_or_default();
            if polygons.is_empty() {
                report.skipped += 1;
                continue;
            }

            let value = self.paint.value_of(feature);
            if value.is_none() {
                tracing::debug!(
                    layer = %self.id,
                    feature = feature_index,
                    property = %self.paint.property,
                    "property missing, using paint fallback"
                );
            }
            let height_m = self.paint.height_for(value);

            let mut mesh = MeshData::new();
            for rings in polygons {
                extrude_polygon(rings, self.paint.base_m, height_m, self.origin, &mut mesh);
            }
            if mesh.is_empty() {
                report.skipped += 1;
                continue;
            }

            self.features.push(ExtrudedFeature {
                feature_index,
                mesh: ctx.gl.upload_mesh(&mesh),
                color: self.paint.color_for(value),
                height_m,
            });
            report.rendered += 1;
        }

        tracing::debug!(
            layer = %self.id,
            rendered = report.rendered,
            skipped = report.skipped,
            "extruded features"
        );
        Ok(report)
    }

    fn render(&mut self, gl: &mut dyn RenderBackend, matrix: &Mat4) {
        if self.features.is_empty() {
            return;
        }
        gl.set_state(GlState::TRANSLUCENT_3D);
        let model = Mat4::translation(self.origin.as_vec3());
        for feature in &self.features {
            gl.draw(&DrawCall {
                mesh: feature.mesh,
                view_proj: *matrix,
                model,
                color: feature.color.with_alpha(feature.color.a * self.paint.opacity),
                shading: Shading::Lambert,
            });
        }
    }

    fn on_remove(&mut self, ctx: &mut LayerContext<'_>) {
        for feature in self.features.drain(..) {
            ctx.gl.release_mesh(feature.mesh);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FillExtrusionLayer, FillExtrusionPaint};
    use formats::FeatureCollection;
    use foundation::Rgba;
    use gpu::{BlendMode, HeadlessBackend, Shading};
    use pretty_assertions::assert_eq;
    use runtime::{AccessToken, LayerError, LayerReport, Map, MapError, MapOptions};

    fn paint() -> FillExtrusionPaint {
        FillExtrusionPaint::depth_ramp().expect("paint")
    }

    fn map_with(payload: &str) -> Map<HeadlessBackend> {
        let options =
            MapOptions::default().with_access_token(AccessToken::new("pk.test").expect("token"));
        let mut map = Map::new(options, HeadlessBackend::new(800, 600)).expect("map");
        map.load();
        let data = FeatureCollection::from_geojson_str(payload).expect("geojson");
        map.add_source("zipcodes", data).expect("source");
        map
    }

    #[test]
    fn ramp_endpoints_and_clamping() {
        let paint = paint();
        assert_eq!(paint.color_for(Some(0.0)).to_hex(), "#caf0f8");
        assert_eq!(paint.color_for(Some(100.0)).to_hex(), "#000000");
        assert_eq!(paint.color_for(Some(-5.0)), paint.color_for(Some(0.0)));
        assert_eq!(paint.color_for(Some(150.0)), paint.color_for(Some(100.0)));
        assert_eq!(paint.color_for(Some(20.0)).to_hex(), "#90e0ef");

        assert_eq!(paint.height_for(Some(0.0)), 0.0);
        assert_eq!(paint.height_for(Some(100.0)), 10_000.0);
        assert_eq!(paint.height_for(Some(-5.0)), 0.0);
        assert_eq!(paint.height_for(Some(150.0)), 10_000.0);
    }

    #[test]
    fn ramps_are_monotonic() {
        let paint = paint();
        let mut previous_height = f64::NEG_INFINITY;
        let mut previous_luma = f32::INFINITY;
        for step in 0..=100 {
            let v = f64::from(step);
            let height = paint.height_for(Some(v));
            let luma = paint.color_for(Some(v)).luminance();
            assert!(height >= previous_height, "height dips at {v}");
            assert!(luma <= previous_luma + 1e-6, "color brightens at {v}");
            previous_height = height;
            previous_luma = luma;
        }
    }

    #[test]
    fn missing_property_uses_fallback() {
        let paint = paint();
        assert_eq!(paint.color_for(None), Rgba::BLACK);
        assert_eq!(paint.height_for(None), 0.0);
    }

    #[test]
    fn extrudes_demo_polygons() {
        let mut map = map_with(include_str!("../../apps/viewer_web/assets/polygons.json"));
        let report = map
            .add_layer(Box::new(FillExtrusionLayer::new(
                "zipcode-depth-layer",
                "zipcodes",
                paint(),
            )))
            .expect("layer");
        assert_eq!(
            report,
            LayerReport {
                rendered: 6,
                skipped: 0
            }
        );
        assert_eq!(map.gl().live_meshes(), 6);

        map.repaint();
        let draws = map.gl().draws_in_frame(1);
        assert_eq!(draws.len(), 6);
        assert!(draws.iter().all(|d| d.state.blend == BlendMode::Alpha));
        assert!(draws.iter().all(|d| d.call.shading == Shading::Lambert));
        assert!(draws.iter().all(|d| (d.call.color.a - 0.75).abs() < 1e-6));

        let backend = map.remove();
        assert_eq!(backend.live_meshes(), 0);
    }

    #[test]
    fn skips_non_polygon_features_and_falls_back_on_missing_values() {
        let mut map = map_with(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"fraction_nonwhite": 50},
                 "geometry": {"type": "Point", "coordinates": [-71.0, 42.3]}},
                {"type": "Feature", "properties": {"fraction_nonwhite": "lots"},
                 "geometry": {"type": "Polygon", "coordinates":
                    [[[-71.1, 42.3], [-71.0, 42.3], [-71.0, 42.4], [-71.1, 42.3]]]}},
                {"type": "Feature", "properties": {},
                 "geometry": null}
            ]}"#,
        );
        let report = map
            .add_layer(Box::new(FillExtrusionLayer::new(
                "extrusions",
                "zipcodes",
                paint(),
            )))
            .expect("layer");
        assert_eq!(
            report,
            LayerReport {
                rendered: 1,
                skipped: 2
            }
        );

        map.repaint();
        let draws = map.gl().draws_in_frame(1);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].call.color, Rgba::BLACK.with_alpha(0.75));
    }

    #[test]
    fn invalid_paint_is_rejected_before_upload() {
        let mut map = map_with(include_str!("../../apps/viewer_web/assets/polygons.json"));
        let mut bad = paint();
        bad.opacity = 1.5;
        let err = map
            .add_layer(Box::new(FillExtrusionLayer::new("extrusions", "zipcodes", bad)))
            .expect_err("opacity out of range");
        assert!(matches!(
            err,
            MapError::Layer {
                source: LayerError::InvalidPaint(_),
                ..
            }
        ));
        assert_eq!(map.gl().live_meshes(), 0);
        assert!(map.layer_ids().is_empty());
        assert!(paint().validate().is_ok());
    }
}
